// Copyright © 2026 the uberbsp developers
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Parsing of the entity lump's key/value text.
//!
//! The lump is a sequence of brace-delimited blocks, one per entity, each
//! holding one `"key" "value"` pair per line:
//!
//! ```text
//! {
//! "classname" "light"
//! "origin" "24 -44 584"
//! "light" "300"
//! }
//! ```
//!
//! Values are plain strings in the file; a handful of well-known keys are
//! coerced to numeric form on the way in. Map compilers emit the occasional
//! mangled line, so a line that does not scan as a key/value pair is logged
//! and skipped rather than failing the entity.

use std::collections::HashMap;

/// Typed value of one entity key.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityValue {
    Text(String),
    Number(f32),
    Numbers(Vec<f32>),
}

/// One entity block, keyed by its (unquoted) key strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Entity {
    properties: HashMap<String, EntityValue>,
}

impl Entity {
    pub fn get(&self, key: &str) -> Option<&EntityValue> {
        self.properties.get(key)
    }

    /// The entity's `classname`, if it has one.
    pub fn class_name(&self) -> Option<&str> {
        match self.properties.get("classname") {
            Some(&EntityValue::Text(ref s)) => Some(s),
            _ => None,
        }
    }

    pub fn properties(&self) -> &HashMap<String, EntityValue> {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

// Keys coerced to a vector of floats.
const VECTOR_KEYS: [&str; 3] = ["origin", "_color", "angles"];

// Keys coerced to a single float.
const NUMBER_KEYS: [&str; 4] = ["angle", "scale", "speed", "light"];

/// Splits the entity text into blocks and parses each block's key/value
/// lines. Malformed lines are skipped with a warning; malformed values
/// become NaN components rather than dropping the key.
pub fn parse_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();

    // Closing braces carry no information once the text is split on the
    // opening ones. Every non-empty fragment is a candidate body, including
    // any text before the first brace.
    let stripped = text.replace('}', "");
    for block in stripped.split('{') {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let mut properties = HashMap::new();
        for line in block.split('\n') {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut parts = line.split("\" \"");
            match (parts.next(), parts.next(), parts.next()) {
                (Some(k), Some(v), None) => {
                    let key = k.replace('"', "");
                    let value = v.replace('"', "");
                    properties.insert(key.clone(), coerce(&key, value));
                }
                _ => warn!("Skipping malformed entity line: {:?}", line),
            }
        }

        entities.push(Entity { properties });
    }

    entities
}

fn coerce(key: &str, value: String) -> EntityValue {
    if VECTOR_KEYS.contains(&key) {
        EntityValue::Numbers(
            value
                .split_whitespace()
                .map(|tok| tok.parse().unwrap_or(::std::f32::NAN))
                .collect(),
        )
    } else if NUMBER_KEYS.contains(&key) {
        EntityValue::Number(value.parse().unwrap_or(::std::f32::NAN))
    } else {
        EntityValue::Text(value)
    }
}

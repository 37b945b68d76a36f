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

//! Material-script ("shader") parsing.
//!
//! Shader scripts are plain text with two nesting depths:
//!
//! ```text
//! textures/alice/floor1
//! {
//!     surfaceparm nolightmap
//!     cull disable
//!     {
//!         map textures/alice/floor1.tga
//!         blendFunc blend
//!         rgbGen identity
//!     }
//! }
//! ```
//!
//! The outer block holds per-material render state, each inner block one
//! texture stage. [`parse`] turns a whole script file into a name-keyed map
//! of [`Shader`] values. Keywords the parser does not interpret are retained
//! verbatim so callers can still inspect them.
//!
//! These are material definitions, not GPU programs; the name is the games'
//! own terminology.

mod parse;

use std::collections::HashSet;

pub use self::parse::parse;

bitflags! {
    /// Boolean material properties set by bare shader-level keywords.
    pub struct ShaderFlags: u32 {
        const SKY = 1 << 0;
        const PORTAL = 1 << 1;
        const PORTAL_SKY = 1 << 2;
        const NO_PICMIP = 1 << 3;
        const NO_MIPMAP = 1 << 4;
        const NO_FOG = 1 << 5;
        const NO_COMPRESS = 1 << 6;
        const ENTITY_MERGABLE = 1 << 7;
        const POLYGON_OFFSET = 1 << 8;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CullMode {
    Front,
    Back,
    None,
}

/// Draw-order bucket. Scripts give either a named bucket or a bare number.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
    Portal,
    Sky,
    Opaque,
    Banner,
    Underwater,
    Additive,
    Nearest,
    Explicit(i32),
}

impl Sort {
    pub fn from_token(token: &str) -> Sort {
        match &*token.to_lowercase() {
            "portal" => Sort::Portal,
            "sky" => Sort::Sky,
            "opaque" => Sort::Opaque,
            "banner" => Sort::Banner,
            "underwater" => Sort::Underwater,
            "additive" => Sort::Additive,
            "nearest" => Sort::Nearest,
            other => match other.parse() {
                Ok(n) => Sort::Explicit(n),
                Err(_) => Sort::Opaque,
            },
        }
    }

    /// The numeric bucket used for draw-order comparison.
    pub fn bucket(self) -> i32 {
        match self {
            Sort::Portal => 1,
            Sort::Sky => 2,
            Sort::Opaque => 3,
            Sort::Banner => 6,
            Sort::Underwater => 8,
            Sort::Additive => 9,
            Sort::Nearest => 16,
            Sort::Explicit(n) => n,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlendFactor {
    One,
    Zero,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSaturate,
}

impl BlendFactor {
    /// Maps a `GL_*` script token to a factor. Unknown tokens are logged and
    /// treated as `One`, which keeps a bad stage visible instead of black.
    pub fn from_token(token: &str) -> BlendFactor {
        match &*token.to_uppercase() {
            "GL_ONE" => BlendFactor::One,
            "GL_ZERO" => BlendFactor::Zero,
            "GL_SRC_COLOR" => BlendFactor::SrcColor,
            "GL_ONE_MINUS_SRC_COLOR" => BlendFactor::OneMinusSrcColor,
            "GL_DST_COLOR" => BlendFactor::DstColor,
            "GL_ONE_MINUS_DST_COLOR" => BlendFactor::OneMinusDstColor,
            "GL_SRC_ALPHA" => BlendFactor::SrcAlpha,
            "GL_ONE_MINUS_SRC_ALPHA" => BlendFactor::OneMinusSrcAlpha,
            "GL_DST_ALPHA" => BlendFactor::DstAlpha,
            "GL_ONE_MINUS_DST_ALPHA" => BlendFactor::OneMinusDstAlpha,
            "GL_SRC_ALPHA_SATURATE" => BlendFactor::SrcAlphaSaturate,
            other => {
                warn!("Unknown blend factor {:?}", other);
                BlendFactor::One
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DepthFunc {
    LessEqual,
    Equal,
    /// `nodepthtest`: the stage draws regardless of depth.
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlphaFunc {
    Gt0,
    Lt128,
    Ge128,
    /// `alphaTest` with an explicit normalized threshold (FAKK extension).
    Threshold(f32),
}

/// Periodic function used to animate shader parameters over time.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    pub func: String,
    pub base: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub frequency: f32,
}

/// Texture-coordinate modifier, applied in script order.
#[derive(Clone, Debug, PartialEq)]
pub enum TcMod {
    Rotate { degrees_per_second: f32 },
    Scale { s: f32, t: f32 },
    Scroll { s: f32, t: f32 },
    Stretch { waveform: Waveform },
    Turb { base: f32, amplitude: f32, phase: f32, frequency: f32 },
}

/// Vertex deformation. Only the `wave` form carries data the decoder
/// interprets.
#[derive(Clone, Debug, PartialEq)]
pub enum Deform {
    Wave { spread: f32, waveform: Waveform },
}

/// One texture-blend layer of a shader.
#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    /// Texture path, `$lightmap`, or `anim` when `anim_maps` is used.
    pub map: Option<String>,
    pub clamp: bool,
    pub anim_frequency: f32,
    pub anim_maps: Vec<String>,
    pub blend_src: BlendFactor,
    pub blend_dst: BlendFactor,
    pub has_blend_func: bool,
    pub alpha_func: Option<AlphaFunc>,
    pub rgb_gen: String,
    pub rgb_waveform: Option<Waveform>,
    pub alpha_gen: String,
    pub alpha_waveform: Option<Waveform>,
    pub tc_gen: String,
    pub tc_mods: Vec<TcMod>,
    pub depth_func: DepthFunc,
    pub depth_write: bool,
    pub depth_write_override: bool,
    pub detail: bool,
    /// Lines whose keyword the parser does not interpret, kept verbatim.
    pub raw_lines: Vec<String>,
}

impl Stage {
    pub fn new() -> Stage {
        Stage {
            map: None,
            clamp: false,
            anim_frequency: 0.0,
            anim_maps: Vec::new(),
            blend_src: BlendFactor::One,
            blend_dst: BlendFactor::Zero,
            has_blend_func: false,
            alpha_func: None,
            rgb_gen: "identity".to_string(),
            rgb_waveform: None,
            alpha_gen: "base".to_string(),
            alpha_waveform: None,
            tc_gen: "base".to_string(),
            tc_mods: Vec::new(),
            depth_func: DepthFunc::LessEqual,
            depth_write: true,
            depth_write_override: false,
            detail: false,
            raw_lines: Vec::new(),
        }
    }

    /// Whether this stage samples the surface's lightmap rather than a
    /// texture file.
    pub fn is_lightmap(&self) -> bool {
        self.map.as_ref().map(|m| m == "$lightmap").unwrap_or(false)
    }
}

impl Default for Stage {
    fn default() -> Stage {
        Stage::new()
    }
}

/// One parsed material definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Shader {
    pub name: String,
    pub cull: CullMode,
    pub sort: Sort,
    pub surface_parms: HashSet<String>,
    pub flags: ShaderFlags,
    pub deforms: Vec<Deform>,
    /// Shader-level lines whose keyword the parser does not interpret.
    pub raw_params: Vec<String>,
    pub stages: Vec<Stage>,
}

impl Shader {
    pub fn new(name: String) -> Shader {
        Shader {
            name,
            cull: CullMode::Front,
            sort: Sort::Opaque,
            surface_parms: HashSet::new(),
            flags: ShaderFlags::empty(),
            deforms: Vec::new(),
            raw_params: Vec::new(),
            stages: Vec::new(),
        }
    }
}

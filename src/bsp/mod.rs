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

//! BSP file decoding for the three supported engine variants.
//!
//! # File Format
//!
//! A BSP file opens with a 4-byte ASCII magic tag and a little-endian `u32`
//! version. Three (tag, version) pairs are recognized:
//!
//! | tag    | version | game   | checksum | directory entries |
//! |--------|---------|--------|----------|-------------------|
//! | `IBSP` | 47      | RTCW   | no       | 17                |
//! | `FAKK` | 12      | FAKK2  | yes      | 20                |
//! | `FAKK` | 42      | Alice  | yes      | 20                |
//!
//! The `FAKK` family carries an extra `u32` checksum between the version and
//! the directory. The directory is a fixed-size table of `(offset, length)`
//! `u32` pairs, one per lump, in an order that differs between the `IBSP`
//! and `FAKK` families (see the lump-id tables in `load`).
//!
//! Every lump except the entity text and the visibility data is an array of
//! fixed-stride records. Two strides are variant-dependent: the `FAKK`
//! variants append a `u32` subdivision hint to the 72-byte shader record and
//! an `f32` subdivision size to the 104-byte surface record. Strings inside
//! records are fixed-width, NUL-terminated ASCII.
//!
//! An unrecognized (tag, version) pair is not an error: [`load`] returns a
//! header-only [`Bsp`] and lets the caller decide what to do with it. Lump
//! bounds that overrun the file, or lump lengths that are not an exact
//! multiple of their record stride, indicate a corrupt directory and fail
//! the whole decode.

mod entity;
mod load;

use cgmath::{Vector2, Vector3};

pub use self::entity::{parse_entities, Entity, EntityValue};
pub use self::load::load;

/// Width of the fixed shader/fog name field in binary records.
pub const NAME_LEN: usize = 64;

/// Format variant, classified from the header's (magic, version) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BspVariant {
    /// Return to Castle Wolfenstein: `IBSP` version 47.
    Rtcw,
    /// Heavy Metal F.A.K.K.2: `FAKK` version 12.
    Fakk2,
    /// American McGee's Alice: `FAKK` version 42.
    Alice,
}

impl BspVariant {
    pub fn classify(magic: &str, version: u32) -> Option<BspVariant> {
        match (magic, version) {
            ("IBSP", 47) => Some(BspVariant::Rtcw),
            ("FAKK", 12) => Some(BspVariant::Fakk2),
            ("FAKK", 42) => Some(BspVariant::Alice),
            _ => None,
        }
    }

    /// Number of lump directory entries following the header.
    pub fn directory_len(self) -> usize {
        match self {
            BspVariant::Rtcw => 17,
            BspVariant::Fakk2 | BspVariant::Alice => 20,
        }
    }

    /// Whether shader and surface records carry the trailing subdivision
    /// fields of the 20-lump variants.
    pub fn has_subdivisions(self) -> bool {
        match self {
            BspVariant::Rtcw => false,
            BspVariant::Fakk2 | BspVariant::Alice => true,
        }
    }
}

/// One lump's extent within the source buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BspDirEntry {
    pub offset: u32,
    pub length: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspHeader {
    pub magic: String,
    pub version: u32,
    /// Present for the `FAKK` magic family only.
    pub checksum: Option<u32>,
    /// Empty when the (magic, version) pair is unrecognized.
    pub directories: Vec<BspDirEntry>,
}

impl BspHeader {
    pub fn variant(&self) -> Option<BspVariant> {
        BspVariant::classify(&self.magic, self.version)
    }
}

/// Shader reference from the binary shader lump.
///
/// `surfaces`, `index_offset` and `index_count` are not part of the file
/// format; they are scratch space for the caller's scene assembly (which
/// surfaces ended up referencing this shader, and where their merged index
/// range landed) and are left empty/zero by the decoder.
#[derive(Clone, Debug, PartialEq)]
pub struct BspShader {
    pub name: String,
    pub surface_flags: u32,
    pub content_flags: u32,
    /// Patch subdivision hint; 0 in the 17-lump variant.
    pub subdivisions: u32,
    pub surfaces: Vec<usize>,
    pub index_offset: usize,
    pub index_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspPlane {
    pub normal: Vector3<f32>,
    pub dist: f32,
}

/// Tag describing how a surface's vertex and index ranges are to be
/// interpreted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, FromPrimitive)]
pub enum BspSurfaceKind {
    Bad = 0,
    Planar = 1,
    Patch = 2,
    TriangleSoup = 3,
    Flare = 4,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspSurface {
    pub shader_id: u32,
    pub fog_id: i32,
    pub kind: BspSurfaceKind,
    pub first_vert: u32,
    pub vert_count: u32,
    pub first_index: u32,
    pub index_count: u32,
    pub lightmap_id: u32,
    pub lightmap_x: u32,
    pub lightmap_y: u32,
    pub lightmap_width: u32,
    pub lightmap_height: u32,
    pub lightmap_origin: Vector3<f32>,
    pub lightmap_vecs: [Vector3<f32>; 3],
    /// Control grid dimensions; only meaningful when `kind` is `Patch`.
    pub patch_width: u32,
    pub patch_height: u32,
    /// Patch subdivision size; 0 in the 17-lump variant.
    pub subdivisions: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspVertex {
    pub position: Vector3<f32>,
    pub tex_coord: Vector2<f32>,
    pub lightmap_coord: Vector2<f32>,
    pub normal: Vector3<f32>,
    pub color: [u8; 4],
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspLeaf {
    pub cluster: i32,
    pub area: i32,
    pub min: [i32; 3],
    pub max: [i32; 3],
    pub first_leaf_surface: u32,
    pub leaf_surface_count: u32,
    pub first_leaf_brush: u32,
    pub leaf_brush_count: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspNode {
    pub plane_id: i32,
    pub children: [i32; 2],
    pub min: [i32; 3],
    pub max: [i32; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspBrushSide {
    pub plane_id: i32,
    pub shader_id: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspBrush {
    pub first_side: i32,
    pub side_count: i32,
    pub shader_id: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspFog {
    pub shader: String,
    pub brush_id: i32,
    pub visible_side: i32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BspModel {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
    pub first_surface: i32,
    pub surface_count: i32,
    pub first_brush: i32,
    pub brush_count: i32,
}

/// Spherical light placed by the map compiler (`FAKK` variants only).
#[derive(Clone, Debug, PartialEq)]
pub struct BspLight {
    pub origin: Vector3<f32>,
    pub color: Vector3<f32>,
    pub intensity: f32,
    pub leaf: i32,
    pub needs_trace: i32,
    pub spot_light: i32,
    pub spot_dir: Vector3<f32>,
    pub spot_radius_by_distance: f32,
    pub unknown: i32,
}

/// Per-surface lighting parameters (`FAKK` variants only).
#[derive(Clone, Debug, PartialEq)]
pub struct BspLightDef {
    pub intensity: i32,
    pub angle: i32,
    pub lightmap_resolution: i32,
    pub two_sided: bool,
    pub linear: bool,
    pub color: Vector3<f32>,
    pub falloff: f32,
    pub backsplash_fraction: f32,
    pub backsplash_distance: f32,
    pub subdivide: f32,
    pub autosprite: bool,
}

/// Potentially-visible-set data. Absent when the visibility lump holds no
/// payload (length of 8 bytes or less).
#[derive(Clone, Debug, PartialEq)]
pub struct BspVisibility {
    pub cluster_count: i32,
    pub bytes_per_cluster: i32,
    pub data: Vec<u8>,
}

/// A fully decoded scene. Owned by the caller; the decoder keeps nothing.
///
/// Lumps that a variant does not provide (or that the decoder does not read,
/// such as lightmap pixels) are left empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Bsp {
    pub header: BspHeader,
    pub shaders: Vec<BspShader>,
    pub planes: Vec<BspPlane>,
    pub surfaces: Vec<BspSurface>,
    pub vertices: Vec<BspVertex>,
    pub indices: Vec<u32>,
    pub leaf_brushes: Vec<u32>,
    pub leaf_surfaces: Vec<u32>,
    pub leafs: Vec<BspLeaf>,
    pub nodes: Vec<BspNode>,
    pub brush_sides: Vec<BspBrushSide>,
    pub brushes: Vec<BspBrush>,
    pub fogs: Vec<BspFog>,
    pub models: Vec<BspModel>,
    pub entities: Vec<Entity>,
    pub visibility: Option<BspVisibility>,
    pub lights: Vec<BspLight>,
    pub light_vis: Vec<i32>,
    pub light_defs: Vec<BspLightDef>,
}

impl Bsp {
    /// An empty scene carrying only the header, returned for files whose
    /// format is not recognized.
    pub(crate) fn with_header(header: BspHeader) -> Bsp {
        Bsp {
            header,
            shaders: Vec::new(),
            planes: Vec::new(),
            surfaces: Vec::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            leaf_brushes: Vec::new(),
            leaf_surfaces: Vec::new(),
            leafs: Vec::new(),
            nodes: Vec::new(),
            brush_sides: Vec::new(),
            brushes: Vec::new(),
            fogs: Vec::new(),
            models: Vec::new(),
            entities: Vec::new(),
            visibility: None,
            lights: Vec::new(),
            light_vis: Vec::new(),
            light_defs: Vec::new(),
        }
    }
}

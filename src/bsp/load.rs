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

use std::io::{Cursor, Read};

use crate::bsp::entity::parse_entities;
use crate::bsp::{
    Bsp, BspBrush, BspBrushSide, BspDirEntry, BspFog, BspHeader, BspLeaf, BspLight, BspLightDef,
    BspModel, BspNode, BspPlane, BspShader, BspSurface, BspSurfaceKind, BspVariant, BspVertex,
    BspVisibility, NAME_LEN,
};

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::{Vector2, Vector3};
use failure::Error;
use num::FromPrimitive;

const DIR_ENTRY_SIZE: usize = 8;

const SHADER_SIZE: usize = 72;
const SHADER_SIZE_SUBDIV: usize = 76;
const PLANE_SIZE: usize = 16;
const SURFACE_SIZE: usize = 104;
const SURFACE_SIZE_SUBDIV: usize = 108;
const VERTEX_SIZE: usize = 44;
const LEAF_SIZE: usize = 48;
const NODE_SIZE: usize = 36;
const BRUSH_SIDE_SIZE: usize = 8;
const BRUSH_SIZE: usize = 12;
const FOG_SIZE: usize = 72;
const MODEL_SIZE: usize = 40;
const LIGHT_SIZE: usize = 60;
const LIGHT_DEF_SIZE: usize = 52;
const INDEX_SIZE: usize = 4;

// Lump directory order of the FAKK family (FAKK2 and Alice).
enum FakkLumpId {
    Shaders = 0,
    Planes = 1,
    _Lightmaps = 2,
    Surfaces = 3,
    DrawVerts = 4,
    DrawIndices = 5,
    LeafBrushes = 6,
    LeafSurfaces = 7,
    Leafs = 8,
    Nodes = 9,
    BrushSides = 10,
    Brushes = 11,
    Fogs = 12,
    Models = 13,
    Entities = 14,
    Visibility = 15,
    _LightGrid = 16,
    Lights = 17,
    LightVis = 18,
    LightDefs = 19,
}

// Lump directory order of RTCW.
enum RtcwLumpId {
    Entities = 0,
    Shaders = 1,
    Planes = 2,
    _Nodes = 3,
    _Leafs = 4,
    _LeafSurfaces = 5,
    _LeafBrushes = 6,
    _Models = 7,
    _Brushes = 8,
    _BrushSides = 9,
    DrawVerts = 10,
    DrawIndices = 11,
    _Fogs = 12,
    Surfaces = 13,
    _Lightmaps = 14,
    _LightGrid = 15,
    _Visibility = 16,
}

/// Decodes a BSP file from a byte buffer.
///
/// An unrecognized (magic, version) pair yields a header-only scene rather
/// than an error. Directory entries that overrun the buffer or whose length
/// is not a whole number of records fail the decode.
pub fn load(data: &[u8]) -> Result<Bsp, Error> {
    let header = load_header(data)?;

    let variant = match header.variant() {
        Some(v) => v,
        None => {
            warn!(
                "Unrecognized BSP format: magic {:?} version {}",
                header.magic, header.version
            );
            return Ok(Bsp::with_header(header));
        }
    };

    match variant {
        BspVariant::Rtcw => load_rtcw(header, data),
        BspVariant::Fakk2 | BspVariant::Alice => load_fakk(header, data, variant),
    }
}

fn load_header(data: &[u8]) -> Result<BspHeader, Error> {
    ensure!(
        data.len() >= 8,
        "File too short for a BSP header ({} bytes)",
        data.len()
    );

    let mut reader = Cursor::new(data);

    let mut magic_bytes = [0u8; 4];
    reader.read_exact(&mut magic_bytes)?;
    let magic = String::from_utf8_lossy(&magic_bytes).into_owned();
    let version = reader.read_u32::<LittleEndian>()?;

    // The FAKK family carries a checksum between the version and the
    // directory. Read tolerantly: a truncated file with an unknown FAKK
    // version must still produce a header-only result.
    let checksum = if &magic_bytes == b"FAKK" {
        reader.read_u32::<LittleEndian>().ok()
    } else {
        None
    };

    let mut directories = Vec::new();
    if let Some(variant) = BspVariant::classify(&magic, version) {
        let dir_len = variant.directory_len();
        let dir_end = reader.position() as usize + dir_len * DIR_ENTRY_SIZE;
        ensure!(
            dir_end <= data.len(),
            "Lump directory overruns file ({} entries need {} bytes, file has {})",
            dir_len,
            dir_end,
            data.len()
        );

        for id in 0..dir_len {
            let offset = reader.read_u32::<LittleEndian>()?;
            let length = reader.read_u32::<LittleEndian>()?;
            debug!(
                "lump {: >2}: Offset = 0x{:>08x} | Size = 0x{:>08x}",
                id, offset, length
            );
            directories.push(BspDirEntry { offset, length });
        }
    }

    Ok(BspHeader {
        magic,
        version,
        checksum,
        directories,
    })
}

fn load_rtcw(header: BspHeader, data: &[u8]) -> Result<Bsp, Error> {
    let dirs = &header.directories;
    let variant = BspVariant::Rtcw;

    let shaders = load_shaders(data, &dirs[RtcwLumpId::Shaders as usize], variant)?;
    let surfaces = load_surfaces(data, &dirs[RtcwLumpId::Surfaces as usize], variant)?;
    let vertices = load_vertices(data, &dirs[RtcwLumpId::DrawVerts as usize])?;
    let indices = load_u32_lump(data, &dirs[RtcwLumpId::DrawIndices as usize], "draw index")?;
    let entities = load_entity_lump(data, &dirs[RtcwLumpId::Entities as usize])?;
    let planes = load_planes(data, &dirs[RtcwLumpId::Planes as usize])?;

    let mut bsp = Bsp::with_header(header);
    bsp.shaders = shaders;
    bsp.surfaces = surfaces;
    bsp.vertices = vertices;
    bsp.indices = indices;
    bsp.entities = entities;
    bsp.planes = planes;
    Ok(bsp)
}

fn load_fakk(header: BspHeader, data: &[u8], variant: BspVariant) -> Result<Bsp, Error> {
    let dirs = &header.directories;

    let shaders = load_shaders(data, &dirs[FakkLumpId::Shaders as usize], variant)?;
    let surfaces = load_surfaces(data, &dirs[FakkLumpId::Surfaces as usize], variant)?;
    let vertices = load_vertices(data, &dirs[FakkLumpId::DrawVerts as usize])?;
    let indices = load_u32_lump(data, &dirs[FakkLumpId::DrawIndices as usize], "draw index")?;

    let planes = load_planes(data, &dirs[FakkLumpId::Planes as usize])?;
    let leaf_brushes = load_u32_lump(data, &dirs[FakkLumpId::LeafBrushes as usize], "leaf brush")?;
    let leaf_surfaces = load_u32_lump(
        data,
        &dirs[FakkLumpId::LeafSurfaces as usize],
        "leaf surface",
    )?;
    let leafs = load_leafs(data, &dirs[FakkLumpId::Leafs as usize])?;
    let nodes = load_nodes(data, &dirs[FakkLumpId::Nodes as usize])?;
    let brush_sides = load_brush_sides(data, &dirs[FakkLumpId::BrushSides as usize])?;
    let brushes = load_brushes(data, &dirs[FakkLumpId::Brushes as usize])?;
    let fogs = load_fogs(data, &dirs[FakkLumpId::Fogs as usize])?;
    let models = load_models(data, &dirs[FakkLumpId::Models as usize])?;
    let entities = load_entity_lump(data, &dirs[FakkLumpId::Entities as usize])?;
    let visibility = load_visibility(data, &dirs[FakkLumpId::Visibility as usize])?;

    let lights = load_lights(data, &dirs[FakkLumpId::Lights as usize])?;
    let light_vis = load_i32_lump(data, &dirs[FakkLumpId::LightVis as usize], "light vis")?;
    let light_defs = load_light_defs(data, &dirs[FakkLumpId::LightDefs as usize])?;

    let mut bsp = Bsp::with_header(header);
    bsp.shaders = shaders;
    bsp.planes = planes;
    bsp.surfaces = surfaces;
    bsp.vertices = vertices;
    bsp.indices = indices;
    bsp.leaf_brushes = leaf_brushes;
    bsp.leaf_surfaces = leaf_surfaces;
    bsp.leafs = leafs;
    bsp.nodes = nodes;
    bsp.brush_sides = brush_sides;
    bsp.brushes = brushes;
    bsp.fogs = fogs;
    bsp.models = models;
    bsp.entities = entities;
    bsp.visibility = visibility;
    bsp.lights = lights;
    bsp.light_vis = light_vis;
    bsp.light_defs = light_defs;
    Ok(bsp)
}

/// Validates a lump's extent against the buffer and its record stride, and
/// returns a reader over the lump along with the record count.
fn lump_reader<'a>(
    data: &'a [u8],
    entry: &BspDirEntry,
    stride: usize,
    what: &'static str,
) -> Result<(Cursor<&'a [u8]>, usize), Error> {
    let offset = entry.offset as usize;
    let length = entry.length as usize;
    let end = entry.offset as u64 + entry.length as u64;

    ensure!(
        end <= data.len() as u64,
        "{} lump [0x{:x}..0x{:x}] overruns file of {} bytes",
        what,
        offset,
        end,
        data.len()
    );
    ensure!(
        length % stride == 0,
        "{} lump length {} is not a multiple of the record size {}",
        what,
        length,
        stride
    );

    Ok((
        Cursor::new(&data[offset..offset + length]),
        length / stride,
    ))
}

fn lump_slice<'a>(data: &'a [u8], entry: &BspDirEntry, what: &'static str) -> Result<&'a [u8], Error> {
    let offset = entry.offset as usize;
    let end = entry.offset as u64 + entry.length as u64;
    ensure!(
        end <= data.len() as u64,
        "{} lump [0x{:x}..0x{:x}] overruns file of {} bytes",
        what,
        offset,
        end,
        data.len()
    );
    Ok(&data[offset..offset + entry.length as usize])
}

fn load_fixed_string<R>(reader: &mut R, width: usize) -> Result<String, Error>
where
    R: Read,
{
    let mut bytes = vec![0u8; width];
    reader.read_exact(&mut bytes)?;
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(width);
    // Shipped maps occasionally carry non-UTF-8 bytes in names; decode
    // tolerantly rather than failing the whole file.
    Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
}

fn load_vector3<R>(reader: &mut R) -> Result<Vector3<f32>, Error>
where
    R: ReadBytesExt,
{
    Ok(Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn load_vector2<R>(reader: &mut R) -> Result<Vector2<f32>, Error>
where
    R: ReadBytesExt,
{
    Ok(Vector2::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn load_shaders(
    data: &[u8],
    entry: &BspDirEntry,
    variant: BspVariant,
) -> Result<Vec<BspShader>, Error> {
    let stride = if variant.has_subdivisions() {
        SHADER_SIZE_SUBDIV
    } else {
        SHADER_SIZE
    };
    let (mut reader, count) = lump_reader(data, entry, stride, "shader")?;

    let mut shaders = Vec::with_capacity(count);
    for _ in 0..count {
        let name = load_fixed_string(&mut reader, NAME_LEN)?;
        let surface_flags = reader.read_u32::<LittleEndian>()?;
        let content_flags = reader.read_u32::<LittleEndian>()?;
        let subdivisions = if variant.has_subdivisions() {
            reader.read_u32::<LittleEndian>()?
        } else {
            0
        };

        shaders.push(BspShader {
            name,
            surface_flags,
            content_flags,
            subdivisions,
            surfaces: Vec::new(),
            index_offset: 0,
            index_count: 0,
        });
    }

    Ok(shaders)
}

fn load_planes(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspPlane>, Error> {
    let (mut reader, count) = lump_reader(data, entry, PLANE_SIZE, "plane")?;

    let mut planes = Vec::with_capacity(count);
    for _ in 0..count {
        planes.push(BspPlane {
            normal: load_vector3(&mut reader)?,
            dist: reader.read_f32::<LittleEndian>()?,
        });
    }

    Ok(planes)
}

fn load_surfaces(
    data: &[u8],
    entry: &BspDirEntry,
    variant: BspVariant,
) -> Result<Vec<BspSurface>, Error> {
    let stride = if variant.has_subdivisions() {
        SURFACE_SIZE_SUBDIV
    } else {
        SURFACE_SIZE
    };
    let (mut reader, count) = lump_reader(data, entry, stride, "surface")?;

    let mut surfaces = Vec::with_capacity(count);
    for _ in 0..count {
        let shader_id = reader.read_u32::<LittleEndian>()?;
        let fog_id = reader.read_i32::<LittleEndian>()?;

        let kind_tag = reader.read_u32::<LittleEndian>()?;
        let kind = match BspSurfaceKind::from_u32(kind_tag) {
            Some(k) => k,
            None => {
                warn!("Unknown surface type {}", kind_tag);
                BspSurfaceKind::Bad
            }
        };

        let first_vert = reader.read_u32::<LittleEndian>()?;
        let vert_count = reader.read_u32::<LittleEndian>()?;
        let first_index = reader.read_u32::<LittleEndian>()?;
        let index_count = reader.read_u32::<LittleEndian>()?;
        let lightmap_id = reader.read_u32::<LittleEndian>()?;
        let lightmap_x = reader.read_u32::<LittleEndian>()?;
        let lightmap_y = reader.read_u32::<LittleEndian>()?;
        let lightmap_width = reader.read_u32::<LittleEndian>()?;
        let lightmap_height = reader.read_u32::<LittleEndian>()?;
        let lightmap_origin = load_vector3(&mut reader)?;
        let lightmap_vecs = [
            load_vector3(&mut reader)?,
            load_vector3(&mut reader)?,
            load_vector3(&mut reader)?,
        ];
        let patch_width = reader.read_u32::<LittleEndian>()?;
        let patch_height = reader.read_u32::<LittleEndian>()?;
        let subdivisions = if variant.has_subdivisions() {
            reader.read_f32::<LittleEndian>()?
        } else {
            0.0
        };

        surfaces.push(BspSurface {
            shader_id,
            fog_id,
            kind,
            first_vert,
            vert_count,
            first_index,
            index_count,
            lightmap_id,
            lightmap_x,
            lightmap_y,
            lightmap_width,
            lightmap_height,
            lightmap_origin,
            lightmap_vecs,
            patch_width,
            patch_height,
            subdivisions,
        });
    }

    Ok(surfaces)
}

fn load_vertices(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspVertex>, Error> {
    let (mut reader, count) = lump_reader(data, entry, VERTEX_SIZE, "vertex")?;

    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        let position = load_vector3(&mut reader)?;
        let tex_coord = load_vector2(&mut reader)?;
        let lightmap_coord = load_vector2(&mut reader)?;
        let normal = load_vector3(&mut reader)?;
        let mut color = [0u8; 4];
        reader.read_exact(&mut color)?;

        vertices.push(BspVertex {
            position,
            tex_coord,
            lightmap_coord,
            normal,
            color,
        });
    }

    Ok(vertices)
}

fn load_leafs(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspLeaf>, Error> {
    let (mut reader, count) = lump_reader(data, entry, LEAF_SIZE, "leaf")?;

    let mut leafs = Vec::with_capacity(count);
    for _ in 0..count {
        leafs.push(BspLeaf {
            cluster: reader.read_i32::<LittleEndian>()?,
            area: reader.read_i32::<LittleEndian>()?,
            min: load_i32_3(&mut reader)?,
            max: load_i32_3(&mut reader)?,
            first_leaf_surface: reader.read_u32::<LittleEndian>()?,
            leaf_surface_count: reader.read_u32::<LittleEndian>()?,
            first_leaf_brush: reader.read_u32::<LittleEndian>()?,
            leaf_brush_count: reader.read_u32::<LittleEndian>()?,
        });
    }

    Ok(leafs)
}

fn load_i32_3<R>(reader: &mut R) -> Result<[i32; 3], Error>
where
    R: ReadBytesExt,
{
    Ok([
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
        reader.read_i32::<LittleEndian>()?,
    ])
}

fn load_nodes(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspNode>, Error> {
    let (mut reader, count) = lump_reader(data, entry, NODE_SIZE, "node")?;

    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        nodes.push(BspNode {
            plane_id: reader.read_i32::<LittleEndian>()?,
            children: [
                reader.read_i32::<LittleEndian>()?,
                reader.read_i32::<LittleEndian>()?,
            ],
            min: load_i32_3(&mut reader)?,
            max: load_i32_3(&mut reader)?,
        });
    }

    Ok(nodes)
}

fn load_brush_sides(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspBrushSide>, Error> {
    let (mut reader, count) = lump_reader(data, entry, BRUSH_SIDE_SIZE, "brush side")?;

    let mut sides = Vec::with_capacity(count);
    for _ in 0..count {
        sides.push(BspBrushSide {
            plane_id: reader.read_i32::<LittleEndian>()?,
            shader_id: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(sides)
}

fn load_brushes(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspBrush>, Error> {
    let (mut reader, count) = lump_reader(data, entry, BRUSH_SIZE, "brush")?;

    let mut brushes = Vec::with_capacity(count);
    for _ in 0..count {
        brushes.push(BspBrush {
            first_side: reader.read_i32::<LittleEndian>()?,
            side_count: reader.read_i32::<LittleEndian>()?,
            shader_id: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(brushes)
}

fn load_fogs(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspFog>, Error> {
    let (mut reader, count) = lump_reader(data, entry, FOG_SIZE, "fog")?;

    let mut fogs = Vec::with_capacity(count);
    for _ in 0..count {
        fogs.push(BspFog {
            shader: load_fixed_string(&mut reader, NAME_LEN)?,
            brush_id: reader.read_i32::<LittleEndian>()?,
            visible_side: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(fogs)
}

fn load_models(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspModel>, Error> {
    let (mut reader, count) = lump_reader(data, entry, MODEL_SIZE, "model")?;

    let mut models = Vec::with_capacity(count);
    for _ in 0..count {
        models.push(BspModel {
            min: load_vector3(&mut reader)?,
            max: load_vector3(&mut reader)?,
            first_surface: reader.read_i32::<LittleEndian>()?,
            surface_count: reader.read_i32::<LittleEndian>()?,
            first_brush: reader.read_i32::<LittleEndian>()?,
            brush_count: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(models)
}

fn load_lights(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspLight>, Error> {
    let (mut reader, count) = lump_reader(data, entry, LIGHT_SIZE, "light")?;

    let mut lights = Vec::with_capacity(count);
    for _ in 0..count {
        lights.push(BspLight {
            origin: load_vector3(&mut reader)?,
            color: load_vector3(&mut reader)?,
            intensity: reader.read_f32::<LittleEndian>()?,
            leaf: reader.read_i32::<LittleEndian>()?,
            needs_trace: reader.read_i32::<LittleEndian>()?,
            spot_light: reader.read_i32::<LittleEndian>()?,
            spot_dir: load_vector3(&mut reader)?,
            spot_radius_by_distance: reader.read_f32::<LittleEndian>()?,
            unknown: reader.read_i32::<LittleEndian>()?,
        });
    }

    Ok(lights)
}

fn load_light_defs(data: &[u8], entry: &BspDirEntry) -> Result<Vec<BspLightDef>, Error> {
    let (mut reader, count) = lump_reader(data, entry, LIGHT_DEF_SIZE, "light def")?;

    let mut defs = Vec::with_capacity(count);
    for _ in 0..count {
        defs.push(BspLightDef {
            intensity: reader.read_i32::<LittleEndian>()?,
            angle: reader.read_i32::<LittleEndian>()?,
            lightmap_resolution: reader.read_i32::<LittleEndian>()?,
            two_sided: reader.read_i32::<LittleEndian>()? != 0,
            linear: reader.read_i32::<LittleEndian>()? != 0,
            color: load_vector3(&mut reader)?,
            falloff: reader.read_f32::<LittleEndian>()?,
            backsplash_fraction: reader.read_f32::<LittleEndian>()?,
            backsplash_distance: reader.read_f32::<LittleEndian>()?,
            subdivide: reader.read_f32::<LittleEndian>()?,
            autosprite: reader.read_i32::<LittleEndian>()? != 0,
        });
    }

    Ok(defs)
}

fn load_u32_lump(
    data: &[u8],
    entry: &BspDirEntry,
    what: &'static str,
) -> Result<Vec<u32>, Error> {
    let (mut reader, count) = lump_reader(data, entry, INDEX_SIZE, what)?;

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(reader.read_u32::<LittleEndian>()?);
    }

    Ok(values)
}

fn load_i32_lump(
    data: &[u8],
    entry: &BspDirEntry,
    what: &'static str,
) -> Result<Vec<i32>, Error> {
    let (mut reader, count) = lump_reader(data, entry, INDEX_SIZE, what)?;

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(reader.read_i32::<LittleEndian>()?);
    }

    Ok(values)
}

fn load_visibility(data: &[u8], entry: &BspDirEntry) -> Result<Option<BspVisibility>, Error> {
    // A visibility lump of 8 bytes or less has a header but no bitset.
    if entry.length <= 8 {
        return Ok(None);
    }

    let slice = lump_slice(data, entry, "visibility")?;
    let mut reader = Cursor::new(slice);
    let cluster_count = reader.read_i32::<LittleEndian>()?;
    let bytes_per_cluster = reader.read_i32::<LittleEndian>()?;

    Ok(Some(BspVisibility {
        cluster_count,
        bytes_per_cluster,
        data: slice[8..].to_vec(),
    }))
}

fn load_entity_lump(data: &[u8], entry: &BspDirEntry) -> Result<Vec<crate::bsp::Entity>, Error> {
    let slice = lump_slice(data, entry, "entity")?;
    // The lump is a NUL-terminated C string; drop the terminator and any
    // padding behind it.
    let len = slice.iter().position(|&b| b == 0).unwrap_or(slice.len());
    let text = String::from_utf8_lossy(&slice[..len]);
    Ok(parse_entities(&text))
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::bsp::EntityValue;

    struct FileBuilder {
        magic: [u8; 4],
        version: u32,
        checksum: Option<u32>,
        lumps: Vec<Vec<u8>>,
    }

    impl FileBuilder {
        fn rtcw() -> FileBuilder {
            FileBuilder {
                magic: *b"IBSP",
                version: 47,
                checksum: None,
                lumps: vec![Vec::new(); 17],
            }
        }

        fn alice() -> FileBuilder {
            FileBuilder {
                magic: *b"FAKK",
                version: 42,
                checksum: Some(0),
                lumps: vec![Vec::new(); 20],
            }
        }

        fn fakk2() -> FileBuilder {
            FileBuilder {
                magic: *b"FAKK",
                version: 12,
                checksum: Some(0),
                lumps: vec![Vec::new(); 20],
            }
        }

        fn lump(mut self, id: usize, bytes: Vec<u8>) -> FileBuilder {
            self.lumps[id] = bytes;
            self
        }

        fn build(self) -> Vec<u8> {
            let mut out = Vec::new();
            out.extend_from_slice(&self.magic);
            out.extend_from_slice(&self.version.to_le_bytes());
            if let Some(sum) = self.checksum {
                out.extend_from_slice(&sum.to_le_bytes());
            }

            let mut offset = out.len() + self.lumps.len() * DIR_ENTRY_SIZE;
            for lump in &self.lumps {
                out.extend_from_slice(&(offset as u32).to_le_bytes());
                out.extend_from_slice(&(lump.len() as u32).to_le_bytes());
                offset += lump.len();
            }
            for lump in &self.lumps {
                out.extend_from_slice(lump);
            }
            out
        }
    }

    fn put_f32(buf: &mut Vec<u8>, v: f32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn plane_bytes(normal: [f32; 3], dist: f32) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &n in &normal {
            put_f32(&mut bytes, n);
        }
        put_f32(&mut bytes, dist);
        bytes
    }

    #[test]
    fn test_rtcw_directory_has_17_entries() {
        let bsp = load(&FileBuilder::rtcw().build()).unwrap();
        assert_eq!(bsp.header.magic, "IBSP");
        assert_eq!(bsp.header.version, 47);
        assert_eq!(bsp.header.checksum, None);
        assert_eq!(bsp.header.directories.len(), 17);
        assert_eq!(bsp.header.variant(), Some(BspVariant::Rtcw));
    }

    #[test]
    fn test_fakk_directories_have_20_entries() {
        let fakk2 = load(&FileBuilder::fakk2().build()).unwrap();
        assert_eq!(fakk2.header.directories.len(), 20);
        assert_eq!(fakk2.header.checksum, Some(0));
        assert_eq!(fakk2.header.variant(), Some(BspVariant::Fakk2));

        let alice = load(&FileBuilder::alice().build()).unwrap();
        assert_eq!(alice.header.directories.len(), 20);
        assert_eq!(alice.header.variant(), Some(BspVariant::Alice));
    }

    #[test]
    fn test_unrecognized_format_yields_header_only() {
        let mut data = Vec::new();
        data.extend_from_slice(b"QBSP");
        put_u32(&mut data, 5);
        // trailing garbage that must not be interpreted as a directory
        data.extend_from_slice(&[0xff; 64]);

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.header.magic, "QBSP");
        assert_eq!(bsp.header.version, 5);
        assert!(bsp.header.directories.is_empty());
        assert!(bsp.shaders.is_empty());
        assert!(bsp.surfaces.is_empty());
        assert!(bsp.entities.is_empty());
        assert!(bsp.visibility.is_none());
    }

    #[test]
    fn test_plane_lump_decodes() {
        let data = FileBuilder::rtcw()
            .lump(
                RtcwLumpId::Planes as usize,
                plane_bytes([0.0, 0.0, 1.0], 64.0),
            )
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.planes.len(), 1);
        assert_eq!(bsp.planes[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(bsp.planes[0].dist, 64.0);
    }

    #[test]
    fn test_shader_lump_name_is_null_terminated() {
        let mut bytes = vec![0u8; SHADER_SIZE_SUBDIV];
        bytes[..13].copy_from_slice(b"textures/base");
        bytes[64..68].copy_from_slice(&3u32.to_le_bytes()); // surface flags
        bytes[68..72].copy_from_slice(&1u32.to_le_bytes()); // content flags
        bytes[72..76].copy_from_slice(&4u32.to_le_bytes()); // subdivisions

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Shaders as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.shaders.len(), 1);
        assert_eq!(bsp.shaders[0].name, "textures/base");
        assert_eq!(bsp.shaders[0].surface_flags, 3);
        assert_eq!(bsp.shaders[0].content_flags, 1);
        assert_eq!(bsp.shaders[0].subdivisions, 4);
        assert!(bsp.shaders[0].surfaces.is_empty());
    }

    #[test]
    fn test_rtcw_shader_stride_has_no_subdivisions() {
        let mut bytes = vec![0u8; SHADER_SIZE];
        bytes[..9].copy_from_slice(b"downstep2");

        let data = FileBuilder::rtcw()
            .lump(RtcwLumpId::Shaders as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.shaders.len(), 1);
        assert_eq!(bsp.shaders[0].subdivisions, 0);
    }

    #[test]
    fn test_vertex_lump_decodes() {
        let mut bytes = Vec::new();
        for &v in &[1.0f32, 2.0, 3.0] {
            put_f32(&mut bytes, v); // position
        }
        put_f32(&mut bytes, 0.5);
        put_f32(&mut bytes, 0.25); // tex coord
        put_f32(&mut bytes, 0.125);
        put_f32(&mut bytes, 0.0625); // lightmap coord
        for &v in &[0.0f32, 0.0, 1.0] {
            put_f32(&mut bytes, v); // normal
        }
        bytes.extend_from_slice(&[10, 20, 30, 255]); // color

        let data = FileBuilder::rtcw()
            .lump(RtcwLumpId::DrawVerts as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.vertices.len(), 1);
        let vert = &bsp.vertices[0];
        assert_eq!(vert.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(vert.tex_coord, Vector2::new(0.5, 0.25));
        assert_eq!(vert.lightmap_coord, Vector2::new(0.125, 0.0625));
        assert_eq!(vert.normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(vert.color, [10, 20, 30, 255]);
    }

    #[test]
    fn test_shader_name_with_invalid_utf8_decodes_lossily() {
        let mut bytes = vec![0u8; SHADER_SIZE_SUBDIV];
        bytes[0] = b't';
        bytes[1] = 0xff;
        bytes[2] = b'g';

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Shaders as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.shaders[0].name, "t\u{fffd}g");
    }

    #[test]
    fn test_leaf_lump_decodes() {
        let mut bytes = Vec::new();
        put_i32(&mut bytes, 3); // cluster
        put_i32(&mut bytes, 1); // area
        for &v in &[-16, -32, -48] {
            put_i32(&mut bytes, v); // min
        }
        for &v in &[16, 32, 48] {
            put_i32(&mut bytes, v); // max
        }
        put_u32(&mut bytes, 7); // first leaf surface
        put_u32(&mut bytes, 2);
        put_u32(&mut bytes, 5); // first leaf brush
        put_u32(&mut bytes, 1);
        assert_eq!(bytes.len(), LEAF_SIZE);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Leafs as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.leafs.len(), 1);
        let leaf = &bsp.leafs[0];
        assert_eq!(leaf.cluster, 3);
        assert_eq!(leaf.area, 1);
        assert_eq!(leaf.min, [-16, -32, -48]);
        assert_eq!(leaf.max, [16, 32, 48]);
        assert_eq!(leaf.first_leaf_surface, 7);
        assert_eq!(leaf.leaf_surface_count, 2);
        assert_eq!(leaf.first_leaf_brush, 5);
        assert_eq!(leaf.leaf_brush_count, 1);
    }

    #[test]
    fn test_node_lump_decodes() {
        let mut bytes = Vec::new();
        put_i32(&mut bytes, 2); // plane
        put_i32(&mut bytes, 1); // front child
        put_i32(&mut bytes, -3); // back child (leaf)
        for &v in &[-128, -128, 0] {
            put_i32(&mut bytes, v);
        }
        for &v in &[128, 128, 256] {
            put_i32(&mut bytes, v);
        }
        assert_eq!(bytes.len(), NODE_SIZE);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Nodes as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.nodes.len(), 1);
        let node = &bsp.nodes[0];
        assert_eq!(node.plane_id, 2);
        assert_eq!(node.children, [1, -3]);
        assert_eq!(node.min, [-128, -128, 0]);
        assert_eq!(node.max, [128, 128, 256]);
    }

    #[test]
    fn test_brush_lumps_decode() {
        let mut side_bytes = Vec::new();
        put_i32(&mut side_bytes, 4); // plane
        put_i32(&mut side_bytes, 2); // shader
        assert_eq!(side_bytes.len(), BRUSH_SIDE_SIZE);

        // side count and shader id differ so a shader read from the wrong
        // offset shows up
        let mut brush_bytes = Vec::new();
        put_i32(&mut brush_bytes, 0); // first side
        put_i32(&mut brush_bytes, 6); // side count
        put_i32(&mut brush_bytes, 2); // shader
        assert_eq!(brush_bytes.len(), BRUSH_SIZE);

        let mut leaf_brush_bytes = Vec::new();
        put_u32(&mut leaf_brush_bytes, 0);
        put_u32(&mut leaf_brush_bytes, 9);
        let mut leaf_surface_bytes = Vec::new();
        put_u32(&mut leaf_surface_bytes, 11);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::BrushSides as usize, side_bytes)
            .lump(FakkLumpId::Brushes as usize, brush_bytes)
            .lump(FakkLumpId::LeafBrushes as usize, leaf_brush_bytes)
            .lump(FakkLumpId::LeafSurfaces as usize, leaf_surface_bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.brush_sides.len(), 1);
        assert_eq!(bsp.brush_sides[0].plane_id, 4);
        assert_eq!(bsp.brush_sides[0].shader_id, 2);

        assert_eq!(bsp.brushes.len(), 1);
        assert_eq!(bsp.brushes[0].first_side, 0);
        assert_eq!(bsp.brushes[0].side_count, 6);
        assert_eq!(bsp.brushes[0].shader_id, 2);

        assert_eq!(bsp.leaf_brushes, vec![0, 9]);
        assert_eq!(bsp.leaf_surfaces, vec![11]);
    }

    #[test]
    fn test_fog_lump_decodes() {
        let mut bytes = vec![0u8; FOG_SIZE];
        bytes[..12].copy_from_slice(b"textures/fog");
        bytes[64..68].copy_from_slice(&4i32.to_le_bytes()); // brush
        bytes[68..72].copy_from_slice(&5i32.to_le_bytes()); // visible side

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Fogs as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.fogs.len(), 1);
        assert_eq!(bsp.fogs[0].shader, "textures/fog");
        assert_eq!(bsp.fogs[0].brush_id, 4);
        assert_eq!(bsp.fogs[0].visible_side, 5);
    }

    #[test]
    fn test_model_lump_decodes() {
        let mut bytes = Vec::new();
        for &v in &[-64.0f32, -64.0, 0.0] {
            put_f32(&mut bytes, v); // min
        }
        for &v in &[64.0f32, 64.0, 128.0] {
            put_f32(&mut bytes, v); // max
        }
        put_i32(&mut bytes, 2); // first surface
        put_i32(&mut bytes, 3);
        put_i32(&mut bytes, 1); // first brush
        put_i32(&mut bytes, 2);
        assert_eq!(bytes.len(), MODEL_SIZE);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Models as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.models.len(), 1);
        let model = &bsp.models[0];
        assert_eq!(model.min, Vector3::new(-64.0, -64.0, 0.0));
        assert_eq!(model.max, Vector3::new(64.0, 64.0, 128.0));
        assert_eq!(model.first_surface, 2);
        assert_eq!(model.surface_count, 3);
        assert_eq!(model.first_brush, 1);
        assert_eq!(model.brush_count, 2);
    }

    #[test]
    fn test_light_lump_decodes() {
        let mut bytes = Vec::new();
        for &v in &[1.0f32, 2.0, 3.0] {
            put_f32(&mut bytes, v); // origin
        }
        for &v in &[0.5f32, 0.25, 1.0] {
            put_f32(&mut bytes, v); // color
        }
        put_f32(&mut bytes, 300.0); // intensity
        put_i32(&mut bytes, 4); // leaf
        put_i32(&mut bytes, 1); // needs trace
        put_i32(&mut bytes, 1); // spot light
        for &v in &[0.0f32, 0.0, -1.0] {
            put_f32(&mut bytes, v); // spot dir
        }
        put_f32(&mut bytes, 0.5); // spot radius by distance
        put_i32(&mut bytes, 7);
        assert_eq!(bytes.len(), LIGHT_SIZE);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::Lights as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.lights.len(), 1);
        let light = &bsp.lights[0];
        assert_eq!(light.origin, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(light.color, Vector3::new(0.5, 0.25, 1.0));
        assert_eq!(light.intensity, 300.0);
        assert_eq!(light.leaf, 4);
        assert_eq!(light.needs_trace, 1);
        assert_eq!(light.spot_light, 1);
        assert_eq!(light.spot_dir, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(light.spot_radius_by_distance, 0.5);
        assert_eq!(light.unknown, 7);
    }

    #[test]
    fn test_light_def_lump_decodes() {
        let mut bytes = Vec::new();
        put_i32(&mut bytes, 100); // intensity
        put_i32(&mut bytes, 45); // angle
        put_i32(&mut bytes, 16); // lightmap resolution
        put_i32(&mut bytes, 1); // two sided
        put_i32(&mut bytes, 0); // linear
        for &v in &[1.0f32, 1.0, 1.0] {
            put_f32(&mut bytes, v); // color
        }
        put_f32(&mut bytes, 1.5); // falloff
        put_f32(&mut bytes, 0.05); // backsplash fraction
        put_f32(&mut bytes, 23.0); // backsplash distance
        put_f32(&mut bytes, 999.0); // subdivide
        put_i32(&mut bytes, 1); // autosprite
        assert_eq!(bytes.len(), LIGHT_DEF_SIZE);

        let data = FileBuilder::alice()
            .lump(FakkLumpId::LightDefs as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.light_defs.len(), 1);
        let def = &bsp.light_defs[0];
        assert_eq!(def.intensity, 100);
        assert_eq!(def.angle, 45);
        assert_eq!(def.lightmap_resolution, 16);
        assert!(def.two_sided);
        assert!(!def.linear);
        assert_eq!(def.color, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(def.falloff, 1.5);
        assert_eq!(def.backsplash_fraction, 0.05);
        assert_eq!(def.backsplash_distance, 23.0);
        assert_eq!(def.subdivide, 999.0);
        assert!(def.autosprite);
    }

    #[test]
    fn test_light_vis_lump_decodes_signed() {
        let mut bytes = Vec::new();
        for &v in &[-1, 0, 2] {
            put_i32(&mut bytes, v);
        }

        let data = FileBuilder::alice()
            .lump(FakkLumpId::LightVis as usize, bytes)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.light_vis, vec![-1, 0, 2]);
    }

    #[test]
    fn test_stride_remainder_is_rejected() {
        // 15 bytes is not a whole number of 16-byte plane records
        let data = FileBuilder::rtcw()
            .lump(RtcwLumpId::Planes as usize, vec![0u8; 15])
            .build();

        assert!(load(&data).is_err());
    }

    #[test]
    fn test_lump_overrun_is_rejected() {
        let mut data = FileBuilder::rtcw().build();
        // point the plane lump past the end of the file
        let dir_base = 8 + RtcwLumpId::Planes as usize * DIR_ENTRY_SIZE;
        let file_len = data.len() as u32;
        data[dir_base..dir_base + 4].copy_from_slice(&file_len.to_le_bytes());
        data[dir_base + 4..dir_base + 8].copy_from_slice(&32u32.to_le_bytes());

        assert!(load(&data).is_err());
    }

    #[test]
    fn test_visibility_lump_payload_rule() {
        // 8 bytes or fewer: no visibility data
        let data = FileBuilder::alice()
            .lump(FakkLumpId::Visibility as usize, vec![0u8; 8])
            .build();
        assert!(load(&data).unwrap().visibility.is_none());

        let mut bytes = Vec::new();
        put_u32(&mut bytes, 2); // clusters
        put_u32(&mut bytes, 1); // bytes per cluster
        bytes.extend_from_slice(&[0xaa, 0x55]);
        let data = FileBuilder::alice()
            .lump(FakkLumpId::Visibility as usize, bytes)
            .build();

        let vis = load(&data).unwrap().visibility.unwrap();
        assert_eq!(vis.cluster_count, 2);
        assert_eq!(vis.bytes_per_cluster, 1);
        assert_eq!(vis.data, vec![0xaa, 0x55]);
    }

    #[test]
    fn test_entity_lump_decodes() {
        let text = b"{\n\"origin\" \"1 2 3\"\n\"angle\" \"90\"\n}\0".to_vec();
        let data = FileBuilder::alice()
            .lump(FakkLumpId::Entities as usize, text)
            .build();

        let bsp = load(&data).unwrap();
        assert_eq!(bsp.entities.len(), 1);
        assert_eq!(
            bsp.entities[0].get("origin"),
            Some(&EntityValue::Numbers(vec![1.0, 2.0, 3.0]))
        );
        assert_eq!(bsp.entities[0].get("angle"), Some(&EntityValue::Number(90.0)));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let data = FileBuilder::alice()
            .lump(
                FakkLumpId::Planes as usize,
                plane_bytes([1.0, 0.0, 0.0], -16.0),
            )
            .lump(
                FakkLumpId::Entities as usize,
                b"{\n\"classname\" \"worldspawn\"\n}\0".to_vec(),
            )
            .build();

        let first = load(&data).unwrap();
        let second = load(&data).unwrap();
        assert_eq!(first, second);
    }
}

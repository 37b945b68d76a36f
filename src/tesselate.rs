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

//! Quadratic bezier patch tesselation.
//!
//! Patch surfaces store a grid of control points instead of triangles. The
//! grid decomposes into non-overlapping 3x3 control windows (stepping by 2,
//! so adjacent windows share an edge row/column); each window is a biquadratic
//! bezier patch evaluated at `level + 1` steps along both axes.
//!
//! [`tesselate`] appends the evaluated vertices and triangle indices to the
//! caller's shared containers and rewrites the surface's vertex and index
//! ranges to cover only the new data. The emitted indices are relative to
//! the surface's new `first_vert`. The original control vertices stay in the
//! vertex array but nothing references them afterward.
//!
//! Evaluated normals are fixed at (0, 0, 1) rather than derived from the
//! local curvature; renderers relying on lightmaps never look at them.

use crate::bsp::{BspSurface, BspVertex};

use cgmath::{Vector2, Vector3};

fn curve3(c0: Vector3<f32>, c1: Vector3<f32>, c2: Vector3<f32>, t: f32) -> Vector3<f32> {
    let b = 1.0 - t;
    c0 * (b * b) + c1 * (2.0 * b * t) + c2 * (t * t)
}

fn curve2(c0: Vector2<f32>, c1: Vector2<f32>, c2: Vector2<f32>, t: f32) -> Vector2<f32> {
    let b = 1.0 - t;
    c0 * (b * b) + c1 * (2.0 * b * t) + c2 * (t * t)
}

fn color_vec(color: [u8; 4]) -> Vector3<f32> {
    Vector3::new(color[0] as f32, color[1] as f32, color[2] as f32)
}

// Alpha is written as 1, not interpolated; shipped maps rely on vertex alpha
// coming exclusively from alphaGen.
fn pack_color(rgb: Vector3<f32>) -> [u8; 4] {
    [
        rgb.x.round() as u8,
        rgb.y.round() as u8,
        rgb.z.round() as u8,
        1,
    ]
}

const FIXED_NORMAL: Vector3<f32> = Vector3 {
    x: 0.0,
    y: 0.0,
    z: 1.0,
};

/// Tesselates one patch surface at the given subdivision level (must be at
/// least 1).
///
/// Reads `(patch_width * patch_height)` control vertices starting at the
/// surface's `first_vert`, appends `(level + 1)^2` vertices and
/// `level * level * 2` triangles per 3x3 control window, and overwrites the
/// surface's vertex/index ranges to reference the appended data. A trailing
/// row or column that doesn't complete a window is skipped.
pub fn tesselate(
    surface: &mut BspSurface,
    vertices: &mut Vec<BspVertex>,
    indices: &mut Vec<u32>,
    level: usize,
) {
    let off = surface.first_vert as usize;
    let l1 = level + 1;

    let width = surface.patch_width as usize;
    let height = surface.patch_height as usize;

    surface.first_vert = vertices.len() as u32;
    surface.first_index = indices.len() as u32;
    surface.vert_count = 0;
    surface.index_count = 0;

    for py in (0..height.saturating_sub(2)).step_by(2) {
        for px in (0..width.saturating_sub(2)).step_by(2) {
            let row0 = off + py * width + px;
            let row1 = row0 + width;
            let row2 = row1 + width;

            let c0 = vertices[row0].clone();
            let c1 = vertices[row0 + 1].clone();
            let c2 = vertices[row0 + 2].clone();
            let c3 = vertices[row1].clone();
            let c4 = vertices[row1 + 1].clone();
            let c5 = vertices[row1 + 2].clone();
            let c6 = vertices[row2].clone();
            let c7 = vertices[row2 + 1].clone();
            let c8 = vertices[row2 + 2].clone();

            let index_off = surface.vert_count as usize;
            surface.vert_count += (l1 * l1) as u32;

            // First output row: the curve through the window's left column.
            for i in 0..l1 {
                let a = i as f32 / level as f32;

                vertices.push(BspVertex {
                    position: curve3(c0.position, c3.position, c6.position, a),
                    tex_coord: curve2(c0.tex_coord, c3.tex_coord, c6.tex_coord, a),
                    lightmap_coord: curve2(
                        c0.lightmap_coord,
                        c3.lightmap_coord,
                        c6.lightmap_coord,
                        a,
                    ),
                    normal: FIXED_NORMAL,
                    color: pack_color(curve3(
                        color_vec(c0.color),
                        color_vec(c3.color),
                        color_vec(c6.color),
                        a,
                    )),
                });
            }

            // Remaining rows: three horizontal curves give the intermediate
            // control points, then a vertical curve through those.
            for i in 1..l1 {
                let a = i as f32 / level as f32;

                let pc0 = curve3(c0.position, c1.position, c2.position, a);
                let pc1 = curve3(c3.position, c4.position, c5.position, a);
                let pc2 = curve3(c6.position, c7.position, c8.position, a);

                let tc0 = curve2(c0.tex_coord, c1.tex_coord, c2.tex_coord, a);
                let tc1 = curve2(c3.tex_coord, c4.tex_coord, c5.tex_coord, a);
                let tc2 = curve2(c6.tex_coord, c7.tex_coord, c8.tex_coord, a);

                let lc0 = curve2(c0.lightmap_coord, c1.lightmap_coord, c2.lightmap_coord, a);
                let lc1 = curve2(c3.lightmap_coord, c4.lightmap_coord, c5.lightmap_coord, a);
                let lc2 = curve2(c6.lightmap_coord, c7.lightmap_coord, c8.lightmap_coord, a);

                let cc0 = curve3(color_vec(c0.color), color_vec(c1.color), color_vec(c2.color), a);
                let cc1 = curve3(color_vec(c3.color), color_vec(c4.color), color_vec(c5.color), a);
                let cc2 = curve3(color_vec(c6.color), color_vec(c7.color), color_vec(c8.color), a);

                for j in 0..l1 {
                    let b = j as f32 / level as f32;

                    vertices.push(BspVertex {
                        position: curve3(pc0, pc1, pc2, b),
                        tex_coord: curve2(tc0, tc1, tc2, b),
                        lightmap_coord: curve2(lc0, lc1, lc2, b),
                        normal: FIXED_NORMAL,
                        color: pack_color(curve3(cc0, cc1, cc2, b)),
                    });
                }
            }

            surface.index_count += (level * level * 6) as u32;

            for row in 0..level {
                for col in 0..level {
                    let slot = |r: usize, c: usize| (index_off + r * l1 + c) as u32;

                    indices.push(slot(row + 1, col));
                    indices.push(slot(row, col));
                    indices.push(slot(row, col + 1));

                    indices.push(slot(row + 1, col));
                    indices.push(slot(row, col + 1));
                    indices.push(slot(row + 1, col + 1));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::bsp::BspSurfaceKind;

    fn control_vertex(x: f32, y: f32) -> BspVertex {
        BspVertex {
            position: Vector3::new(x, y, 0.0),
            tex_coord: Vector2::new(x / 2.0, y / 2.0),
            lightmap_coord: Vector2::new(0.0, 0.0),
            normal: Vector3::new(1.0, 0.0, 0.0),
            color: [200, 100, 50, 255],
        }
    }

    fn patch_surface(width: u32, height: u32) -> BspSurface {
        BspSurface {
            shader_id: 0,
            fog_id: -1,
            kind: BspSurfaceKind::Patch,
            first_vert: 0,
            vert_count: width * height,
            first_index: 0,
            index_count: 0,
            lightmap_id: 0,
            lightmap_x: 0,
            lightmap_y: 0,
            lightmap_width: 0,
            lightmap_height: 0,
            lightmap_origin: Vector3::new(0.0, 0.0, 0.0),
            lightmap_vecs: [Vector3::new(0.0, 0.0, 0.0); 3],
            patch_width: width,
            patch_height: height,
            subdivisions: 0.0,
        }
    }

    fn control_grid(width: usize, height: usize) -> Vec<BspVertex> {
        let mut verts = Vec::new();
        for row in 0..height {
            for col in 0..width {
                verts.push(control_vertex(col as f32, row as f32));
            }
        }
        verts
    }

    #[test]
    fn test_3x3_patch_level_2_counts() {
        let mut surface = patch_surface(3, 3);
        let mut vertices = control_grid(3, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        assert_eq!(vertices.len(), 18);
        assert_eq!(indices.len(), 24);
        assert_eq!(surface.first_vert, 9);
        assert_eq!(surface.vert_count, 9);
        assert_eq!(surface.first_index, 0);
        assert_eq!(surface.index_count, 24);
        assert!(indices.iter().all(|&i| i < 9));
    }

    #[test]
    fn test_flat_patch_evaluates_to_grid() {
        // a control net with collinear rows and columns is reproduced
        // exactly by the quadratic bezier
        let mut surface = patch_surface(3, 3);
        let mut vertices = control_grid(3, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        let out = &vertices[surface.first_vert as usize..];
        for i in 0..3 {
            for j in 0..3 {
                let vert = &out[i * 3 + j];
                assert_eq!(vert.position, Vector3::new(i as f32, j as f32, 0.0));
            }
        }
    }

    #[test]
    fn test_output_normal_is_fixed() {
        let mut surface = patch_surface(3, 3);
        let mut vertices = control_grid(3, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        for vert in &vertices[surface.first_vert as usize..] {
            assert_eq!(vert.normal, Vector3::new(0.0, 0.0, 1.0));
        }
    }

    #[test]
    fn test_output_alpha_is_one() {
        let mut surface = patch_surface(3, 3);
        let mut vertices = control_grid(3, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        for vert in &vertices[surface.first_vert as usize..] {
            assert_eq!(vert.color[0], 200);
            assert_eq!(vert.color[3], 1);
        }
    }

    #[test]
    fn test_multiple_windows_share_no_indices() {
        // 3x5 grid: two windows stacked along the height
        let mut surface = patch_surface(3, 5);
        let mut vertices = control_grid(3, 5);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        assert_eq!(surface.vert_count, 18);
        assert_eq!(surface.index_count, 48);
        assert!(indices[..24].iter().all(|&i| i < 9));
        assert!(indices[24..].iter().all(|&i| i >= 9 && i < 18));
    }

    #[test]
    fn test_trailing_partial_window_is_skipped() {
        // width 4 leaves one control column that can't form a window
        let mut surface = patch_surface(4, 3);
        let mut vertices = control_grid(4, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 2);

        assert_eq!(surface.vert_count, 9);
        assert_eq!(surface.index_count, 24);
    }

    #[test]
    fn test_degenerate_patch_emits_nothing() {
        let mut surface = patch_surface(2, 2);
        let mut vertices = control_grid(2, 2);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 1);

        assert_eq!(vertices.len(), 4);
        assert!(indices.is_empty());
        assert_eq!(surface.first_vert, 4);
        assert_eq!(surface.vert_count, 0);
        assert_eq!(surface.index_count, 0);
    }

    #[test]
    fn test_level_1_emits_corner_quad() {
        let mut surface = patch_surface(3, 3);
        let mut vertices = control_grid(3, 3);
        let mut indices = Vec::new();

        tesselate(&mut surface, &mut vertices, &mut indices, 1);

        assert_eq!(surface.vert_count, 4);
        assert_eq!(surface.index_count, 6);
        assert_eq!(indices, vec![2, 0, 1, 2, 1, 3]);
    }
}

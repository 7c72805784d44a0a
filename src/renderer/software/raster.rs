//! Triangle rasterization.
//!
//! Input vertices are in OpenGL clip space. Triangles are clipped against the
//! near plane, mapped to the viewport (row 0 at the top), culled by their
//! window-space winding and scanned over pixel centers. Varyings are
//! interpolated perspective-correctly; depth is interpolated linearly in
//! window space, as the hardware does.

use glam::{Vec2, Vec3, Vec4};

use crate::renderer::backend::{CullMode, DepthBias, Viewport};

/// Depth difference one polygon-offset unit stands for (24-bit depth).
const DEPTH_UNIT: f32 = 1.0 / 16_777_216.0;

/// Smallest window-space doubled area that still produces fragments.
const MIN_AREA: f32 = 1e-8;

/// Per-vertex data interpolated across a triangle.
pub trait Varying: Copy {
    fn lerp(a: Self, b: Self, t: f32) -> Self;

    /// Weighted sum with weights summing to one.
    fn blend(v: [Self; 3], w: [f32; 3]) -> Self;
}

impl Varying for () {
    fn lerp((): Self, (): Self, _: f32) -> Self {}

    fn blend(_: [Self; 3], _: [f32; 3]) -> Self {}
}

#[derive(Debug, Clone, Copy)]
pub struct ClipVertex<V> {
    pub clip: Vec4,
    pub varying: V,
}

impl<V: Varying> ClipVertex<V> {
    fn lerp(a: Self, b: Self, t: f32) -> Self {
        Self {
            clip: a.clip.lerp(b.clip, t),
            varying: V::lerp(a.varying, b.varying, t),
        }
    }

    /// Signed distance to the near plane, positive inside.
    #[inline]
    fn near_distance(&self) -> f32 {
        self.clip.z + self.clip.w
    }
}

/// A covered pixel.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<V> {
    pub x: u32,
    pub y: u32,
    /// Window depth in `[0, 1]`, polygon offset applied.
    pub depth: f32,
    /// Counter-clockwise as seen on screen.
    pub front_facing: bool,
    pub varying: V,
}

/// Fixed-function state of a draw.
#[derive(Debug, Clone, Copy)]
pub struct RasterState {
    pub viewport: Viewport,
    pub target_width: u32,
    pub target_height: u32,
    pub cull: CullMode,
    pub depth_bias: Option<DepthBias>,
}

/// Rasterizes one clip-space triangle, calling `emit` for each fragment.
pub fn draw_triangle<V: Varying>(
    state: &RasterState,
    triangle: [ClipVertex<V>; 3],
    mut emit: impl FnMut(Fragment<V>),
) {
    let polygon = clip_near(triangle);
    if polygon.len() < 3 {
        return;
    }
    for i in 1..polygon.len() - 1 {
        scan(state, [polygon[0], polygon[i], polygon[i + 1]], &mut emit);
    }
}

/// Sutherland-Hodgman against `z = -w`. At most 4 vertices come out.
fn clip_near<V: Varying>(triangle: [ClipVertex<V>; 3]) -> Vec<ClipVertex<V>> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = triangle[i];
        let b = triangle[(i + 1) % 3];
        let (da, db) = (a.near_distance(), b.near_distance());

        if da >= 0.0 {
            out.push(a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            out.push(ClipVertex::lerp(a, b, da / (da - db)));
        }
    }
    out
}

/// Doubled signed area of `(a, b, p)`.
#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn scan<V: Varying>(
    state: &RasterState,
    triangle: [ClipVertex<V>; 3],
    emit: &mut impl FnMut(Fragment<V>),
) {
    let vp = state.viewport;
    if triangle.iter().any(|v| v.clip.w <= 0.0) {
        return;
    }

    let inv_w = triangle.map(|v| 1.0 / v.clip.w);
    let window: [Vec3; 3] = std::array::from_fn(|i| {
        let ndc = triangle[i].clip.truncate() * inv_w[i];
        Vec3::new(
            vp.x as f32 + (ndc.x + 1.0) * 0.5 * vp.width as f32,
            vp.y as f32 + (1.0 - ndc.y) * 0.5 * vp.height as f32,
            ndc.z * 0.5 + 0.5,
        )
    });
    let xy = window.map(|p| p.truncate());

    let area = edge(xy[0], xy[1], xy[2]);
    if area.abs() < MIN_AREA {
        return;
    }

    // Window y points down, so counter-clockwise on screen is negative area.
    let front_facing = area < 0.0;
    match state.cull {
        CullMode::Front if front_facing => return,
        CullMode::Back if !front_facing => return,
        _ => {}
    }

    let offset = state.depth_bias.map_or(0.0, |bias| {
        let (d1, d2) = (window[1] - window[0], window[2] - window[0]);
        let dzdx = (d1.z * d2.y - d2.z * d1.y) / area;
        let dzdy = (d1.x * d2.z - d2.x * d1.z) / area;
        bias.factor * dzdx.abs().max(dzdy.abs()) + bias.units * DEPTH_UNIT
    });

    let right = (vp.x + vp.width).min(state.target_width) as f32;
    let bottom = (vp.y + vp.height).min(state.target_height) as f32;
    let min = xy[0].min(xy[1]).min(xy[2]);
    let max = xy[0].max(xy[1]).max(xy[2]);

    let x0 = min.x.floor().max(vp.x as f32) as u32;
    let y0 = min.y.floor().max(vp.y as f32) as u32;
    let x1 = max.x.ceil().min(right).max(0.0) as u32;
    let y1 = max.y.ceil().min(bottom).max(0.0) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b = [
                edge(xy[1], xy[2], p) / area,
                edge(xy[2], xy[0], p) / area,
                edge(xy[0], xy[1], p) / area,
            ];
            if b.iter().any(|&w| w < 0.0) {
                continue;
            }

            let z = b[0] * window[0].z + b[1] * window[1].z + b[2] * window[2].z;
            if !(0.0..=1.0).contains(&z) {
                continue;
            }

            let pw = [b[0] * inv_w[0], b[1] * inv_w[1], b[2] * inv_w[2]];
            let sum = pw[0] + pw[1] + pw[2];
            let weights = pw.map(|w| w / sum);

            emit(Fragment {
                x,
                y,
                depth: (z + offset).clamp(0.0, 1.0),
                front_facing,
                varying: V::blend(triangle.map(|v| v.varying), weights),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(cull: CullMode) -> RasterState {
        RasterState {
            viewport: Viewport::new(8, 8),
            target_width: 8,
            target_height: 8,
            cull,
            depth_bias: None,
        }
    }

    fn vertex(x: f32, y: f32, z: f32) -> ClipVertex<()> {
        ClipVertex {
            clip: Vec4::new(x, y, z, 1.0),
            varying: (),
        }
    }

    fn count(state: &RasterState, tri: [ClipVertex<()>; 3]) -> (usize, bool) {
        let mut n = 0;
        let mut front = false;
        draw_triangle(state, tri, |f| {
            n += 1;
            front = f.front_facing;
        });
        (n, front)
    }

    #[test]
    fn ccw_triangle_is_front_facing() {
        let tri = [vertex(-1.0, -1.0, 0.0), vertex(1.0, -1.0, 0.0), vertex(-1.0, 1.0, 0.0)];
        let (n, front) = count(&state(CullMode::None), tri);
        assert!(n > 0);
        assert!(front);
        assert_eq!(count(&state(CullMode::Front), tri).0, 0);
        assert_eq!(count(&state(CullMode::Back), tri).0, n);
    }

    #[test]
    fn triangle_behind_near_plane_is_dropped() {
        let tri = [vertex(-1.0, -1.0, -2.0), vertex(1.0, -1.0, -2.0), vertex(-1.0, 1.0, -2.0)];
        assert_eq!(count(&state(CullMode::None), tri).0, 0);
    }

    #[test]
    fn straddling_triangle_is_clipped_not_dropped() {
        let tri = [vertex(-1.0, -1.0, -3.0), vertex(1.0, -1.0, 0.0), vertex(-1.0, 1.0, 0.0)];
        let (n, _) = count(&state(CullMode::None), tri);
        assert!(n > 0);
    }
}

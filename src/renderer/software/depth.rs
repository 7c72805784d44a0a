use glam::{Vec2, Vec4};

/// Depth value of texels outside the texture.
pub const BORDER_DEPTH: f32 = 1.0;

/// A single-channel `f32` depth image, row 0 at the top.
#[derive(Debug, Clone)]
pub struct DepthTexture {
    width: u32,
    height: u32,
    texels: Vec<f32>,
}

impl DepthTexture {
    /// Creates a texture cleared to the far plane.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![1.0; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, depth: f32) {
        self.texels.fill(depth);
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Stored depth at `(x, y)`, or `None` outside the texture.
    #[must_use]
    pub fn texel(&self, x: u32, y: u32) -> Option<f32> {
        (x < self.width && y < self.height).then(|| self.texels[self.index(x, y)])
    }

    /// Writes `depth` if it is strictly closer than the stored value.
    pub fn test_and_set(&mut self, x: u32, y: u32, depth: f32) -> bool {
        let i = self.index(x, y);
        if depth < self.texels[i] {
            self.texels[i] = depth;
            true
        } else {
            false
        }
    }

    /// Depth-comparison lookup with nearest filtering.
    ///
    /// `uv` has `v` pointing up (texture space of the shadow matrix), so
    /// `v = 1` addresses row 0. Returns `1.0` when `reference` is closer than
    /// the stored depth (lit) and `0.0` otherwise. Lookups outside `[0, 1]`
    /// compare against [`BORDER_DEPTH`].
    #[must_use]
    pub fn sample_compare(&self, uv: Vec2, reference: f32) -> f32 {
        let reference = reference.clamp(0.0, 1.0);
        let stored = self.sample_nearest(uv).unwrap_or(BORDER_DEPTH);
        if reference < stored { 1.0 } else { 0.0 }
    }

    /// Projective variant: divides `coord.xyz` by `coord.w` first.
    ///
    /// Points behind the projection center (`w <= 0`) are treated as lit, and
    /// so is anything outside the map.
    #[must_use]
    pub fn sample_compare_proj(&self, coord: Vec4) -> f32 {
        if coord.w <= 0.0 {
            return 1.0;
        }
        let p = coord.truncate() / coord.w;
        if !(0.0..=1.0).contains(&p.x) || !(0.0..=1.0).contains(&p.y) {
            return 1.0;
        }
        self.sample_compare(Vec2::new(p.x, p.y), p.z)
    }

    fn sample_nearest(&self, uv: Vec2) -> Option<f32> {
        if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return None;
        }
        let x = ((uv.x * self.width as f32) as u32).min(self.width.saturating_sub(1));
        let y = (((1.0 - uv.y) * self.height as f32) as u32).min(self.height.saturating_sub(1));
        self.texel(x, y)
    }

    /// Smallest and largest stored depth.
    #[must_use]
    pub fn range(&self) -> (f32, f32) {
        self.texels
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &d| (lo.min(d), hi.max(d)))
    }
}

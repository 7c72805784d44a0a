//! Viewing Frustum
//!
//! A [`Frustum`] is a camera-like viewing volume: an eye position, a look
//! target and an up vector, plus a projection whose kind is fixed by the type
//! parameter. The two projection kinds are [`Perspective`] and
//! [`Orthographic`]; each frustum only exposes the setter for its own kind, so
//! configuring a perspective frustum with ortho bounds does not compile.
//!
//! All projection matrices use OpenGL clip conventions (NDC z in `[-1, 1]`),
//! which is what the shadow bias matrix expects.
//!
//! # Enclosing
//!
//! [`Frustum::enclose`] refits this frustum's projection so that another
//! frustum's full view volume (its 8 corner points) is contained when viewed
//! through this frustum's orientation. A perspective frustum is first re-aimed
//! at the other frustum's center.
//!
//! ```rust,ignore
//! let mut light = Frustum::new(Perspective::new(50.0, 1.0, 1.0, 25.0)?);
//! light.orient(Vec3::new(0.0, 8.66, 12.375), Vec3::ZERO, Vec3::Y)?;
//! light.enclose(&camera_frustum)?;
//! ```

use std::fmt;

use glam::{Mat4, Vec3};
use thiserror::Error;

/// Below this length a direction is treated as degenerate.
const DIRECTION_EPSILON: f32 = 1e-6;

/// Index pairs for drawing a frustum outline as a line list.
///
/// Indexes into [`Frustum::outline`]: `0` is the origin, `1..=4` the near
/// plane corners and `5..=8` the far plane corners.
pub const OUTLINE_EDGES: [u32; 24] = [
    // The outer edges
    0, 5, 0, 6, 0, 7, 0, 8,
    // The near plane
    1, 2, 2, 3, 3, 4, 4, 1,
    // The far plane
    5, 6, 6, 7, 7, 8, 8, 5,
];

/// Errors raised when orienting, configuring or fitting a frustum.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrustumError {
    /// The up vector is parallel to the view direction, or the eye sits on
    /// its own target.
    #[error("degenerate orientation: view direction {direction}, up {up}")]
    DegenerateOrientation {
        /// `at - origin`
        direction: Vec3,
        /// The rejected up vector
        up: Vec3,
    },

    /// Perspective parameters outside their valid ranges.
    #[error("invalid perspective: fovy = {fovy}  ar = {aspect}  near = {near}  far = {far}")]
    InvalidPerspective {
        /// Vertical field of view in degrees
        fovy: f32,
        /// Width / height
        aspect: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },

    /// Orthographic bounds that do not describe a box.
    #[error("invalid orthographic bounds: x({xmin}, {xmax}) y({ymin}, {ymax}) near = {near} far = {far}")]
    InvalidOrthographic {
        /// Left bound
        xmin: f32,
        /// Right bound
        xmax: f32,
        /// Bottom bound
        ymin: f32,
        /// Top bound
        ymax: f32,
        /// Near plane distance
        near: f32,
        /// Far plane distance
        far: f32,
    },

    /// Every corner of the enclosed frustum is behind the viewer.
    #[error("frustum enclose: no visible corners")]
    NoVisibleCorners,
}

// ============================================================================
// Projection kinds
// ============================================================================

/// A projection kind that can be attached to a [`Frustum`].
pub trait Projection: Copy + fmt::Debug + fmt::Display {
    /// Whether [`Frustum::enclose`] re-aims the frustum at the enclosed
    /// volume's center before fitting.
    const RETARGETS_ON_ENCLOSE: bool;

    /// The projection matrix (OpenGL clip conventions).
    fn matrix(&self) -> Mat4;

    /// Distance to the near plane.
    fn near(&self) -> f32;

    /// Distance to the far plane.
    fn far(&self) -> f32;

    /// The 8 corners in the frustum's local frame: `x` along the right axis,
    /// `y` along the up axis, `z` the distance along the view direction.
    ///
    /// Order: near `(+x,+y) (-x,+y) (-x,-y) (+x,-y)`, then far in the same order.
    fn local_corners(&self) -> [Vec3; 8];

    /// Builds the tightest projection of this kind containing `points`, given
    /// in the fitting frustum's view space (looking down `-z`).
    fn fit(points: &[Vec3; 8]) -> Result<Self, FrustumError>;
}

/// Perspective projection: vertical field of view (degrees), aspect ratio and
/// near/far distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perspective {
    fovy: f32,
    aspect: f32,
    near: f32,
    far: f32,
}

impl Perspective {
    /// Creates a perspective projection.
    ///
    /// Requires `0 < fovy < 180`, `aspect > 0` and `0 < near < far`.
    pub fn new(fovy: f32, aspect: f32, near: f32, far: f32) -> Result<Self, FrustumError> {
        let valid = fovy.is_finite()
            && aspect.is_finite()
            && near.is_finite()
            && far.is_finite()
            && fovy > 0.0
            && fovy < 180.0
            && aspect > 0.0
            && near > 0.0
            && near < far;

        if valid {
            Ok(Self { fovy, aspect, near, far })
        } else {
            Err(FrustumError::InvalidPerspective { fovy, aspect, near, far })
        }
    }

    /// Vertical field of view in degrees.
    #[must_use]
    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    /// Width / height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Half extents of the cross-section at distance `d`.
    fn half_extents_at(&self, d: f32) -> (f32, f32) {
        let dy = d * (self.fovy.to_radians() / 2.0).tan();
        (self.aspect * dy, dy)
    }
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fovy: 50.0,
            aspect: 1.0,
            near: 0.5,
            far: 100.0,
        }
    }
}

impl Projection for Perspective {
    const RETARGETS_ON_ENCLOSE: bool = true;

    fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fovy.to_radians(), self.aspect, self.near, self.far)
    }

    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }

    fn local_corners(&self) -> [Vec3; 8] {
        let (nx, ny) = self.half_extents_at(self.near);
        let (fx, fy) = self.half_extents_at(self.far);
        [
            Vec3::new(nx, ny, self.near),
            Vec3::new(-nx, ny, self.near),
            Vec3::new(-nx, -ny, self.near),
            Vec3::new(nx, -ny, self.near),
            Vec3::new(fx, fy, self.far),
            Vec3::new(-fx, fy, self.far),
            Vec3::new(-fx, -fy, self.far),
            Vec3::new(fx, -fy, self.far),
        ]
    }

    fn fit(points: &[Vec3; 8]) -> Result<Self, FrustumError> {
        let mut max_horiz = 0.0_f32;
        let mut max_vert = 0.0_f32;
        let mut near = f32::MAX;
        let mut far = 0.0_f32;
        let mut visible = 0;

        // Points at or behind the eye cannot be enclosed by a perspective volume.
        for pt in points.iter().filter(|pt| pt.z < 0.0) {
            let d = -pt.z;
            max_horiz = max_horiz.max((pt.x.abs() / d).atan());
            max_vert = max_vert.max((pt.y.abs() / d).atan());
            near = near.min(d);
            far = far.max(d);
            visible += 1;
        }

        if visible == 0 {
            return Err(FrustumError::NoVisibleCorners);
        }

        let fovy = (max_vert * 2.0).to_degrees();
        // w / h at the near plane; the near distance cancels out.
        let aspect = max_horiz.tan() / max_vert.tan();

        Self::new(fovy, aspect, near, far)
    }
}

impl fmt::Display for Perspective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Perspective:  fovy = {}  ar = {}  near = {}  far = {}",
            self.fovy, self.aspect, self.near, self.far
        )
    }
}

/// Orthographic projection: an axis-aligned box in view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orthographic {
    xmin: f32,
    xmax: f32,
    ymin: f32,
    ymax: f32,
    near: f32,
    far: f32,
}

impl Orthographic {
    /// Creates an orthographic projection.
    ///
    /// Requires `xmin < xmax`, `ymin < ymax` and `near < far`. `near` may be
    /// negative (the box may extend behind the eye).
    pub fn new(
        xmin: f32,
        xmax: f32,
        ymin: f32,
        ymax: f32,
        near: f32,
        far: f32,
    ) -> Result<Self, FrustumError> {
        let finite = [xmin, xmax, ymin, ymax, near, far].iter().all(|v| v.is_finite());
        if finite && xmin < xmax && ymin < ymax && near < far {
            Ok(Self { xmin, xmax, ymin, ymax, near, far })
        } else {
            Err(FrustumError::InvalidOrthographic { xmin, xmax, ymin, ymax, near, far })
        }
    }

    /// `(xmin, xmax, ymin, ymax)`.
    #[must_use]
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (self.xmin, self.xmax, self.ymin, self.ymax)
    }
}

impl Default for Orthographic {
    fn default() -> Self {
        Self {
            xmin: -1.0,
            xmax: 1.0,
            ymin: -1.0,
            ymax: 1.0,
            near: -1.0,
            far: 1.0,
        }
    }
}

impl Projection for Orthographic {
    const RETARGETS_ON_ENCLOSE: bool = false;

    fn matrix(&self) -> Mat4 {
        Mat4::orthographic_rh_gl(self.xmin, self.xmax, self.ymin, self.ymax, self.near, self.far)
    }

    fn near(&self) -> f32 {
        self.near
    }

    fn far(&self) -> f32 {
        self.far
    }

    fn local_corners(&self) -> [Vec3; 8] {
        let Self { xmin, xmax, ymin, ymax, near, far } = *self;
        [
            Vec3::new(xmax, ymax, near),
            Vec3::new(xmin, ymax, near),
            Vec3::new(xmin, ymin, near),
            Vec3::new(xmax, ymin, near),
            Vec3::new(xmax, ymax, far),
            Vec3::new(xmin, ymax, far),
            Vec3::new(xmin, ymin, far),
            Vec3::new(xmax, ymin, far),
        ]
    }

    fn fit(points: &[Vec3; 8]) -> Result<Self, FrustumError> {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for pt in points {
            min = min.min(*pt);
            max = max.max(*pt);
        }

        // View space looks down -z: the nearest point has the largest z.
        Self::new(min.x, max.x, min.y, max.y, -max.z, -min.z)
    }
}

impl fmt::Display for Orthographic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Orthographic: x({},{}) y({},{}) near = {} far = {}",
            self.xmin, self.xmax, self.ymin, self.ymax, self.near, self.far
        )
    }
}

// ============================================================================
// Frustum
// ============================================================================

/// A viewing volume: orientation plus a projection of fixed kind `P`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum<P: Projection = Perspective> {
    origin: Vec3,
    at: Vec3,
    up: Vec3,
    projection: P,
}

impl<P: Projection + Default> Default for Frustum<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

impl<P: Projection> Frustum<P> {
    /// Creates a frustum at `(0, 0, 1)` looking at the origin with `+Y` up.
    #[must_use]
    pub fn new(projection: P) -> Self {
        Self {
            origin: Vec3::Z,
            at: Vec3::ZERO,
            up: Vec3::Y,
            projection,
        }
    }

    /// Sets position, look target and up vector.
    ///
    /// Rejects an up vector parallel to `at - origin` (and `at == origin`),
    /// which would produce a NaN view matrix. The frustum is unchanged on error.
    pub fn orient(&mut self, origin: Vec3, at: Vec3, up: Vec3) -> Result<(), FrustumError> {
        let direction = at - origin;
        let degenerate = direction.length() < DIRECTION_EPSILON
            || up.length() < DIRECTION_EPSILON
            || direction.normalize().cross(up.normalize()).length() < DIRECTION_EPSILON;

        if degenerate {
            return Err(FrustumError::DegenerateOrientation { direction, up });
        }

        self.origin = origin;
        self.at = at;
        self.up = up;
        Ok(())
    }

    /// Right-handed look-at matrix from `origin`, `at` and `up`.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.origin, self.at, self.up)
    }

    /// Projection matrix for this frustum's kind.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// `projection * view`.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Eye position.
    #[must_use]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Look target.
    #[must_use]
    pub fn at(&self) -> Vec3 {
        self.at
    }

    /// Up vector as given to [`orient`](Self::orient).
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// The projection parameters.
    #[must_use]
    pub fn projection(&self) -> &P {
        &self.projection
    }

    /// Unit vector from `origin` towards `at`.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        (self.at - self.origin).normalize()
    }

    /// The point on the view axis halfway between the near and far planes.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        let dist = (self.projection.near() + self.projection.far()) / 2.0;
        self.origin + self.direction() * dist
    }

    /// The 8 world-space corners of the view volume (near plane first).
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        // Same basis as the look-at matrix: n points backwards.
        let n = (self.origin - self.at).normalize();
        let u = self.up.cross(n).normalize();
        let v = n.cross(u).normalize();

        self.projection
            .local_corners()
            .map(|c| self.origin + u * c.x + v * c.y - n * c.z)
    }

    /// The origin followed by the 8 corners, indexed by [`OUTLINE_EDGES`].
    #[must_use]
    pub fn outline(&self) -> [Vec3; 9] {
        let corners = self.corners();
        let mut points = [self.origin; 9];
        points[1..].copy_from_slice(&corners);
        points
    }

    /// Refits this frustum so that `other`'s view volume is fully contained.
    ///
    /// A perspective frustum is first re-aimed at `other`'s center (keeping
    /// its origin and up vector); an orthographic one keeps its orientation.
    /// Fails with [`FrustumError::NoVisibleCorners`] when no corner of `other`
    /// lies in front of the eye. The frustum is unchanged on error.
    pub fn enclose<Q: Projection>(&mut self, other: &Frustum<Q>) -> Result<(), FrustumError> {
        let mut fitted = *self;
        if P::RETARGETS_ON_ENCLOSE {
            fitted.orient(self.origin, other.center(), self.up)?;
        }

        let view = fitted.view_matrix();
        let points = other.corners().map(|p| view.transform_point3(p));
        fitted.projection = P::fit(&points)?;

        log::debug!("enclose: {}", fitted.projection);
        *self = fitted;
        Ok(())
    }
}

impl Frustum<Perspective> {
    /// Sets the perspective parameters (`fovy` in degrees).
    pub fn set_perspective(
        &mut self,
        fovy: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Result<(), FrustumError> {
        self.projection = Perspective::new(fovy, aspect, near, far)?;
        Ok(())
    }
}

impl Frustum<Orthographic> {
    /// Sets the orthographic box.
    pub fn set_ortho_bounds(
        &mut self,
        xmin: f32,
        xmax: f32,
        ymin: f32,
        ymax: f32,
        near: f32,
        far: f32,
    ) -> Result<(), FrustumError> {
        self.projection = Orthographic::new(xmin, xmax, ymin, ymax, near, far)?;
        Ok(())
    }
}

impl<P: Projection> fmt::Display for Frustum<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.projection)?;
        write!(
            f,
            "   Origin = ({}, {}, {})  at = ({}, {}, {}) up = ({}, {}, {})",
            self.origin.x,
            self.origin.y,
            self.origin.z,
            self.at.x,
            self.at.y,
            self.at.z,
            self.up.x,
            self.up.y,
            self.up.z
        )
    }
}

//! Frustum Tests
//!
//! Tests for:
//! - Perspective and orthographic construction and validation
//! - orient() and its degenerate-input rejection
//! - View/projection matrices and frustum corners
//! - enclose() for both projection kinds, idempotency and error paths
//! - The shadow bias matrix

use glam::{Mat4, Vec3, Vec4Swizzles};

use umbra::SHADOW_BIAS;
use umbra::scene::frustum::{
    Frustum, FrustumError, OUTLINE_EDGES, Orthographic, Perspective, Projection,
};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn approx_mat4(a: Mat4, b: Mat4, eps: f32) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < eps)
}

fn light_frustum() -> Frustum<Perspective> {
    let mut light = Frustum::new(Perspective::new(50.0, 1.0, 1.0, 25.0).unwrap());
    light
        .orient(Vec3::new(8.66, 8.66, 12.375), Vec3::ZERO, Vec3::Y)
        .unwrap();
    light
}

fn camera_frustum() -> Frustum<Perspective> {
    let mut camera = Frustum::new(Perspective::new(50.0, 4.0 / 3.0, 0.5, 8.0).unwrap());
    camera
        .orient(Vec3::new(8.0, 5.0, 8.0), Vec3::new(0.0, 1.0, 0.0), Vec3::Y)
        .unwrap();
    camera
}

/// NDC of a world point seen through `frustum`.
fn to_ndc<P: Projection>(frustum: &Frustum<P>, p: Vec3) -> Vec3 {
    let clip = frustum.view_projection() * p.extend(1.0);
    clip.xyz() / clip.w
}

fn assert_contains<P: Projection, Q: Projection>(outer: &Frustum<P>, inner: &Frustum<Q>) {
    const SLACK: f32 = 1e-3;
    for corner in inner.corners() {
        let ndc = to_ndc(outer, corner);
        assert!(
            ndc.abs().max_element() <= 1.0 + SLACK,
            "corner {corner} lands outside at NDC {ndc}"
        );
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn new_frustum_looks_down_negative_z() {
    let frustum = Frustum::new(Perspective::default());
    assert_eq!(frustum.origin(), Vec3::Z);
    assert_eq!(frustum.at(), Vec3::ZERO);
    assert_eq!(frustum.up(), Vec3::Y);
    assert!(approx_vec3(frustum.direction(), Vec3::NEG_Z));
}

#[test]
fn perspective_rejects_out_of_range_parameters() {
    assert!(Perspective::new(0.0, 1.0, 1.0, 10.0).is_err());
    assert!(Perspective::new(180.0, 1.0, 1.0, 10.0).is_err());
    assert!(Perspective::new(50.0, 0.0, 1.0, 10.0).is_err());
    assert!(Perspective::new(50.0, 1.0, 0.0, 10.0).is_err());
    assert!(Perspective::new(50.0, 1.0, 10.0, 10.0).is_err());
    assert!(Perspective::new(50.0, 1.0, 1.0, f32::NAN).is_err());

    let ok = Perspective::new(50.0, 1.5, 1.0, 10.0).unwrap();
    assert!(approx(ok.fovy(), 50.0));
    assert!(approx(ok.aspect(), 1.5));
}

#[test]
fn orthographic_rejects_empty_boxes() {
    assert!(Orthographic::new(1.0, -1.0, -1.0, 1.0, 0.0, 1.0).is_err());
    assert!(Orthographic::new(-1.0, 1.0, 1.0, 1.0, 0.0, 1.0).is_err());
    assert!(Orthographic::new(-1.0, 1.0, -1.0, 1.0, 2.0, 1.0).is_err());

    // A box reaching behind the eye is fine.
    let ortho = Orthographic::new(-2.0, 2.0, -1.0, 1.0, -5.0, 5.0).unwrap();
    assert_eq!(ortho.bounds(), (-2.0, 2.0, -1.0, 1.0));
}

#[test]
fn failed_setter_keeps_previous_projection() {
    let mut frustum = Frustum::new(Perspective::new(40.0, 1.0, 1.0, 10.0).unwrap());
    let err = frustum.set_perspective(40.0, 1.0, 5.0, 2.0).unwrap_err();
    assert!(matches!(err, FrustumError::InvalidPerspective { .. }));
    assert!(approx(frustum.projection().near(), 1.0));

    let mut ortho = Frustum::new(Orthographic::default());
    assert!(ortho.set_ortho_bounds(0.0, 0.0, -1.0, 1.0, 0.0, 1.0).is_err());
    ortho.set_ortho_bounds(-3.0, 3.0, -2.0, 2.0, 0.5, 9.0).unwrap();
    assert_eq!(ortho.projection().bounds(), (-3.0, 3.0, -2.0, 2.0));
}

// ============================================================================
// Orientation
// ============================================================================

#[test]
fn orient_rejects_up_parallel_to_view_direction() {
    let mut frustum = light_frustum();
    let before = frustum;

    let err = frustum
        .orient(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO, Vec3::Y)
        .unwrap_err();
    assert!(matches!(err, FrustumError::DegenerateOrientation { .. }));
    assert_eq!(frustum, before);
}

#[test]
fn orient_rejects_eye_on_target() {
    let mut frustum = light_frustum();
    assert!(frustum.orient(Vec3::ONE, Vec3::ONE, Vec3::Y).is_err());
    assert!(frustum.orient(Vec3::Z, Vec3::ZERO, Vec3::ZERO).is_err());
}

#[test]
fn view_matrix_moves_origin_to_eye_space_origin() {
    let light = light_frustum();
    let view = light.view_matrix();
    assert!(approx_vec3(view.transform_point3(light.origin()), Vec3::ZERO));

    let target = view.transform_point3(light.at());
    let dist = light.at().distance(light.origin());
    assert!(approx_vec3(target, Vec3::new(0.0, 0.0, -dist)));
}

// ============================================================================
// Matrices and corners
// ============================================================================

#[test]
fn near_plane_center_maps_to_negative_near() {
    for (fovy, aspect, near, far) in [(50.0, 1.0, 1.0, 25.0), (30.0, 2.0, 0.1, 100.0)] {
        let mut frustum = Frustum::new(Perspective::new(fovy, aspect, near, far).unwrap());
        frustum
            .orient(Vec3::new(3.0, 4.0, 5.0), Vec3::new(-1.0, 0.0, 2.0), Vec3::Y)
            .unwrap();

        let near_center = frustum.origin() + frustum.direction() * near;
        let eye = frustum.view_matrix().transform_point3(near_center);
        assert!(approx(eye.z, -near), "view z = {}", eye.z);

        let ndc = to_ndc(&frustum, near_center);
        assert!(approx(ndc.z, -1.0), "ndc z = {}", ndc.z);
    }
}

#[test]
fn corners_land_on_ndc_cube_corners() {
    let light = light_frustum();
    let corners = light.corners();

    // Near (+x,+y) (-x,+y) (-x,-y) (+x,-y), then far in the same order.
    let expected = [
        Vec3::new(1.0, 1.0, -1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(1.0, -1.0, 1.0),
    ];
    for (corner, want) in corners.iter().zip(expected) {
        let ndc = to_ndc(&light, *corner);
        assert!((ndc - want).abs().max_element() < 1e-3, "{ndc} vs {want}");
    }
}

#[test]
fn center_is_midway_between_planes() {
    let light = light_frustum();
    let expected = light.origin() + light.direction() * 13.0;
    assert!(approx_vec3(light.center(), expected));
}

#[test]
fn outline_starts_at_origin_and_edges_stay_in_range() {
    let light = light_frustum();
    let outline = light.outline();
    assert_eq!(outline[0], light.origin());
    assert_eq!(&outline[1..], &light.corners());
    assert!(OUTLINE_EDGES.iter().all(|&i| (i as usize) < outline.len()));
}

#[test]
fn display_lists_projection_and_orientation() {
    let text = light_frustum().to_string();
    assert!(text.starts_with("Perspective:"));
    assert!(text.contains("Origin = (8.66, 8.66, 12.375)"));
}

// ============================================================================
// enclose()
// ============================================================================

#[test]
fn perspective_enclose_contains_other_volume() {
    let camera = camera_frustum();
    let mut light = light_frustum();
    light.enclose(&camera).unwrap();

    assert!(approx_vec3(light.at(), camera.center()));
    assert_eq!(light.origin(), Vec3::new(8.66, 8.66, 12.375));
    assert_contains(&light, &camera);
}

#[test]
fn perspective_enclose_is_idempotent() {
    let camera = camera_frustum();
    let mut light = light_frustum();

    light.enclose(&camera).unwrap();
    let first = light.view_projection();
    light.enclose(&camera).unwrap();
    let second = light.view_projection();

    assert!(approx_mat4(first, second, 1e-4));
}

#[test]
fn orthographic_enclose_keeps_orientation() {
    let camera = camera_frustum();
    let mut ortho = Frustum::new(Orthographic::default());
    ortho
        .orient(Vec3::new(0.0, 20.0, 5.0), Vec3::ZERO, Vec3::Y)
        .unwrap();
    let origin = ortho.origin();
    let at = ortho.at();

    ortho.enclose(&camera).unwrap();

    assert_eq!(ortho.origin(), origin);
    assert_eq!(ortho.at(), at);
    assert_contains(&ortho, &camera);

    let first = ortho.view_projection();
    ortho.enclose(&camera).unwrap();
    assert!(approx_mat4(first, ortho.view_projection(), 1e-4));
}

#[test]
fn orthographic_enclose_is_tight() {
    // Camera straight down -Z from the ortho frustum's own eye.
    let mut camera = Frustum::new(Perspective::new(90.0, 1.0, 1.0, 3.0).unwrap());
    camera.orient(Vec3::Z * 10.0, Vec3::ZERO, Vec3::Y).unwrap();

    let mut ortho = Frustum::new(Orthographic::default());
    ortho.orient(Vec3::Z * 10.0, Vec3::ZERO, Vec3::Y).unwrap();
    ortho.enclose(&camera).unwrap();

    // tan(45°) = 1, so the far plane is 3 wide in each half.
    let (xmin, xmax, ymin, ymax) = ortho.projection().bounds();
    assert!(approx(xmin, -3.0) && approx(xmax, 3.0));
    assert!(approx(ymin, -3.0) && approx(ymax, 3.0));
    assert!(approx(ortho.projection().near(), 1.0));
    assert!(approx(ortho.projection().far(), 3.0));
}

#[test]
fn perspective_enclose_from_inside_target_fails_unchanged() {
    let camera = camera_frustum();
    let mut light = light_frustum();
    light.orient(camera.center(), Vec3::ZERO, Vec3::Y).unwrap();
    let before = light;

    // Re-aiming at the camera's center from the center itself is degenerate.
    let err = light.enclose(&camera).unwrap_err();
    assert!(matches!(err, FrustumError::DegenerateOrientation { .. }));
    assert_eq!(light, before);
}

#[test]
fn perspective_fit_with_no_visible_corner_is_an_error() {
    let behind = [Vec3::new(0.0, 0.0, 1.0); 8];
    assert_eq!(
        Perspective::fit(&behind).unwrap_err(),
        FrustumError::NoVisibleCorners
    );
}

// ============================================================================
// Shadow bias
// ============================================================================

#[test]
fn bias_maps_clip_cube_into_unit_cube() {
    for x in [-1.0, 0.0, 1.0] {
        for y in [-1.0, 0.3, 1.0] {
            for z in [-1.0, 0.7, 1.0] {
                let p = SHADOW_BIAS.transform_point3(Vec3::new(x, y, z));
                assert!(
                    p.min_element() >= -EPSILON && p.max_element() <= 1.0 + EPSILON,
                    "bias * ({x}, {y}, {z}) = {p}"
                );
                assert!(approx_vec3(p, Vec3::new(x, y, z) * 0.5 + 0.5));
            }
        }
    }
}

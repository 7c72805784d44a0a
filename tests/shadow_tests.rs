//! Shadow Pipeline Tests
//!
//! End-to-end tests of the two-pass renderer on the software backend:
//! - Depth pass content against analytic light-to-surface distances
//! - Lit and shadowed visibility in the default scene
//! - Resize handling and frame skipping
//! - Pass ordering and pass validation

use std::time::Duration;

use glam::{Mat4, Vec3, Vec4};

use umbra::renderer::{
    CullMode, FrameOutcome, PassDescriptor, PassTarget, RenderBackend, ShadingMode, ShadowRenderer,
    SkipReason, SoftwareBackend, Viewport,
};
use umbra::renderer::software::shading::encode_linear;
use umbra::resources::PhongMaterial;
use umbra::resources::primitives::create_box;
use umbra::scene::frustum::{Frustum, Perspective};
use umbra::scene::{SceneDrawList, build_default_scene};
use umbra::settings::Settings;

const LIGHT_NEAR: f32 = 1.0;
const LIGHT_FAR: f32 = 25.0;

/// A small window keeps the shaded pass cheap.
fn small_settings() -> Settings {
    let mut settings = Settings::default();
    settings.render.window_size = [160, 120];
    settings
}

fn setup_default() -> (ShadowRenderer, SoftwareBackend, SceneDrawList) {
    let settings = small_settings();
    let mut backend = SoftwareBackend::from_settings(&settings.render).unwrap();
    let scene = build_default_scene(&mut backend).unwrap();
    let renderer = ShadowRenderer::new(&settings.render, &settings.scene).unwrap();
    (renderer, backend, scene)
}

fn render(renderer: &mut ShadowRenderer, backend: &mut SoftwareBackend, scene: &SceneDrawList) {
    let outcome = renderer
        .render_frame(backend, scene, Duration::ZERO)
        .unwrap();
    assert!(outcome.is_rendered(), "frame was skipped: {outcome:?}");
}

/// Window depth back to eye-space distance for the light's projection.
fn linearize(depth: f32) -> f32 {
    let z_ndc = depth * 2.0 - 1.0;
    2.0 * LIGHT_NEAR * LIGHT_FAR / (LIGHT_FAR + LIGHT_NEAR - z_ndc * (LIGHT_FAR - LIGHT_NEAR))
}

/// Entry and exit distances of a ray through an axis-aligned box.
fn ray_box(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> (f32, f32) {
    let inv = dir.recip();
    let t0 = (min - origin) * inv;
    let t1 = (max - origin) * inv;
    (t0.min(t1).max_element(), t0.max(t1).min_element())
}

fn visibility(renderer: &ShadowRenderer, backend: &SoftwareBackend, point: Vec3) -> f32 {
    let coord = renderer.light_space_transform() * point.extend(1.0);
    backend.shadow_map().sample_compare_proj(coord)
}

// ============================================================================
// Depth pass
// ============================================================================

#[test]
fn depth_pass_records_cube_back_face_distance() {
    let settings = small_settings();
    let mut backend = SoftwareBackend::from_settings(&settings.render).unwrap();
    let mut renderer = ShadowRenderer::new(&settings.render, &settings.scene).unwrap();

    let eye = Vec3::new(8.66, 8.66, 12.375);
    let mut light = Frustum::new(Perspective::new(50.0, 1.0, LIGHT_NEAR, LIGHT_FAR).unwrap());
    light.orient(eye, Vec3::ZERO, Vec3::Y).unwrap();
    renderer.set_light(light);

    let mut scene = SceneDrawList::new();
    scene
        .add_mesh(
            &mut backend,
            "cube",
            &create_box(1.0, 1.0, 1.0),
            Mat4::IDENTITY,
            PhongMaterial::matte(),
        )
        .unwrap();

    render(&mut renderer, &mut backend, &scene);

    let map = backend.shadow_map();
    let (w, h) = (map.width(), map.height());
    let depth = map.texel(w / 2, h / 2).unwrap();
    assert!(depth < 1.0, "center texel was not written");

    // Front faces are culled, so the map holds the far side of the cube.
    let dir = -eye.normalize();
    let (entry, exit) = ray_box(eye, dir, Vec3::splat(-0.5), Vec3::splat(0.5));
    let distance = linearize(depth);
    assert!(
        (distance - exit).abs() < 0.1,
        "depth {depth} -> distance {distance}, expected {exit}"
    );
    assert!(distance > entry + 0.5);
}

#[test]
fn depth_pass_leaves_uncovered_texels_at_far() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    let map = backend.shadow_map();
    let (lo, hi) = map.range();
    assert!(lo > 0.0 && lo < 1.0, "nearest depth {lo}");
    // Below the culled floor the light sees nothing.
    assert!((hi - 1.0).abs() < f32::EPSILON);
}

// ============================================================================
// Visibility
// ============================================================================

#[test]
fn open_floor_point_is_lit() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    let v = visibility(&renderer, &backend, Vec3::new(4.0, 0.0, 4.0));
    assert!(v > 0.99, "visibility {v}");
}

#[test]
fn floor_point_behind_teapot_is_shadowed() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    // On the floor, on the line from the light through the sphere's center.
    let v = visibility(&renderer, &backend, Vec3::new(0.0, 0.0, -2.59));
    assert!(v < 0.01, "visibility {v}");
}

#[test]
fn depth_pass_covers_backend_shadow_target() {
    // Settings ask for 512x512; the backend's own target is smaller.
    let settings = small_settings();
    let mut backend = SoftwareBackend::new(160, 120, 256, 256).unwrap();
    let scene = build_default_scene(&mut backend).unwrap();
    let mut renderer = ShadowRenderer::new(&settings.render, &settings.scene).unwrap();

    assert_eq!(
        renderer.depth_pass(backend.shadow_map_size()).viewport,
        Viewport::new(256, 256)
    );

    render(&mut renderer, &mut backend, &scene);

    let behind = visibility(&renderer, &backend, Vec3::new(0.0, 0.0, -2.59));
    assert!(behind < 0.01, "visibility {behind}");
    let open = visibility(&renderer, &backend, Vec3::new(4.0, 0.0, 4.0));
    assert!(open > 0.99, "visibility {open}");
}

#[test]
fn points_outside_light_frustum_count_as_lit() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    let map = backend.shadow_map();
    assert_eq!(map.sample_compare_proj(Vec4::new(2.0, 0.5, 0.5, 1.0)), 1.0);
    assert_eq!(map.sample_compare_proj(Vec4::new(0.5, 0.5, 0.5, -1.0)), 1.0);
}

#[test]
fn shadow_matrix_composes_light_space_with_model() {
    let (renderer, _, _) = setup_default();
    let model = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let expected = renderer.light_space_transform() * model;
    assert_eq!(renderer.shadow_matrix(model), expected);
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn frame_runs_depth_pass_before_shaded_pass() {
    let (mut renderer, mut backend, scene) = setup_default();
    let outcome = renderer
        .render_frame(&mut backend, &scene, Duration::ZERO)
        .unwrap();

    let FrameOutcome::Rendered(stats) = outcome else {
        panic!("frame skipped: {outcome:?}");
    };
    assert_eq!(stats.frame, 1);
    assert_eq!(stats.draw_calls, 2 * scene.len() as u32);
    assert_eq!(backend.pass_log(), &[PassTarget::ShadowMap, PassTarget::Surface]);
    assert_eq!(backend.frames_presented(), 1);
}

#[test]
fn passes_carry_independent_state() {
    let (renderer, backend, _) = setup_default();
    let depth = renderer.depth_pass(backend.shadow_map_size());
    let shaded = renderer.shaded_pass();

    assert_eq!(depth.target, PassTarget::ShadowMap);
    assert_eq!(depth.shading, ShadingMode::RecordDepth);
    assert_eq!(depth.cull, CullMode::Front);
    assert!(depth.depth_bias.is_some());
    assert_eq!(depth.viewport, Viewport::new(512, 512));

    assert_eq!(shaded.target, PassTarget::Surface);
    assert_eq!(shaded.shading, ShadingMode::ShadeWithShadow);
    assert_eq!(shaded.cull, CullMode::None);
    assert!(shaded.depth_bias.is_none());
    assert_eq!(shaded.viewport, Viewport::new(160, 120));
}

#[test]
fn shaded_pass_clears_to_background_and_draws_scene() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    let image = backend.color_target();
    let clear = encode_linear(Vec4::new(0.5, 0.5, 0.5, 1.0));
    assert!(image.pixels().all(|p| p.0[3] == 255));
    assert_ne!(image.get_pixel(80, 60).0, clear, "nothing drawn at the center");

    let (lo, _) = backend.depth_buffer().range();
    assert!(lo < 1.0);
}

#[test]
fn resize_updates_viewport_and_aspect_before_next_frame() {
    let mut settings = Settings::default();
    settings.render.window_size = [800, 600];
    let mut backend = SoftwareBackend::from_settings(&settings.render).unwrap();
    let scene = build_default_scene(&mut backend).unwrap();
    let mut renderer = ShadowRenderer::new(&settings.render, &settings.scene).unwrap();

    renderer.resize(1024, 768);
    render(&mut renderer, &mut backend, &scene);

    assert_eq!(backend.surface_size(), (1024, 768));
    assert_eq!(renderer.viewport(), Viewport::new(1024, 768));
    assert_eq!(renderer.shaded_pass().viewport, Viewport::new(1024, 768));

    let aspect = renderer.camera_frustum().unwrap().projection().aspect();
    assert!((aspect - 1024.0 / 768.0).abs() < 1e-6);
    assert_eq!(backend.color_target().dimensions(), (1024, 768));
}

#[test]
fn hidden_window_skips_without_advancing() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);
    let angle = renderer.camera().angle();

    renderer.set_visible(false);
    let outcome = renderer
        .render_frame(&mut backend, &scene, Duration::from_secs(3))
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::NotVisible));
    assert_eq!(renderer.frame_count(), 1);
    assert_eq!(backend.frames_presented(), 1);
    assert_eq!(renderer.camera().angle(), angle);

    renderer.set_visible(true);
    render(&mut renderer, &mut backend, &scene);
    assert_eq!(renderer.frame_count(), 2);
}

#[test]
fn minimized_window_skips() {
    let (mut renderer, mut backend, scene) = setup_default();
    renderer.resize(0, 0);
    let outcome = renderer
        .render_frame(&mut backend, &scene, Duration::ZERO)
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::NotVisible));
}

#[test]
fn unavailable_surface_skips() {
    let (mut renderer, mut backend, scene) = setup_default();
    backend.set_surface_available(false);

    let outcome = renderer
        .render_frame(&mut backend, &scene, Duration::ZERO)
        .unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::SurfaceUnavailable));
    assert_eq!(renderer.frame_count(), 0);

    backend.set_surface_available(true);
    render(&mut renderer, &mut backend, &scene);
}

#[test]
fn camera_orbits_with_elapsed_time() {
    let (mut renderer, mut backend, scene) = setup_default();
    let start = renderer.camera().angle();

    render(&mut renderer, &mut backend, &scene);
    assert_eq!(renderer.camera().angle(), start);

    renderer
        .render_frame(&mut backend, &scene, Duration::from_secs(2))
        .unwrap();
    let expected = (start + 0.2 * 2.0) % std::f32::consts::TAU;
    assert!((renderer.camera().angle() - expected).abs() < 1e-5);
}

#[test]
fn light_fit_encloses_camera_when_enabled() {
    let mut settings = small_settings();
    settings.scene.fit_light_to_camera = true;
    settings.scene.camera_far = 8.0;
    let mut backend = SoftwareBackend::from_settings(&settings.render).unwrap();
    let scene = build_default_scene(&mut backend).unwrap();
    let mut renderer = ShadowRenderer::new(&settings.render, &settings.scene).unwrap();
    let before = *renderer.light();

    render(&mut renderer, &mut backend, &scene);

    let camera = renderer.camera_frustum().unwrap();
    assert_ne!(*renderer.light(), before);
    assert_eq!(renderer.light().origin(), before.origin());
    for corner in camera.corners() {
        let clip = renderer.light().view_projection() * corner.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.abs().max_element() <= 1.001, "corner {corner} at {ndc}");
    }
}

// ============================================================================
// Backend validation
// ============================================================================

#[test]
fn pass_outside_frame_is_rejected() {
    let (renderer, mut backend, _) = setup_default();
    let depth = renderer.depth_pass(backend.shadow_map_size());
    assert!(backend.execute_pass(&depth, &[]).is_err());
}

#[test]
fn mismatched_target_and_shading_is_rejected() {
    let (renderer, mut backend, _) = setup_default();
    backend.begin_frame().unwrap();

    let bad = PassDescriptor {
        shading: ShadingMode::ShadeWithShadow,
        ..renderer.depth_pass(backend.shadow_map_size())
    };
    assert!(backend.execute_pass(&bad, &[]).is_err());

    let bad = PassDescriptor {
        shading: ShadingMode::RecordDepth,
        ..renderer.shaded_pass()
    };
    assert!(backend.execute_pass(&bad, &[]).is_err());
}

#[test]
fn zero_sized_shadow_target_is_incomplete() {
    let err = SoftwareBackend::new(160, 120, 0, 512).err().unwrap();
    assert!(err.to_string().contains("Shadow target incomplete"));
}

#[test]
fn headless_snapshot_writes_png() {
    let (mut renderer, mut backend, scene) = setup_default();
    render(&mut renderer, &mut backend, &scene);

    let path = std::env::temp_dir().join(format!("umbra-snapshot-{}.png", std::process::id()));
    backend.save_png(&path).unwrap();
    let decoded = image::open(&path).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (160, 120));
    std::fs::remove_file(&path).ok();
}

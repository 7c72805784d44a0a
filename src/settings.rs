//! Renderer & Scene Settings
//!
//! Configuration consumed once at startup. Every field has a default, so a
//! config file only needs to name what it changes:
//!
//! ```json
//! {
//!   "render": { "shadow_map_size": [1024, 1024], "vsync": false },
//!   "scene":  { "light_position": [0.0, 10.0, 10.0] }
//! }
//! ```
//!
//! # Fields
//!
//! | Field                       | Default                 |
//! |-----------------------------|-------------------------|
//! | `render.window_size`        | 800 x 600               |
//! | `render.shadow_map_size`    | 512 x 512               |
//! | `render.clear_color`        | (0.5, 0.5, 0.5, 1.0)    |
//! | `scene.light_position`      | (0, 8.6625, 12.375)     |
//! | `scene.light_fovy`          | 50°                     |
//! | `scene.camera_radius`       | 11.5                    |

use std::path::Path;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::scene::frustum::{Frustum, Perspective};
use crate::utils::OrbitCamera;

// ---------------------------------------------------------------------------
// PowerPreference
// ---------------------------------------------------------------------------

/// GPU adapter selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerPreference {
    LowPower,
    #[default]
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(value: PowerPreference) -> Self {
        match value {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// Window, render target and device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub window_size: [u32; 2],
    /// Width and height of the depth texture rendered from the light.
    pub shadow_map_size: [u32; 2],
    /// Background color of the shaded pass (linear RGBA).
    pub clear_color: [f32; 4],
    pub vsync: bool,
    pub power_preference: PowerPreference,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            window_size: [800, 600],
            shadow_map_size: [512, 512],
            clear_color: [0.5, 0.5, 0.5, 1.0],
            vsync: true,
            power_preference: PowerPreference::default(),
        }
    }
}

impl RenderSettings {
    #[must_use]
    pub fn clear_color(&self) -> Vec4 {
        Vec4::from_array(self.clear_color)
    }
}

// ---------------------------------------------------------------------------
// SceneSettings
// ---------------------------------------------------------------------------

/// Light and camera parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub light_position: [f32; 3],
    pub light_target: [f32; 3],
    pub light_up: [f32; 3],
    /// Degrees.
    pub light_fovy: f32,
    pub light_aspect: f32,
    pub light_near: f32,
    pub light_far: f32,
    pub light_intensity: [f32; 3],
    /// Refit the light projection around the camera volume every frame.
    pub fit_light_to_camera: bool,

    pub camera_radius: f32,
    pub camera_height: f32,
    /// Radians.
    pub camera_angle: f32,
    /// Radians per second.
    pub camera_speed: f32,
    /// Degrees.
    pub camera_fovy: f32,
    pub camera_near: f32,
    pub camera_far: f32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        let c = 1.65_f32;
        Self {
            light_position: [0.0, c * 5.25, c * 7.5],
            light_target: [0.0, 0.0, 0.0],
            light_up: [0.0, 1.0, 0.0],
            light_fovy: 50.0,
            light_aspect: 1.0,
            light_near: 1.0,
            light_far: 25.0,
            light_intensity: [0.85, 0.85, 0.85],
            fit_light_to_camera: false,

            camera_radius: 11.5,
            camera_height: 7.0,
            camera_angle: std::f32::consts::FRAC_PI_4,
            camera_speed: 0.2,
            camera_fovy: 50.0,
            camera_near: 0.1,
            camera_far: 100.0,
        }
    }
}

impl SceneSettings {
    /// The light's frustum, oriented and configured.
    pub fn light_frustum(&self) -> Result<Frustum<Perspective>> {
        let mut frustum = Frustum::new(Perspective::new(
            self.light_fovy,
            self.light_aspect,
            self.light_near,
            self.light_far,
        )?);
        frustum.orient(
            Vec3::from_array(self.light_position),
            Vec3::from_array(self.light_target),
            Vec3::from_array(self.light_up),
        )?;
        Ok(frustum)
    }

    #[must_use]
    pub fn light_intensity(&self) -> Vec3 {
        Vec3::from_array(self.light_intensity)
    }

    #[must_use]
    pub fn orbit_camera(&self) -> OrbitCamera {
        let mut camera = OrbitCamera::with_angle(self.camera_angle);
        camera.radius = self.camera_radius;
        camera.height = self.camera_height;
        camera.angular_speed = self.camera_speed;
        camera.fovy = self.camera_fovy;
        camera.near = self.camera_near;
        camera.far = self.camera_far;
        camera
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Both settings sections, as stored in a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub render: RenderSettings,
    pub scene: SceneSettings,
}

impl Settings {
    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&text)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

//! Utility Module
//!
//! - [`OrbitCamera`]: the animated viewer that circles the scene
//! - [`FrameClock`]: per-frame delta derived from elapsed time

pub mod orbit_control;
pub mod time;

pub use orbit_control::OrbitCamera;
pub use time::FrameClock;

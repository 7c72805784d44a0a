//! Application shell: a winit window driving the shadow renderer on wgpu.

pub mod winit;

pub use self::winit::App;

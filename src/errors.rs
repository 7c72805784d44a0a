//! Error Types
//!
//! This module defines the error types used throughout the renderer.
//!
//! # Overview
//!
//! The main error type [`UmbraError`] covers the fatal failure modes:
//! - GPU initialization failures (adapter, device, surface)
//! - Shadow target setup failures
//! - Frustum construction and fitting errors
//! - Configuration and snapshot I/O
//!
//! Transient per-frame conditions (a hidden window, an unavailable surface
//! texture) are *not* errors; they are reported as
//! [`FrameOutcome::Skipped`](crate::renderer::FrameOutcome::Skipped).
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, UmbraError>`.

use thiserror::Error;

use crate::scene::frustum::FrustumError;

/// The main error type for the renderer.
#[derive(Error, Debug)]
pub enum UmbraError {
    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Failed to create or configure the window surface.
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// Event loop error (winit).
    #[error("Event loop error: {0}")]
    EventLoopError(#[from] winit::error::EventLoopError),

    /// The off-screen depth target could not be made complete.
    #[error("Shadow target incomplete: {0}")]
    ShadowTargetIncomplete(String),

    /// A draw referenced a mesh handle the backend does not own.
    #[error("Unknown mesh handle: {0}")]
    UnknownMesh(String),

    /// A pass was issued with a configuration the backend cannot run.
    #[error("Invalid pass '{label}': {reason}")]
    InvalidPass {
        /// Label of the rejected pass
        label: &'static str,
        /// Why it was rejected
        reason: String,
    },

    // ========================================================================
    // Geometry Errors
    // ========================================================================
    /// Frustum orientation, projection or enclosure failed.
    #[error("Frustum error: {0}")]
    Frustum(#[from] FrustumError),

    /// Mesh data violated the position/normal/index contract.
    #[error("Invalid mesh '{name}': {reason}")]
    InvalidMesh {
        /// Name of the mesh producer
        name: String,
        /// What was wrong with it
        reason: String,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// PNG encoding error.
    #[error("Image encode error: {0}")]
    ImageEncodeError(String),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for UmbraError {
    fn from(err: image::ImageError) -> Self {
        UmbraError::ImageEncodeError(err.to_string())
    }
}

impl From<wgpu::CreateSurfaceError> for UmbraError {
    fn from(err: wgpu::CreateSurfaceError) -> Self {
        UmbraError::SurfaceError(err.to_string())
    }
}

/// Alias for `Result<T, UmbraError>`.
pub type Result<T> = std::result::Result<T, UmbraError>;

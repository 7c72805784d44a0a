//! CPU-side mesh data.
//!
//! [`MeshData`] is the contract between procedural shape producers and the
//! renderer: a flat position stream, a flat normal stream and a triangle
//! index stream (3 indices per face). Backends upload it once and hand back
//! a [`MeshId`](crate::renderer::MeshId).

use glam::{Mat4, Vec3};

use crate::errors::{Result, UmbraError};

/// Axis-aligned bounds of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Vertex and index streams of one shape.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        indices: Vec<u32>,
    ) -> Self {
        Self {
            name: name.into(),
            positions,
            normals,
            indices,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of indices a draw call consumes.
    #[inline]
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Checks that the streams agree with each other.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(UmbraError::InvalidMesh {
                name: self.name.clone(),
                reason,
            })
        };

        if self.positions.is_empty() {
            return fail("no vertices".into());
        }
        if self.normals.len() != self.positions.len() {
            return fail(format!(
                "{} normals for {} positions",
                self.normals.len(),
                self.positions.len()
            ));
        }
        if self.indices.len() % 3 != 0 {
            return fail(format!("{} indices is not a triangle list", self.indices.len()));
        }
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= self.positions.len()) {
            return fail(format!("index {bad} out of range"));
        }
        Ok(())
    }

    /// Bounds of the positions, optionally after a model transform.
    #[must_use]
    pub fn bounding_box(&self, model: &Mat4) -> BoundingBox {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            let p = model.transform_point3(Vec3::from_array(*p));
            min = min.min(p);
            max = max.max(p);
        }
        BoundingBox { min, max }
    }
}

//! Scene contents as a flat list of drawables.
//!
//! There is no hierarchy: every object carries its final model matrix. The
//! ground plane mesh is uploaded once and drawn three times (floor and two
//! walls), so several drawables may share one [`MeshId`].

use std::borrow::Cow;

use glam::{Mat4, Vec3};

use crate::errors::Result;
use crate::renderer::{MeshId, RenderBackend};
use crate::resources::PhongMaterial;
use crate::resources::mesh::MeshData;
use crate::resources::primitives::{
    PlaneOptions, SphereOptions, TorusOptions, create_plane, create_sphere, create_torus,
};

/// Warm base color of the showcase objects.
pub const OBJECT_COLOR: Vec3 = Vec3::new(0.7, 0.5, 0.3);

/// A mesh placed in the world with a material.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub name: Cow<'static, str>,
    pub mesh: MeshId,
    pub index_count: u32,
    pub model: Mat4,
    pub material: PhongMaterial,
}

impl Drawable {
    #[must_use]
    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }
}

/// Ordered list of everything drawn in both passes.
#[derive(Debug, Clone, Default)]
pub struct SceneDrawList {
    drawables: Vec<Drawable>,
}

impl SceneDrawList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, drawable: Drawable) {
        self.drawables.push(drawable);
    }

    /// Uploads `mesh` and adds a single drawable for it.
    pub fn add_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        name: impl Into<Cow<'static, str>>,
        mesh: &MeshData,
        model: Mat4,
        material: PhongMaterial,
    ) -> Result<MeshId> {
        let id = backend.upload_mesh(mesh)?;
        self.push(Drawable {
            name: name.into(),
            mesh: id,
            index_count: mesh.index_count(),
            model,
            material,
        });
        Ok(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.iter()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Drawable> {
        self.drawables.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> u64 {
        self.drawables.iter().map(|d| u64::from(d.triangle_count())).sum()
    }
}

impl<'a> IntoIterator for &'a SceneDrawList {
    type Item = &'a Drawable;
    type IntoIter = std::slice::Iter<'a, Drawable>;

    fn into_iter(self) -> Self::IntoIter {
        self.drawables.iter()
    }
}

/// Builds the showcase scene: a round "teapot" stand-in, a tilted torus and
/// a floor with two walls.
pub fn build_default_scene<B: RenderBackend + ?Sized>(backend: &mut B) -> Result<SceneDrawList> {
    let mut list = SceneDrawList::new();
    let glossy = PhongMaterial::glossy(OBJECT_COLOR);

    // The teapot's native frame is Z-up, hence the -90° about X. The sphere
    // is centered on its origin, so it is lifted to rest on the floor.
    let teapot = create_sphere(SphereOptions {
        radius: 1.5,
        width_segments: 48,
        height_segments: 24,
    });
    list.add_mesh(
        backend,
        "teapot",
        &teapot,
        Mat4::from_translation(Vec3::new(0.0, 1.5, 0.0))
            * Mat4::from_rotation_x(-90_f32.to_radians()),
        glossy,
    )?;

    let torus = create_torus(TorusOptions::default());
    list.add_mesh(
        backend,
        "torus",
        &torus,
        Mat4::from_translation(Vec3::new(0.0, 2.0, 5.0))
            * Mat4::from_rotation_x(-45_f32.to_radians()),
        glossy,
    )?;

    let plane = create_plane(PlaneOptions {
        width: 40.0,
        depth: 40.0,
        width_segments: 2,
        depth_segments: 2,
    });
    let plane_id = backend.upload_mesh(&plane)?;
    // The back wall faces away from the scene; shading lights both sides.
    let walls = [
        ("floor", Mat4::IDENTITY),
        (
            "wall_left",
            Mat4::from_translation(Vec3::new(-5.0, 5.0, 0.0))
                * Mat4::from_rotation_z(-90_f32.to_radians()),
        ),
        (
            "wall_back",
            Mat4::from_translation(Vec3::new(0.0, 5.0, -5.0))
                * Mat4::from_rotation_x(-90_f32.to_radians()),
        ),
    ];
    for (name, model) in walls {
        list.push(Drawable {
            name: Cow::Borrowed(name),
            mesh: plane_id,
            index_count: plane.index_count(),
            model,
            material: PhongMaterial::matte(),
        });
    }

    log::info!(
        "Scene ready: {} drawables, {} triangles",
        list.len(),
        list.triangle_count()
    );
    Ok(list)
}

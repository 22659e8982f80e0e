//! Render Camera
//!
//! The per-camera view of the draw loop: matrices, frustum, culling mask,
//! and the camera's own [`ShaderData`] scope. Transform and projection
//! bookkeeping belong to the scene layer; this type only consumes the
//! matrices that layer produces.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::render::culling::{Frustum, Layer};
use crate::render::shader_data::ShaderData;
use crate::shader::context::ShaderContext;
use crate::shader::property::ShaderDataGroup;

/// Projection kind, which selects the sort-distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Camera state consumed by the draw loop.
pub struct RenderCamera {
    /// Camera-scope shader data (view/projection uniforms, exposure, …).
    pub shader_data: ShaderData,

    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection_matrix: Mat4,

    /// World-space camera position.
    pub position: Vec3,
    /// World-space forward axis (looking direction).
    pub forward: Vec3,

    pub projection: Projection,
    pub frustum: Frustum,

    /// Layers this camera draws.
    pub culling_mask: Layer,
    /// Frustum culling toggle; layer masking always applies.
    pub frustum_culling: bool,
}

impl RenderCamera {
    #[must_use]
    pub fn new(ctx: Arc<ShaderContext>) -> Self {
        Self {
            shader_data: ShaderData::new(ShaderDataGroup::Camera, ctx),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            projection: Projection::Perspective,
            frustum: Frustum::default(),
            culling_mask: Layer::EVERYTHING,
            frustum_culling: true,
        }
    }

    /// Updates matrices, frustum, and the derived position/forward axes.
    pub fn set_view_projection(&mut self, view: Mat4, projection: Mat4) {
        self.view_matrix = view;
        self.projection_matrix = projection;
        self.view_projection_matrix = projection * view;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);

        // View is the inverse of the camera's world matrix.
        let world = view.inverse();
        self.position = world.w_axis.truncate();
        self.forward = (-world.z_axis.truncate()).normalize_or(Vec3::NEG_Z);
    }

    /// The distance metric used to sort draws from this camera.
    ///
    /// Squared Euclidean distance for perspective cameras; signed projection
    /// onto the forward axis for orthographic ones (where Euclidean distance
    /// would mis-order objects off to the side).
    #[must_use]
    pub fn sort_distance(&self, world_position: Vec3) -> f32 {
        match self.projection {
            Projection::Perspective => self.position.distance_squared(world_position),
            Projection::Orthographic => (world_position - self.position).dot(self.forward),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_distance_is_squared_euclidean() {
        let ctx = ShaderContext::new();
        let camera = RenderCamera::new(ctx);
        assert_eq!(camera.sort_distance(Vec3::new(0.0, 3.0, 4.0)), 25.0);
    }

    #[test]
    fn orthographic_distance_is_signed_forward_projection() {
        let ctx = ShaderContext::new();
        let mut camera = RenderCamera::new(ctx);
        camera.projection = Projection::Orthographic;

        // Default forward is -Z: things in front have negative Z.
        assert_eq!(camera.sort_distance(Vec3::new(0.0, 0.0, -5.0)), 5.0);
        assert_eq!(camera.sort_distance(Vec3::new(0.0, 0.0, 2.0)), -2.0);
        // Sideways offset does not affect the metric.
        assert_eq!(camera.sort_distance(Vec3::new(100.0, 0.0, -5.0)), 5.0);
    }

    #[test]
    fn view_update_derives_position_and_forward() {
        let ctx = ShaderContext::new();
        let mut camera = RenderCamera::new(ctx);

        let eye = Vec3::new(1.0, 2.0, 3.0);
        let view = Mat4::look_at_rh(eye, Vec3::new(1.0, 2.0, 0.0), Vec3::Y);
        let proj = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        camera.set_view_projection(view, proj);

        assert!((camera.position - eye).length() < 1e-4);
        assert!((camera.forward - Vec3::NEG_Z).length() < 1e-4);
    }
}

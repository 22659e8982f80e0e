//! Visibility Culling
//!
//! Layer masks and frustum/sphere intersection for the collect phase of the
//! draw loop. Bounds are supplied in world space by the transform system,
//! which is a collaborator — this module only tests them.

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

bitflags! {
    /// Rendering layer mask.
    ///
    /// A renderer lives on one or more layers; a camera draws the layers in
    /// its culling mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Layer: u32 {
        const LAYER_0 = 1 << 0;
        const LAYER_1 = 1 << 1;
        const LAYER_2 = 1 << 2;
        const LAYER_3 = 1 << 3;
        const LAYER_4 = 1 << 4;
        const LAYER_5 = 1 << 5;
        const LAYER_6 = 1 << 6;
        const LAYER_7 = 1 << 7;
        const EVERYTHING = u32::MAX;
    }
}

impl Default for Layer {
    fn default() -> Self {
        Layer::LAYER_0
    }
}

/// World-space bounding sphere of a renderable.
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[must_use]
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// A sphere that is never culled.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: f32::INFINITY,
        }
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// View frustum as six planes, extracted Gribb-Hartmann style from a
/// view-projection matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Extracts the planes from `view_projection`, assuming wgpu's [0, 1]
    /// NDC depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[0] = rows[3] + rows[0];
        planes[1] = rows[3] - rows[0];
        planes[2] = rows[3] + rows[1];
        planes[3] = rows[3] - rows[1];
        planes[4] = rows[2];
        planes[5] = rows[3] - rows[2];

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > f32::EPSILON {
                *plane /= length;
            }
        }

        Self { planes }
    }

    /// Sphere test: true when the sphere is at least partially inside.
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        for plane in &self.planes {
            let dist = plane.x * sphere.center.x
                + plane.y * sphere.center.y
                + plane.z * sphere.center.z
                + plane.w;
            if dist < -sphere.radius {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_frustum() -> Frustum {
        // Perspective camera at the origin looking down -Z.
        let proj = Mat4::perspective_rh(60.0_f32.to_radians(), 1.0, 0.1, 100.0);
        Frustum::from_matrix(proj)
    }

    #[test]
    fn sphere_in_front_is_visible() {
        let frustum = test_frustum();
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, -10.0), 1.0);
        assert!(frustum.intersects_sphere(&sphere));
    }

    #[test]
    fn sphere_behind_camera_is_culled() {
        let frustum = test_frustum();
        let sphere = BoundingSphere::new(Vec3::new(0.0, 0.0, 10.0), 1.0);
        assert!(!frustum.intersects_sphere(&sphere));
    }

    #[test]
    fn sphere_straddling_a_plane_is_visible() {
        let frustum = test_frustum();
        // Far off to the left, but with a radius large enough to poke in.
        let sphere = BoundingSphere::new(Vec3::new(-50.0, 0.0, -10.0), 60.0);
        assert!(frustum.intersects_sphere(&sphere));
    }

    #[test]
    fn unbounded_sphere_is_never_culled() {
        let frustum = test_frustum();
        assert!(frustum.intersects_sphere(&BoundingSphere::unbounded()));
    }

    #[test]
    fn layer_mask_intersection() {
        let renderer_layer = Layer::LAYER_2;
        assert!(Layer::EVERYTHING.intersects(renderer_layer));
        assert!(!(Layer::LAYER_0 | Layer::LAYER_1).intersects(renderer_layer));
    }
}

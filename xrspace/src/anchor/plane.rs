//! Plane anchor geometry

use serde::{Deserialize, Serialize};
use xrspace_core::math::{self, Mat4, Vec3};

/// Orientation class of a detected plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaneAlignment {
    Horizontal,
    Vertical,
}

/// Boundary mesh of a plane, in the anchor's local space
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaneMesh {
    pub vertices: Vec<[f64; 3]>,
    pub triangle_indices: Vec<u32>,
}

/// Geometry of a detected plane
///
/// The plane lies in the anchor's local XZ plane through `center`, with its
/// normal along local +Y. `extent` is the full size along local X and Z.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneGeometry {
    pub center: Vec3,
    pub extent: [f64; 2],
    pub alignment: PlaneAlignment,
    pub mesh: Option<PlaneMesh>,
}

impl PlaneGeometry {
    pub fn new(center: Vec3, extent: [f64; 2], alignment: PlaneAlignment) -> Self {
        Self {
            center,
            extent,
            alignment,
            mesh: None,
        }
    }

    pub fn with_mesh(mut self, mesh: PlaneMesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn half_extent(&self) -> [f64; 2] {
        [self.extent[0] * 0.5, self.extent[1] * 0.5]
    }

    /// Local-space offset `point_local - center` lies within the half-extent plus `tolerance`
    pub fn contains_local(&self, point_local: &Vec3, tolerance: f64) -> bool {
        let offset = point_local - self.center;
        let [half_x, half_z] = self.half_extent();
        offset.x.abs() <= half_x + tolerance && offset.z.abs() <= half_z + tolerance
    }

    /// World-space point on the plane and its unit normal, given the anchor pose
    pub fn world_point_and_normal(&self, anchor_pose: &Mat4) -> (Vec3, Vec3) {
        let point = math::transform_point(anchor_pose, &self.center);
        let normal = math::transform_vector(anchor_pose, &Vec3::y());
        let length = normal.norm();
        let normal = if length > f64::EPSILON {
            normal / length
        } else {
            Vec3::y()
        };
        (point, normal)
    }

    /// Plane area (extent product)
    pub fn area(&self) -> f64 {
        self.extent[0] * self.extent[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrspace_core::math::Quat;

    #[test]
    fn test_contains_with_tolerance() {
        let plane = PlaneGeometry::new(Vec3::zeros(), [2.0, 2.0], PlaneAlignment::Horizontal);
        assert!(plane.contains_local(&Vec3::new(1.0, 0.0, -1.0), 0.0));
        assert!(plane.contains_local(&Vec3::new(1.005, 0.0, 0.0), 0.0075));
        assert!(!plane.contains_local(&Vec3::new(1.02, 0.0, 0.0), 0.0075));
        assert!(!plane.contains_local(&Vec3::new(0.0, 0.0, -1.02), 0.0075));
    }

    #[test]
    fn test_offset_center() {
        let plane = PlaneGeometry::new(Vec3::new(5.0, 0.0, 0.0), [1.0, 1.0], PlaneAlignment::Horizontal);
        assert!(plane.contains_local(&Vec3::new(5.4, 0.0, 0.0), 0.0));
        assert!(!plane.contains_local(&Vec3::new(0.0, 0.0, 0.0), 0.0));
    }

    #[test]
    fn test_world_normal_follows_anchor_rotation() {
        let plane = PlaneGeometry::new(Vec3::zeros(), [1.0, 1.0], PlaneAlignment::Vertical);
        let pose = math::from_rotation_translation(
            &Quat::from_axis_angle(&Vec3::x_axis(), std::f64::consts::FRAC_PI_2),
            &Vec3::new(0.0, 0.0, -2.0),
        );
        let (point, normal) = plane.world_point_and_normal(&pose);
        assert!((point - Vec3::new(0.0, 0.0, -2.0)).norm() < 1e-12);
        assert!((normal - Vec3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }
}

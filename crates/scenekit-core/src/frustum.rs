//! View frustum extraction and containment tests.

use glam::{Mat4, Vec3};

use crate::aabb::Aabb;
use crate::ray::Plane;

/// A view frustum as six inward-facing planes.
///
/// Order: left, right, bottom, top, near, far.
#[derive(Debug, Clone)]
pub struct Frustum {
    /// The six bounding planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts frustum planes from a view-projection matrix
    /// (Gribb-Hartmann), assuming a 0..1 clip depth range.
    #[must_use]
    pub fn from_matrix(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        let plane = |v: glam::Vec4| {
            let normal = Vec3::new(v.x, v.y, v.z);
            let len = normal.length().max(1e-12);
            Plane {
                normal: normal / len,
                d: v.w / len,
            }
        };

        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r2),
                plane(r3 - r2),
            ],
        }
    }

    /// Whether `point` lies inside all six planes.
    #[must_use]
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to(point) >= 0.0)
    }

    /// Whether a sphere overlaps the frustum.
    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|p| p.distance_to(center) >= -radius)
    }

    /// Whether an AABB overlaps the frustum.
    ///
    /// Conservative per-plane test against the box corner farthest along
    /// each plane normal.
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            let far_corner = Vec3::new(
                if plane.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if plane.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if plane.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            if plane.distance_to(far_corner) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Transforms the frustum into another space (e.g. world-to-object) by
    /// re-extracting from the adjusted matrix.
    #[must_use]
    pub fn transformed(view_proj: Mat4, object_to_world: Mat4) -> Self {
        Self::from_matrix(view_proj * object_to_world)
    }
}

//! Rays, planes, and triangle intersection.

use glam::{Mat4, Vec3};

/// A ray with an origin and a (normalized) direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Ray origin.
    pub origin: Vec3,
    /// Ray direction; kept normalized by the constructors.
    pub dir: Vec3,
}

/// Result of a ray/surface intersection.
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// Parametric distance along the ray.
    pub t: f32,
    /// Intersection point.
    pub point: Vec3,
    /// Surface normal at the intersection.
    pub normal: Vec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    #[must_use]
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
        }
    }

    /// Returns the point at parametric distance `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Transforms the ray by `matrix` (e.g. world-to-object).
    ///
    /// The direction is re-normalized, so parametric distances from the
    /// transformed ray are in the target space's scale.
    #[must_use]
    pub fn transformed(&self, matrix: Mat4) -> Ray {
        Ray::new(
            matrix.transform_point3(self.origin),
            matrix.transform_vector3(self.dir),
        )
    }
}

/// An infinite plane `dot(normal, p) + d == 0`.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed distance term.
    pub d: f32,
}

impl Plane {
    /// Builds a plane through `point` with the given normal.
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane (positive on the normal side).
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Intersects a ray with the plane; `None` when near-parallel or behind
    /// the origin.
    #[must_use]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let denom = self.normal.dot(ray.dir);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = -self.distance_to(ray.origin) / denom;
        (t >= 0.0).then_some(t)
    }
}

/// Möller–Trumbore ray/triangle intersection.
///
/// Returns the hit with the triangle's geometric normal (facing the ray).
#[must_use]
pub fn intersect_triangle(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<RayHit> {
    let e1 = v1 - v0;
    let e2 = v2 - v0;
    let p = ray.dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = ray.dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv_det;
    if t < 0.0 {
        return None;
    }
    let mut normal = e1.cross(e2).normalize();
    if normal.dot(ray.dir) > 0.0 {
        normal = -normal;
    }
    Some(RayHit {
        t,
        point: ray.at(t),
        normal,
    })
}

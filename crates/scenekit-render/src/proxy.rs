//! Proxy shapes and the transform bracket.
//!
//! Proxies are cheap analytic stand-ins: a box or a sphere with exact
//! object-space intersection math and a baked low-poly draw payload.
//! [`TransformObject`] is how transforms enter the graph at all - scene
//! nodes carry none themselves.

use std::cell::Cell;
use std::f32::consts::PI;

use glam::Mat4;

use scenekit_core::{Aabb, Frustum, Ray, RayHit, Result, Vec3};

use crate::backend::{DrawData, Topology, Vertex};
use crate::object::{
    DispatchContext, Intersectable, RenderObject, TraverseContext, TraverseState,
};
use crate::traverse::RenderAction;

/// An axis-aligned box centered at the object-space origin.
pub struct ProxyBox {
    half_extents: Vec3,
    bounds: Aabb,
    vertices: Vec<Vertex>,
}

impl ProxyBox {
    /// Creates a box with the given half extents.
    #[must_use]
    pub fn new(half_extents: Vec3) -> Self {
        let h = half_extents;
        let bounds = Aabb::new(-h, h);
        Self {
            half_extents: h,
            bounds,
            vertices: box_soup(h),
        }
    }

    /// The box half extents.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        self.half_extents
    }
}

impl RenderObject for ProxyBox {
    fn kind(&self) -> &'static str {
        "proxy-box"
    }

    fn local_bounds(&self) -> Option<Aabb> {
        Some(self.bounds)
    }

    fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()> {
        ctx.guardian.commit(ctx.backend, ctx.state);
        ctx.backend.draw(&DrawData {
            topology: Topology::Triangles,
            vertices: &self.vertices,
        })
    }

    fn intersectable(&self) -> Option<&dyn Intersectable> {
        Some(self)
    }
}

impl Intersectable for ProxyBox {
    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let t = self.bounds.intersect_ray(ray)?;
        let point = ray.at(t);
        Some(RayHit {
            t,
            point,
            normal: box_normal(point, self.half_extents),
        })
    }

    fn nearest_vertex(&self, point: Vec3) -> Option<Vec3> {
        // Corners are the box's vertices.
        let h = self.half_extents;
        Some(Vec3::new(
            h.x.copysign(point.x),
            h.y.copysign(point.y),
            h.z.copysign(point.z),
        ))
    }

    fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        frustum.intersects_aabb(&self.bounds)
    }
}

/// Picks the face normal for a point on (or near) the box surface: the axis
/// where the point sits closest to its face wins.
fn box_normal(point: Vec3, half_extents: Vec3) -> Vec3 {
    let gaps = (half_extents - point.abs()).abs();
    if gaps.x <= gaps.y && gaps.x <= gaps.z {
        Vec3::new(point.x.signum(), 0.0, 0.0)
    } else if gaps.y <= gaps.z {
        Vec3::new(0.0, point.y.signum(), 0.0)
    } else {
        Vec3::new(0.0, 0.0, point.z.signum())
    }
}

fn box_soup(h: Vec3) -> Vec<Vertex> {
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let mut out = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let origin = normal * h;
        let du = u * h;
        let dv = v * h;
        let corners = [
            origin - du - dv,
            origin + du - dv,
            origin + du + dv,
            origin - du + dv,
        ];
        for &i in &[0usize, 1, 2, 0, 2, 3] {
            out.push(Vertex {
                position: corners[i].to_array(),
                normal: normal.to_array(),
            });
        }
    }
    out
}

/// A sphere centered at the object-space origin.
pub struct ProxySphere {
    radius: f32,
    bounds: Aabb,
    vertices: Vec<Vertex>,
}

impl ProxySphere {
    /// Creates a sphere with the given radius.
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            bounds: Aabb::new(Vec3::splat(-radius), Vec3::splat(radius)),
            vertices: sphere_soup(radius, 8, 12),
        }
    }

    /// The sphere radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl RenderObject for ProxySphere {
    fn kind(&self) -> &'static str {
        "proxy-sphere"
    }

    fn local_bounds(&self) -> Option<Aabb> {
        Some(self.bounds)
    }

    fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()> {
        ctx.guardian.commit(ctx.backend, ctx.state);
        ctx.backend.draw(&DrawData {
            topology: Topology::Triangles,
            vertices: &self.vertices,
        })
    }

    fn intersectable(&self) -> Option<&dyn Intersectable> {
        Some(self)
    }
}

impl Intersectable for ProxySphere {
    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        let b = ray.origin.dot(ray.dir);
        let c = ray.origin.length_squared() - self.radius * self.radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let mut t = -b - disc.sqrt();
        if t < 0.0 {
            t = -b + disc.sqrt();
        }
        if t < 0.0 {
            return None;
        }
        let point = ray.at(t);
        Some(RayHit {
            t,
            point,
            normal: point.normalize_or_zero(),
        })
    }

    fn nearest_vertex(&self, point: Vec3) -> Option<Vec3> {
        Some(point.normalize_or_zero() * self.radius)
    }

    fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        frustum.intersects_sphere(Vec3::ZERO, self.radius)
    }
}

fn sphere_soup(radius: f32, stacks: u32, slices: u32) -> Vec<Vertex> {
    let point = |stack: u32, slice: u32| -> Vec3 {
        let phi = PI * stack as f32 / stacks as f32;
        let theta = 2.0 * PI * slice as f32 / slices as f32;
        Vec3::new(
            phi.sin() * theta.cos(),
            phi.cos(),
            phi.sin() * theta.sin(),
        )
    };
    let mut out = Vec::new();
    for stack in 0..stacks {
        for slice in 0..slices {
            let quad = [
                point(stack, slice),
                point(stack + 1, slice),
                point(stack + 1, slice + 1),
                point(stack, slice + 1),
            ];
            for &i in &[0usize, 1, 2, 0, 2, 3] {
                let n = quad[i];
                out.push(Vertex {
                    position: (n * radius).to_array(),
                    normal: n.to_array(),
                });
            }
        }
    }
    out
}

/// The transform bracket: pushes its matrix for the subtree during
/// traversal and pops it afterwards. Draws nothing and queues no entries.
pub struct TransformObject {
    matrix: Cell<Mat4>,
}

impl TransformObject {
    /// Creates a bracket with the given local matrix.
    #[must_use]
    pub fn new(matrix: Mat4) -> Self {
        Self {
            matrix: Cell::new(matrix),
        }
    }

    /// Creates an identity bracket.
    #[must_use]
    pub fn identity() -> Self {
        Self::new(Mat4::IDENTITY)
    }

    /// The current local matrix.
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        self.matrix.get()
    }

    /// Replaces the local matrix.
    pub fn set_matrix(&self, matrix: Mat4) {
        self.matrix.set(matrix);
    }

    /// Applies a parent-space translation on top of the current matrix.
    pub fn translate_by(&self, delta: Vec3) {
        self.matrix
            .set(Mat4::from_translation(delta) * self.matrix.get());
    }
}

impl RenderObject for TransformObject {
    fn kind(&self) -> &'static str {
        "transform"
    }

    fn sets_local_transform(&self) -> bool {
        true
    }

    fn traverse(&self, ctx: &mut TraverseContext) -> Result<TraverseState> {
        ctx.action.push_matrix(self.matrix.get(), true)?;
        Ok(TraverseState::Continue)
    }

    fn post_traverse(&self, action: &mut RenderAction) -> Result<()> {
        action.pop_matrix().map(|_| ())
    }

    fn dispatch(&self, _ctx: &mut DispatchContext) -> Result<()> {
        Ok(())
    }
}

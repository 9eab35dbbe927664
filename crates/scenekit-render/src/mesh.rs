//! Indexed triangle meshes.

use std::cell::OnceCell;

use scenekit_core::{
    intersect_triangle, Aabb, Frustum, Ray, RayHit, Result, SceneError, Vec3,
};

use crate::backend::{DrawData, Topology, Vertex};
use crate::object::{DispatchContext, Intersectable, RenderObject};

/// A triangle mesh render object.
///
/// Geometry is immutable after construction; the draw payload (a flat-shaded
/// vertex soup) is baked up front, while the analytic intersection structure
/// is built lazily on first pick and cached for the object's lifetime.
pub struct MeshObject {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    vertices: Vec<Vertex>,
    bounds: Aabb,
    intersector: OnceCell<MeshIntersector>,
}

impl MeshObject {
    /// Builds a mesh from positions and triangle indices.
    ///
    /// Fails when any index is out of range.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let count = u32::try_from(positions.len())
            .map_err(|_| SceneError::ObjectContract("mesh too large".into()))?;
        for tri in &triangles {
            if tri.iter().any(|&i| i >= count) {
                return Err(SceneError::ObjectContract(format!(
                    "triangle index {} out of range (mesh has {count} vertices)",
                    tri.iter().max().copied().unwrap_or(0),
                )));
            }
        }

        let mut bounds = Aabb::empty();
        for &p in &positions {
            bounds.union_point(p);
        }

        let mut vertices = Vec::with_capacity(triangles.len() * 3);
        for tri in &triangles {
            let [a, b, c] = tri.map(|i| positions[i as usize]);
            let normal = (b - a).cross(c - a).normalize_or_zero();
            for p in [a, b, c] {
                vertices.push(Vertex {
                    position: p.to_array(),
                    normal: normal.to_array(),
                });
            }
        }

        Ok(Self {
            positions,
            triangles,
            vertices,
            bounds,
            intersector: OnceCell::new(),
        })
    }

    /// Vertex count.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Triangle count.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the analytic structure has been built yet.
    #[must_use]
    pub fn has_intersector(&self) -> bool {
        self.intersector.get().is_some()
    }
}

impl RenderObject for MeshObject {
    fn kind(&self) -> &'static str {
        "mesh"
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
        Some(self.intersector.get_or_init(|| {
            MeshIntersector::build(&self.positions, &self.triangles, self.bounds)
        }))
    }
}

/// Analytic intersection structure for a [`MeshObject`].
///
/// Plain triangle iteration behind a bounds early-out; built once per mesh.
pub struct MeshIntersector {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    bounds: Aabb,
}

impl MeshIntersector {
    fn build(positions: &[Vec3], triangles: &[[u32; 3]], bounds: Aabb) -> Self {
        Self {
            positions: positions.to_vec(),
            triangles: triangles.to_vec(),
            bounds,
        }
    }
}

impl Intersectable for MeshIntersector {
    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
        self.bounds.intersect_ray(ray)?;
        let mut nearest: Option<RayHit> = None;
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|i| self.positions[i as usize]);
            if let Some(hit) = intersect_triangle(ray, a, b, c) {
                if nearest.as_ref().map_or(true, |n| hit.t < n.t) {
                    nearest = Some(hit);
                }
            }
        }
        nearest
    }

    fn nearest_vertex(&self, point: Vec3) -> Option<Vec3> {
        self.positions
            .iter()
            .copied()
            .min_by(|a, b| {
                a.distance_squared(point).total_cmp(&b.distance_squared(point))
            })
    }

    fn intersects_frustum(&self, frustum: &Frustum) -> bool {
        // Conservative: bounds overlap counts even when no vertex is inside,
        // so a mesh straddling the region is still selected.
        frustum.intersects_aabb(&self.bounds)
    }
}

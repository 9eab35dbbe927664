//! Render object abstraction.
//!
//! A render object is anything a scene node can draw: a mesh, a proxy shape,
//! a manipulator gizmo, a transform bracket. The capability set is split
//! across default-able trait methods: traversal participation, post-traversal
//! cleanup, dispatch, and an optional analytic-intersection capability used
//! by picking.

use std::rc::Rc;

use glam::Mat4;

use scenekit_core::{Aabb, Camera, Frustum, Ray, RayHit, RenderState, Result, Vec3};

use crate::backend::RenderBackend;
use crate::guardian::RenderStateGuardian;
use crate::scene::NodeId;
use crate::traverse::RenderAction;

/// Outcome of a render object's traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseState {
    /// Traversal proceeds into the node's children.
    Continue,
    /// The node's children are skipped (its own `post_traverse` still runs).
    Cull,
}

/// Context handed to [`RenderObject::traverse`].
///
/// The `action` and `camera` fields are public so a re-entrant object (e.g. a
/// manipulator with a private sub-graph) can run a nested traversal.
pub struct TraverseContext<'a> {
    /// The in-flight traversal.
    pub action: &'a mut RenderAction,
    /// The camera for this frame.
    pub camera: &'a Camera,
    pub(crate) object: Rc<dyn RenderObject>,
}

impl TraverseContext<'_> {
    /// Queues one pooled traversal entry per active pass bit for this object,
    /// carrying the current matrix, graph path, and pass-masked render state.
    pub fn queue_passes(&mut self) -> Result<()> {
        let object = self.object.clone();
        self.action.queue_passes(&object)
    }

    /// The object being traversed.
    #[must_use]
    pub fn object(&self) -> &Rc<dyn RenderObject> {
        &self.object
    }
}

/// Context handed to [`RenderObject::dispatch`].
pub struct DispatchContext<'a> {
    /// The render backend to draw through.
    pub backend: &'a mut dyn RenderBackend,
    /// The shared state guardian; commit the resolved state before drawing.
    pub guardian: &'a mut RenderStateGuardian,
    /// The camera for this frame.
    pub camera: &'a Camera,
    /// Graph path captured at traversal time, outermost first.
    pub path: &'a [NodeId],
    /// The resolved, pass-masked render state for this entry.
    pub state: &'a RenderState,
    /// World transform for this entry (already applied to the backend).
    pub world: Mat4,
}

/// Analytic (CPU-side) intersection capability.
///
/// Objects exposing this are picked by exact ray or frustum math instead of
/// the raster selection fallback.
pub trait Intersectable {
    /// Intersects an object-space ray, returning the nearest hit.
    fn intersect_ray(&self, ray: &Ray) -> Option<RayHit>;

    /// The object-space vertex nearest to `point`, if the object has vertices.
    fn nearest_vertex(&self, point: Vec3) -> Option<Vec3>;

    /// Whether any part of the object overlaps an object-space frustum.
    fn intersects_frustum(&self, frustum: &Frustum) -> bool;
}

/// A drawable attached to a scene node.
///
/// Lifetime is bound to the owning node (shared via `Rc` so pooled traversal
/// entries can reference it within a frame). `Rc` also pins the whole render
/// layer to a single thread, which is the concurrency model: one traversal or
/// pick cycle at a time, nested re-entrancy allowed, parallelism not.
pub trait RenderObject {
    /// A short type tag, used by pick filters (e.g. `"mesh"`, `"gizmo"`).
    fn kind(&self) -> &'static str;

    /// Whether this object pushes its own local transform during traversal.
    ///
    /// Objects that do not are traversed under a frozen matrix stack, so a
    /// malformed implementation cannot corrupt ancestor transforms.
    fn sets_local_transform(&self) -> bool {
        false
    }

    /// Object-space bounds, used for back-to-front ordering of
    /// alpha-blended entries.
    fn local_bounds(&self) -> Option<Aabb> {
        None
    }

    /// Traversal step: queue pooled entries and decide whether the owning
    /// node's children are visited.
    fn traverse(&self, ctx: &mut TraverseContext) -> Result<TraverseState> {
        ctx.queue_passes()?;
        Ok(TraverseState::Continue)
    }

    /// Cleanup step, called for every object of a node after its children -
    /// always, even when traversal culled the children.
    fn post_traverse(&self, action: &mut RenderAction) -> Result<()> {
        let _ = action;
        Ok(())
    }

    /// Draws one traversal entry: commit `ctx.state` through the guardian,
    /// then issue draw calls.
    fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()>;

    /// The analytic-intersection capability, if this object supports it.
    ///
    /// Implementations that build the capability lazily should cache it;
    /// this is queried once per traversal entry per pick.
    fn intersectable(&self) -> Option<&dyn Intersectable> {
        None
    }
}

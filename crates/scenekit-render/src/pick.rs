//! Dual-mode picking.
//!
//! [`PickAction`] reuses the traversal machinery to flatten the graph under a
//! pick override (every object queued exactly once, solid fill forced), then
//! resolves hits per entry:
//!
//! - entries exposing [`Intersectable`](crate::object::Intersectable) are
//!   tested analytically, by exact ray or frustum math in object space;
//! - everything else is drawn into a backend selection session named by its
//!   traversal-list index, and the drained selection records are decoded
//!   back into hits.
//!
//! Both paths produce [`HitRecord`]s with a world-space point and an
//! eye-distance depth, so the merged result sorts nearest-first regardless
//! of which path produced each hit.

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec4};

use scenekit_core::{Camera, Frustum, Result, SceneError, Vec3, Viewport};

use crate::backend::{PickMatrices, RenderBackend, SelectionHit};
use crate::guardian::RenderStateGuardian;
use crate::object::{DispatchContext, RenderObject};
use crate::scene::{NodeId, SceneNode};
use crate::traverse::RenderAction;

/// One resolved pick hit, nearest-first after sorting.
///
/// Owns a handle to the hit object and its transform at pick time, so a
/// record stays valid after later traversals rewind the entry pool.
#[derive(Clone)]
pub struct HitRecord {
    /// The hit object's kind tag.
    pub kind: &'static str,
    /// The hit render object.
    pub object: Rc<dyn RenderObject>,
    /// The object-to-world transform the object was picked under.
    pub object_to_world: Mat4,
    /// Graph path to the hit object's node, outermost first.
    pub path: Vec<NodeId>,
    /// Names the object itself pushed during selection (the leading
    /// traversal-index name is already stripped). Empty for analytic hits.
    pub names: Vec<u32>,
    /// World-space hit point.
    pub world_point: Vec3,
    /// World-space vertex nearest the hit point, when the object has
    /// vertices and was hit analytically.
    pub nearest_vertex: Option<Vec3>,
    /// World-space surface normal, for analytic ray hits.
    pub normal: Option<Vec3>,
    /// Distance from the eye to the hit point.
    pub depth: f32,
}

/// Appends one selection record to a raw select buffer.
///
/// Layout per record: name count, minimum depth, maximum depth, then the
/// names. Depths are 0..1 values scaled to the full `u32` range.
pub fn encode_selection_record(buffer: &mut Vec<u32>, names: &[u32], z_min: f32, z_max: f32) {
    buffer.push(u32::try_from(names.len()).unwrap_or(u32::MAX));
    buffer.push(depth_to_bits(z_min));
    buffer.push(depth_to_bits(z_max));
    buffer.extend_from_slice(names);
}

/// Decodes a raw select buffer into hits.
///
/// A trailing truncated record (buffer cut off mid-hit) is dropped rather
/// than reported as an error.
#[must_use]
pub fn decode_selection_buffer(buffer: &[u32]) -> Vec<SelectionHit> {
    let mut hits = Vec::new();
    let mut i = 0;
    while i + 3 <= buffer.len() {
        let count = buffer[i] as usize;
        let z_min = depth_from_bits(buffer[i + 1]);
        let z_max = depth_from_bits(buffer[i + 2]);
        i += 3;
        if i + count > buffer.len() {
            break;
        }
        hits.push(SelectionHit {
            names: buffer[i..i + count].to_vec(),
            z_min,
            z_max,
        });
        i += count;
    }
    hits
}

fn depth_to_bits(z: f32) -> u32 {
    let clamped = f64::from(z.clamp(0.0, 1.0));
    // The scale loses at most one ulp of window depth, same as the GL
    // select buffer did.
    (clamped * f64::from(u32::MAX)) as u32
}

fn depth_from_bits(bits: u32) -> f32 {
    (f64::from(bits) / f64::from(u32::MAX)) as f32
}

/// A configured pick over a scene graph.
///
/// Holds its own [`RenderAction`] so the pick traversal list stays alive and
/// addressable (hit names are positions in that list) until the next pick or
/// [`clear`](Self::clear).
pub struct PickAction {
    action: RenderAction,
    guardian: RenderStateGuardian,
    camera: Camera,
    viewport: Viewport,
    center: Vec2,
    size: Vec2,
    multi: bool,
    kind_filter: Option<Vec<&'static str>>,
    configured: bool,
    hits: Vec<HitRecord>,
}

impl PickAction {
    /// Creates an unconfigured pick action.
    #[must_use]
    pub fn new() -> Self {
        Self {
            action: RenderAction::new(),
            guardian: RenderStateGuardian::with_default_handlers(),
            camera: Camera::new(1.0),
            viewport: Viewport::new(1.0, 1.0),
            center: Vec2::ZERO,
            size: Vec2::ONE,
            multi: false,
            configured: false,
            kind_filter: None,
            hits: Vec::new(),
        }
    }

    /// Configures the pick region from a window-space rectangle.
    ///
    /// A degenerate rectangle (`x1 == x2` and `y1 == y2`) selects ray mode;
    /// any actual rectangle, however small, selects frustum mode.
    pub fn init(
        &mut self,
        camera: &Camera,
        viewport: Viewport,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        multi_pick: bool,
    ) {
        self.camera = camera.clone();
        self.viewport = viewport;
        self.center = Vec2::new((x1 + x2) * 0.5, (y1 + y2) * 0.5);
        self.size = Vec2::new((x2 - x1).abs(), (y2 - y1).abs());
        self.multi = multi_pick;
        self.configured = true;
        self.hits.clear();
    }

    /// Restricts hits to objects whose kind tag is in `kinds`; `None` lifts
    /// the restriction. Cached hits are dropped: they were gathered under
    /// the old filter and may no longer qualify.
    pub fn set_kind_filter(&mut self, kinds: Option<&[&'static str]>) {
        self.kind_filter = kinds.map(<[_]>::to_vec);
        self.hits.clear();
    }

    /// Whether the configured region selects by frustum rather than by ray.
    #[must_use]
    pub fn is_frustum_mode(&self) -> bool {
        self.size.x > 0.0 || self.size.y > 0.0
    }

    /// Whether multiple hits are reported.
    #[must_use]
    pub fn is_multi_pick(&self) -> bool {
        self.multi
    }

    /// The pick traversal list built by the last [`pick`](Self::pick).
    #[must_use]
    pub fn action(&self) -> &RenderAction {
        &self.action
    }

    /// Sets the base render state the pick traversal starts from, normally
    /// the same state the view renders with.
    pub fn set_base_state(&mut self, state: scenekit_core::RenderState) {
        self.action.set_base_state(state);
    }

    /// Runs the pick: traverses the graph under the pick override, resolves
    /// analytic entries by ray or frustum math, draws the rest into a
    /// backend selection session, and caches the merged, depth-sorted hits.
    pub fn pick(&mut self, root: &SceneNode, backend: &mut dyn RenderBackend) -> Result<()> {
        if !self.configured {
            return Err(SceneError::PickNotConfigured);
        }
        self.hits.clear();

        self.action.set_pick_override(true);
        let built = self.action.build_traverse_list(root, &self.camera);
        self.action.set_pick_override(false);
        built?;

        let pick_projection = self
            .camera
            .pick_projection(self.center, self.size.max(Vec2::ONE), self.viewport);
        let view = self.camera.view_matrix();
        let eye = self.camera.position;
        let frustum_mode = self.is_frustum_mode();
        let ray = self.camera.ray_through(self.center, self.viewport);

        let mut raster = Vec::new();
        for index in 0..self.action.len() {
            let entry = self.action.entry(index);
            let Some(object) = entry.object() else {
                continue;
            };
            if let Some(filter) = &self.kind_filter {
                if !filter.contains(&object.kind()) {
                    continue;
                }
            }
            let Some(shape) = object.intersectable() else {
                raster.push(index);
                continue;
            };

            if frustum_mode {
                let local = Frustum::transformed(pick_projection * view, entry.world);
                if shape.intersects_frustum(&local) {
                    let anchor = object
                        .local_bounds()
                        .map_or(Vec3::ZERO, |bounds| bounds.center());
                    let world_point = entry.world.transform_point3(anchor);
                    self.hits.push(HitRecord {
                        kind: object.kind(),
                        object: object.clone(),
                        object_to_world: entry.world,
                        path: entry.path().to_vec(),
                        names: Vec::new(),
                        world_point,
                        nearest_vertex: None,
                        normal: None,
                        depth: (world_point - eye).length(),
                    });
                }
            } else {
                let to_local = entry.world.inverse();
                let local_ray = ray.transformed(to_local);
                if let Some(hit) = shape.intersect_ray(&local_ray) {
                    let world_point = entry.world.transform_point3(hit.point);
                    let normal = to_local
                        .transpose()
                        .transform_vector3(hit.normal)
                        .normalize();
                    let nearest = shape
                        .nearest_vertex(hit.point)
                        .map(|v| entry.world.transform_point3(v));
                    self.hits.push(HitRecord {
                        kind: object.kind(),
                        object: object.clone(),
                        object_to_world: entry.world,
                        path: entry.path().to_vec(),
                        names: Vec::new(),
                        world_point,
                        nearest_vertex: nearest,
                        normal: Some(normal),
                        depth: (world_point - eye).length(),
                    });
                }
            }
        }

        if !raster.is_empty() {
            let matrices = PickMatrices {
                view,
                projection: pick_projection,
                viewport: self.viewport,
            };
            let selected = self.raster_pass(&raster, &matrices, backend)?;
            self.decode_raster_hits(&selected, pick_projection * view, eye);
        }

        self.hits.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        if !self.multi && !frustum_mode {
            self.hits.truncate(1);
        }
        Ok(())
    }

    /// Draws raster entries into a selection session, one leading name per
    /// entry, and drains the session. The session is closed on the error
    /// path too, so a failing object cannot leave the backend selecting.
    fn raster_pass(
        &mut self,
        raster: &[usize],
        matrices: &PickMatrices,
        backend: &mut dyn RenderBackend,
    ) -> Result<Vec<SelectionHit>> {
        backend.begin_selection(matrices)?;
        self.guardian.reset();
        for &index in raster {
            let entry = self.action.entry(index);
            let Some(object) = entry.object() else {
                continue;
            };
            backend.set_transform(entry.world);
            backend.push_name(u32::try_from(index).unwrap_or(u32::MAX));
            let dispatched = {
                let mut ctx = DispatchContext {
                    backend: &mut *backend,
                    guardian: &mut self.guardian,
                    camera: &self.camera,
                    path: entry.path(),
                    state: &entry.state,
                    world: entry.world,
                };
                object.dispatch(&mut ctx)
            };
            backend.pop_name();
            if let Err(e) = dispatched {
                backend.end_selection();
                return Err(e);
            }
        }
        Ok(backend.end_selection())
    }

    fn decode_raster_hits(&mut self, selected: &[SelectionHit], pick_vp: Mat4, eye: Vec3) {
        let inverse_vp = pick_vp.inverse();
        for hit in selected {
            let Some((&lead, rest)) = hit.names.split_first() else {
                continue;
            };
            let index = lead as usize;
            if index >= self.action.len() {
                log::warn!("selection hit names unknown entry {index}, dropped");
                continue;
            }
            let entry = self.action.entry(index);
            let Some(object) = entry.object() else {
                continue;
            };
            // The pick region center maps to the restricted clip origin, so
            // the hit point is the center unprojected at the recorded depth.
            let clip = inverse_vp * Vec4::new(0.0, 0.0, hit.z_min, 1.0);
            let world_point = clip.truncate() / clip.w;
            self.hits.push(HitRecord {
                kind: object.kind(),
                object: object.clone(),
                object_to_world: entry.world,
                path: entry.path().to_vec(),
                names: rest.to_vec(),
                world_point,
                nearest_vertex: None,
                normal: None,
                depth: (world_point - eye).length(),
            });
        }
    }

    /// The cached hits of the last [`pick`](Self::pick), nearest first.
    ///
    /// Fails when no pick region was configured, and in frustum mode
    /// without multi-pick: a region pick has no single meaningful "front"
    /// hit, so that combination is rejected rather than guessed at.
    /// Repeated calls return the same cached hits.
    pub fn get_hits(&self) -> Result<&[HitRecord]> {
        if !self.configured {
            return Err(SceneError::PickNotConfigured);
        }
        if self.is_frustum_mode() && !self.multi {
            return Err(SceneError::PickSingleInFrustumMode);
        }
        Ok(&self.hits)
    }

    /// Drops the configuration, the cached hits, and the pooled traversal
    /// entries, releasing every object handle the pick was holding.
    pub fn clear(&mut self) {
        self.configured = false;
        self.hits.clear();
        self.action.clear();
    }
}

impl Default for PickAction {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::backend::{DrawData, Topology};
    use crate::headless::HeadlessBackend;
    use crate::object::{
        Intersectable, RenderObject, TraverseContext, TraverseState,
    };
    use crate::scene::Scene;
    use scenekit_core::{Aabb, Ray, RayHit, RenderState, StateFlags};

    /// Analytic sphere target.
    struct SphereTarget {
        center: Vec3,
        radius: f32,
    }

    impl SphereTarget {
        fn at(center: Vec3, radius: f32) -> Rc<Self> {
            Rc::new(Self { center, radius })
        }
    }

    impl Intersectable for SphereTarget {
        fn intersect_ray(&self, ray: &Ray) -> Option<RayHit> {
            let oc = ray.origin - self.center;
            let b = oc.dot(ray.dir);
            let c = oc.length_squared() - self.radius * self.radius;
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
                normal: (point - self.center).normalize(),
            })
        }

        fn nearest_vertex(&self, point: Vec3) -> Option<Vec3> {
            let dir = (point - self.center).normalize_or_zero();
            Some(self.center + dir * self.radius)
        }

        fn intersects_frustum(&self, frustum: &Frustum) -> bool {
            frustum.intersects_sphere(self.center, self.radius)
        }
    }

    impl RenderObject for SphereTarget {
        fn kind(&self) -> &'static str {
            "sphere"
        }

        fn local_bounds(&self) -> Option<Aabb> {
            Some(Aabb::new(
                self.center - Vec3::splat(self.radius),
                self.center + Vec3::splat(self.radius),
            ))
        }

        fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()> {
            ctx.guardian.commit(ctx.backend, ctx.state);
            ctx.backend.draw(&DrawData {
                topology: Topology::Triangles,
                vertices: &[],
            })
        }

        fn intersectable(&self) -> Option<&dyn Intersectable> {
            Some(self)
        }
    }

    /// Raster target: no analytic capability, positions itself at a world
    /// offset so the selection session decides the hit.
    struct SolidTarget {
        offset: Vec3,
    }

    impl SolidTarget {
        fn at(offset: Vec3) -> Rc<Self> {
            Rc::new(Self { offset })
        }
    }

    impl RenderObject for SolidTarget {
        fn kind(&self) -> &'static str {
            "solid"
        }

        fn sets_local_transform(&self) -> bool {
            true
        }

        fn traverse(&self, ctx: &mut TraverseContext) -> Result<TraverseState> {
            ctx.action
                .push_matrix(Mat4::from_translation(self.offset), true)?;
            ctx.queue_passes()?;
            Ok(TraverseState::Continue)
        }

        fn post_traverse(&self, action: &mut RenderAction) -> Result<()> {
            action.pop_matrix().map(|_| ())
        }

        fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()> {
            ctx.guardian.commit(ctx.backend, ctx.state);
            ctx.backend.draw(&DrawData {
                topology: Topology::Triangles,
                vertices: &[],
            })
        }
    }

    fn camera() -> Camera {
        let mut camera = Camera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.target = Vec3::ZERO;
        camera
    }

    fn viewport() -> Viewport {
        Viewport::new(800.0, 800.0)
    }

    fn single_pick_at_center(pick: &mut PickAction) {
        pick.init(&camera(), viewport(), 400.0, 400.0, 400.0, 400.0, false);
    }

    #[test]
    fn test_ray_pick_hits_analytic_sphere() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("ball");
        node.attach(SphereTarget::at(Vec3::ZERO, 1.0));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        let hits = pick.get_hits().unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.kind, "sphere");
        assert!((hit.world_point.z - 1.0).abs() < 1e-3, "front of the sphere");
        assert!((hit.depth - 4.0).abs() < 1e-3);
        let normal = hit.normal.unwrap();
        assert!(normal.z > 0.99, "normal faces the eye");
        assert!(hit.nearest_vertex.is_some());
        // Analytic entries never enter a selection session.
        assert!(backend.draws.is_empty());
    }

    #[test]
    fn test_raster_pick_decodes_traversal_index() {
        let target = SolidTarget::at(Vec3::ZERO);
        let mut scene = Scene::new();
        let mut node = SceneNode::new("box");
        node.attach(target.clone());
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        let hits = pick.get_hits().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, "solid");
        assert!(hits[0].names.is_empty(), "leading index name is stripped");
        assert!(!hits[0].path.is_empty());
        let resolved: Rc<dyn RenderObject> = target;
        assert!(Rc::ptr_eq(&hits[0].object, &resolved));
    }

    #[test]
    fn test_wireframe_only_object_is_still_pickable() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("wire");
        node.push_state(
            RenderState::inherit_all()
                .with_flag(StateFlags::SMOOTH, false)
                .with_flag(StateFlags::WIREFRAME, true),
        );
        node.attach(SolidTarget::at(Vec3::ZERO));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        // One forced-solid entry, not a wireframe one.
        assert_eq!(pick.action().len(), 1);
        let entry = pick.action().entry(0);
        assert!(!entry.state.flags.contains(StateFlags::WIREFRAME));
        assert!(entry.state.flags.contains(StateFlags::SMOOTH));

        assert_eq!(pick.get_hits().unwrap().len(), 1);
        assert!(backend.draws.iter().all(|d| !d.wireframe));
    }

    #[test]
    fn test_single_pick_in_frustum_mode_is_an_error() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("ball");
        node.attach(SphereTarget::at(Vec3::ZERO, 1.0));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        pick.init(&camera(), viewport(), 100.0, 100.0, 700.0, 700.0, false);
        pick.pick(scene.root(), &mut backend).unwrap();

        assert!(matches!(
            pick.get_hits(),
            Err(SceneError::PickSingleInFrustumMode)
        ));
    }

    #[test]
    fn test_frustum_pick_collects_multiple_hits() {
        let mut scene = Scene::new();
        for (name, x) in [("left", -0.5), ("right", 0.5)] {
            let mut node = SceneNode::new(name);
            node.attach(SphereTarget::at(Vec3::new(x, 0.0, 0.0), 0.3));
            scene.root_mut().add_child(node);
        }

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        pick.init(&camera(), viewport(), 100.0, 100.0, 700.0, 700.0, true);
        pick.pick(scene.root(), &mut backend).unwrap();
        assert_eq!(pick.get_hits().unwrap().len(), 2);
    }

    #[test]
    fn test_single_pick_keeps_nearest_hit() {
        let mut scene = Scene::new();
        let mut far = SceneNode::new("far");
        far.attach(SphereTarget::at(Vec3::new(0.0, 0.0, 0.0), 0.4));
        let mut near = SceneNode::new("near");
        near.attach(SphereTarget::at(Vec3::new(0.0, 0.0, 2.0), 0.4));
        scene.root_mut().add_child(far);
        scene.root_mut().add_child(near);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        let hits = pick.get_hits().unwrap();
        assert_eq!(hits.len(), 1);
        assert!((hits[0].world_point.z - 2.4).abs() < 1e-3, "nearest wins");
    }

    #[test]
    fn test_multi_pick_sorts_nearest_first() {
        let mut scene = Scene::new();
        let mut far = SceneNode::new("far");
        far.attach(SphereTarget::at(Vec3::new(0.0, 0.0, 0.0), 0.4));
        let mut near = SceneNode::new("near");
        near.attach(SphereTarget::at(Vec3::new(0.0, 0.0, 2.0), 0.4));
        scene.root_mut().add_child(far);
        scene.root_mut().add_child(near);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        pick.init(&camera(), viewport(), 400.0, 400.0, 400.0, 400.0, true);
        pick.pick(scene.root(), &mut backend).unwrap();

        let depths: Vec<f32> = pick.get_hits().unwrap().iter().map(|h| h.depth).collect();
        assert_eq!(depths.len(), 2);
        assert!(depths[0] < depths[1]);
    }

    #[test]
    fn test_kind_filter_restricts_hits() {
        let mut scene = Scene::new();
        let mut ball = SceneNode::new("ball");
        ball.attach(SphereTarget::at(Vec3::new(0.0, 0.0, 2.0), 0.4));
        let mut box_node = SceneNode::new("box");
        box_node.attach(SolidTarget::at(Vec3::ZERO));
        scene.root_mut().add_child(ball);
        scene.root_mut().add_child(box_node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        pick.init(&camera(), viewport(), 400.0, 400.0, 400.0, 400.0, true);
        pick.set_kind_filter(Some(&["solid"]));
        pick.pick(scene.root(), &mut backend).unwrap();

        let hits = pick.get_hits().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, "solid");
    }

    #[test]
    fn test_get_hits_is_idempotent() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("box");
        node.attach(SolidTarget::at(Vec3::ZERO));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        let first: Vec<u32> = pick.get_hits().unwrap().iter().map(|h| h.depth.to_bits()).collect();
        let second: Vec<u32> = pick.get_hits().unwrap().iter().map(|h| h.depth.to_bits()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_subpixel_rectangle_is_frustum_mode() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("ball");
        node.attach(SphereTarget::at(Vec3::ZERO, 1.0));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        // Any actual rectangle is a region pick, even under a pixel wide.
        pick.init(&camera(), viewport(), 400.0, 400.0, 400.9, 400.0, false);
        assert!(pick.is_frustum_mode());
        pick.pick(scene.root(), &mut backend).unwrap();

        assert!(matches!(
            pick.get_hits(),
            Err(SceneError::PickSingleInFrustumMode)
        ));
    }

    #[test]
    fn test_filter_change_drops_cached_hits() {
        let mut scene = Scene::new();
        let mut node = SceneNode::new("ball");
        node.attach(SphereTarget::at(Vec3::ZERO, 1.0));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();
        assert_eq!(pick.get_hits().unwrap().len(), 1);

        // The cached sphere hit does not qualify under the new filter.
        pick.set_kind_filter(Some(&["mesh"]));
        assert!(pick.get_hits().unwrap().is_empty());
    }

    #[test]
    fn test_hits_carry_object_and_transform() {
        let offset = Vec3::new(0.0, 0.0, 1.0);
        let mut scene = Scene::new();
        let mut node = SceneNode::new("box");
        node.attach(SolidTarget::at(offset));
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        let hits = pick.get_hits().unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object.kind(), "solid");
        assert_eq!(hits[0].object_to_world, Mat4::from_translation(offset));
    }

    #[test]
    fn test_clear_releases_object_handles() {
        let target = SphereTarget::at(Vec3::ZERO, 1.0);
        let mut scene = Scene::new();
        let mut node = SceneNode::new("ball");
        node.attach(target.clone());
        scene.root_mut().add_child(node);

        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        single_pick_at_center(&mut pick);
        pick.pick(scene.root(), &mut backend).unwrap();

        drop(scene);
        assert!(
            Rc::strong_count(&target) > 1,
            "the pool entry and the cached hit hold the object"
        );

        pick.clear();
        assert_eq!(Rc::strong_count(&target), 1);
    }

    #[test]
    fn test_pick_requires_configuration() {
        let scene = Scene::new();
        let mut backend = HeadlessBackend::new();
        let mut pick = PickAction::new();
        assert!(matches!(
            pick.pick(scene.root(), &mut backend),
            Err(SceneError::PickNotConfigured)
        ));
        assert!(matches!(
            pick.get_hits(),
            Err(SceneError::PickNotConfigured)
        ));
    }

    #[test]
    fn test_selection_record_roundtrip() {
        let mut buffer = Vec::new();
        encode_selection_record(&mut buffer, &[3, 7], 0.25, 0.75);
        encode_selection_record(&mut buffer, &[], 0.0, 1.0);

        let hits = decode_selection_buffer(&buffer);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].names, vec![3, 7]);
        assert!((hits[0].z_min - 0.25).abs() < 1e-6);
        assert!((hits[0].z_max - 0.75).abs() < 1e-6);
        assert!(hits[1].names.is_empty());
        assert!((hits[1].z_max - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_selection_decode_drops_truncated_record() {
        let mut buffer = Vec::new();
        encode_selection_record(&mut buffer, &[1], 0.5, 0.5);
        // Claims two names but carries none.
        buffer.extend_from_slice(&[2, 0, 0]);

        let hits = decode_selection_buffer(&buffer);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].names, vec![1]);
    }

    #[test]
    fn test_selection_depth_clamps_out_of_range() {
        let mut buffer = Vec::new();
        encode_selection_record(&mut buffer, &[0], -2.0, 3.0);
        let hits = decode_selection_buffer(&buffer);
        assert!((hits[0].z_min - 0.0).abs() < 1e-6);
        assert!((hits[0].z_max - 1.0).abs() < 1e-6);
    }

    proptest::proptest! {
        #[test]
        fn decode_inverts_encode(
            records in proptest::collection::vec(
                (
                    proptest::collection::vec(0u32..1000, 0..8),
                    0.0f32..1.0,
                    0.0f32..1.0,
                ),
                0..16,
            )
        ) {
            let mut buffer = Vec::new();
            for (names, a, b) in &records {
                encode_selection_record(&mut buffer, names, a.min(*b), a.max(*b));
            }
            let decoded = decode_selection_buffer(&buffer);
            proptest::prop_assert_eq!(decoded.len(), records.len());
            for (hit, (names, a, b)) in decoded.iter().zip(&records) {
                proptest::prop_assert_eq!(&hit.names, names);
                proptest::prop_assert!((hit.z_min - a.min(*b)).abs() < 1e-6);
                proptest::prop_assert!((hit.z_max - a.max(*b)).abs() < 1e-6);
            }
        }
    }
}

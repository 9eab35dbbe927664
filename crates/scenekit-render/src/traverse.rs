//! Scene-graph traversal and render dispatch.
//!
//! [`RenderAction`] flattens the scene graph into a pooled, render-state
//! sorted list of [`TraverseNode`]s, then dispatches each entry to its
//! render object. Traversal may re-enter itself (an object's traversal step
//! can run a nested sub-graph traversal); the entry pool is reset only when
//! the outermost traversal begins, so entries queued by an outer call stay
//! valid while inner calls run.

use std::rc::Rc;

use glam::Mat4;

use scenekit_core::{Aabb, Camera, Pass, RenderState, Result, SceneError, StateFlags, Vec3};

use crate::backend::RenderBackend;
use crate::guardian::RenderStateGuardian;
use crate::object::{DispatchContext, RenderObject, TraverseContext, TraverseState};
use crate::scene::{NodeId, SceneNode};

/// A stack of 4x4 matrices with freeze protection.
///
/// The stack is frozen while a render object that does not set its own local
/// transform is being traversed; a push in that window is a contract
/// violation by the object, reported as an error rather than corrupting
/// ancestor transforms.
#[derive(Debug)]
pub struct MatrixStack {
    stack: Vec<Mat4>,
    frozen: u32,
}

impl MatrixStack {
    /// Creates a stack holding a single identity matrix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Mat4::IDENTITY],
            frozen: 0,
        }
    }

    /// The current top matrix.
    #[must_use]
    pub fn top(&self) -> Mat4 {
        *self.stack.last().unwrap_or(&Mat4::IDENTITY)
    }

    /// Pushes a matrix: either as the new top directly, or multiplied onto
    /// the current top.
    pub fn push(&mut self, matrix: Mat4, multiply: bool) -> Result<()> {
        if self.frozen > 0 {
            return Err(SceneError::MatrixStackFrozen);
        }
        let new_top = if multiply { self.top() * matrix } else { matrix };
        self.stack.push(new_top);
        Ok(())
    }

    /// Removes and returns the top matrix.
    pub fn pop(&mut self) -> Result<Mat4> {
        if self.stack.len() <= 1 {
            return Err(SceneError::StackUnderflow("matrix"));
        }
        Ok(self.stack.pop().unwrap_or(Mat4::IDENTITY))
    }

    fn freeze(&mut self) {
        self.frozen += 1;
    }

    fn unfreeze(&mut self) {
        self.frozen = self.frozen.saturating_sub(1);
    }

    /// Whether pushes are currently forbidden.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen > 0
    }

    /// Current stack depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Always false - the stack keeps a base identity entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A flattened, pooled traversal entry.
///
/// Valid only until the next outermost traversal begins; the pool rewind
/// clears the borrowed object reference.
pub struct TraverseNode {
    object: Option<Rc<dyn RenderObject>>,
    /// World transform at the time of the visit.
    pub world: Mat4,
    path: Vec<NodeId>,
    /// Resolved, pass-masked render state.
    pub state: RenderState,
    /// World-space bounds, captured only when alpha blending participates.
    pub world_bounds: Option<Aabb>,
}

impl TraverseNode {
    fn unused() -> Self {
        Self {
            object: None,
            world: Mat4::IDENTITY,
            path: Vec::new(),
            state: RenderState::new(),
            world_bounds: None,
        }
    }

    fn clear(&mut self) {
        self.object = None;
        self.path.clear();
        self.world_bounds = None;
    }

    /// The render object this entry dispatches to, if the entry is live.
    #[must_use]
    pub fn object(&self) -> Option<&Rc<dyn RenderObject>> {
        self.object.as_ref()
    }

    /// Graph path captured at traversal time, outermost first.
    #[must_use]
    pub fn path(&self) -> &[NodeId] {
        &self.path
    }
}

/// Arena of traversal entries reused across frames.
///
/// `acquire` grows or reuses by cursor; `reset` rewinds the cursor and
/// clears borrowed fields without deallocating backing storage.
struct NodePool {
    nodes: Vec<TraverseNode>,
    cursor: usize,
}

impl NodePool {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            cursor: 0,
        }
    }

    fn acquire(&mut self) -> usize {
        if self.cursor == self.nodes.len() {
            self.nodes.push(TraverseNode::unused());
        }
        let index = self.cursor;
        self.cursor += 1;
        index
    }

    fn reset(&mut self) {
        for node in &mut self.nodes[..self.cursor] {
            node.clear();
        }
        self.cursor = 0;
    }

    fn get(&self, index: usize) -> &TraverseNode {
        debug_assert!(index < self.cursor, "pool index beyond used count");
        &self.nodes[index]
    }

    fn get_mut(&mut self, index: usize) -> &mut TraverseNode {
        debug_assert!(index < self.cursor, "pool index beyond used count");
        &mut self.nodes[index]
    }
}

/// Depth-first traversal and render dispatch over a scene graph.
pub struct RenderAction {
    pool: NodePool,
    list: Vec<usize>,
    matrices: MatrixStack,
    state_stack: Vec<RenderState>,
    path: Vec<NodeId>,
    base_state: RenderState,
    depth: u32,
    pick_override: bool,
}

impl RenderAction {
    /// Creates a fresh action with a default base render state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: NodePool::new(),
            list: Vec::new(),
            matrices: MatrixStack::new(),
            state_stack: vec![RenderState::new()],
            path: Vec::new(),
            base_state: RenderState::new(),
            depth: 0,
            pick_override: false,
        }
    }

    /// Sets the base render state every traversal starts from (the view's
    /// display mode: wireframe on/off, lighting, etc.).
    pub fn set_base_state(&mut self, state: RenderState) {
        self.base_state = state;
    }

    /// The composed render state currently on top of the stack.
    #[must_use]
    pub fn current_state(&self) -> &RenderState {
        self.state_stack.last().unwrap_or(&self.base_state)
    }

    /// The current top of the matrix stack.
    #[must_use]
    pub fn current_matrix(&self) -> Mat4 {
        self.matrices.top()
    }

    /// Pushes onto the matrix stack; fails while frozen.
    pub fn push_matrix(&mut self, matrix: Mat4, multiply: bool) -> Result<()> {
        self.matrices.push(matrix, multiply)
    }

    /// Pops the matrix stack.
    pub fn pop_matrix(&mut self) -> Result<Mat4> {
        self.matrices.pop()
    }

    /// Current traversal nesting depth (0 when idle).
    #[must_use]
    pub fn nesting_depth(&self) -> u32 {
        self.depth
    }

    /// Number of entries in the traversal list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the traversal list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The entry at a given list position.
    #[must_use]
    pub fn entry(&self, position: usize) -> &TraverseNode {
        self.pool.get(self.list[position])
    }

    /// Iterates the traversal list in dispatch order.
    pub fn entries(&self) -> impl Iterator<Item = &TraverseNode> {
        self.list.iter().map(|&index| self.pool.get(index))
    }

    pub(crate) fn set_pick_override(&mut self, on: bool) {
        self.pick_override = on;
    }

    /// Drops the traversal list and rewinds the entry pool, releasing the
    /// object handles the entries hold. Must not run mid-traversal.
    pub fn clear(&mut self) {
        debug_assert_eq!(self.depth, 0, "clear during an in-flight traversal");
        self.pool.reset();
        self.list.clear();
    }

    /// Builds the flattened traversal list for a (sub-)graph.
    ///
    /// Re-entrant: render objects may call this again during their own
    /// traversal step. Only the outermost call resets the pool and list,
    /// and only the outermost call sorts the final list.
    pub fn build_traverse_list(&mut self, node: &SceneNode, camera: &Camera) -> Result<()> {
        self.depth += 1;
        if self.depth == 1 {
            self.pool.reset();
            self.list.clear();
            self.path.clear();
            self.state_stack.clear();
            self.state_stack.push(self.base_state.clone());
        }

        let result = self.traverse_node(node, camera);

        self.depth -= 1;
        if self.depth == 0 && result.is_ok() {
            self.sort_list(camera);
        }
        result
    }

    fn traverse_node(&mut self, node: &SceneNode, camera: &Camera) -> Result<()> {
        // An invisible node prunes its entire subtree.
        if !node.is_visible() {
            return Ok(());
        }

        self.path.push(node.id());

        let pushed_state = if node.states().is_empty() {
            false
        } else {
            let mut composed = self.current_state().clone();
            for entry in node.states() {
                composed = entry.compose_from(&composed);
            }
            self.state_stack.push(composed);
            true
        };

        let mut cull = false;
        let mut result = Ok(());

        for object in node.objects() {
            // Objects that don't position themselves are traversed under a
            // frozen matrix stack.
            let freeze = !object.sets_local_transform();
            if freeze {
                self.matrices.freeze();
            }
            let step = {
                let mut ctx = TraverseContext {
                    action: &mut *self,
                    camera,
                    object: object.clone(),
                };
                object.traverse(&mut ctx)
            };
            if freeze {
                self.matrices.unfreeze();
            }
            match step {
                Ok(TraverseState::Cull) => cull = true,
                Ok(TraverseState::Continue) => {}
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        if result.is_ok() && !cull {
            for child in node.children() {
                result = self.traverse_node(child, camera);
                if result.is_err() {
                    break;
                }
            }
        }

        // PostTraverse runs for every object regardless of cull or error, so
        // objects that pushed state in traverse can clean up.
        for object in node.objects() {
            let post = object.post_traverse(self);
            if post.is_err() && result.is_ok() {
                result = post;
            }
        }

        if pushed_state {
            self.state_stack.pop();
        }
        self.path.pop();
        result
    }

    /// Queues one pooled entry per active pass for `object`, under the
    /// current matrix, path, and composed state.
    ///
    /// In pick mode a single smooth entry is queued instead: smooth/solid
    /// forced, wireframe suppressed, so wireframe-displayed objects are still
    /// selectable by their solid silhouette.
    pub(crate) fn queue_passes(&mut self, object: &Rc<dyn RenderObject>) -> Result<()> {
        let state = self.current_state().clone();
        let world = self.matrices.top();

        let mut passes: [Option<Pass>; 2] = [None, None];
        if self.pick_override {
            if state
                .flags
                .intersects(StateFlags::SMOOTH | StateFlags::WIREFRAME)
            {
                passes[0] = Some(Pass::Smooth);
            }
        } else {
            if state.flags.contains(StateFlags::SMOOTH) {
                passes[0] = Some(Pass::Smooth);
            }
            if state.flags.contains(StateFlags::WIREFRAME) {
                passes[1] = Some(Pass::Wireframe);
            }
        }

        for pass in passes.into_iter().flatten() {
            let masked = state.masked_for_pass(pass);
            let bounds = if masked.flags.contains(StateFlags::ALPHA) {
                object.local_bounds().map(|b| b.transformed(world))
            } else {
                None
            };

            let index = self.pool.acquire();
            let entry = self.pool.get_mut(index);
            entry.object = Some(object.clone());
            entry.world = world;
            entry.path.clear();
            entry.path.extend_from_slice(&self.path);
            entry.state = masked;
            entry.world_bounds = bounds;
            self.list.push(index);
        }
        Ok(())
    }

    /// Stable-sorts the list for batching: by render-state key, with
    /// alpha-blended entries last, ordered back-to-front by their bounds.
    fn sort_list(&mut self, camera: &Camera) {
        let eye = camera.position;
        let Self { pool, list, .. } = self;
        list.sort_by(|&a, &b| {
            let (na, nb) = (pool.get(a), pool.get(b));
            let key = na.state.sort_key().cmp(&nb.state.sort_key());
            if key != std::cmp::Ordering::Equal {
                return key;
            }
            if na.state.flags.contains(StateFlags::ALPHA) {
                // Back-to-front: farther entries draw first.
                let da = alpha_depth(na, eye);
                let db = alpha_depth(nb, eye);
                return db.total_cmp(&da);
            }
            std::cmp::Ordering::Equal
        });
    }

    /// Dispatches the flattened list: per entry, apply its world transform
    /// (absolute - it is already world-space), then let the object commit
    /// state through the guardian and draw.
    pub fn render_pass(
        &self,
        backend: &mut dyn RenderBackend,
        guardian: &mut RenderStateGuardian,
        camera: &Camera,
    ) -> Result<()> {
        guardian.reset();
        for &index in &self.list {
            let entry = self.pool.get(index);
            let Some(object) = entry.object() else {
                continue;
            };
            backend.set_transform(entry.world);
            let mut ctx = DispatchContext {
                backend: &mut *backend,
                guardian: &mut *guardian,
                camera,
                path: entry.path(),
                state: &entry.state,
                world: entry.world,
            };
            object.dispatch(&mut ctx)?;
        }
        Ok(())
    }
}

impl Default for RenderAction {
    fn default() -> Self {
        Self::new()
    }
}

fn alpha_depth(node: &TraverseNode, eye: Vec3) -> f32 {
    let anchor = node
        .world_bounds
        .map_or_else(|| node.world.transform_point3(Vec3::ZERO), |b| b.center());
    (anchor - eye).length()
}

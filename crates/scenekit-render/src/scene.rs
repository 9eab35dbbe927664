//! The scene graph: an n-ary tree of nodes carrying render objects.
//!
//! Nodes own their children exclusively; detaching a child drops its whole
//! subtree. Nodes do not carry transforms themselves - transforms enter the
//! traversal through render objects that set their own local transform
//! (see [`crate::object::RenderObject::sets_local_transform`]).

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use scenekit_core::RenderState;

use crate::object::RenderObject;

/// Stable identity of a scene node, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value, for logging and name-stack payloads.
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// One node of the scene graph.
pub struct SceneNode {
    id: NodeId,
    name: String,
    visible: bool,
    states: Vec<RenderState>,
    objects: Vec<Rc<dyn RenderObject>>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    /// Creates a visible, empty node.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            visible: true,
            states: Vec::new(),
            objects: Vec::new(),
            children: Vec::new(),
        }
    }

    /// This node's identity.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// This node's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this node (and therefore its subtree) is traversed.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Shows or hides this node and its subtree.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Pushes a local render-state entry, composed over the parent state
    /// during traversal.
    pub fn push_state(&mut self, state: RenderState) {
        self.states.push(state);
    }

    /// The local render-state stack entries, in composition order.
    #[must_use]
    pub fn states(&self) -> &[RenderState] {
        &self.states
    }

    /// Attaches a render object to this node.
    pub fn attach(&mut self, object: Rc<dyn RenderObject>) {
        self.objects.push(object);
    }

    /// The attached render objects, in traversal order.
    #[must_use]
    pub fn objects(&self) -> &[Rc<dyn RenderObject>] {
        &self.objects
    }

    /// Adds a child node, returning its id.
    pub fn add_child(&mut self, child: SceneNode) -> NodeId {
        let id = child.id;
        self.children.push(child);
        id
    }

    /// Detaches and returns a direct child; the subtree is destroyed when
    /// the returned node is dropped.
    pub fn remove_child(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.children.iter().position(|c| c.id == id)?;
        Some(self.children.remove(index))
    }

    /// The child nodes, in traversal order.
    #[must_use]
    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Mutable access to the child nodes.
    pub fn children_mut(&mut self) -> &mut [SceneNode] {
        &mut self.children
    }

    /// Finds a node in this subtree by id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Finds a node in this subtree by id, mutably.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("visible", &self.visible)
            .field("objects", &self.objects.len())
            .field("children", &self.children.len())
            .finish()
    }
}

/// A scene: a single root node populated by an external scene builder.
#[derive(Debug)]
pub struct Scene {
    root: SceneNode,
}

impl Scene {
    /// Creates a scene with an empty root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: SceneNode::new("root"),
        }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &SceneNode {
        &self.root
    }

    /// Mutable access to the root node.
    pub fn root_mut(&mut self) -> &mut SceneNode {
        &mut self.root
    }

    /// Finds any node by id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        self.root.find(id)
    }

    /// Finds any node by id, mutably.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.root.find_mut(id)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

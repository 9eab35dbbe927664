//! Scene graph, traversal, and picking for scenekit.
//!
//! The pipeline: a [`Scene`] of nodes carrying [`RenderObject`]s is
//! flattened by a [`RenderAction`] into a pooled, state-sorted traversal
//! list, which is then dispatched through a [`RenderBackend`] with a
//! [`RenderStateGuardian`] minimizing redundant state changes. Picking
//! ([`PickAction`]) reuses the same traversal under a solid-fill override
//! and resolves hits analytically or through the backend's selection
//! session.
//!
//! Everything here is single-threaded by construction (`Rc`-shared
//! objects); one traversal or pick cycle runs at a time, nested
//! re-entrancy included.

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod backend;
pub mod guardian;
pub mod headless;
pub mod mesh;
pub mod object;
pub mod pick;
pub mod proxy;
pub mod scene;
pub mod traverse;

pub use backend::{DrawData, PickMatrices, RenderBackend, SelectionHit, Topology, Vertex};
pub use guardian::RenderStateGuardian;
pub use headless::{DrawRecord, HeadlessBackend};
pub use mesh::MeshObject;
pub use object::{
    DispatchContext, Intersectable, RenderObject, TraverseContext, TraverseState,
};
pub use pick::{decode_selection_buffer, encode_selection_record, HitRecord, PickAction};
pub use proxy::{ProxyBox, ProxySphere, TransformObject};
pub use scene::{NodeId, Scene, SceneNode};
pub use traverse::{MatrixStack, RenderAction, TraverseNode};

//! scenekit: a retained scene graph with state-sorted rendering, dual-mode
//! picking, and interactive manipulation.
//!
//! The crate splits into three layers:
//! - [`scenekit_core`]: render state, camera, and geometry value types;
//! - [`scenekit_render`]: the scene graph, pooled traversal, render-state
//!   guardian, and the analytic/raster picking engine;
//! - this crate: input events, camera controllers, the translate
//!   manipulator, and the texture registry.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use scenekit::{
//!     Camera, HeadlessBackend, MeshObject, RenderAction, RenderStateGuardian,
//!     Scene, SceneNode, Vec3,
//! };
//!
//! let mut scene = Scene::new();
//! let mut node = SceneNode::new("triangle");
//! let mesh = MeshObject::new(
//!     vec![Vec3::ZERO, Vec3::X, Vec3::Y],
//!     vec![[0, 1, 2]],
//! ).unwrap();
//! node.attach(Rc::new(mesh));
//! scene.root_mut().add_child(node);
//!
//! let camera = Camera::new(1.0);
//! let mut action = RenderAction::new();
//! action.build_traverse_list(scene.root(), &camera).unwrap();
//!
//! let mut backend = HeadlessBackend::new();
//! let mut guardian = RenderStateGuardian::with_default_handlers();
//! action.render_pass(&mut backend, &mut guardian, &camera).unwrap();
//! assert_eq!(backend.draws.len(), 1);
//! ```

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod controller;
pub mod events;
pub mod manipulator;
pub mod textures;

pub use controller::{DollyTuning, FirstPersonController, OrbitController};
pub use events::{Key, KeyEvent, Modifiers, PointerButton, PointerEvent};
pub use manipulator::{GizmoElement, TranslateControl, TranslateGizmo};
pub use textures::TextureRegistry;

pub use scenekit_core::{
    Aabb, Camera, Frustum, Mat4, Pass, Plane, ProjectionMode, Quat, Ray, RayHit,
    RenderState, Result, SceneError, StateFlags, TextureHandle, ValueFlags, Vec2,
    Vec3, Vec4, ViewSettings, Viewport,
};
pub use scenekit_render::{
    DispatchContext, DrawData, HeadlessBackend, HitRecord, Intersectable,
    MeshObject, NodeId, PickAction, ProxyBox, ProxySphere, RenderAction,
    RenderBackend, RenderObject, RenderStateGuardian, Scene, SceneNode,
    SelectionHit, Topology, TransformObject, TraverseContext, TraverseNode,
    TraverseState, Vertex,
};

/// Initializes `env_logger` if no logger is installed yet.
///
/// Safe to call repeatedly; useful at the top of examples and tests.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

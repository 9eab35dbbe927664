//! Core types for scenekit.
//!
//! This crate provides the value types shared by the render and interaction
//! layers:
//! - [`RenderState`] with bitmask flags and parent/child composition
//! - [`Camera`] / [`Frustum`] with screen/world projection helpers
//! - Geometry primitives used by analytic picking ([`Ray`], [`Plane`],
//!   [`Aabb`])
//! - Persisted [`ViewSettings`] and the shared error type

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod aabb;
pub mod camera;
pub mod error;
pub mod frustum;
pub mod ray;
pub mod render_state;

pub use aabb::Aabb;
pub use camera::{Camera, ProjectionMode, ViewSettings, Viewport};
pub use error::{Result, SceneError};
pub use frustum::Frustum;
pub use ray::{intersect_triangle, Plane, Ray, RayHit};
pub use render_state::{Pass, RenderState, StateFlags, TextureHandle, ValueFlags};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

//! Error types for scenekit.

use thiserror::Error;

/// The main error type for scenekit operations.
///
/// Contract violations (frozen matrix pushes, stack underflows, invalid pick
/// mode combinations) indicate bugs in a calling render object or in the host
/// application; they are reported, never swallowed or retried.
#[derive(Error, Debug)]
pub enum SceneError {
    /// A matrix was pushed while the stack was frozen by an in-flight render
    /// object traversal.
    #[error("matrix stack is frozen - a render object without sets_local_transform may not push")]
    MatrixStackFrozen,

    /// A stack was popped past its bottom entry.
    #[error("{0} stack underflow")]
    StackUnderflow(&'static str),

    /// A single nearest-hit result was requested for a rectangle (frustum)
    /// pick, where no cross-hit depth ordering exists.
    #[error("single-hit request is invalid in frustum pick mode - hits are unsortable")]
    PickSingleInFrustumMode,

    /// A pick operation ran before `init` configured the region and camera.
    #[error("pick action not configured - call init before dispatch")]
    PickNotConfigured,

    /// A render object violated its traversal/dispatch contract.
    #[error("render object contract violation: {0}")]
    ObjectContract(String),

    /// A texture image could not be uploaded.
    #[error("texture load error: {0}")]
    TextureLoad(String),

    /// The render backend reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for scenekit operations.
pub type Result<T> = std::result::Result<T, SceneError>;

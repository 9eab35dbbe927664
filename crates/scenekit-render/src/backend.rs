//! The abstract render backend the traversal/pick core drives.
//!
//! The core never talks to a graphics API directly; it issues state changes,
//! transforms, draws, and selection-session calls through [`RenderBackend`].
//! A real implementation forwards these to a GPU context; the
//! [`HeadlessBackend`](crate::headless::HeadlessBackend) records them for
//! tests and batch use.

use glam::{Mat4, Vec4};

use scenekit_core::{Result, TextureHandle, Viewport};

/// Primitive topology for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Independent triangles.
    Triangles,
    /// Independent line segments.
    Lines,
}

/// A single vertex as handed to the backend.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Object-space position.
    pub position: [f32; 3],
    /// Object-space normal.
    pub normal: [f32; 3],
}

/// One draw call: topology plus a vertex payload.
#[derive(Debug, Clone, Copy)]
pub struct DrawData<'a> {
    /// Primitive topology.
    pub topology: Topology,
    /// Vertex payload, consumed in order.
    pub vertices: &'a [Vertex],
}

/// The matrices and viewport a selection session renders with.
///
/// `projection` is already restricted to the pick region
/// (see `Camera::pick_projection`).
#[derive(Debug, Clone)]
pub struct PickMatrices {
    /// View matrix at pick time.
    pub view: Mat4,
    /// Region-restricted projection matrix.
    pub projection: Mat4,
    /// The canvas viewport.
    pub viewport: Viewport,
}

/// One raw selection hit: the name stack in effect while a fragment landed
/// inside the pick region, plus its depth range (0..1).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionHit {
    /// Name stack contents, outermost first.
    pub names: Vec<u32>,
    /// Minimum fragment depth.
    pub z_min: f32,
    /// Maximum fragment depth.
    pub z_max: f32,
}

/// Abstracted fixed-function render surface.
///
/// State appliers are only invoked by the
/// [`RenderStateGuardian`](crate::guardian::RenderStateGuardian) when the
/// relevant state actually changed. Selection follows a session protocol:
/// `begin_selection`, any number of name-bracketed draws, then a single
/// (destructive) `end_selection` that drains the accumulated hits.
pub trait RenderBackend {
    /// Enables/disables alpha blending.
    fn set_blend(&mut self, on: bool);

    /// Enables/disables the depth test.
    fn set_depth_test(&mut self, on: bool);

    /// Enables/disables depth writes.
    fn set_depth_write(&mut self, on: bool);

    /// Enables/disables backface culling.
    fn set_cull_backface(&mut self, on: bool);

    /// Enables/disables lighting.
    fn set_lighting(&mut self, on: bool);

    /// Switches polygon fill between solid and wireframe.
    fn set_wireframe(&mut self, on: bool);

    /// Sets the wireframe line width in pixels.
    fn set_line_width(&mut self, width: f32);

    /// Sets the flat fill color.
    fn set_solid_color(&mut self, color: Vec4);

    /// Sets the lit material colors.
    fn set_material(&mut self, diffuse: Vec4, specular: Vec4);

    /// Binds a texture, or unbinds when `None`.
    fn bind_texture(&mut self, texture: Option<TextureHandle>);

    /// Sets the current model-to-world transform (absolute, not multiplied).
    fn set_transform(&mut self, matrix: Mat4);

    /// Issues one draw call under the current state and transform.
    fn draw(&mut self, data: &DrawData) -> Result<()>;

    /// Uploads an RGBA8 image, returning a handle for `bind_texture`.
    fn upload_texture(&mut self, pixels: &[u8], width: u32, height: u32)
        -> Result<TextureHandle>;

    /// Opens a selection session rendering into the given restricted volume.
    fn begin_selection(&mut self, matrices: &PickMatrices) -> Result<()>;

    /// Pushes a name onto the selection name stack.
    fn push_name(&mut self, name: u32);

    /// Pops the top selection name.
    fn pop_name(&mut self);

    /// Closes the session and drains its hits.
    ///
    /// Destructive: a second call without an intervening `begin_selection`
    /// returns an empty vector. Callers that need the results more than once
    /// must cache them (`PickAction` does).
    fn end_selection(&mut self) -> Vec<SelectionHit>;
}

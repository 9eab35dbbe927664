//! Headless render backend.
//!
//! Records every state change and draw call instead of touching a GPU, and
//! simulates the selection buffer, so traversal and picking can run in
//! integration tests and batch tools with no graphics context.

use glam::{Mat4, Vec4};

use scenekit_core::{Result, SceneError, TextureHandle};

use crate::backend::{DrawData, PickMatrices, RenderBackend, SelectionHit, Topology};
use crate::pick::{decode_selection_buffer, encode_selection_record};

/// One recorded draw call.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    /// Topology of the call.
    pub topology: Topology,
    /// Number of vertices submitted.
    pub vertex_count: usize,
    /// Model transform in effect.
    pub transform: Mat4,
    /// Whether the call happened inside a selection session.
    pub selecting: bool,
    /// Whether wireframe fill was active.
    pub wireframe: bool,
}

#[derive(Debug)]
struct SelectionSession {
    matrices: PickMatrices,
    name_stack: Vec<u32>,
    /// Raw hit records in select-buffer layout (count, zmin, zmax, names...).
    buffer: Vec<u32>,
}

/// A backend that records calls and simulates occlusion selection.
///
/// During a selection session, a draw whose transform origin projects inside
/// the restricted pick volume appends a hit record carrying the current name
/// stack and the projected depth.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    /// Blending enabled.
    pub blend: bool,
    /// Depth test enabled.
    pub depth_test: bool,
    /// Depth writes enabled.
    pub depth_write: bool,
    /// Backface culling enabled.
    pub cull_backface: bool,
    /// Lighting enabled.
    pub lighting: bool,
    /// Wireframe fill enabled.
    pub wireframe: bool,
    /// Current line width.
    pub line_width: f32,
    /// Current fill color.
    pub solid_color: Vec4,
    /// Current diffuse material color.
    pub diffuse: Vec4,
    /// Current specular material color.
    pub specular: Vec4,
    /// Currently bound texture.
    pub texture: Option<TextureHandle>,
    /// Current model transform.
    pub transform: Mat4,
    /// Every draw call issued, in order.
    pub draws: Vec<DrawRecord>,
    /// Count of state-applier invocations, for change-minimization checks.
    pub state_changes: usize,
    /// When set, `upload_texture` fails (exercises the degraded path).
    pub fail_texture_uploads: bool,
    next_texture: u32,
    selection: Option<SelectionSession>,
}

impl HeadlessBackend {
    /// Creates a fresh backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            line_width: 1.0,
            ..Self::default()
        }
    }

    /// Forgets recorded draws and counters; applied state is kept.
    pub fn clear_records(&mut self) {
        self.draws.clear();
        self.state_changes = 0;
    }

    /// Appends a synthetic hit to the open selection session.
    ///
    /// Lets tests script raster hits at exact depths regardless of geometry.
    pub fn inject_selection_hit(&mut self, names: &[u32], z_min: f32, z_max: f32) {
        if let Some(session) = &mut self.selection {
            encode_selection_record(&mut session.buffer, names, z_min, z_max);
        }
    }

    fn note_change(&mut self) {
        self.state_changes += 1;
    }
}

impl RenderBackend for HeadlessBackend {
    fn set_blend(&mut self, on: bool) {
        self.blend = on;
        self.note_change();
    }

    fn set_depth_test(&mut self, on: bool) {
        self.depth_test = on;
        self.note_change();
    }

    fn set_depth_write(&mut self, on: bool) {
        self.depth_write = on;
        self.note_change();
    }

    fn set_cull_backface(&mut self, on: bool) {
        self.cull_backface = on;
        self.note_change();
    }

    fn set_lighting(&mut self, on: bool) {
        self.lighting = on;
        self.note_change();
    }

    fn set_wireframe(&mut self, on: bool) {
        self.wireframe = on;
        self.note_change();
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
        self.note_change();
    }

    fn set_solid_color(&mut self, color: Vec4) {
        self.solid_color = color;
        self.note_change();
    }

    fn set_material(&mut self, diffuse: Vec4, specular: Vec4) {
        self.diffuse = diffuse;
        self.specular = specular;
        self.note_change();
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
        self.note_change();
    }

    fn set_transform(&mut self, matrix: Mat4) {
        self.transform = matrix;
    }

    fn draw(&mut self, data: &DrawData) -> Result<()> {
        let selecting = self.selection.is_some();
        self.draws.push(DrawRecord {
            topology: data.topology,
            vertex_count: data.vertices.len(),
            transform: self.transform,
            selecting,
            wireframe: self.wireframe,
        });

        if let Some(session) = &mut self.selection {
            // Approximate occlusion selection: the object's origin projected
            // through the restricted pick volume decides hit and depth.
            let clip = session.matrices.projection
                * session.matrices.view
                * self.transform
                * Vec4::new(0.0, 0.0, 0.0, 1.0);
            if clip.w.abs() > 1e-9 {
                let ndc = clip.truncate() / clip.w;
                if ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0 && (0.0..=1.0).contains(&ndc.z) {
                    let names = session.name_stack.clone();
                    encode_selection_record(&mut session.buffer, &names, ndc.z, ndc.z);
                }
            }
        }
        Ok(())
    }

    fn upload_texture(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TextureHandle> {
        if self.fail_texture_uploads {
            return Err(SceneError::TextureLoad("simulated upload failure".into()));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(SceneError::TextureLoad(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                pixels.len()
            )));
        }
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        Ok(handle)
    }

    fn begin_selection(&mut self, matrices: &PickMatrices) -> Result<()> {
        if self.selection.is_some() {
            return Err(SceneError::Backend(
                "selection session already open".into(),
            ));
        }
        self.selection = Some(SelectionSession {
            matrices: matrices.clone(),
            name_stack: Vec::new(),
            buffer: Vec::new(),
        });
        Ok(())
    }

    fn push_name(&mut self, name: u32) {
        if let Some(session) = &mut self.selection {
            session.name_stack.push(name);
        }
    }

    fn pop_name(&mut self) {
        if let Some(session) = &mut self.selection {
            session.name_stack.pop();
        }
    }

    fn end_selection(&mut self) -> Vec<SelectionHit> {
        self.selection
            .take()
            .map(|session| decode_selection_buffer(&session.buffer))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenekit_core::{Camera, Vec2, Vec3, Viewport};

    fn pick_matrices_at(center: Vec2) -> (Camera, PickMatrices) {
        let mut camera = Camera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.target = Vec3::ZERO;
        let viewport = Viewport::new(800.0, 800.0);
        let matrices = PickMatrices {
            view: camera.view_matrix(),
            projection: camera.pick_projection(center, Vec2::new(5.0, 5.0), viewport),
            viewport,
        };
        (camera, matrices)
    }

    #[test]
    fn test_selection_records_draw_under_cursor() {
        // The look-at point projects to the canvas center.
        let (_, matrices) = pick_matrices_at(Vec2::new(400.0, 400.0));

        let mut backend = HeadlessBackend::new();
        backend.begin_selection(&matrices).unwrap();
        backend.push_name(42);
        backend.set_transform(Mat4::IDENTITY);
        backend
            .draw(&DrawData {
                topology: Topology::Triangles,
                vertices: &[],
            })
            .unwrap();
        backend.pop_name();

        let hits = backend.end_selection();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].names, vec![42]);

        // Destructive drain: second read is empty.
        assert!(backend.end_selection().is_empty());
    }

    #[test]
    fn test_selection_misses_offscreen_draw() {
        let (_, matrices) = pick_matrices_at(Vec2::new(400.0, 400.0));
        let mut backend = HeadlessBackend::new();
        backend.begin_selection(&matrices).unwrap();
        backend.push_name(7);
        backend.set_transform(Mat4::from_translation(Vec3::new(100.0, 0.0, 0.0)));
        backend
            .draw(&DrawData {
                topology: Topology::Triangles,
                vertices: &[],
            })
            .unwrap();
        assert!(backend.end_selection().is_empty());
    }

    #[test]
    fn test_texture_upload_validates_size() {
        let mut backend = HeadlessBackend::new();
        assert!(backend.upload_texture(&[0; 16], 2, 2).is_ok());
        assert!(backend.upload_texture(&[0; 3], 2, 2).is_err());
    }
}

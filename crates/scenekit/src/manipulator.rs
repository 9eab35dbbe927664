//! The translate manipulator.
//!
//! [`TranslateGizmo`] is a render object holding a private sub-graph of
//! arrow and plane handles; its traversal step runs a nested traversal over
//! that sub-graph, so the handles flow through the same pooled list and
//! raster picking as everything else. [`TranslateControl`] turns pick hits
//! on the handles into constrained drags of a shared
//! [`TransformObject`] bracket.

use std::rc::Rc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use scenekit_core::{
    Camera, Plane, Ray, RenderState, Result, SceneError, StateFlags, Viewport,
};
use scenekit_render::{
    DispatchContext, DrawData, HitRecord, RenderObject, SceneNode, Topology,
    TransformObject, TraverseContext, TraverseState, Vertex,
};

/// A selectable element of the translate gizmo.
///
/// The discriminants are the name ids the handles push during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoElement {
    AxisX = 1,
    AxisY = 2,
    AxisZ = 3,
    PlaneXy = 4,
    PlaneXz = 5,
    PlaneYz = 6,
}

impl GizmoElement {
    /// Decodes an element from its selection name id.
    #[must_use]
    pub fn from_name(name: u32) -> Option<Self> {
        match name {
            1 => Some(Self::AxisX),
            2 => Some(Self::AxisY),
            3 => Some(Self::AxisZ),
            4 => Some(Self::PlaneXy),
            5 => Some(Self::PlaneXz),
            6 => Some(Self::PlaneYz),
            _ => None,
        }
    }

    /// The selection name id.
    #[must_use]
    pub fn name(self) -> u32 {
        self as u32
    }

    /// The constrained axis, for arrow elements.
    #[must_use]
    pub fn axis(self) -> Option<Vec3> {
        match self {
            Self::AxisX => Some(Vec3::X),
            Self::AxisY => Some(Vec3::Y),
            Self::AxisZ => Some(Vec3::Z),
            _ => None,
        }
    }

    /// The drag-plane normal, for plane elements.
    #[must_use]
    pub fn plane_normal(self) -> Option<Vec3> {
        match self {
            Self::PlaneXy => Some(Vec3::Z),
            Self::PlaneXz => Some(Vec3::Y),
            Self::PlaneYz => Some(Vec3::X),
            _ => None,
        }
    }
}

/// One handle of the gizmo: a bit of raster-picked geometry that pushes its
/// element's name id around its draw call during selection.
struct GizmoPart {
    element: GizmoElement,
    vertices: Vec<Vertex>,
}

impl RenderObject for GizmoPart {
    fn kind(&self) -> &'static str {
        "gizmo"
    }

    fn dispatch(&self, ctx: &mut DispatchContext) -> Result<()> {
        ctx.guardian.commit(ctx.backend, ctx.state);
        // No-op outside a selection session.
        ctx.backend.push_name(self.element.name());
        let drawn = ctx.backend.draw(&DrawData {
            topology: Topology::Triangles,
            vertices: &self.vertices,
        });
        ctx.backend.pop_name();
        drawn
    }
}

/// The translate manipulator.
///
/// Attach it to a node inside the subtree controlled by the bracket it
/// manipulates; it positions its handles via its own nested transform, so
/// the gizmo follows whatever its bracket moves.
pub struct TranslateGizmo {
    parts: SceneNode,
    /// Overall handle size in world units.
    scale: f32,
}

impl TranslateGizmo {
    /// Builds a gizmo with handles sized to `scale` world units.
    #[must_use]
    pub fn new(scale: f32) -> Rc<Self> {
        let mut parts = SceneNode::new("translate-gizmo");
        // Handles render unlit and undepth-tested so they stay visible.
        parts.push_state(
            RenderState::inherit_all()
                .with_flag(StateFlags::LIT, false)
                .with_flag(StateFlags::DEPTH_TEST, false),
        );

        let arrows = [
            (GizmoElement::AxisX, Vec3::X, Vec4::new(0.9, 0.2, 0.2, 1.0)),
            (GizmoElement::AxisY, Vec3::Y, Vec4::new(0.2, 0.9, 0.2, 1.0)),
            (GizmoElement::AxisZ, Vec3::Z, Vec4::new(0.2, 0.2, 0.9, 1.0)),
        ];
        for (element, axis, color) in arrows {
            let mut node = SceneNode::new(format!("axis-{}", element.name()));
            node.push_state(RenderState::inherit_all().with_solid_color(color));
            node.attach(Rc::new(TransformObject::new(Mat4::from_translation(
                axis * scale * 0.6,
            ))));
            node.attach(Rc::new(GizmoPart {
                element,
                vertices: shaft_soup(axis, scale),
            }));
            parts.add_child(node);
        }

        let planes = [
            (GizmoElement::PlaneXy, Vec3::X, Vec3::Y),
            (GizmoElement::PlaneXz, Vec3::X, Vec3::Z),
            (GizmoElement::PlaneYz, Vec3::Y, Vec3::Z),
        ];
        for (element, u, v) in planes {
            let mut node = SceneNode::new(format!("plane-{}", element.name()));
            node.push_state(
                RenderState::inherit_all().with_solid_color(Vec4::new(0.8, 0.8, 0.2, 0.6)),
            );
            node.attach(Rc::new(TransformObject::new(Mat4::from_translation(
                (u + v) * scale * 0.35,
            ))));
            node.attach(Rc::new(GizmoPart {
                element,
                vertices: plane_soup(u, v, scale),
            }));
            parts.add_child(node);
        }

        Rc::new(Self { parts, scale })
    }

    /// Handle size in world units.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}

impl RenderObject for TranslateGizmo {
    fn kind(&self) -> &'static str {
        "gizmo"
    }

    fn sets_local_transform(&self) -> bool {
        true
    }

    // The gizmo queues nothing itself; its handles enter the list through
    // a nested traversal of the private sub-graph under the current matrix.
    fn traverse(&self, ctx: &mut TraverseContext) -> Result<TraverseState> {
        ctx.action.build_traverse_list(&self.parts, ctx.camera)?;
        Ok(TraverseState::Continue)
    }

    fn dispatch(&self, _ctx: &mut DispatchContext) -> Result<()> {
        Ok(())
    }
}

/// A box stretched along `axis`, spanning roughly 0..scale from the part's
/// local origin at `axis * scale * 0.6`.
fn shaft_soup(axis: Vec3, scale: f32) -> Vec<Vertex> {
    let half = axis * scale * 0.5 + (Vec3::ONE - axis) * scale * 0.04;
    box_soup(half)
}

/// A small quad pad in the `u`/`v` plane.
fn plane_soup(u: Vec3, v: Vec3, scale: f32) -> Vec<Vertex> {
    let half = (u + v) * scale * 0.12 + u.cross(v).abs() * scale * 0.01;
    box_soup(half)
}

fn box_soup(half: Vec3) -> Vec<Vertex> {
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let mut out = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let origin = normal * half;
        let du = u * half;
        let dv = v * half;
        let corners = [
            origin - du - dv,
            origin + du - dv,
            origin + du + dv,
            origin - du + dv,
        ];
        for &i in &[0usize, 1, 2, 0, 2, 3] {
            out.push(Vertex {
                position: corners[i].to_array(),
                normal: normal.to_array(),
            });
        }
    }
    out
}

struct DragState {
    element: GizmoElement,
    plane: Plane,
    start_point: Vec3,
    start_matrix: Mat4,
    target: Rc<TransformObject>,
}

/// Drives a constrained translate drag from pick hits on gizmo handles.
///
/// Failures mid-drag (e.g. the drag ray going parallel to the drag plane)
/// abort the drag and log an error; the scene is left renderable at the
/// last applied position.
#[derive(Default)]
pub struct TranslateControl {
    drag: Option<DragState>,
}

impl TranslateControl {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag from a pick hit, constraining motion to the hit
    /// element and applying translations to `target`.
    ///
    /// Returns `false` (without error) when the hit is not a gizmo handle.
    /// For arrow elements the drag plane is chosen between the two planes
    /// containing the axis by which normal is more parallel to the view
    /// ray, the numerically stable intersection of the two.
    pub fn begin_drag(
        &mut self,
        hit: &HitRecord,
        camera: &Camera,
        target: Rc<TransformObject>,
    ) -> Result<bool> {
        if hit.kind != "gizmo" {
            return Ok(false);
        }
        let Some(element) = hit.names.first().copied().and_then(GizmoElement::from_name)
        else {
            return Ok(false);
        };

        let anchor = target.matrix().transform_point3(Vec3::ZERO);
        let view_dir = (hit.world_point - camera.position).normalize_or_zero();

        let normal = if let Some(axis) = element.axis() {
            let (a, b) = perpendicular_pair(axis);
            if a.dot(view_dir).abs() >= b.dot(view_dir).abs() {
                a
            } else {
                b
            }
        } else {
            element
                .plane_normal()
                .ok_or_else(|| SceneError::ObjectContract("element has no plane".into()))?
        };

        let plane = Plane::from_point_normal(anchor, normal);
        let ray = Ray::new(camera.position, hit.world_point - camera.position);
        let t = plane.intersect_ray(&ray).ok_or_else(|| {
            SceneError::ObjectContract("pick ray parallel to drag plane".into())
        })?;

        self.drag = Some(DragState {
            element,
            plane,
            start_point: ray.at(t),
            start_matrix: target.matrix(),
            target,
        });
        log::debug!("drag started on {element:?}");
        Ok(true)
    }

    /// Continues the drag toward the pointer, returning the accumulated
    /// world-space delta. `None` when no drag is active (including after a
    /// mid-drag abort).
    pub fn update_drag(
        &mut self,
        camera: &Camera,
        screen: Vec2,
        viewport: Viewport,
    ) -> Option<Vec3> {
        let drag = self.drag.as_ref()?;
        let ray = camera.ray_through(screen, viewport);
        let Some(t) = drag.plane.intersect_ray(&ray) else {
            log::error!(
                "drag ray went parallel to the {:?} drag plane, aborting",
                drag.element
            );
            self.drag = None;
            return None;
        };

        let mut delta = ray.at(t) - drag.start_point;
        if let Some(axis) = drag.element.axis() {
            delta = axis * delta.dot(axis);
        }
        drag.target
            .set_matrix(Mat4::from_translation(delta) * drag.start_matrix);
        Some(delta)
    }

    /// Ends the drag, returning whether one was active.
    pub fn end_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Aborts the drag and restores the target's starting transform.
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            drag.target.set_matrix(drag.start_matrix);
        }
    }

    /// Whether a drag is active.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The element being dragged, if any.
    #[must_use]
    pub fn element(&self) -> Option<GizmoElement> {
        self.drag.as_ref().map(|d| d.element)
    }
}

/// The two unit normals perpendicular to a principal axis.
fn perpendicular_pair(axis: Vec3) -> (Vec3, Vec3) {
    if axis.x.abs() > 0.5 {
        (Vec3::Y, Vec3::Z)
    } else if axis.y.abs() > 0.5 {
        (Vec3::X, Vec3::Z)
    } else {
        (Vec3::X, Vec3::Y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut camera = Camera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        camera.target = Vec3::ZERO;
        camera
    }

    fn axis_hit(element: GizmoElement, world_point: Vec3) -> HitRecord {
        HitRecord {
            kind: "gizmo",
            object: Rc::new(GizmoPart {
                element,
                vertices: Vec::new(),
            }),
            object_to_world: Mat4::from_translation(world_point),
            path: Vec::new(),
            names: vec![element.name()],
            world_point,
            nearest_vertex: None,
            normal: None,
            depth: 10.0,
        }
    }

    #[test]
    fn test_element_name_roundtrip() {
        for name in 1..=6 {
            let element = GizmoElement::from_name(name).unwrap();
            assert_eq!(element.name(), name);
        }
        assert!(GizmoElement::from_name(0).is_none());
        assert!(GizmoElement::from_name(7).is_none());
    }

    #[test]
    fn test_axis_drag_moves_only_along_axis() {
        let camera = camera();
        let viewport = Viewport::new(800.0, 800.0);
        let target = Rc::new(TransformObject::identity());

        let mut control = TranslateControl::new();
        let started = control
            .begin_drag(
                &axis_hit(GizmoElement::AxisX, Vec3::new(0.6, 0.0, 0.0)),
                &camera,
                target.clone(),
            )
            .unwrap();
        assert!(started);
        assert_eq!(control.element(), Some(GizmoElement::AxisX));

        // Drag toward the upper right; only x may change.
        let delta = control
            .update_drag(&camera, Vec2::new(600.0, 250.0), viewport)
            .unwrap();
        assert!(delta.x > 0.0);
        assert_eq!(delta.y, 0.0);
        assert_eq!(delta.z, 0.0);

        let origin = target.matrix().transform_point3(Vec3::ZERO);
        assert!((origin.x - delta.x).abs() < 1e-5);
        assert!(control.end_drag());
    }

    #[test]
    fn test_plane_drag_stays_in_plane() {
        let camera = camera();
        let viewport = Viewport::new(800.0, 800.0);
        let target = Rc::new(TransformObject::identity());

        let mut control = TranslateControl::new();
        control
            .begin_drag(
                &axis_hit(GizmoElement::PlaneXy, Vec3::new(0.3, 0.3, 0.0)),
                &camera,
                target.clone(),
            )
            .unwrap();

        let delta = control
            .update_drag(&camera, Vec2::new(500.0, 300.0), viewport)
            .unwrap();
        assert!(delta.x != 0.0 && delta.y != 0.0);
        assert!(delta.z.abs() < 1e-5, "motion constrained to the xy plane");
    }

    #[test]
    fn test_non_gizmo_hit_does_not_start_a_drag() {
        let camera = camera();
        let mut control = TranslateControl::new();
        let mut hit = axis_hit(GizmoElement::AxisX, Vec3::ZERO);
        hit.kind = "mesh";
        let started = control
            .begin_drag(&hit, &camera, Rc::new(TransformObject::identity()))
            .unwrap();
        assert!(!started);
        assert!(!control.is_dragging());
    }

    #[test]
    fn test_parallel_ray_aborts_drag() {
        let mut start_camera = Camera::new(1.0);
        start_camera.position = Vec3::new(-10.0, 0.0, 0.0);
        start_camera.target = Vec3::ZERO;
        let viewport = Viewport::new(800.0, 800.0);
        let target = Rc::new(TransformObject::identity());

        // AxisY seen from -x picks the yz plane (normal X) as drag plane.
        let mut control = TranslateControl::new();
        control
            .begin_drag(
                &axis_hit(GizmoElement::AxisY, Vec3::new(0.0, 0.6, 0.0)),
                &start_camera,
                target.clone(),
            )
            .unwrap();

        // An updated view looking straight along +y from inside that plane
        // sends the center ray parallel to it.
        let mut inline_camera = Camera::new(1.0);
        inline_camera.position = Vec3::new(0.0, 0.0, 5.0);
        inline_camera.target = Vec3::new(0.0, 5.0, 5.0);
        inline_camera.up = Vec3::Z;

        let before = target.matrix();
        let result = control.update_drag(&inline_camera, Vec2::new(400.0, 400.0), viewport);
        assert!(result.is_none());
        assert!(!control.is_dragging(), "drag aborted");
        assert_eq!(target.matrix(), before, "scene left as last applied");
    }

    #[test]
    fn test_cancel_restores_start_transform() {
        let camera = camera();
        let viewport = Viewport::new(800.0, 800.0);
        let target = Rc::new(TransformObject::new(Mat4::from_translation(Vec3::Y)));

        let mut control = TranslateControl::new();
        control
            .begin_drag(
                &axis_hit(GizmoElement::AxisX, Vec3::new(0.6, 1.0, 0.0)),
                &camera,
                target.clone(),
            )
            .unwrap();
        control.update_drag(&camera, Vec2::new(700.0, 400.0), viewport);
        assert!(target.matrix() != Mat4::from_translation(Vec3::Y));

        control.cancel_drag();
        assert_eq!(target.matrix(), Mat4::from_translation(Vec3::Y));
        assert!(!control.is_dragging());
    }
}

//! Camera, viewport, and screen/world projection helpers.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ray::Ray;
use crate::render_state::StateFlags;

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    /// Perspective projection.
    #[default]
    Perspective,
    /// Orthographic projection.
    Orthographic,
}

/// A window-space viewport rectangle, origin top-left, y down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge in pixels.
    pub x: f32,
    /// Top edge in pixels.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Viewport {
    /// Creates a viewport anchored at the window origin.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Width over height.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height.max(1.0)
    }
}

/// A 3D camera for viewing and picking into the scene.
///
/// One instance per canvas. Mutated by camera controllers; read by the
/// traversal and picking actions.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space.
    pub position: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Up vector.
    pub up: Vec3,
    /// Field of view in radians.
    pub fov: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
    /// Projection mode.
    pub projection_mode: ProjectionMode,
    /// Orthographic half-height (used when `projection_mode` is Orthographic).
    pub ortho_scale: f32,
}

impl Camera {
    /// Creates a new camera with default settings.
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }

    /// Sets the aspect ratio.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Returns the view matrix.
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Returns the projection matrix (0..1 clip depth).
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                Mat4::orthographic_rh(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
        }
    }

    /// Returns the combined view-projection matrix.
    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Returns the camera's forward direction.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }

    /// Returns the camera's right direction.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize()
    }

    /// Projects a world point to window coordinates plus 0..1 depth.
    #[must_use]
    pub fn project(&self, world: Vec3, viewport: Viewport) -> Vec3 {
        let clip = self.view_projection_matrix() * Vec4::from((world, 1.0));
        let ndc = clip.truncate() / clip.w;
        Vec3::new(
            viewport.x + (ndc.x + 1.0) * 0.5 * viewport.width,
            viewport.y + (1.0 - ndc.y) * 0.5 * viewport.height,
            ndc.z,
        )
    }

    /// Unprojects window coordinates plus 0..1 depth back to world space.
    #[must_use]
    pub fn unproject(&self, screen: Vec3, viewport: Viewport) -> Vec3 {
        let ndc = Vec4::new(
            (screen.x - viewport.x) / viewport.width * 2.0 - 1.0,
            1.0 - (screen.y - viewport.y) / viewport.height * 2.0,
            screen.z,
            1.0,
        );
        let world = self.view_projection_matrix().inverse() * ndc;
        world.truncate() / world.w
    }

    /// Returns the world-space eye ray through a window pixel.
    ///
    /// For orthographic projection the ray is parallel to the view
    /// direction, passing through the unprojected near-plane point.
    #[must_use]
    pub fn ray_through(&self, screen: Vec2, viewport: Viewport) -> Ray {
        let p_near = self.unproject(Vec3::new(screen.x, screen.y, 0.0), viewport);
        let p_far = self.unproject(Vec3::new(screen.x, screen.y, 1.0), viewport);
        Ray::new(p_near, p_far - p_near)
    }

    /// Returns a projection matrix restricted to a window-space pick
    /// rectangle, in the manner of `gluPickMatrix`.
    ///
    /// `center` and `size` are in window pixels. Geometry inside the
    /// rectangle fills the restricted clip volume.
    #[must_use]
    pub fn pick_projection(&self, center: Vec2, size: Vec2, viewport: Viewport) -> Mat4 {
        let sx = viewport.width / size.x.max(1.0);
        let sy = viewport.height / size.y.max(1.0);
        let ncx = (center.x - viewport.x) / viewport.width * 2.0 - 1.0;
        let ncy = 1.0 - (center.y - viewport.y) / viewport.height * 2.0;

        let restrict = Mat4::from_translation(Vec3::new(-ncx * sx, -ncy * sy, 0.0))
            * Mat4::from_scale(Vec3::new(sx, sy, 1.0));
        restrict * self.projection_matrix()
    }

    /// Orbits the camera around the target.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let radius = (self.position - self.target).length();
        let mut theta = (self.position.x - self.target.x).atan2(self.position.z - self.target.z);
        let mut phi = ((self.position.y - self.target.y) / radius).acos();

        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);

        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Pans the camera and target together.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.right() * delta_x + self.up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Moves the eye along the view direction by `amount`, clamped so it
    /// never crosses the target.
    pub fn dolly(&mut self, amount: f32) {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                let direction = self.forward();
                let distance = (self.position - self.target).length();
                let new_distance = (distance - amount).max(0.01);
                self.position = self.target - direction * new_distance;
            }
            ProjectionMode::Orthographic => {
                let zoom_factor = 1.0 - amount * 0.4;
                self.ortho_scale = (self.ortho_scale * zoom_factor).clamp(0.01, 1000.0);
            }
        }
    }

    /// Resets the camera to frame the given bounding box.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let size = (max - min).length();

        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, size * 1.5);
        self.near = size * 0.001;
        self.far = size * 100.0;
        self.ortho_scale = (size * 0.6).max(0.1);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}

/// Persisted view settings: the render-mode bitmask as hex plus the
/// near/far clip distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Render-mode flags serialized as a hex string, e.g. `"0xED"`.
    pub render_mode: String,
    /// Near clipping plane.
    pub z_near: f32,
    /// Far clipping plane.
    pub z_far: f32,
}

impl ViewSettings {
    /// Captures settings from a camera and its active render mode.
    #[must_use]
    pub fn capture(camera: &Camera, mode: StateFlags) -> Self {
        Self {
            render_mode: format!("{:#X}", mode.bits()),
            z_near: camera.near,
            z_far: camera.far,
        }
    }

    /// Applies settings onto a camera, returning the restored render mode.
    ///
    /// Unknown bits in the stored mask are dropped.
    pub fn apply(&self, camera: &mut Camera) -> Result<StateFlags> {
        let digits = self
            .render_mode
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        let bits = u32::from_str_radix(digits, 16).map_err(|e| {
            crate::error::SceneError::Backend(format!(
                "bad render mode {:?}: {e}",
                self.render_mode
            ))
        })?;
        camera.near = self.z_near;
        camera.far = self.z_far;
        Ok(StateFlags::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_and_viewport() -> (Camera, Viewport) {
        let mut camera = Camera::new(1.0);
        camera.position = Vec3::new(0.0, 0.0, 5.0);
        camera.target = Vec3::ZERO;
        (camera, Viewport::new(800.0, 800.0))
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let (camera, viewport) = camera_and_viewport();
        let world = Vec3::new(0.3, -0.2, 1.0);
        let screen = camera.project(world, viewport);
        let back = camera.unproject(screen, viewport);
        assert!((back - world).length() < 1e-3);
    }

    #[test]
    fn test_center_pixel_ray_hits_target() {
        let (camera, viewport) = camera_and_viewport();
        let ray = camera.ray_through(Vec2::new(400.0, 400.0), viewport);
        // The center ray should pass through the look-at point.
        let to_target = (camera.target - ray.origin).normalize();
        assert!(ray.dir.dot(to_target) > 0.999);
    }

    #[test]
    fn test_ortho_rays_are_parallel() {
        let (mut camera, viewport) = camera_and_viewport();
        camera.projection_mode = ProjectionMode::Orthographic;
        let a = camera.ray_through(Vec2::new(100.0, 100.0), viewport);
        let b = camera.ray_through(Vec2::new(700.0, 650.0), viewport);
        assert!(a.dir.dot(b.dir) > 0.999);
    }

    #[test]
    fn test_pick_projection_centers_region() {
        let (camera, viewport) = camera_and_viewport();
        let world = Vec3::new(0.5, 0.25, 0.0);
        let screen = camera.project(world, viewport);

        // Restricting to a rect centered on the projected point must map the
        // point to clip center.
        let pick_proj = camera.pick_projection(
            Vec2::new(screen.x, screen.y),
            Vec2::new(10.0, 10.0),
            viewport,
        );
        let clip = pick_proj * camera.view_matrix() * Vec4::from((world, 1.0));
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-3);
        assert!(ndc.y.abs() < 1e-3);
    }

    #[test]
    fn test_dolly_never_crosses_target() {
        let (mut camera, _) = camera_and_viewport();
        camera.dolly(100.0);
        let distance = (camera.position - camera.target).length();
        assert!(distance >= 0.01);
        assert!(camera.forward().dot(Vec3::NEG_Z) > 0.99);
    }

    #[test]
    fn test_view_settings_roundtrip() {
        let (mut camera, _) = camera_and_viewport();
        camera.near = 0.5;
        camera.far = 250.0;
        let mode = StateFlags::SMOOTH | StateFlags::WIREFRAME | StateFlags::DEPTH_TEST;

        let settings = ViewSettings::capture(&camera, mode);
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: ViewSettings = serde_json::from_str(&json).unwrap();

        let mut restored = Camera::new(1.0);
        let restored_mode = parsed.apply(&mut restored).unwrap();
        assert_eq!(restored_mode, mode);
        assert_eq!(restored.near, 0.5);
        assert_eq!(restored.far, 250.0);
    }

    #[test]
    fn test_view_settings_rejects_garbage() {
        let settings = ViewSettings {
            render_mode: "0xZZ".into(),
            z_near: 0.1,
            z_far: 10.0,
        };
        let mut camera = Camera::new(1.0);
        assert!(settings.apply(&mut camera).is_err());
    }
}

//! Camera controllers.
//!
//! Controllers translate pointer and keyboard events into mutations of a
//! [`Camera`]; they own no camera themselves, so one controller can serve
//! several views.

use glam::Vec2;

use scenekit_core::Camera;

use crate::events::{Key, KeyEvent, PointerButton, PointerEvent};

/// Dolly rate tuning.
///
/// The dolly slows down near the look-at point so fine positioning stays
/// controllable: inside `threshold` of the target the `near_rate` applies,
/// outside it the `far_rate`. The defaults match long-standing interactive
/// feel; tune per application if needed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DollyTuning {
    /// Distance to the target below which the near rate kicks in.
    pub threshold: f32,
    /// Fraction of the remaining distance covered per wheel step, near.
    pub near_rate: f32,
    /// Fraction of the remaining distance covered per wheel step, far.
    pub far_rate: f32,
}

impl Default for DollyTuning {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            near_rate: 0.1,
            far_rate: 0.25,
        }
    }
}

/// Arcball-style controller: drag orbits, shift-drag pans, wheel dollies.
#[derive(Debug)]
pub struct OrbitController {
    /// Dolly tuning constants.
    pub dolly: DollyTuning,
    /// Radians of orbit per pixel of drag.
    pub rotate_speed: f32,
    /// World units of pan per pixel of drag at unit distance.
    pub pan_speed: f32,
    last_pos: Option<Vec2>,
    panning: bool,
}

impl OrbitController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dolly: DollyTuning::default(),
            rotate_speed: 0.01,
            pan_speed: 0.002,
            last_pos: None,
            panning: false,
        }
    }

    /// Starts a drag; shift (or middle button) selects panning.
    pub fn on_pointer_down(&mut self, event: &PointerEvent) {
        self.last_pos = Some(event.pos);
        self.panning =
            event.modifiers.shift || event.button == Some(PointerButton::Middle);
    }

    /// Continues a drag, mutating the camera. No-op when no drag is active.
    pub fn on_pointer_move(&mut self, event: &PointerEvent, camera: &mut Camera) {
        let Some(last) = self.last_pos else {
            return;
        };
        let delta = event.pos - last;
        self.last_pos = Some(event.pos);

        if self.panning {
            let distance = (camera.position - camera.target).length();
            camera.pan(
                -delta.x * self.pan_speed * distance,
                delta.y * self.pan_speed * distance,
            );
        } else {
            camera.orbit(-delta.x * self.rotate_speed, -delta.y * self.rotate_speed);
        }
    }

    /// Ends the drag.
    pub fn on_pointer_up(&mut self) {
        self.last_pos = None;
        self.panning = false;
    }

    /// Whether a drag is active.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.last_pos.is_some()
    }

    /// Dollies toward (positive `steps`) or away from the look-at point.
    ///
    /// The step covers a fraction of the remaining distance, with a slower
    /// rate inside [`DollyTuning::threshold`] of the target.
    pub fn on_wheel(&self, steps: f32, camera: &mut Camera) {
        let distance = (camera.position - camera.target).length();
        let rate = if distance < self.dolly.threshold {
            self.dolly.near_rate
        } else {
            self.dolly.far_rate
        };
        camera.dolly(steps * rate * distance);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new()
    }
}

/// WASD-style controller for free flight.
///
/// Call [`update`](Self::update) once per frame with the elapsed seconds;
/// key events only toggle held state.
#[derive(Debug, Default)]
pub struct FirstPersonController {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    rise: bool,
    sink: bool,
    /// World units per second.
    pub move_speed: f32,
}

impl FirstPersonController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            move_speed: 3.0,
            ..Self::default()
        }
    }

    /// Records a key press or release.
    pub fn on_key(&mut self, event: &KeyEvent) {
        let held = event.pressed;
        match event.key {
            Key::W | Key::Up => self.forward = held,
            Key::S | Key::Down => self.back = held,
            Key::A | Key::Left => self.left = held,
            Key::D | Key::Right => self.right = held,
            Key::E => self.rise = held,
            Key::Q => self.sink = held,
        }
    }

    /// Moves the camera according to held keys; target moves with the eye
    /// so the view direction is preserved.
    pub fn update(&self, dt: f32, camera: &mut Camera) {
        let mut step = glam::Vec3::ZERO;
        let forward = camera.forward();
        let right = camera.right();
        if self.forward {
            step += forward;
        }
        if self.back {
            step -= forward;
        }
        if self.right {
            step += right;
        }
        if self.left {
            step -= right;
        }
        if self.rise {
            step += camera.up;
        }
        if self.sink {
            step -= camera.up;
        }
        if step == glam::Vec3::ZERO {
            return;
        }
        let step = step.normalize() * self.move_speed * dt;
        camera.position += step;
        camera.target += step;
    }
}

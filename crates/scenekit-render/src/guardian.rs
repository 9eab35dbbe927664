//! Render-state change minimization.
//!
//! The guardian sits between resolved [`RenderState`]s and the backend: it
//! remembers the last committed state and fires only the handlers whose bits
//! (or bound values) actually differ, so a traversal sorted by render state
//! touches the backend a minimal number of times.

use scenekit_core::{RenderState, StateFlags, TextureHandle};

use crate::backend::RenderBackend;

/// A state-change handler bound to one or more mode bits.
///
/// Receives the new state and the previously committed one (`None` on the
/// first commit after a reset). Handlers must be idempotent; across different
/// bit groups the only ordering guarantee is registration order.
pub type StateHandler = Box<dyn FnMut(&mut dyn RenderBackend, &RenderState, Option<&RenderState>)>;

/// Tracks the previously committed state and dispatches minimal changes.
///
/// One guardian per backend context. Interleaving commits from two different
/// traversals against the same guardian without an intervening
/// [`reset`](Self::reset) is a caller error: the cached previous state
/// would belong to the other traversal.
#[derive(Default)]
pub struct RenderStateGuardian {
    handlers: Vec<(StateFlags, StateHandler)>,
    previous: Option<RenderState>,
}

impl RenderStateGuardian {
    /// Creates an empty guardian with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a guardian with the standard bit-group handlers wired to the
    /// backend's state appliers.
    #[must_use]
    pub fn with_default_handlers() -> Self {
        let mut guardian = Self::new();

        guardian.register_handler(StateFlags::ALPHA, |backend, new, _| {
            backend.set_blend(new.flags.contains(StateFlags::ALPHA));
        });
        guardian.register_handler(StateFlags::DEPTH_TEST, |backend, new, _| {
            backend.set_depth_test(new.flags.contains(StateFlags::DEPTH_TEST));
        });
        guardian.register_handler(StateFlags::DEPTH_WRITE, |backend, new, _| {
            backend.set_depth_write(new.flags.contains(StateFlags::DEPTH_WRITE));
        });
        guardian.register_handler(StateFlags::CULL_BACK, |backend, new, _| {
            backend.set_cull_backface(new.flags.contains(StateFlags::CULL_BACK));
        });
        guardian.register_handler(StateFlags::LIT, |backend, new, _| {
            backend.set_lighting(new.flags.contains(StateFlags::LIT));
            backend.set_material(new.diffuse, new.specular);
        });
        guardian.register_handler(StateFlags::TEXTURED, |backend, new, _| {
            if new.flags.contains(StateFlags::TEXTURED) {
                backend.bind_texture(Some(new.texture.unwrap_or(TextureHandle::MISSING)));
            } else {
                backend.bind_texture(None);
            }
        });
        guardian.register_handler(StateFlags::WIREFRAME, |backend, new, _| {
            backend.set_wireframe(new.flags.contains(StateFlags::WIREFRAME));
            backend.set_line_width(new.line_width);
        });
        guardian.register_handler(StateFlags::SMOOTH, |backend, new, _| {
            backend.set_solid_color(new.solid_color);
        });

        guardian
    }

    /// Registers a handler for one or more mode bits.
    pub fn register_handler(
        &mut self,
        mask: StateFlags,
        handler: impl FnMut(&mut dyn RenderBackend, &RenderState, Option<&RenderState>) + 'static,
    ) {
        self.handlers.push((mask, Box::new(handler)));
    }

    /// Commits a new state: fires every handler whose bits differ from the
    /// previously committed state (all of them when there is no previous
    /// state), then records `new` as the previous state.
    pub fn commit(&mut self, backend: &mut dyn RenderBackend, new: &RenderState) {
        let previous = self.previous.take();
        for (mask, handler) in &mut self.handlers {
            let fire = match &previous {
                None => true,
                Some(prev) => new.differs(prev, *mask),
            };
            if fire {
                handler(backend, new, previous.as_ref());
            }
        }
        self.previous = Some(new.clone());
    }

    /// Forgets the cached previous state so the next commit re-applies
    /// everything. Required at the start of every render/pick dispatch.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Whether a state has been committed since the last reset.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::headless::HeadlessBackend;

    fn counting_guardian(mask: StateFlags) -> (RenderStateGuardian, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let mut guardian = RenderStateGuardian::new();
        let c = count.clone();
        guardian.register_handler(mask, move |_, _, _| c.set(c.get() + 1));
        (guardian, count)
    }

    #[test]
    fn test_first_commit_fires_everything() {
        let (mut guardian, count) = counting_guardian(StateFlags::ALPHA);
        let mut backend = HeadlessBackend::new();
        guardian.commit(&mut backend, &RenderState::new());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_handler_fires_iff_bits_differ() {
        let (mut guardian, count) = counting_guardian(StateFlags::ALPHA);
        let mut backend = HeadlessBackend::new();

        let opaque = RenderState::new();
        let blended = RenderState::new().with_flag(StateFlags::ALPHA, true);

        guardian.commit(&mut backend, &opaque); // first: fires
        guardian.commit(&mut backend, &opaque); // unchanged: silent
        assert_eq!(count.get(), 1);

        guardian.commit(&mut backend, &blended); // ALPHA flipped: fires
        assert_eq!(count.get(), 2);

        // A change in an unrelated bit stays silent for this handler.
        let blended_wire = blended.clone().with_flag(StateFlags::WIREFRAME, true);
        guardian.commit(&mut backend, &blended_wire);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_reset_forces_reapply() {
        let (mut guardian, count) = counting_guardian(StateFlags::DEPTH_TEST);
        let mut backend = HeadlessBackend::new();
        let state = RenderState::new();

        guardian.commit(&mut backend, &state);
        guardian.reset();
        guardian.commit(&mut backend, &state);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut guardian = RenderStateGuardian::new();
        for tag in 0..3 {
            let o = order.clone();
            guardian.register_handler(StateFlags::SMOOTH, move |_, _, _| {
                o.borrow_mut().push(tag);
            });
        }
        let mut backend = HeadlessBackend::new();
        guardian.commit(&mut backend, &RenderState::new());
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_default_handlers_apply_backend_state() {
        let mut guardian = RenderStateGuardian::with_default_handlers();
        let mut backend = HeadlessBackend::new();
        let state = RenderState::new()
            .with_flag(StateFlags::ALPHA, true)
            .with_flag(StateFlags::TEXTURED, true)
            .with_texture(TextureHandle(3));

        guardian.commit(&mut backend, &state);
        assert!(backend.blend);
        assert!(backend.depth_test);
        assert_eq!(backend.texture, Some(TextureHandle(3)));

        // Re-committing the identical state touches nothing.
        backend.state_changes = 0;
        guardian.commit(&mut backend, &state);
        assert_eq!(backend.state_changes, 0);
    }

    #[test]
    fn test_missing_texture_degrades_to_sentinel() {
        let mut guardian = RenderStateGuardian::with_default_handlers();
        let mut backend = HeadlessBackend::new();
        let state = RenderState::new().with_flag(StateFlags::TEXTURED, true);
        guardian.commit(&mut backend, &state);
        assert_eq!(backend.texture, Some(TextureHandle::MISSING));
    }
}

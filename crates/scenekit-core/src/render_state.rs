//! Render state values and parent/child composition.
//!
//! A [`RenderState`] bundles the mode toggles, colors, texture binding and
//! line width that affect how a primitive is drawn. States compose down the
//! scene graph: a child state only overrides the bits and values it
//! explicitly sets; everything else inherits from the parent.

use bitflags::bitflags;
use glam::Vec4;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Mode toggles for drawing.
    ///
    /// Persisted as a hex string (see `ViewSettings`), not via serde derive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u32 {
        /// Smooth/solid fill pass participates.
        const SMOOTH = 1 << 0;
        /// Wireframe pass participates.
        const WIREFRAME = 1 << 1;
        /// Lighting is applied.
        const LIT = 1 << 2;
        /// A texture is sampled.
        const TEXTURED = 1 << 3;
        /// Alpha blending participates (back-to-front ordering applies).
        const ALPHA = 1 << 4;
        /// Backface culling is enabled.
        const CULL_BACK = 1 << 5;
        /// Depth test is enabled.
        const DEPTH_TEST = 1 << 6;
        /// Depth writes are enabled.
        const DEPTH_WRITE = 1 << 7;
    }
}

bitflags! {
    /// Marks which value fields a state explicitly sets (vs. inherits).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValueFlags: u32 {
        /// `solid_color` is explicitly set.
        const SOLID_COLOR = 1 << 0;
        /// `wire_color` is explicitly set.
        const WIRE_COLOR = 1 << 1;
        /// `diffuse` is explicitly set.
        const DIFFUSE = 1 << 2;
        /// `specular` is explicitly set.
        const SPECULAR = 1 << 3;
        /// `texture` is explicitly set.
        const TEXTURE = 1 << 4;
        /// `line_width` is explicitly set.
        const LINE_WIDTH = 1 << 5;
    }
}

/// Opaque handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Sentinel handle bound when an image failed to load; draws untextured.
    pub const MISSING: TextureHandle = TextureHandle(u32::MAX);
}

/// The drawing pass a traversal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Filled smooth/solid geometry.
    Smooth,
    /// Line-only wireframe overlay.
    Wireframe,
}

/// The full visual state a primitive is drawn with.
///
/// Immutable once committed to the guardian; composition produces new values.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    /// Active mode toggles.
    pub flags: StateFlags,
    /// Bits this state explicitly sets; all other bits inherit on compose.
    pub override_mask: StateFlags,
    /// When false, composition ignores the parent entirely.
    pub inherit: bool,
    /// Value fields this state explicitly sets.
    pub value_mask: ValueFlags,
    /// Fill color for the solid pass.
    pub solid_color: Vec4,
    /// Line color for the wireframe pass.
    pub wire_color: Vec4,
    /// Diffuse material color.
    pub diffuse: Vec4,
    /// Specular material color.
    pub specular: Vec4,
    /// Bound texture, if any.
    pub texture: Option<TextureHandle>,
    /// Wireframe line width in pixels.
    pub line_width: f32,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            flags: StateFlags::SMOOTH
                | StateFlags::LIT
                | StateFlags::CULL_BACK
                | StateFlags::DEPTH_TEST
                | StateFlags::DEPTH_WRITE,
            override_mask: StateFlags::empty(),
            inherit: true,
            value_mask: ValueFlags::empty(),
            solid_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            wire_color: Vec4::new(0.1, 0.1, 0.1, 1.0),
            diffuse: Vec4::new(0.7, 0.7, 0.7, 1.0),
            specular: Vec4::new(0.2, 0.2, 0.2, 1.0),
            texture: None,
            line_width: 1.0,
        }
    }
}

impl RenderState {
    /// Creates a default state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty override state: nothing set, everything inherits.
    #[must_use]
    pub fn inherit_all() -> Self {
        Self {
            flags: StateFlags::empty(),
            ..Self::default()
        }
    }

    /// Sets or clears a mode flag, marking it as explicitly overridden.
    pub fn set_flag(&mut self, flag: StateFlags, on: bool) {
        self.flags.set(flag, on);
        self.override_mask |= flag;
    }

    /// Builder form of [`set_flag`](Self::set_flag).
    #[must_use]
    pub fn with_flag(mut self, flag: StateFlags, on: bool) -> Self {
        self.set_flag(flag, on);
        self
    }

    /// Sets the solid fill color, marking it as explicitly set.
    #[must_use]
    pub fn with_solid_color(mut self, color: Vec4) -> Self {
        self.solid_color = color;
        self.value_mask |= ValueFlags::SOLID_COLOR;
        self
    }

    /// Sets the wireframe color, marking it as explicitly set.
    #[must_use]
    pub fn with_wire_color(mut self, color: Vec4) -> Self {
        self.wire_color = color;
        self.value_mask |= ValueFlags::WIRE_COLOR;
        self
    }

    /// Sets the diffuse material color, marking it as explicitly set.
    #[must_use]
    pub fn with_diffuse(mut self, color: Vec4) -> Self {
        self.diffuse = color;
        self.value_mask |= ValueFlags::DIFFUSE;
        self
    }

    /// Sets the specular material color, marking it as explicitly set.
    #[must_use]
    pub fn with_specular(mut self, color: Vec4) -> Self {
        self.specular = color;
        self.value_mask |= ValueFlags::SPECULAR;
        self
    }

    /// Binds a texture, marking it as explicitly set.
    #[must_use]
    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self.value_mask |= ValueFlags::TEXTURE;
        self
    }

    /// Sets the wireframe line width, marking it as explicitly set.
    #[must_use]
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self.value_mask |= ValueFlags::LINE_WIDTH;
        self
    }

    /// Composes this (child) state over a parent state.
    ///
    /// Bits in `override_mask` and values in `value_mask` win; everything
    /// else inherits from the parent. When `inherit` is false the parent is
    /// ignored entirely. Composing a state over itself yields itself.
    #[must_use]
    pub fn compose_from(&self, parent: &RenderState) -> RenderState {
        if !self.inherit {
            return self.clone();
        }

        let pick =
            |mask: ValueFlags, child_val: Vec4, parent_val: Vec4| -> Vec4 {
                if self.value_mask.contains(mask) {
                    child_val
                } else {
                    parent_val
                }
            };

        RenderState {
            flags: (parent.flags & !self.override_mask) | (self.flags & self.override_mask),
            override_mask: parent.override_mask | self.override_mask,
            inherit: true,
            value_mask: parent.value_mask | self.value_mask,
            solid_color: pick(ValueFlags::SOLID_COLOR, self.solid_color, parent.solid_color),
            wire_color: pick(ValueFlags::WIRE_COLOR, self.wire_color, parent.wire_color),
            diffuse: pick(ValueFlags::DIFFUSE, self.diffuse, parent.diffuse),
            specular: pick(ValueFlags::SPECULAR, self.specular, parent.specular),
            texture: if self.value_mask.contains(ValueFlags::TEXTURE) {
                self.texture
            } else {
                parent.texture
            },
            line_width: if self.value_mask.contains(ValueFlags::LINE_WIDTH) {
                self.line_width
            } else {
                parent.line_width
            },
        }
    }

    /// Returns a copy restricted to one drawing pass.
    ///
    /// The wireframe copy must not carry texture/lighting/alpha bits; the
    /// smooth copy drops the wireframe bit.
    #[must_use]
    pub fn masked_for_pass(&self, pass: Pass) -> RenderState {
        let mut out = self.clone();
        match pass {
            Pass::Smooth => {
                out.flags -= StateFlags::WIREFRAME;
                out.flags |= StateFlags::SMOOTH;
            }
            Pass::Wireframe => {
                out.flags -=
                    StateFlags::TEXTURED | StateFlags::LIT | StateFlags::ALPHA | StateFlags::SMOOTH;
                out.flags |= StateFlags::WIREFRAME;
            }
        }
        out
    }

    /// Whether this state differs from `prev` within `mask`.
    ///
    /// Covers the bits themselves plus the value fields bound to them, so a
    /// texture swap under an unchanged `TEXTURED` bit still reads as changed.
    #[must_use]
    pub fn differs(&self, prev: &RenderState, mask: StateFlags) -> bool {
        if (self.flags ^ prev.flags).intersects(mask) {
            return true;
        }
        if mask.intersects(StateFlags::TEXTURED) && self.texture != prev.texture {
            return true;
        }
        if mask.intersects(StateFlags::WIREFRAME)
            && (self.wire_color != prev.wire_color
                || self.line_width.to_bits() != prev.line_width.to_bits())
        {
            return true;
        }
        if mask.intersects(StateFlags::LIT)
            && (self.diffuse != prev.diffuse || self.specular != prev.specular)
        {
            return true;
        }
        if mask.intersects(StateFlags::SMOOTH) && self.solid_color != prev.solid_color {
            return true;
        }
        false
    }

    /// Batching key for traversal-list ordering.
    ///
    /// Alpha-blended entries sort after all opaque entries; within a group,
    /// entries cluster by flag bits and then by bound texture.
    #[must_use]
    pub fn sort_key(&self) -> u64 {
        let alpha = u64::from(self.flags.contains(StateFlags::ALPHA));
        let tex = self.texture.map_or(u64::from(u32::MAX), |t| u64::from(t.0));
        (alpha << 63) | (u64::from(self.flags.bits()) << 32) | tex
    }
}

//! Texture registry.
//!
//! One registry per rendering context, constructed explicitly and passed
//! where needed. Uploads go through the context's backend; a failed upload
//! degrades to [`TextureHandle::MISSING`] rather than failing the caller,
//! so a bad image file costs one texture, not the scene.

use scenekit_core::TextureHandle;
use scenekit_render::RenderBackend;

/// Named textures uploaded through one backend.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    entries: Vec<(String, TextureHandle)>,
}

impl TextureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads RGBA pixels under `name`, replacing any previous entry.
    ///
    /// On upload failure the name is registered as
    /// [`TextureHandle::MISSING`] and the error is logged.
    pub fn upload(
        &mut self,
        backend: &mut dyn RenderBackend,
        name: &str,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> TextureHandle {
        let handle = match backend.upload_texture(pixels, width, height) {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("texture upload for {name:?} failed: {e}");
                TextureHandle::MISSING
            }
        };
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = handle;
        } else {
            self.entries.push((name.to_string(), handle));
        }
        handle
    }

    /// Looks up a texture by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TextureHandle> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| *h)
    }

    /// Number of registered names (missing ones included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

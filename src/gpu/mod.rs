//! Texture residency behind a single context lock.
//!
//! Every upload and release, whether issued by the refresh worker or by the
//! render loop, runs inside [`GpuContext::with`], so exactly one thread owns
//! the rendering context at a time.

use std::sync::{Mutex, PoisonError};

use image::RgbImage;

use crate::error::Result;

pub mod headless;
pub mod wgpu_backend;

pub use headless::HeadlessTextures;
pub use wgpu_backend::WgpuTextures;

/// Opaque id of a resident texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub(crate) u64);

impl TextureHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Allocates and releases display resources for decoded images.
pub trait TextureBackend: Send {
    /// Upload `pixels` and return a handle to the new resource.
    ///
    /// # Errors
    /// Returns [`crate::error::Error::ResourceExhausted`] when the backend
    /// cannot hold another texture of this size.
    fn allocate(&mut self, pixels: &RgbImage) -> Result<TextureHandle>;

    /// Release a texture. Unknown handles are ignored.
    fn release(&mut self, handle: TextureHandle);
}

impl<T: TextureBackend + ?Sized> TextureBackend for Box<T> {
    fn allocate(&mut self, pixels: &RgbImage) -> Result<TextureHandle> {
        (**self).allocate(pixels)
    }

    fn release(&mut self, handle: TextureHandle) {
        (**self).release(handle);
    }
}

/// Serializes "acquire context, do GPU work, release context".
#[derive(Debug)]
pub struct GpuContext<B> {
    backend: Mutex<B>,
}

impl<B: TextureBackend> GpuContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
        }
    }

    /// Run `f` while holding the context. Keep the closure short: the render
    /// loop contends for the same lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        let mut guard = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

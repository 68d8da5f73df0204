use std::collections::HashMap;

use image::RgbImage;
use tracing::trace;

use super::{TextureBackend, TextureHandle};
use crate::error::{Error, Result};

const DEFAULT_MAX_DIMENSION: u32 = 16_384;

/// In-memory texture table used when no GPU device is wanted, and in tests.
///
/// Tracks live handles and their sizes; an optional budget caps how many
/// textures may be resident at once.
#[derive(Debug)]
pub struct HeadlessTextures {
    next_id: u64,
    live: HashMap<u64, (u32, u32)>,
    budget: Option<usize>,
    max_dimension: u32,
}

impl Default for HeadlessTextures {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HeadlessTextures {
    pub fn new(budget: Option<usize>) -> Self {
        Self {
            next_id: 1,
            live: HashMap::new(),
            budget,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.live.contains_key(&handle.0)
    }

    pub fn dimensions(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.live.get(&handle.0).copied()
    }
}

impl TextureBackend for HeadlessTextures {
    fn allocate(&mut self, pixels: &RgbImage) -> Result<TextureHandle> {
        let (width, height) = pixels.dimensions();
        if width > self.max_dimension || height > self.max_dimension {
            return Err(Error::ResourceExhausted {
                width,
                height,
                reason: format!("exceeds max dimension {}", self.max_dimension),
            });
        }
        if let Some(budget) = self.budget {
            if self.live.len() >= budget {
                return Err(Error::ResourceExhausted {
                    width,
                    height,
                    reason: format!("texture budget of {budget} reached"),
                });
            }
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert(id, (width, height));
        trace!(id, width, height, "headless texture allocated");
        Ok(TextureHandle(id))
    }

    fn release(&mut self, handle: TextureHandle) {
        if self.live.remove(&handle.0).is_some() {
            trace!(id = handle.0, "headless texture released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_unique_and_released() {
        let mut textures = HeadlessTextures::default();
        let a = textures.allocate(&RgbImage::new(2, 2)).unwrap();
        let b = textures.allocate(&RgbImage::new(3, 1)).unwrap();
        assert_ne!(a, b);
        assert_eq!(textures.dimensions(b), Some((3, 1)));
        textures.release(a);
        textures.release(a);
        assert!(!textures.contains(a));
        assert_eq!(textures.live_count(), 1);
    }

    #[test]
    fn budget_and_dimension_limits_exhaust() {
        let mut textures = HeadlessTextures::new(Some(1)).with_max_dimension(8);
        assert!(matches!(
            textures.allocate(&RgbImage::new(9, 1)),
            Err(Error::ResourceExhausted { width: 9, .. })
        ));
        let first = textures.allocate(&RgbImage::new(1, 1)).unwrap();
        assert!(matches!(
            textures.allocate(&RgbImage::new(1, 1)),
            Err(Error::ResourceExhausted { .. })
        ));
        textures.release(first);
        assert!(textures.allocate(&RgbImage::new(1, 1)).is_ok());
    }
}

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::cache::CacheOptions;
use crate::gpu::{HeadlessTextures, TextureBackend, WgpuTextures};
use crate::view::ZoomOptions;

/// Which [`TextureBackend`] the binary creates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureBackendKind {
    #[default]
    Headless,
    Wgpu,
}

impl fmt::Display for TextureBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Headless => "headless",
            Self::Wgpu => "wgpu",
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Configuration {
    /// Entries kept resident on each side of the selection.
    pub window_radius: usize,
    /// How often the refresh worker checks for requests.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Longest side of uploaded previews; full resolution when unset.
    pub preview_max_dimension: Option<u32>,
    pub texture_backend: TextureBackendKind,
    /// Maximum live textures for the headless backend.
    pub texture_budget: Option<usize>,
    pub zoom: ZoomOptions,
    pub export: ExportOptions,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            window_radius: 3,
            poll_interval: Duration::from_millis(50),
            preview_max_dimension: None,
            texture_backend: TextureBackendKind::default(),
            texture_budget: None,
            zoom: ZoomOptions::default(),
            export: ExportOptions::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&s).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Validate invariants and return the config.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.window_radius <= 1024,
            "window-radius must be at most 1024"
        );
        ensure!(
            self.poll_interval > Duration::ZERO,
            "poll-interval must be positive"
        );
        if let Some(dim) = self.preview_max_dimension {
            ensure!(dim > 0, "preview-max-dimension must be greater than zero");
        }
        if let Some(budget) = self.texture_budget {
            ensure!(budget > 0, "texture-budget must be greater than zero");
        }
        ensure!(
            self.zoom.floor.is_finite() && self.zoom.floor > 0.0,
            "zoom.floor must be positive"
        );
        ensure!(
            self.zoom.step_divisor.is_finite() && self.zoom.step_divisor > 0.0,
            "zoom.step-divisor must be positive"
        );
        self.export.validate()?;
        Ok(self)
    }

    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            radius: self.window_radius,
            preview_max_dimension: self.preview_max_dimension,
        }
    }

    /// Create the configured backend. Falls back to headless textures when
    /// no GPU adapter is available.
    pub fn build_texture_backend(&self) -> Box<dyn TextureBackend> {
        match self.texture_backend {
            TextureBackendKind::Headless => Box::new(HeadlessTextures::new(self.texture_budget)),
            TextureBackendKind::Wgpu => match WgpuTextures::new_headless() {
                Ok(backend) => Box::new(backend),
                Err(err) => {
                    tracing::warn!(error = ?err, "wgpu unavailable; using headless textures");
                    Box::new(HeadlessTextures::new(self.texture_budget))
                }
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ExportOptions {
    /// Default JPEG quality, `1..=100`.
    pub jpeg_quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl ExportOptions {
    fn validate(&self) -> Result<()> {
        ensure!(
            (1..=100).contains(&self.jpeg_quality),
            "export.jpeg-quality must be within 1..=100"
        );
        Ok(())
    }
}

//! Decode and encode packed RGB buffers.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageError, RgbImage};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Decode `path` into an 8-bit RGB buffer, dropping any alpha channel.
pub fn decode_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Container written by [`encode_rgb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Lossless 24-bit RGB.
    Png,
    /// Uncompressed bitmap.
    Bmp,
    /// Lossy, quality in `1..=100`.
    Jpeg { quality: u8 },
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Jpeg { .. } => "jpg",
        }
    }

    /// Whether `ext` already names this container.
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        match self {
            Self::Png => ext == "png",
            Self::Bmp => ext == "bmp",
            Self::Jpeg { .. } => ext == "jpg" || ext == "jpeg",
        }
    }

    /// Parse a format name; `jpeg_quality` is used for JPEG.
    pub fn parse(name: &str, jpeg_quality: u8) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "jpg" | "jpeg" => Some(Self::Jpeg {
                quality: jpeg_quality,
            }),
            _ => None,
        }
    }
}

/// Write `pixels` to `path`, replacing any existing file.
///
/// The image is encoded into a temporary sibling and renamed over `path`
/// once complete, so a failed encode never leaves `path` truncated.
pub fn encode_rgb(pixels: &RgbImage, path: &Path, format: ExportFormat) -> Result<()> {
    if let ExportFormat::Jpeg { quality } = format {
        if !(1..=100).contains(&quality) {
            return Err(Error::InvalidQuality(quality));
        }
    }
    let wrap = |source: ImageError| Error::Encode {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(|e| wrap(ImageError::IoError(e)))?;
    let mut writer = BufWriter::new(staged);
    let (width, height) = pixels.dimensions();
    let buf = pixels.as_raw();
    match format {
        ExportFormat::Png => PngEncoder::new(&mut writer).write_image(
            buf,
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
        ExportFormat::Bmp => BmpEncoder::new(&mut writer).write_image(
            buf,
            width,
            height,
            ExtendedColorType::Rgb8,
        ),
        ExportFormat::Jpeg { quality } => JpegEncoder::new_with_quality(&mut writer, quality)
            .write_image(buf, width, height, ExtendedColorType::Rgb8),
    }
    .map_err(wrap)?;
    let staged = writer
        .into_inner()
        .map_err(|e| wrap(ImageError::IoError(e.into_error())))?;
    staged
        .persist(path)
        .map_err(|e| wrap(ImageError::IoError(e.error)))?;
    Ok(())
}

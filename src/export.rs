//! Write an entry's edits into a new image file.
//!
//! Export always starts from a fresh full-resolution decode; the resident
//! preview texture is never read back.

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::cache::{ImageEntry, Modifiers};
use crate::codec::{self, encode_rgb};
use crate::error::Result;
use crate::processing::color::{adjust_contrast, adjust_saturation, shift_hue};
use crate::processing::orientation::Orientation;
use crate::processing::transform::apply_orientation;

pub use crate::codec::ExportFormat;

/// Decode `entry`, apply its edits and write the result.
///
/// `output = None` overwrites the entry's own file. The format's extension
/// is appended when `output` does not already carry it. Returns the path
/// actually written.
///
/// # Errors
/// [`crate::error::Error::Decode`] if the source cannot be read,
/// [`crate::error::Error::InvalidQuality`] for a JPEG quality outside
/// `1..=100`, [`crate::error::Error::Encode`] if the target cannot be
/// written.
pub fn export(entry: &ImageEntry, output: Option<&Path>, format: ExportFormat) -> Result<PathBuf> {
    let target = output_path(output.unwrap_or(entry.path()), format);
    let source = codec::decode_rgb(entry.path())?;
    let pixels = render_edits(source, entry.orientation, entry.modifiers);
    encode_rgb(&pixels, &target, format)?;
    info!(
        source = %entry.path().display(),
        target = %target.display(),
        format = format.extension(),
        "exported"
    );
    Ok(target)
}

/// Apply orientation and then each non-identity modifier.
pub fn render_edits(pixels: RgbImage, orientation: Orientation, modifiers: Modifiers) -> RgbImage {
    let mut pixels = apply_orientation(orientation, pixels);
    if modifiers.contrast() != 1.0 {
        adjust_contrast(&mut pixels, modifiers.contrast());
    }
    if modifiers.saturation() != 1.0 {
        adjust_saturation(&mut pixels, modifiers.saturation());
    }
    if modifiers.hue() != 0.0 {
        shift_hue(&mut pixels, modifiers.hue());
    }
    pixels
}

/// `path` with the format's extension appended unless it already has it.
pub fn output_path(path: &Path, format: ExportFormat) -> PathBuf {
    let has_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| format.matches_extension(e));
    if has_ext {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_appended_only_when_missing() {
        let png = ExportFormat::Png;
        assert_eq!(output_path(Path::new("out"), png), PathBuf::from("out.png"));
        assert_eq!(output_path(Path::new("out.PNG"), png), PathBuf::from("out.PNG"));
        assert_eq!(output_path(Path::new("a.jpg"), png), PathBuf::from("a.jpg.png"));
        let jpeg = ExportFormat::Jpeg { quality: 80 };
        assert_eq!(output_path(Path::new("a.jpeg"), jpeg), PathBuf::from("a.jpeg"));
        assert_eq!(output_path(Path::new("a"), jpeg), PathBuf::from("a.jpg"));
    }

    #[test]
    fn identity_edits_leave_pixels_untouched() {
        let mut src = RgbImage::new(3, 2);
        for (i, px) in src.pixels_mut().enumerate() {
            *px = image::Rgb([i as u8 * 40, 255 - i as u8 * 30, 7]);
        }
        let out = render_edits(src.clone(), Orientation::default(), Modifiers::default());
        assert_eq!(out, src);
    }

    #[test]
    fn rotation_applies_before_modifiers() {
        let src = RgbImage::from_raw(2, 1, vec![100, 0, 0, 0, 0, 100]).unwrap();
        let mut modifiers = Modifiers::default();
        modifiers.set_contrast(2.0);
        let out = render_edits(src, Orientation::new(1, false, false), modifiers);
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0).0, [200, 0, 0]);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 200]);
    }
}

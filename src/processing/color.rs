use image::RgbImage;
use palette::{FromColor, Hsv, RgbHue, Srgb};

/// Scale every channel by `factor`, clamped to `0..=255`.
pub fn adjust_contrast(buf: &mut RgbImage, factor: f32) {
    for value in buf.iter_mut() {
        *value = (f32::from(*value) * factor).clamp(0.0, 255.0) as u8;
    }
}

/// Scale HSV saturation of every pixel by `factor`, clamped to `0..=1`.
pub fn adjust_saturation(buf: &mut RgbImage, factor: f32) {
    for pixel in buf.pixels_mut() {
        let mut hsv = to_hsv(pixel.0);
        hsv.saturation = (hsv.saturation * factor).clamp(0.0, 1.0);
        pixel.0 = from_hsv(hsv);
    }
}

/// Rotate the hue of every pixel by `degrees`.
pub fn shift_hue(buf: &mut RgbImage, degrees: f32) {
    for pixel in buf.pixels_mut() {
        let mut hsv = to_hsv(pixel.0);
        hsv.hue = RgbHue::from_degrees(hsv.hue.into_positive_degrees() + degrees);
        pixel.0 = from_hsv(hsv);
    }
}

fn to_hsv(rgb: [u8; 3]) -> Hsv {
    Hsv::from_color(Srgb::new(rgb[0], rgb[1], rgb[2]).into_format::<f32>())
}

fn from_hsv(hsv: Hsv) -> [u8; 3] {
    let srgb: Srgb = Srgb::from_color(hsv);
    let srgb: Srgb<u8> = srgb.into_format();
    [srgb.red, srgb.green, srgb.blue]
}

//! Geometric transforms over packed RGB buffers.
//!
//! Rotation is always applied before the flips. The preview corner order in
//! [`Orientation::corners`] is derived in the same order, so an exported file
//! matches what the viewer showed.

use image::RgbImage;

use super::orientation::Orientation;

const CHANNELS: usize = 3;

/// Mirror the image left-to-right in place.
pub fn flip_horizontal(buf: &mut RgbImage) {
    let width = buf.width() as usize;
    if width < 2 {
        return;
    }
    let row_len = width * CHANNELS;
    for row in buf.chunks_exact_mut(row_len) {
        for x in 0..width / 2 {
            let mirror = width - 1 - x;
            for c in 0..CHANNELS {
                row.swap(x * CHANNELS + c, mirror * CHANNELS + c);
            }
        }
    }
}

/// Mirror the image top-to-bottom in place.
pub fn flip_vertical(buf: &mut RgbImage) {
    let row_len = buf.width() as usize * CHANNELS;
    let height = buf.height() as usize;
    if row_len == 0 || height < 2 {
        return;
    }
    for y in 0..height / 2 {
        let mirror = height - 1 - y;
        let (head, tail) = buf.split_at_mut(mirror * row_len);
        head[y * row_len..(y + 1) * row_len].swap_with_slice(&mut tail[..row_len]);
    }
}

/// Rotate a quarter turn clockwise. The result is `height x width`.
pub fn rotate90_cw(buf: &RgbImage) -> RgbImage {
    let (width, height) = buf.dimensions();
    let mut out = RgbImage::new(height, width);
    for (x, y, pixel) in buf.enumerate_pixels() {
        out.put_pixel(height - 1 - y, x, *pixel);
    }
    out
}

/// Bake an orientation into the pixels: rotation first, then `flip_x`, then `flip_y`.
pub fn apply_orientation(orientation: Orientation, mut buf: RgbImage) -> RgbImage {
    for _ in 0..orientation.quadrant() {
        buf = rotate90_cw(&buf);
    }
    if orientation.flip_x {
        flip_horizontal(&mut buf);
    }
    if orientation.flip_y {
        flip_vertical(&mut buf);
    }
    buf
}

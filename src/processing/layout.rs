/// Largest size with the source aspect ratio whose longer side is at most
/// `max_dim`. Sources already within bounds are returned unchanged.
pub fn fit_within(src_w: u32, src_h: u32, max_dim: u32) -> (u32, u32) {
    let longest = src_w.max(src_h);
    if longest <= max_dim || max_dim == 0 {
        return (src_w, src_h);
    }
    let scale = max_dim as f32 / longest as f32;
    let w = (src_w as f32 * scale).round().clamp(1.0, max_dim as f32);
    let h = (src_h as f32 * scale).round().clamp(1.0, max_dim as f32);
    (w as u32, h as u32)
}

/// Uniform scale that fits `src` inside `canvas` without cropping.
pub fn contain_scale(canvas_w: u32, canvas_h: u32, src_w: u32, src_h: u32) -> f32 {
    let iw = src_w.max(1) as f32;
    let ih = src_h.max(1) as f32;
    let cw = canvas_w.max(1) as f32;
    let ch = canvas_h.max(1) as f32;
    let scale = (cw / iw).min(ch / ih).max(0.0);
    if scale.is_finite() { scale } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_sources_are_untouched() {
        assert_eq!(fit_within(640, 480, 1024), (640, 480));
        assert_eq!(fit_within(640, 480, 0), (640, 480));
    }

    #[test]
    fn longer_side_is_capped() {
        assert_eq!(fit_within(4000, 2000, 1000), (1000, 500));
        assert_eq!(fit_within(1500, 3000, 300), (150, 300));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn contain_scale_uses_tighter_axis() {
        assert!((contain_scale(1920, 1080, 1000, 1000) - 1.08).abs() < 1e-6);
        assert!((contain_scale(1920, 1080, 4000, 2000) - 0.48).abs() < 1e-6);
    }
}

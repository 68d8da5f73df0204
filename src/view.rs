//! Zoom, pan and free view angle, independent of per-image orientation.

use serde::Deserialize;

use crate::processing::layout::contain_scale;

/// Zoom curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct ZoomOptions {
    /// Zoom approaches but never drops below this value.
    pub floor: f32,
    /// Fraction of the distance to `floor` added or removed per step.
    pub step_divisor: f32,
}

impl Default for ZoomOptions {
    fn default() -> Self {
        Self {
            floor: 0.85,
            step_divisor: 10.0,
        }
    }
}

/// How the current image is placed in the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    zoom: f32,
    /// Offset in units of the fitted image size.
    translation: [f32; 2],
    /// Free rotation in radians, clockwise on screen.
    angle: f32,
    options: ZoomOptions,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(ZoomOptions::default())
    }
}

impl ViewState {
    pub fn new(options: ZoomOptions) -> Self {
        Self {
            zoom: 1.0,
            translation: [0.0, 0.0],
            angle: 0.0,
            options,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn translation(&self) -> [f32; 2] {
        self.translation
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn zoom_in(&mut self) {
        self.zoom += (self.zoom - self.options.floor) / self.options.step_divisor;
    }

    pub fn zoom_out(&mut self) {
        if self.zoom > self.options.floor {
            self.zoom -= (self.zoom - self.options.floor) / self.options.step_divisor;
        }
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.translation[0] += dx;
        self.translation[1] += dy;
    }

    pub fn rotate_view(&mut self, radians: f32) {
        self.angle = (self.angle + radians).rem_euclid(std::f32::consts::TAU);
    }

    /// Back to zoom 1, no pan, no view angle.
    pub fn reset(&mut self) {
        *self = Self::new(self.options);
    }

    /// Clip-space positions (`-1..=1`, y down) of the visual TL, TR, BR, BL
    /// corners for an image of `image_size` drawn in `viewport`.
    ///
    /// The image is fitted inside the viewport, scaled by the zoom, rotated
    /// about its centre by the view angle and then offset by the pan.
    pub fn screen_quad(&self, viewport: (u32, u32), image_size: (u32, u32)) -> [[f32; 2]; 4] {
        let (vw, vh) = (viewport.0.max(1) as f32, viewport.1.max(1) as f32);
        let fit = contain_scale(viewport.0, viewport.1, image_size.0, image_size.1);
        let fitted_w = image_size.0 as f32 * fit;
        let fitted_h = image_size.1 as f32 * fit;
        let offset = [self.translation[0] * fitted_w, self.translation[1] * fitted_h];
        let half_w = fitted_w * self.zoom / 2.0;
        let half_h = fitted_h * self.zoom / 2.0;
        let (cx, cy) = (vw / 2.0, vh / 2.0);
        let (sin, cos) = self.angle.sin_cos();

        [[-half_w, -half_h], [half_w, -half_h], [half_w, half_h], [-half_w, half_h]].map(
            |[x, y]| {
                let px = x * cos - y * sin + cx + offset[0];
                let py = x * sin + y * cos + cy + offset[1];
                [px / vw * 2.0 - 1.0, py / vh * 2.0 - 1.0]
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4
    }

    #[test]
    fn zoom_steps_follow_distance_to_floor() {
        let mut view = ViewState::default();
        view.zoom_in();
        assert!((view.zoom() - 1.015).abs() < 1e-6);
        view.reset();
        view.zoom_out();
        assert!((view.zoom() - 0.985).abs() < 1e-6);
        for _ in 0..500 {
            view.zoom_out();
        }
        assert!(view.zoom() >= 0.85);
    }

    #[test]
    fn reset_clears_pan_and_angle() {
        let mut view = ViewState::default();
        view.pan(0.25, -0.5);
        view.rotate_view(1.0);
        view.zoom_in();
        view.reset();
        assert_eq!(view, ViewState::default());
    }

    #[test]
    fn angle_wraps_into_one_turn() {
        let mut view = ViewState::default();
        view.rotate_view(-std::f32::consts::FRAC_PI_2);
        assert!((view.angle() - 3.0 * std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn fitted_quad_fills_the_limiting_axis() {
        let view = ViewState::default();
        let quad = view.screen_quad((200, 100), (400, 100));
        assert!(close(quad[0], [-1.0, -0.5]));
        assert!(close(quad[1], [1.0, -0.5]));
        assert!(close(quad[2], [1.0, 0.5]));
        assert!(close(quad[3], [-1.0, 0.5]));
    }

    #[test]
    fn pan_is_relative_to_fitted_size() {
        let mut view = ViewState::default();
        view.pan(0.5, 0.0);
        let quad = view.screen_quad((100, 100), (100, 100));
        assert!(close(quad[0], [0.0, -1.0]));
        assert!(close(quad[2], [2.0, 1.0]));
    }
}

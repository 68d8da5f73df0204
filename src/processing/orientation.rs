/// Texture-space coordinate of one quad corner, `[u, v]` in `0.0..=1.0`.
pub type Corner = [f32; 2];

/// Corner order for an untransformed image: top-left, top-right,
/// bottom-right, bottom-left.
pub const IDENTITY_CORNERS: [Corner; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Per-image orientation: clockwise quarter turns followed by optional flips.
///
/// The quad corner order used for preview is recomputed from this triple on
/// demand and is never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Orientation {
    quadrant: u8,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Orientation {
    pub fn new(quadrant: i32, flip_x: bool, flip_y: bool) -> Self {
        Self {
            quadrant: quadrant.rem_euclid(4) as u8,
            flip_x,
            flip_y,
        }
    }

    /// Number of clockwise quarter turns, always in `0..4`.
    pub fn quadrant(&self) -> u8 {
        self.quadrant
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Rotate the displayed image a quarter turn: clockwise for a positive
    /// `step`, counter-clockwise otherwise.
    ///
    /// Flips are applied after the rotation, so with exactly one flip active
    /// a visual clockwise turn is a counter-clockwise turn of the stored
    /// quadrant.
    pub fn rotate(&mut self, step: i32) {
        let mut dir = if step < 0 { -1 } else { 1 };
        if self.flip_x != self.flip_y {
            dir = -dir;
        }
        self.quadrant = (i32::from(self.quadrant) + dir).rem_euclid(4) as u8;
    }

    pub fn toggle_flip_x(&mut self) {
        self.flip_x = !self.flip_x;
    }

    pub fn toggle_flip_y(&mut self) {
        self.flip_y = !self.flip_y;
    }

    /// Whether width and height trade places once the orientation is applied.
    pub fn swaps_axes(&self) -> bool {
        self.quadrant % 2 == 1
    }

    pub fn oriented_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Texture coordinates sampled at the visual top-left, top-right,
    /// bottom-right and bottom-left corners.
    pub fn corners(&self) -> [Corner; 4] {
        let mut corners = IDENTITY_CORNERS;
        for _ in 0..self.quadrant {
            corners.rotate_right(1);
        }
        if self.flip_x {
            corners.swap(0, 1);
            corners.swap(2, 3);
        }
        if self.flip_y {
            corners.swap(0, 3);
            corners.swap(1, 2);
        }
        corners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::transform::apply_orientation;
    use image::{Rgb, RgbImage};

    fn all_orientations() -> impl Iterator<Item = Orientation> {
        (0..4).flat_map(|q| {
            [(false, false), (true, false), (false, true), (true, true)]
                .into_iter()
                .map(move |(fx, fy)| Orientation::new(q, fx, fy))
        })
    }

    fn texel(corner: Corner, width: u32, height: u32) -> (u32, u32) {
        (
            (corner[0] * (width - 1) as f32).round() as u32,
            (corner[1] * (height - 1) as f32).round() as u32,
        )
    }

    #[test]
    fn quadrant_is_normalised() {
        assert_eq!(Orientation::new(5, false, false).quadrant(), 1);
        assert_eq!(Orientation::new(-1, false, false).quadrant(), 3);
        assert_eq!(Orientation::new(-4, false, false).quadrant(), 0);
    }

    #[test]
    fn clockwise_turn_moves_bottom_left_to_top_left() {
        let mut o = Orientation::default();
        o.rotate(1);
        assert_eq!(o.quadrant(), 1);
        assert_eq!(o.corners()[0], [0.0, 1.0]);
        o.rotate(-1);
        assert!(o.is_identity());
        assert_eq!(o.corners(), IDENTITY_CORNERS);
    }

    #[test]
    fn corners_agree_with_baked_pixels() {
        let (width, height) = (3u32, 2u32);
        let source = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 7]));

        for orientation in all_orientations() {
            let baked = apply_orientation(orientation, source.clone());
            let (ow, oh) = baked.dimensions();
            assert_eq!((ow, oh), orientation.oriented_size(width, height));

            let visual = [(0, 0), (ow - 1, 0), (ow - 1, oh - 1), (0, oh - 1)];
            for (corner, (vx, vy)) in orientation.corners().into_iter().zip(visual) {
                let (tx, ty) = texel(corner, width, height);
                assert_eq!(
                    baked.get_pixel(vx, vy),
                    source.get_pixel(tx, ty),
                    "mismatch for {orientation:?}"
                );
            }
        }
    }

    #[test]
    fn visual_rotation_is_clockwise_even_when_flipped() {
        let (width, height) = (3u32, 2u32);
        let source = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]));

        for start in all_orientations() {
            let mut turned = start;
            turned.rotate(1);
            let before = apply_orientation(start, source.clone());
            let after = apply_orientation(turned, source.clone());
            assert_eq!(
                after,
                crate::processing::transform::rotate90_cw(&before),
                "rotate from {start:?}"
            );
        }
    }
}

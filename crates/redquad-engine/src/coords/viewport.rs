/// Viewport rectangle in framebuffer pixels.
///
/// `(x, y)` is the bottom-left corner, matching `glViewport`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport covering `(0, 0)`–`(width, height)`.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Converts to a top-left-origin rect clamped to a `target_w × target_h`
    /// framebuffer, as `(x, y, w, h)`.
    ///
    /// Returns `None` when nothing of the viewport lies on the target.
    pub fn to_top_left(self, target_w: u32, target_h: u32) -> Option<(u32, u32, u32, u32)> {
        let left = i64::from(self.x);
        let bottom = i64::from(self.y);
        let right = left + i64::from(self.width);
        let top = bottom + i64::from(self.height);

        let tw = i64::from(target_w);
        let th = i64::from(target_h);

        let x0 = left.clamp(0, tw);
        let x1 = right.clamp(0, tw);
        let y0 = bottom.clamp(0, th);
        let y1 = top.clamp(0, th);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        // Flip: GL rows count up from the bottom, wgpu rows count down from the top.
        let flipped_y = th - y1;
        Some((x0 as u32, flipped_y as u32, (x1 - x0) as u32, (y1 - y0) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_maps_to_itself() {
        assert_eq!(Viewport::full(800, 800).to_top_left(800, 800), Some((0, 0, 800, 800)));
    }

    #[test]
    fn non_square_viewport_is_not_corrected() {
        assert_eq!(Viewport::full(1024, 768).to_top_left(1024, 768), Some((0, 0, 1024, 768)));
    }

    #[test]
    fn bottom_origin_is_flipped() {
        // Lower-left quarter of a 100x100 target.
        let vp = Viewport::new(0, 0, 50, 50);
        assert_eq!(vp.to_top_left(100, 100), Some((0, 50, 50, 50)));
    }

    #[test]
    fn oversized_viewport_is_clamped() {
        let vp = Viewport::full(2000, 2000);
        assert_eq!(vp.to_top_left(640, 480), Some((0, 0, 640, 480)));
    }

    #[test]
    fn negative_origin_is_clamped() {
        let vp = Viewport::new(-10, -10, 30, 30);
        assert_eq!(vp.to_top_left(100, 100), Some((0, 80, 20, 20)));
    }

    #[test]
    fn off_target_viewport_is_none() {
        assert_eq!(Viewport::new(200, 0, 10, 10).to_top_left(100, 100), None);
        assert_eq!(Viewport::full(0, 10).to_top_left(100, 100), None);
    }
}

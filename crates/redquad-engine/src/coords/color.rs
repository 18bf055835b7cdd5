/// Straight-alpha RGBA colour.
///
/// Used for clear colours. The surface may be sRGB; conversion happens in
/// the swapchain, so pure black and pure primaries are unaffected.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_is_opaque() {
        assert_eq!(ColorRgba::black(), ColorRgba::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(ColorRgba::black().to_wgpu(), wgpu::Color::BLACK);
    }

    #[test]
    fn nan_is_not_finite() {
        assert!(ColorRgba::new(0.2, 0.4, 0.6, 1.0).is_finite());
        assert!(!ColorRgba::new(f32::NAN, 0.0, 0.0, 1.0).is_finite());
    }
}

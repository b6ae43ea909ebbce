// src/color.rs
use bevy_color::{ColorToComponents, LinearRgba, Srgba};

/// Solid sRGB color for scene accents, connection lines and the clear color.
///
/// Stored in sRGB space because that is how the palette is authored; all
/// conversions to the linear space the GPU blends in go through `bevy_color`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    srgba: Srgba,
}

impl Color {
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.srgba.alpha = alpha;
        self
    }

    /// Linear-space RGBA components, the format vertex/instance buffers carry.
    pub fn into_linear_rgba(self) -> [f32; 4] {
        LinearRgba::from(self.srgba).to_f32_array()
    }

    /// Linear-space clear color for a render pass.
    pub fn into_linear_wgpu_color(self) -> wgpu::Color {
        let linear = LinearRgba::from(self.srgba);
        wgpu::Color {
            r: linear.red as f64,
            g: linear.green as f64,
            b: linear.blue as f64,
            a: linear.alpha as f64,
        }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((red, green, blue): (u8, u8, u8)) -> Self {
        Self {
            srgba: Srgba::rgb_u8(red, green, blue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_is_identity_in_linear_space() {
        let rgba = Color::from((255, 255, 255)).into_linear_rgba();
        for channel in rgba {
            assert!((channel - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn alpha_passes_through_untouched() {
        let rgba = Color::from((0, 217, 255)).with_alpha(0.3).into_linear_rgba();
        assert!((rgba[3] - 0.3).abs() < 1e-6);
    }

    #[test]
    fn mid_gray_gains_from_srgb_decode() {
        // sRGB 128 decodes to roughly 0.216 linear, not 0.5.
        let rgba = Color::from((128, 128, 128)).into_linear_rgba();
        assert!((rgba[0] - 0.2158).abs() < 1e-3);
    }
}

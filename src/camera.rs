// src/camera.rs
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};

/// Camera uniform uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub needs_srgb_output_conversion: u32, // 0 for false, 1 for true
    pub _padding: [u32; 3],                // pad to a 16-byte boundary (80 bytes total)
}

/// Fixed pixel-space projection for the particle field.
///
/// The scene lives in surface pixel coordinates with the origin at the
/// top-left and y growing downward, so node positions and pointer positions
/// share one coordinate system. The projection maps `[0, w] x [0, h]`
/// straight to NDC; there is no pan or zoom.
#[derive(Debug)]
pub struct Camera {
    pub viewport_size: Vec2,
}

impl Camera {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_size: Vec2::new(
                viewport_width.max(1) as f32,
                viewport_height.max(1) as f32,
            ),
        }
    }

    /// Called when the surface is reconfigured.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.viewport_size = Vec2::new(width as f32, height as f32);
        }
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        // Top-left origin, y down: left = 0, right = w, bottom = h, top = 0.
        // Depth is unused in a flat scene; any finite near/far works.
        Mat4::orthographic_rh(
            0.0,
            self.viewport_size.x,
            self.viewport_size.y,
            0.0,
            -100.0,
            100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn project(camera: &Camera, point: Vec2) -> Vec2 {
        let clip = camera.build_view_projection_matrix() * Vec4::new(point.x, point.y, 0.0, 1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }

    #[test]
    fn corners_map_to_ndc_corners() {
        let camera = Camera::new(800, 600);

        let top_left = project(&camera, Vec2::ZERO);
        assert!((top_left.x - -1.0).abs() < 1e-5);
        assert!((top_left.y - 1.0).abs() < 1e-5);

        let bottom_right = project(&camera, Vec2::new(800.0, 600.0));
        assert!((bottom_right.x - 1.0).abs() < 1e-5);
        assert!((bottom_right.y - -1.0).abs() < 1e-5);
    }

    #[test]
    fn center_maps_to_origin() {
        let camera = Camera::new(640, 480);
        let center = project(&camera, Vec2::new(320.0, 240.0));
        assert!(center.x.abs() < 1e-5);
        assert!(center.y.abs() < 1e-5);
    }

    #[test]
    fn resize_ignores_zero_dimensions() {
        let mut camera = Camera::new(800, 600);
        camera.resize(0, 0);
        assert_eq!(camera.viewport_size, Vec2::new(800.0, 600.0));

        camera.resize(1024, 768);
        assert_eq!(camera.viewport_size, Vec2::new(1024.0, 768.0));
    }
}

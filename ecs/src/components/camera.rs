//! Camera component.

use lantern_core::math::{Mat4, orthographic_rh, perspective_rh};

/// Projection mode for cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection for 3D scenes.
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        near: f32,
        far: f32,
    },
    /// Orthographic projection for 2D views.
    Orthographic {
        /// Full height of the view in world units.
        size: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl Projection {
    /// Computes the projection matrix for the given aspect ratio.
    pub fn compute_matrix(&self, aspect_ratio: f32) -> Mat4 {
        match *self {
            Self::Perspective { fov_y, near, far } => perspective_rh(fov_y, aspect_ratio, near, far),
            Self::Orthographic { size, near, far } => {
                let half_h = size * 0.5;
                let half_w = half_h * aspect_ratio;
                orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }
}

/// A viewpoint. The scene renders through the first camera flagged
/// `primary`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraComponent {
    pub projection: Projection,
    pub primary: bool,
    /// When set, viewport resizes leave `aspect_ratio` alone.
    pub fixed_aspect_ratio: bool,
    pub aspect_ratio: f32,
}

impl Default for CameraComponent {
    fn default() -> Self {
        Self {
            projection: Projection::default(),
            primary: true,
            fixed_aspect_ratio: false,
            aspect_ratio: 16.0 / 9.0,
        }
    }
}

impl CameraComponent {
    pub fn orthographic(size: f32) -> Self {
        Self {
            projection: Projection::Orthographic {
                size,
                near: -1.0,
                far: 1.0,
            },
            ..Self::default()
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.compute_matrix(self.aspect_ratio)
    }

    /// Updates the aspect ratio from a viewport size, unless fixed.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if self.fixed_aspect_ratio || height == 0 {
            return;
        }
        self.aspect_ratio = width as f32 / height as f32;
    }
}

//! Tunables for the physics bridges and the render dispatcher.
//!
//! Every settings type has a usable `Default`. Hosts that keep settings on
//! disk load them with [`SceneSettings::from_ron`]; missing fields fall back
//! to the defaults.

use lantern_core::math::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings2D {
    pub gravity: Vec2,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    pub max_bodies: usize,
}

impl Default for PhysicsSettings2D {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.8),
            velocity_iterations: 6,
            position_iterations: 2,
            max_bodies: 65536,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings3D {
    pub gravity: Vec3,
    pub max_bodies: usize,
    /// Upper bound on the substeps one `step(dt)` is split into.
    pub max_substeps: usize,
}

impl Default for PhysicsSettings3D {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            max_bodies: 65536,
            max_substeps: 8,
        }
    }
}

impl PhysicsSettings3D {
    /// Number of equal substeps for a frame of `dt` seconds: one per started
    /// 1/60 s, clamped to `[1, max_substeps]`.
    ///
    /// Substeps stay within 1/60 s only while `dt <= max_substeps / 60`.
    /// Longer frames hit the cap and each substep grows to
    /// `dt / max_substeps`.
    pub fn substeps_for(&self, dt: f32) -> usize {
        // Tolerance keeps 1/30 from rounding up to three substeps.
        let wanted = (dt * 60.0 - 1e-3).ceil();
        let wanted = if wanted.is_finite() && wanted > 1.0 {
            wanted as usize
        } else {
            1
        };
        wanted.clamp(1, self.max_substeps.max(1))
    }
}

/// View-space depth range covered by one shadow cascade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeSplit {
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Distinct materials that may be batched in one frame.
    pub max_batches: usize,
    pub shadow_cascades: Vec<CascadeSplit>,
    /// Distance where shadows start fading out.
    pub shadow_fadeout_start: f32,
    pub shadow_fadeout_end: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            max_batches: 32,
            shadow_cascades: vec![
                CascadeSplit { near: -2.0, far: 40.0 },
                CascadeSplit { near: -6.0, far: 100.0 },
                CascadeSplit { near: -15.0, far: 210.0 },
                CascadeSplit { near: -50.0, far: 450.0 },
            ],
            shadow_fadeout_start: 400.0,
            shadow_fadeout_end: 450.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub physics_2d: PhysicsSettings2D,
    pub physics_3d: PhysicsSettings3D,
    pub renderer: RendererSettings,
}

impl SceneSettings {
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

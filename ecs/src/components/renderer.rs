use lantern_core::Uuid;
use lantern_core::math::Vec4;

/// Draws a mesh asset with a material asset.
///
/// Both are references resolved every frame, so reloading an asset needs no
/// component change. `instanced` opts into per-material batching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeshRendererComponent {
    pub mesh: Uuid,
    pub material: Uuid,
    pub instanced: bool,
}

impl MeshRendererComponent {
    pub fn new(mesh: Uuid, material: Uuid) -> Self {
        Self {
            mesh,
            material,
            instanced: false,
        }
    }

    #[must_use]
    pub fn instanced(mut self) -> Self {
        self.instanced = true;
        self
    }
}

/// Draws a textured or flat-colored quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteRendererComponent {
    pub color: Vec4,
    /// [`Uuid::NIL`] draws a flat color.
    pub texture: Uuid,
    pub tiling_factor: f32,
}

impl Default for SpriteRendererComponent {
    fn default() -> Self {
        Self {
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            texture: Uuid::NIL,
            tiling_factor: 1.0,
        }
    }
}

impl SpriteRendererComponent {
    pub fn from_color(color: Vec4) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }
}

use lantern_core::math::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub cast_shadows: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.0, 1.0, 1.0),
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            cast_shadows: true,
        }
    }
}

/// Point light. Its position is the owning entity's world translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub cast_shadows: bool,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::new(1.0, 1.0, 1.0),
            intensity: 1.0,
            radius: 5.0,
            cast_shadows: false,
        }
    }
}

/// A light source attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightComponent {
    Directional(DirectionalLight),
    Point(PointLight),
}

impl LightComponent {
    pub fn casts_shadows(&self) -> bool {
        match self {
            Self::Directional(l) => l.cast_shadows,
            Self::Point(l) => l.cast_shadows,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Self::Directional(l) => l.intensity,
            Self::Point(l) => l.intensity,
        }
    }
}

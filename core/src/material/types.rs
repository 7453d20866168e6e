use serde::{Deserialize, Serialize};

use crate::math::{Mat4, Vec3, Vec4};
use crate::uuid::Uuid;

/// A typed uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
    /// Texture asset bound to a sampler slot.
    Texture(Uuid),
}

/// A named uniform, e.g. `u_AmbientLightColor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderUniform {
    pub name: String,
    pub value: UniformValue,
}

impl ShaderUniform {
    pub fn new(name: impl Into<String>, value: UniformValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Render material.
///
/// Batching keys on [`Material::id`], so two meshes drawn with the same
/// material id share a batch even when resolved through different handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: Uuid,
    pub name: String,
    pub uniforms: Vec<ShaderUniform>,
}

impl Material {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            uniforms: Vec::new(),
        }
    }

    /// Sets a uniform, replacing any previous value with the same name.
    #[must_use]
    pub fn with_uniform(mut self, name: impl Into<String>, value: UniformValue) -> Self {
        self.set_uniform(name, value);
        self
    }

    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.uniforms.iter_mut().find(|u| u.name == name) {
            Some(existing) => existing.value = value,
            None => self.uniforms.push(ShaderUniform { name, value }),
        }
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.iter().find(|u| u.name == name).map(|u| &u.value)
    }
}

/// Surface properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Impact speed below which collisions do not bounce (2D only).
    pub restitution_threshold: f32,
}

impl PhysicsMaterial {
    /// Used whenever a collider has no material or its material is missing.
    pub const DEFAULT: PhysicsMaterial = PhysicsMaterial {
        density: 1.0,
        friction: 0.5,
        restitution: 0.0,
        restitution_threshold: 0.5,
    };

    #[must_use]
    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    #[must_use]
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    #[must_use]
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self::DEFAULT
    }
}

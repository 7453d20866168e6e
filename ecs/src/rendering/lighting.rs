//! Scene lights and the uniforms they feed.

use lantern_core::material::{ShaderUniform, UniformValue};
use lantern_core::math::{Mat4, Vec3, look_at_rh, orthographic_rh};

use crate::components::{DirectionalLight, PointLight};
use crate::settings::CascadeSplit;

/// A light resolved for one frame. Point lights carry their world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneLight {
    Directional(DirectionalLight),
    Point { light: PointLight, position: Vec3 },
}

impl SceneLight {
    /// Zero-intensity light bound when a scene has no directional light, so
    /// the shader never reads a stale one.
    pub fn placeholder() -> Self {
        Self::Directional(DirectionalLight {
            intensity: 0.0,
            cast_shadows: false,
            ..DirectionalLight::default()
        })
    }
}

/// Builds `u_DirectionalLight*` from the last directional light and one
/// `u_PointLights[i].*` group per point light.
pub fn light_uniforms(lights: &[SceneLight]) -> Vec<ShaderUniform> {
    let mut uniforms: Vec<ShaderUniform> = Vec::new();
    let mut point_index = 0;

    for light in lights {
        match light {
            SceneLight::Directional(l) => {
                uniforms.retain(|u| !u.name.starts_with("u_DirectionalLight"));
                uniforms.push(ShaderUniform::new("u_DirectionalLightDir", UniformValue::Vec3(l.direction)));
                uniforms.push(ShaderUniform::new("u_DirectionalLightCol", UniformValue::Vec3(l.color)));
                uniforms.push(ShaderUniform::new(
                    "u_DirectionalLightIntensity",
                    UniformValue::Float(l.intensity),
                ));
            }
            SceneLight::Point { light, position } => {
                let prefix = format!("u_PointLights[{point_index}]");
                uniforms.push(ShaderUniform::new(format!("{prefix}.Color"), UniformValue::Vec3(light.color)));
                uniforms.push(ShaderUniform::new(format!("{prefix}.Position"), UniformValue::Vec3(*position)));
                uniforms.push(ShaderUniform::new(
                    format!("{prefix}.Intensity"),
                    UniformValue::Float(light.intensity),
                ));
                uniforms.push(ShaderUniform::new(format!("{prefix}.Radius"), UniformValue::Float(light.radius)));
                point_index += 1;
            }
        }
    }
    uniforms
}

/// View and projection of one shadow cascade.
///
/// The light looks along `direction` at `focus`; the cascade covers an
/// orthographic box of half-size `split.far` around it, with depth from
/// `split.near` to twice `split.far`.
pub fn cascade_matrices(focus: Vec3, direction: Vec3, split: &CascadeSplit) -> (Mat4, Mat4) {
    let dir = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| -Vec3::y());
    let up = if dir.cross(&Vec3::y()).norm_squared() < 1e-6 {
        Vec3::z()
    } else {
        Vec3::y()
    };
    let extent = split.far.abs().max(f32::EPSILON);
    let eye = focus - dir * extent;
    let view = look_at_rh(eye, focus, up);
    let projection = orthographic_rh(-extent, extent, -extent, extent, split.near, extent * 2.0);
    (view, projection)
}

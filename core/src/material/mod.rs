//! Material and physics-material definitions.
//!
//! - [`Material`] - Render material: an identity plus named shader uniforms
//! - [`ShaderUniform`] / [`UniformValue`] - A named, typed uniform value
//! - [`PhysicsMaterial`] - Surface properties used when building colliders

mod types;

pub use types::{Material, PhysicsMaterial, ShaderUniform, UniformValue};

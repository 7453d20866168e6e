//! 3D rigidbody and collider components.
//!
//! The first collider of an entity decides where the native body's origin
//! sits: at that collider's center, `pivot + R * (scale * offset)`. The
//! scaled offset is kept on the rigidbody while the simulation runs so
//! write-back can recover the entity pivot from the body position.

use lantern_core::Uuid;
use lantern_core::material::PhysicsMaterial;
use lantern_core::math::Vec3;
use lantern_core::mesh::Mesh;
use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

use super::BodyType;

/// A 3D rigidbody. One per entity.
#[derive(Debug, PartialEq)]
pub struct Rigidbody3DComponent {
    pub body_type: BodyType,
    /// Total mass spread over the colliders. Zero or less uses the
    /// material densities instead.
    pub mass: f32,
    pub gravity_factor: f32,
    pub(crate) runtime_body: Option<RigidBodyHandle>,
    pub(crate) shape_offset: Vec3,
}

impl Rigidbody3DComponent {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            mass: 1.0,
            gravity_factor: 1.0,
            runtime_body: None,
            shape_offset: Vec3::zeros(),
        }
    }

    pub fn dynamic() -> Self {
        Self::new(BodyType::Dynamic)
    }

    pub fn fixed() -> Self {
        Self::new(BodyType::Static)
    }

    pub fn kinematic() -> Self {
        Self::new(BodyType::Kinematic)
    }

    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    #[must_use]
    pub fn with_gravity_factor(mut self, factor: f32) -> Self {
        self.gravity_factor = factor;
        self
    }

    pub fn runtime_body(&self) -> Option<RigidBodyHandle> {
        self.runtime_body
    }

    /// Body origin relative to the entity pivot, in the body's frame.
    pub fn shape_offset(&self) -> Vec3 {
        self.shape_offset
    }

    pub(crate) fn to_rigid_body(&self, body_type: BodyType, origin: Vec3, scaled_axis: Vec3) -> RigidBody {
        let builder = match body_type {
            BodyType::Static => RigidBodyBuilder::fixed(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
            BodyType::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        builder
            .translation(Vector::new(origin.x, origin.y, origin.z))
            .rotation(Vector::new(scaled_axis.x, scaled_axis.y, scaled_axis.z))
            .gravity_scale(self.gravity_factor)
            .build()
    }
}

impl Default for Rigidbody3DComponent {
    fn default() -> Self {
        Self::new(BodyType::Static)
    }
}

impl Clone for Rigidbody3DComponent {
    fn clone(&self) -> Self {
        Self {
            body_type: self.body_type,
            mass: self.mass,
            gravity_factor: self.gravity_factor,
            runtime_body: None,
            shape_offset: Vec3::zeros(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all_fields = "PascalCase")]
pub enum ColliderShape3D {
    /// Box of full `size`, scaled per axis.
    Box { size: Vec3 },
    /// Sphere scaled by the largest scale component.
    Sphere { radius: f32 },
    /// Triangle mesh asset. Forces the body to be static.
    Mesh { mesh: Uuid },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Collider3D {
    pub shape: ColliderShape3D,
    pub offset: Vec3,
    #[serde(default)]
    pub material: Uuid,
}

impl Collider3D {
    pub fn cuboid(size: Vec3) -> Self {
        Self::from_shape(ColliderShape3D::Box { size })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::from_shape(ColliderShape3D::Sphere { radius })
    }

    pub fn mesh(mesh: Uuid) -> Self {
        Self::from_shape(ColliderShape3D::Mesh { mesh })
    }

    fn from_shape(shape: ColliderShape3D) -> Self {
        Self {
            shape,
            offset: Vec3::zeros(),
            material: Uuid::NIL,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: Uuid) -> Self {
        self.material = material;
        self
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.shape, ColliderShape3D::Mesh { .. })
    }

    /// Builds a rapier collider positioned at `local_translation` in the
    /// body frame. `mesh` must be the resolved asset for mesh shapes.
    ///
    /// `mass` overrides the material density when given.
    pub(crate) fn to_collider(
        &self,
        scale: Vec3,
        local_translation: Vec3,
        mesh: Option<&Mesh>,
        material: &PhysicsMaterial,
        mass: Option<f32>,
    ) -> Option<Collider> {
        let builder = match &self.shape {
            ColliderShape3D::Box { size } => {
                let half = size.component_mul(&scale).abs() * 0.5;
                ColliderBuilder::cuboid(half.x, half.y, half.z)
            }
            ColliderShape3D::Sphere { radius } => ColliderBuilder::ball(radius * scale.abs().max()),
            ColliderShape3D::Mesh { .. } => {
                let mesh = mesh?;
                let vertices = (0..mesh.vertex_count())
                    .filter_map(|i| mesh.position(i))
                    .map(|p| Vector::new(p[0] * scale.x, p[1] * scale.y, p[2] * scale.z))
                    .collect();
                let indices = mesh.triangles().collect();
                match ColliderBuilder::trimesh(vertices, indices) {
                    Ok(builder) => builder,
                    Err(err) => {
                        log::warn!("mesh collider {} rejected by rapier: {err:?}", mesh.id);
                        return None;
                    }
                }
            }
        };

        let builder = builder
            .translation(Vector::new(local_translation.x, local_translation.y, local_translation.z))
            .friction(material.friction)
            .restitution(material.restitution);
        let builder = match mass {
            Some(mass) => builder.mass(mass),
            None => builder.density(material.density),
        };
        Some(builder.build())
    }
}

impl Default for Collider3D {
    fn default() -> Self {
        Self::cuboid(Vec3::new(1.0, 1.0, 1.0))
    }
}

/// Every collider layered onto the entity's 3D body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider3DComponent {
    pub colliders: Vec<Collider3D>,
}

impl Collider3DComponent {
    pub fn new(collider: Collider3D) -> Self {
        Self {
            colliders: vec![collider],
        }
    }

    #[must_use]
    pub fn with(mut self, collider: Collider3D) -> Self {
        self.colliders.push(collider);
        self
    }

    /// Offset of the collider that anchors the body origin.
    pub fn anchor_offset(&self) -> Vec3 {
        self.colliders.first().map_or_else(Vec3::zeros, |c| c.offset)
    }

    pub fn has_mesh(&self) -> bool {
        self.colliders.iter().any(Collider3D::is_mesh)
    }
}

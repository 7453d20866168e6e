//! 2D rigidbody and collider components.
//!
//! Components are pure descriptors authored in edit mode. The
//! [`PhysicsBridge2D`](super::PhysicsBridge2D) turns them into rapier
//! objects at runtime start and clears [`Rigidbody2DComponent::runtime_body`]
//! at runtime stop.

use lantern_core::Uuid;
use lantern_core::material::PhysicsMaterial;
use lantern_core::math::{Vec2, Vec3, triangulate_polygon};
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::BodyType;

/// A 2D rigidbody. One per entity.
#[derive(Debug, PartialEq)]
pub struct Rigidbody2DComponent {
    pub body_type: BodyType,
    pub fixed_rotation: bool,
    pub(crate) runtime_body: Option<RigidBodyHandle>,
}

impl Rigidbody2DComponent {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            fixed_rotation: false,
            runtime_body: None,
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
    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Native body handle while the simulation runs.
    pub fn runtime_body(&self) -> Option<RigidBodyHandle> {
        self.runtime_body
    }

    pub(crate) fn to_rigid_body(&self, translation: Vec2, angle: f32) -> RigidBody {
        let builder = match self.body_type {
            BodyType::Static => RigidBodyBuilder::fixed(),
            BodyType::Dynamic => RigidBodyBuilder::dynamic(),
            BodyType::Kinematic => RigidBodyBuilder::kinematic_position_based(),
        };
        let builder = builder
            .translation(Vector::new(translation.x, translation.y))
            .rotation(angle);
        if self.fixed_rotation {
            builder.lock_rotations().build()
        } else {
            builder.build()
        }
    }
}

impl Default for Rigidbody2DComponent {
    fn default() -> Self {
        Self::new(BodyType::Static)
    }
}

/// Copies never share a native body.
impl Clone for Rigidbody2DComponent {
    fn clone(&self) -> Self {
        Self {
            body_type: self.body_type,
            fixed_rotation: self.fixed_rotation,
            runtime_body: None,
        }
    }
}

/// Geometry of one 2D collider, in the entity's local space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all_fields = "PascalCase")]
pub enum ColliderShape2D {
    /// Axis-aligned box of full `size`, scaled by the entity scale.
    Box { size: Vec2 },
    /// Circle of `radius`, scaled by the larger of the X/Y scales.
    Circle { radius: f32 },
    /// Simple polygon in either winding; triangulated at body creation.
    Polygon { points: Vec<Vec2> },
}

/// One collider shape plus its placement and physics material.
///
/// The material is referenced by id and resolved when the body is built,
/// so it may be authored before the asset exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Collider2D {
    pub shape: ColliderShape2D,
    pub offset: Vec2,
    #[serde(default)]
    pub material: Uuid,
}

impl Collider2D {
    pub fn rect(size: Vec2) -> Self {
        Self::from_shape(ColliderShape2D::Box { size })
    }

    pub fn circle(radius: f32) -> Self {
        Self::from_shape(ColliderShape2D::Circle { radius })
    }

    pub fn polygon(points: Vec<Vec2>) -> Self {
        Self::from_shape(ColliderShape2D::Polygon { points })
    }

    fn from_shape(shape: ColliderShape2D) -> Self {
        Self {
            shape,
            offset: Vec2::zeros(),
            material: Uuid::NIL,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: Uuid) -> Self {
        self.material = material;
        self
    }

    /// Builds the rapier collider for an entity with the given world scale.
    ///
    /// Returns `None` for shapes with no area, e.g. a polygon that
    /// triangulates to nothing.
    pub(crate) fn to_collider(&self, scale: Vec3, material: &PhysicsMaterial) -> Option<Collider> {
        let builder = match &self.shape {
            ColliderShape2D::Box { size } => {
                let hx = (size.x * scale.x * 0.5).abs();
                let hy = (size.y * scale.y * 0.5).abs();
                ColliderBuilder::cuboid(hx, hy)
                    .translation(Vector::new(self.offset.x * scale.x, self.offset.y * scale.y))
            }
            ColliderShape2D::Circle { radius } => {
                let s = scale.x.abs().max(scale.y.abs());
                ColliderBuilder::ball(radius * s)
                    .translation(Vector::new(self.offset.x * scale.x, self.offset.y * scale.y))
            }
            ColliderShape2D::Polygon { points } => {
                let triangles = triangulate_polygon(points);
                if triangles.is_empty() {
                    return None;
                }
                let vertices = points
                    .iter()
                    .map(|p| Vector::new((p.x + self.offset.x) * scale.x, (p.y + self.offset.y) * scale.y))
                    .collect();
                let indices = triangles
                    .iter()
                    .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
                    .collect();
                match ColliderBuilder::trimesh(vertices, indices) {
                    Ok(builder) => builder,
                    Err(err) => {
                        log::warn!("polygon collider rejected by rapier: {err:?}");
                        return None;
                    }
                }
            }
        };

        Some(
            builder
                .density(material.density)
                .friction(material.friction)
                .restitution(material.restitution)
                .build(),
        )
    }
}

impl Default for Collider2D {
    fn default() -> Self {
        Self::rect(Vec2::new(1.0, 1.0))
    }
}

/// Every collider layered onto the entity's 2D body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider2DComponent {
    pub colliders: Vec<Collider2D>,
}

impl Collider2DComponent {
    pub fn new(collider: Collider2D) -> Self {
        Self {
            colliders: vec![collider],
        }
    }

    #[must_use]
    pub fn with(mut self, collider: Collider2D) -> Self {
        self.colliders.push(collider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Vec3 {
        Vec3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn rigidbody_constructors() {
        assert_eq!(Rigidbody2DComponent::default().body_type, BodyType::Static);
        assert_eq!(Rigidbody2DComponent::dynamic().body_type, BodyType::Dynamic);
        assert_eq!(Rigidbody2DComponent::kinematic().body_type, BodyType::Kinematic);
        assert!(Rigidbody2DComponent::dynamic().with_fixed_rotation(true).fixed_rotation);
    }

    #[test]
    fn clone_drops_runtime_body() {
        let mut rb = Rigidbody2DComponent::dynamic();
        rb.runtime_body = Some(RigidBodyHandle::from_raw_parts(3, 0));
        let copy = rb.clone();
        assert!(copy.runtime_body().is_none());
        assert_eq!(copy.body_type, BodyType::Dynamic);
    }

    #[test]
    fn box_scales_with_entity() {
        let c = Collider2D::rect(Vec2::new(2.0, 4.0))
            .to_collider(Vec3::new(2.0, 0.5, 1.0), &PhysicsMaterial::DEFAULT)
            .unwrap();
        let cuboid = c.shape().as_cuboid().unwrap();
        assert!((cuboid.half_extents.x - 2.0).abs() < 1e-6);
        assert!((cuboid.half_extents.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn material_properties_are_applied() {
        let material = PhysicsMaterial::DEFAULT.with_friction(0.9).with_restitution(0.4);
        let c = Collider2D::circle(0.5).to_collider(unit(), &material).unwrap();
        assert_eq!(c.friction(), 0.9);
        assert_eq!(c.restitution(), 0.4);
    }

    #[test]
    fn degenerate_polygon_has_no_collider() {
        let line = Collider2D::polygon(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
        assert!(line.to_collider(unit(), &PhysicsMaterial::DEFAULT).is_none());
    }

    #[test]
    fn polygon_builds_collider() {
        let square = Collider2D::polygon(vec![
            Vec2::new(-0.5, -0.5),
            Vec2::new(0.5, -0.5),
            Vec2::new(0.5, 0.5),
            Vec2::new(-0.5, 0.5),
        ]);
        assert!(square.to_collider(unit(), &PhysicsMaterial::DEFAULT).is_some());
    }

    #[test]
    fn component_layers_colliders() {
        let c = Collider2DComponent::new(Collider2D::default()).with(Collider2D::circle(1.0));
        assert_eq!(c.colliders.len(), 2);
    }
}

//! Physics bridges between the scene and rapier.
//!
//! The 2D and 3D bridges are independent and share only the
//! [`PhysicsBridge`] lifecycle. Each bridge owns its rapier world; the scene
//! owns the authoritative transforms. A bridge builds native bodies from
//! rigidbody and collider components at runtime start, advances the native
//! world in [`PhysicsBridge::step`], and writes poses back in
//! [`PhysicsBridge::sync_transforms`].

pub mod components2d;
pub mod components3d;
pub mod physics2d;
pub mod physics3d;

pub use components2d::{Collider2D, Collider2DComponent, ColliderShape2D, Rigidbody2DComponent};
pub use components3d::{Collider3D, Collider3DComponent, ColliderShape3D, Rigidbody3DComponent};
pub use physics2d::PhysicsBridge2D;
pub use physics3d::PhysicsBridge3D;

use lantern_core::assets::AssetResolver;
use lantern_core::material::PhysicsMaterial;
use lantern_core::math::{Mat4, Vec3, compose_transform, decompose_transform};
use lantern_core::Uuid;
use serde::{Deserialize, Serialize};

use crate::components::TransformComponent;
use crate::hierarchy::{parent_world_matrix, world_matrix};
use crate::{Entity, World};

/// How a rigidbody takes part in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves; not written back.
    #[default]
    Static,
    Dynamic,
    /// Moved by the host, pushes dynamic bodies.
    Kinematic,
}

impl BodyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Static => "Static",
            Self::Dynamic => "Dynamic",
            Self::Kinematic => "Kinematic",
        }
    }

    /// Parses the textual tag; unknown values map to `Dynamic`.
    pub fn from_str_or_dynamic(s: &str) -> Self {
        match s {
            "Static" => Self::Static,
            "Kinematic" => Self::Kinematic,
            _ => Self::Dynamic,
        }
    }
}

/// Lifecycle of a bridge.
///
/// `Stopped -> Started` on runtime start, `Started -> Running` on the first
/// step, back to `Stopped` on runtime stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    #[default]
    Stopped,
    Started,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhysicsError {
    #[error("{bridge} physics is not running")]
    NotRunning { bridge: &'static str },
    #[error("{bridge} physics is already running")]
    AlreadyRunning { bridge: &'static str },
    #[error("{bridge} physics reached its limit of {max} bodies")]
    CapacityExceeded { bridge: &'static str, max: usize },
}

/// Narrow lifecycle shared by the 2D and 3D bridges.
pub trait PhysicsBridge {
    /// Creates one native body per rigidbody entity. Entities that cannot
    /// get a body are logged and skipped.
    fn on_runtime_start(
        &mut self,
        world: &mut World,
        assets: &dyn AssetResolver,
    ) -> Result<(), PhysicsError>;

    /// Advances the native world by `dt` seconds. Blocks until done.
    fn step(&mut self, dt: f32) -> Result<(), PhysicsError>;

    /// Copies native poses of non-static bodies into their transforms.
    fn sync_transforms(&mut self, world: &mut World);

    /// Destroys every native body and clears runtime handles. Safe to call
    /// when nothing was started.
    fn on_runtime_stop(&mut self, world: &mut World);

    /// Drops the native body of a destroyed entity, if it has one.
    fn remove_entity(&mut self, entity: Entity);

    fn state(&self) -> BridgeState;

    fn body_count(&self) -> usize;
}

/// Resolves a collider's physics material, falling back to
/// [`PhysicsMaterial::DEFAULT`] with a warning.
pub(crate) fn resolve_material(
    assets: &dyn AssetResolver,
    id: Uuid,
    entity: Entity,
) -> PhysicsMaterial {
    if id.is_nil() {
        return PhysicsMaterial::DEFAULT;
    }
    match assets.physics_material(id) {
        Some(material) => *material,
        None => {
            log::warn!("physics material {id} on {entity} not found, using defaults");
            PhysicsMaterial::DEFAULT
        }
    }
}

/// World-space translation, Euler rotation and scale of `entity`.
///
/// Falls back to the local pose when the world matrix is degenerate.
pub(crate) fn world_pose(world: &World, entity: Entity) -> Option<(Vec3, Vec3, Vec3)> {
    let transform = world.get::<TransformComponent>(entity)?;
    let pose = world_matrix(world, entity).as_ref().and_then(decompose_transform);
    Some(pose.unwrap_or_else(|| {
        log::warn!("{entity} has a degenerate world transform, using its local pose");
        (transform.translation, transform.rotation, transform.scale)
    }))
}

/// Writes a simulated world-space pose into `entity`'s local translation and
/// rotation. Scale is never touched.
///
/// Returns false and leaves the transform alone when the parent's world
/// matrix cannot be inverted or the result cannot be decomposed.
pub(crate) fn write_world_pose(
    world: &mut World,
    entity: Entity,
    translation: Vec3,
    rotation: Vec3,
    world_scale: Vec3,
) -> bool {
    let Some(parent) = world.get::<TransformComponent>(entity).map(|t| t.parent()) else {
        return false;
    };

    let local = match parent {
        None => Some((translation, rotation)),
        Some(_) => {
            let target: Mat4 = compose_transform(translation, rotation, world_scale);
            parent_world_matrix(world, entity)
                .try_inverse()
                .map(|inv| inv * target)
                .as_ref()
                .and_then(decompose_transform)
                .map(|(t, r, _)| (t, r))
        }
    };

    let Some((t, r)) = local else {
        log::warn!("physics write-back on {entity}: degenerate parent transform, pose kept");
        return false;
    };
    match world.get_mut::<TransformComponent>(entity) {
        Some(transform) => {
            transform.translation = t;
            transform.rotation = r;
            true
        }
        None => false,
    }
}

/// Converts a requested count into whatever integer type rapier uses for its
/// solver iteration fields, keeping `fallback` if it does not fit.
pub(crate) fn iteration_count<T: TryFrom<usize>>(value: usize, fallback: T) -> T {
    T::try_from(value.max(1)).unwrap_or(fallback)
}

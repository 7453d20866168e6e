//! 3D physics bridge.
//!
//! One native body per rigidbody entity, with every collider of the
//! entity's [`Collider3DComponent`] attached to it. The body origin is the
//! first collider's center, so write-back subtracts the rotated shape offset
//! to recover the entity pivot.

use std::collections::HashMap;

use lantern_core::assets::AssetResolver;
use lantern_core::math::{
    Vec3, euler_from_quat, quat_from_euler, quat_from_xyzw, quat_rotate_vec3, quat_to_scaled_axis,
};
use rapier3d::prelude::*;

use super::components3d::{Collider3DComponent, ColliderShape3D, Rigidbody3DComponent};
use super::{
    BodyType, BridgeState, PhysicsBridge, PhysicsError, resolve_material, world_pose,
    write_world_pose,
};
use crate::settings::PhysicsSettings3D;
use crate::{Entity, World};

const BRIDGE: &str = "3D";

#[derive(Debug, Clone, Copy)]
struct BodyLink {
    handle: RigidBodyHandle,
    body_type: BodyType,
    /// Scaled offset of the anchor collider, in the body frame.
    shape_offset: Vec3,
    scale: Vec3,
}

/// Owns the rapier 3D world for one scene.
pub struct PhysicsBridge3D {
    settings: PhysicsSettings3D,
    state: BridgeState,
    gravity: Vector,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    links: HashMap<Entity, BodyLink>,
    capacity_reported: bool,
}

impl PhysicsBridge3D {
    pub fn new(settings: PhysicsSettings3D) -> Self {
        Self {
            gravity: Vector::new(settings.gravity.x, settings.gravity.y, settings.gravity.z),
            settings,
            state: BridgeState::Stopped,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            links: HashMap::new(),
            capacity_reported: false,
        }
    }

    pub fn settings(&self) -> &PhysicsSettings3D {
        &self.settings
    }

    pub fn body(&self, entity: Entity) -> Option<&RigidBody> {
        self.bodies.get(self.links.get(&entity)?.handle)
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    fn create_body(
        &mut self,
        world: &World,
        assets: &dyn AssetResolver,
        entity: Entity,
    ) -> Result<Option<(RigidBodyHandle, Vec3)>, PhysicsError> {
        if self.links.len() >= self.settings.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                bridge: BRIDGE,
                max: self.settings.max_bodies,
            });
        }
        let Some(rb) = world.get::<Rigidbody3DComponent>(entity) else {
            return Ok(None);
        };
        let Some((pivot, rotation, scale)) = world_pose(world, entity) else {
            log::warn!("{entity} has a 3D rigidbody but no transform, skipped");
            return Ok(None);
        };
        let colliders = world.get::<Collider3DComponent>(entity);

        let mut body_type = rb.body_type;
        if body_type != BodyType::Static && colliders.is_some_and(Collider3DComponent::has_mesh) {
            log::warn!("{entity}: mesh colliders are static only, body made static");
            body_type = BodyType::Static;
        }

        let anchor = colliders.map_or_else(Vec3::zeros, Collider3DComponent::anchor_offset);
        let shape_offset = anchor.component_mul(&scale);
        let q = quat_from_euler(rotation);
        let origin = pivot + quat_rotate_vec3(&q, shape_offset);

        let handle = self
            .bodies
            .insert(rb.to_rigid_body(body_type, origin, quat_to_scaled_axis(&q)));

        if let Some(colliders) = colliders {
            let count = colliders.colliders.len();
            let mass = (rb.mass > 0.0 && count > 0).then(|| rb.mass / count as f32);
            for collider in &colliders.colliders {
                let material = resolve_material(assets, collider.material, entity);
                let mesh = match collider.shape {
                    ColliderShape3D::Mesh { mesh } => match assets.mesh(mesh) {
                        Some(mesh) => Some(mesh),
                        None => {
                            log::warn!("{entity}: collider mesh {mesh} not found, collider skipped");
                            continue;
                        }
                    },
                    _ => None,
                };
                let local = collider.offset.component_mul(&scale) - shape_offset;
                match collider.to_collider(scale, local, mesh.as_deref(), &material, mass) {
                    Some(native) => {
                        self.colliders
                            .insert_with_parent(native, handle, &mut self.bodies);
                    }
                    None => log::warn!("{entity}: degenerate 3D collider skipped"),
                }
            }
        }

        self.links.insert(
            entity,
            BodyLink {
                handle,
                body_type,
                shape_offset,
                scale,
            },
        );
        Ok(Some((handle, shape_offset)))
    }

    fn clear_native(&mut self) {
        self.island_manager = IslandManager::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.narrow_phase = NarrowPhase::new();
        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.ccd_solver = CCDSolver::new();
        self.links.clear();
        self.capacity_reported = false;
    }
}

impl Default for PhysicsBridge3D {
    fn default() -> Self {
        Self::new(PhysicsSettings3D::default())
    }
}

impl PhysicsBridge for PhysicsBridge3D {
    fn on_runtime_start(
        &mut self,
        world: &mut World,
        assets: &dyn AssetResolver,
    ) -> Result<(), PhysicsError> {
        lantern_core::profile_scope!("physics3d: runtime start");
        if self.state != BridgeState::Stopped {
            return Err(PhysicsError::AlreadyRunning { bridge: BRIDGE });
        }

        for entity in world.entities_with::<Rigidbody3DComponent>() {
            match self.create_body(world, assets, entity) {
                Ok(Some((handle, shape_offset))) => {
                    if let Some(rb) = world.get_mut::<Rigidbody3DComponent>(entity) {
                        rb.runtime_body = Some(handle);
                        rb.shape_offset = shape_offset;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    if !self.capacity_reported {
                        log::error!("{err}; further bodies are refused");
                        self.capacity_reported = true;
                    }
                }
            }
        }

        self.state = BridgeState::Started;
        log::info!(
            "3D physics started with {} bodies and {} colliders",
            self.bodies.len(),
            self.colliders.len()
        );
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        lantern_core::profile_scope!("physics3d: step");
        if self.state == BridgeState::Stopped {
            return Err(PhysicsError::NotRunning { bridge: BRIDGE });
        }
        self.state = BridgeState::Running;
        if dt <= 0.0 {
            return Ok(());
        }

        let substeps = self.settings.substeps_for(dt);
        self.integration_parameters.dt = dt / substeps as f32;
        for _ in 0..substeps {
            self.pipeline.step(
                self.gravity,
                &self.integration_parameters,
                &mut self.island_manager,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                &(),
                &(),
            );
        }
        Ok(())
    }

    fn sync_transforms(&mut self, world: &mut World) {
        lantern_core::profile_scope!("physics3d: sync transforms");
        for (&entity, link) in &self.links {
            if link.body_type == BodyType::Static {
                continue;
            }
            let Some(body) = self.bodies.get(link.handle) else {
                continue;
            };
            let pos = body.position();
            let r = pos.rotation;
            let q = quat_from_xyzw(r.x, r.y, r.z, r.w);
            let origin = Vec3::new(pos.translation.x, pos.translation.y, pos.translation.z);
            let pivot = origin - quat_rotate_vec3(&q, link.shape_offset);
            write_world_pose(world, entity, pivot, euler_from_quat(&q), link.scale);
        }
    }

    fn on_runtime_stop(&mut self, world: &mut World) {
        if self.state == BridgeState::Stopped && self.links.is_empty() {
            return;
        }
        for (_, rb) in world.query_mut::<Rigidbody3DComponent>() {
            rb.runtime_body = None;
            rb.shape_offset = Vec3::zeros();
        }
        let count = self.links.len();
        self.clear_native();
        self.state = BridgeState::Stopped;
        log::debug!("3D physics stopped, {count} bodies destroyed");
    }

    fn remove_entity(&mut self, entity: Entity) {
        if let Some(link) = self.links.remove(&entity) {
            self.bodies.remove(
                link.handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn state(&self) -> BridgeState {
        self.state
    }

    fn body_count(&self) -> usize {
        self.links.len()
    }
}

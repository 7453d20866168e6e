//! 2D physics bridge.
//!
//! Bodies live in the XY plane. Write-back sets the X/Y translation and the
//! Z rotation of the entity; its Z translation, X/Y rotation and scale are
//! kept from runtime start.

use std::collections::HashMap;

use lantern_core::assets::AssetResolver;
use lantern_core::math::{Vec2, Vec3};
use rapier2d::prelude::*;

use super::components2d::{Collider2DComponent, Rigidbody2DComponent};
use super::{
    BodyType, BridgeState, PhysicsBridge, PhysicsError, iteration_count, resolve_material,
    world_pose, write_world_pose,
};
use crate::settings::PhysicsSettings2D;
use crate::{Entity, World};

const BRIDGE: &str = "2D";

/// World-space pose captured at runtime start, minus what the 2D solver
/// owns.
#[derive(Debug, Clone, Copy)]
struct BodyLink {
    handle: RigidBodyHandle,
    body_type: BodyType,
    depth: f32,
    tilt: Vec2,
    scale: Vec3,
}

/// Owns the rapier 2D world for one scene.
pub struct PhysicsBridge2D {
    settings: PhysicsSettings2D,
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

impl PhysicsBridge2D {
    pub fn new(settings: PhysicsSettings2D) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.num_solver_iterations = iteration_count(
            settings.velocity_iterations,
            integration_parameters.num_solver_iterations,
        );
        integration_parameters.num_internal_stabilization_iterations = iteration_count(
            settings.position_iterations,
            integration_parameters.num_internal_stabilization_iterations,
        );

        Self {
            gravity: Vector::new(settings.gravity.x, settings.gravity.y),
            settings,
            state: BridgeState::Stopped,
            integration_parameters,
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

    pub fn settings(&self) -> &PhysicsSettings2D {
        &self.settings
    }

    /// Native body for `entity`, while running.
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
    ) -> Result<Option<RigidBodyHandle>, PhysicsError> {
        if self.links.len() >= self.settings.max_bodies {
            return Err(PhysicsError::CapacityExceeded {
                bridge: BRIDGE,
                max: self.settings.max_bodies,
            });
        }
        let Some(rb) = world.get::<Rigidbody2DComponent>(entity) else {
            return Ok(None);
        };
        let Some((translation, rotation, scale)) = world_pose(world, entity) else {
            log::warn!("{entity} has a 2D rigidbody but no transform, skipped");
            return Ok(None);
        };

        let handle = self
            .bodies
            .insert(rb.to_rigid_body(Vec2::new(translation.x, translation.y), rotation.z));

        if let Some(colliders) = world.get::<Collider2DComponent>(entity) {
            for collider in &colliders.colliders {
                let material = resolve_material(assets, collider.material, entity);
                match collider.to_collider(scale, &material) {
                    Some(native) => {
                        self.colliders
                            .insert_with_parent(native, handle, &mut self.bodies);
                    }
                    None => log::warn!("{entity}: degenerate 2D collider skipped"),
                }
            }
        }

        self.links.insert(
            entity,
            BodyLink {
                handle,
                body_type: rb.body_type,
                depth: translation.z,
                tilt: Vec2::new(rotation.x, rotation.y),
                scale,
            },
        );
        Ok(Some(handle))
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

impl Default for PhysicsBridge2D {
    fn default() -> Self {
        Self::new(PhysicsSettings2D::default())
    }
}

impl PhysicsBridge for PhysicsBridge2D {
    fn on_runtime_start(
        &mut self,
        world: &mut World,
        assets: &dyn AssetResolver,
    ) -> Result<(), PhysicsError> {
        lantern_core::profile_scope!("physics2d: runtime start");
        if self.state != BridgeState::Stopped {
            return Err(PhysicsError::AlreadyRunning { bridge: BRIDGE });
        }

        for entity in world.entities_with::<Rigidbody2DComponent>() {
            match self.create_body(world, assets, entity) {
                Ok(Some(handle)) => {
                    if let Some(rb) = world.get_mut::<Rigidbody2DComponent>(entity) {
                        rb.runtime_body = Some(handle);
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
            "2D physics started with {} bodies and {} colliders",
            self.bodies.len(),
            self.colliders.len()
        );
        Ok(())
    }

    fn step(&mut self, dt: f32) -> Result<(), PhysicsError> {
        lantern_core::profile_scope!("physics2d: step");
        if self.state == BridgeState::Stopped {
            return Err(PhysicsError::NotRunning { bridge: BRIDGE });
        }
        self.state = BridgeState::Running;
        if dt <= 0.0 {
            return Ok(());
        }

        self.integration_parameters.dt = dt;
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
        Ok(())
    }

    fn sync_transforms(&mut self, world: &mut World) {
        lantern_core::profile_scope!("physics2d: sync transforms");
        for (&entity, link) in &self.links {
            if link.body_type == BodyType::Static {
                continue;
            }
            let Some(body) = self.bodies.get(link.handle) else {
                continue;
            };
            let pos = body.position();
            let translation = Vec3::new(pos.translation.x, pos.translation.y, link.depth);
            let rotation = Vec3::new(link.tilt.x, link.tilt.y, pos.rotation.angle());
            write_world_pose(world, entity, translation, rotation, link.scale);
        }
    }

    fn on_runtime_stop(&mut self, world: &mut World) {
        if self.state == BridgeState::Stopped && self.links.is_empty() {
            return;
        }
        for (_, rb) in world.query_mut::<Rigidbody2DComponent>() {
            rb.runtime_body = None;
        }
        let count = self.links.len();
        self.clear_native();
        self.state = BridgeState::Stopped;
        log::debug!("2D physics stopped, {count} bodies destroyed");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{IdComponent, TransformComponent};
    use crate::physics::components2d::Collider2D;
    use lantern_core::Uuid;
    use lantern_core::assets::AssetCache;

    fn spawn_body(world: &mut World, y: f32, rb: Rigidbody2DComponent) -> Entity {
        let e = world.spawn();
        world.insert(e, IdComponent::new(Uuid::new())).unwrap();
        world
            .insert(e, TransformComponent::from_translation(Vec3::new(0.0, y, 0.0)))
            .unwrap();
        world.insert(e, rb).unwrap();
        world
            .insert(e, Collider2DComponent::new(Collider2D::rect(Vec2::new(1.0, 1.0))))
            .unwrap();
        e
    }

    #[test]
    fn step_before_start_is_refused() {
        let mut bridge = PhysicsBridge2D::default();
        assert_eq!(
            bridge.step(1.0 / 60.0),
            Err(PhysicsError::NotRunning { bridge: "2D" })
        );
    }

    #[test]
    fn lifecycle_states() {
        let mut world = World::new();
        let assets = AssetCache::new();
        let e = spawn_body(&mut world, 10.0, Rigidbody2DComponent::dynamic());
        let mut bridge = PhysicsBridge2D::default();

        bridge.on_runtime_start(&mut world, &assets).unwrap();
        assert_eq!(bridge.state(), BridgeState::Started);
        assert_eq!(bridge.body_count(), 1);
        assert!(world.get::<Rigidbody2DComponent>(e).unwrap().runtime_body().is_some());
        assert!(bridge.on_runtime_start(&mut world, &assets).is_err());

        bridge.step(1.0 / 60.0).unwrap();
        assert_eq!(bridge.state(), BridgeState::Running);

        bridge.on_runtime_stop(&mut world);
        assert_eq!(bridge.state(), BridgeState::Stopped);
        assert_eq!(bridge.body_count(), 0);
        assert!(world.get::<Rigidbody2DComponent>(e).unwrap().runtime_body().is_none());
        assert!(bridge.step(1.0 / 60.0).is_err());

        // Idempotent.
        bridge.on_runtime_stop(&mut world);
        assert_eq!(bridge.state(), BridgeState::Stopped);
    }

    #[test]
    fn dynamic_body_falls() {
        let mut world = World::new();
        let assets = AssetCache::new();
        let e = spawn_body(&mut world, 10.0, Rigidbody2DComponent::dynamic());
        let mut bridge = PhysicsBridge2D::default();
        bridge.on_runtime_start(&mut world, &assets).unwrap();

        let mut last = 10.0;
        for _ in 0..30 {
            bridge.step(1.0 / 60.0).unwrap();
            bridge.sync_transforms(&mut world);
            let y = world.get::<TransformComponent>(e).unwrap().translation.y;
            assert!(y < last);
            last = y;
        }
        // Half a second of free fall: 0.5 * 9.8 * 0.25 = 1.225.
        assert!((10.0 - last - 1.225).abs() < 0.1, "fell {}", 10.0 - last);
    }

    #[test]
    fn static_body_is_not_written() {
        let mut world = World::new();
        let assets = AssetCache::new();
        let e = spawn_body(&mut world, 3.0, Rigidbody2DComponent::fixed());
        let before = world.get::<TransformComponent>(e).unwrap().clone();

        let mut bridge = PhysicsBridge2D::default();
        bridge.on_runtime_start(&mut world, &assets).unwrap();
        for _ in 0..20 {
            bridge.step(1.0 / 60.0).unwrap();
            bridge.sync_transforms(&mut world);
        }
        assert_eq!(world.get::<TransformComponent>(e).unwrap(), &before);
    }

    #[test]
    fn body_limit_refuses_extra_bodies() {
        let mut world = World::new();
        let assets = AssetCache::new();
        for i in 0..3 {
            spawn_body(&mut world, i as f32, Rigidbody2DComponent::dynamic());
        }
        let mut bridge = PhysicsBridge2D::new(PhysicsSettings2D {
            max_bodies: 2,
            ..PhysicsSettings2D::default()
        });
        bridge.on_runtime_start(&mut world, &assets).unwrap();
        assert_eq!(bridge.body_count(), 2);
        let linked = world
            .query::<Rigidbody2DComponent>()
            .filter(|(_, rb)| rb.runtime_body().is_some())
            .count();
        assert_eq!(linked, 2);
    }

    #[test]
    fn missing_material_falls_back_to_defaults() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut world = World::new();
        let assets = AssetCache::new();
        let e = spawn_body(&mut world, 0.0, Rigidbody2DComponent::dynamic());
        world.get_mut::<Collider2DComponent>(e).unwrap().colliders[0].material = Uuid::from_u64(404);

        let mut bridge = PhysicsBridge2D::default();
        bridge.on_runtime_start(&mut world, &assets).unwrap();
        assert_eq!(bridge.collider_count(), 1);
    }

    #[test]
    fn removed_entity_loses_body() {
        let mut world = World::new();
        let assets = AssetCache::new();
        let e = spawn_body(&mut world, 0.0, Rigidbody2DComponent::dynamic());
        let mut bridge = PhysicsBridge2D::default();
        bridge.on_runtime_start(&mut world, &assets).unwrap();
        bridge.remove_entity(e);
        assert_eq!(bridge.body_count(), 0);
        assert!(bridge.body(e).is_none());
    }
}

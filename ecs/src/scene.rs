//! The scene: entity store, identity index, physics bridges and renderer.
//!
//! A [`Scene`] is used in two modes. In edit mode only
//! [`Scene::on_editor_update`] runs and renders through a caller-provided
//! camera. Between [`Scene::on_runtime_start`] and
//! [`Scene::on_runtime_stop`] the scene plays: every
//! [`Scene::on_runtime_update`] runs scripts, steps 2D then 3D physics,
//! writes the simulated poses back and renders through the primary camera.

use std::collections::HashMap;
use std::sync::Arc;

use lantern_core::Uuid;
use lantern_core::assets::AssetResolver;
use lantern_core::material::{ShaderUniform, UniformValue};
use lantern_core::math::{Vec3, transform_point};
use serde::{Deserialize, Serialize};

use crate::components::{
    CameraComponent, IdComponent, LightComponent, MeshRendererComponent, ScriptComponent,
    ScriptContext, SpriteRendererComponent, TagComponent, TransformComponent,
};
use crate::hierarchy::{self, HierarchyError, world_matrix};
use crate::physics::{
    Collider2DComponent, Collider3DComponent, PhysicsBridge, PhysicsBridge2D, PhysicsBridge3D,
    Rigidbody2DComponent, Rigidbody3DComponent,
};
use crate::rendering::{CameraView, FrameInputs, RenderBackend, RenderDispatcher, SceneLight, render_world};
use crate::settings::SceneSettings;
use crate::{Entity, World};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error("an entity with id {0} already exists")]
    DuplicateId(Uuid),
    #[error("{0} is not alive in this scene")]
    NotAlive(Entity),
}

/// Scene-wide lighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SceneLighting {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    /// Skybox asset, or [`Uuid::NIL`] for none.
    pub skybox: Uuid,
}

impl Default for SceneLighting {
    fn default() -> Self {
        Self {
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.2,
            skybox: Uuid::NIL,
        }
    }
}

/// Every optional component of one entity. Identity, tag and transform
/// are handled by the caller.
struct OptionalComponents {
    camera: Option<CameraComponent>,
    light: Option<LightComponent>,
    mesh_renderer: Option<MeshRendererComponent>,
    sprite_renderer: Option<SpriteRendererComponent>,
    script: Option<ScriptComponent>,
    rigidbody_2d: Option<Rigidbody2DComponent>,
    collider_2d: Option<Collider2DComponent>,
    rigidbody_3d: Option<Rigidbody3DComponent>,
    collider_3d: Option<Collider3DComponent>,
}

impl OptionalComponents {
    fn capture(world: &World, entity: Entity) -> Self {
        Self {
            camera: world.get(entity).cloned(),
            light: world.get(entity).cloned(),
            mesh_renderer: world.get(entity).cloned(),
            sprite_renderer: world.get(entity).cloned(),
            script: world.get(entity).cloned(),
            rigidbody_2d: world.get(entity).cloned(),
            collider_2d: world.get(entity).cloned(),
            rigidbody_3d: world.get(entity).cloned(),
            collider_3d: world.get(entity).cloned(),
        }
    }

    fn apply(self, world: &mut World, entity: Entity) {
        fn put<T: 'static>(world: &mut World, entity: Entity, value: Option<T>) {
            if let Some(value) = value {
                let _ = world.insert(entity, value);
            }
        }
        put(world, entity, self.camera);
        put(world, entity, self.light);
        put(world, entity, self.mesh_renderer);
        put(world, entity, self.sprite_renderer);
        put(world, entity, self.script);
        put(world, entity, self.rigidbody_2d);
        put(world, entity, self.collider_2d);
        put(world, entity, self.rigidbody_3d);
        put(world, entity, self.collider_3d);
    }
}

pub struct Scene {
    world: World,
    ids: HashMap<Uuid, Entity>,
    settings: SceneSettings,
    assets: Arc<dyn AssetResolver>,
    physics_2d: PhysicsBridge2D,
    physics_3d: PhysicsBridge3D,
    dispatcher: RenderDispatcher,
    lighting: SceneLighting,
    viewport: (u32, u32),
    playing: bool,
}

impl Scene {
    pub fn new(assets: Arc<dyn AssetResolver>) -> Self {
        Self::with_settings(assets, SceneSettings::default())
    }

    pub fn with_settings(assets: Arc<dyn AssetResolver>, settings: SceneSettings) -> Self {
        Self {
            world: World::new(),
            ids: HashMap::new(),
            physics_2d: PhysicsBridge2D::new(settings.physics_2d.clone()),
            physics_3d: PhysicsBridge3D::new(settings.physics_3d.clone()),
            dispatcher: RenderDispatcher::from_settings(&settings.renderer),
            settings,
            assets,
            lighting: SceneLighting::default(),
            viewport: (0, 0),
            playing: false,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct store access. Use the scene methods to create, destroy or
    /// reparent entities so the identity index stays valid.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn assets(&self) -> &Arc<dyn AssetResolver> {
        &self.assets
    }

    pub fn lighting(&self) -> &SceneLighting {
        &self.lighting
    }

    pub fn lighting_mut(&mut self) -> &mut SceneLighting {
        &mut self.lighting
    }

    pub fn dispatcher(&self) -> &RenderDispatcher {
        &self.dispatcher
    }

    pub fn physics_2d(&self) -> &PhysicsBridge2D {
        &self.physics_2d
    }

    pub fn physics_3d(&self) -> &PhysicsBridge3D {
        &self.physics_3d
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn entity_count(&self) -> usize {
        self.ids.len()
    }

    // ===== Entities =====

    /// Creates a root entity with a fresh id.
    pub fn create_entity(&mut self, name: impl Into<String>) -> Entity {
        self.spawn_with_id(Uuid::new(), name.into())
    }

    /// Creates an entity with the given id (or a fresh one) under `parent`.
    pub fn create_entity_with(
        &mut self,
        parent: Option<Entity>,
        id: Option<Uuid>,
        name: impl Into<String>,
    ) -> Result<Entity, SceneError> {
        let id = id.filter(|id| !id.is_nil()).unwrap_or_else(Uuid::new);
        if self.ids.contains_key(&id) {
            return Err(SceneError::DuplicateId(id));
        }
        self.check_parent(parent)?;

        let entity = self.spawn_with_id(id, name.into());
        if parent.is_some()
            && let Err(err) = hierarchy::set_parent(&mut self.world, entity, parent)
        {
            self.discard(entity, id);
            return Err(err.into());
        }
        Ok(entity)
    }

    /// Rejects a parent that cannot take children, before anything is spawned.
    fn check_parent(&self, parent: Option<Entity>) -> Result<(), SceneError> {
        let Some(parent) = parent else {
            return Ok(());
        };
        if !self.world.is_alive(parent) {
            return Err(SceneError::NotAlive(parent));
        }
        if !self.world.has::<TransformComponent>(parent) {
            return Err(HierarchyError::MissingTransform(parent).into());
        }
        Ok(())
    }

    /// Undoes a spawn whose setup failed.
    fn discard(&mut self, entity: Entity, id: Uuid) {
        self.ids.remove(&id);
        self.world.despawn(entity);
    }

    fn spawn_with_id(&mut self, id: Uuid, name: String) -> Entity {
        let entity = self.world.spawn();
        let _ = self.world.insert(entity, IdComponent::new(id));
        let _ = self.world.insert(entity, TagComponent::new(name));
        let _ = self.world.insert(entity, TransformComponent::default());
        self.ids.insert(id, entity);
        entity
    }

    pub fn get_entity_by_id(&self, id: Uuid) -> Option<Entity> {
        self.ids.get(&id).copied()
    }

    pub fn entity_id(&self, entity: Entity) -> Option<Uuid> {
        self.world.get::<IdComponent>(entity).map(|id| id.id)
    }

    pub fn find_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.world
            .query::<TagComponent>()
            .find(|(_, tag)| tag.as_str() == name)
            .map(|(e, _)| e)
    }

    /// Live children of `entity`, in child-list order.
    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .get::<TransformComponent>(entity)
            .map(|t| t.children().iter().filter_map(|id| self.get_entity_by_id(*id)).collect())
            .unwrap_or_default()
    }

    /// Reparents `entity`, preserving its world pose.
    pub fn set_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<(), SceneError> {
        hierarchy::set_parent(&mut self.world, entity, parent)?;
        Ok(())
    }

    /// Destroys `entity` and all of its descendants.
    ///
    /// Each entity is detached from its parent first, so no child list is
    /// left pointing at a dead id.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), SceneError> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::NotAlive(entity));
        }
        for child in self.children(entity) {
            self.destroy_entity(child)?;
        }

        if let Err(err) = hierarchy::detach(&mut self.world, entity) {
            log::warn!("destroying {entity}: {err}");
        }
        if self.playing {
            self.destroy_script(entity);
        }
        self.physics_2d.remove_entity(entity);
        self.physics_3d.remove_entity(entity);
        if let Some(id) = self.entity_id(entity) {
            self.ids.remove(&id);
        }
        self.world.despawn(entity);
        Ok(())
    }

    /// Deep-copies `entity` and its descendants under `parent`.
    ///
    /// Copies get fresh ids with `owner` set to their source, and keep the
    /// world pose of the source.
    pub fn duplicate_entity(
        &mut self,
        entity: Entity,
        parent: Option<Entity>,
    ) -> Result<Entity, SceneError> {
        let Some(source) = self.world.get::<IdComponent>(entity).copied() else {
            return Err(SceneError::NotAlive(entity));
        };
        self.check_parent(parent)?;
        let name = self
            .world
            .get::<TagComponent>(entity)
            .map_or_else(String::new, |t| t.0.clone());
        let transform = self.world.get::<TransformComponent>(entity).map(|t| t.detached());
        let children = self.children(entity);

        let duplicate = self.world.spawn();
        let identity = IdComponent::duplicate_of(source.id);
        let _ = self.world.insert(duplicate, identity);
        let _ = self.world.insert(duplicate, TagComponent::new(name));
        // Start under the source's parent so reparenting keeps the source pose.
        let mut transform = transform.unwrap_or_default();
        transform.parent = self.world.get::<TransformComponent>(entity).and_then(|t| t.parent);
        let _ = self.world.insert(duplicate, transform);
        self.ids.insert(identity.id, duplicate);

        OptionalComponents::capture(&self.world, entity).apply(&mut self.world, duplicate);

        if let Err(err) = hierarchy::set_parent(&mut self.world, duplicate, parent) {
            self.discard(duplicate, identity.id);
            return Err(err.into());
        }

        for child in children {
            self.duplicate_entity(child, Some(duplicate))?;
        }
        Ok(duplicate)
    }

    /// Independent copy with the same entity ids and component values.
    ///
    /// Parent links are remapped through the ids, and runtime state
    /// (native bodies, created scripts) is not carried over.
    pub fn copy(other: &Scene) -> Scene {
        let mut scene = Scene::with_settings(Arc::clone(&other.assets), other.settings.clone());
        scene.lighting = other.lighting;
        scene.viewport = other.viewport;

        let mut remap: HashMap<Entity, Entity> = HashMap::new();
        for (src, id) in other.world.query::<IdComponent>() {
            let name = other
                .world
                .get::<TagComponent>(src)
                .map_or_else(String::new, |t| t.0.clone());
            let dst = scene.spawn_with_id(id.id, name);
            let _ = scene.world.insert(dst, *id);
            OptionalComponents::capture(&other.world, src).apply(&mut scene.world, dst);
            remap.insert(src, dst);
        }

        for (&src, &dst) in &remap {
            let Some(transform) = other.world.get::<TransformComponent>(src) else {
                continue;
            };
            let mut copy = transform.clone();
            copy.parent = transform.parent.and_then(|p| remap.get(&p).copied());
            let _ = scene.world.insert(dst, copy);
        }
        scene
    }

    // ===== Cameras and lights =====

    /// First camera flagged as primary.
    pub fn primary_camera(&self) -> Option<Entity> {
        self.world
            .query::<CameraComponent>()
            .find(|(_, camera)| camera.primary)
            .map(|(e, _)| e)
    }

    /// View through the primary camera, if there is one with an invertible
    /// world matrix.
    pub fn primary_camera_view(&self) -> Option<CameraView> {
        let entity = self.primary_camera()?;
        let camera = self.world.get::<CameraComponent>(entity)?;
        let camera_world = world_matrix(&self.world, entity)?;
        CameraView::from_camera_world(&camera_world, camera.projection_matrix())
    }

    pub fn on_viewport_resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        for (_, camera) in self.world.query_mut::<CameraComponent>() {
            camera.set_viewport_size(width, height);
        }
    }

    /// Directional lights (or a dark placeholder when there are none)
    /// followed by point lights at their world positions.
    pub fn lights(&self) -> Vec<SceneLight> {
        let mut directional = Vec::new();
        let mut points = Vec::new();
        for (entity, light) in self.world.query::<LightComponent>() {
            match light {
                LightComponent::Directional(l) => directional.push(SceneLight::Directional(*l)),
                LightComponent::Point(l) => {
                    let position = world_matrix(&self.world, entity)
                        .map_or_else(Vec3::zeros, |m| transform_point(&m, Vec3::zeros()));
                    points.push(SceneLight::Point { light: *l, position });
                }
            }
        }
        if directional.is_empty() {
            directional.push(SceneLight::placeholder());
        }
        directional.extend(points);
        directional
    }

    /// Uniforms shared by every lit draw.
    pub fn global_uniforms(&self, camera_position: Vec3) -> Vec<ShaderUniform> {
        let renderer = &self.settings.renderer;
        vec![
            ShaderUniform::new("u_CameraPosition", UniformValue::Vec3(camera_position)),
            ShaderUniform::new("u_AmbientLightColor", UniformValue::Vec3(self.lighting.ambient_color)),
            ShaderUniform::new(
                "u_AmbientLightIntensity",
                UniformValue::Float(self.lighting.ambient_intensity),
            ),
            ShaderUniform::new("u_ShadowFadeoutStart", UniformValue::Float(renderer.shadow_fadeout_start)),
            ShaderUniform::new("u_ShadowFadeoutEnd", UniformValue::Float(renderer.shadow_fadeout_end)),
        ]
    }

    // ===== Frame loop =====

    /// Builds native physics bodies and enters play mode.
    pub fn on_runtime_start(&mut self) {
        if self.playing {
            log::warn!("scene is already playing");
            return;
        }
        self.playing = true;
        log::info!("scene runtime start ({} entities)", self.ids.len());

        let assets = Arc::clone(&self.assets);
        if let Err(err) = self.physics_2d.on_runtime_start(&mut self.world, assets.as_ref()) {
            log::error!("{err}");
        }
        if let Err(err) = self.physics_3d.on_runtime_start(&mut self.world, assets.as_ref()) {
            log::error!("{err}");
        }
    }

    /// One play-mode frame: scripts, 2D physics, 3D physics, render.
    pub fn on_runtime_update(&mut self, dt: f32, backend: &mut dyn RenderBackend) {
        lantern_core::profile_function!();

        if self.playing {
            self.update_scripts(dt);
            self.update_physics(dt);
        }

        match self.primary_camera_view() {
            Some(camera) => self.render(backend, camera),
            None => log::debug!("no primary camera, nothing rendered"),
        }
        lantern_core::frame_mark!();
    }

    /// Edit-mode frame: renders through `camera`, nothing simulates.
    pub fn on_editor_update(&mut self, backend: &mut dyn RenderBackend, camera: CameraView) {
        lantern_core::profile_function!();
        self.render(backend, camera);
    }

    /// Leaves play mode: destroys scripts and every native body.
    pub fn on_runtime_stop(&mut self) {
        for entity in self.world.entities_with::<ScriptComponent>() {
            self.destroy_script(entity);
        }
        self.physics_2d.on_runtime_stop(&mut self.world);
        self.physics_3d.on_runtime_stop(&mut self.world);
        if self.playing {
            log::info!("scene runtime stop");
        }
        self.playing = false;
    }

    fn update_scripts(&mut self, dt: f32) {
        lantern_core::profile_scope!("scene: scripts");

        for entity in self.world.entities_with::<ScriptComponent>() {
            let Some(component) = self.world.get_mut::<ScriptComponent>(entity) else {
                continue;
            };
            let created = component.created;
            let Some(mut script) = component.instance.take() else {
                continue;
            };

            let mut ctx = ScriptContext {
                world: &mut self.world,
                entity,
            };
            if !created {
                script.on_create(&mut ctx);
            }
            script.on_update(&mut ctx, dt);

            if let Some(component) = self.world.get_mut::<ScriptComponent>(entity) {
                component.instance = Some(script);
                component.created = true;
            }
        }
    }

    fn destroy_script(&mut self, entity: Entity) {
        let Some(component) = self.world.get_mut::<ScriptComponent>(entity) else {
            return;
        };
        if !component.created {
            return;
        }
        let Some(mut script) = component.instance.take() else {
            return;
        };
        let mut ctx = ScriptContext {
            world: &mut self.world,
            entity,
        };
        script.on_destroy(&mut ctx);
        if let Some(component) = self.world.get_mut::<ScriptComponent>(entity) {
            component.instance = Some(script);
            component.created = false;
        }
    }

    fn update_physics(&mut self, dt: f32) {
        {
            lantern_core::profile_scope!("scene: physics2d");
            match self.physics_2d.step(dt) {
                Ok(()) => self.physics_2d.sync_transforms(&mut self.world),
                Err(err) => log::error!("{err}"),
            }
        }
        {
            lantern_core::profile_scope!("scene: physics3d");
            match self.physics_3d.step(dt) {
                Ok(()) => self.physics_3d.sync_transforms(&mut self.world),
                Err(err) => log::error!("{err}"),
            }
        }
    }

    fn render(&mut self, backend: &mut dyn RenderBackend, camera: CameraView) {
        lantern_core::profile_scope!("scene: render");

        let lights = self.lights();
        let globals = self.global_uniforms(camera.position);
        render_world(
            &self.world,
            self.assets.as_ref(),
            &mut self.dispatcher,
            backend,
            FrameInputs {
                camera,
                lights: &lights,
                globals,
                cascades: &self.settings.renderer.shadow_cascades,
            },
        );
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entities", &self.ids.len())
            .field("playing", &self.playing)
            .field("lighting", &self.lighting)
            .finish_non_exhaustive()
    }
}

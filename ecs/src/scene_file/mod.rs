//! Scene persistence in RON.
//!
//! [`save`] walks the hierarchy depth-first from each root and writes one
//! [`SerializedEntity`] per entity; [`load`] rebuilds a [`Scene`] from such a
//! document. Entities are created first and parent links are resolved in a
//! second pass, so records may appear in any order.
//!
//! Loading is lenient per record: an entity without an id, without a
//! transform or with an id already taken is skipped with a warning, and a
//! dangling `Parent` leaves the entity at the root. Only a document that is
//! not valid RON fails as a whole.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lantern_core::assets::AssetCache;
//! use lantern_ecs::scene_file;
//! use lantern_ecs::{Scene, SceneSettings};
//!
//! let assets = Arc::new(AssetCache::new());
//! let mut scene = Scene::new(assets.clone());
//! let root = scene.create_entity("root");
//! scene.create_entity_with(Some(root), None, "child").unwrap();
//!
//! let text = scene_file::save(&scene).unwrap();
//! let loaded = scene_file::load(&text, assets, SceneSettings::default()).unwrap();
//! assert_eq!(loaded.entity_count(), 2);
//! ```

mod error;
mod records;

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use lantern_core::Uuid;
use lantern_core::assets::AssetResolver;
use ron::extensions::Extensions;

pub use error::SceneFileError;
pub use records::{
    CameraRecord, LightRecord, MeshRendererRecord, ProjectionRecord, Rigidbody2DRecord,
    Rigidbody3DRecord, SerializedEntity, SerializedScene, SpriteRendererRecord, TransformRecord,
};

use crate::components::{
    CameraComponent, IdComponent, LightComponent, MeshRendererComponent, SpriteRendererComponent,
    TagComponent, TransformComponent,
};
use crate::hierarchy;
use crate::physics::{
    Collider2DComponent, Collider3DComponent, Rigidbody2DComponent, Rigidbody3DComponent,
};
use crate::scene::Scene;
use crate::settings::SceneSettings;
use crate::{Entity, World};

/// Captures `scene` as a [`SerializedScene`]. Parents precede their
/// children and siblings keep their child-list order.
pub fn to_serialized(scene: &Scene) -> SerializedScene {
    let world = scene.world();
    let mut entities = Vec::new();
    let mut visited = HashSet::new();

    let roots: Vec<Entity> = world
        .query::<IdComponent>()
        .filter(|(e, _)| world.get::<TransformComponent>(*e).is_none_or(|t| t.parent().is_none()))
        .map(|(e, _)| e)
        .collect();

    let mut stack: Vec<Entity> = roots.into_iter().rev().collect();
    while let Some(entity) = stack.pop() {
        if !visited.insert(entity) {
            continue;
        }
        if let Some(record) = record_entity(scene, entity) {
            entities.push(record);
        }
        stack.extend(scene.children(entity).into_iter().rev());
    }

    SerializedScene {
        entities,
        lighting: *scene.lighting(),
    }
}

fn record_entity(scene: &Scene, entity: Entity) -> Option<SerializedEntity> {
    let world = scene.world();
    let identity = world.get::<IdComponent>(entity)?;
    let transform = world.get::<TransformComponent>(entity).map(|t| TransformRecord {
        translation: t.translation,
        rotation: t.rotation,
        scale: t.scale,
        parent: t
            .parent()
            .and_then(|p| scene.entity_id(p))
            .unwrap_or(Uuid::NIL),
        children: t.children().to_vec(),
    });

    Some(SerializedEntity {
        id: identity.id,
        owner: identity.owner,
        tag: world.get::<TagComponent>(entity).map_or_else(String::new, |t| t.0.clone()),
        transform,
        camera: world.get::<CameraComponent>(entity).map(CameraRecord::from),
        light: world.get::<LightComponent>(entity).map(LightRecord::from),
        mesh_renderer: world.get::<MeshRendererComponent>(entity).map(MeshRendererRecord::from),
        sprite_renderer: world
            .get::<SpriteRendererComponent>(entity)
            .map(SpriteRendererRecord::from),
        rigidbody_2d: world.get::<Rigidbody2DComponent>(entity).map(Rigidbody2DRecord::from),
        collider_2d: world.get::<Collider2DComponent>(entity).map(|c| c.colliders.clone()),
        rigidbody_3d: world.get::<Rigidbody3DComponent>(entity).map(Rigidbody3DRecord::from),
        collider_3d: world.get::<Collider3DComponent>(entity).map(|c| c.colliders.clone()),
    })
}

/// Optional component blocks are written and read without `Some(..)`.
fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME)
}

/// Encodes `scene` as pretty-printed RON.
pub fn save(scene: &Scene) -> Result<String, SceneFileError> {
    lantern_core::profile_function!();
    let document = to_serialized(scene);
    let pretty = ron::ser::PrettyConfig::default().extensions(Extensions::IMPLICIT_SOME);
    let text = ron_options().to_string_pretty(&document, pretty)?;
    log::debug!("saved scene with {} entities", document.entities.len());
    Ok(text)
}

/// Parses RON text and builds a scene from it.
pub fn load(
    text: &str,
    assets: Arc<dyn AssetResolver>,
    settings: SceneSettings,
) -> Result<Scene, SceneFileError> {
    lantern_core::profile_function!();
    let document: SerializedScene = ron_options().from_str(text)?;
    Ok(from_serialized(document, assets, settings))
}

pub fn save_to_file(scene: &Scene, path: impl AsRef<Path>) -> Result<(), SceneFileError> {
    let text = save(scene)?;
    std::fs::write(path, text)?;
    Ok(())
}

pub fn load_from_file(
    path: impl AsRef<Path>,
    assets: Arc<dyn AssetResolver>,
    settings: SceneSettings,
) -> Result<Scene, SceneFileError> {
    let text = std::fs::read_to_string(path)?;
    load(&text, assets, settings)
}

/// A created entity whose links still need resolving.
struct PendingLinks {
    entity: Entity,
    parent: Uuid,
    children: Vec<Uuid>,
}

/// Builds a scene from an already decoded document.
pub fn from_serialized(
    document: SerializedScene,
    assets: Arc<dyn AssetResolver>,
    settings: SceneSettings,
) -> Scene {
    let mut scene = Scene::with_settings(assets, settings);
    *scene.lighting_mut() = document.lighting;

    let mut pending = Vec::with_capacity(document.entities.len());
    for record in document.entities {
        if record.id.is_nil() {
            log::warn!("scene entity '{}' has no id, skipped", record.tag);
            continue;
        }
        let Some(transform) = record.transform.clone() else {
            log::warn!("scene entity {} has no transform, skipped", record.id);
            continue;
        };
        let entity = match scene.create_entity_with(None, Some(record.id), record.tag.clone()) {
            Ok(entity) => entity,
            Err(err) => {
                log::warn!("scene entity {} skipped: {err}", record.id);
                continue;
            }
        };

        let world = scene.world_mut();
        let _ = world.insert(
            entity,
            IdComponent {
                id: record.id,
                owner: record.owner,
            },
        );
        if let Some(t) = world.get_mut::<TransformComponent>(entity) {
            t.translation = transform.translation;
            t.rotation = transform.rotation;
            t.scale = transform.scale;
        }
        insert_components(world, entity, record);

        pending.push(PendingLinks {
            entity,
            parent: transform.parent,
            children: transform.children,
        });
    }

    for link in &pending {
        if link.parent.is_nil() {
            continue;
        }
        let Some(parent) = scene.get_entity_by_id(link.parent) else {
            log::warn!(
                "parent {} of {} not found, left at the root",
                link.parent,
                link.entity
            );
            continue;
        };
        if let Err(err) = hierarchy::link_parent(scene.world_mut(), link.entity, parent) {
            log::warn!("{err}, left at the root");
        }
    }

    for link in &pending {
        restore_child_order(scene.world_mut(), link.entity, &link.children);
    }

    log::info!("loaded scene with {} entities", scene.entity_count());
    scene
}

fn insert_components(world: &mut World, entity: Entity, record: SerializedEntity) {
    fn put<T: 'static>(world: &mut World, entity: Entity, value: Option<T>) {
        if let Some(value) = value {
            let _ = world.insert(entity, value);
        }
    }
    put(world, entity, record.camera.map(CameraComponent::from));
    put(world, entity, record.light.map(LightComponent::from));
    put(world, entity, record.mesh_renderer.map(MeshRendererComponent::from));
    put(world, entity, record.sprite_renderer.map(SpriteRendererComponent::from));
    put(world, entity, record.rigidbody_2d.map(Rigidbody2DComponent::from));
    put(world, entity, record.collider_2d.map(|colliders| Collider2DComponent { colliders }));
    put(world, entity, record.rigidbody_3d.map(Rigidbody3DComponent::from));
    put(world, entity, record.collider_3d.map(|colliders| Collider3DComponent { colliders }));
}

/// Sorts the linked children of `entity` into the recorded order. Children
/// the record does not mention keep their relative order at the end.
fn restore_child_order(world: &mut World, entity: Entity, recorded: &[Uuid]) {
    if recorded.is_empty() {
        return;
    }
    if let Some(t) = world.get_mut::<TransformComponent>(entity) {
        t.children
            .sort_by_key(|id| recorded.iter().position(|r| r == id).unwrap_or(usize::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DirectionalLight, PointLight};
    use crate::physics::{BodyType, Collider2D, Collider3D};
    use lantern_core::assets::AssetCache;
    use lantern_core::math::{Vec2, Vec3};

    fn assets() -> Arc<dyn AssetResolver> {
        Arc::new(AssetCache::new())
    }

    fn reload(scene: &Scene) -> Scene {
        let text = save(scene).unwrap();
        load(&text, assets(), SceneSettings::default()).unwrap()
    }

    #[test]
    fn round_trip_keeps_hierarchy_and_components() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut scene = Scene::new(assets());
        let root = scene.create_entity("root");
        scene.world_mut().get_mut::<TransformComponent>(root).unwrap().translation =
            Vec3::new(1.0, 2.0, 3.0);
        let a = scene.create_entity_with(Some(root), None, "a").unwrap();
        let b = scene.create_entity_with(Some(root), None, "b").unwrap();
        scene
            .world_mut()
            .insert(a, LightComponent::Point(PointLight::default()))
            .unwrap();
        scene
            .world_mut()
            .insert(b, Rigidbody2DComponent::new(BodyType::Kinematic))
            .unwrap();
        scene
            .world_mut()
            .insert(b, Collider2DComponent::new(Collider2D::circle(0.5)).with(Collider2D::rect(Vec2::new(1.0, 2.0))))
            .unwrap();
        scene
            .world_mut()
            .insert(b, Collider3DComponent::new(Collider3D::sphere(2.0)))
            .unwrap();
        scene.lighting_mut().ambient_intensity = 0.75;

        let loaded = reload(&scene);
        assert_eq!(loaded.entity_count(), 3);
        assert_eq!(loaded.lighting().ambient_intensity, 0.75);

        let id = |e| scene.entity_id(e).unwrap();
        let root2 = loaded.get_entity_by_id(id(root)).unwrap();
        let a2 = loaded.get_entity_by_id(id(a)).unwrap();
        let b2 = loaded.get_entity_by_id(id(b)).unwrap();
        assert_eq!(loaded.children(root2), vec![a2, b2]);
        assert_eq!(
            loaded.world().get::<TransformComponent>(root2).unwrap().translation,
            Vec3::new(1.0, 2.0, 3.0)
        );
        assert_eq!(
            loaded.world().get::<LightComponent>(a2),
            scene.world().get::<LightComponent>(a)
        );
        assert_eq!(
            loaded.world().get::<Rigidbody2DComponent>(b2).unwrap().body_type,
            BodyType::Kinematic
        );
        assert_eq!(
            loaded.world().get::<Collider2DComponent>(b2),
            scene.world().get::<Collider2DComponent>(b)
        );
        assert_eq!(
            loaded.world().get::<Collider3DComponent>(b2),
            scene.world().get::<Collider3DComponent>(b)
        );
        assert!(!loaded.world().has::<LightComponent>(root2));
    }

    #[test]
    fn parents_are_written_before_children() {
        let mut scene = Scene::new(assets());
        let root = scene.create_entity("root");
        let mid = scene.create_entity_with(Some(root), None, "mid").unwrap();
        scene.create_entity_with(Some(mid), None, "leaf").unwrap();

        let document = to_serialized(&scene);
        let tags: Vec<_> = document.entities.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, ["root", "mid", "leaf"]);
        let mid_record = &document.entities[1];
        assert_eq!(
            mid_record.transform.as_ref().unwrap().parent,
            scene.entity_id(root).unwrap()
        );
    }

    #[test]
    fn children_may_precede_parents() {
        let text = r#"(
            Entities: [
                (Id: 2, Tag: "child", Transform: (Parent: 1)),
                (Id: 1, Tag: "parent", Transform: (Children: [2])),
            ],
        )"#;
        let scene = load(text, assets(), SceneSettings::default()).unwrap();
        let parent = scene.get_entity_by_id(Uuid::from_u64(1)).unwrap();
        let child = scene.get_entity_by_id(Uuid::from_u64(2)).unwrap();
        assert_eq!(scene.children(parent), vec![child]);
    }

    #[test]
    fn invalid_records_are_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();

        let text = r#"(
            Entities: [
                (Id: 0, Tag: "no id", Transform: ()),
                (Id: 5, Tag: "no transform"),
                (Id: 6, Tag: "first", Transform: ()),
                (Id: 6, Tag: "duplicate", Transform: ()),
                (Id: 7, Tag: "orphan", Transform: (Parent: 99)),
            ],
        )"#;
        let scene = load(text, assets(), SceneSettings::default()).unwrap();
        assert_eq!(scene.entity_count(), 2);
        assert_eq!(scene.find_entity_by_name("first"), scene.get_entity_by_id(Uuid::from_u64(6)));
        let orphan = scene.get_entity_by_id(Uuid::from_u64(7)).unwrap();
        assert_eq!(scene.world().get::<TransformComponent>(orphan).unwrap().parent(), None);
    }

    #[test]
    fn defaults_fill_absent_fields() {
        let text = r#"(
            Entities: [
                (
                    Id: 3,
                    Tag: "box",
                    Transform: (),
                    MeshRenderer: (Mesh: 10),
                    Rigidbody2D: (BodyType: "Wobbly"),
                ),
            ],
        )"#;
        let scene = load(text, assets(), SceneSettings::default()).unwrap();
        let e = scene.get_entity_by_id(Uuid::from_u64(3)).unwrap();
        let t = scene.world().get::<TransformComponent>(e).unwrap();
        assert_eq!(t.scale, Vec3::new(1.0, 1.0, 1.0));
        let renderer = scene.world().get::<MeshRendererComponent>(e).unwrap();
        assert!(renderer.material.is_nil());
        assert_eq!(
            scene.world().get::<Rigidbody2DComponent>(e).unwrap().body_type,
            BodyType::Dynamic
        );
        assert_eq!(scene.lighting(), &crate::scene::SceneLighting::default());
    }

    #[test]
    fn owner_survives_round_trip() {
        let mut scene = Scene::new(assets());
        let e = scene.create_entity("source");
        scene
            .world_mut()
            .insert(e, LightComponent::Directional(DirectionalLight::default()))
            .unwrap();
        let copy = scene.duplicate_entity(e, None).unwrap();
        let identity = *scene.world().get::<IdComponent>(copy).unwrap();

        let loaded = reload(&scene);
        let copy2 = loaded.get_entity_by_id(identity.id).unwrap();
        assert_eq!(loaded.world().get::<IdComponent>(copy2), Some(&identity));
    }

    #[test]
    fn malformed_text_is_an_error() {
        let result = load("(Entities: [", assets(), SceneSettings::default());
        assert!(matches!(result, Err(SceneFileError::Parse(_))));
    }
}

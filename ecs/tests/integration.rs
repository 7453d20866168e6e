//! Cross-module scenarios driven through [`Scene`].

use std::sync::Arc;

use lantern_core::Uuid;
use lantern_core::assets::AssetCache;
use lantern_core::material::Material;
use lantern_core::math::{Vec2, Vec3, Vec4, transform_point};
use lantern_core::mesh::generators::{generate_cube, generate_quad};

use lantern_ecs::components::*;
use lantern_ecs::hierarchy::world_matrix;
use lantern_ecs::physics::{Collider2D, Collider2DComponent, Rigidbody2DComponent};
use lantern_ecs::rendering::{RecordedCall, RecordingBackend};
use lantern_ecs::scene_file;
use lantern_ecs::{Entity, Scene, SceneSettings};

fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn translation(scene: &Scene, entity: Entity) -> Vec3 {
    scene
        .world()
        .get::<TransformComponent>(entity)
        .map(|t| t.translation)
        .unwrap()
}

fn set_translation(scene: &mut Scene, entity: Entity, value: Vec3) {
    scene
        .world_mut()
        .get_mut::<TransformComponent>(entity)
        .unwrap()
        .translation = value;
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[test]
fn reparent_to_root_keeps_world_pose() {
    init_logging();
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let b = scene.create_entity("B");
    set_translation(&mut scene, b, Vec3::new(0.0, 2.0, 0.0));
    let a = scene.create_entity_with(Some(b), None, "A").unwrap();
    // Local offset under B.
    set_translation(&mut scene, a, Vec3::new(1.0, 0.0, 0.0));

    let world = world_matrix(scene.world(), a).unwrap();
    let origin = transform_point(&world, Vec3::zeros());
    assert!(approx_eq(origin.x, 1.0, 1e-4));
    assert!(approx_eq(origin.y, 2.0, 1e-4));
    assert!(approx_eq(origin.z, 0.0, 1e-4));

    scene.set_parent(a, None).unwrap();
    let t = scene.world().get::<TransformComponent>(a).unwrap();
    assert!((t.translation - Vec3::new(1.0, 2.0, 0.0)).norm() < 1e-4);
    assert!(t.rotation.norm() < 1e-4);
    assert!((t.scale - Vec3::new(1.0, 1.0, 1.0)).norm() < 1e-4);
    assert!(scene.children(b).is_empty());
}

#[test]
fn reparent_rejects_cycles() {
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let root = scene.create_entity("root");
    let child = scene.create_entity_with(Some(root), None, "child").unwrap();
    assert!(scene.set_parent(root, Some(child)).is_err());
    assert!(scene.set_parent(root, Some(root)).is_err());
    assert_eq!(scene.children(root), vec![child]);
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

#[test]
fn dynamic_body_falls_monotonically() {
    init_logging();
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let body = scene.create_entity("ball");
    set_translation(&mut scene, body, Vec3::new(0.0, 10.0, 0.0));
    scene
        .world_mut()
        .insert(body, Rigidbody2DComponent::dynamic())
        .unwrap();
    scene
        .world_mut()
        .insert(body, Collider2DComponent::new(Collider2D::circle(0.5)))
        .unwrap();

    let mut backend = RecordingBackend::new();
    scene.on_runtime_start();

    let dt = 1.0 / 60.0;
    let steps = 30;
    let mut previous = translation(&scene, body).y;
    for _ in 0..steps {
        scene.on_runtime_update(dt, &mut backend);
        let y = translation(&scene, body).y;
        assert!(y < previous, "y went from {previous} to {y}");
        previous = y;
    }

    // Free fall: y = 10 - g t^2 / 2, with a loose bound for the solver.
    let t = steps as f32 * dt;
    let expected = 10.0 - 0.5 * 9.8 * t * t;
    assert!(approx_eq(previous, expected, 0.1), "{previous} vs {expected}");

    scene.on_runtime_stop();
    assert!(scene
        .world()
        .get::<Rigidbody2DComponent>(body)
        .unwrap()
        .runtime_body()
        .is_none());
}

#[test]
fn static_body_is_not_written_back() {
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let ground = scene.create_entity("ground");
    set_translation(&mut scene, ground, Vec3::new(0.0, -1.0, 0.0));
    scene
        .world_mut()
        .insert(ground, Rigidbody2DComponent::fixed())
        .unwrap();
    scene
        .world_mut()
        .insert(
            ground,
            Collider2DComponent::new(Collider2D::rect(Vec2::new(20.0, 1.0))),
        )
        .unwrap();

    let mut backend = RecordingBackend::new();
    scene.on_runtime_start();
    for _ in 0..10 {
        scene.on_runtime_update(1.0 / 60.0, &mut backend);
    }
    assert_eq!(translation(&scene, ground), Vec3::new(0.0, -1.0, 0.0));
    scene.on_runtime_stop();
    // Stopping twice is harmless.
    scene.on_runtime_stop();
}

// ---------------------------------------------------------------------------
// Duplication and copy
// ---------------------------------------------------------------------------

#[test]
fn duplicate_subtree_mirrors_topology() {
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let root = scene.create_entity("root");
    let a = scene.create_entity_with(Some(root), None, "a").unwrap();
    scene.create_entity_with(Some(root), None, "b").unwrap();
    scene.create_entity_with(Some(a), None, "a1").unwrap();
    set_translation(&mut scene, a, Vec3::new(0.0, 1.0, 0.0));
    let before = scene.entity_count();

    let copy = scene.duplicate_entity(root, None).unwrap();
    assert_eq!(scene.entity_count(), before * 2);

    let copied_children = scene.children(copy);
    assert_eq!(copied_children.len(), 2);
    assert_eq!(scene.children(copied_children[0]).len(), 1);
    assert_eq!(scene.children(copied_children[1]).len(), 0);
    assert!((translation(&scene, copied_children[0]) - Vec3::new(0.0, 1.0, 0.0)).norm() < 1e-4);

    let source_id = scene.entity_id(root).unwrap();
    let identity = scene.world().get::<IdComponent>(copy).copied().unwrap();
    assert_ne!(identity.id, source_id);
    assert_eq!(identity.owner, source_id);
    // The source is untouched.
    assert_eq!(scene.children(root).len(), 2);
}

#[test]
fn copied_scene_is_independent() {
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    let parent = scene.create_entity("parent");
    let child = scene.create_entity_with(Some(parent), None, "child").unwrap();
    let child_id = scene.entity_id(child).unwrap();
    let parent_id = scene.entity_id(parent).unwrap();

    let mut copy = Scene::copy(&scene);
    let child2 = copy.get_entity_by_id(child_id).unwrap();
    let parent2 = copy.get_entity_by_id(parent_id).unwrap();
    assert_eq!(
        copy.world().get::<TransformComponent>(child2).unwrap().parent(),
        Some(parent2)
    );
    assert_eq!(copy.children(parent2), vec![child2]);

    set_translation(&mut copy, child2, Vec3::new(5.0, 0.0, 0.0));
    assert_eq!(translation(&scene, child), Vec3::zeros());
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn runtime_frame_renders_through_primary_camera() {
    init_logging();
    let assets = Arc::new(AssetCache::new());
    let cube = assets.insert_mesh(generate_cube(Uuid::from_u64(1), 0.5));
    let quad = assets.insert_mesh(generate_quad(Uuid::from_u64(2), 0.5, 0.5));
    let lit = assets.insert_material(Material::new(Uuid::from_u64(3), "lit"));

    let mut scene = Scene::new(assets);
    let camera = scene.create_entity("camera");
    scene
        .world_mut()
        .insert(camera, CameraComponent::default())
        .unwrap();
    set_translation(&mut scene, camera, Vec3::new(0.0, 0.0, 10.0));

    for i in 0..4 {
        let e = scene.create_entity(format!("tile {i}"));
        let mesh = if i % 2 == 0 { cube } else { quad };
        scene
            .world_mut()
            .insert(e, MeshRendererComponent::new(mesh, lit).instanced())
            .unwrap();
    }

    let mut backend = RecordingBackend::new();
    scene.on_runtime_start();
    scene.on_runtime_update(1.0 / 60.0, &mut backend);

    // Four instanced meshes share one material: a single draw.
    assert_eq!(backend.draws_with(lit), 1);
    assert_eq!(scene.dispatcher().stats().batched_meshes, 4);
    // Batches are empty once flushed.
    assert!(scene.dispatcher().batches().all(|b| b.index_count() == 0));
    assert!(backend.position_of(&RecordedCall::BeginMainPass).is_some());
}

#[test]
fn no_primary_camera_renders_nothing() {
    let mut scene = Scene::new(Arc::new(AssetCache::new()));
    scene.create_entity("lonely");
    let mut backend = RecordingBackend::new();
    scene.on_runtime_update(1.0 / 60.0, &mut backend);
    assert!(backend.calls.is_empty());
}

// ---------------------------------------------------------------------------
// Scene files
// ---------------------------------------------------------------------------

#[test]
fn saved_scene_loads_with_same_structure() {
    init_logging();
    let assets = Arc::new(AssetCache::new());
    let mut scene = Scene::new(assets.clone());
    let camera = scene.create_entity("camera");
    scene
        .world_mut()
        .insert(camera, CameraComponent::orthographic(8.0))
        .unwrap();
    let sun = scene.create_entity_with(Some(camera), None, "sun").unwrap();
    scene
        .world_mut()
        .insert(sun, LightComponent::Directional(DirectionalLight::default()))
        .unwrap();
    scene
        .world_mut()
        .insert(sun, SpriteRendererComponent::from_color(Vec4::new(1.0, 0.0, 0.0, 1.0)))
        .unwrap();

    let text = scene_file::save(&scene).unwrap();
    let loaded = scene_file::load(&text, assets, SceneSettings::default()).unwrap();

    assert_eq!(loaded.entity_count(), 2);
    let camera2 = loaded.get_entity_by_id(scene.entity_id(camera).unwrap()).unwrap();
    let sun2 = loaded.get_entity_by_id(scene.entity_id(sun).unwrap()).unwrap();
    assert_eq!(loaded.children(camera2), vec![sun2]);
    assert_eq!(
        loaded.world().get::<CameraComponent>(camera2),
        scene.world().get::<CameraComponent>(camera)
    );
    assert_eq!(
        loaded.world().get::<SpriteRendererComponent>(sun2),
        scene.world().get::<SpriteRendererComponent>(sun)
    );
    assert_eq!(loaded.primary_camera(), Some(camera2));
}

#[test]
fn malformed_entity_does_not_abort_load() {
    init_logging();
    let text = r#"(
        Entities: [
            (Id: 11, Tag: "kept", Transform: ()),
            (Id: 12, Tag: "missing transform"),
        ],
        Lighting: (AmbientIntensity: 0.5),
    )"#;
    let scene = scene_file::load(text, Arc::new(AssetCache::new()), SceneSettings::default()).unwrap();
    assert_eq!(scene.entity_count(), 1);
    assert!(scene.find_entity_by_name("kept").is_some());
    assert_eq!(scene.lighting().ambient_intensity, 0.5);
}

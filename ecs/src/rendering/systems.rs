//! Frame rendering: shadow passes, the main 3D pass, then sprites.

use std::sync::Arc;

use lantern_core::assets::AssetResolver;
use lantern_core::material::{Material, ShaderUniform};
use lantern_core::math::{Mat4, Vec3};
use lantern_core::mesh::Mesh;

use super::backend::{RenderBackend, SpriteDraw};
use super::dispatcher::RenderDispatcher;
use super::lighting::{SceneLight, cascade_matrices, light_uniforms};
use crate::components::{MeshRendererComponent, SpriteRendererComponent, TransformComponent};
use crate::hierarchy::world_matrix;
use crate::settings::CascadeSplit;
use crate::{Entity, World};

/// Where the frame is seen from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl CameraView {
    /// Builds the view from the camera's world matrix. `None` when that
    /// matrix cannot be inverted.
    pub fn from_camera_world(camera_world: &Mat4, projection: Mat4) -> Option<Self> {
        let view = camera_world.try_inverse()?;
        Some(Self {
            view,
            projection,
            position: Vec3::new(camera_world[(0, 3)], camera_world[(1, 3)], camera_world[(2, 3)]),
        })
    }
}

/// Per-frame inputs gathered by the scene.
#[derive(Debug, Clone)]
pub struct FrameInputs<'a> {
    pub camera: CameraView,
    pub lights: &'a [SceneLight],
    pub globals: Vec<ShaderUniform>,
    pub cascades: &'a [CascadeSplit],
}

/// A mesh renderer with its assets resolved and its world matrix computed.
struct MeshDraw {
    transform: Mat4,
    mesh: Arc<Mesh>,
    material: Arc<Material>,
    instanced: bool,
}

/// Resolves every mesh renderer once so the shadow and main passes share the
/// same world matrices. Missing assets are logged and left out.
fn collect_mesh_draws(world: &World, assets: &dyn AssetResolver) -> Vec<MeshDraw> {
    let mut draws = Vec::new();
    for (entity, _, renderer) in world.query2::<TransformComponent, MeshRendererComponent>() {
        let Some(transform) = world_matrix(world, entity) else {
            continue;
        };
        let Some(mesh) = assets.mesh(renderer.mesh) else {
            log::warn!("{entity}: mesh {} not found, draw skipped", renderer.mesh);
            continue;
        };
        let Some(material) = assets.material(renderer.material) else {
            log::warn!("{entity}: material {} not found, draw skipped", renderer.material);
            continue;
        };
        draws.push(MeshDraw {
            transform,
            mesh,
            material,
            instanced: renderer.instanced,
        });
    }
    draws
}

fn render_shadows(
    draws: &[MeshDraw],
    dispatcher: &mut RenderDispatcher,
    backend: &mut dyn RenderBackend,
    frame: &FrameInputs<'_>,
) {
    lantern_core::profile_scope!("render: shadow passes");

    // The last directional light is the one bound for lighting.
    let sun = frame.lights.iter().rev().find_map(|light| match light {
        SceneLight::Directional(l) => Some(l),
        SceneLight::Point { .. } => None,
    });
    let Some(sun) = sun.filter(|l| l.cast_shadows) else {
        return;
    };

    backend.set_culling(false);
    for (cascade, split) in frame.cascades.iter().enumerate() {
        let (view, projection) = cascade_matrices(frame.camera.position, sun.direction, split);
        backend.begin_shadow_pass(cascade, &(projection * view));
        dispatcher.begin_pass(view, projection, Vec::new());
        for draw in draws {
            dispatcher.draw_depth(backend, &draw.mesh, &draw.transform);
        }
        backend.end_shadow_pass();
    }
    backend.set_culling(true);
}

fn sprite_draw(
    assets: &dyn AssetResolver,
    entity: Entity,
    transform: Mat4,
    sprite: &SpriteRendererComponent,
) -> Option<SpriteDraw> {
    let texture = if sprite.texture.is_nil() {
        None
    } else {
        match assets.texture(sprite.texture) {
            Some(texture) => Some(texture),
            None => {
                log::warn!("{entity}: texture {} not found, sprite skipped", sprite.texture);
                return None;
            }
        }
    };
    Some(SpriteDraw {
        entity,
        transform,
        color: sprite.color,
        texture,
        tiling_factor: sprite.tiling_factor,
    })
}

/// Renders one frame of `world` through `backend`.
///
/// Shadow passes come first, one per cascade with culling disabled, when
/// the last directional light casts shadows. The main pass follows, ending with a
/// batch flush, and sprites are drawn last.
pub fn render_world(
    world: &World,
    assets: &dyn AssetResolver,
    dispatcher: &mut RenderDispatcher,
    backend: &mut dyn RenderBackend,
    frame: FrameInputs<'_>,
) {
    lantern_core::profile_function!();

    dispatcher.begin_frame();
    let draws = collect_mesh_draws(world, assets);

    render_shadows(&draws, dispatcher, backend, &frame);

    {
        lantern_core::profile_scope!("render: main pass");
        let camera = frame.camera;
        backend.begin_main_pass(&camera.view, &camera.projection);

        let mut uniforms = frame.globals;
        uniforms.extend(light_uniforms(frame.lights));
        dispatcher.begin_pass(camera.view, camera.projection, uniforms);
        for draw in &draws {
            dispatcher.draw_mesh(backend, &draw.mesh, &draw.material, &draw.transform, draw.instanced);
        }
        dispatcher.flush(backend);
        let stats = dispatcher.stats();
        lantern_core::profile_plot!("render: draw calls", stats.immediate_draws + stats.batch_draws);
    }

    lantern_core::profile_scope!("render: sprites");
    for (entity, _, sprite) in world.query2::<TransformComponent, SpriteRendererComponent>() {
        let Some(transform) = world_matrix(world, entity) else {
            continue;
        };
        if let Some(draw) = sprite_draw(assets, entity, transform, sprite) {
            backend.draw_sprite(&draw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DirectionalLight, IdComponent};
    use crate::rendering::backend::{RecordedCall, RecordingBackend};
    use lantern_core::Uuid;
    use lantern_core::assets::AssetCache;
    use lantern_core::mesh::generators::generate_cube;

    struct Fixture {
        world: World,
        assets: AssetCache,
        material: Uuid,
    }

    fn fixture(instanced: bool) -> Fixture {
        let assets = AssetCache::new();
        let mesh = assets.insert_mesh(generate_cube(Uuid::from_u64(1), 0.5));
        let material = assets.insert_material(Material::new(Uuid::from_u64(2), "lit"));

        let mut world = World::new();
        for x in 0..3 {
            let e = world.spawn();
            world.insert(e, IdComponent::new(Uuid::new())).unwrap();
            world
                .insert(e, TransformComponent::from_translation(Vec3::new(x as f32, 0.0, 0.0)))
                .unwrap();
            let renderer = MeshRendererComponent::new(mesh, material);
            let renderer = if instanced { renderer.instanced() } else { renderer };
            world.insert(e, renderer).unwrap();
        }
        Fixture {
            world,
            assets,
            material,
        }
    }

    fn camera() -> CameraView {
        CameraView::from_camera_world(&Mat4::identity(), Mat4::identity()).unwrap()
    }

    fn cascades() -> Vec<CascadeSplit> {
        vec![CascadeSplit { near: -2.0, far: 40.0 }, CascadeSplit { near: -6.0, far: 100.0 }]
    }

    #[test]
    fn shadow_passes_precede_main_pass() {
        let f = fixture(false);
        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        let lights = [SceneLight::Directional(DirectionalLight::default())];
        let cascades = cascades();

        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights: &lights,
                globals: Vec::new(),
                cascades: &cascades,
            },
        );

        let calls = &backend.calls;
        assert_eq!(calls[0], RecordedCall::SetCulling(false));
        assert_eq!(calls[1], RecordedCall::BeginShadowPass { cascade: 0 });
        let culling_on = backend.position_of(&RecordedCall::SetCulling(true)).unwrap();
        let main = backend.position_of(&RecordedCall::BeginMainPass).unwrap();
        assert!(culling_on < main);
        // 3 meshes per cascade, then 3 lit draws.
        assert_eq!(backend.draws_with(Uuid::NIL), 6);
        assert_eq!(backend.draws_with(f.material), 3);
    }

    fn shadow_pass_count(f: &Fixture, lights: &[SceneLight], cascades: &[CascadeSplit]) -> usize {
        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights,
                globals: Vec::new(),
                cascades,
            },
        );
        backend
            .calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::BeginShadowPass { .. }))
            .count()
    }

    #[test]
    fn shadows_follow_last_directional_light() {
        let f = fixture(false);
        let cascades = cascades();
        let caster = SceneLight::Directional(DirectionalLight::default());
        let dark = SceneLight::placeholder();

        assert_eq!(shadow_pass_count(&f, &[caster, caster], &cascades), cascades.len());
        assert_eq!(shadow_pass_count(&f, &[caster, dark], &cascades), 0);
        assert_eq!(shadow_pass_count(&f, &[dark, caster], &cascades), cascades.len());
    }

    #[test]
    fn no_shadow_pass_without_casters() {
        let f = fixture(false);
        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        let lights = [SceneLight::placeholder()];
        let cascades = cascades();

        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights: &lights,
                globals: Vec::new(),
                cascades: &cascades,
            },
        );
        assert_eq!(backend.calls[0], RecordedCall::BeginMainPass);
        assert_eq!(backend.draws_with(Uuid::NIL), 0);
    }

    #[test]
    fn instanced_meshes_draw_once() {
        let f = fixture(true);
        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        let lights = [SceneLight::placeholder()];

        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights: &lights,
                globals: Vec::new(),
                cascades: &[],
            },
        );
        assert_eq!(backend.draws_with(f.material), 1);
        assert_eq!(dispatcher.stats().batched_meshes, 3);
        assert_eq!(dispatcher.batch(f.material).map(|b| b.index_count()), Some(0));
    }

    #[test]
    fn missing_assets_skip_draws() {
        let mut f = fixture(false);
        let stray = f.world.spawn();
        f.world.insert(stray, TransformComponent::default()).unwrap();
        f.world
            .insert(stray, MeshRendererComponent::new(Uuid::from_u64(404), f.material))
            .unwrap();
        f.world
            .insert(
                stray,
                SpriteRendererComponent {
                    texture: Uuid::from_u64(405),
                    ..SpriteRendererComponent::default()
                },
            )
            .unwrap();

        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights: &[],
                globals: Vec::new(),
                cascades: &[],
            },
        );
        assert_eq!(backend.draws_with(f.material), 3);
        assert!(!backend.calls.iter().any(|c| matches!(c, RecordedCall::Sprite { .. })));
    }

    #[test]
    fn sprites_follow_main_pass() {
        let mut f = fixture(false);
        let sprite = f.world.spawn();
        f.world.insert(sprite, TransformComponent::default()).unwrap();
        f.world.insert(sprite, SpriteRendererComponent::default()).unwrap();

        let mut dispatcher = RenderDispatcher::new(4);
        let mut backend = RecordingBackend::new();
        render_world(
            &f.world,
            &f.assets,
            &mut dispatcher,
            &mut backend,
            FrameInputs {
                camera: camera(),
                lights: &[],
                globals: Vec::new(),
                cascades: &[],
            },
        );
        let last = backend.calls.last().cloned();
        assert_eq!(
            last,
            Some(RecordedCall::Sprite {
                entity: sprite,
                texture: None
            })
        );
    }
}

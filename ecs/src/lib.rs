//! # Lantern ECS
//!
//! Scene graph, physics bridges and batched draw submission for the Lantern
//! runtime.
//!
//! ## Core Types
//!
//! - [`Entity`] — Lightweight generational entity identifier
//! - [`World`] — Sparse-set component store keyed by entity
//! - [`Scene`] — Entity store plus identity index, physics and renderer
//!
//! ## Subsystems
//!
//! - [`hierarchy`] — Parent links, world matrices and pose-preserving reparenting
//! - [`physics`] — 2D and 3D rapier bridges with transform write-back
//! - [`rendering`] — Shadow, main and sprite passes over a [`rendering::RenderBackend`]
//! - [`scene_file`] — RON save and load of whole scenes
//! - [`settings`] — Physics and renderer tunables
//!
//! See `DESIGN.md` at the repository root for architecture decisions.

pub mod components;
mod entity;
pub mod hierarchy;
pub mod physics;
pub mod rendering;
mod scene;
pub mod scene_file;
pub mod settings;
mod sparse_set;
mod world;

pub use entity::Entity;
pub use scene::{Scene, SceneError, SceneLighting};
pub use settings::{CascadeSplit, PhysicsSettings2D, PhysicsSettings3D, RendererSettings, SceneSettings};
pub use world::{EntityNotAlive, World};

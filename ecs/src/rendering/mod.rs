//! Draw submission for scene entities.
//!
//! The GPU itself stays behind [`RenderBackend`]. This module decides what
//! gets drawn and in which order.
//!
//! # Passes
//!
//! [`render_world`] issues, per frame:
//!
//! 1. one depth-only pass per shadow cascade for every shadow-casting
//!    directional light, with culling disabled,
//! 2. the main pass: non-instanced meshes immediately, instanced meshes
//!    through per-material batches flushed at the end,
//! 3. sprites.
//!
//! # Batching
//!
//! [`RenderDispatcher`] keys batches on material id and opens at most
//! `max_batches` of them. A mesh whose material would need one more batch is
//! refused with [`BatchError`], logged, and skipped for that frame.

mod backend;
mod dispatcher;
mod lighting;
mod systems;

pub use backend::{DrawCall, RecordedCall, RecordingBackend, RenderBackend, SpriteDraw, VertexAttributes};
pub use dispatcher::{BatchError, DispatchStats, RenderBatch, RenderDispatcher};
pub use lighting::{SceneLight, cascade_matrices, light_uniforms};
pub use systems::{CameraView, FrameInputs, render_world};

//! Contract with the GPU side.
//!
//! The scene hands finished draw data to a [`RenderBackend`]. Buffer upload,
//! shader binding and error reporting stay inside the backend; nothing here
//! returns a result.

use std::sync::Arc;

use lantern_core::Uuid;
use lantern_core::material::{Material, ShaderUniform};
use lantern_core::math::{Mat4, Vec4};
use lantern_core::texture::Texture;

use crate::Entity;

/// Borrowed vertex attribute arrays, laid out like [`Mesh`](lantern_core::mesh::Mesh).
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexAttributes<'a> {
    pub positions: &'a [f32],
    pub colors: &'a [f32],
    pub normals: &'a [f32],
    pub tangents: &'a [f32],
    pub bitangents: &'a [f32],
    pub texcoords: &'a [f32],
}

impl VertexAttributes<'_> {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Everything one indexed draw needs.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub vertices: VertexAttributes<'a>,
    pub indices: &'a [u32],
    pub material: &'a Material,
    /// Model matrix, bound as `u_Transform`. Identity for batches, whose
    /// vertices are already in world space.
    pub transform: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    /// Light and global uniforms shared by every draw of the pass.
    pub uniforms: &'a [ShaderUniform],
}

/// A textured or flat quad in world space.
#[derive(Debug, Clone)]
pub struct SpriteDraw {
    pub entity: Entity,
    pub transform: Mat4,
    pub color: Vec4,
    pub texture: Option<Arc<Texture>>,
    pub tiling_factor: f32,
}

/// Receives passes and draws in submission order.
pub trait RenderBackend {
    fn set_culling(&mut self, enabled: bool);

    /// Starts rendering depth for one cascade of a directional light.
    fn begin_shadow_pass(&mut self, cascade: usize, light_view_projection: &Mat4);

    fn end_shadow_pass(&mut self);

    fn begin_main_pass(&mut self, view: &Mat4, projection: &Mat4);

    fn draw_indexed(&mut self, call: &DrawCall<'_>);

    fn draw_sprite(&mut self, sprite: &SpriteDraw);
}

/// One call observed by a [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    SetCulling(bool),
    BeginShadowPass { cascade: usize },
    EndShadowPass,
    BeginMainPass,
    Draw {
        material: Uuid,
        vertex_count: usize,
        index_count: usize,
        transform: Mat4,
    },
    Sprite {
        entity: Entity,
        texture: Option<Uuid>,
    },
}

/// Backend that only remembers what it was asked to do.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<RecordedCall>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Indexed draws recorded so far.
    pub fn draws(&self) -> impl Iterator<Item = &RecordedCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, RecordedCall::Draw { .. }))
    }

    /// Indexed draws that used `material`.
    pub fn draws_with(&self, material: Uuid) -> usize {
        self.draws()
            .filter(|c| matches!(c, RecordedCall::Draw { material: m, .. } if *m == material))
            .count()
    }

    pub fn position_of(&self, call: &RecordedCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }
}

impl RenderBackend for RecordingBackend {
    fn set_culling(&mut self, enabled: bool) {
        self.calls.push(RecordedCall::SetCulling(enabled));
    }

    fn begin_shadow_pass(&mut self, cascade: usize, _light_view_projection: &Mat4) {
        self.calls.push(RecordedCall::BeginShadowPass { cascade });
    }

    fn end_shadow_pass(&mut self) {
        self.calls.push(RecordedCall::EndShadowPass);
    }

    fn begin_main_pass(&mut self, _view: &Mat4, _projection: &Mat4) {
        self.calls.push(RecordedCall::BeginMainPass);
    }

    fn draw_indexed(&mut self, call: &DrawCall<'_>) {
        self.calls.push(RecordedCall::Draw {
            material: call.material.id,
            vertex_count: call.vertices.vertex_count(),
            index_count: call.indices.len(),
            transform: call.transform,
        });
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw) {
        self.calls.push(RecordedCall::Sprite {
            entity: sprite.entity,
            texture: sprite.texture.as_ref().map(|t| t.id),
        });
    }
}

//! Per-frame draw submission with per-material batching.
//!
//! Non-instanced meshes go straight to the backend through a shared scratch
//! buffer. Instanced meshes are transformed into world space and appended to
//! the batch of their material; [`RenderDispatcher::flush`] then issues one
//! draw per non-empty batch and empties every batch for the next frame.

use std::collections::HashMap;
use std::sync::Arc;

use lantern_core::Uuid;
use lantern_core::material::{Material, ShaderUniform, UniformValue};
use lantern_core::math::{Mat4, Vec3, transform_point, transform_vector};
use lantern_core::mesh::Mesh;

use super::backend::{DrawCall, RenderBackend, VertexAttributes};
use crate::settings::RendererSettings;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("no batch left for material {material}: all {max} batches are in use")]
    BatchLimitReached { material: Uuid, max: usize },
}

/// Growable attribute storage. Cleared between uses but never shrunk.
#[derive(Debug, Default)]
struct VertexBuffers {
    positions: Vec<f32>,
    colors: Vec<f32>,
    normals: Vec<f32>,
    tangents: Vec<f32>,
    bitangents: Vec<f32>,
    texcoords: Vec<f32>,
}

impl VertexBuffers {
    fn clear(&mut self) {
        self.positions.clear();
        self.colors.clear();
        self.normals.clear();
        self.tangents.clear();
        self.bitangents.clear();
        self.texcoords.clear();
    }

    fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    fn attributes(&self) -> VertexAttributes<'_> {
        VertexAttributes {
            positions: &self.positions,
            colors: &self.colors,
            normals: &self.normals,
            tangents: &self.tangents,
            bitangents: &self.bitangents,
            texcoords: &self.texcoords,
        }
    }

    /// Overwrites the buffers with the mesh's own arrays.
    fn load(&mut self, mesh: &Mesh) {
        self.clear();
        self.positions.extend_from_slice(&mesh.positions);
        self.colors.extend_from_slice(&mesh.colors);
        self.normals.extend_from_slice(&mesh.normals);
        self.tangents.extend_from_slice(&mesh.tangents);
        self.bitangents.extend_from_slice(&mesh.bitangents);
        self.texcoords.extend_from_slice(&mesh.texcoords);
    }

    /// Appends the mesh in world space. Attributes the mesh lacks are
    /// filled with defaults so every array stays aligned with `positions`.
    fn append_transformed(&mut self, mesh: &Mesh, model: &Mat4) {
        let count = mesh.vertex_count();
        let linear = model.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map_or(linear, |inverse| inverse.transpose());

        for p in mesh.positions.chunks_exact(3) {
            let p = transform_point(model, Vec3::new(p[0], p[1], p[2]));
            self.positions.extend_from_slice(&[p.x, p.y, p.z]);
        }
        append_directions(&mut self.normals, &mesh.normals, count, |n| {
            (normal_matrix * n).try_normalize(f32::EPSILON).unwrap_or(n)
        });
        append_directions(&mut self.tangents, &mesh.tangents, count, |t| {
            transform_vector(model, t)
        });
        append_directions(&mut self.bitangents, &mesh.bitangents, count, |b| {
            transform_vector(model, b)
        });
        append_or_fill(&mut self.colors, &mesh.colors, count * 4, 1.0);
        append_or_fill(&mut self.texcoords, &mesh.texcoords, count * 2, 0.0);
    }
}

fn append_or_fill(dst: &mut Vec<f32>, src: &[f32], len: usize, fill: f32) {
    if src.len() == len {
        dst.extend_from_slice(src);
    } else {
        dst.resize(dst.len() + len, fill);
    }
}

fn append_directions(dst: &mut Vec<f32>, src: &[f32], count: usize, f: impl Fn(Vec3) -> Vec3) {
    if src.len() != count * 3 {
        dst.resize(dst.len() + count * 3, 0.0);
        return;
    }
    for v in src.chunks_exact(3) {
        let v = f(Vec3::new(v[0], v[1], v[2]));
        dst.extend_from_slice(&[v.x, v.y, v.z]);
    }
}

/// Geometry accumulated for one material during a frame.
#[derive(Debug)]
pub struct RenderBatch {
    material: Arc<Material>,
    vertices: VertexBuffers,
    indices: Vec<u32>,
}

impl RenderBatch {
    fn new(material: Arc<Material>) -> Self {
        Self {
            material,
            vertices: VertexBuffers::default(),
            indices: Vec::new(),
        }
    }

    pub fn material_id(&self) -> Uuid {
        self.material.id
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.vertex_count()
    }

    fn append(&mut self, mesh: &Mesh, model: &Mat4) {
        let base = self.vertices.vertex_count() as u32;
        self.vertices.append_transformed(mesh, model);
        self.indices.extend(mesh.indices.iter().map(|i| base + i));
    }

    fn reset(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }
}

/// Counters for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Draw calls issued by the immediate path.
    pub immediate_draws: usize,
    /// Meshes appended to a batch.
    pub batched_meshes: usize,
    /// Draw calls issued by [`RenderDispatcher::flush`].
    pub batch_draws: usize,
    /// Draws refused because the batch limit was reached.
    pub rejected: usize,
}

/// View, projection and shared uniforms for the pass being recorded.
#[derive(Debug, Clone)]
struct PassState {
    view: Mat4,
    projection: Mat4,
    uniforms: Vec<ShaderUniform>,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            view: Mat4::identity(),
            projection: Mat4::identity(),
            uniforms: Vec::new(),
        }
    }
}

/// Groups draw requests by material and forwards them to a backend.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use lantern_core::Uuid;
/// use lantern_core::material::Material;
/// use lantern_core::math::Mat4;
/// use lantern_core::mesh::generators::generate_quad;
/// use lantern_ecs::rendering::{RecordingBackend, RenderDispatcher};
///
/// let mut dispatcher = RenderDispatcher::new(8);
/// let mut backend = RecordingBackend::new();
/// let quad = generate_quad(Uuid::from_u64(1), 0.5, 0.5);
/// let material = Arc::new(Material::new(Uuid::from_u64(2), "flat"));
///
/// dispatcher.begin_pass(Mat4::identity(), Mat4::identity(), Vec::new());
/// dispatcher.draw_mesh(&mut backend, &quad, &material, &Mat4::identity(), true);
/// dispatcher.draw_mesh(&mut backend, &quad, &material, &Mat4::identity(), true);
/// dispatcher.flush(&mut backend);
/// assert_eq!(backend.draws_with(material.id), 1);
/// ```
#[derive(Debug)]
pub struct RenderDispatcher {
    max_batches: usize,
    batches: Vec<RenderBatch>,
    lookup: HashMap<Uuid, usize>,
    scratch: VertexBuffers,
    scratch_indices: Vec<u32>,
    pass: PassState,
    depth_material: Arc<Material>,
    stats: DispatchStats,
}

impl RenderDispatcher {
    pub fn new(max_batches: usize) -> Self {
        Self {
            max_batches,
            batches: Vec::new(),
            lookup: HashMap::new(),
            scratch: VertexBuffers::default(),
            scratch_indices: Vec::new(),
            pass: PassState::default(),
            depth_material: Arc::new(Material::new(Uuid::NIL, "DepthOnly")),
            stats: DispatchStats::default(),
        }
    }

    pub fn from_settings(settings: &RendererSettings) -> Self {
        Self::new(settings.max_batches)
    }

    pub fn max_batches(&self) -> usize {
        self.max_batches
    }

    /// Number of batches opened so far. Batches live as long as the
    /// dispatcher; only their contents are reset by [`Self::flush`].
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batch(&self, material: Uuid) -> Option<&RenderBatch> {
        self.lookup.get(&material).map(|&i| &self.batches[i])
    }

    pub fn batches(&self) -> impl Iterator<Item = &RenderBatch> {
        self.batches.iter()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Material bound by [`Self::draw_depth`].
    pub fn depth_material(&self) -> &Material {
        &self.depth_material
    }

    /// Sets the camera and shared uniforms for the following draws.
    ///
    /// The view and projection are also appended to the uniform set as
    /// `u_ViewMatrix`, `u_ProjectionMatrix` and `u_ViewProjection`.
    pub fn begin_pass(&mut self, view: Mat4, projection: Mat4, mut uniforms: Vec<ShaderUniform>) {
        uniforms.push(ShaderUniform::new("u_ViewMatrix", UniformValue::Mat4(view)));
        uniforms.push(ShaderUniform::new("u_ProjectionMatrix", UniformValue::Mat4(projection)));
        uniforms.push(ShaderUniform::new("u_ViewProjection", UniformValue::Mat4(projection * view)));
        self.pass = PassState {
            view,
            projection,
            uniforms,
        };
    }

    /// Clears the per-frame counters.
    pub fn begin_frame(&mut self) {
        self.stats = DispatchStats::default();
    }

    /// Routes a mesh to the batched path when `instanced` is set, otherwise
    /// draws it immediately. A refused batch is logged and the draw skipped.
    pub fn draw_mesh(
        &mut self,
        backend: &mut dyn RenderBackend,
        mesh: &Mesh,
        material: &Arc<Material>,
        transform: &Mat4,
        instanced: bool,
    ) {
        if !instanced {
            self.draw_immediate(backend, mesh, material, transform);
            return;
        }
        if let Err(err) = self.submit_batched(mesh, material, transform) {
            log::error!("{err}; skipping mesh {}", mesh.id);
        }
    }

    /// Copies the mesh into the scratch buffer and draws it at once.
    pub fn draw_immediate(
        &mut self,
        backend: &mut dyn RenderBackend,
        mesh: &Mesh,
        material: &Material,
        transform: &Mat4,
    ) {
        self.scratch.load(mesh);
        self.scratch_indices.clear();
        self.scratch_indices.extend_from_slice(&mesh.indices);

        backend.draw_indexed(&DrawCall {
            vertices: self.scratch.attributes(),
            indices: &self.scratch_indices,
            material,
            transform: *transform,
            view: self.pass.view,
            projection: self.pass.projection,
            uniforms: &self.pass.uniforms,
        });
        self.stats.immediate_draws += 1;
    }

    /// Draws the mesh with the depth-only material, for shadow passes.
    pub fn draw_depth(&mut self, backend: &mut dyn RenderBackend, mesh: &Mesh, transform: &Mat4) {
        let material = Arc::clone(&self.depth_material);
        self.draw_immediate(backend, mesh, &material, transform);
    }

    /// Appends the mesh, in world space, to its material's batch. Opens the
    /// batch on first use of the material.
    pub fn submit_batched(
        &mut self,
        mesh: &Mesh,
        material: &Arc<Material>,
        transform: &Mat4,
    ) -> Result<(), BatchError> {
        let index = match self.lookup.get(&material.id) {
            Some(&index) => index,
            None => {
                if self.batches.len() >= self.max_batches {
                    self.stats.rejected += 1;
                    return Err(BatchError::BatchLimitReached {
                        material: material.id,
                        max: self.max_batches,
                    });
                }
                log::debug!("opening batch {} for material {}", self.batches.len(), material.id);
                self.batches.push(RenderBatch::new(Arc::clone(material)));
                self.lookup.insert(material.id, self.batches.len() - 1);
                self.batches.len() - 1
            }
        };

        let batch = &mut self.batches[index];
        // Pick up a reloaded material.
        if !Arc::ptr_eq(&batch.material, material) {
            batch.material = Arc::clone(material);
        }
        batch.append(mesh, transform);
        self.stats.batched_meshes += 1;
        Ok(())
    }

    /// Issues one draw per non-empty batch, then empties every batch.
    pub fn flush(&mut self, backend: &mut dyn RenderBackend) {
        lantern_core::profile_scope!("render: flush batches");

        let identity = Mat4::identity();
        for batch in &mut self.batches {
            if batch.indices.is_empty() {
                continue;
            }
            backend.draw_indexed(&DrawCall {
                vertices: batch.vertices.attributes(),
                indices: &batch.indices,
                material: &batch.material,
                transform: identity,
                view: self.pass.view,
                projection: self.pass.projection,
                uniforms: &self.pass.uniforms,
            });
            self.stats.batch_draws += 1;
            batch.reset();
        }
    }
}

impl Default for RenderDispatcher {
    fn default() -> Self {
        Self::from_settings(&RendererSettings::default())
    }
}

use crate::uuid::Uuid;

/// CPU-side mesh with one flat float array per vertex attribute.
///
/// Attribute arrays are tightly packed: positions, normals, tangents and
/// bitangents use 3 floats per vertex, colors 4 and texture coordinates 2.
/// Optional attributes may be left empty. Indices are relative to this
/// mesh's own vertex range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub id: Uuid,
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub tangents: Vec<f32>,
    pub bitangents: Vec<f32>,
    pub texcoords: Vec<f32>,
    pub indices: Vec<u32>,
    pub label: Option<String>,
}

impl Mesh {
    /// Create an empty mesh with the given identity.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_positions(mut self, positions: Vec<f32>) -> Self {
        self.positions = positions;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = colors;
        self
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<f32>) -> Self {
        self.normals = normals;
        self
    }

    #[must_use]
    pub fn with_texcoords(mut self, texcoords: Vec<f32>) -> Self {
        self.texcoords = texcoords;
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of vertices, inferred from the position array.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Returns vertex `i` as a position triple.
    pub fn position(&self, i: usize) -> Option<[f32; 3]> {
        let p = self.positions.get(i * 3..i * 3 + 3)?;
        Some([p[0], p[1], p[2]])
    }

    /// Iterates over index triples. A trailing partial triangle is ignored.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

//! Asset resolution by identity.
//!
//! The scene never holds live asset pointers: components store [`Uuid`]s and
//! resolve them through an [`AssetResolver`] at draw or body-creation time,
//! so a reloaded asset is picked up without touching any component.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::material::{Material, PhysicsMaterial};
use crate::mesh::Mesh;
use crate::texture::Texture;
use crate::uuid::Uuid;

/// Looks up assets by identity.
///
/// Called every frame; implementations are expected to cache. A `None`
/// result is a missing asset, which callers log and skip.
pub trait AssetResolver: Send + Sync {
    fn mesh(&self, id: Uuid) -> Option<Arc<Mesh>>;
    fn material(&self, id: Uuid) -> Option<Arc<Material>>;
    fn physics_material(&self, id: Uuid) -> Option<Arc<PhysicsMaterial>>;
    fn texture(&self, id: Uuid) -> Option<Arc<Texture>>;
}

/// Thread-safe in-memory asset store.
///
/// Inserting under an existing id replaces the asset; holders of the old
/// `Arc` keep the old value until they resolve again.
#[derive(Default)]
pub struct AssetCache {
    meshes: RwLock<HashMap<Uuid, Arc<Mesh>>>,
    materials: RwLock<HashMap<Uuid, Arc<Material>>>,
    physics_materials: RwLock<HashMap<Uuid, Arc<PhysicsMaterial>>>,
    textures: RwLock<HashMap<Uuid, Arc<Texture>>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a mesh under `mesh.id`.
    pub fn insert_mesh(&self, mesh: Mesh) -> Uuid {
        let id = mesh.id;
        self.meshes.write().insert(id, Arc::new(mesh));
        id
    }

    /// Stores a material under `material.id`.
    pub fn insert_material(&self, material: Material) -> Uuid {
        let id = material.id;
        self.materials.write().insert(id, Arc::new(material));
        id
    }

    pub fn insert_physics_material(&self, id: Uuid, material: PhysicsMaterial) {
        self.physics_materials.write().insert(id, Arc::new(material));
    }

    /// Stores a texture under `texture.id`.
    pub fn insert_texture(&self, texture: Texture) -> Uuid {
        let id = texture.id;
        self.textures.write().insert(id, Arc::new(texture));
        id
    }

    /// Drops every asset with this id, whatever its kind.
    pub fn remove(&self, id: Uuid) {
        self.meshes.write().remove(&id);
        self.materials.write().remove(&id);
        self.physics_materials.write().remove(&id);
        self.textures.write().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.meshes.read().len()
            + self.materials.read().len()
            + self.physics_materials.read().len()
            + self.textures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetResolver for AssetCache {
    fn mesh(&self, id: Uuid) -> Option<Arc<Mesh>> {
        self.meshes.read().get(&id).cloned()
    }

    fn material(&self, id: Uuid) -> Option<Arc<Material>> {
        self.materials.read().get(&id).cloned()
    }

    fn physics_material(&self, id: Uuid) -> Option<Arc<PhysicsMaterial>> {
        self.physics_materials.read().get(&id).cloned()
    }

    fn texture(&self, id: Uuid) -> Option<Arc<Texture>> {
        self.textures.read().get(&id).cloned()
    }
}

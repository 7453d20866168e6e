//! CPU-side mesh data and generators.
//!
//! - [`Mesh`] - Per-attribute float arrays plus a u32 index list
//! - [`generators`] - Quad and cube meshes for tests and placeholders

mod data;
pub mod generators;

pub use data::Mesh;

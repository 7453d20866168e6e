//! # Lantern Core
//!
//! Math, identity and asset types shared by the Lantern scene runtime.

pub mod assets;
pub mod material;
pub mod math;
pub mod mesh;
pub mod profiling;
pub mod texture;
pub mod uuid;

pub use crate::uuid::Uuid;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

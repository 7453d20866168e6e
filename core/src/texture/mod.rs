//! Texture asset descriptor.
//!
//! Pixel data lives with the render backend; the scene only needs identity
//! and size to build sprite draws.

use crate::uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub label: Option<String>,
}

impl Texture {
    pub fn new(id: Uuid, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            label: None,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

//! Local transform with a parent link.
//!
//! The parent reference and the child list are owned by
//! [`hierarchy`](crate::hierarchy); use [`set_parent`](crate::hierarchy::set_parent)
//! to change them so both sides stay consistent.

use lantern_core::Uuid;
use lantern_core::math::{Mat4, Vec3, compose_transform};

use crate::Entity;

/// Translation, XYZ Euler rotation (radians) and scale relative to the parent.
///
/// # Example
///
/// ```
/// use lantern_ecs::components::TransformComponent;
/// use lantern_core::math::Vec3;
///
/// let t = TransformComponent::from_translation(Vec3::new(1.0, 2.0, 3.0))
///     .with_scale(Vec3::new(2.0, 2.0, 2.0));
/// assert_eq!(t.local_matrix()[(0, 3)], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    pub(crate) parent: Option<Entity>,
    pub(crate) children: Vec<Uuid>,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl TransformComponent {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// `T * R * S` of this node alone.
    pub fn local_matrix(&self) -> Mat4 {
        compose_transform(self.translation, self.rotation, self.scale)
    }

    pub fn parent(&self) -> Option<Entity> {
        self.parent
    }

    /// Identities of the direct children, in insertion order.
    pub fn children(&self) -> &[Uuid] {
        &self.children
    }

    /// Same pose, no hierarchy links. Used when a transform is copied onto
    /// a different entity.
    pub(crate) fn detached(&self) -> Self {
        Self {
            translation: self.translation,
            rotation: self.rotation,
            scale: self.scale,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Overwrites the pose with a decomposed matrix.
    pub(crate) fn set_pose(&mut self, (translation, rotation, scale): (Vec3, Vec3, Vec3)) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
    }
}

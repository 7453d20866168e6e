//! On-disk records for scenes.
//!
//! A [`SerializedScene`] mirrors the file layout: an `Entities` list and a
//! `Lighting` block. Ids are bare integers and `0` means "none"; vectors
//! are float sequences. Component blocks are optional and omitted when the
//! entity lacks the component. Scripts are native code and are not saved.

use lantern_core::Uuid;
use lantern_core::math::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::components::{
    CameraComponent, DirectionalLight, LightComponent, MeshRendererComponent, PointLight,
    Projection, SpriteRendererComponent,
};
use crate::physics::{
    BodyType, Collider2D, Collider3D, Rigidbody2DComponent, Rigidbody3DComponent,
};
use crate::scene::SceneLighting;

/// A whole scene, suitable for file I/O.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SerializedScene {
    /// Parents are listed before their children when saved; loading does
    /// not depend on the order.
    pub entities: Vec<SerializedEntity>,
    pub lighting: SceneLighting,
}

/// One entity and its components.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SerializedEntity {
    /// Required; a record with id `0` is skipped.
    pub id: Uuid,
    pub owner: Uuid,
    pub tag: String,
    /// Required; a record without it is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<CameraRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<LightRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh_renderer: Option<MeshRendererRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite_renderer: Option<SpriteRendererRecord>,
    #[serde(rename = "Rigidbody2D", skip_serializing_if = "Option::is_none")]
    pub rigidbody_2d: Option<Rigidbody2DRecord>,
    #[serde(rename = "Collider2D", skip_serializing_if = "Option::is_none")]
    pub collider_2d: Option<Vec<Collider2D>>,
    #[serde(rename = "Rigidbody3D", skip_serializing_if = "Option::is_none")]
    pub rigidbody_3d: Option<Rigidbody3DRecord>,
    #[serde(rename = "Collider3D", skip_serializing_if = "Option::is_none")]
    pub collider_3d: Option<Vec<Collider3D>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TransformRecord {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Parent entity id, `0` for roots.
    pub parent: Uuid,
    pub children: Vec<Uuid>,
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self {
            translation: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            parent: Uuid::NIL,
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all_fields = "PascalCase")]
pub enum ProjectionRecord {
    Perspective { fov: f32, near: f32, far: f32 },
    Orthographic { size: f32, near: f32, far: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraRecord {
    pub projection: ProjectionRecord,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub fixed_aspect_ratio: bool,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f32,
}

fn default_aspect_ratio() -> f32 {
    16.0 / 9.0
}

impl From<&CameraComponent> for CameraRecord {
    fn from(c: &CameraComponent) -> Self {
        let projection = match c.projection {
            Projection::Perspective { fov_y, near, far } => ProjectionRecord::Perspective { fov: fov_y, near, far },
            Projection::Orthographic { size, near, far } => ProjectionRecord::Orthographic { size, near, far },
        };
        Self {
            projection,
            primary: c.primary,
            fixed_aspect_ratio: c.fixed_aspect_ratio,
            aspect_ratio: c.aspect_ratio,
        }
    }
}

impl From<CameraRecord> for CameraComponent {
    fn from(r: CameraRecord) -> Self {
        let projection = match r.projection {
            ProjectionRecord::Perspective { fov, near, far } => Projection::Perspective { fov_y: fov, near, far },
            ProjectionRecord::Orthographic { size, near, far } => Projection::Orthographic { size, near, far },
        };
        Self {
            projection,
            primary: r.primary,
            fixed_aspect_ratio: r.fixed_aspect_ratio,
            aspect_ratio: r.aspect_ratio,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all_fields = "PascalCase")]
pub enum LightRecord {
    Directional {
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        #[serde(default)]
        cast_shadows: bool,
    },
    Point {
        color: Vec3,
        intensity: f32,
        radius: f32,
        #[serde(default)]
        cast_shadows: bool,
    },
}

impl From<&LightComponent> for LightRecord {
    fn from(light: &LightComponent) -> Self {
        match *light {
            LightComponent::Directional(l) => Self::Directional {
                direction: l.direction,
                color: l.color,
                intensity: l.intensity,
                cast_shadows: l.cast_shadows,
            },
            LightComponent::Point(l) => Self::Point {
                color: l.color,
                intensity: l.intensity,
                radius: l.radius,
                cast_shadows: l.cast_shadows,
            },
        }
    }
}

impl From<LightRecord> for LightComponent {
    fn from(record: LightRecord) -> Self {
        match record {
            LightRecord::Directional {
                direction,
                color,
                intensity,
                cast_shadows,
            } => Self::Directional(DirectionalLight {
                direction,
                color,
                intensity,
                cast_shadows,
            }),
            LightRecord::Point {
                color,
                intensity,
                radius,
                cast_shadows,
            } => Self::Point(PointLight {
                color,
                intensity,
                radius,
                cast_shadows,
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MeshRendererRecord {
    pub mesh: Uuid,
    /// Absent means no material.
    pub material: Uuid,
    pub instanced: bool,
}

impl From<&MeshRendererComponent> for MeshRendererRecord {
    fn from(c: &MeshRendererComponent) -> Self {
        Self {
            mesh: c.mesh,
            material: c.material,
            instanced: c.instanced,
        }
    }
}

impl From<MeshRendererRecord> for MeshRendererComponent {
    fn from(r: MeshRendererRecord) -> Self {
        Self {
            mesh: r.mesh,
            material: r.material,
            instanced: r.instanced,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SpriteRendererRecord {
    pub color: Vec4,
    pub texture: Uuid,
    pub tiling_factor: f32,
}

impl Default for SpriteRendererRecord {
    fn default() -> Self {
        Self::from(&SpriteRendererComponent::default())
    }
}

impl From<&SpriteRendererComponent> for SpriteRendererRecord {
    fn from(c: &SpriteRendererComponent) -> Self {
        Self {
            color: c.color,
            texture: c.texture,
            tiling_factor: c.tiling_factor,
        }
    }
}

impl From<SpriteRendererRecord> for SpriteRendererComponent {
    fn from(r: SpriteRendererRecord) -> Self {
        Self {
            color: r.color,
            texture: r.texture,
            tiling_factor: r.tiling_factor,
        }
    }
}

/// Body types are stored by name; an unknown name loads as `Dynamic`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Rigidbody2DRecord {
    pub body_type: String,
    pub fixed_rotation: bool,
}

impl Default for Rigidbody2DRecord {
    fn default() -> Self {
        Self::from(&Rigidbody2DComponent::default())
    }
}

impl From<&Rigidbody2DComponent> for Rigidbody2DRecord {
    fn from(c: &Rigidbody2DComponent) -> Self {
        Self {
            body_type: c.body_type.as_str().to_owned(),
            fixed_rotation: c.fixed_rotation,
        }
    }
}

impl From<Rigidbody2DRecord> for Rigidbody2DComponent {
    fn from(r: Rigidbody2DRecord) -> Self {
        Rigidbody2DComponent::new(BodyType::from_str_or_dynamic(&r.body_type))
            .with_fixed_rotation(r.fixed_rotation)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Rigidbody3DRecord {
    pub body_type: String,
    pub mass: f32,
    pub gravity_factor: f32,
}

impl Default for Rigidbody3DRecord {
    fn default() -> Self {
        Self::from(&Rigidbody3DComponent::default())
    }
}

impl From<&Rigidbody3DComponent> for Rigidbody3DRecord {
    fn from(c: &Rigidbody3DComponent) -> Self {
        Self {
            body_type: c.body_type.as_str().to_owned(),
            mass: c.mass,
            gravity_factor: c.gravity_factor,
        }
    }
}

impl From<Rigidbody3DRecord> for Rigidbody3DComponent {
    fn from(r: Rigidbody3DRecord) -> Self {
        Rigidbody3DComponent::new(BodyType::from_str_or_dynamic(&r.body_type))
            .with_mass(r.mass)
            .with_gravity_factor(r.gravity_factor)
    }
}

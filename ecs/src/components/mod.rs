//! Scene components.
//!
//! Every live entity created through [`Scene`](crate::Scene) carries an
//! [`IdComponent`], a [`TagComponent`] and a [`TransformComponent`]. The
//! remaining components are optional.

mod camera;
mod id;
mod light;
mod name;
mod renderer;
mod script;
mod transform;

pub use camera::{CameraComponent, Projection};
pub use id::IdComponent;
pub use light::{DirectionalLight, LightComponent, PointLight};
pub use name::TagComponent;
pub use renderer::{MeshRendererComponent, SpriteRendererComponent};
pub use script::{Script, ScriptComponent, ScriptContext};
pub use transform::TransformComponent;

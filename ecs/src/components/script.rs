//! Native behaviour attached to an entity.

use crate::{Entity, World};

/// Access handed to a script while it runs.
///
/// The script's own [`ScriptComponent`] is detached from the world for the
/// duration of the call, so the world can be borrowed mutably.
pub struct ScriptContext<'a> {
    pub world: &'a mut World,
    pub entity: Entity,
}

impl ScriptContext<'_> {
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.world.get::<T>(self.entity)
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.world.get_mut::<T>(self.entity)
    }
}

/// Per-entity behaviour. Created once on the first runtime update, updated
/// every frame before physics, destroyed at runtime stop.
pub trait Script: ScriptClone + 'static {
    fn on_create(&mut self, _ctx: &mut ScriptContext<'_>) {}
    fn on_update(&mut self, ctx: &mut ScriptContext<'_>, dt: f32);
    fn on_destroy(&mut self, _ctx: &mut ScriptContext<'_>) {}
}

/// Object-safe clone, implemented for every `Script + Clone`.
pub trait ScriptClone {
    fn box_clone(&self) -> Box<dyn Script>;
}

impl<T: Script + Clone> ScriptClone for T {
    fn box_clone(&self) -> Box<dyn Script> {
        Box::new(self.clone())
    }
}

/// Owns a boxed [`Script`] and whether its `on_create` has run.
pub struct ScriptComponent {
    pub(crate) instance: Option<Box<dyn Script>>,
    pub(crate) created: bool,
}

impl ScriptComponent {
    pub fn new(script: impl Script) -> Self {
        Self {
            instance: Some(Box::new(script)),
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

/// Copies start uncreated; the copy gets its own `on_create`.
impl Clone for ScriptComponent {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.as_ref().map(|s| s.box_clone()),
            created: false,
        }
    }
}

impl std::fmt::Debug for ScriptComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptComponent")
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

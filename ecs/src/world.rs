use std::any::TypeId;
use std::collections::HashMap;

use crate::entity::{Entity, EntityAllocator};
use crate::sparse_set::{ComponentStorage, SparseSet};

/// Error returned when an operation targets a destroyed or foreign entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not alive in this world")]
pub struct EntityNotAlive(pub Entity);

/// The entity store: live entities plus one typed table per component type.
///
/// Each World is fully self-contained. Handles from one world mean nothing
/// in another; cross-world references go through persistent UUIDs.
///
/// # Structural changes
///
/// The view iterators borrow the world immutably, so adding or removing
/// components while iterating is rejected at compile time. Collect the
/// entities first (see [`World::entities_with`]) and mutate afterwards.
///
/// # Example
///
/// ```
/// use lantern_ecs::World;
///
/// let mut world = World::new();
/// let e = world.spawn();
/// world.insert(e, 42u32).unwrap();
/// assert_eq!(world.get::<u32>(e), Some(&42));
/// ```
#[derive(Default)]
pub struct World {
    entities: EntityAllocator,
    storages: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Destroys an entity and drops all of its components.
    /// Returns false if the entity was not alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.entities.deallocate(entity) {
            return false;
        }
        for storage in self.storages.values_mut() {
            storage.remove_index(entity.index());
        }
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    pub fn entity_count(&self) -> u32 {
        self.entities.count()
    }

    /// Iterates over all live entities in slot order.
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    /// Adds or replaces a component. Returns the replaced value, if any.
    pub fn insert<T: 'static>(&mut self, entity: Entity, value: T) -> Result<Option<T>, EntityNotAlive> {
        if !self.is_alive(entity) {
            return Err(EntityNotAlive(entity));
        }
        Ok(self.storage_mut_or_default::<T>().insert(entity.index(), value))
    }

    /// Removes a component, returning it.
    pub fn remove<T: 'static>(&mut self, entity: Entity) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.remove(entity.index())
    }

    pub fn get<T: 'static>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage::<T>()?.get(entity.index())
    }

    pub fn get_mut<T: 'static>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.storage_mut::<T>()?.get_mut(entity.index())
    }

    pub fn has<T: 'static>(&self, entity: Entity) -> bool {
        self.is_alive(entity)
            && self
                .storages
                .get(&TypeId::of::<T>())
                .is_some_and(|s| s.contains_index(entity.index()))
    }

    /// Number of entities that carry a `T`.
    pub fn count<T: 'static>(&self) -> usize {
        self.storages
            .get(&TypeId::of::<T>())
            .map_or(0, |s| s.len())
    }

    /// View over every entity with a `T`.
    pub fn query<T: 'static>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.storage::<T>()
            .into_iter()
            .flat_map(|s| s.iter())
            .filter_map(|(idx, value)| Some((self.entities.entity_at_index(idx)?, value)))
    }

    /// View over every entity with a `T`, mutably.
    pub fn query_mut<T: 'static>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        let entities = &self.entities;
        self.storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
            .into_iter()
            .flat_map(|s| s.iter_mut())
            .filter_map(move |(idx, value)| Some((entities.entity_at_index(idx)?, value)))
    }

    /// View over every entity with both an `A` and a `B`.
    pub fn query2<A: 'static, B: 'static>(&self) -> impl Iterator<Item = (Entity, &A, &B)> + '_ {
        let other = self.storage::<B>();
        self.query::<A>()
            .filter_map(move |(entity, a)| Some((entity, a, other?.get(entity.index())?)))
    }

    /// Snapshot of the entities carrying a `T`, for loops that mutate the world.
    pub fn entities_with<T: 'static>(&self) -> Vec<Entity> {
        self.query::<T>().map(|(e, _)| e).collect()
    }

    fn storage<T: 'static>(&self) -> Option<&SparseSet<T>> {
        self.storages
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<SparseSet<T>>()
    }

    fn storage_mut<T: 'static>(&mut self) -> Option<&mut SparseSet<T>> {
        self.storages
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
    }

    fn storage_mut_or_default<T: 'static>(&mut self) -> &mut SparseSet<T> {
        let storage = self
            .storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        match storage.as_any_mut().downcast_mut::<SparseSet<T>>() {
            Some(set) => set,
            None => unreachable!("storage keyed by TypeId::of::<T>() holds SparseSet<T>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position(f32);
    #[derive(Debug, PartialEq)]
    struct Velocity(f32);

    #[test]
    fn spawn_insert_get() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert(e, Position(1.0)).unwrap();
        assert_eq!(world.get::<Position>(e), Some(&Position(1.0)));
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));
    }

    #[test]
    fn insert_replaces() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert(e, Position(1.0)).unwrap();
        let old = world.insert(e, Position(2.0)).unwrap();
        assert_eq!(old, Some(Position(1.0)));
        assert_eq!(world.count::<Position>(), 1);
    }

    #[test]
    fn despawn_drops_components() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert(e, Position(1.0)).unwrap();
        world.insert(e, Velocity(2.0)).unwrap();
        assert!(world.despawn(e));
        assert!(!world.despawn(e));
        assert_eq!(world.count::<Position>(), 0);
        assert_eq!(world.count::<Velocity>(), 0);

        // A recycled slot does not inherit anything.
        let e2 = world.spawn();
        assert_eq!(e2.index(), e.index());
        assert!(!world.has::<Position>(e2));
        assert_eq!(world.get::<Position>(e), None);
    }

    #[test]
    fn insert_on_dead_entity_fails() {
        let mut world = World::new();
        let e = world.spawn();
        world.despawn(e);
        assert_eq!(world.insert(e, Position(0.0)), Err(EntityNotAlive(e)));
    }

    #[test]
    fn query2_intersects() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.insert(a, Position(1.0)).unwrap();
        world.insert(a, Velocity(1.0)).unwrap();
        world.insert(b, Position(2.0)).unwrap();

        let both: Vec<_> = world.query2::<Position, Velocity>().map(|(e, _, _)| e).collect();
        assert_eq!(both, vec![a]);
        assert_eq!(world.query::<Position>().count(), 2);
    }

    #[test]
    fn query_mut_updates() {
        let mut world = World::new();
        for i in 0..3 {
            let e = world.spawn();
            world.insert(e, Position(i as f32)).unwrap();
        }
        for (_, p) in world.query_mut::<Position>() {
            p.0 += 10.0;
        }
        let mut values: Vec<f32> = world.query::<Position>().map(|(_, p)| p.0).collect();
        values.sort_by(f32::total_cmp);
        assert_eq!(values, vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn query_empty_storage() {
        let world = World::new();
        assert_eq!(world.query::<Position>().count(), 0);
        assert!(world.entities_with::<Velocity>().is_empty());
    }
}

//! Parent-child transform hierarchy.
//!
//! A child's [`TransformComponent`] holds a handle to its parent; the parent
//! lists its children by [`Uuid`]. [`set_parent`] keeps both sides
//! consistent and preserves the child's world pose.
//!
//! World matrices are recomputed on every call (O(depth), no caching).
//! Callers walking many entities per frame should compute each matrix once.

use lantern_core::Uuid;
use lantern_core::math::{Mat4, decompose_transform};

use crate::components::{IdComponent, TransformComponent};
use crate::{Entity, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("{0} is not alive")]
    NotAlive(Entity),
    #[error("{0} has no TransformComponent")]
    MissingTransform(Entity),
    #[error("{0} has no IdComponent")]
    MissingId(Entity),
    /// Parenting would make `child` its own ancestor.
    #[error("parenting {child} under {parent} would create a cycle")]
    Cycle { child: Entity, parent: Entity },
}

/// Local matrix of `entity`, or `None` if it has no transform.
pub fn local_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    world
        .get::<TransformComponent>(entity)
        .map(TransformComponent::local_matrix)
}

/// `parent_world * local`, composed through every ancestor.
pub fn world_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    let transform = world.get::<TransformComponent>(entity)?;
    let mut matrix = transform.local_matrix();
    let mut next = transform.parent;
    while let Some(parent) = next {
        let Some(pt) = world.get::<TransformComponent>(parent) else {
            break;
        };
        matrix = pt.local_matrix() * matrix;
        next = pt.parent;
    }
    Some(matrix)
}

/// World matrix of `entity`'s parent, or identity for roots.
pub fn parent_world_matrix(world: &World, entity: Entity) -> Mat4 {
    world
        .get::<TransformComponent>(entity)
        .and_then(|t| t.parent)
        .and_then(|p| world_matrix(world, p))
        .unwrap_or_else(Mat4::identity)
}

/// Returns true if `ancestor` is `entity` or one of its ancestors.
pub fn is_ancestor_or_self(world: &World, ancestor: Entity, entity: Entity) -> bool {
    let mut current = Some(entity);
    while let Some(e) = current {
        if e == ancestor {
            return true;
        }
        current = world.get::<TransformComponent>(e).and_then(|t| t.parent);
    }
    false
}

/// Re-parents `entity` under `new_parent` (or makes it a root with `None`)
/// without moving it in world space.
///
/// The child's matrix is taken to world space through its old parent, then
/// into the new parent's space, and decomposed back into translation,
/// rotation and scale. If that matrix cannot be decomposed the links are
/// still updated but the local pose is left untouched.
///
/// Fails without mutating anything if either entity is dead, lacks a
/// transform or identity, or if the move would create a cycle.
pub fn set_parent(
    world: &mut World,
    entity: Entity,
    new_parent: Option<Entity>,
) -> Result<(), HierarchyError> {
    check_node(world, entity)?;
    if let Some(parent) = new_parent {
        check_node(world, parent)?;
        if is_ancestor_or_self(world, entity, parent) {
            return Err(HierarchyError::Cycle {
                child: entity,
                parent,
            });
        }
    }

    let old_parent = world
        .get::<TransformComponent>(entity)
        .and_then(|t| t.parent);
    let child_id = world
        .get::<IdComponent>(entity)
        .map(|id| id.id)
        .ok_or(HierarchyError::MissingId(entity))?;

    let world_pose = world_matrix(world, entity).unwrap_or_else(Mat4::identity);
    let new_local = match new_parent {
        Some(parent) => world_matrix(world, parent)
            .and_then(|m| m.try_inverse())
            .map(|inv| inv * world_pose),
        None => Some(world_pose),
    };
    let pose = new_local.as_ref().and_then(decompose_transform);

    if let Some(old) = old_parent {
        remove_child_id(world, old, child_id);
    }

    if let Some(transform) = world.get_mut::<TransformComponent>(entity) {
        match pose {
            Some(pose) => transform.set_pose(pose),
            None => log::warn!("set_parent: degenerate transform on {entity}, keeping local pose"),
        }
        transform.parent = new_parent;
    }

    if let Some(parent) = new_parent
        && let Some(pt) = world.get_mut::<TransformComponent>(parent)
        && !pt.children.contains(&child_id)
    {
        pt.children.push(child_id);
    }

    Ok(())
}

/// Makes `entity` a root, preserving its world pose.
pub fn detach(world: &mut World, entity: Entity) -> Result<(), HierarchyError> {
    set_parent(world, entity, None)
}

/// Sets the parent link without any pose change. Used when rebuilding a
/// hierarchy whose local transforms are already expressed in parent space,
/// e.g. loading or copying a scene.
pub(crate) fn link_parent(
    world: &mut World,
    entity: Entity,
    parent: Entity,
) -> Result<(), HierarchyError> {
    check_node(world, entity)?;
    check_node(world, parent)?;
    if is_ancestor_or_self(world, entity, parent) {
        return Err(HierarchyError::Cycle {
            child: entity,
            parent,
        });
    }
    let child_id = world
        .get::<IdComponent>(entity)
        .map(|id| id.id)
        .ok_or(HierarchyError::MissingId(entity))?;

    if let Some(old) = world.get::<TransformComponent>(entity).and_then(|t| t.parent) {
        remove_child_id(world, old, child_id);
    }
    if let Some(t) = world.get_mut::<TransformComponent>(entity) {
        t.parent = Some(parent);
    }
    if let Some(pt) = world.get_mut::<TransformComponent>(parent)
        && !pt.children.contains(&child_id)
    {
        pt.children.push(child_id);
    }
    Ok(())
}

fn remove_child_id(world: &mut World, parent: Entity, child_id: Uuid) {
    if let Some(pt) = world.get_mut::<TransformComponent>(parent) {
        pt.children.retain(|&c| c != child_id);
    }
}

fn check_node(world: &World, entity: Entity) -> Result<(), HierarchyError> {
    if !world.is_alive(entity) {
        return Err(HierarchyError::NotAlive(entity));
    }
    if !world.has::<TransformComponent>(entity) {
        return Err(HierarchyError::MissingTransform(entity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::math::Vec3;

    fn spawn_node(world: &mut World, transform: TransformComponent) -> Entity {
        let e = world.spawn();
        world.insert(e, IdComponent::new(Uuid::new())).unwrap();
        world.insert(e, transform).unwrap();
        e
    }

    fn max_diff(a: &Mat4, b: &Mat4) -> f32 {
        (a - b).abs().max()
    }

    fn id_of(world: &World, e: Entity) -> Uuid {
        world.get::<IdComponent>(e).unwrap().id
    }

    #[test]
    fn world_matrix_composes_parent() {
        let mut world = World::new();
        let b = spawn_node(&mut world, TransformComponent::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let a = spawn_node(&mut world, TransformComponent::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        link_parent(&mut world, a, b).unwrap();

        let m = world_matrix(&world, a).unwrap();
        let origin = lantern_core::math::transform_point(&m, Vec3::zeros());
        assert!((origin - Vec3::new(1.0, 2.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn set_parent_preserves_world_pose() {
        let mut world = World::new();
        let parent = spawn_node(
            &mut world,
            TransformComponent::from_translation(Vec3::new(3.0, -1.0, 2.0))
                .with_rotation(Vec3::new(0.3, 0.5, -0.2))
                .with_scale(Vec3::new(2.0, 2.0, 2.0)),
        );
        let child = spawn_node(
            &mut world,
            TransformComponent::from_translation(Vec3::new(1.0, 1.0, 1.0))
                .with_rotation(Vec3::new(-0.4, 0.1, 0.9)),
        );

        let before = world_matrix(&world, child).unwrap();
        set_parent(&mut world, child, Some(parent)).unwrap();
        let after = world_matrix(&world, child).unwrap();
        assert!(max_diff(&before, &after) < 1e-4);

        set_parent(&mut world, child, None).unwrap();
        let back = world_matrix(&world, child).unwrap();
        assert!(max_diff(&before, &back) < 1e-4);
    }

    #[test]
    fn set_parent_updates_child_lists() {
        let mut world = World::new();
        let p1 = spawn_node(&mut world, TransformComponent::default());
        let p2 = spawn_node(&mut world, TransformComponent::default());
        let c = spawn_node(&mut world, TransformComponent::default());
        let cid = id_of(&world, c);

        set_parent(&mut world, c, Some(p1)).unwrap();
        assert_eq!(world.get::<TransformComponent>(p1).unwrap().children(), &[cid]);

        set_parent(&mut world, c, Some(p2)).unwrap();
        assert!(world.get::<TransformComponent>(p1).unwrap().children().is_empty());
        assert_eq!(world.get::<TransformComponent>(p2).unwrap().children(), &[cid]);
        assert_eq!(world.get::<TransformComponent>(c).unwrap().parent(), Some(p2));
    }

    #[test]
    fn reparent_to_null_scenario() {
        let mut world = World::new();
        let b = spawn_node(&mut world, TransformComponent::from_translation(Vec3::new(0.0, 2.0, 0.0)));
        let a = spawn_node(&mut world, TransformComponent::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        link_parent(&mut world, a, b).unwrap();

        set_parent(&mut world, a, None).unwrap();
        let t = world.get::<TransformComponent>(a).unwrap();
        assert!((t.translation - Vec3::new(1.0, 2.0, 0.0)).norm() < 1e-5);
        assert!(t.rotation.norm() < 1e-5);
        assert!((t.scale - Vec3::new(1.0, 1.0, 1.0)).norm() < 1e-5);
        assert!(t.parent().is_none());
    }

    #[test]
    fn rejects_self_parent() {
        let mut world = World::new();
        let a = spawn_node(&mut world, TransformComponent::default());
        assert_eq!(
            set_parent(&mut world, a, Some(a)),
            Err(HierarchyError::Cycle { child: a, parent: a })
        );
    }

    #[test]
    fn rejects_cycle_without_mutation() {
        let mut world = World::new();
        let root = spawn_node(&mut world, TransformComponent::default());
        let mid = spawn_node(&mut world, TransformComponent::default());
        let leaf = spawn_node(&mut world, TransformComponent::default());
        set_parent(&mut world, mid, Some(root)).unwrap();
        set_parent(&mut world, leaf, Some(mid)).unwrap();

        let err = set_parent(&mut world, root, Some(leaf)).unwrap_err();
        assert!(matches!(err, HierarchyError::Cycle { .. }));
        assert!(world.get::<TransformComponent>(root).unwrap().parent().is_none());
        assert!(world.get::<TransformComponent>(leaf).unwrap().children().is_empty());
    }

    #[test]
    fn degenerate_parent_keeps_local_pose() {
        let mut world = World::new();
        let flat = spawn_node(
            &mut world,
            TransformComponent::default().with_scale(Vec3::new(0.0, 1.0, 1.0)),
        );
        let c = spawn_node(&mut world, TransformComponent::from_translation(Vec3::new(5.0, 0.0, 0.0)));

        set_parent(&mut world, c, Some(flat)).unwrap();
        let t = world.get::<TransformComponent>(c).unwrap();
        assert_eq!(t.translation, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(t.parent(), Some(flat));
    }

    #[test]
    fn dead_entity_is_rejected() {
        let mut world = World::new();
        let a = spawn_node(&mut world, TransformComponent::default());
        let b = spawn_node(&mut world, TransformComponent::default());
        world.despawn(b);
        assert_eq!(set_parent(&mut world, a, Some(b)), Err(HierarchyError::NotAlive(b)));
    }
}

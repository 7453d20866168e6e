use lantern_core::Uuid;

/// Persistent identity of an entity.
///
/// `owner` records the entity this one was duplicated from, or
/// [`Uuid::NIL`] for originals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdComponent {
    pub id: Uuid,
    pub owner: Uuid,
}

impl IdComponent {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            owner: Uuid::NIL,
        }
    }

    /// Identity for a duplicate of `source`.
    pub fn duplicate_of(source: Uuid) -> Self {
        Self {
            id: Uuid::new(),
            owner: source,
        }
    }
}

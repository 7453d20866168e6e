//! Persistent 64-bit identities for entities and assets.

use serde::{Deserialize, Serialize};

/// A random 64-bit identifier.
///
/// Serializes as a bare integer. [`Uuid::NIL`] (0) means "no reference" in
/// asset fields such as `MeshRendererComponent::material`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uuid(u64);

impl Uuid {
    /// The empty reference.
    pub const NIL: Uuid = Uuid(0);

    /// Draws a fresh random identifier. Never returns [`Uuid::NIL`].
    pub fn new() -> Self {
        loop {
            let bits = ::uuid::Uuid::new_v4().as_u64_pair().0;
            if bits != 0 {
                return Self(bits);
            }
        }
    }

    /// Wraps a raw value.
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns `true` for [`Uuid::NIL`].
    pub const fn is_nil(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Uuid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Uuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

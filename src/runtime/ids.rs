//! Identifiers for states, controllers, binders, and hashed names
//!
//! State ids are UUIDs that survive cloning unchanged, so an authored state and
//! its per-instance copy share an id. Controllers and states are otherwise
//! addressed by arena index, which keeps owner/parent back-references plain
//! integers that stay valid in every clone of the arena.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable state identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub Uuid);

impl StateId {
    /// Create a new random StateId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for StateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a controller in a graph's controller arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControllerId(pub usize);

impl ControllerId {
    /// The root controller always lives in slot zero
    pub const ROOT: ControllerId = ControllerId(0);

    /// Whether this is the root controller
    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller#{}", self.0)
    }
}

/// Index of a state in a graph's state arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateIndex(pub usize);

/// Stable hash of a parameter or property name
///
/// Derived from the first eight bytes of the name's BLAKE3 digest so the value
/// is identical across processes and platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NameHash(pub u64);

impl NameHash {
    /// Hash a name
    pub fn of(name: &str) -> Self {
        let digest = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        Self(u64::from_le_bytes(bytes))
    }
}

impl From<&str> for NameHash {
    fn from(name: &str) -> Self {
        Self::of(name)
    }
}

impl fmt::Display for NameHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Handle for a property binder registered on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinderId(pub Uuid);

impl BinderId {
    /// Create a new random BinderId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BinderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for an observer registered on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub Uuid);

impl ObserverId {
    /// Create a new random ObserverId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

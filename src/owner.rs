//! Principals that own cookies.
//!
//! Every stored cookie belongs to exactly one owner. A [`CookieStore`](crate::cookies::CookieStore)
//! is bound to one [`OwnerRef`] for its whole lifetime; backends resolve that
//! reference into an [`OwnerId`] before writing anything.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for an owner, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for OwnerId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a store refers to its owner.
///
/// Mirrors a "where unique" selector: either the internal id directly, or the
/// unique name the owner was registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OwnerRef {
    Id(OwnerId),
    Name(String),
}

impl OwnerRef {
    pub fn name(name: impl Into<String>) -> Self {
        OwnerRef::Name(name.into())
    }

    /// Returns true when this reference selects the given owner.
    pub fn selects(&self, id: OwnerId, name: &str) -> bool {
        match self {
            OwnerRef::Id(own) => *own == id,
            OwnerRef::Name(own) => own == name,
        }
    }
}

impl From<OwnerId> for OwnerRef {
    fn from(id: OwnerId) -> Self {
        OwnerRef::Id(id)
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerRef::Id(id) => write!(f, "id:{id}"),
            OwnerRef::Name(name) => write!(f, "name:{name}"),
        }
    }
}

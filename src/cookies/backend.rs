//! Persistence backends.
//!
//! A **backend** is the capability a [`CookieStore`](crate::cookies::CookieStore)
//! is built on: keyed CRUD over [`CookieRecord`]s, scoped by owner.
//!
//! This module exports three implementations:
//! - [`InMemoryBackend`]: never suspends, good for tests and private sessions.
//! - [`SqliteBackend`]: SQLite via an `r2d2` pool (good for concurrency and scale).
//! - [`JsonBackend`]: one JSON file for all owners (good for simple setups).
//!
//! ## Contract
//! - Reads and deletes against an owner that does not exist resolve empty.
//! - Writes resolve the owner first and fail with [`BackendError::OwnerNotFound`]
//!   when it does not exist.
//! - `upsert` and `delete` are atomic: a record is either fully written or not
//!   at all, and concurrent writes to the same `(owner, domain, path, key)` never
//!   interleave.
mod in_memory;
mod json;
#[cfg(feature = "sqlite_cookie_store")]
mod sqlite;

use async_trait::async_trait;

use crate::cookies::domain::path_match;
use crate::cookies::record::CookieRecord;
use crate::errors::BackendError;
use crate::owner::{OwnerId, OwnerRef};

pub use in_memory::InMemoryBackend;
pub use json::JsonBackend;
#[cfg(feature = "sqlite_cookie_store")]
pub use sqlite::SqliteBackend;

/// Selection for [`CookieBackend::find_many`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieQuery {
    /// Only records whose domain is one of these. `None` selects every domain.
    pub domains: Option<Vec<String>>,
    /// Only records whose path path-matches this request path. `None` selects every path.
    pub path: Option<String>,
}

impl CookieQuery {
    /// Every record of the owner.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &CookieRecord) -> bool {
        let domain_ok = self
            .domains
            .as_ref()
            .map_or(true, |domains| domains.iter().any(|d| *d == record.domain));
        let path_ok = self
            .path
            .as_deref()
            .map_or(true, |path| path_match(path, &record.path));
        domain_ok && path_ok
    }
}

/// Keyed cookie persistence for many owners.
///
/// Implementations must be `Send + Sync` and safe for concurrent use; a single
/// backend is shared by every store that points at it.
#[async_trait]
pub trait CookieBackend: Send + Sync {
    /// Registers a new owner under a unique `name`, or returns the existing one.
    async fn register_owner(&self, name: &str) -> Result<OwnerId, BackendError>;

    /// Point lookup by `(owner, domain, path, key)`.
    async fn find_one(
        &self,
        owner: &OwnerRef,
        domain: &str,
        path: &str,
        key: &str,
    ) -> Result<Option<CookieRecord>, BackendError>;

    /// Set lookup. No particular order is guaranteed.
    async fn find_many(&self, owner: &OwnerRef, query: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError>;

    /// Inserts `record`, or overwrites the record with the same identity.
    async fn upsert(&self, owner: &OwnerRef, record: CookieRecord) -> Result<(), BackendError>;

    /// Deletes by `(owner, domain, path)` and, when given, `key`. Returns the number removed.
    async fn delete(&self, owner: &OwnerRef, domain: &str, path: &str, key: Option<&str>) -> Result<u64, BackendError>;

    /// Deletes every record of `owner`. Returns the number removed.
    async fn delete_all(&self, owner: &OwnerRef) -> Result<u64, BackendError>;
}

use std::path::PathBuf;
use std::time::Duration;

use crate::owner::OwnerRef;

const DEFAULT_USER_AGENT: &str = "Gosub/1.0 (X11; Linux x86_64) Gecko/20250802 GosubBrowser/1.0";

/// How a store drives its backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Synchronicity {
    /// The backend future is awaited inline. Backends that never suspend resolve immediately.
    Synchronous,
    /// Every operation runs on its own tokio task and always runs to completion,
    /// even when the caller stops waiting for it.
    #[default]
    Asynchronous,
}

/// Configuration of a single cookie store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Principal that owns every cookie this store reads or writes. Fixed for the store's lifetime.
    pub owner: OwnerRef,
    /// How backend calls are scheduled
    pub mode: Synchronicity,
    /// Upper bound for a single backend call. Every call is bounded so that a
    /// backend that never answers cannot pin a task or the pending count.
    pub operation_timeout: Duration,
}

impl StoreConfig {
    pub fn new(owner: impl Into<OwnerRef>) -> Self {
        Self {
            owner: owner.into(),
            mode: Synchronicity::default(),
            operation_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration of the request/response cookie cycle.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Deadline for looking up the cookies of an outbound request
    pub lookup_timeout: Duration,
    /// Deadline for persisting the cookies of a response
    pub persist_timeout: Duration,
    /// Passed to domain expansion when looking up request cookies
    pub allow_special_use_domain: bool,
    /// User agent string for HTTP requests
    pub user_agent: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(2),
            persist_timeout: Duration::from_secs(2),
            allow_special_use_domain: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Configuration of the SQLite backend.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Database file. Created when missing.
    pub path: PathBuf,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// How long to wait for a free pooled connection
    pub connection_timeout: Duration,
    /// How long SQLite retries a locked database before failing
    pub busy_timeout: Duration,
}

impl SqliteConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_connections: 16,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(500),
        }
    }
}

use std::time::Duration;

use crate::owner::OwnerRef;

/// Failures raised by a persistence backend.
///
/// These never cross the [`CookieStore`](crate::cookies::CookieStore) boundary
/// as-is; the store folds them into a [`StoreError`].
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Owner not found: {0}")]
    OwnerNotFound(OwnerRef),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] r2d2_sqlite::rusqlite::Error),

    #[cfg(feature = "sqlite_cookie_store")]
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed cookie record: {0}")]
    Decode(String),

    #[error("Backend lock poisoned")]
    Poisoned,

    #[error("Backend task failed: {0}")]
    Task(String),
}

/// The only error values that leave a [`CookieStore`](crate::cookies::CookieStore).
///
/// "Not found" is never an error; it resolves as `None` or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Cookie owner does not exist")]
    OwnerNotFound,

    #[error("Cookie store backend failure")]
    Backend,

    #[error("Cookie store operation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Errors that abort a dispatched request.
///
/// Cookie handling never produces one of these; it degrades instead.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request canceled")]
    Canceled,

    #[error(transparent)]
    Net(#[from] reqwest::Error),
}

/// A cookie operation the dispatcher gave up on or that failed.
///
/// Carried next to the request/response it affected; the request itself
/// still goes through.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Degradation {
    #[error("cookie {operation} abandoned after {after:?}")]
    TimedOut { operation: &'static str, after: Duration },

    #[error("cookie {operation} failed: {error}")]
    StoreFailed { operation: &'static str, error: StoreError },
}

impl Degradation {
    pub fn operation(&self) -> &'static str {
        match self {
            Degradation::TimedOut { operation, .. } | Degradation::StoreFailed { operation, .. } => operation,
        }
    }
}

//! SQLite-backed cookie persistence.
//!
//! `SqliteBackend` keeps **all owners'** cookies in a single SQLite database.
//!
//! ## Design
//! - Two tables: `owners` (id, unique name) and `cookies`, one row per cookie
//!   with `PRIMARY KEY (owner_id, domain, path, key)`.
//! - Database access is via an `r2d2` pool for safe multi-threaded use. Every
//!   call runs on tokio's blocking pool so the async caller never blocks.
//! - Upserts are a single `INSERT .. ON CONFLICT .. DO UPDATE`, so writes to
//!   the same identity are serialized by SQLite itself.
//! - Timestamps are stored as RFC 3339 text.
//!
//! ## Example
//! ```no_run
//! # async fn demo() -> Result<(), gosub_cookie_store::errors::BackendError> {
//! use gosub_cookie_store::config::SqliteConfig;
//! use gosub_cookie_store::cookies::{CookieBackend, SqliteBackend};
//!
//! let backend = SqliteBackend::open(&SqliteConfig::new("cookies.sqlite"))?;
//! let owner = backend.register_owner("alice").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::rusqlite::{
    params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior,
};
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::SqliteConfig;
use crate::cookies::backend::{CookieBackend, CookieQuery};
use crate::cookies::record::{format_timestamp, parse_timestamp, CookieRecord};
use crate::errors::BackendError;
use crate::owner::{OwnerId, OwnerRef};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS owners (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS cookies (
        owner_id TEXT NOT NULL REFERENCES owners(id) ON DELETE CASCADE,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        domain TEXT NOT NULL,
        path TEXT NOT NULL,
        secure INTEGER NOT NULL,
        http_only INTEGER NOT NULL,
        same_site TEXT NOT NULL,
        expires TEXT,
        max_age TEXT,
        extensions TEXT,
        creation TEXT NOT NULL,
        creation_index INTEGER NOT NULL,
        host_only INTEGER NOT NULL,
        path_is_default INTEGER NOT NULL,
        last_accessed TEXT NOT NULL,
        PRIMARY KEY (owner_id, domain, path, key)
    );";

const COLUMNS: &str = "key, value, domain, path, secure, http_only, same_site, expires, max_age, \
     extensions, creation, creation_index, host_only, path_is_default, last_accessed";

/// A row as SQLite hands it back, before timestamps are parsed.
struct CookieRow {
    key: String,
    value: String,
    domain: String,
    path: String,
    secure: bool,
    http_only: bool,
    same_site: String,
    expires: Option<String>,
    max_age: Option<String>,
    extensions: Option<String>,
    creation: String,
    creation_index: i64,
    host_only: bool,
    path_is_default: bool,
    last_accessed: String,
}

impl CookieRow {
    fn from_row(row: &Row<'_>) -> r2d2_sqlite::rusqlite::Result<Self> {
        Ok(Self {
            key: row.get(0)?,
            value: row.get(1)?,
            domain: row.get(2)?,
            path: row.get(3)?,
            secure: row.get(4)?,
            http_only: row.get(5)?,
            same_site: row.get(6)?,
            expires: row.get(7)?,
            max_age: row.get(8)?,
            extensions: row.get(9)?,
            creation: row.get(10)?,
            creation_index: row.get(11)?,
            host_only: row.get(12)?,
            path_is_default: row.get(13)?,
            last_accessed: row.get(14)?,
        })
    }

    fn into_record(self) -> Result<CookieRecord, BackendError> {
        Ok(CookieRecord {
            key: self.key,
            value: self.value,
            domain: self.domain,
            path: self.path,
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
            expires: self.expires.as_deref().map(parse_timestamp).transpose()?,
            max_age: self.max_age,
            extensions: self.extensions,
            creation: parse_timestamp(&self.creation)?,
            creation_index: u64::try_from(self.creation_index)
                .map_err(|_| BackendError::Decode(format!("negative creation index {}", self.creation_index)))?,
            host_only: self.host_only,
            path_is_default: self.path_is_default,
            last_accessed: parse_timestamp(&self.last_accessed)?,
        })
    }
}

/// Resolves `owner` to the stored owner id, if it exists.
fn lookup_owner(conn: &Connection, owner: &OwnerRef) -> Result<Option<String>, BackendError> {
    let (sql, arg) = match owner {
        OwnerRef::Id(id) => ("SELECT id FROM owners WHERE id = ?1", id.to_string()),
        OwnerRef::Name(name) => ("SELECT id FROM owners WHERE name = ?1", name.clone()),
    };
    Ok(conn.query_row(sql, [arg], |row| row.get::<_, String>(0)).optional()?)
}

fn collect_rows(rows: Vec<CookieRow>) -> Result<Vec<CookieRecord>, BackendError> {
    rows.into_iter().map(CookieRow::into_record).collect()
}

/// A SQLite-based cookie backend shared by any number of stores.
#[derive(Clone)]
pub struct SqliteBackend {
    /// Connection pool for SQLite database (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    /// Opens (or creates) the database described by `config` and ensures the schema exists.
    pub fn open(config: &SqliteConfig) -> Result<Self, BackendError> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.path)
            .with_flags(
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI,
            )
            .with_init(move |c| {
                c.busy_timeout(busy_timeout)?;
                c.pragma_update(None, "journal_mode", "WAL")?;
                c.pragma_update(None, "foreign_keys", "ON")?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(config.connection_timeout)
            .build(manager)?;

        pool.get()?.execute_batch(SCHEMA)?;

        Ok(Self { pool })
    }

    /// Runs `f` with a pooled connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, BackendError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CookieBackend for SqliteBackend {
    async fn register_owner(&self, name: &str) -> Result<OwnerId, BackendError> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO owners (id, name) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
                params![OwnerId::new().to_string(), name],
            )?;
            let id: String = conn.query_row("SELECT id FROM owners WHERE name = ?1", [&name], |row| row.get(0))?;
            id.parse::<OwnerId>()
                .map_err(|e| BackendError::Decode(format!("owner id {id:?}: {e}")))
        })
        .await
    }

    async fn find_one(
        &self,
        owner: &OwnerRef,
        domain: &str,
        path: &str,
        key: &str,
    ) -> Result<Option<CookieRecord>, BackendError> {
        let owner = owner.clone();
        let (domain, path, key) = (domain.to_string(), path.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let Some(owner_id) = lookup_owner(conn, &owner)? else {
                return Ok(None);
            };

            let row = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM cookies WHERE owner_id = ?1 AND domain = ?2 AND path = ?3 AND key = ?4"),
                    params![owner_id, domain, path, key],
                    CookieRow::from_row,
                )
                .optional()?;
            row.map(CookieRow::into_record).transpose()
        })
        .await
    }

    async fn find_many(&self, owner: &OwnerRef, query: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        let owner = owner.clone();
        let query = query.clone();
        self.with_conn(move |conn| {
            let Some(owner_id) = lookup_owner(conn, &owner)? else {
                return Ok(vec![]);
            };

            let mut sql = format!("SELECT {COLUMNS} FROM cookies WHERE owner_id = ?1");
            let mut args = vec![owner_id];
            if let Some(domains) = &query.domains {
                if domains.is_empty() {
                    return Ok(vec![]);
                }
                let placeholders = (0..domains.len())
                    .map(|i| format!("?{}", i + 2))
                    .collect::<Vec<_>>()
                    .join(", ");
                sql.push_str(&format!(" AND domain IN ({placeholders})"));
                args.extend(domains.iter().cloned());
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), CookieRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(collect_rows(rows)?
                .into_iter()
                .filter(|record| query.matches(record))
                .collect())
        })
        .await
    }

    async fn upsert(&self, owner: &OwnerRef, record: CookieRecord) -> Result<(), BackendError> {
        let owner = owner.clone();
        let creation_index = i64::try_from(record.creation_index)
            .map_err(|_| BackendError::Decode(format!("creation index {} out of range", record.creation_index)))?;
        self.with_conn(move |conn| {
            // take the write lock up front; a deferred read-then-write can lose to another writer under WAL
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let owner_id = lookup_owner(&tx, &owner)?.ok_or(BackendError::OwnerNotFound(owner))?;

            tx.execute(
                &format!(
                    "INSERT INTO cookies (owner_id, {COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                     ON CONFLICT(owner_id, domain, path, key) DO UPDATE SET
                        value = excluded.value,
                        secure = excluded.secure,
                        http_only = excluded.http_only,
                        same_site = excluded.same_site,
                        expires = excluded.expires,
                        max_age = excluded.max_age,
                        extensions = excluded.extensions,
                        creation = excluded.creation,
                        creation_index = excluded.creation_index,
                        host_only = excluded.host_only,
                        path_is_default = excluded.path_is_default,
                        last_accessed = excluded.last_accessed"
                ),
                params![
                    owner_id,
                    record.key,
                    record.value,
                    record.domain,
                    record.path,
                    record.secure,
                    record.http_only,
                    record.same_site,
                    record.expires.map(format_timestamp).transpose()?,
                    record.max_age,
                    record.extensions,
                    format_timestamp(record.creation)?,
                    creation_index,
                    record.host_only,
                    record.path_is_default,
                    format_timestamp(record.last_accessed)?,
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, owner: &OwnerRef, domain: &str, path: &str, key: Option<&str>) -> Result<u64, BackendError> {
        let owner = owner.clone();
        let (domain, path, key) = (domain.to_string(), path.to_string(), key.map(str::to_string));
        self.with_conn(move |conn| {
            let Some(owner_id) = lookup_owner(conn, &owner)? else {
                return Ok(0);
            };

            let removed = match key {
                Some(key) => conn.execute(
                    "DELETE FROM cookies WHERE owner_id = ?1 AND domain = ?2 AND path = ?3 AND key = ?4",
                    params![owner_id, domain, path, key],
                )?,
                None => conn.execute(
                    "DELETE FROM cookies WHERE owner_id = ?1 AND domain = ?2 AND path = ?3",
                    params![owner_id, domain, path],
                )?,
            };
            Ok(removed as u64)
        })
        .await
    }

    async fn delete_all(&self, owner: &OwnerRef) -> Result<u64, BackendError> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            let Some(owner_id) = lookup_owner(conn, &owner)? else {
                return Ok(0);
            };
            let removed = conn.execute("DELETE FROM cookies WHERE owner_id = ?1", [owner_id])?;
            Ok(removed as u64)
        })
        .await
    }
}

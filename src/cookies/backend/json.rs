//! JSON-backed cookie persistence.
//!
//! `JsonBackend` persists **all owners'** cookies in a single JSON file on disk.
//!
//! ### Design
//! - One file for all owners (`CookieFile { owners, cookies }`).
//! - Every call reads the file, applies its change and writes it back while
//!   holding one mutex, so writes never interleave.
//! - The file is written to a sibling temp file first and then renamed over
//!   the original, so a crash never leaves a half-written file behind.
//!
//! ### I/O characteristics & caveats
//! - Each call **reads then rewrites** the entire file. For large datasets,
//!   use [`SqliteBackend`](crate::cookies::SqliteBackend).
//! - Calls do blocking file I/O on tokio's blocking pool.
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cookies::backend::{CookieBackend, CookieQuery};
use crate::cookies::record::CookieRecord;
use crate::errors::BackendError;
use crate::owner::{OwnerId, OwnerRef};

/// On-disk representation of all owners' cookies.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    owners: HashMap<OwnerId, String>,
    cookies: HashMap<OwnerId, Vec<CookieRecord>>,
}

impl CookieFile {
    fn resolve(&self, owner: &OwnerRef) -> Option<OwnerId> {
        self.owners
            .iter()
            .find(|(id, name)| owner.selects(**id, name))
            .map(|(id, _)| *id)
    }
}

/// A JSON-file cookie backend shared by any number of stores.
#[derive(Clone)]
pub struct JsonBackend {
    /// Path to the JSON file where cookies are stored.
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Arc<Mutex<()>>,
}

impl JsonBackend {
    /// Opens a JSON backend at `path`, writing an empty file if none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        if !path.exists() {
            fs::write(&path, serde_json::to_vec(&CookieFile::default())?)?;
        }

        Ok(Self {
            path,
            lock: Arc::new(Mutex::new(())),
        })
    }

    fn load(path: &PathBuf) -> Result<CookieFile, BackendError> {
        let contents = fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }

    fn save(path: &PathBuf, file: &CookieFile) -> Result<(), BackendError> {
        let contents = serde_json::to_vec_pretty(file)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Runs `f` against the loaded file on the blocking pool; writes the file
    /// back when `f` reports a change.
    async fn with_file<T, F>(&self, f: F) -> Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&mut CookieFile) -> Result<(T, bool), BackendError> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = self.lock.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().map_err(|_| BackendError::Poisoned)?;
            let mut file = Self::load(&path)?;
            let (result, dirty) = f(&mut file)?;
            if dirty {
                Self::save(&path, &file)?;
            }
            Ok(result)
        })
        .await
        .map_err(|e| BackendError::Task(e.to_string()))?
    }
}

#[async_trait]
impl CookieBackend for JsonBackend {
    async fn register_owner(&self, name: &str) -> Result<OwnerId, BackendError> {
        let name = name.to_string();
        self.with_file(move |file| {
            if let Some(id) = file.resolve(&OwnerRef::Name(name.clone())) {
                return Ok((id, false));
            }
            let id = OwnerId::new();
            file.owners.insert(id, name);
            Ok((id, true))
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
        self.with_file(move |file| {
            let found = file
                .resolve(&owner)
                .and_then(|id| file.cookies.get(&id))
                .and_then(|records| records.iter().find(|r| r.identity() == (domain.as_str(), path.as_str(), key.as_str())))
                .cloned();
            Ok((found, false))
        })
        .await
    }

    async fn find_many(&self, owner: &OwnerRef, query: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        let owner = owner.clone();
        let query = query.clone();
        self.with_file(move |file| {
            let found = file
                .resolve(&owner)
                .and_then(|id| file.cookies.get(&id))
                .map(|records| records.iter().filter(|r| query.matches(r)).cloned().collect())
                .unwrap_or_default();
            Ok((found, false))
        })
        .await
    }

    async fn upsert(&self, owner: &OwnerRef, record: CookieRecord) -> Result<(), BackendError> {
        let owner = owner.clone();
        self.with_file(move |file| {
            let id = file
                .resolve(&owner)
                .ok_or_else(|| BackendError::OwnerNotFound(owner.clone()))?;

            let records = file.cookies.entry(id).or_default();
            match records.iter_mut().find(|r| r.identity() == record.identity()) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
            Ok(((), true))
        })
        .await
    }

    async fn delete(&self, owner: &OwnerRef, domain: &str, path: &str, key: Option<&str>) -> Result<u64, BackendError> {
        let owner = owner.clone();
        let (domain, path, key) = (domain.to_string(), path.to_string(), key.map(str::to_string));
        self.with_file(move |file| {
            let Some(records) = file.resolve(&owner).and_then(|id| file.cookies.get_mut(&id)) else {
                return Ok((0, false));
            };

            let before = records.len();
            records.retain(|r| {
                !(r.domain == domain && r.path == path && key.as_ref().map_or(true, |k| *k == r.key))
            });
            let removed = (before - records.len()) as u64;
            Ok((removed, removed > 0))
        })
        .await
    }

    async fn delete_all(&self, owner: &OwnerRef) -> Result<u64, BackendError> {
        let owner = owner.clone();
        self.with_file(move |file| {
            let removed = file
                .resolve(&owner)
                .and_then(|id| file.cookies.remove(&id))
                .map_or(0, |records| records.len() as u64);
            Ok((removed, removed > 0))
        })
        .await
    }
}

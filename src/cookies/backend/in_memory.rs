use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::cookies::backend::{CookieBackend, CookieQuery};
use crate::cookies::record::CookieRecord;
use crate::errors::BackendError;
use crate::owner::{OwnerId, OwnerRef};

/// `(domain, path, key)`
type Identity = (String, String, String);

#[derive(Default)]
struct State {
    /// Registered owners, by id
    owners: HashMap<OwnerId, String>,
    /// Records per owner, keyed by identity
    cookies: HashMap<OwnerId, BTreeMap<Identity, CookieRecord>>,
}

impl State {
    fn resolve(&self, owner: &OwnerRef) -> Option<OwnerId> {
        self.owners
            .iter()
            .find(|(id, name)| owner.selects(**id, name))
            .map(|(id, _)| *id)
    }
}

/// Backend that keeps every record in memory. Nothing survives the process.
///
/// All calls complete without suspending, which makes this the reference
/// "synchronous" backend. A single lock around the state makes each write atomic.
#[derive(Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, BackendError> {
        self.state.read().map_err(|_| BackendError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, BackendError> {
        self.state.write().map_err(|_| BackendError::Poisoned)
    }
}

#[async_trait]
impl CookieBackend for InMemoryBackend {
    async fn register_owner(&self, name: &str) -> Result<OwnerId, BackendError> {
        let mut state = self.write()?;
        if let Some(id) = state.resolve(&OwnerRef::name(name)) {
            return Ok(id);
        }

        let id = OwnerId::new();
        state.owners.insert(id, name.to_string());
        Ok(id)
    }

    async fn find_one(
        &self,
        owner: &OwnerRef,
        domain: &str,
        path: &str,
        key: &str,
    ) -> Result<Option<CookieRecord>, BackendError> {
        let state = self.read()?;
        let Some(id) = state.resolve(owner) else {
            return Ok(None);
        };

        let identity = (domain.to_string(), path.to_string(), key.to_string());
        Ok(state.cookies.get(&id).and_then(|records| records.get(&identity)).cloned())
    }

    async fn find_many(&self, owner: &OwnerRef, query: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        let state = self.read()?;
        let Some(id) = state.resolve(owner) else {
            return Ok(vec![]);
        };

        Ok(state
            .cookies
            .get(&id)
            .map(|records| records.values().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert(&self, owner: &OwnerRef, record: CookieRecord) -> Result<(), BackendError> {
        let mut state = self.write()?;
        let id = state
            .resolve(owner)
            .ok_or_else(|| BackendError::OwnerNotFound(owner.clone()))?;

        let identity = (record.domain.clone(), record.path.clone(), record.key.clone());
        state.cookies.entry(id).or_default().insert(identity, record);
        Ok(())
    }

    async fn delete(&self, owner: &OwnerRef, domain: &str, path: &str, key: Option<&str>) -> Result<u64, BackendError> {
        let mut state = self.write()?;
        let Some(id) = state.resolve(owner) else {
            return Ok(0);
        };
        let Some(records) = state.cookies.get_mut(&id) else {
            return Ok(0);
        };

        let before = records.len();
        records.retain(|(d, p, k), _| !(d == domain && p == path && key.map_or(true, |key| k == key)));
        Ok((before - records.len()) as u64)
    }

    async fn delete_all(&self, owner: &OwnerRef) -> Result<u64, BackendError> {
        let mut state = self.write()?;
        let Some(id) = state.resolve(owner) else {
            return Ok(0);
        };

        Ok(state.cookies.remove(&id).map_or(0, |records| records.len() as u64))
    }
}

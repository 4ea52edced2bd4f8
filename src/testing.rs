//! Misbehaving backends used to exercise the store and dispatcher contracts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cookies::{CookieBackend, CookieQuery, CookieRecord};
use crate::errors::BackendError;
use crate::owner::{OwnerId, OwnerRef};

fn broken() -> BackendError {
    BackendError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "backend went away"))
}

/// Fails every call.
pub struct FailingBackend;

#[async_trait]
impl CookieBackend for FailingBackend {
    async fn register_owner(&self, _name: &str) -> Result<OwnerId, BackendError> {
        Err(broken())
    }

    async fn find_one(&self, _: &OwnerRef, _: &str, _: &str, _: &str) -> Result<Option<CookieRecord>, BackendError> {
        Err(broken())
    }

    async fn find_many(&self, _: &OwnerRef, _: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        Err(broken())
    }

    async fn upsert(&self, _: &OwnerRef, _: CookieRecord) -> Result<(), BackendError> {
        Err(broken())
    }

    async fn delete(&self, _: &OwnerRef, _: &str, _: &str, _: Option<&str>) -> Result<u64, BackendError> {
        Err(broken())
    }

    async fn delete_all(&self, _: &OwnerRef) -> Result<u64, BackendError> {
        Err(broken())
    }
}

/// Never resolves a lookup. Writes go nowhere but do complete.
pub struct StalledBackend;

#[async_trait]
impl CookieBackend for StalledBackend {
    async fn register_owner(&self, _name: &str) -> Result<OwnerId, BackendError> {
        Ok(OwnerId::new())
    }

    async fn find_one(&self, _: &OwnerRef, _: &str, _: &str, _: &str) -> Result<Option<CookieRecord>, BackendError> {
        futures::future::pending().await
    }

    async fn find_many(&self, _: &OwnerRef, _: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        futures::future::pending().await
    }

    async fn upsert(&self, _: &OwnerRef, _: CookieRecord) -> Result<(), BackendError> {
        Ok(())
    }

    async fn delete(&self, _: &OwnerRef, _: &str, _: &str, _: Option<&str>) -> Result<u64, BackendError> {
        Ok(0)
    }

    async fn delete_all(&self, _: &OwnerRef) -> Result<u64, BackendError> {
        Ok(0)
    }
}

/// Delays every call to an inner backend.
pub struct SlowBackend {
    inner: Arc<dyn CookieBackend>,
    delay: Duration,
}

impl SlowBackend {
    pub fn new(inner: Arc<dyn CookieBackend>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl CookieBackend for SlowBackend {
    async fn register_owner(&self, name: &str) -> Result<OwnerId, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.register_owner(name).await
    }

    async fn find_one(
        &self,
        owner: &OwnerRef,
        domain: &str,
        path: &str,
        key: &str,
    ) -> Result<Option<CookieRecord>, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_one(owner, domain, path, key).await
    }

    async fn find_many(&self, owner: &OwnerRef, query: &CookieQuery) -> Result<Vec<CookieRecord>, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_many(owner, query).await
    }

    async fn upsert(&self, owner: &OwnerRef, record: CookieRecord) -> Result<(), BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(owner, record).await
    }

    async fn delete(&self, owner: &OwnerRef, domain: &str, path: &str, key: Option<&str>) -> Result<u64, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(owner, domain, path, key).await
    }

    async fn delete_all(&self, owner: &OwnerRef) -> Result<u64, BackendError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_all(owner).await
    }
}

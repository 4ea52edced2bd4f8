//! Reproduces a request pipeline stuck on a cookie store that never answers,
//! and shows the dispatcher finishing anyway once its deadlines pass.
//!
//! Run with `RUST_LOG=debug cargo run --example hang_repro`.
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gosub_cookie_store::config::{DispatcherConfig, StoreConfig};
use gosub_cookie_store::cookies::{
    CookieBackend, CookieJar, CookieQuery, CookieRecord, CookieStore, InMemoryBackend, RequestContext,
};
use gosub_cookie_store::errors::BackendError;
use gosub_cookie_store::net::CookieDispatcher;
use gosub_cookie_store::owner::{OwnerId, OwnerRef};
use http::{HeaderMap, HeaderValue};
use url::Url;

/// Lookups never complete, like a store whose completion handler is never called.
struct NeverAnswers;

#[async_trait]
impl CookieBackend for NeverAnswers {
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

fn dispatcher(backend: Arc<dyn CookieBackend>, owner: OwnerId) -> anyhow::Result<CookieDispatcher> {
    let mut store_config = StoreConfig::new(owner);
    // the dispatcher gives up first; the store still ends the abandoned call
    store_config.operation_timeout = Duration::from_secs(1);

    let config = DispatcherConfig {
        lookup_timeout: Duration::from_millis(250),
        persist_timeout: Duration::from_millis(250),
        ..DispatcherConfig::default()
    };
    let jar = CookieJar::new(Arc::new(CookieStore::new(store_config, backend)));
    Ok(CookieDispatcher::new(jar, config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = Url::parse("https://example.com/account")?;
    let mut headers = HeaderMap::new();
    headers.append(http::header::SET_COOKIE, HeaderValue::from_static("session=u1; Path=/; Secure"));
    let ctx = RequestContext::default();

    println!("-- healthy store");
    let memory = Arc::new(InMemoryBackend::new());
    let owner = memory.register_owner("demo").await?;
    let healthy = dispatcher(memory, owner)?;
    let stored = healthy.store_response(&url, &headers).await;
    let header = healthy.cookie_header(&url, &ctx).await;
    println!("stored {} cookie(s), degraded: {:?}", stored.value, stored.degraded);
    println!("Cookie: {:?}, degraded: {:?}", header.value, header.degraded);

    println!("-- stalled store");
    let stalled = dispatcher(Arc::new(NeverAnswers), OwnerId::new())?;
    let started = Instant::now();
    let header = stalled.cookie_header(&url, &ctx).await;
    println!(
        "lookup returned after {:?}: Cookie: {:?}, degraded: {}",
        started.elapsed(),
        header.value,
        header.degraded.map_or_else(|| "no".to_string(), |d| d.to_string())
    );

    let started = Instant::now();
    let stored = stalled.store_response(&url, &headers).await;
    println!(
        "persist returned after {:?}: stored {}, degraded: {}",
        started.elapsed(),
        stored.value,
        stored.degraded.map_or_else(|| "no".to_string(), |d| d.to_string())
    );

    Ok(())
}

//! Request/response cookie cycle with deadlines.
//!
//! [`CookieDispatcher`] asks the jar for a `Cookie` header before a request
//! and hands `Set-Cookie` headers back to it afterwards. Both steps are
//! bounded: when the store does not answer in time the dispatcher stops
//! waiting, carries on without cookies, and reports a [`Degradation`] instead
//! of stalling the request.
//!
//! Persisting runs on its own task, so a write the dispatcher stopped
//! waiting for still lands once the store gets to it.
use std::future::Future;
use std::time::Duration;

use http::header::COOKIE;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::DispatcherConfig;
use crate::cookies::{CookieJar, RequestContext};
use crate::errors::{Degradation, DispatchError, StoreError};
use crate::net::Response;

/// Result of a bounded cookie operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOutcome<T> {
    pub value: T,
    /// Set when the operation timed out or failed and `value` is a fallback
    pub degraded: Option<Degradation>,
}

impl<T> CookieOutcome<T> {
    fn complete(value: T) -> Self {
        Self { value, degraded: None }
    }

    fn degraded(value: T, degradation: Degradation) -> Self {
        log::warn!("{degradation}");
        Self {
            value,
            degraded: Some(degradation),
        }
    }
}

async fn bounded<T, F>(operation: &'static str, limit: Duration, fallback: T, fut: F) -> CookieOutcome<T>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => CookieOutcome::complete(value),
        Ok(Err(StoreError::TimedOut(after))) => {
            CookieOutcome::degraded(fallback, Degradation::TimedOut { operation, after })
        }
        Ok(Err(error)) => CookieOutcome::degraded(fallback, Degradation::StoreFailed { operation, error }),
        Err(_) => CookieOutcome::degraded(fallback, Degradation::TimedOut { operation, after: limit }),
    }
}

/// Drives a [`CookieJar`] through HTTP request/response cycles.
pub struct CookieDispatcher {
    jar: CookieJar,
    config: DispatcherConfig,
    client: reqwest::Client,
}

impl CookieDispatcher {
    pub fn new(jar: CookieJar, config: DispatcherConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder().user_agent(config.user_agent.as_str()).build()?;
        let jar = jar.with_special_use_domains(config.allow_special_use_domain);
        Ok(Self { jar, config, client })
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Cookie header for a request to `url`, bounded by the lookup deadline.
    ///
    /// Falls back to no header at all when the lookup does not complete.
    pub async fn cookie_header(&self, url: &Url, ctx: &RequestContext) -> CookieOutcome<Option<String>> {
        bounded(
            "lookup",
            self.config.lookup_timeout,
            None,
            self.jar.get_cookie_header(url, ctx),
        )
        .await
    }

    /// Persists the `Set-Cookie` headers of a response from `url`, bounded by
    /// the persist deadline. The value is the number of accepted cookies.
    pub async fn store_response(&self, url: &Url, headers: &HeaderMap) -> CookieOutcome<usize> {
        if !headers.contains_key(http::header::SET_COOKIE) {
            return CookieOutcome::complete(0);
        }

        let jar = self.jar.clone();
        let url = url.clone();
        let headers = headers.clone();
        let task = tokio::spawn(async move { jar.store_response_cookies(&url, &headers).await });

        bounded("persist", self.config.persist_timeout, 0, async move {
            task.await.map_err(|e| {
                log::error!("cookie persist task failed: {e}");
                StoreError::Backend
            })?
        })
        .await
    }

    /// Fetches `url` with its cookies attached and stores the cookies the
    /// response sets.
    ///
    /// Only cancellation and transport errors fail the fetch; cookie trouble
    /// shows up in [`Response::cookie_degradations`].
    pub async fn fetch(&self, url: Url, cancel: CancellationToken) -> Result<Response, DispatchError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::debug!("fetch of {url} canceled");
                Err(DispatchError::Canceled)
            }
            r = self.fetch_inner(url.clone()) => r,
        }
    }

    async fn fetch_inner(&self, url: Url) -> Result<Response, DispatchError> {
        let mut degradations = Vec::new();

        let lookup = self.cookie_header(&url, &RequestContext::default()).await;
        degradations.extend(lookup.degraded);

        let mut request = self.client.get(url);
        if let Some(header) = lookup.value {
            request = request.header(COOKIE, header);
        }
        let res = request.send().await?;

        let final_url = res.url().clone();
        let status = res.status().as_u16();
        let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
        let headers = res.headers().clone();

        let stored = self.store_response(&final_url, &headers).await;
        degradations.extend(stored.degraded);

        // We don't do streaming yet
        let body = res.bytes().await?.to_vec();

        Ok(Response {
            url: final_url,
            status,
            status_text,
            headers,
            body,
            cookie_degradations: degradations,
        })
    }
}

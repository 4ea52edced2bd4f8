//! Cookie jar: RFC 6265 policy on top of a [`CookieStore`].
//!
//! The jar decides *which* cookies a request gets and *whether* a
//! `Set-Cookie` header is accepted; the store only persists and matches.
//!
//! ## Notes & limitations
//! - Expired cookies are skipped when building a request and removed from
//!   the store on a best-effort basis.
//! - Cookie prefixes (`__Secure-`, `__Host-`) are enforced by silently
//!   dropping violating cookies.
//! - Reads never write: `last_accessed` is refreshed on the cookies handed
//!   to the caller only. The stored value changes when a `Set-Cookie`
//!   replaces the cookie.
//! - No size limits or eviction policies are implemented.
//!
//! See also: RFC 6265bis (HTTP State Management Mechanism).

use http::HeaderMap;
use time::OffsetDateTime;
use url::Url;

use crate::cookies::cookie::{Cookie, SameSite};
use crate::cookies::domain::{canonical_domain, default_path, domain_match, is_public_suffix};
use crate::cookies::parse::parse_set_cookie;
use crate::cookies::store::CookieStoreHandle;
use crate::errors::StoreError;

/// Same-site relation between the request and the document that triggered it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SameSiteContext {
    /// Same-site request
    Strict,
    /// Cross-site top-level navigation
    Lax,
    /// Any other cross-site request
    None,
}

/// Where a cookie operation comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// The caller is an HTTP API (as opposed to e.g. script access). Only
    /// HTTP APIs may read or write `HttpOnly` cookies.
    pub http_api: bool,
    /// Enables SameSite enforcement when set
    pub same_site: Option<SameSiteContext>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            http_api: true,
            same_site: None,
        }
    }
}

fn is_secure_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "https" | "wss")
}

fn request_host(url: &Url) -> Option<String> {
    url.host_str()
        .map(|h| canonical_domain(h.trim_matches(|c| c == '[' || c == ']')))
        .filter(|h| !h.is_empty())
}

fn same_site_allows(cookie: Option<SameSite>, context: Option<SameSiteContext>) -> bool {
    match (cookie.unwrap_or(SameSite::None), context) {
        (_, None) => true,
        (SameSite::None, _) => true,
        (SameSite::Lax, Some(ctx)) => ctx != SameSiteContext::None,
        (SameSite::Strict, Some(ctx)) => ctx == SameSiteContext::Strict,
    }
}

/// Scopes a freshly parsed cookie to the request and applies the acceptance
/// rules. Returns the reason on rejection.
fn scope_cookie(mut cookie: Cookie, url: &Url, host: &str, ctx: &RequestContext) -> Result<Cookie, &'static str> {
    let secure_origin = is_secure_scheme(url);

    match cookie.domain.take() {
        Some(domain) => {
            if domain != host && is_public_suffix(&domain) {
                return Err("domain is a public suffix");
            }
            if !domain_match(host, &domain) {
                return Err("domain does not match request host");
            }
            cookie.domain = Some(domain);
            cookie.host_only = false;
        }
        None => {
            cookie.domain = Some(host.to_string());
            cookie.host_only = true;
        }
    }

    if cookie.path.is_none() {
        cookie.path = Some(default_path(url.path()));
        cookie.path_is_default = true;
    }

    if cookie.secure && !secure_origin {
        return Err("secure cookie from insecure origin");
    }
    if cookie.http_only && !ctx.http_api {
        return Err("HttpOnly cookie from non-HTTP API");
    }
    if ctx.same_site == Some(SameSiteContext::None) && cookie.same_site.is_some_and(|s| s != SameSite::None) {
        return Err("cross-site request cannot set a SameSite cookie");
    }

    if cookie.key.starts_with("__Secure-") && !(cookie.secure && secure_origin) {
        return Err("__Secure- prefix requires a secure cookie");
    }
    if cookie.key.starts_with("__Host-")
        && !(cookie.secure && secure_origin && cookie.host_only && cookie.path.as_deref() == Some("/"))
    {
        return Err("__Host- prefix requires a secure host-only cookie at /");
    }

    Ok(cookie)
}

/// A cookie jar for one owner, backed by a shared store.
#[derive(Clone)]
pub struct CookieJar {
    store: CookieStoreHandle,
    allow_special_use_domain: bool,
}

impl CookieJar {
    pub fn new(store: CookieStoreHandle) -> Self {
        Self {
            store,
            allow_special_use_domain: true,
        }
    }

    pub fn with_special_use_domains(mut self, allow: bool) -> Self {
        self.allow_special_use_domain = allow;
        self
    }

    pub fn store(&self) -> &CookieStoreHandle {
        &self.store
    }

    /// Returns the cookies to send with a request to `url`, most specific first.
    ///
    /// The returned cookies carry `last_accessed = now`; the stored copies
    /// are left untouched.
    pub async fn get_cookies(&self, url: &Url, ctx: &RequestContext) -> Result<Vec<Cookie>, StoreError> {
        let Some(host) = request_host(url) else {
            return Ok(vec![]);
        };
        let secure_origin = is_secure_scheme(url);
        let now = OffsetDateTime::now_utc();

        let found = self
            .store
            .find_cookies(&host, Some(url.path()), self.allow_special_use_domain)
            .await?;

        let mut expired = Vec::new();
        let mut cookies = Vec::new();
        for mut cookie in found {
            let in_scope = match (&cookie.domain, cookie.host_only) {
                (Some(domain), true) => *domain == host,
                (Some(domain), false) => domain_match(&host, domain),
                (None, _) => false,
            };
            if !in_scope
                || (cookie.secure && !secure_origin)
                || (cookie.http_only && !ctx.http_api)
                || !same_site_allows(cookie.same_site, ctx.same_site)
            {
                continue;
            }
            if cookie.is_expired(now) {
                expired.push(cookie);
                continue;
            }
            cookie.last_accessed = Some(now);
            cookies.push(cookie);
        }

        let removals = expired.iter().map(|cookie| async move {
            let removed = self
                .store
                .remove_cookie(cookie.domain.as_deref(), cookie.path.as_deref(), Some(&cookie.key))
                .await;
            if let Err(e) = removed {
                log::warn!("could not remove expired cookie {}: {e}", cookie.key);
            }
        });
        futures::future::join_all(removals).await;

        Ok(cookies)
    }

    /// Returns the `Cookie` request header value to send for `url`, if any.
    pub async fn get_cookie_header(&self, url: &Url, ctx: &RequestContext) -> Result<Option<String>, StoreError> {
        let header = self
            .get_cookies(url, ctx)
            .await?
            .iter()
            .map(Cookie::to_header_pair)
            .collect::<Vec<_>>()
            .join("; ");

        Ok(Some(header).filter(|h| !h.is_empty()))
    }

    /// Parses and stores one `Set-Cookie` header received from `url`.
    ///
    /// Returns the stored cookie, or `None` when the header was rejected.
    /// A cookie that replaces an existing one keeps its creation time and index.
    pub async fn set_cookie(&self, url: &Url, header: &str, ctx: &RequestContext) -> Result<Option<Cookie>, StoreError> {
        let Some(host) = request_host(url) else {
            return Ok(None);
        };
        let now = OffsetDateTime::now_utc();

        let Some(parsed) = parse_set_cookie(header, now) else {
            log::warn!("ignoring unparsable Set-Cookie from {host}");
            return Ok(None);
        };
        let mut cookie = match scope_cookie(parsed, url, &host, ctx) {
            Ok(cookie) => cookie,
            Err(reason) => {
                log::warn!("rejected Set-Cookie from {host}: {reason}");
                return Ok(None);
            }
        };

        let existing = self
            .store
            .find_cookie(cookie.domain.as_deref(), cookie.path.as_deref(), Some(&cookie.key))
            .await?;

        match existing {
            Some(old) => {
                if old.http_only && !ctx.http_api {
                    log::warn!("rejected Set-Cookie from {host}: cannot overwrite HttpOnly cookie");
                    return Ok(None);
                }
                cookie.creation = old.creation;
                cookie.creation_index = old.creation_index;
                cookie.last_accessed = Some(now);
                self.store.update_cookie(&old, &cookie).await?;
            }
            None => {
                cookie.creation = Some(now);
                cookie.last_accessed = Some(now);
                self.store.put_cookie(&cookie).await?;
            }
        }

        Ok(Some(cookie))
    }

    /// Stores every `Set-Cookie` found in response `headers` for `url`.
    ///
    /// Returns how many cookies were accepted.
    pub async fn store_response_cookies(&self, url: &Url, headers: &HeaderMap) -> Result<usize, StoreError> {
        let ctx = RequestContext::default();
        let mut stored = 0;
        for header in headers.get_all(http::header::SET_COOKIE) {
            let Ok(header) = header.to_str() else {
                log::warn!("ignoring non-ASCII Set-Cookie header");
                continue;
            };
            if self.set_cookie(url, header, &ctx).await?.is_some() {
                stored += 1;
            }
        }
        Ok(stored)
    }

    /// Removes the cookies named `name` that would be sent to `url`.
    pub async fn remove_cookie(&self, url: &Url, name: &str) -> Result<(), StoreError> {
        for cookie in self.get_cookies(url, &RequestContext::default()).await? {
            if cookie.key == name {
                self.store
                    .remove_cookie(cookie.domain.as_deref(), cookie.path.as_deref(), Some(&cookie.key))
                    .await?;
            }
        }
        Ok(())
    }

    /// Removes all cookies of the jar's owner.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_all_cookies().await
    }

    /// Every cookie of the jar's owner, for inspection.
    pub async fn get_all_cookies(&self) -> Result<Vec<Cookie>, StoreError> {
        self.store.get_all_cookies().await
    }
}

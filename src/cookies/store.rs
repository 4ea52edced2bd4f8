//! The owner-scoped cookie store.
//!
//! [`CookieStore`] is what a cookie jar talks to. It is bound to one owner for
//! its lifetime and delegates persistence to an injected [`CookieBackend`].
//!
//! ## Completion
//! Every operation is a single `async fn` returning `Result`, so it resolves
//! exactly once, either with a value or with a [`StoreError`]. "Not found" is
//! a successful `None` or empty `Vec`, and missing identity parts short-circuit
//! to the same empty result instead of failing.
//!
//! ## Scheduling
//! With [`Synchronicity::Asynchronous`] each backend call runs on its own tokio
//! task. Dropping the returned future (for instance because a dispatcher gave
//! up waiting) stops the wait, not the work: the task still finishes, its
//! write lands atomically or not at all, and [`CookieStore::pending_operations`]
//! drops back once it is done.
//!
//! ## Example
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use gosub_cookie_store::config::StoreConfig;
//! use gosub_cookie_store::cookies::{Cookie, CookieBackend, CookieStore, InMemoryBackend};
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let owner = backend.register_owner("alice").await?;
//! let store = CookieStore::new(StoreConfig::new(owner), backend);
//!
//! store.put_cookie(&Cookie::new("session", "u1").with_domain("example.com").with_path("/")).await?;
//! let cookies = store.find_cookies("example.com", Some("/"), false).await?;
//! assert_eq!(cookies.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{StoreConfig, Synchronicity};
use crate::cookies::backend::{CookieBackend, CookieQuery};
use crate::cookies::cookie::Cookie;
use crate::cookies::domain::{canonical_domain, permute_domain};
use crate::cookies::record::CookieRecord;
use crate::errors::{BackendError, StoreError};
use crate::owner::OwnerRef;

/// A handle to a shared cookie store.
pub type CookieStoreHandle = Arc<CookieStore>;

/// Decrements the pending counter when an operation finishes or is dropped.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Outcome of one backend call before it is folded into a [`StoreError`].
enum Attempt<T> {
    Done(Result<T, BackendError>),
    TimedOut(Duration),
}

/// Sorts matches most specific first: longer paths before shorter ones, then
/// older cookies (lower creation index) before newer ones.
fn sort_by_specificity(cookies: &mut [Cookie]) {
    cookies.sort_by(|a, b| {
        let a_len = a.path.as_deref().map_or(0, str::len);
        let b_len = b.path.as_deref().map_or(0, str::len);
        b_len.cmp(&a_len).then(a.creation_index.cmp(&b.creation_index))
    });
}

fn decode_all(records: Vec<CookieRecord>) -> Result<Vec<Cookie>, BackendError> {
    records.into_iter().map(Cookie::try_from).collect()
}

/// Cookie persistence for a single owner.
pub struct CookieStore {
    config: StoreConfig,
    backend: Arc<dyn CookieBackend>,
    pending: Arc<AtomicUsize>,
}

impl CookieStore {
    pub fn new(config: StoreConfig, backend: Arc<dyn CookieBackend>) -> Self {
        Self {
            config,
            backend,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Owner every operation of this store is scoped to.
    pub fn owner(&self) -> &OwnerRef {
        &self.config.owner
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of backend calls that have started but not yet finished.
    pub fn pending_operations(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Runs one backend call under the configured mode and deadline and maps
    /// its outcome to the store's error surface.
    async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn CookieBackend>, OwnerRef) -> Fut,
        Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let fut = call(self.backend.clone(), self.config.owner.clone());
        let guard = PendingGuard::enter(&self.pending);
        let limit = self.config.operation_timeout;

        let bounded = async move {
            let _guard = guard;
            match tokio::time::timeout(limit, fut).await {
                Ok(result) => Attempt::Done(result),
                Err(_) => Attempt::TimedOut(limit),
            }
        };

        let attempt = match self.config.mode {
            Synchronicity::Synchronous => bounded.await,
            Synchronicity::Asynchronous => match tokio::spawn(bounded).await {
                Ok(attempt) => attempt,
                Err(e) => Attempt::Done(Err(BackendError::Task(e.to_string()))),
            },
        };

        match attempt {
            Attempt::Done(Ok(value)) => Ok(value),
            Attempt::Done(Err(BackendError::OwnerNotFound(owner))) => {
                log::error!("cookie store {operation}: owner {owner} does not exist");
                Err(StoreError::OwnerNotFound)
            }
            Attempt::Done(Err(e)) => {
                log::error!("cookie store {operation} failed for owner {}: {e}", self.config.owner);
                Err(StoreError::Backend)
            }
            Attempt::TimedOut(limit) => {
                log::error!("cookie store {operation} timed out after {limit:?} for owner {}", self.config.owner);
                Err(StoreError::TimedOut(limit))
            }
        }
    }

    /// Looks up a single cookie by its full identity.
    ///
    /// Resolves with `None` right away when any identity part is missing.
    pub async fn find_cookie(
        &self,
        domain: Option<&str>,
        path: Option<&str>,
        key: Option<&str>,
    ) -> Result<Option<Cookie>, StoreError> {
        let (Some(domain), Some(path), Some(key)) = (domain, path, key) else {
            return Ok(None);
        };
        log::debug!("find_cookie {domain} {path} {key}");

        let (domain, path, key) = (domain.to_string(), path.to_string(), key.to_string());
        self.run("find_cookie", move |backend, owner| async move {
            backend
                .find_one(&owner, &domain, &path, &key)
                .await?
                .map(Cookie::try_from)
                .transpose()
        })
        .await
    }

    /// Finds every cookie that applies to `domain` and, when given, `path`.
    ///
    /// The domain is expanded into itself and its parent domains (see
    /// [`permute_domain`]); an expansion failure falls back to the domain alone.
    /// Without a path every path matches. Results are most specific first.
    pub async fn find_cookies(
        &self,
        domain: &str,
        path: Option<&str>,
        allow_special_use_domain: bool,
    ) -> Result<Vec<Cookie>, StoreError> {
        if domain.is_empty() {
            return Ok(vec![]);
        }

        let mut domains = permute_domain(domain, allow_special_use_domain);
        if domains.is_empty() {
            domains.push(canonical_domain(domain));
        }
        log::debug!("find_cookies {domains:?} path={path:?}");

        let query = CookieQuery {
            domains: Some(domains),
            path: path.filter(|p| !p.is_empty()).map(str::to_string),
        };
        let mut cookies = self
            .run("find_cookies", move |backend, owner| async move {
                decode_all(backend.find_many(&owner, &query).await?)
            })
            .await?;

        sort_by_specificity(&mut cookies);
        Ok(cookies)
    }

    /// Inserts `cookie`, replacing any cookie with the same `(domain, path, key)`.
    pub async fn put_cookie(&self, cookie: &Cookie) -> Result<(), StoreError> {
        log::debug!(
            "put_cookie {} {} {}",
            cookie.domain.as_deref().unwrap_or_default(),
            cookie.path.as_deref().unwrap_or_default(),
            cookie.key
        );

        let record = CookieRecord::from(cookie);
        self.run("put_cookie", move |backend, owner| async move {
            backend.upsert(&owner, record).await
        })
        .await
    }

    /// Replaces `old` with `new`. Always writes `new` in full.
    pub async fn update_cookie(&self, old: &Cookie, new: &Cookie) -> Result<(), StoreError> {
        log::debug!("update_cookie {} (index {} -> {})", new.key, old.creation_index, new.creation_index);
        self.put_cookie(new).await
    }

    /// Removes the cookie with the given identity. Missing parts make this a no-op.
    pub async fn remove_cookie(
        &self,
        domain: Option<&str>,
        path: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(key) = key else {
            return Ok(());
        };
        self.remove_cookies(domain, path, Some(key)).await
    }

    /// Removes every cookie at `(domain, path)`, or only `key` when given.
    ///
    /// A missing or empty domain or path makes this a no-op, so a partial
    /// identity can never widen into a broad delete.
    pub async fn remove_cookies(
        &self,
        domain: Option<&str>,
        path: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), StoreError> {
        let (Some(domain), Some(path)) = (domain.filter(|d| !d.is_empty()), path.filter(|p| !p.is_empty())) else {
            return Ok(());
        };
        log::debug!("remove_cookies {domain} {path} key={key:?}");

        let (domain, path, key) = (domain.to_string(), path.to_string(), key.map(str::to_string));
        let removed = self
            .run("remove_cookies", move |backend, owner| async move {
                backend.delete(&owner, &domain, &path, key.as_deref()).await
            })
            .await?;
        log::debug!("removed {removed} cookie(s)");
        Ok(())
    }

    /// Removes every cookie of this store's owner.
    pub async fn remove_all_cookies(&self) -> Result<(), StoreError> {
        let removed = self
            .run("remove_all_cookies", |backend, owner| async move {
                backend.delete_all(&owner).await
            })
            .await?;
        log::debug!("removed all {removed} cookie(s) of {}", self.config.owner);
        Ok(())
    }

    /// Returns every cookie of this store's owner, oldest first.
    pub async fn get_all_cookies(&self) -> Result<Vec<Cookie>, StoreError> {
        let mut cookies = self
            .run("get_all_cookies", |backend, owner| async move {
                decode_all(backend.find_many(&owner, &CookieQuery::all()).await?)
            })
            .await?;
        cookies.sort_by_key(|c| c.creation_index);
        Ok(cookies)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::cookies::backend::InMemoryBackend;
    use crate::cookies::cookie::{Expiry, MaxAge, SameSite};
    use crate::testing::{FailingBackend, SlowBackend, StalledBackend};

    async fn store_for(backend: Arc<dyn CookieBackend>, owner: &str, mode: Synchronicity) -> CookieStore {
        let id = backend.register_owner(owner).await.unwrap();
        let mut config = StoreConfig::new(id);
        config.mode = mode;
        CookieStore::new(config, backend)
    }

    async fn memory_store(mode: Synchronicity) -> CookieStore {
        store_for(Arc::new(InMemoryBackend::new()), "alice", mode).await
    }

    fn cookie(key: &str, value: &str, domain: &str, path: &str) -> Cookie {
        Cookie::new(key, value).with_domain(domain).with_path(path)
    }

    #[tokio::test]
    async fn end_to_end_put_then_find() {
        for mode in [Synchronicity::Synchronous, Synchronicity::Asynchronous] {
            let store = memory_store(mode).await;

            assert!(store.find_cookies("example.com", Some("/"), false).await.unwrap().is_empty());
            store.put_cookie(&cookie("session", "u1", "example.com", "/")).await.unwrap();

            let found = store.find_cookies("example.com", Some("/"), false).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].key, "session");
            assert_eq!(found[0].value, "u1");
            assert_eq!(store.pending_operations(), 0);
        }
    }

    #[tokio::test]
    async fn put_twice_is_an_upsert() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("session", "one", "example.com", "/")).await.unwrap();
        store.put_cookie(&cookie("session", "two", "example.com", "/")).await.unwrap();

        let all = store.get_all_cookies().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, "two");
    }

    #[tokio::test]
    async fn store_round_trips_every_attribute() {
        let store = memory_store(Synchronicity::Asynchronous).await;
        let mut c = cookie("session", "u1", "example.com", "/app");
        c.secure = true;
        c.http_only = true;
        c.path_is_default = true;
        c.same_site = Some(SameSite::Strict);
        c.expires = Expiry::Never;
        c.max_age = Some(MaxAge::Infinity);
        c.extensions = Some(vec!["Priority=Low".into()]);
        c.last_accessed = c.creation;

        store.put_cookie(&c).await.unwrap();
        let found = store
            .find_cookie(Some("example.com"), Some("/app"), Some("session"))
            .await
            .unwrap();
        assert_eq!(found, Some(c));
    }

    #[tokio::test]
    async fn find_cookie_with_missing_identity_is_none() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("k", "v", "example.com", "/")).await.unwrap();

        assert_eq!(store.find_cookie(None, Some("/"), Some("k")).await.unwrap(), None);
        assert_eq!(store.find_cookie(Some("example.com"), None, Some("k")).await.unwrap(), None);
        assert_eq!(store.find_cookie(Some("example.com"), Some("/"), None).await.unwrap(), None);
        assert_eq!(store.find_cookie(Some("example.com"), Some("/"), Some("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_cookies_matches_parent_domains_and_paths() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("root", "1", "example.com", "/")).await.unwrap();
        store.put_cookie(&cookie("sub", "2", "b.example.com", "/docs")).await.unwrap();
        store.put_cookie(&cookie("deeper", "3", "x.b.example.com", "/")).await.unwrap();
        store.put_cookie(&cookie("other", "4", "example.org", "/")).await.unwrap();
        store.put_cookie(&cookie("blog", "5", "example.com", "/blog")).await.unwrap();

        let keys: Vec<_> = store
            .find_cookies("a.b.example.com", Some("/docs/intro"), false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec!["sub", "root"]);

        let all_paths = store.find_cookies("example.com", None, false).await.unwrap();
        assert_eq!(all_paths.len(), 2);
    }

    #[tokio::test]
    async fn find_cookies_orders_by_path_then_creation() {
        let store = memory_store(Synchronicity::Synchronous).await;
        let first = cookie("first", "1", "example.com", "/");
        let second = cookie("second", "2", "example.com", "/");
        let deep = cookie("deep", "3", "example.com", "/a/b");
        let mid = cookie("mid", "4", "example.com", "/a");

        // insertion order differs from expected order on purpose
        for c in [&second, &mid, &first, &deep] {
            store.put_cookie(c).await.unwrap();
        }

        let keys: Vec<_> = store
            .find_cookies("example.com", Some("/a/b/c"), false)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(keys, vec!["deep", "mid", "first", "second"]);
    }

    #[tokio::test]
    async fn find_cookies_with_empty_domain_is_empty() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("k", "v", "", "/")).await.unwrap();
        assert!(store.find_cookies("", Some("/"), true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn special_use_domain_falls_back_to_exact_match() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("exact", "1", "app.localhost", "/")).await.unwrap();

        let found = store.find_cookies("app.localhost", Some("/"), false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "exact");
    }

    #[tokio::test]
    async fn exact_domain_fallback_is_case_insensitive() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("exact", "1", "app.localhost", "/")).await.unwrap();

        let found = store.find_cookies("App.LocalHost", Some("/"), false).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "exact");
    }

    #[tokio::test]
    async fn remove_cookies_without_key_is_owner_scoped() {
        let backend: Arc<dyn CookieBackend> = Arc::new(InMemoryBackend::new());
        let alice = store_for(backend.clone(), "alice", Synchronicity::Synchronous).await;
        let bob = store_for(backend.clone(), "bob", Synchronicity::Synchronous).await;

        for store in [&alice, &bob] {
            store.put_cookie(&cookie("a", "1", "example.com", "/")).await.unwrap();
            store.put_cookie(&cookie("b", "2", "example.com", "/")).await.unwrap();
            store.put_cookie(&cookie("c", "3", "example.com", "/other")).await.unwrap();
        }

        alice.remove_cookies(Some("example.com"), Some("/"), None).await.unwrap();

        let left: Vec<_> = alice.get_all_cookies().await.unwrap().into_iter().map(|c| c.key).collect();
        assert_eq!(left, vec!["c"]);
        assert_eq!(bob.get_all_cookies().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn remove_with_partial_identity_is_a_noop() {
        let store = memory_store(Synchronicity::Synchronous).await;
        store.put_cookie(&cookie("a", "1", "example.com", "/")).await.unwrap();

        store.remove_cookies(None, Some("/"), None).await.unwrap();
        store.remove_cookies(Some("example.com"), None, None).await.unwrap();
        store.remove_cookies(Some(""), Some("/"), None).await.unwrap();
        store.remove_cookie(Some("example.com"), Some("/"), None).await.unwrap();
        assert_eq!(store.get_all_cookies().await.unwrap().len(), 1);

        store.remove_cookie(Some("example.com"), Some("/"), Some("a")).await.unwrap();
        assert!(store.get_all_cookies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_all_only_touches_own_cookies() {
        let backend: Arc<dyn CookieBackend> = Arc::new(InMemoryBackend::new());
        let alice = store_for(backend.clone(), "alice", Synchronicity::Asynchronous).await;
        let bob = store_for(backend.clone(), "bob", Synchronicity::Asynchronous).await;

        alice.put_cookie(&cookie("a", "1", "example.com", "/")).await.unwrap();
        bob.put_cookie(&cookie("b", "2", "example.com", "/")).await.unwrap();

        alice.remove_all_cookies().await.unwrap();
        assert!(alice.get_all_cookies().await.unwrap().is_empty());
        assert_eq!(bob.find_cookies("example.com", Some("/"), false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_cookie_always_writes() {
        let store = memory_store(Synchronicity::Synchronous).await;
        let old = cookie("k", "v", "example.com", "/");
        store.put_cookie(&old).await.unwrap();

        let mut new = old.clone();
        new.value = "v2".into();
        store.update_cookie(&old, &new).await.unwrap();

        let found = store.find_cookie(Some("example.com"), Some("/"), Some("k")).await.unwrap().unwrap();
        assert_eq!(found.value, "v2");
        assert_eq!(found.creation_index, old.creation_index);
    }

    #[tokio::test]
    async fn unknown_owner_fails_writes_but_not_reads() {
        let store = CookieStore::new(StoreConfig::new(OwnerRef::name("ghost")), Arc::new(InMemoryBackend::new()));

        let err = store.put_cookie(&cookie("k", "v", "example.com", "/")).await.unwrap_err();
        assert_eq!(err, StoreError::OwnerNotFound);
        assert!(store.find_cookies("example.com", Some("/"), false).await.unwrap().is_empty());
        assert!(store.get_all_cookies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backend_failures_are_normalized() {
        for mode in [Synchronicity::Synchronous, Synchronicity::Asynchronous] {
            let mut config = StoreConfig::new(OwnerRef::name("alice"));
            config.mode = mode;
            let store = CookieStore::new(config, Arc::new(FailingBackend));

            assert_eq!(store.find_cookies("example.com", Some("/"), false).await, Err(StoreError::Backend));
            assert_eq!(
                store.find_cookie(Some("example.com"), Some("/"), Some("k")).await,
                Err(StoreError::Backend)
            );
            assert_eq!(
                store.put_cookie(&cookie("k", "v", "example.com", "/")).await,
                Err(StoreError::Backend)
            );
            assert_eq!(
                store.remove_cookies(Some("example.com"), Some("/"), None).await,
                Err(StoreError::Backend)
            );
            assert_eq!(store.remove_all_cookies().await, Err(StoreError::Backend));
            assert_eq!(store.get_all_cookies().await, Err(StoreError::Backend));
            assert_eq!(store.pending_operations(), 0);
        }
    }

    #[tokio::test]
    async fn stalled_backend_resolves_with_timeout() {
        for mode in [Synchronicity::Synchronous, Synchronicity::Asynchronous] {
            let mut config = StoreConfig::new(OwnerRef::name("alice"));
            config.mode = mode;
            config.operation_timeout = Duration::from_millis(50);
            let store = CookieStore::new(config, Arc::new(StalledBackend));

            let result = tokio::time::timeout(
                Duration::from_secs(5),
                store.find_cookies("example.com", Some("/"), false),
            )
            .await
            .expect("store operation hung");
            assert_eq!(result, Err(StoreError::TimedOut(Duration::from_millis(50))));
            assert_eq!(store.pending_operations(), 0);
        }
    }

    #[tokio::test]
    async fn abandoned_stalled_call_releases_its_task() {
        let mut config = StoreConfig::new(OwnerRef::name("alice"));
        config.mode = Synchronicity::Asynchronous;
        config.operation_timeout = Duration::from_millis(100);
        let store = CookieStore::new(config, Arc::new(StalledBackend));

        // the caller gives up long before the store's own bound
        let lookup = store.find_cookies("example.com", Some("/"), false);
        assert!(tokio::time::timeout(Duration::from_millis(10), lookup).await.is_err());
        assert_eq!(store.pending_operations(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.pending_operations(), 0);
    }

    #[cfg(feature = "sqlite_cookie_store")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_to_one_identity_leave_one_row_sqlite() {
        use crate::config::SqliteConfig;
        use crate::cookies::backend::SqliteBackend;

        let dir = tempfile::tempdir().unwrap();
        let mut sqlite = SqliteConfig::new(dir.path().join("cookies.sqlite"));
        sqlite.busy_timeout = Duration::from_secs(5);
        let backend = Arc::new(SqliteBackend::open(&sqlite).unwrap());

        assert_concurrent_puts_serialize(store_for(backend, "alice", Synchronicity::Asynchronous).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_puts_to_one_identity_leave_one_row_json() {
        use crate::cookies::backend::JsonBackend;

        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(JsonBackend::open(dir.path().join("cookies.json")).unwrap());

        assert_concurrent_puts_serialize(store_for(backend, "alice", Synchronicity::Asynchronous).await).await;
    }

    async fn assert_concurrent_puts_serialize(store: CookieStore) {
        let values: Vec<String> = (0..32).map(|i| format!("v{i}")).collect();
        let cookies: Vec<Cookie> = values.iter().map(|v| cookie("session", v, "example.com", "/")).collect();

        let results = futures::future::join_all(cookies.iter().map(|c| store.put_cookie(c))).await;
        assert!(results.iter().all(Result::is_ok), "{results:?}");

        let all = store.get_all_cookies().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(values.contains(&all[0].value));
        assert_eq!(store.pending_operations(), 0);
    }

    #[tokio::test]
    async fn abandoned_async_write_still_completes() {
        let inner = Arc::new(InMemoryBackend::new());
        let backend: Arc<dyn CookieBackend> = Arc::new(SlowBackend::new(inner, Duration::from_millis(100)));
        let store = store_for(backend, "alice", Synchronicity::Asynchronous).await;

        let c = cookie("k", "v", "example.com", "/");
        let put = store.put_cookie(&c);
        assert!(tokio::time::timeout(Duration::from_millis(10), put).await.is_err());
        assert_eq!(store.pending_operations(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(store.pending_operations(), 0);
        assert_eq!(store.get_all_cookies().await.unwrap().len(), 1);
    }
}

//! Deduplicating text cache.
//!
//! Every text request maps to a resource key. The first request for a key
//! installs a shared handle in the pending table before any I/O starts; all
//! later requests for that key get a clone of the same handle, so one
//! dictionary is fetched at most once per cache, whether the first request
//! is still in flight or long settled.
//!
//! Resolution order for a new handle: persistent store, then network. A
//! successful network payload is written back to the store best-effort.
//! The load runs as its own tokio task, so it finishes whether or not
//! anyone is still waiting on the handle.

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use l10n_core::{Dictionary, L10nError, Locale, Packages, Text, build_key};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tracing::{info, warn};

use crate::context::LocaleContext;
use crate::store::Store;
use crate::transport::Transport;

type TextFuture = Shared<BoxFuture<'static, Result<Text, L10nError>>>;

/// Options for [`DictionaryCache::get_text`]. Unset fields fall back to the
/// cache defaults.
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    url: Option<String>,
    packages: Packages,
    locale: Option<Locale>,
}

impl TextRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn packages(mut self, packages: impl Into<Packages>) -> Self {
        self.packages = packages.into();
        self
    }

    /// Override the current locale for this request only.
    pub fn locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// Shared result of a text request.
///
/// Every clone observes the same outcome; the underlying work runs once.
#[derive(Clone)]
pub struct TextHandle {
    key: Arc<str>,
    inner: TextFuture,
}

impl TextHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether both handles were produced for the same request.
    pub fn ptr_eq(&self, other: &TextHandle) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }

    /// The outcome, if the work has already settled.
    pub fn peek(&self) -> Option<&Result<Text, L10nError>> {
        self.inner.peek()
    }
}

impl std::fmt::Debug for TextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextHandle")
            .field("key", &self.key)
            .field("settled", &self.peek().is_some())
            .finish()
    }
}

impl Future for TextHandle {
    type Output = Result<Text, L10nError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

pub struct DictionaryCache {
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn Store>>,
    locale: LocaleContext,
    default_url: String,
    secure: bool,
    pending: Mutex<HashMap<String, TextHandle>>,
}

impl DictionaryCache {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Option<Arc<dyn Store>>,
        locale: LocaleContext,
        default_url: impl Into<String>,
        secure: bool,
    ) -> Self {
        Self {
            transport,
            store,
            locale,
            default_url: default_url.into(),
            secure,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// The resource key `request` maps to under the live locale.
    pub fn resource_key(&self, request: &TextRequest) -> String {
        let locale = request.locale.clone().unwrap_or_else(|| self.locale.current());
        build_key(&locale, &request.packages, self.secure)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Get the dictionary for `request`.
    ///
    /// Not `async`: the handle is registered before this returns, so two
    /// calls made back to back always share one handle. Failures surface
    /// through the handle's output.
    ///
    /// The load is spawned onto the current tokio runtime right away and runs
    /// to completion even if every holder drops its handle, so the result is
    /// still persisted. Must be called from within a tokio runtime.
    pub fn get_text(&self, request: TextRequest) -> TextHandle {
        let locale = request.locale.unwrap_or_else(|| self.locale.current());
        let packages = request.packages.normalized();
        let key = build_key(&locale, &request.packages, self.secure);

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.get(&key) {
            return handle.clone();
        }

        let key: Arc<str> = Arc::from(key);
        let load = load_text(
            Arc::clone(&self.transport),
            self.store.clone(),
            Arc::clone(&key),
            request.url.unwrap_or_else(|| self.default_url.clone()),
            locale.to_string(),
            packages,
        );
        let task = tokio::spawn(load);
        let joined = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(L10nError::Transport(format!("text load task failed: {e}"))),
            }
        };
        let handle = TextHandle {
            key: Arc::clone(&key),
            inner: joined.boxed().shared(),
        };
        pending.insert(key.to_string(), handle.clone());
        handle
    }
}

async fn load_text(
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn Store>>,
    key: Arc<str>,
    url: String,
    culture: String,
    packages: String,
) -> Result<Text, L10nError> {
    if let Some(store) = &store
        && let Some(dictionary) = read_stored(store.as_ref(), &key).await
    {
        info!("text loaded from store for '{}'", key);
        return Ok(Text::new(dictionary));
    }

    let query = [("culture", culture.as_str()), ("packages", packages.as_str())];
    let dictionary = transport
        .get_json(&url, &query)
        .await
        .inspect_err(|e| warn!("text fetch failed for '{}' ({}): {}", url, key, e))?;

    if let Some(store) = &store {
        write_stored(store.as_ref(), &key, &dictionary).await;
    }
    info!("text loaded from network for '{}'", key);
    Ok(Text::new(dictionary))
}

/// Stored entries that cannot be read or decoded count as a miss.
async fn read_stored(store: &dyn Store, key: &str) -> Option<Dictionary> {
    let raw = store
        .get(key)
        .await
        .inspect_err(|e| warn!("store read failed for '{}': {}", key, e))
        .ok()??;
    serde_json::from_str(&raw)
        .inspect_err(|e| warn!("discarding undecodable stored text for '{}': {}", key, e))
        .ok()
}

async fn write_stored(store: &dyn Store, key: &str, dictionary: &Dictionary) {
    let raw = match serde_json::to_string(dictionary) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("could not serialize text for '{}': {}", key, e);
            return;
        }
    };
    if let Err(e) = store.set(key, &raw).await {
        warn!("store write failed for '{}': {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::Script;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingTransport {
        calls: AtomicUsize,
        queries: Mutex<Vec<(String, String, String)>>,
        fail_with: Option<String>,
        delay: Duration,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Dictionary, L10nError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().unwrap().push((
                url.to_string(),
                query[0].1.to_string(),
                query[1].1.to_string(),
            ));
            if self.delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.delay).await;
            }
            match &self.fail_with {
                Some(reason) => Err(L10nError::Transport(reason.clone())),
                None => Ok(HashMap::from([("hi".to_string(), "mom".to_string())])),
            }
        }

        async fn get_script(&self, url: &str) -> Result<Script, L10nError> {
            Err(L10nError::Transport(format!("unexpected script fetch {url}")))
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl Store for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, L10nError> {
            Err(L10nError::Store("unavailable".to_string()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), L10nError> {
            Err(L10nError::Store("quota exceeded".to_string()))
        }
    }

    fn cache(transport: Arc<CountingTransport>, store: Option<Arc<dyn Store>>) -> DictionaryCache {
        DictionaryCache::new(
            transport,
            store,
            LocaleContext::new(Locale::parse("en-US")),
            "/l10n/gettext",
            false,
        )
    }

    #[tokio::test]
    async fn test_back_to_back_calls_share_one_fetch() {
        let transport = Arc::new(CountingTransport::default());
        let cache = cache(Arc::clone(&transport), None);

        let first = cache.get_text(TextRequest::new().url("svc").packages(["b", "a"]));
        let second = cache.get_text(TextRequest::new().url("svc").packages(["a", "b"]));
        assert!(first.ptr_eq(&second));
        assert_eq!(first.key(), "l10n:en-US:a,b");

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a.unwrap().get("hi"), "mom");
        assert_eq!(b.unwrap().get("hi"), "mom");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            transport.queries.lock().unwrap()[0],
            ("svc".to_string(), "en-US".to_string(), "a,b".to_string())
        );
    }

    #[tokio::test]
    async fn test_settled_handle_is_reused() {
        let transport = Arc::new(CountingTransport::default());
        let cache = cache(Arc::clone(&transport), None);

        let first = cache.get_text(TextRequest::new());
        first.clone().await.unwrap();
        let again = cache.get_text(TextRequest::new());
        assert!(again.ptr_eq(&first));
        assert!(again.peek().is_some());
        again.await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_default_url_and_live_locale() {
        let transport = Arc::new(CountingTransport::default());
        let cache = cache(Arc::clone(&transport), None);

        cache.get_text(TextRequest::new().packages("scroller")).await.unwrap();
        cache.locale.set_iso("pl-PL");
        cache.get_text(TextRequest::new().packages("scroller")).await.unwrap();

        let queries = transport.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].0, "/l10n/gettext");
        assert_eq!(queries[1].1, "pl-PL");
    }

    #[tokio::test]
    async fn test_locale_override_per_request() {
        let transport = Arc::new(CountingTransport::default());
        let cache = cache(Arc::clone(&transport), None);

        let request = TextRequest::new().locale("fr-ca").packages("a");
        assert_eq!(cache.resource_key(&request), "l10n:fr-CA:a");
        cache.get_text(request).await.unwrap();
        assert_eq!(transport.queries.lock().unwrap()[0].1, "fr-CA");
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_retried() {
        let transport = Arc::new(CountingTransport {
            fail_with: Some("Not Found".to_string()),
            ..CountingTransport::default()
        });
        let cache = cache(Arc::clone(&transport), None);

        let err = cache.get_text(TextRequest::new().url("no/exist")).await.unwrap_err();
        assert_eq!(err.to_string(), "Not Found");

        let again = cache.get_text(TextRequest::new().url("no/exist")).await;
        assert_eq!(again.unwrap_err(), L10nError::Transport("Not Found".to_string()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_is_written_to_store() {
        let transport = Arc::new(CountingTransport::default());
        let store = MemoryStore::new();
        let cache = cache(Arc::clone(&transport), Some(Arc::new(store.clone())));

        cache.get_text(TextRequest::new().packages("packageA")).await.unwrap();
        let raw = store.get("l10n:en-US:packageA").await.unwrap().unwrap();
        let stored: Dictionary = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.get("hi").map(String::as_str), Some("mom"));
    }

    #[tokio::test]
    async fn test_primed_store_skips_network() {
        let transport = Arc::new(CountingTransport::default());
        let store = MemoryStore::new();
        store.set("l10n:en-US:packageA", "{\"hi\":\"dad\"}").await.unwrap();
        let cache = cache(Arc::clone(&transport), Some(Arc::new(store)));

        let text = cache.get_text(TextRequest::new().packages(["packageA"])).await.unwrap();
        assert_eq!(text.get("hi"), "dad");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecodable_stored_entry_is_a_miss() {
        let transport = Arc::new(CountingTransport::default());
        let store = MemoryStore::new();
        store.set("l10n:en-US:packageA", "not json").await.unwrap();
        let cache = cache(Arc::clone(&transport), Some(Arc::new(store.clone())));

        let text = cache.get_text(TextRequest::new().packages("packageA")).await.unwrap();
        assert_eq!(text.get("hi"), "mom");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(store.get("l10n:en-US:packageA").await.unwrap().unwrap().contains("mom"));
    }

    #[tokio::test]
    async fn test_store_failures_are_swallowed() {
        let transport = Arc::new(CountingTransport::default());
        let cache = cache(Arc::clone(&transport), Some(Arc::new(BrokenStore)));

        let text = cache.get_text(TextRequest::new()).await.unwrap();
        assert_eq!(text.get("hi"), "mom");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_secure_context_changes_key() {
        let transport = Arc::new(CountingTransport::default());
        let cache = DictionaryCache::new(
            transport,
            None,
            LocaleContext::new(Locale::parse("en-US")),
            "/l10n/gettext",
            true,
        );
        let handle = cache.get_text(TextRequest::new().packages(["packageA", "packageB"]));
        assert_eq!(handle.key(), "l10n:en-US:secure:packageA,packageB");
    }
    fn slow_transport() -> Arc<CountingTransport> {
        Arc::new(CountingTransport {
            delay: Duration::from_millis(50),
            ..CountingTransport::default()
        })
    }

    #[tokio::test]
    async fn test_call_during_fetch_joins_inflight_request() {
        let transport = slow_transport();
        let cache = cache(Arc::clone(&transport), None);

        let first = cache.get_text(TextRequest::new().packages("packageA"));
        while transport.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(first.peek().is_none(), "first fetch should still be in flight");

        let second = cache.get_text(TextRequest::new().packages("packageA"));
        assert!(second.ptr_eq(&first));

        let (a, b) = tokio::join!(first, second);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(std::ptr::eq(a.as_map(), b.as_map()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_handle_still_fetches_and_persists() {
        let transport = slow_transport();
        let store = MemoryStore::new();
        let cache = cache(Arc::clone(&transport), Some(Arc::new(store.clone())));

        drop(cache.get_text(TextRequest::new().packages("prefetch")));
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(store.get("l10n:en-US:prefetch").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_timed_out_waiter_does_not_stall_the_load() {
        let transport = slow_transport();
        let store = MemoryStore::new();
        let cache = cache(Arc::clone(&transport), Some(Arc::new(store.clone())));

        let handle = cache.get_text(TextRequest::new().packages("packageA"));
        let waited = tokio::time::timeout(Duration::from_millis(10), handle).await;
        assert!(waited.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.get("l10n:en-US:packageA").await.unwrap().is_some());

        let text = cache.get_text(TextRequest::new().packages("packageA")).await.unwrap();
        assert_eq!(text.get("hi"), "mom");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }
}

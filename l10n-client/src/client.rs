use l10n_core::config::DEFAULT_TEXT_URL;
use l10n_core::{ClientConfig, L10nError, Locale, StoreKind};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{DictionaryCache, TextHandle, TextRequest};
use crate::context::LocaleContext;
use crate::script::{ScriptExecutor, ScriptLoader, ScriptRegistry};
use crate::store::{FileStore, MemoryStore, Store};
use crate::transport::{HttpTransport, Script, Transport};

/// Entry point: current locale, text cache and script loader over one
/// transport.
pub struct L10n {
    locale: LocaleContext,
    texts: DictionaryCache,
    scripts: ScriptLoader,
}

impl L10n {
    pub fn builder() -> L10nBuilder {
        L10nBuilder::default()
    }

    /// Wire an [`HttpTransport`] and the configured store.
    pub fn from_config(config: &ClientConfig) -> Result<Self, L10nError> {
        config.validate()?;

        let transport = HttpTransport::new(
            config.base_url.clone(),
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )?;
        let store: Option<Arc<dyn Store>> = match (config.store.kind, &config.store.dir) {
            (StoreKind::Memory, _) => Some(Arc::new(MemoryStore::new()) as Arc<dyn Store>),
            (StoreKind::File, Some(dir)) => Some(Arc::new(FileStore::new(dir)) as Arc<dyn Store>),
            (StoreKind::File, None) => {
                return Err(L10nError::Config("file store requires store.dir".to_string()));
            }
            (StoreKind::None, _) => None,
        };
        let locale = match &config.locale {
            Some(locale) => LocaleContext::new(locale.clone()),
            None => LocaleContext::from_env(config.default_locale.clone()),
        };

        let mut builder = L10n::builder()
            .transport(Arc::new(transport))
            .locale(locale)
            .text_url(config.text_url.clone())
            .secure_context(config.is_secure_context());
        if let Some(store) = store {
            builder = builder.store(store);
        }
        builder.build()
    }

    pub fn locale(&self) -> &LocaleContext {
        &self.locale
    }

    pub fn set_locale(&self, locale: impl Into<Locale>) {
        self.locale.set(locale.into());
    }

    pub fn get_text(&self, request: TextRequest) -> TextHandle {
        self.texts.get_text(request)
    }

    pub async fn get_script<F>(&self, template: &str, callback: Option<F>) -> Result<(), L10nError>
    where
        F: FnOnce(&Script),
    {
        self.scripts.get_script(template, callback).await
    }

    pub fn texts(&self) -> &DictionaryCache {
        &self.texts
    }
}

#[derive(Default)]
pub struct L10nBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn Store>>,
    executor: Option<Arc<dyn ScriptExecutor>>,
    locale: Option<LocaleContext>,
    text_url: Option<String>,
    secure_context: bool,
}

impl L10nBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Without a store every new key goes to the network.
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Share an existing locale context. Defaults to the environment locale.
    pub fn locale(mut self, locale: LocaleContext) -> Self {
        self.locale = Some(locale);
        self
    }

    pub fn text_url(mut self, url: impl Into<String>) -> Self {
        self.text_url = Some(url.into());
        self
    }

    pub fn secure_context(mut self, secure: bool) -> Self {
        self.secure_context = secure;
        self
    }

    pub fn build(self) -> Result<L10n, L10nError> {
        let transport = self
            .transport
            .ok_or_else(|| L10nError::Config("a transport is required".to_string()))?;
        let locale = self.locale.unwrap_or_default();
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ScriptRegistry::new()) as Arc<dyn ScriptExecutor>);

        Ok(L10n {
            texts: DictionaryCache::new(
                Arc::clone(&transport),
                self.store,
                locale.clone(),
                self.text_url.unwrap_or_else(|| DEFAULT_TEXT_URL.to_string()),
                self.secure_context,
            ),
            scripts: ScriptLoader::new(transport, executor, locale.clone()),
            locale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_transport() {
        let err = L10n::builder().build().err().unwrap();
        assert_eq!(err, L10nError::Config("a transport is required".to_string()));
    }

    #[test]
    fn test_from_config_uses_locale_override() {
        let config = ClientConfig::from_yaml("locale: pl-pl\nstore:\n  kind: none").unwrap();
        let l10n = L10n::from_config(&config).unwrap();
        assert_eq!(l10n.locale().current().to_string(), "pl-PL");

        l10n.set_locale("de");
        assert_eq!(l10n.texts().resource_key(&TextRequest::new()), "l10n:de:");
    }

    #[test]
    fn test_from_config_secure_base_url() {
        let config = ClientConfig::from_yaml("base_url: https://example.com\nlocale: en-US").unwrap();
        let l10n = L10n::from_config(&config).unwrap();
        assert_eq!(
            l10n.texts().resource_key(&TextRequest::new().packages("a")),
            "l10n:en-US:secure:a"
        );
    }
}

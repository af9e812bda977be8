use l10n_core::{L10nError, Locale};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::context::LocaleContext;
use crate::transport::{Script, Transport};

/// Replaced by the locale in script URL templates, e.g. `js/datepicker_ISO.js`.
pub const LOCALE_MARKER: &str = "ISO";

/// Runs a fetched script in the host environment.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, script: &Script) -> Result<(), L10nError>;
}

/// Default executor: keeps every executed script, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(url)
    }

    pub fn executed(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        urls.sort();
        urls
    }

    pub fn body(&self, url: &str) -> Option<String> {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .map(|s| s.body.clone())
    }
}

impl ScriptExecutor for ScriptRegistry {
    fn execute(&self, script: &Script) -> Result<(), L10nError> {
        if script.body.trim().is_empty() {
            return Err(L10nError::script(&script.url, "empty script body"));
        }
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(script.url.clone(), script.clone());
        Ok(())
    }
}

/// The URLs tried for `template`, most specific first: the full locale,
/// then the language alone. Both entries are the same when the locale has
/// no region, or when the template has no marker.
pub fn candidate_urls(template: &str, locale: &Locale) -> [String; 2] {
    [
        template.replacen(LOCALE_MARKER, &locale.to_string(), 1),
        template.replacen(LOCALE_MARKER, locale.lang(), 1),
    ]
}

/// Loads locale-specific scripts with a language-only fallback.
///
/// Outcomes are not cached; every call walks the chain again.
pub struct ScriptLoader {
    transport: Arc<dyn Transport>,
    executor: Arc<dyn ScriptExecutor>,
    locale: LocaleContext,
}

impl ScriptLoader {
    pub fn new(
        transport: Arc<dyn Transport>,
        executor: Arc<dyn ScriptExecutor>,
        locale: LocaleContext,
    ) -> Self {
        Self {
            transport,
            executor,
            locale,
        }
    }

    /// Fetch and execute the script for the current locale.
    ///
    /// `callback` runs with the loaded script before this resolves. When
    /// both attempts fail the error is the one from the language-only
    /// attempt: an [`L10nError::Script`] whose `url` is the language-only URL
    /// and whose `reason` is that attempt's own failure (e.g. `Not Found`).
    pub async fn get_script<F>(&self, template: &str, callback: Option<F>) -> Result<(), L10nError>
    where
        F: FnOnce(&Script),
    {
        let [locale_url, lang_url] = candidate_urls(template, &self.locale.current());

        let script = match self.load(&locale_url).await {
            Ok(script) => script,
            Err(first) => {
                debug!("script {} unavailable ({}), trying {}", locale_url, first, lang_url);
                self.load(&lang_url)
                    .await
                    .inspect_err(|e| warn!("script load failed for '{}': {}", template, e))?
            }
        };

        info!("script loaded from '{}'", script.url);
        if let Some(callback) = callback {
            callback(&script);
        }
        Ok(())
    }

    async fn load(&self, url: &str) -> Result<Script, L10nError> {
        let script = self
            .transport
            .get_script(url)
            .await
            .map_err(|e| L10nError::script(url, e))?;
        self.executor.execute(&script)?;
        Ok(script)
    }
}

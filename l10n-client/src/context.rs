use l10n_core::Locale;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Process-wide current locale.
///
/// Clones are handles onto the same value: a `set` through any of them is
/// seen by every later read.
#[derive(Debug, Clone)]
pub struct LocaleContext {
    current: Arc<RwLock<Locale>>,
}

impl LocaleContext {
    pub fn new(locale: Locale) -> Self {
        Self {
            current: Arc::new(RwLock::new(locale)),
        }
    }

    /// Initialize from the locale the operating environment reports, or
    /// `fallback` when it reports none.
    pub fn from_env(fallback: Locale) -> Self {
        let locale = sys_locale::get_locale()
            .map(|tag| Locale::parse(&tag))
            .unwrap_or(fallback);
        debug!(locale = %locale, "initial locale");
        Self::new(locale)
    }

    pub fn current(&self) -> Locale {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, locale: Locale) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current != locale {
            debug!("locale changed: {} -> {}", *current, locale);
            *current = locale;
        }
    }

    pub fn set_iso(&self, iso: &str) {
        self.set(Locale::parse(iso));
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::from_env(Locale::parse("en-US"))
    }
}

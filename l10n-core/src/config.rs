use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::L10nError;
use crate::locale::Locale;
use crate::yaml;

pub const DEFAULT_TEXT_URL: &str = "/l10n/gettext";
const DEFAULT_BASE_URL: &str = "http://localhost";
const DEFAULT_LOCALE: &str = "en-US";

/// Loader configuration, usually read from a YAML file.
///
/// ```yaml
/// base_url: ${L10N_BASE_URL:https://example.com}
/// text_url: /l10n/gettext
/// default_locale: en-US
/// store:
///   kind: file
///   dir: ./.l10n-cache
/// log:
///   level: debug
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Origin that relative text and script URLs are resolved against.
    pub base_url: String,
    pub text_url: String,
    /// Used when the environment reports no locale.
    pub default_locale: Locale,
    /// Replaces the ambient locale when set.
    pub locale: Option<Locale>,
    /// Defaults to whether `base_url` is served over https.
    pub secure_context: Option<bool>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub store: StoreSettings,
    pub log: LogSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            text_url: DEFAULT_TEXT_URL.to_string(),
            default_locale: Locale::parse(DEFAULT_LOCALE),
            locale: None,
            secure_context: None,
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
            store: StoreSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, L10nError> {
        let config: ClientConfig = yaml::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, L10nError> {
        let config: ClientConfig = yaml::load_from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), L10nError> {
        if self.text_url.trim().is_empty() {
            return Err(L10nError::Config("text_url must not be empty".to_string()));
        }
        if self.store.kind == StoreKind::File && self.store.dir.is_none() {
            return Err(L10nError::Config("file store requires store.dir".to_string()));
        }
        Ok(())
    }

    pub fn is_secure_context(&self) -> bool {
        self.secure_context
            .unwrap_or_else(|| self.base_url.starts_with("https"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Lives as long as the process.
    #[default]
    Memory,
    /// Survives restarts.
    File,
    None,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub console: bool,
    pub file: bool,
    pub dir: PathBuf,
    pub file_prefix: String,
    pub max_files: Option<usize>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: false,
            dir: PathBuf::from("./logs"),
            file_prefix: "l10n.log".to_string(),
            max_files: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_yaml("{}").unwrap();
        assert_eq!(config.text_url, DEFAULT_TEXT_URL);
        assert_eq!(config.default_locale.to_string(), "en-US");
        assert_eq!(config.store.kind, StoreKind::Memory);
        assert!(!config.is_secure_context());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_full_document() {
        let yaml = r#"
        base_url: https://example.com
        text_url: /svc/text
        locale: fr-ca
        store:
          kind: file
          dir: /tmp/l10n
        log:
          level: debug
          file: true
          max_files: 3
        "#;
        let config = ClientConfig::from_yaml(yaml).unwrap();
        assert!(config.is_secure_context());
        assert_eq!(config.locale, Some(Locale::parse("fr-CA")));
        assert_eq!(config.store.dir.as_deref(), Some(Path::new("/tmp/l10n")));
        assert_eq!(config.log.max_files, Some(3));
    }

    #[test]
    fn test_explicit_secure_flag_wins() {
        let config = ClientConfig::from_yaml("base_url: https://example.com\nsecure_context: false").unwrap();
        assert!(!config.is_secure_context());
    }

    #[test]
    fn test_file_store_requires_dir() {
        let err = ClientConfig::from_yaml("store:\n  kind: file").unwrap_err();
        assert!(matches!(err, L10nError::Config(_)));
    }

    #[test]
    fn test_empty_text_url_rejected() {
        let err = ClientConfig::from_yaml("text_url: ''").unwrap_err();
        assert_eq!(err, L10nError::Config("text_url must not be empty".to_string()));
    }
}

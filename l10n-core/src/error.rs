use thiserror::Error;

use crate::yaml::YamlLoaderError;

/// Errors surfaced by the loader.
///
/// The type is `Clone` because a single failure is broadcast to every
/// holder of a shared text handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum L10nError {
    /// Text or script fetch failed. Carries the transport's own description.
    #[error("{0}")]
    Transport(String),
    /// Payload could not be decoded into a string map.
    #[error("decode error: {0}")]
    Decode(String),
    #[error("script {url} failed: {reason}")]
    Script { url: String, reason: String },
    /// Persistent store failure. The text cache never lets this escape.
    #[error("store error: {0}")]
    Store(String),
    #[error("config error: {0}")]
    Config(String),
}

impl L10nError {
    pub fn script(url: impl Into<String>, reason: impl ToString) -> Self {
        L10nError::Script {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<YamlLoaderError> for L10nError {
    fn from(err: YamlLoaderError) -> Self {
        L10nError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for L10nError {
    fn from(err: serde_json::Error) -> Self {
        L10nError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for L10nError {
    fn from(err: std::io::Error) -> Self {
        L10nError::Store(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_displays_bare_reason() {
        let err = L10nError::Transport("Not Found".to_string());
        assert_eq!(err.to_string(), "Not Found");
    }

    #[test]
    fn script_error_names_url() {
        let err = L10nError::script("js/datepicker_fr.js", "Not Found");
        assert_eq!(err.to_string(), "script js/datepicker_fr.js failed: Not Found");
    }
}

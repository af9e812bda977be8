//! HTTP access to the text endpoint and to localized scripts.

use async_trait::async_trait;
use l10n_core::{Dictionary, L10nError};
use reqwest::{Client, Response, header};
use std::time::Duration;

/// A script as fetched from the server, not yet executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// Network side of the loader.
///
/// Implementations report any non-success outcome as
/// [`L10nError::Transport`] carrying a human readable reason; callers do not
/// distinguish network failures from error statuses.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with `query` and decode a JSON object of strings.
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Dictionary, L10nError>;

    /// GET a script body.
    async fn get_script(&self, url: &str) -> Result<Script, L10nError>;
}

/// `reqwest`-backed transport.
///
/// # Invariants
/// - `base_url` carries no trailing slash.
pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(
        mut base_url: String,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, L10nError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|err| L10nError::Transport(err.to_string()))?;
        let trimmed_len = base_url.trim_end_matches('/').len();
        base_url.truncate(trimmed_len);
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base.
    pub fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!("{}/{}", self.base_url, url.trim_start_matches('/'))
    }

    async fn send(&self, url: &str, query: &[(&str, &str)]) -> Result<Response, L10nError> {
        let response = self
            .client
            .get(self.resolve(url))
            .query(query)
            .send()
            .await
            .map_err(|err| L10nError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            return Err(L10nError::Transport(reason));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Dictionary, L10nError> {
        let body = self
            .send(url, query)
            .await?
            .text()
            .await
            .map_err(|err| L10nError::Transport(err.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_script(&self, url: &str) -> Result<Script, L10nError> {
        let response = self.send(url, &[]).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|err| L10nError::Transport(err.to_string()))?;
        Ok(Script {
            url: url.to_string(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base.to_string(), Duration::from_secs(1), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        assert_eq!(transport("http://localhost:8080//").base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let t = transport("http://localhost:8080/");
        assert_eq!(t.resolve("/l10n/gettext"), "http://localhost:8080/l10n/gettext");
        assert_eq!(t.resolve("fake/service"), "http://localhost:8080/fake/service");
        assert_eq!(t.resolve("https://cdn.example.com/a.js"), "https://cdn.example.com/a.js");
    }
}

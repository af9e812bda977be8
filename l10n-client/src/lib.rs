//! Loader for localized text dictionaries and locale-specific scripts.
//!
//! Text requests are deduplicated per resource key and persisted through a
//! [`Store`]; scripts are loaded for the full locale first and the bare
//! language second.

pub mod cache;
pub mod client;
pub mod context;
pub mod script;
pub mod store;
pub mod transport;

pub use cache::{DictionaryCache, TextHandle, TextRequest};
pub use client::{L10n, L10nBuilder};
pub use context::LocaleContext;
pub use script::{LOCALE_MARKER, ScriptExecutor, ScriptLoader, ScriptRegistry, candidate_urls};
pub use store::{FileStore, MemoryStore, Store};
pub use transport::{HttpTransport, Script, Transport};

pub use l10n_core::{ClientConfig, L10nError, Locale, NOT_FOUND_MARKER, Packages, Text};

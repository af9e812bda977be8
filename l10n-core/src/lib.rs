pub mod config;
pub mod error;
pub mod key;
pub mod locale;
pub mod text;
pub mod yaml;

pub use config::{ClientConfig, LogSettings, StoreKind, StoreSettings};
pub use error::L10nError;
pub use key::{Packages, build_key};
pub use locale::Locale;
pub use text::{Dictionary, NOT_FOUND_MARKER, Text};

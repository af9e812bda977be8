use serde::Deserialize;

use crate::locale::Locale;

const NAMESPACE: &str = "l10n";
const SECURE: &str = "secure";

/// Package names requested from the text endpoint.
///
/// A list is canonicalized (sorted, comma-joined) so that request order does
/// not change the resource key. A single name is used as given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Packages {
    One(String),
    Many(Vec<String>),
}

impl Default for Packages {
    fn default() -> Self {
        Packages::Many(Vec::new())
    }
}

impl Packages {
    pub fn normalized(&self) -> String {
        match self {
            Packages::One(name) => name.clone(),
            Packages::Many(names) => {
                let mut sorted: Vec<&str> = names.iter().map(String::as_str).collect();
                sorted.sort_unstable();
                sorted.join(",")
            }
        }
    }
}

impl From<&str> for Packages {
    fn from(name: &str) -> Self {
        Packages::One(name.to_string())
    }
}

impl From<String> for Packages {
    fn from(name: String) -> Self {
        Packages::One(name)
    }
}

impl From<Vec<String>> for Packages {
    fn from(names: Vec<String>) -> Self {
        Packages::Many(names)
    }
}

impl From<Vec<&str>> for Packages {
    fn from(names: Vec<&str>) -> Self {
        Packages::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Packages {
    fn from(names: [&str; N]) -> Self {
        Packages::Many(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Build the identity of a text resource.
///
/// Format: `l10n:<locale>[:secure]:<packages>`. The key doubles as the
/// persistent store key and the in-flight request key. The `secure` segment
/// keeps pages served over https from sharing entries with plain http pages.
pub fn build_key(locale: &Locale, packages: &Packages, secure: bool) -> String {
    let mut parts = vec![NAMESPACE.to_string(), locale.to_string()];
    if secure {
        parts.push(SECURE.to_string());
    }
    parts.push(packages.normalized());
    parts.join(":")
}

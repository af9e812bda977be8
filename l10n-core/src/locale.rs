use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

const SEPARATOR: char = '-';

/// A language with an optional region, e.g. `en` or `en-US`.
///
/// Parsing normalizes case (lowercase language, uppercase region) and does
/// not validate the codes. Input that is already canonical survives a
/// parse/serialize round trip unchanged; anything else comes back normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale {
    lang: String,
    region: Option<String>,
}

impl Locale {
    pub fn new(lang: impl Into<String>, region: Option<&str>) -> Self {
        Self {
            lang: lang.into().to_lowercase(),
            region: region.map(str::to_uppercase),
        }
    }

    /// Parse `lang` or `lang-REGION`.
    ///
    /// Segments beyond the second are ignored and an empty input yields an
    /// empty language.
    pub fn parse(iso: &str) -> Self {
        let mut parts = iso.split(SEPARATOR);
        let lang = parts.next().unwrap_or_default().to_lowercase();
        let region = parts.next().map(str::to_uppercase);
        Self { lang, region }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The same locale without its region.
    pub fn language_only(&self) -> Self {
        Self {
            lang: self.lang.clone(),
            region: None,
        }
    }

    pub fn to_iso_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.region {
            Some(region) => write!(f, "{}{}{}", self.lang, SEPARATOR, region),
            None => f.write_str(&self.lang),
        }
    }
}

impl FromStr for Locale {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Locale::parse(s))
    }
}

impl From<String> for Locale {
    fn from(s: String) -> Self {
        Locale::parse(&s)
    }
}

impl From<&str> for Locale {
    fn from(s: &str) -> Self {
        Locale::parse(s)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.to_string()
    }
}

use std::collections::HashMap;
use std::sync::Arc;

/// Flat translation table as served by the text endpoint.
pub type Dictionary = HashMap<String, String>;

/// Appended to a key that has no translation, so gaps show up in the UI.
pub const NOT_FOUND_MARKER: &str = "!NOTFOUND!";

/// Read-only view over a resolved [`Dictionary`].
///
/// Clones share the underlying table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Text {
    entries: Arc<Dictionary>,
}

impl Text {
    pub fn new(entries: Dictionary) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Translation for `key`, or `key` followed by [`NOT_FOUND_MARKER`].
    pub fn get(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| format!("{key}{NOT_FOUND_MARKER}"))
    }

    /// Like [`Text::get`], and also runs `callback` with the value when the
    /// key exists. The callback runs before this returns and does not affect
    /// the return value.
    pub fn get_with<F>(&self, key: &str, callback: F) -> String
    where
        F: FnOnce(&str),
    {
        match self.entries.get(key) {
            Some(value) => {
                callback(value);
                value.clone()
            }
            None => format!("{key}{NOT_FOUND_MARKER}"),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_map(&self) -> &Dictionary {
        &self.entries
    }
}

impl From<Dictionary> for Text {
    fn from(entries: Dictionary) -> Self {
        Text::new(entries)
    }
}

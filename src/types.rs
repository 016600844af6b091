//! Core types used throughout the crate.

use std::collections::HashSet;
use std::fmt;
use std::hash::{
    Hash,
    Hasher,
};
use std::sync::Arc;

use serde::{
    Deserialize,
    Serialize,
};

/// A language/region the cache is partitioned by.
///
/// Equality and hashing only consider `code`; the display name is cosmetic.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Locale {
    /// ISO code (e.g. "en", "fr-CA").
    pub code: String,
    pub display_name: String,
}

impl Locale {
    #[must_use]
    pub fn new(code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { code: code.into(), display_name: display_name.into() }
    }
}

impl PartialEq for Locale {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Locale {}

impl Hash for Locale {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// An opaque translation key (e.g. "common.greeting").
///
/// Cloning is cheap; the name is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationKey(Arc<str>);

impl TranslationKey {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The literal key name, used as the last-resort fallback text.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TranslationKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of keys the application can request.
///
/// Built once at startup and never mutated afterwards. Iteration order is the
/// sorted key order so that switches are deterministic.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: Arc<[TranslationKey]>,
}

impl KeyRegistry {
    /// Builds a registry from key names, dropping duplicates.
    #[must_use]
    pub fn from_keys<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut keys: Vec<TranslationKey> = names
            .into_iter()
            .filter(|name| seen.insert(name.as_ref().to_string()))
            .map(|name| TranslationKey::new(name.as_ref()))
            .collect();
        keys.sort();
        Self { keys: keys.into() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationKey> {
        self.keys.iter()
    }

    #[must_use]
    pub fn contains(&self, key: &TranslationKey) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

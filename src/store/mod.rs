//! Durable `(locale, key) → text` storage consumed by the engine.

mod json_file;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use crate::types::{
    Locale,
    TranslationKey,
};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse stored translations: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Persistent translation storage.
///
/// Implementations must be safe to call from several backfill tasks at once;
/// concurrent writes to the same pair are last-write-wins.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Loads every stored text for `locale`, keyed by key name.
    async fn load_all(&self, locale: &Locale) -> Result<HashMap<String, String>, StorageError>;

    /// Inserts or replaces one text.
    async fn upsert(
        &self,
        locale: &Locale,
        key: &TranslationKey,
        text: &str,
    ) -> Result<(), StorageError>;
}

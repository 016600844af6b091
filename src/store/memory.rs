//! In-process store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    PersistentStore,
    StorageError,
};
use crate::types::{
    Locale,
    TranslationKey,
};

/// メモリ上の `PersistentStore`
///
/// プロセス終了で内容は失われます。テストや一時的な利用向け。
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// locale code → key → text
    rows: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みの 1 件を取得
    pub async fn get(&self, locale: &Locale, key: &str) -> Option<String> {
        self.rows.read().await.get(&locale.code).and_then(|keys| keys.get(key)).cloned()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn load_all(&self, locale: &Locale) -> Result<HashMap<String, String>, StorageError> {
        Ok(self.rows.read().await.get(&locale.code).cloned().unwrap_or_default())
    }

    async fn upsert(
        &self,
        locale: &Locale,
        key: &TranslationKey,
        text: &str,
    ) -> Result<(), StorageError> {
        self.rows
            .write()
            .await
            .entry(locale.code.clone())
            .or_default()
            .insert(key.name().to_string(), text.to_string());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[tokio::test]
    async fn upsert_then_load_all() {
        let store = MemoryStore::new();
        let french = Locale::new("fr", "French");

        store.upsert(&french, &"GREETING".into(), "Bonjour").await.unwrap();
        store.upsert(&french, &"GREETING".into(), "Salut").await.unwrap();

        let rows = store.load_all(&french).await.unwrap();
        assert_that!(rows.get("GREETING"), some(eq(&"Salut".to_string())));
        assert_that!(rows.len(), eq(1));
    }

    #[tokio::test]
    async fn unknown_locale_is_empty() {
        let store = MemoryStore::new();

        let rows = store.load_all(&Locale::new("ja", "Japanese")).await.unwrap();

        assert_that!(rows.is_empty(), eq(true));
    }
}

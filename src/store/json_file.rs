//! JSON file backed store
//!
//! 1 locale につき 1 ファイル（`<dir>/<code>.json`）の平坦なオブジェクトとして保存します。

use std::collections::{
    BTreeMap,
    HashMap,
};
use std::io::ErrorKind;
use std::path::{
    Path,
    PathBuf,
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{
    PersistentStore,
    StorageError,
};
use crate::types::{
    Locale,
    TranslationKey,
};

/// ファイルベースの `PersistentStore`
#[derive(Debug)]
pub struct JsonFileStore {
    /// 保存先ディレクトリ
    dir: PathBuf,
    /// read-modify-write を直列化するためのロック
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// locale のファイルパス
    fn locale_path(&self, locale: &Locale) -> PathBuf {
        self.dir.join(format!("{}.json", locale.code))
    }

    /// ファイルを読み込む（存在しなければ空）
    async fn read_locale(&self, locale: &Locale) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.locale_path(locale);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Store file not found, treating as empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl PersistentStore for JsonFileStore {
    async fn load_all(&self, locale: &Locale) -> Result<HashMap<String, String>, StorageError> {
        Ok(self.read_locale(locale).await?.into_iter().collect())
    }

    async fn upsert(
        &self,
        locale: &Locale,
        key: &TranslationKey,
        text: &str,
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut rows = self.read_locale(locale).await?;
        rows.insert(key.name().to_string(), text.to_string());

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.locale_path(locale);
        // 一時ファイルに書いてから rename で置き換える
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serde_json::to_string_pretty(&rows)?).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::trace!(locale = %locale, key = %key, "Persisted translation");
        Ok(())
    }
}

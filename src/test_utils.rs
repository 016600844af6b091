//! テスト用ユーティリティ
//!
//! 複数のテストモジュールで使用される翻訳サービス・ストアのテストダブルを提供します。
#![cfg(test)]
#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::baseline::Baseline;
use crate::store::{
    PersistentStore,
    StorageError,
};
use crate::translator::{
    TranslationError,
    TranslationService,
};
use crate::types::{
    KeyRegistry,
    Locale,
    TranslationKey,
};

pub(crate) fn english() -> Locale {
    Locale::new("en", "English")
}

pub(crate) fn french() -> Locale {
    Locale::new("fr", "French")
}

pub(crate) fn german() -> Locale {
    Locale::new("de", "German")
}

/// テスト用の Baseline とレジストリを作成する
pub(crate) fn create_baseline(texts: &[(&str, &str)]) -> (Baseline, KeyRegistry) {
    let registry = KeyRegistry::from_keys(texts.iter().map(|(key, _)| *key));
    let texts: HashMap<String, String> =
        texts.iter().map(|(key, text)| ((*key).to_string(), (*text).to_string())).collect();
    (Baseline::new(english(), &registry, &texts), registry)
}

/// 事前に登録した `(target code, source text) → 翻訳` を返す翻訳サービス
///
/// `gated` で作成した場合、`release` されるまで翻訳は完了しません。
#[derive(Debug, Default)]
pub(crate) struct ScriptedTranslator {
    /// 翻訳表
    responses: HashMap<(String, String), String>,
    /// 完了を制御するゲート
    gate: Option<Arc<Semaphore>>,
    /// 呼び出し回数
    calls: AtomicUsize,
    /// 呼び出し履歴 `(text, to)`
    log: Mutex<Vec<(String, String)>>,
}

impl ScriptedTranslator {
    pub(crate) fn new(responses: &[(&str, &str, &str)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(to, text, result)| {
                    (((*to).to_string(), (*text).to_string()), (*result).to_string())
                })
                .collect(),
            ..Self::default()
        }
    }

    pub(crate) fn gated(responses: &[(&str, &str, &str)]) -> Self {
        Self { gate: Some(Arc::new(Semaphore::new(0))), ..Self::new(responses) }
    }

    /// ゲートを `n` 件分開ける
    pub(crate) fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn log(&self) -> Vec<(String, String)> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranslationService for ScriptedTranslator {
    async fn translate(
        &self,
        text: &str,
        _from: &Locale,
        to: &Locale,
    ) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push((text.to_string(), to.code.clone()));

        if let Some(gate) = &self.gate {
            gate.acquire().await.map_err(|e| TranslationError::Unavailable(e.to_string()))?.forget();
        }

        self.responses
            .get(&(to.code.clone(), text.to_string()))
            .cloned()
            .ok_or_else(|| TranslationError::Unavailable(format!("no script for '{text}'")))
    }
}

/// 全ての操作が失敗するストア
#[derive(Debug, Default)]
pub(crate) struct FailingStore {
    /// `upsert` の呼び出し回数
    pub(crate) upserts: AtomicUsize,
}

#[async_trait]
impl PersistentStore for FailingStore {
    async fn load_all(&self, _locale: &Locale) -> Result<HashMap<String, String>, StorageError> {
        Err(StorageError::Backend("store offline".to_string()))
    }

    async fn upsert(
        &self,
        _locale: &Locale,
        _key: &TranslationKey,
        _text: &str,
    ) -> Result<(), StorageError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Backend("store offline".to_string()))
    }
}

//! Per-locale text cache
//!
//! UI がバインドする `ObservableText` を `(locale, key)` ごとに 1 つだけ保持します。
//! セルは初回アクセス時に Baseline のテキストで作られ、以後は置き換えられず
//! その場で更新されます。エビクションはありません。

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

use crate::baseline::Baseline;
use crate::observable::ObservableText;
use crate::types::{
    Locale,
    TranslationKey,
};

/// キャッシュの 1 エントリ
#[derive(Debug)]
struct CacheEntry {
    /// UI にバインドされるセル
    text: Arc<ObservableText>,
    /// 翻訳済み（永続化済み・バックフィル済み・手動設定）の値が適用されたか
    confirmed: bool,
}

/// `(locale, key) → ObservableText` のキャッシュ
#[derive(Debug)]
pub struct Cache {
    /// セルの初期値
    baseline: Arc<Baseline>,
    /// locale code → key → エントリ
    entries: Mutex<HashMap<String, HashMap<TranslationKey, CacheEntry>>>,
}

impl Cache {
    #[must_use]
    pub fn new(baseline: Arc<Baseline>) -> Self {
        Self { baseline, entries: Mutex::new(HashMap::new()) }
    }

    /// エントリマップのロックを取得
    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashMap<TranslationKey, CacheEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// セルを取得（存在しなければ Baseline のテキストで作成）
    ///
    /// 何度呼んでも同じセルを返します。
    pub fn get(&self, locale: &Locale, key: &TranslationKey) -> Arc<ObservableText> {
        let mut entries = self.lock();
        let entry = entries
            .entry(locale.code.clone())
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| {
                tracing::trace!(locale = %locale, key = %key, "Seeding cache entry");
                CacheEntry {
                    text: Arc::new(ObservableText::new(self.baseline.get(key))),
                    confirmed: false,
                }
            });
        Arc::clone(&entry.text)
    }

    /// セルの値をその場で更新し、翻訳済みとしてマークする
    ///
    /// UI のシリアライズされた実行コンテキストからのみ呼び出すこと。
    /// セルが無い場合は作成してから更新します（既存セルを置き換えることはありません）。
    pub(crate) fn set(&self, locale: &Locale, key: &TranslationKey, text: &str) {
        let cell = {
            let mut entries = self.lock();
            let entry = entries
                .entry(locale.code.clone())
                .or_default()
                .entry(key.clone())
                .or_insert_with(|| CacheEntry {
                    text: Arc::new(ObservableText::new(self.baseline.get(key))),
                    confirmed: false,
                });
            entry.confirmed = true;
            Arc::clone(&entry.text)
        };
        // 購読者のコールバックはロック外で呼ぶ
        cell.set(text);
    }

    /// 翻訳済みの値が適用されているか
    ///
    /// Baseline で初期化されただけ（翻訳待ち）のセルは `false`。
    #[must_use]
    pub fn has(&self, locale: &Locale, key: &TranslationKey) -> bool {
        self.lock()
            .get(&locale.code)
            .and_then(|keys| keys.get(key))
            .is_some_and(|entry| entry.confirmed)
    }
}

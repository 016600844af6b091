//! Localized text synchronization engine
//!
//! locale の切り替え、Baseline へのフォールバック、非同期バックフィル、
//! 古い結果の破棄をまとめて扱います。
//!
//! # 実行コンテキスト
//!
//! キャッシュの更新とリスナー通知は、`set_locale` / `add_translation` /
//! `apply_backfill` を呼び出す UI 側のコンテキストでのみ行われます。
//! バックフィルはワーカー上で翻訳と永続化だけを行い、結果をチャネルで返します。
//! UI 側は `apply_pending`（ポーリング）、`next_backfill` + `apply_backfill`
//! （イベントループ）、`settle`（全件待ち）のいずれかで結果を取り込みます。

mod backfill;
mod listeners;

use std::collections::HashMap;
use std::sync::{
    Arc,
    Mutex,
    PoisonError,
    RwLock,
};

pub use backfill::BackfillOutcome;
pub use listeners::ListenerId;

use self::backfill::{
    BackfillJob,
    BackfillQueue,
};
use self::listeners::Listeners;
use crate::baseline::Baseline;
use crate::cache::Cache;
use crate::config::{
    BackfillConfig,
    ConfigManager,
};
use crate::error::InitError;
use crate::observable::ObservableText;
use crate::store::PersistentStore;
use crate::translator::TranslationService;
use crate::types::{
    KeyRegistry,
    Locale,
    TranslationKey,
};

/// エンジンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Switching,
}

/// 切り替えの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SwitchMode {
    /// 通常の切り替え。現在の locale と同じなら何もしない
    Change,
    /// 現在の locale をストアから読み直す。現在の locale でなければ何もしない
    Refresh,
}

/// エンジンの共有状態
struct Inner {
    /// 有効なキーの集合
    registry: KeyRegistry,
    /// Baseline テキスト
    baseline: Arc<Baseline>,
    /// UI がバインドするセル
    cache: Cache,
    /// 永続ストア
    store: Arc<dyn PersistentStore>,
    /// バックフィル
    backfill: BackfillQueue,
    /// locale 変更リスナー
    listeners: Listeners,
    /// 現在の locale
    current: RwLock<Locale>,
    /// 現在の状態
    state: Mutex<EngineState>,
    /// 切り替えを相互排他にするロック
    switch_lock: tokio::sync::Mutex<()>,
}

/// Localized text synchronization engine.
///
/// Construct once at startup and pass clones around; all clones share the same
/// cache, listeners and backfill queue.
#[derive(Clone)]
pub struct LocaleSync {
    /// 共有状態
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LocaleSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocaleSync")
            .field("current", &self.current_locale())
            .field("state", &self.state())
            .field("keys", &self.inner.registry.len())
            .field("backfill", &self.inner.backfill)
            .field("listeners", &self.inner.listeners)
            .finish_non_exhaustive()
    }
}

impl LocaleSync {
    /// エンジンを作成
    ///
    /// 現在の locale は Baseline locale で、全キーの Baseline セルが作成済みの状態で始まります。
    #[must_use]
    pub fn new(
        baseline: Baseline,
        registry: KeyRegistry,
        store: Arc<dyn PersistentStore>,
        translator: Arc<dyn TranslationService>,
        config: &BackfillConfig,
    ) -> Self {
        let baseline = Arc::new(baseline);
        let current = baseline.locale().clone();
        let cache = Cache::new(Arc::clone(&baseline));
        for key in registry.iter() {
            cache.get(&current, key);
        }

        tracing::debug!(
            baseline = %current,
            keys = registry.len(),
            concurrency = config.concurrency(),
            "Locale sync engine created"
        );

        Self {
            inner: Arc::new(Inner {
                registry,
                baseline,
                cache,
                backfill: BackfillQueue::new(translator, Arc::clone(&store), config),
                store,
                listeners: Listeners::default(),
                current: RwLock::new(current),
                state: Mutex::new(EngineState::Idle),
                switch_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// 設定に従って Baseline ファイルを読み込み、エンジンを作成
    ///
    /// # Errors
    /// Baseline ファイルが読めない場合は起動不能として `InitError` を返す
    pub fn from_settings(
        config_manager: &ConfigManager,
        store: Arc<dyn PersistentStore>,
        translator: Arc<dyn TranslationService>,
    ) -> Result<Self, InitError> {
        let settings = config_manager.get_settings();
        let baseline_path = config_manager.resolve_path(&settings.baseline_file);
        let (baseline, registry) = Baseline::load_file(
            settings.baseline_locale.clone(),
            &baseline_path,
            &settings.key_separator,
        )?;

        Ok(Self::new(baseline, registry, store, translator, &settings.backfill))
    }

    /// 現在の locale のセルを取得（UI にそのままバインドできる）
    #[must_use]
    pub fn get(&self, key: &TranslationKey) -> Arc<ObservableText> {
        self.inner.cache.get(&self.current_locale(), key)
    }

    /// 指定 locale のセルを取得
    #[must_use]
    pub fn get_for(&self, locale: &Locale, key: &TranslationKey) -> Arc<ObservableText> {
        self.inner.cache.get(locale, key)
    }

    /// 翻訳済みの値がキャッシュに反映されているか
    #[must_use]
    pub fn has(&self, locale: &Locale, key: &TranslationKey) -> bool {
        self.inner.cache.has(locale, key)
    }

    #[must_use]
    pub fn current_locale(&self) -> Locale {
        self.inner.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn baseline_locale(&self) -> &Locale {
        self.inner.baseline.locale()
    }

    #[must_use]
    pub fn baseline(&self) -> &Baseline {
        &self.inner.baseline
    }

    #[must_use]
    pub fn registry(&self) -> &KeyRegistry {
        &self.inner.registry
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 状態を更新
    fn set_state(&self, state: EngineState) {
        *self.inner.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// locale 変更リスナーを登録
    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Locale) + Send + Sync + 'static,
    {
        self.inner.listeners.subscribe(callback)
    }

    /// リスナーを解除
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    /// 現在の locale を切り替える
    ///
    /// 永続化済みの翻訳は即座に反映され、未翻訳のキーはバックフィルが予約されます。
    /// リスナーはバックフィルの完了を待たずに通知されます。
    pub async fn set_locale(&self, target: Locale) {
        self.switch(target, SwitchMode::Change).await;
    }

    /// 手動で翻訳を登録する
    ///
    /// ストアに書き込み、`locale` が現在の locale であればストアから読み直します。
    /// 書き込みに失敗した場合も、現在の locale であればセルには反映します。
    /// 同じペアの実行中のバックフィルは結果を破棄されます。
    pub async fn add_translation(&self, locale: &Locale, key: &TranslationKey, text: &str) {
        if !self.inner.registry.contains(key) {
            tracing::warn!(locale = %locale, key = %key, "Manual translation for unregistered key");
        }
        self.inner.backfill.supersede(locale, key);

        match self.inner.store.upsert(locale, key, text).await {
            Ok(()) => self.switch(locale.clone(), SwitchMode::Refresh).await,
            Err(error) => {
                tracing::warn!(locale = %locale, key = %key, %error, "Failed to persist manual translation");
                if *locale == self.current_locale() {
                    self.inner.cache.set(locale, key, text);
                }
            }
        }
    }

    /// 切り替え本体
    async fn switch(&self, target: Locale, mode: SwitchMode) {
        let _guard = self.inner.switch_lock.lock().await;

        let is_current = target == self.current_locale();
        match mode {
            SwitchMode::Change if is_current => {
                tracing::debug!(locale = %target, "Locale already current");
                return;
            }
            SwitchMode::Refresh if !is_current => return,
            SwitchMode::Change | SwitchMode::Refresh => {}
        }

        self.set_state(EngineState::Switching);
        tracing::debug!(locale = %target, ?mode, "Switching locale");

        let persisted = match self.inner.store.load_all(&target).await {
            Ok(rows) => rows,
            Err(error) => {
                tracing::warn!(locale = %target, %error, "Failed to load stored translations");
                HashMap::new()
            }
        };

        let jobs = self.fill_from_store(&target, &persisted);

        // 結果の反映判定より先に現在の locale を更新しておく
        *self.inner.current.write().unwrap_or_else(PoisonError::into_inner) = target.clone();

        let scheduled =
            jobs.into_iter().map(|job| self.inner.backfill.schedule(job)).filter(|s| *s).count();

        self.set_state(EngineState::Idle);
        tracing::info!(
            locale = %target,
            persisted = persisted.len(),
            backfills = scheduled,
            "Locale switched"
        );

        self.inner.listeners.notify(&target);
    }

    /// 永続化済みの翻訳をセルに反映し、バックフィルが必要なキーを返す
    fn fill_from_store(
        &self,
        target: &Locale,
        persisted: &HashMap<String, String>,
    ) -> Vec<BackfillJob> {
        let is_baseline = target == self.baseline_locale();
        let mut jobs = Vec::new();

        for key in self.inner.registry.iter() {
            self.inner.cache.get(target, key);

            match persisted.get(key.name()) {
                // キー名と同じ値は未翻訳とみなす
                Some(text) if text != key.name() => self.inner.cache.set(target, key, text),
                _ if is_baseline => {}
                _ => jobs.push(BackfillJob {
                    from: self.baseline_locale().clone(),
                    to: target.clone(),
                    key: key.clone(),
                    source_text: self.inner.baseline.get(key).to_string(),
                }),
            }
        }

        jobs
    }

    /// バックフィル結果をキャッシュに反映する
    ///
    /// 結果の locale が現在の locale でない場合、翻訳に失敗していた場合、
    /// 要求後に手動の翻訳が登録された場合は何もせず
    /// `false` を返します。UI コンテキストから呼び出すこと。
    pub fn apply_backfill(&self, outcome: BackfillOutcome) -> bool {
        self.inner.backfill.complete(outcome.locale(), outcome.key());

        let Some(text) = outcome.text() else {
            return false;
        };
        if self.inner.backfill.is_superseded(&outcome) {
            tracing::debug!(locale = %outcome.locale(), key = %outcome.key(), "Discarding overridden backfill");
            return false;
        }
        if *outcome.locale() != self.current_locale() {
            tracing::debug!(locale = %outcome.locale(), key = %outcome.key(), "Discarding stale backfill");
            return false;
        }

        self.inner.cache.set(outcome.locale(), outcome.key(), text);
        true
    }

    /// 届いているバックフィル結果を全て反映する（待たない）
    ///
    /// 反映した件数を返します。
    pub fn apply_pending(&self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.inner.backfill.try_recv() {
            if self.apply_backfill(outcome) {
                applied += 1;
            }
        }
        applied
    }

    /// 次のバックフィル結果を待つ
    ///
    /// 反映はしないため、受け取った結果は `apply_backfill` に渡すこと。
    pub async fn next_backfill(&self) -> Option<BackfillOutcome> {
        self.inner.backfill.recv().await
    }

    /// in-flight のバックフィルが全て終わるまで待ち、結果を反映する
    pub async fn settle(&self) {
        while self.pending_backfills() > 0 {
            let Some(outcome) = self.next_backfill().await else {
                break;
            };
            self.apply_backfill(outcome);
        }
    }

    /// 未反映のバックフィル数
    #[must_use]
    pub fn pending_backfills(&self) -> usize {
        self.inner.backfill.pending()
    }

    /// 発行したバックフィルの累計
    #[must_use]
    pub fn backfills_issued(&self) -> usize {
        self.inner.backfill.issued()
    }

    /// 新しい翻訳要求の開始を止める
    ///
    /// 待機中のバックフィルは失敗として完了し、実行中のものはそのまま完了します。
    /// 終了前に `settle` を呼ぶと全ての結果を取り込めます。
    pub fn shutdown(&self) {
        tracing::debug!("Shutting down backfill queue");
        self.inner.backfill.close();
    }
}

//! Background backfill of missing translations
//!
//! バックフィルは tokio のワーカー上で翻訳と永続化を行い、結果は mpsc チャネル経由で
//! UI コンテキストに渡されます。キャッシュへの反映は UI コンテキスト側
//! （`LocaleSync::apply_backfill`）で行われ、ワーカーがキャッシュに触れることはありません。

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicUsize,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};
use std::time::Duration;

use tokio::sync::{
    Semaphore,
    mpsc,
};

use crate::config::BackfillConfig;
use crate::store::PersistentStore;
use crate::translator::{
    TranslationError,
    TranslationService,
};
use crate::types::{
    Locale,
    TranslationKey,
};

/// 完了したバックフィルの結果
///
/// `text` が `None` の場合は翻訳に失敗した（Baseline のまま表示を続ける）ことを示します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillOutcome {
    /// 翻訳先の locale
    locale: Locale,
    /// 対象キー
    key: TranslationKey,
    /// 翻訳結果
    text: Option<String>,
    /// 要求時点の上書き世代
    generation: u64,
}

impl BackfillOutcome {
    #[must_use]
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    #[must_use]
    pub const fn key(&self) -> &TranslationKey {
        &self.key
    }

    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// 1 件のバックフィル要求
#[derive(Debug)]
pub(crate) struct BackfillJob {
    /// Baseline locale（翻訳元）
    pub(crate) from: Locale,
    /// 翻訳先
    pub(crate) to: Locale,
    /// 対象キー
    pub(crate) key: TranslationKey,
    /// 翻訳元テキスト
    pub(crate) source_text: String,
}

/// in-flight の識別子（locale code, key）
type PairKey = (String, TranslationKey);

/// ペアごとの手動上書き世代
///
/// `add_translation` のたびに進み、それより前に要求されたバックフィルの結果は
/// 永続化もキャッシュ反映もされません。
#[derive(Debug, Default)]
struct Generations {
    /// ペア → 世代
    by_pair: Mutex<HashMap<PairKey, u64>>,
}

impl Generations {
    /// 現在の世代
    fn current(&self, pair: &PairKey) -> u64 {
        self.by_pair.lock().unwrap_or_else(PoisonError::into_inner).get(pair).copied().unwrap_or(0)
    }

    /// 世代を進める
    fn bump(&self, pair: PairKey) {
        *self.by_pair.lock().unwrap_or_else(PoisonError::into_inner).entry(pair).or_insert(0) += 1;
    }
}

/// バックフィルのスケジューラと結果の受け渡し口
pub(crate) struct BackfillQueue {
    /// 翻訳サービス
    translator: Arc<dyn TranslationService>,
    /// 永続ストア
    store: Arc<dyn PersistentStore>,
    /// 同時実行数の上限
    permits: Arc<Semaphore>,
    /// 翻訳 1 件あたりのタイムアウト
    timeout: Duration,
    /// 同じペアの重複要求を抑止するか
    dedupe: bool,
    /// 未反映のバックフィル数（ペアごと）
    in_flight: Mutex<HashMap<PairKey, usize>>,
    /// 手動上書きの世代
    generations: Arc<Generations>,
    /// 発行した翻訳要求の累計
    issued: AtomicUsize,
    /// ワーカー → UI の送信側
    tx: mpsc::UnboundedSender<BackfillOutcome>,
    /// UI 側の受信口
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<BackfillOutcome>>,
}

impl BackfillQueue {
    /// 新しいキューを作成
    pub(crate) fn new(
        translator: Arc<dyn TranslationService>,
        store: Arc<dyn PersistentStore>,
        config: &BackfillConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            translator,
            store,
            permits: Arc::new(Semaphore::new(config.concurrency())),
            timeout: config.timeout(),
            dedupe: config.dedupe,
            in_flight: Mutex::new(HashMap::new()),
            generations: Arc::new(Generations::default()),
            issued: AtomicUsize::new(0),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// in-flight マップのロックを取得
    fn in_flight(&self) -> MutexGuard<'_, HashMap<PairKey, usize>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// バックフィルを開始する
    ///
    /// 重複抑止が有効で同じペアが既に in-flight の場合は何もせず `false` を返します。
    pub(crate) fn schedule(&self, job: BackfillJob) -> bool {
        let pair = (job.to.code.clone(), job.key.clone());
        {
            let mut in_flight = self.in_flight();
            let count = in_flight.entry(pair.clone()).or_insert(0);
            if self.dedupe && *count > 0 {
                tracing::trace!(locale = %job.to, key = %job.key, "Backfill already in flight");
                return false;
            }
            *count += 1;
        }
        self.issued.fetch_add(1, Ordering::Relaxed);

        let translator = Arc::clone(&self.translator);
        let store = Arc::clone(&self.store);
        let permits = Arc::clone(&self.permits);
        let generations = Arc::clone(&self.generations);
        let generation = generations.current(&pair);
        let timeout = self.timeout;
        let tx = self.tx.clone();

        tokio::spawn(async move {
            let worker = Worker {
                translator: translator.as_ref(),
                store: store.as_ref(),
                permits: &permits,
                generations: &generations,
                timeout,
            };
            let text = worker.run(&job, &pair, generation).await;
            let outcome = BackfillOutcome { locale: job.to, key: job.key, text, generation };
            // 受信側はエンジンと同寿命。送信失敗はエンジン破棄後のみ
            if tx.send(outcome).is_err() {
                tracing::trace!("Backfill outcome dropped, engine is gone");
            }
        });
        true
    }

    /// 手動の翻訳が登録されたことを記録し、実行中のバックフィルを無効にする
    pub(crate) fn supersede(&self, locale: &Locale, key: &TranslationKey) {
        self.generations.bump((locale.code.clone(), key.clone()));
    }

    /// 結果が手動の翻訳より前に要求されたものか
    pub(crate) fn is_superseded(&self, outcome: &BackfillOutcome) -> bool {
        let pair = (outcome.locale.code.clone(), outcome.key.clone());
        self.generations.current(&pair) != outcome.generation
    }

    /// 結果がキャッシュに反映された（または破棄された）ことを記録
    pub(crate) fn complete(&self, locale: &Locale, key: &TranslationKey) {
        let mut in_flight = self.in_flight();
        let pair = (locale.code.clone(), key.clone());
        if let Some(count) = in_flight.get_mut(&pair) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(&pair);
            }
        }
    }

    /// 届いている結果を 1 件取り出す（待たない）
    ///
    /// 他のタスクが受信待ち中の場合は `None`。
    pub(crate) fn try_recv(&self) -> Option<BackfillOutcome> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }

    /// 次の結果を待つ
    pub(crate) async fn recv(&self) -> Option<BackfillOutcome> {
        self.rx.lock().await.recv().await
    }

    /// 未反映のバックフィル数
    pub(crate) fn pending(&self) -> usize {
        self.in_flight().values().sum()
    }

    /// 発行した翻訳要求の累計
    pub(crate) fn issued(&self) -> usize {
        self.issued.load(Ordering::Relaxed)
    }

    /// 新規の翻訳開始を止める（実行中のものは完了まで走る）
    pub(crate) fn close(&self) {
        self.permits.close();
    }
}

impl std::fmt::Debug for BackfillQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillQueue")
            .field("translator", &"<dyn TranslationService>")
            .field("store", &"<dyn PersistentStore>")
            .field("timeout", &self.timeout)
            .field("dedupe", &self.dedupe)
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

/// ワーカー側で使う共有リソース
struct Worker<'a> {
    /// 翻訳サービス
    translator: &'a dyn TranslationService,
    /// 永続ストア
    store: &'a dyn PersistentStore,
    /// 同時実行数の上限
    permits: &'a Semaphore,
    /// 手動上書きの世代
    generations: &'a Generations,
    /// 翻訳 1 件あたりのタイムアウト
    timeout: Duration,
}

impl Worker<'_> {
    /// 翻訳して永続化する。失敗時や手動の翻訳に上書きされた場合は `None`
    async fn run(&self, job: &BackfillJob, pair: &PairKey, generation: u64) -> Option<String> {
        let Ok(_permit) = self.permits.acquire().await else {
            tracing::debug!(locale = %job.to, key = %job.key, "Backfill skipped, queue closed");
            return None;
        };

        let translated = match tokio::time::timeout(
            self.timeout,
            self.translator.translate(&job.source_text, &job.from, &job.to),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(self.timeout)),
        };

        let text = match translated {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(locale = %job.to, key = %job.key, %error, "Translation unavailable");
                return None;
            }
        };

        if self.generations.current(pair) != generation {
            tracing::debug!(locale = %job.to, key = %job.key, "Backfill superseded by manual translation");
            return None;
        }

        // 永続化の失敗はキャッシュ反映を妨げない
        if let Err(error) = self.store.upsert(&job.to, &job.key, &text).await {
            tracing::warn!(locale = %job.to, key = %job.key, %error, "Failed to persist translation");
        }

        Some(text)
    }
}

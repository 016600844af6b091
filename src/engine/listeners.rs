//! Locale change listener registry

use std::fmt;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
};

use crate::types::Locale;

/// `subscribe` が返す購読 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// リスナーのコールバック（新しい現在 locale を受け取る）
type Listener = Arc<dyn Fn(&Locale) + Send + Sync>;

/// locale 変更リスナーの登録簿
///
/// 通知は呼び出し元のスレッドで同期的に行われ、通知開始時点のスナップショットを
/// 対象にします。コールバック内での `subscribe` / `unsubscribe` は次回の通知から反映されます。
#[derive(Default)]
pub(crate) struct Listeners {
    /// 登録順のリスナー
    entries: Mutex<Vec<(ListenerId, Listener)>>,
    /// 次に払い出す ID
    next_id: AtomicU64,
}

impl Listeners {
    /// 登録リストのロックを取得
    fn lock(&self) -> MutexGuard<'_, Vec<(ListenerId, Listener)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// リスナーを登録
    pub(crate) fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&Locale) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// リスナーを解除（未登録なら `false`）
    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// 全リスナーに通知
    pub(crate) fn notify(&self, locale: &Locale) {
        // ロックを保持したままコールバックを呼ばない
        let snapshot: Vec<Listener> =
            self.lock().iter().map(|(_, listener)| Arc::clone(listener)).collect();

        tracing::debug!(locale = %locale, listeners = snapshot.len(), "Notifying locale listeners");
        for listener in snapshot {
            listener(locale);
        }
    }

    /// 登録数
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    fn french() -> Locale {
        Locale::new("fr", "French")
    }

    #[googletest::test]
    fn notify_calls_listeners_in_order() {
        let listeners = Listeners::default();
        let calls = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second"] {
            let calls = Arc::clone(&calls);
            listeners.subscribe(move |locale| {
                calls.lock().unwrap().push(format!("{name}:{}", locale.code));
            });
        }

        listeners.notify(&french());

        expect_that!(*calls.lock().unwrap(), elements_are![eq("first:fr"), eq("second:fr")]);
    }

    #[googletest::test]
    fn unsubscribe_removes_listener() {
        let listeners = Listeners::default();
        let id = listeners.subscribe(|_| {});

        expect_that!(listeners.unsubscribe(id), eq(true));
        expect_that!(listeners.unsubscribe(id), eq(false));
        expect_that!(listeners.len(), eq(0));
    }

    #[googletest::test]
    fn subscribe_during_notify_applies_to_next_notification() {
        let listeners = Arc::new(Listeners::default());
        let late_calls = Arc::new(AtomicU64::new(0));
        {
            let registry = Arc::clone(&listeners);
            let late_calls = Arc::clone(&late_calls);
            listeners.subscribe(move |_| {
                let late_calls = Arc::clone(&late_calls);
                registry.subscribe(move |_| {
                    late_calls.fetch_add(1, Ordering::SeqCst);
                });
            });
        }

        listeners.notify(&french());
        expect_that!(late_calls.load(Ordering::SeqCst), eq(0));
        expect_that!(listeners.len(), eq(2));

        listeners.notify(&french());
        expect_that!(late_calls.load(Ordering::SeqCst), eq(1));
    }

    #[googletest::test]
    fn unsubscribe_self_during_notify() {
        let listeners = Arc::new(Listeners::default());
        let id_slot = Arc::new(Mutex::new(None));
        let registry = Arc::clone(&listeners);
        let slot = Arc::clone(&id_slot);
        let id = listeners.subscribe(move |_| {
            if let Some(id) = *slot.lock().unwrap() {
                registry.unsubscribe(id);
            }
        });
        *id_slot.lock().unwrap() = Some(id);

        listeners.notify(&french());

        expect_that!(listeners.len(), eq(0));
    }
}

//! 生成結果ストア
//!
//! 年代 → 生成状態 のマップ。書き込みは実行トークン（RunId）付きで行い、
//! リセット後に届いた古い実行の結果は捨てる。
//! 状態変化は購読者へ通知する（ロック解放後に呼び出す）。

use crate::error::{Result, RetroAlbumError};
use parking_lot::Mutex;
use retro_album_common::{Decade, GeneratedImage, GenerationStatus};
use std::collections::HashMap;
use std::sync::Arc;

/// 実行トークン
pub type RunId = u64;

/// 購読者への通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// バッチ開始（全件Pendingで初期化済み）
    RunStarted { run: RunId, decades: Vec<Decade> },
    StatusChanged {
        run: RunId,
        decade: Decade,
        status: GenerationStatus,
    },
    /// 全件破棄
    Reset { run: RunId },
}

/// 状態変化の購読者
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent);
}

impl<F> StoreObserver for F
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    fn on_event(&self, event: &StoreEvent) {
        self(event)
    }
}

#[derive(Default)]
struct Inner {
    run: RunId,
    order: Vec<Decade>,
    entries: HashMap<Decade, GenerationStatus>,
}

#[derive(Default)]
pub struct ResultStore {
    inner: Mutex<Inner>,
    observers: Mutex<Vec<Arc<dyn StoreObserver>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) {
        self.observers.lock().push(observer);
    }

    /// 現在の実行トークン
    pub fn current_run(&self) -> RunId {
        self.inner.lock().run
    }

    /// 新しい実行を開始し、全件をPendingで初期化
    pub fn begin_run(&self, decades: &[Decade]) -> RunId {
        let run = {
            let mut inner = self.inner.lock();
            inner.run += 1;
            inner.order = decades.to_vec();
            inner.entries = decades
                .iter()
                .map(|d| (d.clone(), GenerationStatus::Pending))
                .collect();
            inner.run
        };

        self.notify(&StoreEvent::RunStarted {
            run,
            decades: decades.to_vec(),
        });
        run
    }

    /// 保存済みの状態から新しい実行を復元（単体再生成の前準備）
    pub fn restore(&self, entries: Vec<(Decade, GenerationStatus)>) -> RunId {
        let decades: Vec<Decade> = entries.iter().map(|(d, _)| d.clone()).collect();
        let run = {
            let mut inner = self.inner.lock();
            inner.run += 1;
            inner.order = decades.clone();
            inner.entries = entries.into_iter().collect();
            inner.run
        };

        self.notify(&StoreEvent::RunStarted { run, decades });
        run
    }

    /// 全件破棄。進行中の実行のトークンは無効になる
    pub fn reset(&self) {
        let run = {
            let mut inner = self.inner.lock();
            inner.run += 1;
            inner.order.clear();
            inner.entries.clear();
            inner.run
        };
        tracing::info!(run, "result store reset");
        self.notify(&StoreEvent::Reset { run });
    }

    /// 単体再生成の開始
    ///
    /// * `Ok(Some(run))` - Pendingへ戻した。`run` で結果を書き戻す
    /// * `Ok(None)` - 既に生成中のため何もしない
    /// * `Err(UnknownDecade)` - 現在の実行に含まれない年代
    pub fn begin_regeneration(&self, decade: &Decade) -> Result<Option<RunId>> {
        let run = {
            let mut inner = self.inner.lock();
            let run = inner.run;
            let Some(status) = inner.entries.get_mut(decade) else {
                return Err(RetroAlbumError::UnknownDecade(decade.clone()));
            };
            if status.is_pending() {
                return Ok(None);
            }
            *status = GenerationStatus::Pending;
            run
        };

        self.notify(&StoreEvent::StatusChanged {
            run,
            decade: decade.clone(),
            status: GenerationStatus::Pending,
        });
        Ok(Some(run))
    }

    /// 生成結果を書き込む
    ///
    /// 古い実行のトークン、または未登録の年代なら捨てて `false` を返す。
    pub fn settle(&self, run: RunId, decade: &Decade, status: GenerationStatus) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.run != run {
                tracing::warn!(run, current = inner.run, %decade, "dropping settlement from abandoned run");
                return false;
            }
            match inner.entries.get_mut(decade) {
                Some(entry) => *entry = status.clone(),
                None => return false,
            }
        }

        self.notify(&StoreEvent::StatusChanged {
            run,
            decade: decade.clone(),
            status,
        });
        true
    }

    pub fn status(&self, decade: &Decade) -> Option<GenerationStatus> {
        self.inner.lock().entries.get(decade).cloned()
    }

    /// 並び順どおりのスナップショット
    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.lock();
        StoreSnapshot {
            run: inner.run,
            entries: inner
                .order
                .iter()
                .filter_map(|d| inner.entries.get(d).map(|s| (d.clone(), s.clone())))
                .collect(),
        }
    }

    fn notify(&self, event: &StoreEvent) {
        let observers = self.observers.lock().clone();
        for observer in observers {
            observer.on_event(event);
        }
    }
}

/// ストアの読み取り専用コピー
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub run: RunId,
    pub entries: Vec<(Decade, GenerationStatus)>,
}

impl StoreSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, decade: &Decade) -> Option<&GenerationStatus> {
        self.entries.iter().find(|(d, _)| d == decade).map(|(_, s)| s)
    }

    pub fn decades(&self) -> Vec<Decade> {
        self.entries.iter().map(|(d, _)| d.clone()).collect()
    }

    /// 全件が完了またはエラーか
    pub fn is_settled(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_terminal())
    }

    pub fn done_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.image().is_some()).count()
    }

    pub fn error_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.error_message().is_some()).count()
    }

    /// 完成した画像（並び順）
    pub fn done_images(&self) -> Vec<(Decade, GeneratedImage)> {
        self.entries
            .iter()
            .filter_map(|(d, s)| s.image().map(|i| (d.clone(), i.clone())))
            .collect()
    }
}

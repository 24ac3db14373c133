//! 生成オーケストレータ
//!
//! 共有キューから年代を取り出すワーカーを N 個、同一タスク内で並行に回す。
//! 1件の失敗はその年代のErrorとして記録するだけで、他のワーカーは止めない。

use super::client::{GenerationClient, GenerationRequest};
use super::store::{ResultStore, RunId};
use crate::error::Result;
use crate::source::SourceImage;
use futures::future::join_all;
use parking_lot::Mutex;
use retro_album_common::{build_decade_prompt, Decade, GenerationStatus};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::instrument;

/// バッチ実行の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub run: RunId,
    pub done: usize,
    pub failed: usize,
    /// リセット後に届き、捨てられた結果
    pub dropped: usize,
    /// リセットにより投入されなかった年代
    pub skipped: usize,
}

impl BatchReport {
    fn merge(mut self, other: BatchReport) -> Self {
        self.done += other.done;
        self.failed += other.failed;
        self.dropped += other.dropped;
        self.skipped += other.skipped;
        self
    }
}

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    store: Arc<ResultStore>,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, store: Arc<ResultStore>, concurrency: usize) -> Self {
        Self {
            client,
            store,
            concurrency: concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// 全年代を生成する
    ///
    /// 全ワーカーがキューを使い切った時点で完了する。
    #[instrument(skip_all, fields(source = %source.file_name, items = decades.len(), concurrency = self.concurrency))]
    pub async fn run_batch(&self, source: &SourceImage, decades: &[Decade]) -> BatchReport {
        let run = self.store.begin_run(decades);
        let queue: Mutex<VecDeque<&Decade>> = Mutex::new(decades.iter().collect());

        let workers = (0..self.concurrency.min(decades.len()))
            .map(|worker_id| self.worker(worker_id, run, source, &queue));

        let report = join_all(workers)
            .await
            .into_iter()
            .fold(BatchReport { run, ..Default::default() }, BatchReport::merge);

        tracing::info!(
            run,
            done = report.done,
            failed = report.failed,
            dropped = report.dropped,
            skipped = report.skipped,
            "batch finished"
        );
        report
    }

    async fn worker(
        &self,
        worker_id: usize,
        run: RunId,
        source: &SourceImage,
        queue: &Mutex<VecDeque<&Decade>>,
    ) -> BatchReport {
        tracing::debug!("Worker {} started", worker_id);
        let mut tally = BatchReport::default();

        loop {
            let next = queue.lock().pop_front();
            let Some(decade) = next else {
                break;
            };

            // リセット済みの実行は新しい依頼を出さない
            if self.store.current_run() != run {
                tally.skipped += 1 + queue.lock().drain(..).count();
                tracing::debug!("Worker {} stopping, run {} was abandoned", worker_id, run);
                break;
            }

            let status = self.process(source, decade).await;
            let is_done = status.image().is_some();
            if self.store.settle(run, decade, status) {
                if is_done {
                    tally.done += 1;
                } else {
                    tally.failed += 1;
                }
            } else {
                tally.dropped += 1;
            }
        }

        tracing::debug!("Worker {} finished", worker_id);
        tally
    }

    /// 1件分の生成（成功→Done / 失敗→Error）
    async fn process(&self, source: &SourceImage, decade: &Decade) -> GenerationStatus {
        let prompt = build_decade_prompt(decade);
        tracing::debug!(%decade, "generating");

        let request = GenerationRequest {
            source,
            decade,
            prompt: &prompt,
        };

        match self.client.generate(request).await {
            Ok(image) => {
                tracing::debug!(%decade, bytes = image.len(), "generated");
                GenerationStatus::Done { image }
            }
            Err(e) => {
                let message = e.display_message();
                tracing::warn!(%decade, "generation failed: {}", message);
                GenerationStatus::Error { message }
            }
        }
    }

    /// 1年代だけ再生成する
    ///
    /// 生成中（Pending）の年代に対しては何もせず `Ok(false)` を返す。
    /// バッチの同時実行数とは独立に実行される。
    #[instrument(skip_all, fields(decade = %decade))]
    pub async fn regenerate(&self, source: &SourceImage, decade: &Decade) -> Result<bool> {
        let Some(run) = self.store.begin_regeneration(decade)? else {
            tracing::debug!("already in flight, ignoring");
            return Ok(false);
        };

        let status = self.process(source, decade).await;
        self.store.settle(run, decade, status);
        Ok(true)
    }
}

//! 端末向け進捗表示
//!
//! ストアの購読者として登録し、確定した年代ごとにバーを進める。

use crate::generator::StoreEvent;
use indicatif::{ProgressBar, ProgressStyle};
use retro_album_common::GenerationStatus;

pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl crate::generator::StoreObserver for ProgressReporter {
    fn on_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::RunStarted { decades, .. } => {
                self.bar.set_length(decades.len() as u64);
                self.bar.set_position(0);
                self.bar.set_message("生成中...");
            }
            StoreEvent::StatusChanged { decade, status, .. } => match status {
                GenerationStatus::Pending => {
                    self.bar.dec(1);
                    self.bar.set_message(format!("{} を再生成中...", decade));
                }
                GenerationStatus::Done { .. } => {
                    self.bar.inc(1);
                    self.bar.set_message(format!("✔ {}", decade));
                }
                GenerationStatus::Error { message } => {
                    self.bar.inc(1);
                    self.bar.println(format!("✖ {}: {}", decade, message));
                }
            },
            StoreEvent::Reset { .. } => {
                self.bar.set_position(0);
                self.bar.set_message("リセットしました");
            }
        }
    }
}

//! 進捗通知
//!
//! BatchRunner からのイベントを受け取るリスナー。
//! CLIは進捗バー、ライブラリ利用時はログかno-opを使う。

use super::RunReport;
use indicatif::{ProgressBar, ProgressStyle};
use medprice_common::ResultRow;
use tracing::info;

pub trait ProgressListener {
    /// 開始時（`resumed_from` はチェックポイントから復元した件数）
    fn on_start(&mut self, _total: usize, _resumed_from: usize) {}

    /// 1件処理するごと
    fn on_item(&mut self, _row: &ResultRow) {}

    /// チェックポイントへ書き出した後（`completed` は確定済み件数）
    fn on_flush(&mut self, _completed: usize) {}

    fn on_finish(&mut self, _report: &RunReport) {}
}

/// 何もしない
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressListener for NoopProgress {}

/// tracing にログを出す
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress {
    total: usize,
}

impl ProgressListener for LogProgress {
    fn on_start(&mut self, total: usize, resumed_from: usize) {
        self.total = total;
        info!(total, resumed_from, "照合開始");
    }

    fn on_item(&mut self, row: &ResultRow) {
        info!(
            index = row.index,
            total = self.total,
            name = %row.raw_name,
            tier = %row.tier,
            score = row.score,
            "照合"
        );
    }

    fn on_flush(&mut self, completed: usize) {
        info!(completed, "チェックポイント保存");
    }

    fn on_finish(&mut self, report: &RunReport) {
        info!(
            status = ?report.status,
            processed = report.processed_this_run,
            "照合終了"
        );
    }
}

/// 進捗バー（CLI用）
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressListener for BarProgress {
    fn on_start(&mut self, total: usize, resumed_from: usize) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_position(resumed_from as u64);
        self.bar = bar;
    }

    fn on_item(&mut self, row: &ResultRow) {
        self.bar.set_message(format!("{} {}", row.tier.marker(), row.raw_name));
        self.bar.inc(1);
    }

    fn on_finish(&mut self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunStatus;
    use medprice_common::{ConfidenceTier, TierSummary};

    fn row(index: usize) -> ResultRow {
        ResultRow {
            index,
            raw_name: format!("medicine {}", index),
            found_name: None,
            price: None,
            score: 0.0,
            tier: ConfidenceTier::NotFound,
            product_url: None,
            error: None,
        }
    }

    #[test]
    fn test_log_progress_tracks_total() {
        let mut progress = LogProgress::default();
        progress.on_start(12, 4);
        assert_eq!(progress.total, 12);

        let rows: Vec<ResultRow> = (4..6).map(row).collect();
        for row in &rows {
            progress.on_item(row);
        }
        progress.on_flush(6);
        progress.on_finish(&RunReport {
            status: RunStatus::Completed,
            summary: TierSummary::from_rows(&rows),
            processed_this_run: rows.len(),
            resumed_from: 4,
            rows,
        });
        assert_eq!(progress.total, 12);
    }

    #[test]
    fn test_bar_progress_starts_at_resumed_position() {
        let mut progress = BarProgress::new();
        progress.on_start(10, 3);
        assert_eq!(progress.bar.position(), 3);
        assert_eq!(progress.bar.length(), Some(10));

        progress.on_item(&row(3));
        assert_eq!(progress.bar.position(), 4);
    }
}

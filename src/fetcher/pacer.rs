use std::time::Duration;
use tokio::time::Instant;

/// リクエスト間隔の門番
///
/// 直前の試行が終わった時刻から `min_gap` 経つまで次の試行を待たせる。
/// 成功・失敗は問わない。
#[derive(Debug, Clone)]
pub struct Pacer {
    min_gap: Duration,
    last_end: Option<Instant>,
}

impl Pacer {
    pub fn new(min_gap: Duration) -> Self {
        Self {
            min_gap,
            last_end: None,
        }
    }

    pub fn min_gap(&self) -> Duration {
        self.min_gap
    }

    /// 次の試行を始めてよい時刻まで待つ
    pub async fn wait(&self) {
        if let Some(end) = self.last_end {
            tokio::time::sleep_until(end + self.min_gap).await;
        }
    }

    /// 試行の終了を記録
    pub fn mark(&mut self) {
        self.last_end = Some(Instant::now());
    }
}

use std::time::Duration;

/// 1回の再試行待ちの上限（既定値）
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// 再試行の方針
///
/// `max_retries` は初回を除いた再試行回数。試行は最大 `1 + max_retries` 回。
/// 待ち時間はバックオフとサーバー指定のどちらでも `max_delay` を超えない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// 再試行なし
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `retries_done` 回再試行した後、まだ再試行できるか
    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// k回目（1始まり）の再試行前の待ち時間 `base × 2^(k-1)`
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }

    /// サーバー指定の待ち時間（Retry-After）が長ければそちらを使う。上限は `max_delay`
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff(retry);
        let wait = match retry_after {
            Some(wait) if wait > backoff => wait,
            _ => backoff,
        };
        wait.min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

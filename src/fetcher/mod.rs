//! 候補取得
//!
//! 1回分の取得（`CandidateSource`）に、タイムアウト・再試行・間隔制御を被せる。

mod http;
mod pacer;
mod retry;

pub use http::HttpSource;
pub use pacer::Pacer;
pub use retry::{RetryPolicy, DEFAULT_MAX_DELAY};

use crate::config::AppConfig;
use crate::query::SearchQuery;
use medprice_common::Candidate;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// 取得失敗（再試行を使い切った後、または再試行しない応答）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("レート制限 ({attempts}回試行)")]
    RateLimited { attempts: u32 },

    #[error("HTTPステータス {0}")]
    Status(u16),
}

/// 1回の試行の失敗
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// HTTP 429（Retry-After があれば待ち時間）
    RateLimited { retry_after: Option<Duration> },
    /// 接続失敗・タイムアウト・5xx
    Transient(String),
    /// 再試行しないHTTPステータス
    Status(u16),
}

impl AttemptError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Status(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            AttemptError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    fn into_fetch_error(self, attempts: u32) -> FetchError {
        match self {
            AttemptError::RateLimited { .. } => FetchError::RateLimited { attempts },
            AttemptError::Transient(message) => {
                FetchError::Transport(format!("{} ({}回試行)", message, attempts))
            }
            AttemptError::Status(code) => FetchError::Status(code),
        }
    }
}

/// 検索クエリ1回分の取得元
pub trait CandidateSource {
    fn fetch_once(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<Vec<Candidate>, AttemptError>> + Send;
}

/// 再試行・間隔制御つきの取得
pub struct CandidateFetcher<S> {
    source: S,
    retry: RetryPolicy,
    pacer: Pacer,
    timeout: Duration,
}

impl<S: CandidateSource> CandidateFetcher<S> {
    pub fn new(source: S, retry: RetryPolicy, pacer: Pacer, timeout: Duration) -> Self {
        Self {
            source,
            retry,
            pacer,
            timeout,
        }
    }

    pub fn from_config(source: S, config: &AppConfig) -> Self {
        Self::new(
            source,
            config.retry_policy(),
            Pacer::new(config.inter_request_delay()),
            config.request_timeout(),
        )
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// 候補を取得（空のVecは「該当なし」で、エラーではない）
    pub async fn fetch(&mut self, query: &SearchQuery) -> Result<Vec<Candidate>, FetchError> {
        let mut retries = 0u32;

        loop {
            self.pacer.wait().await;
            let outcome = match tokio::time::timeout(self.timeout, self.source.fetch_once(query)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(AttemptError::Transient(format!(
                    "タイムアウト ({}秒)",
                    self.timeout.as_secs_f64()
                ))),
            };
            self.pacer.mark();

            let err = match outcome {
                Ok(candidates) => {
                    debug!(name = %query.name, count = candidates.len(), "候補取得");
                    return Ok(candidates);
                }
                Err(err) => err,
            };

            let attempts = retries + 1;
            if !err.is_retryable() || !self.retry.can_retry(retries) {
                return Err(err.into_fetch_error(attempts));
            }

            retries += 1;
            let delay = self.retry.delay_for(retries, err.retry_after());
            warn!(
                name = %query.name,
                retry = retries,
                max_retries = self.retry.max_retries,
                delay_secs = delay.as_secs_f64(),
                error = ?err,
                "再試行します"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

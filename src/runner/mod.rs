//! バッチ照合
//!
//! 名前リストを1件ずつ 取得 → 照合 → 区分判定 し、一定件数ごとに
//! チェックポイントへ書き出す。取得は常に1件ずつ（並列にしない）。
//!
//! 状態: Idle → Running → Completed / Aborted

pub mod checkpoint;
pub mod progress;

pub use checkpoint::{fingerprint, CheckpointState, CheckpointStore};
pub use progress::{BarProgress, LogProgress, NoopProgress, ProgressListener};

use crate::config::AppConfig;
use crate::error::{ResolveError, Result};
use crate::fetcher::{CandidateFetcher, CandidateSource, FetchError};
use crate::query::QueryBuilder;
use medprice_common::{select_best, MatchResult, MedicineQuery, ResultRow, Thresholds, TierSummary};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// 中断フラグ（Ctrl-C などから立てる）
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Aborted(AbortReason),
}

/// 実行結果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    /// チェックポイント分を含む区分ごとの件数
    pub summary: TierSummary,
    pub processed_this_run: usize,
    /// 再開時にチェックポイントから復元した件数
    pub resumed_from: usize,
    /// 確定済みの結果行（index順）
    pub rows: Vec<ResultRow>,
}

/// 1件分の照合結果と取得エラー
#[derive(Debug, Clone)]
pub struct Resolution {
    pub result: MatchResult,
    /// 取得失敗時のエラー（結果は NotFound）
    pub error: Option<FetchError>,
}

impl Resolution {
    pub fn to_row(&self, index: usize) -> ResultRow {
        let row = ResultRow::from_match(index, &self.result);
        match &self.error {
            Some(err) => row.with_error(err.to_string()),
            None => row,
        }
    }
}

/// 名前1件の解決（取得 → 照合 → 区分判定）
pub struct Resolver<S> {
    fetcher: CandidateFetcher<S>,
    queries: QueryBuilder,
    thresholds: Thresholds,
}

impl<S: CandidateSource> Resolver<S> {
    pub fn new(fetcher: CandidateFetcher<S>, queries: QueryBuilder, thresholds: Thresholds) -> Self {
        Self {
            fetcher,
            queries,
            thresholds,
        }
    }

    pub fn from_config(source: S, config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            CandidateFetcher::from_config(source, config),
            QueryBuilder::from_config(config)?,
            config.thresholds()?,
        ))
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    pub async fn resolve(&mut self, name: &str) -> Resolution {
        let query = self.queries.build(name);
        let medicine = MedicineQuery::new(name);

        match self.fetcher.fetch(&query).await {
            Ok(candidates) => {
                let best = select_best(name, &candidates);
                Resolution {
                    result: self.thresholds.grade(medicine, best),
                    error: None,
                }
            }
            Err(err) => {
                warn!(name, error = %err, "取得失敗、該当なしとして記録");
                Resolution {
                    result: MatchResult::not_found(medicine),
                    error: Some(err),
                }
            }
        }
    }
}

/// バッチ照合の実行
pub struct BatchRunner<S, L = NoopProgress> {
    resolver: Resolver<S>,
    store: CheckpointStore,
    checkpoint_interval: usize,
    listener: L,
    cancel: CancelFlag,
    state: RunState,
    summary: TierSummary,
}

impl<S: CandidateSource, L: ProgressListener> BatchRunner<S, L> {
    pub fn new(source: S, config: &AppConfig, store: CheckpointStore, listener: L) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_resolver(
            Resolver::from_config(source, config)?,
            store,
            config.checkpoint_interval,
            listener,
        ))
    }

    pub fn with_resolver(
        resolver: Resolver<S>,
        store: CheckpointStore,
        checkpoint_interval: usize,
        listener: L,
    ) -> Self {
        Self {
            resolver,
            store,
            checkpoint_interval: checkpoint_interval.max(1),
            listener,
            cancel: CancelFlag::new(),
            state: RunState::Idle,
            summary: TierSummary::default(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// これまでに処理した分の区分件数（書き込み失敗で中断した後も参照できる）
    pub fn summary(&self) -> TierSummary {
        self.summary
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn source(&self) -> &S {
        self.resolver.source()
    }

    /// 名前リストを照合する（チェックポイントがあれば続きから）
    pub async fn run(&mut self, names: &[String]) -> Result<RunReport> {
        if self.state != RunState::Idle {
            return Err(ResolveError::InvalidState(format!(
                "run は Idle 状態からのみ実行できます（現在: {:?}）",
                self.state
            )));
        }
        self.state = RunState::Running;

        let result = self.run_items(names).await;
        self.state = match &result {
            Ok(report) if report.status == RunStatus::Completed => RunState::Completed,
            _ => RunState::Aborted,
        };
        result
    }

    async fn run_items(&mut self, names: &[String]) -> Result<RunReport> {
        let total = names.len();
        let input_fingerprint = fingerprint(names);

        let mut checkpoint = match self.store.load_for(&input_fingerprint, total)? {
            Some(state) => {
                info!(
                    path = %self.store.path().display(),
                    completed = state.completed_count,
                    total,
                    "チェックポイントから再開"
                );
                state
            }
            None => CheckpointState::new(input_fingerprint, total),
        };

        let resumed_from = checkpoint.completed_count;
        self.summary = checkpoint.summary();
        self.listener.on_start(total, resumed_from);

        let mut buffer: Vec<ResultRow> = Vec::new();
        let mut processed = 0usize;
        let mut status = RunStatus::Completed;

        for (index, name) in names.iter().enumerate().skip(resumed_from) {
            if self.cancel.is_cancelled() {
                info!(index, "中断要求を受け付けました");
                status = RunStatus::Aborted(AbortReason::Cancelled);
                break;
            }

            let row = self.resolver.resolve(name).await.to_row(index);
            self.summary.record(row.tier);
            self.listener.on_item(&row);
            buffer.push(row);
            processed += 1;

            if buffer.len() >= self.checkpoint_interval {
                self.flush(&mut checkpoint, &mut buffer)?;
            }
        }

        if !buffer.is_empty() || !self.store.exists() {
            self.flush(&mut checkpoint, &mut buffer)?;
        }

        let report = RunReport {
            status,
            summary: self.summary,
            processed_this_run: processed,
            resumed_from,
            rows: checkpoint.rows,
        };
        self.listener.on_finish(&report);
        Ok(report)
    }

    fn flush(&mut self, checkpoint: &mut CheckpointState, buffer: &mut Vec<ResultRow>) -> Result<()> {
        let rows = std::mem::take(buffer);
        let count = rows.len();
        self.store
            .append_and_flush(checkpoint, rows)
            .map_err(ResolveError::CheckpointWrite)?;
        info!(
            written = count,
            completed = checkpoint.completed_count,
            "チェックポイント保存"
        );
        self.listener.on_flush(checkpoint.completed_count);
        Ok(())
    }
}

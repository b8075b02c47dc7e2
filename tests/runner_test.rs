//! バッチ照合テスト
//!
//! 仮想時間（tokio paused time）と偽の取得元で、件数・再開・間隔・再試行・
//! 中断・書き込み失敗の振る舞いを検証

use bigdecimal::BigDecimal;
use medprice_common::{Candidate, ConfidenceTier, ResultRow, TierSummary};
use medprice_rust::error::ResolveError;
use medprice_rust::fetcher::{AttemptError, CandidateSource};
use medprice_rust::runner::{
    AbortReason, BatchRunner, CancelFlag, CheckpointStore, NoopProgress, ProgressListener,
    RunReport, RunState, RunStatus,
};
use medprice_rust::{AppConfig, SearchQuery};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio::time::Instant;

/// (名前, 開始, 終了)
type CallLog = Arc<Mutex<Vec<(String, Instant, Instant)>>>;

/// 名前で応答が決まる偽の販売サイト
///
/// - `limited ...`: 常に429
/// - `missing ...`: 該当なし
/// - それ以外: `<名前> Tablet 10's` と無関係な商品
#[derive(Clone, Default)]
struct FakeCatalog {
    log: CallLog,
    latency: Duration,
}

impl FakeCatalog {
    fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    fn calls_for(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _, _)| name.starts_with(prefix))
            .count()
    }
}

impl CandidateSource for FakeCatalog {
    async fn fetch_once(&self, query: &SearchQuery) -> Result<Vec<Candidate>, AttemptError> {
        let start = Instant::now();
        tokio::time::sleep(self.latency).await;
        let end = Instant::now();
        self.log
            .lock()
            .unwrap()
            .push((query.name.clone(), start, end));

        let name = query.name.as_str();
        if name.starts_with("limited") {
            return Err(AttemptError::RateLimited { retry_after: None });
        }
        if name.starts_with("missing") {
            return Ok(Vec::new());
        }
        Ok(vec![
            Candidate::new("Zz Unrelated Syrup", BigDecimal::from(999)),
            Candidate::new(format!("{} Tablet 10's", name), BigDecimal::from(42)),
        ])
    }
}

#[derive(Default)]
struct Recorder {
    started: Option<(usize, usize)>,
    items: Vec<usize>,
    flushes: Vec<usize>,
    finished: bool,
    cancel_after: Option<(usize, CancelFlag)>,
}

impl ProgressListener for Recorder {
    fn on_start(&mut self, total: usize, resumed_from: usize) {
        self.started = Some((total, resumed_from));
    }

    fn on_item(&mut self, row: &ResultRow) {
        self.items.push(row.index);
        if let Some((after, flag)) = &self.cancel_after {
            if self.items.len() >= *after {
                flag.cancel();
            }
        }
    }

    fn on_flush(&mut self, completed: usize) {
        self.flushes.push(completed);
    }

    fn on_finish(&mut self, _report: &RunReport) {
        self.finished = true;
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        max_retries: 2,
        backoff_base_seconds: 1.0,
        inter_request_delay_seconds: 2.0,
        checkpoint_interval: 3,
        search_url: "http://localhost/search".into(),
        ..Default::default()
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn seven() -> Vec<String> {
    names(&[
        "dolo 650",
        "amaryl 1mg",
        "missing one",
        "crocin advance",
        "glycomet 500",
        "pan 40",
        "azithral 500",
    ])
}

fn runner<L: ProgressListener>(
    source: FakeCatalog,
    path: &Path,
    listener: L,
) -> BatchRunner<FakeCatalog, L> {
    BatchRunner::new(source, &test_config(), CheckpointStore::new(path), listener)
        .expect("runner作成失敗")
}

/// 完了時は全件・index連番
#[tokio::test(start_paused = true)]
async fn test_completed_run_covers_all_names() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cp.json");
    let names = seven();

    let mut runner = runner(FakeCatalog::default(), &path, Recorder::default());
    let report = runner.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(runner.state(), RunState::Completed);
    assert_eq!(report.rows.len(), names.len());
    for (i, row) in report.rows.iter().enumerate() {
        assert_eq!(row.index, i);
        assert_eq!(row.raw_name, names[i]);
    }
    assert_eq!(report.processed_this_run, 7);
    assert_eq!(report.resumed_from, 0);

    // 候補のうち一致する方が選ばれる
    let first = &report.rows[0];
    assert_eq!(first.tier, ConfidenceTier::Exact);
    assert_eq!(first.found_name.as_deref(), Some("dolo 650 Tablet 10's"));
    assert_eq!(first.price, Some(BigDecimal::from(42)));

    // 該当なし
    let missing = &report.rows[2];
    assert_eq!(missing.tier, ConfidenceTier::NotFound);
    assert!(missing.price.is_none());
    assert!(missing.error.is_none());

    assert_eq!(report.summary.exact, 6);
    assert_eq!(report.summary.not_found, 1);

    let recorder = runner.listener();
    assert_eq!(recorder.started, Some((7, 0)));
    assert_eq!(recorder.flushes, vec![3, 6, 7]);
    assert!(recorder.finished);

    let saved = CheckpointStore::new(&path).load().unwrap().unwrap();
    assert_eq!(saved.rows, report.rows);
    assert!(saved.is_complete());
}

/// run は1回だけ
#[tokio::test(start_paused = true)]
async fn test_run_twice_is_invalid() {
    let dir = tempdir().expect("Failed to create temp dir");
    let names = names(&["dolo 650"]);

    let mut runner = runner(FakeCatalog::default(), &dir.path().join("cp.json"), NoopProgress);
    runner.run(&names).await.unwrap();

    let second = runner.run(&names).await;
    assert!(matches!(second, Err(ResolveError::InvalidState(_))));
}

/// 中断して再開した結果は、通しで実行した結果と同じ
#[tokio::test(start_paused = true)]
async fn test_resume_matches_uninterrupted_run() {
    let names = seven();

    let baseline_dir = tempdir().expect("Failed to create temp dir");
    let mut baseline = runner(
        FakeCatalog::default(),
        &baseline_dir.path().join("cp.json"),
        NoopProgress,
    );
    let expected = baseline.run(&names).await.unwrap().rows;

    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cp.json");

    // 4件処理したところで中断
    let cancel = CancelFlag::new();
    let recorder = Recorder {
        cancel_after: Some((4, cancel.clone())),
        ..Default::default()
    };
    let mut first = runner(FakeCatalog::default(), &path, recorder).with_cancel_flag(cancel);
    let report = first.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Aborted(AbortReason::Cancelled));
    assert_eq!(first.state(), RunState::Aborted);
    assert_eq!(report.processed_this_run, 4);
    // 中断時に残りのバッファも保存される
    assert_eq!(report.rows.len(), 4);
    assert_eq!(CheckpointStore::new(&path).load().unwrap().unwrap().completed_count, 4);

    // 再開
    let source = FakeCatalog::default();
    let mut second = runner(source.clone(), &path, Recorder::default());
    let report = second.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.resumed_from, 4);
    assert_eq!(report.processed_this_run, 3);
    assert_eq!(second.listener().started, Some((7, 4)));
    assert_eq!(second.listener().items, vec![4, 5, 6]);
    // 処理済みの名前は再取得しない
    assert_eq!(source.calls_for("dolo"), 0);
    assert_eq!(report.rows, expected);
    assert_eq!(report.summary, TierSummary::from_rows(&expected));
}

/// 完了済みのチェックポイントで再実行しても取得しない
#[tokio::test(start_paused = true)]
async fn test_rerun_after_completion_is_idempotent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cp.json");
    let names = seven();

    let mut first = runner(FakeCatalog::default(), &path, NoopProgress);
    let expected = first.run(&names).await.unwrap().rows;

    let source = FakeCatalog::default();
    let mut again = runner(source.clone(), &path, NoopProgress);
    let report = again.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed_this_run, 0);
    assert_eq!(report.rows, expected);
    assert!(source.log.lock().unwrap().is_empty());
}

/// 失敗を含めても、前の取得終了から次の取得開始まで間隔を空ける
#[tokio::test(start_paused = true)]
async fn test_pacing_between_all_attempts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let names = names(&["dolo 650", "limited item", "missing one", "pan 40"]);
    let source = FakeCatalog::with_latency(Duration::from_millis(300));

    let mut runner = runner(source.clone(), &dir.path().join("cp.json"), NoopProgress);
    runner.run(&names).await.unwrap();

    let log = source.log.lock().unwrap();
    // 3件 + limited の3回試行
    assert_eq!(log.len(), 6);
    for pair in log.windows(2) {
        let (_, _, prev_end) = &pair[0];
        let (_, next_start, _) = &pair[1];
        assert!(
            *next_start - *prev_end >= Duration::from_secs(2),
            "間隔が短い: {:?}",
            *next_start - *prev_end
        );
    }
}

/// 再試行を使い切った1件は NotFound で記録し、バッチは続行
#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_records_not_found() {
    let dir = tempdir().expect("Failed to create temp dir");
    let names = names(&["limited item", "dolo 650"]);
    let source = FakeCatalog::default();

    let mut runner = runner(source.clone(), &dir.path().join("cp.json"), NoopProgress);
    let report = runner.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.rows.len(), 2);

    let limited = &report.rows[0];
    assert_eq!(limited.tier, ConfidenceTier::NotFound);
    assert!(limited.found_name.is_none());
    assert!(limited.price.is_none());
    assert!(limited.error.as_deref().unwrap_or("").contains("3回試行"));

    assert_eq!(report.rows[1].tier, ConfidenceTier::Exact);
    // 初回 + 再試行2回
    assert_eq!(source.calls_for("limited"), 3);
}

/// チェックポイントの書き込み失敗は致命的（Aborted）
#[tokio::test(start_paused = true)]
async fn test_checkpoint_write_failure_aborts() {
    let dir = tempdir().expect("Failed to create temp dir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let names = seven();

    let source = FakeCatalog::default();
    let mut runner = runner(source.clone(), &blocker.join("cp.json"), NoopProgress);
    let result = runner.run(&names).await;

    assert!(matches!(result, Err(ResolveError::CheckpointWrite(_))));
    assert_eq!(runner.state(), RunState::Aborted);
    // 最初の書き出し（3件目）で止まる
    assert_eq!(source.log.lock().unwrap().len(), 3);
    assert_eq!(runner.summary().total(), 3);
}

/// 開始前に中断が要求されていれば何も取得しない
#[tokio::test(start_paused = true)]
async fn test_cancel_before_start() {
    let dir = tempdir().expect("Failed to create temp dir");
    let names = seven();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let source = FakeCatalog::default();
    let mut runner =
        runner(source.clone(), &dir.path().join("cp.json"), NoopProgress).with_cancel_flag(cancel);
    let report = runner.run(&names).await.unwrap();

    assert_eq!(report.status, RunStatus::Aborted(AbortReason::Cancelled));
    assert_eq!(report.processed_this_run, 0);
    assert!(source.log.lock().unwrap().is_empty());
}

/// 別の入力リストでは再開しない
#[tokio::test(start_paused = true)]
async fn test_checkpoint_for_other_list_is_refused() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cp.json");

    let mut first = runner(FakeCatalog::default(), &path, NoopProgress);
    first.run(&seven()).await.unwrap();

    let mut second = runner(FakeCatalog::default(), &path, NoopProgress);
    let result = second.run(&names(&["crocin", "dolo 650"])).await;

    assert!(matches!(result, Err(ResolveError::CheckpointMismatch(_))));
    assert_eq!(second.state(), RunState::Aborted);
}

use clap::Parser;
use medprice_common::{ConfidenceTier, TierSummary};
use medprice_rust::runner::{AbortReason, BarProgress, LogProgress, ProgressListener, RunReport, RunStatus};
use medprice_rust::cli::{Cli, Commands};
use medprice_rust::error::{ResolveError, Result};
use medprice_rust::{export, input};
use medprice_rust::{AppConfig, BatchRunner, CheckpointStore, HttpSource, Resolver};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_summary(summary: &TierSummary) {
    println!("照合結果:");
    for tier in ConfidenceTier::ALL {
        println!("  {} {:<10} {}件", tier.marker(), tier.label(), summary.count(tier));
    }
    println!("  合計: {}件", summary.total());
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("✔ 出力: {}", path.display());
    }
}

/// 一括照合を実行（Ctrl-C で中断フラグを立てる）
async fn run_batch<L: ProgressListener>(
    config: &AppConfig,
    store: CheckpointStore,
    listener: L,
    names: &[String],
) -> Result<RunReport> {
    let source = HttpSource::new(config)?;
    let mut runner = BatchRunner::new(source, config, store, listener)?;

    let cancel = runner.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n中断します（処理中の1件が終わり次第保存します）...");
            cancel.cancel();
        }
    });

    match runner.run(names).await {
        Ok(report) => Ok(report),
        Err(e) => {
            print_summary(&runner.summary());
            Err(e)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { input, output, format, column, checkpoint, delay, fresh } => {
            println!("💊 medprice - 一括照合\n");

            let mut config = AppConfig::load(cli.config.as_deref())?;
            if let Some(delay) = delay {
                config.inter_request_delay_seconds = delay;
            }
            if let Some(checkpoint) = checkpoint {
                config.checkpoint_path = checkpoint;
            }
            config.validate()?;

            // 1. 入力
            println!("[1/3] 入力を読み込み中...");
            let names = input::read_names_with_column(&input, column.as_deref())?;
            println!("✔ {}件の医薬品名\n", names.len());

            let store = CheckpointStore::new(&config.checkpoint_path);
            if fresh && store.clear()? {
                println!("✔ チェックポイントを削除しました: {}", store.path().display());
            }

            // 2. 照合
            println!("[2/3] 照合中... (間隔 {}秒)", config.inter_request_delay_seconds);
            // 端末でなければ進捗バーの代わりにログへ出す
            let report = if std::io::stderr().is_terminal() {
                run_batch(&config, store, BarProgress::new(), &names).await?
            } else {
                run_batch(&config, store, LogProgress::default(), &names).await?
            };
            println!();
            print_summary(&report.summary);

            match report.status {
                RunStatus::Completed => {
                    // 3. 出力
                    println!("\n[3/3] 結果を出力中...");
                    let output = output.unwrap_or_else(|| PathBuf::from(export::DEFAULT_STEM));
                    let written = export::export_rows(&report.rows, &format, &output)?;
                    print_written(&written);
                    println!("\n✅ 完了");
                }
                RunStatus::Aborted(AbortReason::Cancelled) => {
                    println!(
                        "\n⚠ 中断しました。{}/{}件を保存済み: {}",
                        report.rows.len(),
                        names.len(),
                        config.checkpoint_path.display()
                    );
                    println!("  同じコマンドで続きから再開できます");
                }
            }
        }

        Commands::Lookup { name } => {
            let config = AppConfig::load(cli.config.as_deref())?;
            let name = input::normalize_name(&name);
            if name.is_empty() {
                return Err(ResolveError::EmptyInput("lookup".into()));
            }

            let source = HttpSource::new(&config)?;
            let mut resolver = Resolver::from_config(source, &config)?;
            let resolution = resolver.resolve(&name).await;
            let result = &resolution.result;

            println!("{} {} (score {:.2})", result.tier.marker(), result.tier.label(), result.score);
            match &result.best_candidate {
                Some(candidate) => {
                    println!("  商品名: {}", candidate.product_name);
                    println!("  MRP: ₹{}", candidate.price);
                    if result.tier.needs_review() {
                        println!("  ⚠ 名前が完全には一致していません。確認してください");
                    }
                }
                None => println!("  該当なし: {}", name),
            }
            if let Some(err) = &resolution.error {
                println!("  取得エラー: {}", err);
            }
        }

        Commands::Export { checkpoint, output, format } => {
            println!("📄 medprice - エクスポート\n");

            let store = CheckpointStore::new(&checkpoint);
            let state = store
                .load()?
                .ok_or_else(|| ResolveError::InputNotFound(checkpoint.display().to_string()))?;
            if !state.is_complete() {
                println!("⚠ 未完了のチェックポイントです ({}/{}件)", state.completed_count, state.total);
            }

            let output = output.unwrap_or_else(|| PathBuf::from(export::DEFAULT_STEM));
            let written = export::export_rows(&state.rows, &format, &output)?;
            print_written(&written);
            print_summary(&state.summary());

            println!("\n✅ エクスポート完了");
        }

        Commands::Checkpoint { path, info, clear, yes } => {
            let path = match path {
                Some(path) => path,
                None => AppConfig::load(cli.config.as_deref())?.checkpoint_path,
            };
            let store = CheckpointStore::new(&path);

            if info || !clear {
                // デフォルトまたは--info: 情報表示
                if store.exists() {
                    println!("チェックポイント情報:");
                    println!("  パス: {}", path.display());
                    match store.load() {
                        Ok(Some(state)) => {
                            println!("  進捗: {}/{}件", state.completed_count, state.total);
                            println!("  更新: {}", state.updated_at);
                            println!("  入力: {}", state.input_fingerprint);
                            print_summary(&state.summary());
                        }
                        Ok(None) => {}
                        Err(e) => println!("  ⚠ {}", e),
                    }
                    if let Ok(meta) = std::fs::metadata(&path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("チェックポイントファイルが存在しません: {}", path.display());
                }
            }

            if clear {
                let confirmed = yes
                    || dialoguer::Confirm::new()
                        .with_prompt(format!("{} を削除しますか？", path.display()))
                        .default(false)
                        .interact()
                        .unwrap_or(false);

                if confirmed {
                    match store.clear() {
                        Ok(true) => println!("✔ チェックポイントを削除しました: {}", path.display()),
                        Ok(false) => println!("チェックポイントファイルが存在しません"),
                        Err(e) => println!("チェックポイント削除エラー: {}", e),
                    }
                } else {
                    println!("削除を取りやめました");
                }
            }
        }

        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => AppConfig::config_path()?,
                };
                if path.exists() {
                    println!("設定ファイルは既に存在します: {}", path.display());
                } else {
                    AppConfig::default().save(&path)?;
                    println!("✔ 設定ファイルを作成しました: {}", path.display());
                }
            }

            if show || !init {
                let config = AppConfig::load(cli.config.as_deref())?;
                println!("設定:");
                println!("  検索URL: {}?{}=...", config.search_url, config.query_param);
                println!("  タイムアウト: {}秒", config.request_timeout_seconds);
                println!(
                    "  再試行: {}回 (待ち {}秒から倍増, 上限 {}秒)",
                    config.max_retries, config.backoff_base_seconds, config.max_backoff_seconds
                );
                println!("  リクエスト間隔: {}秒", config.inter_request_delay_seconds);
                println!("  チェックポイント: {} ({}件ごと)", config.checkpoint_path.display(), config.checkpoint_interval);
                println!("  閾値: exact ≥ {}, close ≥ {}", config.exact_threshold, config.close_threshold);
                println!("  候補上限: {}", config.candidate_limit);
            }
        }
    }

    Ok(())
}

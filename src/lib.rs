//! medprice - 医薬品名 → MRP 照合エンジン
//!
//! 名前リストを販売サイトの検索結果と照合し、価格と確度区分を付けた
//! 結果表を作る。途中で止めてもチェックポイントから再開できる。

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod fetcher;
pub mod input;
pub mod query;
pub mod runner;

pub use crate::config::AppConfig;
pub use crate::error::{ResolveError, Result};
pub use crate::fetcher::{CandidateFetcher, CandidateSource, FetchError, HttpSource, Pacer, RetryPolicy};
pub use crate::query::{QueryBuilder, SearchQuery};
pub use crate::runner::{BatchRunner, CancelFlag, CheckpointStore, Resolver, RunReport, RunStatus};

//! 設定
//!
//! 既定値 → 設定ファイル（`~/.config/medprice/config.json` または `--config`）
//! → 環境変数 `MEDPRICE_*` → CLI指定 の順に上書きする。

use crate::error::{ResolveError, Result};
use crate::fetcher::{RetryPolicy, DEFAULT_MAX_DELAY};
use medprice_common::parser::DEFAULT_CANDIDATE_LIMIT;
use medprice_common::tier::{DEFAULT_CLOSE_THRESHOLD, DEFAULT_EXACT_THRESHOLD};
use medprice_common::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "MEDPRICE";
pub const DEFAULT_SEARCH_URL: &str = "https://www.1mg.com/search/all";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 1リクエストのタイムアウト（秒）
    pub request_timeout_seconds: u64,
    /// 初回以降の再試行回数
    pub max_retries: u32,
    /// 再試行待ちの基準（秒）。再試行ごとに倍になる
    pub backoff_base_seconds: f64,
    /// 1回の再試行待ちの上限（秒）。Retry-After が長くてもここで打ち切る
    pub max_backoff_seconds: f64,
    /// リクエスト間の最小間隔（秒）
    pub inter_request_delay_seconds: f64,
    /// 何件ごとにチェックポイントへ書き出すか
    pub checkpoint_interval: usize,
    pub exact_threshold: f64,
    pub close_threshold: f64,
    pub search_url: String,
    pub query_param: String,
    pub user_agent: String,
    /// 1ページから採用する候補数
    pub candidate_limit: usize,
    pub checkpoint_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 15,
            max_retries: 3,
            backoff_base_seconds: 2.0,
            max_backoff_seconds: DEFAULT_MAX_DELAY.as_secs_f64(),
            inter_request_delay_seconds: 2.0,
            checkpoint_interval: 50,
            exact_threshold: DEFAULT_EXACT_THRESHOLD,
            close_threshold: DEFAULT_CLOSE_THRESHOLD,
            search_url: DEFAULT_SEARCH_URL.into(),
            query_param: "name".into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            checkpoint_path: PathBuf::from("medprice-checkpoint.json"),
        }
    }
}

impl AppConfig {
    /// 設定を読み込む（`file` 省略時は既定の設定ファイル、なければ既定値）
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env_prefix(file, ENV_PREFIX)
    }

    pub fn load_with_env_prefix(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        match file {
            Some(path) => {
                if !path.exists() {
                    return Err(ResolveError::Config(format!(
                        "設定ファイルが見つかりません: {}",
                        path.display()
                    )));
                }
                builder = builder.add_source(config::File::from(path));
            }
            None => {
                if let Ok(path) = Self::config_path() {
                    if path.exists() {
                        builder = builder.add_source(config::File::from(path));
                    }
                }
            }
        }

        let config: AppConfig = builder
            .add_source(config::Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ResolveError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("medprice").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_seconds == 0 {
            return Err(ResolveError::Config(
                "request_timeout_seconds は1以上にしてください".into(),
            ));
        }
        if self.checkpoint_interval == 0 {
            return Err(ResolveError::Config(
                "checkpoint_interval は1以上にしてください".into(),
            ));
        }
        if self.candidate_limit == 0 {
            return Err(ResolveError::Config("candidate_limit は1以上にしてください".into()));
        }
        for (key, value) in [
            ("backoff_base_seconds", self.backoff_base_seconds),
            ("max_backoff_seconds", self.max_backoff_seconds),
            ("inter_request_delay_seconds", self.inter_request_delay_seconds),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ResolveError::Config(format!(
                    "{} は0以上の数値にしてください: {}",
                    key, value
                )));
            }
        }
        if self.query_param.trim().is_empty() {
            return Err(ResolveError::Config("query_param が空です".into()));
        }
        reqwest::Url::parse(&self.search_url).map_err(|e| {
            ResolveError::Config(format!("search_url が不正です ({}): {}", self.search_url, e))
        })?;
        self.thresholds()?;
        Ok(())
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Ok(Thresholds::new(self.exact_threshold, self.close_threshold)?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, secs(self.backoff_base_seconds))
            .with_max_delay(secs(self.max_backoff_seconds))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn inter_request_delay(&self) -> Duration {
        secs(self.inter_request_delay_seconds)
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

//! 確度区分の判定
//!
//! スコアから区分を決め、表示用のラベル・記号・塗り色を返す。
//! 閾値は設定値として外から渡す。

use crate::error::{Error, Result};
use crate::types::{Candidate, ConfidenceTier, MatchResult, MedicineQuery};
use serde::{Deserialize, Serialize};

pub const DEFAULT_EXACT_THRESHOLD: f64 = 0.90;
pub const DEFAULT_CLOSE_THRESHOLD: f64 = 0.60;

/// 区分の閾値
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// これ以上で Exact
    pub exact: f64,
    /// これ以上で Close（Exact未満）
    pub close: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            exact: DEFAULT_EXACT_THRESHOLD,
            close: DEFAULT_CLOSE_THRESHOLD,
        }
    }
}

impl Thresholds {
    pub fn new(exact: f64, close: f64) -> Result<Self> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(exact) || !in_range(close) {
            return Err(Error::Config(format!(
                "閾値は0.0〜1.0で指定してください (exact={}, close={})",
                exact, close
            )));
        }
        if close > exact {
            return Err(Error::Config(format!(
                "close閾値がexact閾値を超えています (exact={}, close={})",
                exact, close
            )));
        }
        Ok(Self { exact, close })
    }

    /// スコアを区分に変換（候補なし・スコア0は NotFound）
    pub fn classify(&self, best: Option<&(Candidate, f64)>) -> ConfidenceTier {
        match best {
            None => ConfidenceTier::NotFound,
            Some((_, score)) => self.classify_score(*score),
        }
    }

    pub fn classify_score(&self, score: f64) -> ConfidenceTier {
        if score <= 0.0 {
            ConfidenceTier::NotFound
        } else if score >= self.exact {
            ConfidenceTier::Exact
        } else if score >= self.close {
            ConfidenceTier::Close
        } else {
            ConfidenceTier::Low
        }
    }

    /// 照合結果を組み立てる
    pub fn grade(&self, query: MedicineQuery, best: Option<(Candidate, f64)>) -> MatchResult {
        let tier = self.classify(best.as_ref());
        match best {
            Some((candidate, score)) if tier != ConfidenceTier::NotFound => MatchResult {
                query,
                best_candidate: Some(candidate),
                score,
                tier,
            },
            _ => MatchResult::not_found(query),
        }
    }
}

impl ConfidenceTier {
    pub const ALL: [ConfidenceTier; 4] = [
        ConfidenceTier::Exact,
        ConfidenceTier::Close,
        ConfidenceTier::Low,
        ConfidenceTier::NotFound,
    ];

    /// 出力表の match_type 表記
    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::Exact => "exact",
            ConfidenceTier::Close => "close",
            ConfidenceTier::Low => "low_match",
            ConfidenceTier::NotFound => "not_found",
        }
    }

    /// コンソール表示の記号
    pub fn marker(&self) -> &'static str {
        match self {
            ConfidenceTier::Exact => "✓",
            ConfidenceTier::Close => "~",
            ConfidenceTier::Low => "?",
            ConfidenceTier::NotFound => "✗",
        }
    }

    /// 価格セルの塗り色（RGB）。NotFound は塗りなし
    pub fn fill_color(&self) -> Option<u32> {
        match self {
            ConfidenceTier::Exact => Some(0xC6EFCE),
            ConfidenceTier::Close => Some(0xFFCC99),
            ConfidenceTier::Low => Some(0xFFF2CC),
            ConfidenceTier::NotFound => None,
        }
    }

    /// 確認が必要な区分か
    pub fn needs_review(&self) -> bool {
        matches!(self, ConfidenceTier::Close | ConfidenceTier::Low)
    }
}

//! 照合結果の型定義
//!
//! - MedicineQuery: 入力の医薬品名（上流で正規化済み）
//! - Candidate: 検索結果から取り出した候補（商品名 + MRP + 商品ページURL）
//! - MatchResult: 1件分の照合結果
//! - ResultRow: チェックポイントと出力表に書かれる行

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 正規化済みの医薬品名
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MedicineQuery {
    pub raw_name: String,
}

impl MedicineQuery {
    pub fn new(raw_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
        }
    }
}

/// 検索結果の候補
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub product_name: String,
    /// MRP（割引前の表示価格）、常に正の値
    pub price: BigDecimal,
    /// 商品ページ。パーサーはページ上の表記のまま、取得側で絶対URLに解決する
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
}

impl Candidate {
    pub fn new(product_name: impl Into<String>, price: BigDecimal) -> Self {
        Self {
            product_name: product_name.into(),
            price,
            product_url: None,
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.product_url = url;
        self
    }
}

/// 照合の確度区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfidenceTier {
    #[serde(rename = "exact")]
    Exact,
    #[serde(rename = "close")]
    Close,
    #[serde(rename = "low_match")]
    Low,
    #[serde(rename = "not_found")]
    NotFound,
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// 1件分の照合結果
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub query: MedicineQuery,
    pub best_candidate: Option<Candidate>,
    /// 0.0〜1.0
    pub score: f64,
    pub tier: ConfidenceTier,
}

impl MatchResult {
    /// 候補なし（取得失敗を含む）
    pub fn not_found(query: MedicineQuery) -> Self {
        Self {
            query,
            best_candidate: None,
            score: 0.0,
            tier: ConfidenceTier::NotFound,
        }
    }
}

/// 永続化される結果行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub index: usize,
    pub raw_name: String,
    pub found_name: Option<String>,
    pub price: Option<BigDecimal>,
    pub score: f64,
    pub tier: ConfidenceTier,
    /// 採用した候補の商品ページ（価格の再確認用）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
    /// 取得失敗時の理由（区分には影響しない）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRow {
    pub fn from_match(index: usize, result: &MatchResult) -> Self {
        Self {
            index,
            raw_name: result.query.raw_name.clone(),
            found_name: result.best_candidate.as_ref().map(|c| c.product_name.clone()),
            price: result.best_candidate.as_ref().map(|c| c.price.clone()),
            score: result.score,
            tier: result.tier,
            product_url: result.best_candidate.as_ref().and_then(|c| c.product_url.clone()),
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// 区分ごとの件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub exact: usize,
    pub close: usize,
    pub low: usize,
    pub not_found: usize,
}

impl TierSummary {
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            summary.record(row.tier);
        }
        summary
    }

    pub fn record(&mut self, tier: ConfidenceTier) {
        match tier {
            ConfidenceTier::Exact => self.exact += 1,
            ConfidenceTier::Close => self.close += 1,
            ConfidenceTier::Low => self.low += 1,
            ConfidenceTier::NotFound => self.not_found += 1,
        }
    }

    pub fn count(&self, tier: ConfidenceTier) -> usize {
        match tier {
            ConfidenceTier::Exact => self.exact,
            ConfidenceTier::Close => self.close,
            ConfidenceTier::Low => self.low,
            ConfidenceTier::NotFound => self.not_found,
        }
    }

    pub fn total(&self) -> usize {
        self.exact + self.close + self.low + self.not_found
    }
}

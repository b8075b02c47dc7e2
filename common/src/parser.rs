//! 検索結果ページのパーサー
//!
//! 検索結果HTMLから（商品名, MRP）の候補を取り出す。
//!
//! 抽出優先順位:
//! 1. `__NEXT_DATA__` 埋め込みJSON（商品名キーと `mrp` キーを持つオブジェクト）
//! 2. 商品カード要素（class に product/item/card を含む要素）
//!
//! 価格は「MRP」と明示されたものだけを採用する。割引価格・販売価格は
//! 同じ要素にあっても使わない。価格が読めない候補はその候補だけ捨てる。
//! 商品ページのリンクはページ上の表記（相対パスを含む）のまま返す。

use crate::types::Candidate;
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// 1ページから採用する候補の上限（既定値）
pub const DEFAULT_CANDIDATE_LIMIT: usize = 10;

const NAME_KEYS: &[&str] = &["name", "productName", "title"];
const MRP_KEYS: &[&str] = &["mrp", "MRP"];
const OTHER_PRICE_KEYS: &[&str] = &["price", "discountedPrice", "offerPrice", "salePrice"];
const URL_KEYS: &[&str] = &["url", "productUrl"];
/// slug だけが入っている場合の商品ページの置き場所
const SLUG_PREFIX: &str = "/drugs/";

lazy_static::lazy_static! {
    static ref MRP_RE: Regex =
        Regex::new(r"(?i)\bMRP\b\s*[:\-]?\s*(?:₹|rs\.?|inr)?\s*(-?\d[\d,]*(?:\.\d+)?)").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"-?\d[\d,]*(?:\.\d+)?").unwrap();
    static ref CARD_CLASS_RE: Regex = Regex::new(r"(?i)(product|item|card)").unwrap();
    static ref NAME_CLASS_RE: Regex = Regex::new(r"(?i)(name|title)").unwrap();
    static ref NEXT_DATA: Selector = Selector::parse("script#__NEXT_DATA__").unwrap();
    static ref CARD: Selector = Selector::parse("div, li, article").unwrap();
    static ref NAME_CANDIDATE: Selector = Selector::parse("h1, h2, h3, h4, a, span, div").unwrap();
    static ref DATA_NAME: Selector = Selector::parse("[data-name]").unwrap();
    static ref LINK: Selector = Selector::parse("a[href]").unwrap();
}

/// 候補単位のパースエラー（候補は捨てられ、取得自体は成功扱い）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateParseError {
    #[error("MRPが見つかりません: {product_name}")]
    MissingPrice { product_name: String },

    #[error("MRPを数値として解釈できません: {product_name} ({raw})")]
    MalformedPrice { product_name: String, raw: String },

    #[error("MRPが0以下です: {product_name} ({price})")]
    NonPositivePrice { product_name: String, price: String },
}

/// パース結果
#[derive(Debug, Clone, Default)]
pub struct ParsedCandidates {
    pub candidates: Vec<Candidate>,
    pub rejected: Vec<CandidateParseError>,
}

/// 検索結果HTMLから候補を抽出
///
/// # Arguments
/// * `html` - レスポンス本文
/// * `limit` - 採用する候補の上限（ページ先頭から）
pub fn parse_candidates(html: &str, limit: usize) -> ParsedCandidates {
    let document = Html::parse_document(html);

    let mut found = Found::default();
    extract_from_next_data(&document, &mut found);
    if found.candidates.is_empty() {
        extract_from_cards(&document, &mut found);
    }

    ParsedCandidates {
        candidates: found.candidates.into_iter().take(limit).collect(),
        rejected: found.rejected,
    }
}

/// MRP表記のテキストから価格を取り出す（例: `MRP ₹1,234.50`）
pub fn extract_mrp(text: &str) -> Option<&str> {
    MRP_RE
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str())
}

#[derive(Default)]
struct Found {
    candidates: IndexSet<Candidate>,
    rejected: Vec<CandidateParseError>,
}

impl Found {
    fn push(&mut self, result: Result<Candidate, CandidateParseError>) {
        match result {
            Ok(candidate) => {
                self.candidates.insert(candidate);
            }
            Err(e) => self.rejected.push(e),
        }
    }
}

/// 数値文字列を正のMRPとして解釈
fn price_from_text(product_name: &str, raw: &str) -> Result<Candidate, CandidateParseError> {
    let digits = NUMBER_RE
        .find(raw)
        .map(|m| m.as_str().replace(',', ""))
        .ok_or_else(|| CandidateParseError::MalformedPrice {
            product_name: product_name.to_string(),
            raw: raw.to_string(),
        })?;

    let price = BigDecimal::from_str(&digits).map_err(|_| CandidateParseError::MalformedPrice {
        product_name: product_name.to_string(),
        raw: raw.to_string(),
    })?;

    if price <= BigDecimal::zero() {
        return Err(CandidateParseError::NonPositivePrice {
            product_name: product_name.to_string(),
            price: digits,
        });
    }

    Ok(Candidate::new(product_name, price))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Strategy 1: __NEXT_DATA__ ───────────────────────────────────────

fn extract_from_next_data(document: &Html, found: &mut Found) {
    let Some(script) = document.select(&NEXT_DATA).next() else {
        return;
    };
    let text: String = script.text().collect();
    let Ok(data) = serde_json::from_str::<Value>(&text) else {
        return;
    };
    walk_json(&data, found);
}

fn walk_json(value: &Value, found: &mut Found) {
    match value {
        Value::Object(map) => {
            let name = NAME_KEYS
                .iter()
                .find_map(|k| map.get(*k).and_then(Value::as_str))
                .map(collapse_whitespace)
                .filter(|n| !n.is_empty());

            if let Some(name) = name {
                if let Some(mrp) = MRP_KEYS.iter().find_map(|k| map.get(*k)) {
                    found.push(price_from_json(&name, mrp).map(|c| c.with_url(json_url(map))));
                    return;
                }
                if OTHER_PRICE_KEYS.iter().any(|k| map.contains_key(*k)) {
                    found.push(Err(CandidateParseError::MissingPrice { product_name: name }));
                    return;
                }
            }

            for child in map.values() {
                walk_json(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_json(item, found);
            }
        }
        _ => {}
    }
}

/// 商品ページ（`url` 系キー、なければ `slug`）
fn json_url(map: &serde_json::Map<String, Value>) -> Option<String> {
    let non_empty = |v: &Value| v.as_str().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(url) = URL_KEYS.iter().find_map(|k| map.get(*k).and_then(non_empty)) {
        return Some(url);
    }
    map.get("slug").and_then(non_empty).map(|slug| {
        if slug.starts_with('/') || slug.contains("://") {
            slug
        } else {
            format!("{}{}", SLUG_PREFIX, slug)
        }
    })
}

fn price_from_json(name: &str, value: &Value) -> Result<Candidate, CandidateParseError> {
    match value {
        Value::Number(n) => price_from_text(name, &n.to_string()),
        Value::String(s) => price_from_text(name, s),
        other => Err(CandidateParseError::MalformedPrice {
            product_name: name.to_string(),
            raw: other.to_string(),
        }),
    }
}

// ── Strategy 2: 商品カード ───────────────────────────────────────────

fn is_card(element: &ElementRef) -> bool {
    element
        .value()
        .attr("class")
        .map(|c| CARD_CLASS_RE.is_match(c))
        .unwrap_or(false)
}

fn has_name_class(element: &ElementRef) -> bool {
    element
        .value()
        .attr("class")
        .map(|c| NAME_CLASS_RE.is_match(c))
        .unwrap_or(false)
}

/// カード内の商品名（name/title クラスの要素、なければ data-name 属性）
fn card_name(card: &ElementRef) -> Option<String> {
    let by_class = card
        .select(&NAME_CANDIDATE)
        .filter(|e| e.id() != card.id())
        .find(has_name_class)
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .filter(|n| !n.is_empty());

    by_class.or_else(|| {
        card.value()
            .attr("data-name")
            .or_else(|| card.select(&DATA_NAME).find_map(|e| e.value().attr("data-name")))
            .map(collapse_whitespace)
            .filter(|n| !n.is_empty())
    })
}

/// カード内の商品リンク（商品名のリンクを優先）
fn card_url(card: &ElementRef) -> Option<String> {
    let usable = |href: &&str| {
        let href = href.trim();
        !href.is_empty() && !href.starts_with('#') && !href.starts_with("javascript:")
    };
    let links: Vec<ElementRef> = card.select(&LINK).collect();
    links
        .iter()
        .filter(|a| has_name_class(a))
        .chain(links.iter())
        .filter_map(|a| a.value().attr("href"))
        .find(usable)
        .map(|href| href.trim().to_string())
}

fn card_candidate(card: &ElementRef, name: &str) -> Result<Candidate, CandidateParseError> {
    let text = collapse_whitespace(&card.text().collect::<Vec<_>>().join(" "));
    let result = if MRP_RE.is_match(&text) {
        match extract_mrp(&text) {
            Some(raw) => price_from_text(name, raw),
            None => Err(CandidateParseError::MalformedPrice {
                product_name: name.to_string(),
                raw: text.clone(),
            }),
        }
    } else if text.to_uppercase().contains("MRP") {
        Err(CandidateParseError::MalformedPrice {
            product_name: name.to_string(),
            raw: text.clone(),
        })
    } else {
        Err(CandidateParseError::MissingPrice {
            product_name: name.to_string(),
        })
    };
    result.map(|candidate| candidate.with_url(card_url(card)))
}

fn contains(outer: &ElementRef, inner: &ElementRef) -> bool {
    inner.id() != outer.id() && inner.ancestors().any(|a| a.id() == outer.id())
}

/// 商品カードから候補を抽出
///
/// class 判定はゆるいので、カードの中の囲み要素（`product-info` 等）や
/// カードを並べた一覧コンテナもカード扱いになる。入れ子は次の順で解く:
/// 1. 内側に価格の取れたカードを持つ外枠は使わない
/// 2. 価格の取れない要素のうち、内側に別のカードを持つものは内側に任せる
/// 3. 価格の取れない要素は、価格の取れた外側のカードがあればそちらに任せる
fn extract_from_cards(document: &Html, found: &mut Found) {
    let entries: Vec<(ElementRef, Result<Candidate, CandidateParseError>)> = document
        .select(&CARD)
        .filter(is_card)
        .filter_map(|card| {
            let name = card_name(&card)?;
            let result = card_candidate(&card, &name);
            Some((card, result))
        })
        .collect();

    let used: Vec<bool> = entries
        .iter()
        .map(|(card, result)| {
            let inner_ok = entries
                .iter()
                .any(|(other, r)| r.is_ok() && contains(card, other));
            let inner_any = entries.iter().any(|(other, _)| contains(card, other));
            !(inner_ok || (result.is_err() && inner_any))
        })
        .collect();

    for (i, (card, result)) in entries.iter().enumerate() {
        if !used[i] {
            continue;
        }
        let covered = result.is_err()
            && entries
                .iter()
                .enumerate()
                .any(|(j, (other, r))| used[j] && r.is_ok() && contains(other, card));
        if covered {
            continue;
        }
        found.push(result.clone());
    }
}

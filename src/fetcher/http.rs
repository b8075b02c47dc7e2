//! 販売サイトへのHTTP取得

use super::{AttemptError, CandidateSource};
use crate::config::AppConfig;
use crate::error::{ResolveError, Result};
use crate::query::SearchQuery;
use medprice_common::{parse_candidates, Candidate};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";

pub struct HttpSource {
    client: reqwest::Client,
    candidate_limit: usize,
}

impl HttpSource {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_EN));
        if let Some(referer) = referer_for(&config.search_url) {
            headers.insert(REFERER, referer);
        }

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ResolveError::Http(e.to_string()))?;

        Ok(Self {
            client,
            candidate_limit: config.candidate_limit,
        })
    }
}

/// 検索URLのオリジン（例: `https://www.1mg.com/`）
fn referer_for(search_url: &str) -> Option<HeaderValue> {
    let url = Url::parse(search_url).ok()?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return None;
    }
    HeaderValue::from_str(&format!("{}/", origin.ascii_serialization())).ok()
}

/// Retry-After（秒数表記のみ対応）
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// ページ上のリンクを取得したページ基準の絶対URLにする（http/https 以外は捨てる）
fn resolve_link(page_url: &Url, href: &str) -> Option<String> {
    let url = page_url.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

impl CandidateSource for HttpSource {
    async fn fetch_once(&self, query: &SearchQuery) -> std::result::Result<Vec<Candidate>, AttemptError> {
        let resp = self
            .client
            .get(query.url.clone())
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited {
                retry_after: parse_retry_after(resp.headers()),
            });
        }
        if status.is_server_error() {
            return Err(AttemptError::Transient(format!("HTTP {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let page_url = resp.url().clone();
        let body = resp
            .text()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let parsed = parse_candidates(&body, self.candidate_limit);
        for rejected in &parsed.rejected {
            debug!(name = %query.name, reason = %rejected, "候補を除外");
        }
        Ok(parsed
            .candidates
            .into_iter()
            .map(|c| {
                let url = c.product_url.as_deref().and_then(|href| resolve_link(&page_url, href));
                c.with_url(url)
            })
            .collect())
    }
}

//! 検索クエリの組み立て

use crate::config::AppConfig;
use crate::error::{ResolveError, Result};
use reqwest::Url;

/// 1件分の検索クエリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// 正規化済みの医薬品名
    pub name: String,
    pub url: Url,
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base: Url,
    param: String,
}

impl QueryBuilder {
    /// 検索URLはここで一度だけ検証する
    pub fn new(search_url: &str, param: &str) -> Result<Self> {
        let base = Url::parse(search_url).map_err(|e| {
            ResolveError::Config(format!("search_url が不正です ({}): {}", search_url, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(ResolveError::Config(format!(
                "search_url にクエリを付けられません: {}",
                search_url
            )));
        }
        Ok(Self {
            base,
            param: param.to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(&config.search_url, &config.query_param)
    }

    /// 名前をフォーム形式でエンコードしてクエリを作る（空白は `+`）
    pub fn build(&self, name: &str) -> SearchQuery {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair(&self.param, name);
        SearchQuery {
            name: name.to_string(),
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SEARCH_URL;

    #[test]
    fn test_build_default_endpoint() {
        let builder = QueryBuilder::new(DEFAULT_SEARCH_URL, "name").unwrap();
        let query = builder.build("dolo 650");
        assert_eq!(query.url.as_str(), "https://www.1mg.com/search/all?name=dolo+650");
        assert_eq!(query.name, "dolo 650");
    }

    #[test]
    fn test_build_escapes_reserved_chars() {
        let builder = QueryBuilder::new("http://127.0.0.1:8080/search", "q").unwrap();
        let query = builder.build("amaryl 1mg/5&x");
        assert_eq!(query.url.as_str(), "http://127.0.0.1:8080/search?q=amaryl+1mg%2F5%26x");
    }

    #[test]
    fn test_build_keeps_existing_query() {
        let builder = QueryBuilder::new("https://example.com/find?lang=en", "name").unwrap();
        let query = builder.build("crocin");
        assert_eq!(query.url.as_str(), "https://example.com/find?lang=en&name=crocin");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            QueryBuilder::new("not a url", "name"),
            Err(ResolveError::Config(_))
        ));
        assert!(QueryBuilder::new("mailto:someone@example.com", "name").is_err());
    }
}

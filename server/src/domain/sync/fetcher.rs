//! Where the synchronizer gets its pages from
//!
//! [`HttpFetcher`] talks to a running server's list endpoint. The registry
//! itself is also a [`Fetcher`], which lets the synchronizer run in-process.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;

use super::codec::encode_sort;
use crate::core::constants::QUERY_CLIENT_TIMEOUT_SECS;
use crate::data::Document;
use crate::domain::entity::{EntityRegistry, ServiceError};
use crate::domain::query::{QueryResult, SearchQuery};
use crate::utils::time::format_timestamp;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid server URL: {0}")]
    Url(String),

    #[error("Server returned {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        entity: &str,
        query: &SearchQuery,
    ) -> Result<QueryResult<Document>, FetchError>;
}

#[async_trait]
impl Fetcher for EntityRegistry {
    async fn fetch(
        &self,
        entity: &str,
        query: &SearchQuery,
    ) -> Result<QueryResult<Document>, FetchError> {
        let resource = self
            .get(entity)
            .ok_or_else(|| FetchError::UnknownEntity(entity.to_string()))?;
        Ok(resource.service.find_many(query).await?)
    }
}

#[derive(Deserialize)]
struct ListEnvelope {
    data: Vec<Document>,
    meta: ListMeta,
}

#[derive(Deserialize)]
struct ListMeta {
    total: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for `GET {base}/api/v1/{entity}`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let mut base = Url::parse(base_url).map_err(|e| FetchError::Url(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::Url(format!("'{}' cannot be a base URL", base_url)));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(QUERY_CLIENT_TIMEOUT_SECS))
            .build()?;
        tracing::debug!(base = %base, "HTTP fetcher initialized");
        Ok(Self { client, base })
    }

    /// The list URL a query is sent to
    pub fn list_url(&self, entity: &str, query: &SearchQuery) -> Result<Url, FetchError> {
        let mut url = self
            .base
            .join(&format!("api/v1/{}", entity))
            .map_err(|e| FetchError::Url(e.to_string()))?;

        let filter = query
            .filter
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| FetchError::Url(e.to_string()))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &filter {
                pairs.append_pair("filter", filter);
            }
            if !query.sort.is_empty() {
                pairs.append_pair("sort", &encode_sort(&query.sort));
            }
            pairs.append_pair("page", &query.page.number.to_string());
            pairs.append_pair("limit", &query.page.size.to_string());
            if let Some(range) = &query.date_range {
                if let Some(start) = range.start {
                    pairs.append_pair("startDate", &format_timestamp(start));
                }
                if let Some(end) = range.end {
                    pairs.append_pair("endDate", &format_timestamp(end));
                }
            }
        }
        Ok(url)
    }
}

fn api_error(status: StatusCode, body: &str) -> FetchError {
    let envelope: Option<ErrorEnvelope> = serde_json::from_str(body).ok();
    let (code, message) = match envelope {
        Some(e) => (e.code, e.message),
        None => (None, None),
    };
    FetchError::Api {
        status: status.as_u16(),
        code: code.unwrap_or_else(|| "UNKNOWN".to_string()),
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        entity: &str,
        query: &SearchQuery,
    ) -> Result<QueryResult<Document>, FetchError> {
        let url = self.list_url(entity, query)?;
        tracing::debug!(url = %url, "Fetching page");
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        let envelope: ListEnvelope = resp.json().await?;
        Ok(QueryResult {
            items: envelope.data,
            total_count: envelope.meta.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::{DateRange, FilterNode, Operator, SortSpec};
    use crate::utils::time::parse_timestamp;

    #[test]
    fn test_list_url_carries_query() {
        let fetcher = HttpFetcher::new("http://localhost:5390").unwrap();
        let query = SearchQuery::new()
            .with_filter(FilterNode::condition(
                "name",
                Operator::Contains,
                Some("a&b".into()),
            ))
            .with_sort(SortSpec::asc("name"))
            .with_page(2, 25)
            .with_date_range(DateRange {
                start: parse_timestamp("2024-01-01"),
                end: None,
            });

        let url = fetcher.list_url("members", &query).unwrap();
        assert_eq!(url.path(), "/api/v1/members");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        let get = |k: &str| pairs.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        let filter: FilterNode = serde_json::from_str(get("filter").unwrap()).unwrap();
        assert_eq!(Some(&filter), query.filter.as_ref());
        assert_eq!(get("sort"), Some("name:asc"));
        assert_eq!(get("page"), Some("2"));
        assert_eq!(get("limit"), Some("25"));
        assert_eq!(get("startDate"), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(get("endDate"), None);
    }

    #[test]
    fn test_base_path_is_kept() {
        let fetcher = HttpFetcher::new("http://example.test/forge").unwrap();
        let url = fetcher.list_url("plans", &SearchQuery::new()).unwrap();
        assert_eq!(url.path(), "/forge/api/v1/plans");
        assert_eq!(url.query(), Some("page=1&limit=10"));
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(HttpFetcher::new("not a url"), Err(FetchError::Url(_))));
        assert!(matches!(HttpFetcher::new("mailto:x@y.z"), Err(FetchError::Url(_))));
    }

    #[test]
    fn test_api_error_reads_envelope() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":"bad_request","code":"INVALID_OPERATOR","message":"nope"}"#,
        );
        assert!(matches!(
            err,
            FetchError::Api { status: 400, ref code, ref message }
                if code == "INVALID_OPERATOR" && message == "nope"
        ));

        let err = api_error(StatusCode::BAD_GATEWAY, "<html>");
        assert!(matches!(
            err,
            FetchError::Api { status: 502, ref code, ref message }
                if code == "UNKNOWN" && message == "Bad Gateway"
        ));
    }

    #[tokio::test]
    async fn test_registry_fetcher() {
        use crate::data::{DocumentStore, SqliteService};
        use crate::domain::catalog;
        use crate::domain::query::QueryLimits;
        use std::sync::Arc;

        let store: Arc<dyn DocumentStore> =
            Arc::new(Arc::new(SqliteService::init_in_memory().await.unwrap()));
        catalog::seed(store.as_ref()).await.unwrap();
        let registry = catalog::build_registry(store, QueryLimits::default()).unwrap();

        let result = registry.fetch("plans", &SearchQuery::new()).await.unwrap();
        assert_eq!(result.total_count, 3);
        assert!(matches!(
            registry.fetch("nope", &SearchQuery::new()).await,
            Err(FetchError::UnknownEntity(_))
        ));
    }
}

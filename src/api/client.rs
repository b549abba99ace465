use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::source::ArticleSource;
use super::types::{ArticleListResponse, ArticlePage, RemoteArticle};

pub const DEFAULT_BASE_URL: &str = "https://api.spaceflightnewsapi.net/v4";

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Errors returned by the news API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// The API answered with a non-2xx status code
    #[error("HTTP error: status {0}")]
    Status(u16),
    /// Body was not the JSON shape we expect
    #[error("Invalid response body: {0}")]
    Decode(String),
    /// Response body exceeded the 5MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ApiError {
    /// HTTP status for [`ApiError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(status) => Some(*status),
            _ => None,
        }
    }
}

/// HTTP client for the spaceflight news API.
#[derive(Clone)]
pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl NewsApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("launchfeed/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, base_url, timeout)
    }

    /// Build on an existing `reqwest::Client` (shared connection pool, tests).
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            client,
            base_url: parse_base_url(base_url)?,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(url = %url, "GET");

        let response = tokio::time::timeout(self.timeout, self.client.get(url.clone()).send())
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::Network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "API returned error status");
            return Err(ApiError::Status(status.as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_RESPONSE_SIZE).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ArticleSource for NewsApiClient {
    async fn fetch_page(
        &self,
        limit: usize,
        offset: usize,
        search: Option<&str>,
    ) -> Result<ArticlePage, ApiError> {
        let mut url = self.endpoint("articles/")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            query.append_pair("offset", &offset.to_string());
            if let Some(search) = search.filter(|s| !s.is_empty()) {
                query.append_pair("search", search);
            }
        }

        let response: ArticleListResponse = self.get_json(url).await?;
        Ok(response.into())
    }

    async fn fetch_article(&self, id: i64) -> Result<RemoteArticle, ApiError> {
        let url = self.endpoint(&format!("articles/{id}/"))?;
        self.get_json(url).await
    }
}

/// Parse and normalize the API base URL.
///
/// HTTPS is required, except for localhost (used by tests and local mirrors).
/// The path always ends in `/` so relative endpoints join beneath it.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(raw).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

    match url.scheme() {
        "https" => {}
        "http" => {
            let is_localhost = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
            if !is_localhost {
                return Err(ApiError::InvalidBaseUrl(format!(
                    "{raw}: HTTPS required (except localhost)"
                )));
            }
            tracing::warn!(base_url = %raw, "Using non-HTTPS API base URL (localhost only)");
        }
        other => {
            return Err(ApiError::InvalidBaseUrl(format!(
                "unsupported scheme {other}"
            )))
        }
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ApiError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

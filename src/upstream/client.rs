//! Remote page retrieval.
//!
//! # Responsibilities
//! - Present browser-like request headers so target sites serve normal pages
//! - Enforce one deadline over connect, headers and body
//! - Classify failures as timeout / upstream status / network
//!
//! # Design Decisions
//! - Exactly one attempt; the client sees the real state of the remote site
//! - Redirects are followed (bounded) like a browser would
//! - Bodies are buffered (the rewriter needs the whole document) up to a
//!   configured limit, checked against Content-Length and while streaming

use std::time::{Duration, Instant};

use axum::body::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::redirect::Policy;
use tokio::time::timeout;
use url::Url;

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::upstream::error::{FetchError, FetchResult};

/// A successfully retrieved remote resource.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects.
    pub final_url: Url,
    /// Content-Type as sent by the remote site.
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedPage {
    /// Whether the body should go through the HTML rewriter.
    pub fn is_html(&self) -> bool {
        is_html_content_type(self.content_type.as_deref())
    }
}

/// HTML when declared as such, or when no type was declared at all.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            let value = value.to_ascii_lowercase();
            value.contains("text/html") || value.contains("application/xhtml+xml")
        }
    }
}

/// HTTP client wrapper used by the proxy endpoint.
#[derive(Clone)]
pub struct FetchClient {
    client: reqwest::Client,
    timeout_duration: Duration,
    max_body_size: usize,
}

impl FetchClient {
    /// Build a client from upstream settings.
    pub fn new(config: &UpstreamConfig) -> FetchResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, header_value(&config.accept)?);
        headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        let timeout_duration = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .redirect(Policy::limited(config.max_redirects))
            .no_proxy()
            .connect_timeout(timeout_duration)
            .timeout(timeout_duration)
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            timeout_duration,
            max_body_size: config.max_body_size,
        })
    }

    /// Fetch an absolute `http`/`https` URL.
    pub async fn fetch(&self, url: &Url) -> FetchResult<FetchedPage> {
        let start = Instant::now();
        let result = match timeout(self.timeout_duration, self.fetch_inner(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout_duration.as_secs())),
        };

        metrics::record_fetch(
            result.as_ref().map(|_| "ok").unwrap_or_else(|e| e.kind()),
            start,
        );
        result
    }

    async fn fetch_inner(&self, url: &Url) -> FetchResult<FetchedPage> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamError(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = self.read_body(&mut response).await?;

        tracing::debug!(
            url = %url,
            final_url = %final_url,
            content_type = content_type.as_deref().unwrap_or("-"),
            bytes = body.len(),
            "Fetched upstream resource"
        );

        Ok(FetchedPage {
            final_url,
            content_type,
            body,
        })
    }

    async fn read_body(&self, response: &mut reqwest::Response) -> FetchResult<Bytes> {
        let limit = self.max_body_size;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge(limit));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge(limit));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout_duration.as_secs())
        } else {
            FetchError::from(err)
        }
    }
}

fn header_value(value: &str) -> FetchResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| FetchError::Setup(e.to_string()))
}

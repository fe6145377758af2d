use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::types::{TavilySearchRequest, TavilySearchResponse};
use super::{SearchHit, SearchService};
use crate::config::{RequestConfig, TavilyConfig};
use crate::error::{SearchApiError, SearchApiResult};

/// Client for the Tavily search API
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    base_url: String,
    config: TavilyConfig,
    request_config: RequestConfig,
}

impl TavilyClient {
    /// Create a new search client
    pub fn new(config: &TavilyConfig, request_config: &RequestConfig) -> SearchApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(SearchApiError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            request_config: request_config.clone(),
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_request(&self, query: &str, max_results: u32) -> TavilySearchRequest {
        TavilySearchRequest {
            api_key: self.config.api_key.clone(),
            query: query.to_string(),
            search_depth: self.config.search_depth.clone(),
            topic: self.config.topic.clone(),
            max_results,
            include_answer: self.config.include_answer,
            include_images: self.config.include_images,
        }
    }

    /// Execute a single attempt (internal)
    async fn execute_search(&self, request: &TavilySearchRequest) -> SearchApiResult<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchApiError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    SearchApiError::Http(e)
                }
            })?;

        let status = response.status();

        if status.as_u16() == 401 {
            return Err(SearchApiError::InvalidCredentials);
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchApiError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let search_response: TavilySearchResponse =
            response
                .json()
                .await
                .map_err(|e| SearchApiError::MalformedResponse {
                    message: format!("Failed to parse search response: {}", e),
                })?;

        Ok(search_response.results)
    }
}

#[async_trait]
impl SearchService for TavilyClient {
    async fn search(&self, query: &str) -> SearchApiResult<Vec<SearchHit>> {
        let request = self.search_request(query, self.config.max_results);
        let start = Instant::now();

        let mut last_error = None;
        let mut attempt = 0;

        while attempt <= self.request_config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(attempt - 1)),
                );
                warn!(
                    query = %query,
                    retry = attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying search request"
                );
                tokio::time::sleep(delay).await;
            }

            match self.execute_search(&request).await {
                Ok(hits) => {
                    info!(
                        query = %query,
                        hits = hits.len(),
                        latency_ms = start.elapsed().as_millis(),
                        "Search succeeded"
                    );
                    return Ok(hits);
                }
                // Bad credentials never recover on retry.
                Err(SearchApiError::InvalidCredentials) => {
                    return Err(SearchApiError::InvalidCredentials);
                }
                Err(e) if e.is_retryable() => {
                    debug!(query = %query, error = %e, retry = attempt, "Transient search failure");
                    last_error = Some(e);
                    attempt += 1;
                }
                // Any other status aborts this query's attempt chain.
                Err(e) => return Err(e),
            }
        }

        Err(SearchApiError::Exhausted {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries: attempt,
        })
    }

    async fn validate_credentials(&self) -> SearchApiResult<bool> {
        let request = self.search_request("test query", 1);

        match self.execute_search(&request).await {
            Ok(_) => {
                info!("Search API credentials validated");
                Ok(true)
            }
            Err(SearchApiError::InvalidCredentials) => {
                warn!("Search API rejected credentials");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Could not validate search API credentials");
                Ok(false)
            }
        }
    }
}

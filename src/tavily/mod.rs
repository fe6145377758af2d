//! Web search service client and types.
//!
//! Stage two depends only on the [`SearchService`] trait; the real
//! [`TavilyClient`] owns credential handling and the retry policy.

mod client;
mod types;

pub use client::TavilyClient;
pub use types::SearchHit;

use async_trait::async_trait;

use crate::error::SearchApiResult;

/// Web search collaborator consumed by the web searcher agent.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Run one search query and return the raw ranked hits.
    ///
    /// Implementations retry transient failures internally; a returned
    /// error means the query's attempt chain is exhausted.
    async fn search(&self, query: &str) -> SearchApiResult<Vec<SearchHit>>;

    /// Lightweight credential probe run before any real search work.
    async fn validate_credentials(&self) -> SearchApiResult<bool>;
}

use serde::{Deserialize, Serialize};

/// Wire request for the Tavily search endpoint
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TavilySearchRequest {
    pub api_key: String,
    pub query: String,
    pub search_depth: String,
    pub topic: String,
    pub max_results: u32,
    pub include_answer: bool,
    pub include_images: bool,
}

/// Wire response from the Tavily search endpoint
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TavilySearchResponse {
    #[serde(default)]
    pub results: Vec<SearchHit>,
    #[serde(default)]
    pub answer: Option<String>,
}

/// One ranked hit returned by the search service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Page content or extracted summary.
    #[serde(default)]
    pub content: String,
    /// Relevance score when the service provides one.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub published_date: Option<String>,
}

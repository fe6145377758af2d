use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::{extract_json, StageFailure, StageReport, StageResult};
use crate::openai::{CompletionRequest, CompletionService, Message};
use crate::models::{CompetitorInfo, ResearchPlan, SearchResult, SourceType, SNIPPET_MAX_CHARS};
use crate::prompts::{
    extraction_prompt, knowledge_search_prompt, EXTRACTION_SYSTEM_PROMPT,
    KNOWLEDGE_SEARCH_SYSTEM_PROMPT,
};
use crate::tavily::SearchService;

/// How many results feed the competitor extraction call.
const MAX_EXTRACTION_RESULTS: usize = 15;
/// Cap on extracted competitor records.
const MAX_COMPETITORS: usize = 10;

/// Artifact of the web search stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutput {
    /// All collected search results, web and knowledge-base.
    pub results: Vec<SearchResult>,
    /// Competitors extracted from the results.
    pub competitors: Vec<CompetitorInfo>,
    /// Distinct queries executed.
    pub total_searches: usize,
}

/// Agent for the web search stage: executes the plan's searches
/// concurrently and extracts structured competitor records.
pub struct WebSearcherAgent {
    completion: Arc<dyn CompletionService>,
    search: Arc<dyn SearchService>,
    max_concurrent_searches: usize,
}

impl WebSearcherAgent {
    /// Create a new web searcher agent
    pub fn new(
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
        max_concurrent_searches: usize,
    ) -> Self {
        Self {
            completion,
            search,
            max_concurrent_searches: max_concurrent_searches.max(1),
        }
    }

    /// Execute the research plan's searches and extract competitors.
    ///
    /// The only hard failure is a failed credential probe; individual
    /// query failures fall back to knowledge-based search and extraction
    /// failures degrade to an empty competitor list.
    pub async fn execute_research(&self, plan: &ResearchPlan) -> StageResult<SearchOutput> {
        let start = Instant::now();

        match self.search.validate_credentials().await {
            Ok(true) => {}
            Ok(false) => {
                return Err(StageFailure::new(
                    "Search API credential validation failed",
                    start.elapsed(),
                ));
            }
            Err(e) => {
                return Err(StageFailure::new(
                    format!("Search API credential validation failed: {}", e),
                    start.elapsed(),
                ));
            }
        }

        let queries = Self::generate_search_queries(plan, self.max_concurrent_searches);
        info!(queries = queries.len(), "Generated search queries");

        let results = self.run_searches(&queries).await;
        info!(
            searches = queries.len(),
            results = results.len(),
            "Concurrent searches settled"
        );

        let (competitors, advisory) = match self.extract_competitors(&results, plan).await {
            Ok(competitors) => (competitors, None),
            Err(reason) => {
                warn!(reason = %reason, "Competitor extraction failed, continuing without records");
                (
                    Vec::new(),
                    Some(format!("Competitor extraction failed: {}", reason)),
                )
            }
        };

        info!(
            competitors = competitors.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Web research completed"
        );

        Ok(StageReport {
            artifact: SearchOutput {
                results,
                competitors,
                total_searches: queries.len(),
            },
            advisory,
            elapsed: start.elapsed(),
        })
    }

    /// Generate the bounded query set from the plan.
    ///
    /// Emits, in order: priority-area x keyword cross products, direct
    /// keyword list queries, named-competitor profile queries, and one
    /// market-leaders query; then deduplicates preserving first
    /// occurrence and truncates to `limit`.
    pub fn generate_search_queries(plan: &ResearchPlan, limit: usize) -> Vec<String> {
        let mut queries = Vec::new();

        for area in plan.priority_areas.iter().take(4) {
            for keyword in plan.search_keywords.iter().take(3) {
                queries.push(format!("{} {} companies", keyword, area));
            }
        }

        for keyword in plan.search_keywords.iter().take(3) {
            queries.push(format!("{} companies list", keyword));
        }

        for competitor in plan.competitor_names.iter().take(5) {
            queries.push(format!(
                "{} company profile products pricing features",
                competitor
            ));
        }

        if let Some(keyword) = plan.search_keywords.first() {
            queries.push(format!("{} market leaders companies", keyword));
        }

        let mut seen = HashSet::new();
        queries.retain(|query| seen.insert(query.clone()));
        queries.truncate(limit);
        queries
    }

    /// Run all queries concurrently under the semaphore bound.
    ///
    /// Each task collects its own sub-list; merging happens only after
    /// every task has settled.
    async fn run_searches(&self, queries: &[String]) -> Vec<SearchResult> {
        let semaphore = Semaphore::new(self.max_concurrent_searches);

        let mut tasks: FuturesUnordered<_> = queries
            .iter()
            .map(|query| {
                let semaphore = &semaphore;
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return Vec::new();
                    };
                    self.search_single(query).await
                }
            })
            .collect();

        let mut all_results = Vec::new();
        while let Some(results) = tasks.next().await {
            all_results.extend(results);
        }
        all_results
    }

    /// Run one query, falling back to model knowledge when the search
    /// service fails. Failures here never fail the stage.
    async fn search_single(&self, query: &str) -> Vec<SearchResult> {
        match self.search.search(query).await {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| {
                    SearchResult::new(query, hit.title, hit.url, hit.content, SourceType::Web)
                        .with_score(hit.score)
                        .with_published_date(hit.published_date)
                })
                .collect(),
            Err(e) => {
                warn!(query = %query, error = %e, "Search failed, using knowledge fallback");
                self.knowledge_search(query).await
            }
        }
    }

    /// Knowledge-based synthetic search from the completion model.
    async fn knowledge_search(&self, query: &str) -> Vec<SearchResult> {
        let request = CompletionRequest::new(vec![
            Message::system(KNOWLEDGE_SEARCH_SYSTEM_PROMPT),
            Message::user(knowledge_search_prompt(query)),
        ]);

        let completion = match self.completion.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(query = %query, error = %e, "Knowledge fallback call failed");
                return Vec::new();
            }
        };

        let entries: Vec<serde_json::Value> = match extract_json(&completion)
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))
        {
            Ok(entries) => entries,
            Err(reason) => {
                warn!(query = %query, reason = %reason, "Knowledge fallback returned no usable JSON");
                return Vec::new();
            }
        };

        entries
            .iter()
            .map(|entry| {
                let field = |key: &str| {
                    entry
                        .get(key)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string()
                };

                let title = entry
                    .get("title")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Knowledge Result")
                    .to_string();

                let mut result = SearchResult::new(
                    query,
                    title,
                    field("url"),
                    field("content"),
                    SourceType::KnowledgeBase,
                );
                if let Some(snippet) = entry.get("snippet").and_then(|v| v.as_str()) {
                    result.snippet = snippet.chars().take(SNIPPET_MAX_CHARS).collect();
                }
                result
            })
            .collect()
    }

    /// Extract structured competitor records from the collected results.
    async fn extract_competitors(
        &self,
        results: &[SearchResult],
        plan: &ResearchPlan,
    ) -> Result<Vec<CompetitorInfo>, String> {
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let combined_content = results
            .iter()
            .take(MAX_EXTRACTION_RESULTS)
            .map(|result| {
                format!(
                    "Title: {}\nURL: {}\nContent: {}\n",
                    result.title, result.url, result.snippet
                )
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        let request = CompletionRequest::new(vec![
            Message::system(EXTRACTION_SYSTEM_PROMPT),
            Message::user(extraction_prompt(&plan.objective, &combined_content)),
        ])
        .with_json_output();

        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;

        let value: serde_json::Value = extract_json(&completion)
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))?;

        let records = competitor_records(&value);
        debug!(records = records.len(), "Extraction returned competitor records");

        Ok(records
            .iter()
            .take(MAX_COMPETITORS)
            .map(|record| CompetitorInfo::from_value(record))
            .collect())
    }
}

/// Locate the competitor array in the extraction response: either the
/// `competitors` key, the top-level array, or the first array-valued
/// field of the object.
fn competitor_records(value: &serde_json::Value) -> Vec<serde_json::Value> {
    if let Some(array) = value.get("competitors").and_then(|v| v.as_array()) {
        return array.clone();
    }
    if let Some(array) = value.as_array() {
        return array.clone();
    }
    if let Some(object) = value.as_object() {
        for field in object.values() {
            if let Some(array) = field.as_array() {
                return array.clone();
            }
        }
    }
    Vec::new()
}

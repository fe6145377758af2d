//! Stage agent implementations.
//!
//! The pipeline has four agents, each converting typed inputs into one
//! typed artifact:
//! - [`PlannerAgent`]: research query → strategic plan
//! - [`WebSearcherAgent`]: plan → search results + extracted competitors
//! - [`GapAnalyzerAgent`]: plan + findings → gap analysis
//! - [`CuratorAgent`]: all prior artifacts → insights + final report
//!
//! Agents are stateless between calls, receive their collaborator clients
//! by injection, and never let an error escape their public operation:
//! every outcome is a [`StageResult`].

mod curator;
mod gap_analyzer;
mod planner;
mod web_searcher;

pub use curator::CuratorAgent;
pub use gap_analyzer::{data_quality_score, GapAnalyzerAgent};
pub use planner::PlannerAgent;
pub use web_searcher::{SearchOutput, WebSearcherAgent};

use std::time::Duration;

/// Successful stage outcome carrying the artifact and timing.
#[derive(Debug, Clone)]
pub struct StageReport<T> {
    /// The typed artifact the stage produced.
    pub artifact: T,
    /// Note attached when the stage completed through a fallback path.
    pub advisory: Option<String>,
    /// Wall-clock time the stage took.
    pub elapsed: Duration,
}

impl<T> StageReport<T> {
    /// Clean success with no advisory.
    pub fn ok(artifact: T, elapsed: Duration) -> Self {
        Self {
            artifact,
            advisory: None,
            elapsed,
        }
    }

    /// Success produced by a documented fallback.
    pub fn degraded(artifact: T, advisory: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            artifact,
            advisory: Some(advisory.into()),
            elapsed,
        }
    }
}

/// Hard stage failure. Halts the remaining pipeline.
#[derive(Debug, Clone)]
pub struct StageFailure {
    /// Human-readable cause.
    pub message: String,
    /// Wall-clock time spent before failing.
    pub elapsed: Duration,
}

impl StageFailure {
    /// Create a failure with a cause.
    pub fn new(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            message: message.into(),
            elapsed,
        }
    }
}

/// Outcome of one stage execution.
pub type StageResult<T> = Result<StageReport<T>, StageFailure>;

/// Extract the JSON portion of a model completion, handling markdown
/// code fences.
///
/// Attempts, in order: raw JSON, a ```json fenced block, a bare ```
/// fenced block. Anything else is an error; callers then take their
/// documented fallback rather than scraping the text further.
pub(crate) fn extract_json(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json fence but no content".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` fence but no content".to_string());
    }

    Err(format!(
        "No JSON found in completion. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

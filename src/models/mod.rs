//! Domain artifacts and workflow tracking records.
//!
//! Every stage of the pipeline consumes and produces the typed artifacts in
//! this module; whatever shape an upstream model response had, it is
//! normalized into one of these before crossing a stage boundary.


use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Maximum snippet length carried on a search result.
pub const SNIPPET_MAX_CHARS: usize = 500;

/// Research depth levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDepth {
    /// 3-5 main competitors, essential information only.
    Basic,
    /// 5-8 competitors with detailed information.
    #[default]
    Standard,
    /// 8-12 competitors with deep market analysis.
    Comprehensive,
}

impl std::fmt::Display for ResearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchDepth::Basic => write!(f, "basic"),
            ResearchDepth::Standard => write!(f, "standard"),
            ResearchDepth::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

impl std::str::FromStr for ResearchDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(ResearchDepth::Basic),
            "standard" => Ok(ResearchDepth::Standard),
            "comprehensive" => Ok(ResearchDepth::Comprehensive),
            _ => Err(format!("Unknown research depth: {}", s)),
        }
    }
}

/// Status of a workflow or one of its steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with a hard failure.
    Failed,
}

impl std::fmt::Display for ResearchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchStatus::Pending => write!(f, "pending"),
            ResearchStatus::InProgress => write!(f, "in_progress"),
            ResearchStatus::Completed => write!(f, "completed"),
            ResearchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Input query for competitive research.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// The research question, trimmed, at least 3 characters.
    pub text: String,
    /// Research depth level.
    pub depth: ResearchDepth,
    /// Specific areas to focus on.
    pub focus_areas: Vec<String>,
    /// Competitor names to exclude from the research.
    pub exclude_competitors: Vec<String>,
    /// Maximum results requested per search.
    pub max_results: u32,
}

impl ResearchQuery {
    /// Create a validated query. The text is trimmed and must be at least
    /// 3 characters long afterwards.
    pub fn new(text: impl Into<String>) -> Result<Self, AppError> {
        let text = text.into().trim().to_string();
        if text.chars().count() < 3 {
            return Err(AppError::InvalidQuery {
                message: "Query must be at least 3 characters long".to_string(),
            });
        }

        Ok(Self {
            text,
            depth: ResearchDepth::default(),
            focus_areas: Vec::new(),
            exclude_competitors: Vec::new(),
            max_results: 10,
        })
    }

    /// Set the research depth
    pub fn with_depth(mut self, depth: ResearchDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Set the focus areas
    pub fn with_focus_areas(mut self, focus_areas: Vec<String>) -> Self {
        self.focus_areas = focus_areas;
        self
    }

    /// Set competitors to exclude
    pub fn with_excluded_competitors(mut self, exclude: Vec<String>) -> Self {
        self.exclude_competitors = exclude;
        self
    }

    /// Set the per-search result cap
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }
}

/// Strategic research plan created by the planning stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Primary research objective.
    pub objective: String,
    /// Key questions to answer.
    pub research_questions: Vec<String>,
    /// Priority areas to investigate.
    pub priority_areas: Vec<String>,
    /// Keywords for web searches.
    pub search_keywords: Vec<String>,
    /// Specific competitors to research; may be empty.
    pub competitor_names: Vec<String>,
    /// Estimated number of searches, clamped to [5, 25].
    pub estimated_searches: u32,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
}

impl ResearchPlan {
    /// Clamp a raw search estimate into the supported range.
    pub fn clamp_estimated_searches(raw: u32) -> u32 {
        raw.clamp(5, 25)
    }
}

/// Where a search result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Live web search hit.
    Web,
    /// Synthetic result from model knowledge when web search was unavailable.
    KnowledgeBase,
}

/// Individual search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query string that produced this result.
    pub query: String,
    /// Result title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Excerpt capped at [`SNIPPET_MAX_CHARS`].
    pub snippet: String,
    /// Full content.
    pub content: String,
    /// Relevance score when available.
    pub score: Option<f64>,
    /// Publication date when available.
    pub published_date: Option<String>,
    /// Result provenance.
    pub source_type: SourceType,
}

impl SearchResult {
    /// Create a result, deriving the capped snippet from the content.
    pub fn new(
        query: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        let content = content.into();
        Self {
            query: query.into(),
            title: title.into(),
            url: url.into(),
            snippet: content.chars().take(SNIPPET_MAX_CHARS).collect(),
            content,
            score: None,
            published_date: None,
            source_type,
        }
    }

    /// Attach a relevance score
    pub fn with_score(mut self, score: Option<f64>) -> Self {
        self.score = score;
        self
    }

    /// Attach a publication date
    pub fn with_published_date(mut self, published_date: Option<String>) -> Self {
        self.published_date = published_date;
        self
    }
}

/// Fallback display name when extraction omits a competitor's name.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Structured information about one competitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitorInfo {
    /// Company or product name.
    pub name: String,
    /// Official website URL.
    pub website: Option<String>,
    /// Company description.
    pub description: Option<String>,
    /// Products and services.
    pub products: Vec<String>,
    /// Pricing by plan name.
    pub pricing_info: BTreeMap<String, String>,
    /// Key features and capabilities.
    pub key_features: Vec<String>,
    /// Target market or audience.
    pub target_market: Option<String>,
    /// Market positioning.
    pub market_position: Option<String>,
    /// Recent news or updates.
    pub recent_news: Vec<String>,
    /// Funding information, free-form.
    pub funding_info: Option<BTreeMap<String, String>>,
    /// Employee count range.
    pub employee_count: Option<String>,
    /// Year founded.
    pub founded_year: Option<String>,
}

impl CompetitorInfo {
    /// Create a competitor with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Normalize whatever shape the extraction model returned into a
    /// competitor record. Missing or mistyped fields degrade to empty
    /// values; a missing name becomes [`UNKNOWN_COMPANY`].
    pub fn from_value(value: &serde_json::Value) -> Self {
        Self {
            name: value
                .get("name")
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(UNKNOWN_COMPANY)
                .to_string(),
            website: string_field(value, "website"),
            description: string_field(value, "description"),
            products: string_list(value, "products"),
            pricing_info: string_map(value, "pricing_info"),
            key_features: string_list(value, "key_features"),
            target_market: string_field(value, "target_market"),
            market_position: string_field(value, "market_position"),
            recent_news: string_list(value, "recent_news"),
            funding_info: value
                .get("funding_info")
                .filter(|v| v.is_object())
                .map(|_| string_map(value, "funding_info")),
            employee_count: string_field(value, "employee_count"),
            founded_year: value
                .get("founded_year")
                .and_then(scalar_to_string)
                .filter(|s| !s.is_empty()),
        }
    }

    /// Fraction of the fixed 7-field checklist that is populated:
    /// website, description, products, pricing_info, key_features,
    /// target_market, market_position.
    pub fn completeness_score(&self) -> f64 {
        let filled = [
            self.website.is_some(),
            self.description.is_some(),
            !self.products.is_empty(),
            !self.pricing_info.is_empty(),
            !self.key_features.is_empty(),
            self.target_market.is_some(),
            self.market_position.is_some(),
        ]
        .iter()
        .filter(|&&present| present)
        .count();

        filled as f64 / 7.0
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_field(value: &serde_json::Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn string_list(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(scalar_to_string).collect())
        .unwrap_or_default()
}

fn string_map(value: &serde_json::Value, key: &str) -> BTreeMap<String, String> {
    value
        .get(key)
        .and_then(|v| v.as_object())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| {
                    scalar_to_string(v)
                        .or_else(|| Some(v.to_string()))
                        .map(|s| (k.clone(), s))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Analysis of research gaps and missing information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapAnalysis {
    /// Critical missing information.
    pub missing_information: Vec<String>,
    /// Areas with incomplete data, with descriptions of what is missing.
    pub incomplete_areas: BTreeMap<String, Vec<String>>,
    /// Confidence by priority area, each in [0, 1].
    pub confidence_scores: BTreeMap<String, f64>,
    /// Suggested follow-up queries.
    pub suggested_queries: Vec<String>,
    /// Highest priority gaps to fill.
    pub priority_gaps: Vec<String>,
    /// Overall data quality in [0, 1], always computed deterministically
    /// from the competitor data, never taken from a model response.
    pub data_quality_score: f64,
}

/// Strategic insights and recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitiveInsights {
    /// Identified market opportunities.
    pub market_opportunities: Vec<String>,
    /// Potential competitive advantages.
    pub competitive_advantages: Vec<String>,
    /// Competitive threats and risks.
    pub threats_and_risks: Vec<String>,
    /// Strategic recommendations.
    pub strategic_recommendations: Vec<String>,
    /// Market positioning suggestions.
    pub positioning_suggestions: Vec<String>,
    /// Feature gaps in the market.
    pub feature_gaps: Vec<String>,
    /// Pricing strategy insights.
    pub pricing_insights: Vec<String>,
}

/// Complete research report with all findings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// Original research query.
    pub query: ResearchQuery,
    /// Research plan executed.
    pub plan: ResearchPlan,
    /// Competitor information found.
    pub competitors: Vec<CompetitorInfo>,
    /// Gap analysis results.
    pub gap_analysis: GapAnalysis,
    /// Strategic insights.
    pub insights: CompetitiveInsights,
    /// Executive summary text.
    pub executive_summary: String,
    /// Research methodology description.
    pub methodology: String,
    /// Data sources consulted.
    pub data_sources: Vec<String>,
    /// Research limitations.
    pub limitations: Vec<String>,
    /// Recommended next steps.
    pub next_steps: Vec<String>,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Distinct searches performed.
    pub total_searches_performed: usize,
    /// Total wall-clock research duration in seconds.
    pub research_duration_secs: f64,
}

/// The four fixed pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Planning,
    WebSearch,
    GapAnalysis,
    ReportGeneration,
}

impl WorkflowStage {
    /// All stages in execution order.
    pub const ALL: [WorkflowStage; 4] = [
        WorkflowStage::Planning,
        WorkflowStage::WebSearch,
        WorkflowStage::GapAnalysis,
        WorkflowStage::ReportGeneration,
    ];

    /// Stable step name used in traces and partial-results maps.
    pub fn step_name(&self) -> &'static str {
        match self {
            WorkflowStage::Planning => "planning",
            WorkflowStage::WebSearch => "web_search",
            WorkflowStage::GapAnalysis => "gap_analysis",
            WorkflowStage::ReportGeneration => "report_generation",
        }
    }

    /// Name of the agent that owns this stage.
    pub fn agent_name(&self) -> &'static str {
        match self {
            WorkflowStage::Planning => "PlannerAgent",
            WorkflowStage::WebSearch => "WebSearcherAgent",
            WorkflowStage::GapAnalysis => "GapAnalyzerAgent",
            WorkflowStage::ReportGeneration => "CuratorAgent",
        }
    }
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.step_name())
    }
}

/// Tracking record for one workflow step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Which pipeline stage this step runs.
    pub stage: WorkflowStage,
    /// Agent responsible for the step.
    pub agent_name: String,
    /// Current step status.
    pub status: ResearchStatus,
    /// When execution began.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Failure cause, if the step failed.
    pub error_message: Option<String>,
    /// Advisory note recorded when the stage completed via a fallback path.
    pub advisory: Option<String>,
    /// Opaque output payload, retained only for diagnostics and
    /// partial-failure recovery. Never read for control flow.
    pub output: Option<serde_json::Value>,
}

impl WorkflowStep {
    /// Create a pending step for a stage.
    pub fn new(stage: WorkflowStage) -> Self {
        Self {
            stage,
            agent_name: stage.agent_name().to_string(),
            status: ResearchStatus::Pending,
            started_at: None,
            completed_at: None,
            error_message: None,
            advisory: None,
            output: None,
        }
    }

    /// Mark the step in progress.
    pub fn begin(&mut self) {
        self.status = ResearchStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    /// Mark the step completed with its output payload.
    pub fn complete(&mut self, output: serde_json::Value, advisory: Option<String>) {
        self.status = ResearchStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.advisory = advisory;
        self.output = Some(output);
    }

    /// Mark the step failed with a cause.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = ResearchStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error_message = Some(message.into());
    }
}

/// Run-level workflow state machine. Owned and mutated exclusively by the
/// orchestrator for the duration of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecution {
    /// Unique run identifier.
    pub id: Uuid,
    /// Original research query.
    pub query: ResearchQuery,
    /// The four pipeline steps in execution order.
    pub steps: Vec<WorkflowStep>,
    /// Index of the step currently (or last) active.
    pub current_step: usize,
    /// Overall workflow status.
    pub status: ResearchStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Total run duration in seconds.
    pub total_duration_secs: Option<f64>,
    /// Final report on full success.
    pub final_report: Option<ResearchReport>,
}

impl WorkflowExecution {
    /// Create a fresh run with all steps pending.
    pub fn new(query: ResearchQuery) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            steps: WorkflowStage::ALL.iter().map(|s| WorkflowStep::new(*s)).collect(),
            current_step: 0,
            status: ResearchStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            total_duration_secs: None,
            final_report: None,
        }
    }

    /// Mutable access to the step for a stage.
    pub fn step_mut(&mut self, stage: WorkflowStage) -> &mut WorkflowStep {
        let index = WorkflowStage::ALL
            .iter()
            .position(|s| *s == stage)
            .unwrap_or(0);
        self.current_step = index;
        &mut self.steps[index]
    }

    /// Collect the output payloads of every completed step, keyed by step
    /// name. This is what the caller receives when a later stage fails.
    pub fn partial_results(&self) -> BTreeMap<String, serde_json::Value> {
        self.steps
            .iter()
            .filter(|step| step.status == ResearchStatus::Completed)
            .filter_map(|step| {
                step.output
                    .as_ref()
                    .map(|output| (step.stage.step_name().to_string(), output.clone()))
            })
            .collect()
    }

    /// Transition the run to a terminal state, recording duration.
    pub fn finish(&mut self, status: ResearchStatus) {
        let now = Utc::now();
        self.status = status;
        self.completed_at = Some(now);
        self.total_duration_secs =
            Some((now - self.started_at).num_milliseconds() as f64 / 1000.0);
    }
}

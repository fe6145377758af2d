//! Workflow orchestration for the four-stage research pipeline.
//!
//! The orchestrator owns the per-run [`WorkflowExecution`], drives the
//! stages strictly in order, and packages whatever succeeded into a
//! uniform [`RunOutcome`] envelope. A hard stage failure halts the
//! pipeline; every already-completed step's output is preserved and
//! returned, so the caller is never left with only an error string when
//! earlier useful work exists.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::agents::{
    CuratorAgent, GapAnalyzerAgent, PlannerAgent, StageFailure, WebSearcherAgent,
};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::{
    ResearchQuery, ResearchReport, ResearchStatus, WorkflowExecution, WorkflowStage,
};
use crate::openai::{CompletionService, OpenAiClient};
use crate::report;
use crate::tavily::{SearchService, TavilyClient};

/// Outcome envelope for one research run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Full pipeline success.
    Completed(Box<CompletedRun>),
    /// Pipeline halted at a stage; partial results preserved.
    Failed(Box<FailedRun>),
}

/// Payload of a fully successful run.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    /// Run identifier.
    pub workflow_id: Uuid,
    /// The assembled report.
    pub report: ResearchReport,
    /// Rendered textual form of the report.
    pub markdown_report: String,
    /// Full step-by-step trace.
    pub workflow: WorkflowExecution,
    /// Summary metrics.
    pub metrics: RunMetrics,
}

/// Payload of a halted run.
#[derive(Debug, Clone, Serialize)]
pub struct FailedRun {
    /// Run identifier.
    pub workflow_id: Uuid,
    /// Stage at which the pipeline halted.
    pub failed_stage: WorkflowStage,
    /// Failure cause.
    pub error_message: String,
    /// Full step-by-step trace.
    pub workflow: WorkflowExecution,
    /// Output payloads of every step that completed before the failure,
    /// keyed by step name, verbatim.
    pub partial_results: BTreeMap<String, serde_json::Value>,
}

/// Summary metrics for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunMetrics {
    /// Total wall-clock duration in seconds.
    pub duration_secs: f64,
    /// Competitors found.
    pub competitors_found: usize,
    /// Distinct searches performed.
    pub searches_performed: usize,
    /// Deterministic data quality score.
    pub data_quality_score: f64,
}

impl RunOutcome {
    /// Whether the run completed fully.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    /// The step-by-step trace, regardless of outcome.
    pub fn workflow(&self) -> &WorkflowExecution {
        match self {
            RunOutcome::Completed(run) => &run.workflow,
            RunOutcome::Failed(run) => &run.workflow,
        }
    }
}

/// Per-component result of the system validation probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Pass,
    Warn,
    Fail,
}

/// Overall result of the system validation probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// All components passed.
    Operational,
    /// At least one component warned.
    Degraded,
    /// At least one component failed.
    Error,
}

/// One component entry in the health report.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub details: String,
}

/// Structured health report from [`Orchestrator::validate_system`].
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    /// Derived overall status.
    pub overall: HealthStatus,
    /// Per-component status keyed by component name.
    pub components: BTreeMap<String, ComponentHealth>,
    /// Actionable follow-ups for failing components.
    pub recommendations: Vec<String>,
}

/// Coordinates the four stage agents through one research workflow.
pub struct Orchestrator {
    planner: PlannerAgent,
    web_searcher: WebSearcherAgent,
    gap_analyzer: GapAnalyzerAgent,
    curator: CuratorAgent,
    search: Arc<dyn SearchService>,
    include_citations: bool,
}

impl Orchestrator {
    /// Build an orchestrator with real service clients from configuration.
    ///
    /// Fails fast when a client cannot be constructed; missing credentials
    /// are already rejected by [`Config::from_env`].
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let completion: Arc<dyn CompletionService> =
            Arc::new(OpenAiClient::new(&config.openai, &config.request)?);
        let search: Arc<dyn SearchService> =
            Arc::new(TavilyClient::new(&config.tavily, &config.request)?);

        Ok(Self::with_services(completion, search, config))
    }

    /// Build an orchestrator with injected services (used by tests).
    pub fn with_services(
        completion: Arc<dyn CompletionService>,
        search: Arc<dyn SearchService>,
        config: &Config,
    ) -> Self {
        Self {
            planner: PlannerAgent::new(Arc::clone(&completion)),
            web_searcher: WebSearcherAgent::new(
                Arc::clone(&completion),
                Arc::clone(&search),
                config.request.max_concurrent_searches,
            ),
            gap_analyzer: GapAnalyzerAgent::new(Arc::clone(&completion)),
            curator: CuratorAgent::new(completion),
            search,
            include_citations: config.output.include_citations,
        }
    }

    /// Execute the complete research workflow for a query.
    pub async fn execute_research(&self, query: ResearchQuery) -> RunOutcome {
        let run_start = Instant::now();
        let mut workflow = WorkflowExecution::new(query.clone());

        info!(
            workflow_id = %workflow.id,
            query = %preview(&query.text),
            "Starting research workflow"
        );

        // Step 1: planning
        workflow.step_mut(WorkflowStage::Planning).begin();
        let plan = match self.planner.create_plan(&query).await {
            Ok(outcome) => {
                let payload =
                    serde_json::json!({ "research_plan": payload_json(&outcome.artifact) });
                workflow
                    .step_mut(WorkflowStage::Planning)
                    .complete(payload, outcome.advisory);
                outcome.artifact
            }
            Err(failure) => {
                return self.halt(workflow, WorkflowStage::Planning, failure);
            }
        };
        info!(objective = %plan.objective, "Research plan created");

        // Step 2: web search
        workflow.step_mut(WorkflowStage::WebSearch).begin();
        let search_output = match self.web_searcher.execute_research(&plan).await {
            Ok(outcome) => {
                workflow
                    .step_mut(WorkflowStage::WebSearch)
                    .complete(payload_json(&outcome.artifact), outcome.advisory);
                outcome.artifact
            }
            Err(failure) => {
                return self.halt(workflow, WorkflowStage::WebSearch, failure);
            }
        };
        info!(
            competitors = search_output.competitors.len(),
            results = search_output.results.len(),
            "Web search completed"
        );

        // Step 3: gap analysis
        workflow.step_mut(WorkflowStage::GapAnalysis).begin();
        let gap_analysis = match self
            .gap_analyzer
            .analyze(&plan, &search_output.competitors, &search_output.results)
            .await
        {
            Ok(outcome) => {
                let payload =
                    serde_json::json!({ "gap_analysis": payload_json(&outcome.artifact) });
                workflow
                    .step_mut(WorkflowStage::GapAnalysis)
                    .complete(payload, outcome.advisory);
                outcome.artifact
            }
            Err(failure) => {
                return self.halt(workflow, WorkflowStage::GapAnalysis, failure);
            }
        };
        info!(
            quality_score = gap_analysis.data_quality_score,
            "Gap analysis completed"
        );

        // Step 4: insights and report
        workflow.step_mut(WorkflowStage::ReportGeneration).begin();
        let insights_outcome = match self
            .curator
            .generate_insights(&search_output.competitors, &plan, &gap_analysis)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                return self.halt(workflow, WorkflowStage::ReportGeneration, failure);
            }
        };

        let research_duration_secs = run_start.elapsed().as_secs_f64();
        let report_outcome = match self
            .curator
            .create_report(
                &query,
                &plan,
                &search_output.competitors,
                &gap_analysis,
                &insights_outcome.artifact,
                &search_output.results,
                research_duration_secs,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                return self.halt(workflow, WorkflowStage::ReportGeneration, failure);
            }
        };

        let final_report = report_outcome.artifact;
        let markdown_report = report::render_markdown(&final_report, self.include_citations);

        let advisory = merge_advisories(insights_outcome.advisory, report_outcome.advisory);
        let payload = serde_json::json!({ "research_report": payload_json(&final_report) });
        workflow
            .step_mut(WorkflowStage::ReportGeneration)
            .complete(payload, advisory);

        let metrics = RunMetrics {
            duration_secs: research_duration_secs,
            competitors_found: final_report.competitors.len(),
            searches_performed: final_report.total_searches_performed,
            data_quality_score: final_report.gap_analysis.data_quality_score,
        };

        workflow.final_report = Some(final_report.clone());
        workflow.finish(ResearchStatus::Completed);

        info!(
            workflow_id = %workflow.id,
            duration_secs = metrics.duration_secs,
            competitors = metrics.competitors_found,
            "Research workflow completed"
        );

        RunOutcome::Completed(Box::new(CompletedRun {
            workflow_id: workflow.id,
            report: final_report,
            markdown_report,
            workflow,
            metrics,
        }))
    }

    /// Validate each component independently of any in-flight run.
    pub async fn validate_system(&self) -> SystemHealth {
        info!("Validating system components");

        let mut components = BTreeMap::new();
        let mut recommendations = Vec::new();

        components.insert(
            "configuration".to_string(),
            ComponentHealth {
                status: ComponentStatus::Pass,
                details: "Configuration and API keys loaded".to_string(),
            },
        );

        // A trivial plan creation exercises the completion service. The
        // fallback path still completes, so an advisory means degraded.
        match ResearchQuery::new("test market analysis") {
            Ok(probe_query) => match self.planner.create_plan(&probe_query).await {
                Ok(outcome) if outcome.advisory.is_none() => {
                    components.insert(
                        "planner_agent".to_string(),
                        ComponentHealth {
                            status: ComponentStatus::Pass,
                            details: "Planning agent operational".to_string(),
                        },
                    );
                }
                Ok(outcome) => {
                    components.insert(
                        "planner_agent".to_string(),
                        ComponentHealth {
                            status: ComponentStatus::Warn,
                            details: outcome
                                .advisory
                                .unwrap_or_else(|| "Planning agent degraded".to_string()),
                        },
                    );
                    recommendations.push("Check your OPENAI_API_KEY".to_string());
                }
                Err(failure) => {
                    components.insert(
                        "planner_agent".to_string(),
                        ComponentHealth {
                            status: ComponentStatus::Fail,
                            details: failure.message,
                        },
                    );
                }
            },
            Err(e) => {
                components.insert(
                    "planner_agent".to_string(),
                    ComponentHealth {
                        status: ComponentStatus::Fail,
                        details: e.to_string(),
                    },
                );
            }
        }

        match self.search.validate_credentials().await {
            Ok(true) => {
                components.insert(
                    "web_searcher_agent".to_string(),
                    ComponentHealth {
                        status: ComponentStatus::Pass,
                        details: "Search API credentials valid".to_string(),
                    },
                );
            }
            Ok(false) => {
                components.insert(
                    "web_searcher_agent".to_string(),
                    ComponentHealth {
                        status: ComponentStatus::Fail,
                        details: "Search API credential validation failed".to_string(),
                    },
                );
                recommendations.push("Check your TAVILY_API_KEY".to_string());
            }
            Err(e) => {
                components.insert(
                    "web_searcher_agent".to_string(),
                    ComponentHealth {
                        status: ComponentStatus::Fail,
                        details: format!("Search API validation error: {}", e),
                    },
                );
                recommendations.push("Check your TAVILY_API_KEY".to_string());
            }
        }

        components.insert(
            "gap_analyzer_agent".to_string(),
            ComponentHealth {
                status: ComponentStatus::Pass,
                details: "Gap analyzer agent ready".to_string(),
            },
        );
        components.insert(
            "response_curator_agent".to_string(),
            ComponentHealth {
                status: ComponentStatus::Pass,
                details: "Curator agent ready".to_string(),
            },
        );

        let overall = overall_status(&components);
        info!(overall = ?overall, "System validation completed");

        SystemHealth {
            overall,
            components,
            recommendations,
        }
    }

    /// Halt the workflow at a failed stage and package the envelope.
    fn halt(
        &self,
        mut workflow: WorkflowExecution,
        stage: WorkflowStage,
        failure: StageFailure,
    ) -> RunOutcome {
        error!(
            workflow_id = %workflow.id,
            stage = %stage,
            error = %failure.message,
            "Research workflow failed"
        );

        workflow.step_mut(stage).fail(&failure.message);
        workflow.finish(ResearchStatus::Failed);

        let partial_results = workflow.partial_results();

        RunOutcome::Failed(Box::new(FailedRun {
            workflow_id: workflow.id,
            failed_stage: stage,
            error_message: failure.message,
            workflow,
            partial_results,
        }))
    }
}

fn overall_status(components: &BTreeMap<String, ComponentHealth>) -> HealthStatus {
    if components
        .values()
        .any(|c| c.status == ComponentStatus::Fail)
    {
        HealthStatus::Error
    } else if components
        .values()
        .any(|c| c.status == ComponentStatus::Warn)
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Operational
    }
}

fn merge_advisories(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(a), Some(b)) => Some(format!("{}; {}", a, b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Serialize a payload for the step trace. Serialization problems are
/// recorded in the payload instead of failing the run.
fn payload_json<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize step output payload");
        serde_json::json!({ "serialization_error": e.to_string() })
    })
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

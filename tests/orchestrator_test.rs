//! End-to-end workflow tests with deterministic service doubles.
//!
//! The completion double dispatches on the system prompt of each request,
//! so every stage gets a scripted response without any network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use serde_json::json;

use competitive_research_agents::agents::WebSearcherAgent;
use competitive_research_agents::config::{
    Config, LogFormat, LoggingConfig, OpenAiConfig, OutputConfig, RequestConfig, TavilyConfig,
};
use competitive_research_agents::error::{
    CompletionError, CompletionResult, SearchApiResult,
};
use competitive_research_agents::models::{ResearchQuery, ResearchStatus, WorkflowStage};
use competitive_research_agents::openai::{CompletionRequest, CompletionService};
use competitive_research_agents::orchestrator::{HealthStatus, Orchestrator, RunOutcome};
use competitive_research_agents::prompts;
use competitive_research_agents::tavily::{SearchHit, SearchService};

fn test_config(max_concurrent_searches: usize) -> Config {
    Config {
        openai: OpenAiConfig {
            api_key: "test-openai-key".to_string(),
            base_url: "http://localhost:0".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
        },
        tavily: TavilyConfig {
            api_key: "test-tavily-key".to_string(),
            base_url: "http://localhost:0".to_string(),
            search_depth: "advanced".to_string(),
            topic: "general".to_string(),
            max_results: 10,
            include_answer: true,
            include_images: false,
        },
        request: RequestConfig {
            timeout_ms: 5000,
            max_retries: 0,
            retry_delay_ms: 10,
            max_concurrent_searches,
        },
        output: OutputConfig {
            include_citations: true,
            save_raw_data: false,
            reports_dir: std::env::temp_dir(),
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        },
    }
}

/// Completion double scripted per stage via the system prompt.
struct ScriptedCompletion;

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> CompletionResult<String> {
        let system = request
            .messages
            .first()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        if system == prompts::PLANNER_SYSTEM_PROMPT {
            return Ok(json!({
                "objective": "Identify AI chatbot competitors",
                "research_questions": ["Who are the leaders?", "How do they price?"],
                "priority_areas": ["pricing", "features"],
                "search_keywords": ["chatbot"],
                "competitor_names": ["Acme"]
            })
            .to_string());
        }

        if system == prompts::EXTRACTION_SYSTEM_PROMPT {
            return Ok(json!({
                "competitors": [
                    {
                        "name": "Acme",
                        "website": "https://acme.io",
                        "description": "Enterprise chatbot platform",
                        "products": ["Acme Bot", "Acme Voice"],
                        "pricing_info": {"Pro": "$99/mo"},
                        "key_features": ["API", "SSO", "Analytics"],
                        "target_market": "Enterprises",
                        "market_position": "Leader"
                    },
                    {
                        "name": "Mystery Co",
                        "description": "A smaller player"
                    }
                ]
            })
            .to_string());
        }

        if system == prompts::GAP_ANALYSIS_SYSTEM_PROMPT {
            return Ok(json!({
                "missing_information": ["Funding data"],
                "incomplete_areas": {"pricing": ["No enterprise tiers"]},
                "confidence_scores": {"pricing": 0.7, "features": 0.8},
                "suggested_queries": ["chatbot enterprise pricing"],
                "priority_gaps": ["Funding data"]
            })
            .to_string());
        }

        if system == prompts::INSIGHTS_SYSTEM_PROMPT {
            return Ok(json!({
                "market_opportunities": ["SMB segment underserved"],
                "competitive_advantages": ["Faster onboarding"],
                "threats_and_risks": ["Incumbent bundling"],
                "strategic_recommendations": ["Target SMBs first"],
                "positioning_suggestions": ["Ease of use"],
                "feature_gaps": ["Offline mode"],
                "pricing_insights": ["Per-seat dominates"]
            })
            .to_string());
        }

        if system == prompts::EXECUTIVE_SUMMARY_SYSTEM_PROMPT {
            return Ok("The chatbot market is led by Acme with room in the SMB segment.".to_string());
        }

        if system == prompts::KNOWLEDGE_SEARCH_SYSTEM_PROMPT {
            return Ok(json!([
                {
                    "title": "Acme - Chatbots",
                    "url": "https://acme.io",
                    "snippet": "Acme builds chatbots",
                    "content": "Acme builds enterprise chatbots."
                }
            ])
            .to_string());
        }

        Err(CompletionError::Api {
            status: 500,
            message: format!("unscripted prompt: {}", system),
        })
    }
}

/// Completion double that always fails, forcing every stage fallback.
struct FailingCompletion;

#[async_trait]
impl CompletionService for FailingCompletion {
    async fn complete(&self, _request: CompletionRequest) -> CompletionResult<String> {
        Err(CompletionError::Api {
            status: 503,
            message: "completion service down".to_string(),
        })
    }
}

/// Search double returning two fixed hits per query.
struct StubSearch;

#[async_trait]
impl SearchService for StubSearch {
    async fn search(&self, query: &str) -> SearchApiResult<Vec<SearchHit>> {
        Ok(vec![
            SearchHit {
                title: format!("{} - result", query),
                url: "https://acme.io/pricing".to_string(),
                content: format!("Details about {} and pricing plans.", query),
                score: Some(0.9),
                published_date: None,
            },
            SearchHit {
                title: "Industry overview".to_string(),
                url: "https://news.example.com/chatbots".to_string(),
                content: "Feature comparison across chatbot vendors.".to_string(),
                score: None,
                published_date: Some("2024-05-01".to_string()),
            },
        ])
    }

    async fn validate_credentials(&self) -> SearchApiResult<bool> {
        Ok(true)
    }
}

mock! {
    SearchDouble {}

    #[async_trait]
    impl SearchService for SearchDouble {
        async fn search(&self, query: &str) -> SearchApiResult<Vec<SearchHit>>;
        async fn validate_credentials(&self) -> SearchApiResult<bool>;
    }
}

#[tokio::test]
async fn test_end_to_end_success() {
    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(ScriptedCompletion), Arc::new(StubSearch), &config);

    let query = ResearchQuery::new("AI chatbot companies").unwrap();
    let outcome = orchestrator.execute_research(query).await;

    let run = match outcome {
        RunOutcome::Completed(run) => run,
        RunOutcome::Failed(run) => panic!("workflow failed: {}", run.error_message),
    };

    assert_eq!(run.report.competitors.len(), 2);
    assert_eq!(run.report.competitors[0].name, "Acme");
    assert!(!run.report.executive_summary.is_empty());

    // completeness mean (1 + 1/7)/2 * 0.4 + coverage (2/3) * 0.3 +
    // depth mean (1 + 0)/2 * 0.3, rounded to 2 dp
    assert_eq!(run.report.gap_analysis.data_quality_score, 0.58);
    assert_eq!(run.metrics.data_quality_score, 0.58);

    assert_eq!(run.workflow.status, ResearchStatus::Completed);
    for step in &run.workflow.steps {
        assert_eq!(step.status, ResearchStatus::Completed, "step {}", step.stage);
    }

    // 2 areas x 1 keyword + 1 keyword list + 1 competitor + 1 leaders = 5
    assert_eq!(run.metrics.searches_performed, 5);
    assert!(run.markdown_report.contains("Acme"));
    assert!(run
        .markdown_report
        .contains("# Competitive Research Report"));
}

#[tokio::test]
async fn test_credential_failure_preserves_partial_results() {
    let mut search = MockSearchDouble::new();
    search
        .expect_validate_credentials()
        .returning(|| Ok(false));
    search.expect_search().never();

    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(ScriptedCompletion), Arc::new(search), &config);

    let query = ResearchQuery::new("AI chatbot companies").unwrap();
    let outcome = orchestrator.execute_research(query).await;

    let run = match outcome {
        RunOutcome::Failed(run) => run,
        RunOutcome::Completed(_) => panic!("expected failure"),
    };

    assert_eq!(run.failed_stage, WorkflowStage::WebSearch);
    assert!(run.error_message.contains("credential"));

    // Planning completed before the failure and must be surfaced.
    assert!(run.partial_results.contains_key("planning"));
    assert!(!run.partial_results.contains_key("web_search"));
    assert!(!run.partial_results.contains_key("gap_analysis"));
    assert!(!run.partial_results.contains_key("report_generation"));

    assert_eq!(run.workflow.status, ResearchStatus::Failed);
    assert_eq!(run.workflow.steps[0].status, ResearchStatus::Completed);
    assert_eq!(run.workflow.steps[1].status, ResearchStatus::Failed);
    assert_eq!(run.workflow.steps[2].status, ResearchStatus::Pending);
    assert_eq!(run.workflow.steps[3].status, ResearchStatus::Pending);
}

#[tokio::test]
async fn test_completion_outage_degrades_but_completes() {
    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(FailingCompletion), Arc::new(StubSearch), &config);

    let query = ResearchQuery::new("AI chatbot companies").unwrap();
    let outcome = orchestrator.execute_research(query).await;

    let run = match outcome {
        RunOutcome::Completed(run) => run,
        RunOutcome::Failed(run) => panic!("workflow failed: {}", run.error_message),
    };

    // Every stage fell back but still completed.
    assert_eq!(run.workflow.status, ResearchStatus::Completed);

    let planning = &run.workflow.steps[0];
    assert!(planning
        .advisory
        .as_deref()
        .unwrap_or_default()
        .contains("Used fallback plan"));
    assert!(!run.report.plan.research_questions.is_empty());

    // Extraction failed, so no competitors and a zero quality score.
    assert!(run.report.competitors.is_empty());
    assert_eq!(run.report.gap_analysis.data_quality_score, 0.0);

    // Fallback executive summary is still non-empty.
    assert!(!run.report.executive_summary.is_empty());
}

/// Search double that records the number of concurrently in-flight calls.
struct CountingSearch {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl CountingSearch {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SearchService for CountingSearch {
    async fn search(&self, _query: &str) -> SearchApiResult<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(std::time::Duration::from_millis(25)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![SearchHit {
            title: "hit".to_string(),
            url: "https://example.com".to_string(),
            content: "content".to_string(),
            score: None,
            published_date: None,
        }])
    }

    async fn validate_credentials(&self) -> SearchApiResult<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn test_concurrency_never_exceeds_bound() {
    let search = Arc::new(CountingSearch::new());
    let search_service: Arc<dyn SearchService> = Arc::clone(&search) as Arc<dyn SearchService>;
    let agent = WebSearcherAgent::new(Arc::new(ScriptedCompletion), search_service, 3);

    // 21 candidate queries before dedup/truncation; truncated to 3.
    let plan = competitive_research_agents::models::ResearchPlan {
        objective: "Map the market".to_string(),
        research_questions: vec!["Who competes?".to_string()],
        priority_areas: (1..=4).map(|i| format!("area{}", i)).collect(),
        search_keywords: (1..=3).map(|i| format!("kw{}", i)).collect(),
        competitor_names: (1..=5).map(|i| format!("comp{}", i)).collect(),
        estimated_searches: 10,
        created_at: chrono::Utc::now(),
    };

    let outcome = agent.execute_research(&plan).await.unwrap();

    assert_eq!(search.calls.load(Ordering::SeqCst), 3);
    assert!(search.max_in_flight.load(Ordering::SeqCst) <= 3);
    assert_eq!(outcome.artifact.total_searches, 3);
    assert_eq!(outcome.artifact.results.len(), 3);
}

#[tokio::test]
async fn test_validate_system_operational() {
    let mut search = MockSearchDouble::new();
    search.expect_validate_credentials().returning(|| Ok(true));

    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(ScriptedCompletion), Arc::new(search), &config);

    let health = orchestrator.validate_system().await;

    assert_eq!(health.overall, HealthStatus::Operational);
    assert_eq!(health.components.len(), 5);
    assert!(health.recommendations.is_empty());
}

#[tokio::test]
async fn test_validate_system_flags_bad_search_credentials() {
    let mut search = MockSearchDouble::new();
    search.expect_validate_credentials().returning(|| Ok(false));

    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(ScriptedCompletion), Arc::new(search), &config);

    let health = orchestrator.validate_system().await;

    assert_eq!(health.overall, HealthStatus::Error);
    assert!(health
        .recommendations
        .iter()
        .any(|r| r.contains("TAVILY_API_KEY")));
}

#[tokio::test]
async fn test_validate_system_degraded_when_planner_falls_back() {
    let mut search = MockSearchDouble::new();
    search.expect_validate_credentials().returning(|| Ok(true));

    let config = test_config(5);
    let orchestrator =
        Orchestrator::with_services(Arc::new(FailingCompletion), Arc::new(search), &config);

    let health = orchestrator.validate_system().await;

    assert_eq!(health.overall, HealthStatus::Degraded);
    assert!(health
        .recommendations
        .iter()
        .any(|r| r.contains("OPENAI_API_KEY")));
}

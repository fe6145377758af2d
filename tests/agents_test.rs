//! Stage agent fallback behavior with deterministic doubles.

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use competitive_research_agents::agents::{
    data_quality_score, GapAnalyzerAgent, PlannerAgent, WebSearcherAgent,
};
use competitive_research_agents::error::{
    CompletionError, CompletionResult, SearchApiError, SearchApiResult,
};
use competitive_research_agents::models::{
    CompetitorInfo, GapAnalysis, ResearchPlan, ResearchQuery, SourceType,
};
use competitive_research_agents::openai::{CompletionRequest, CompletionService};
use competitive_research_agents::tavily::{SearchHit, SearchService};

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

/// Returns a fixed completion regardless of prompt.
struct FixedCompletion(String);

#[async_trait]
impl CompletionService for FixedCompletion {
    async fn complete(&self, _request: CompletionRequest) -> CompletionResult<String> {
        Ok(self.0.clone())
    }
}

/// Search service whose every query exhausts its retries.
struct ExhaustedSearch;

#[async_trait]
impl SearchService for ExhaustedSearch {
    async fn search(&self, _query: &str) -> SearchApiResult<Vec<SearchHit>> {
        Err(SearchApiError::Exhausted {
            message: "rate limited".to_string(),
            retries: 3,
        })
    }

    async fn validate_credentials(&self) -> SearchApiResult<bool> {
        Ok(true)
    }
}

fn sample_plan() -> ResearchPlan {
    ResearchPlan {
        objective: "Map the chatbot market".to_string(),
        research_questions: vec!["Who competes?".to_string()],
        priority_areas: vec!["pricing".to_string()],
        search_keywords: vec!["chatbot".to_string()],
        competitor_names: Vec::new(),
        estimated_searches: 8,
        created_at: chrono::Utc::now(),
    }
}

#[tokio::test]
async fn test_planner_fallback_always_succeeds() {
    let planner = PlannerAgent::new(Arc::new(FailingCompletion));
    let query = ResearchQuery::new("AI chatbot companies").unwrap();

    let outcome = planner.create_plan(&query).await.unwrap();

    assert!(!outcome.artifact.research_questions.is_empty());
    assert!(outcome
        .advisory
        .as_deref()
        .unwrap()
        .starts_with("Used fallback plan"));
    assert_eq!(outcome.artifact.estimated_searches, 8);
}

#[tokio::test]
async fn test_planner_fallback_on_malformed_json() {
    let planner = PlannerAgent::new(Arc::new(FixedCompletion(
        "certainly! the market is exciting".to_string(),
    )));
    let query = ResearchQuery::new("AI chatbot companies").unwrap();

    let outcome = planner.create_plan(&query).await.unwrap();
    assert!(outcome.advisory.is_some());
    assert_eq!(
        outcome.artifact.objective,
        "Competitive analysis for: AI chatbot companies"
    );
}

#[tokio::test]
async fn test_planner_refine_failure_is_stage_failure() {
    let planner = PlannerAgent::new(Arc::new(FailingCompletion));

    let result = planner.refine_plan(&sample_plan(), "add funding focus").await;

    let failure = result.err().expect("refine should fail hard");
    assert!(failure.message.contains("Failed to refine plan"));
}

#[tokio::test]
async fn test_planner_refine_merges_feedback() {
    let refined_json = json!({
        "objective": "Map the chatbot market including funding",
        "priority_areas": ["pricing", "funding"],
        "competitor_names": ["Acme"]
    })
    .to_string();
    let planner = PlannerAgent::new(Arc::new(FixedCompletion(refined_json)));

    let outcome = planner
        .refine_plan(&sample_plan(), "add funding focus")
        .await
        .unwrap();

    assert_eq!(
        outcome.artifact.objective,
        "Map the chatbot market including funding"
    );
    assert_eq!(outcome.artifact.priority_areas, vec!["pricing", "funding"]);
    // Unspecified fields keep the original plan's values.
    assert_eq!(outcome.artifact.search_keywords, vec!["chatbot"]);
    // 2 areas * 2 + 1 competitor = 5
    assert_eq!(outcome.artifact.estimated_searches, 5);
}

#[tokio::test]
async fn test_web_searcher_knowledge_fallback() {
    let knowledge_json = json!([
        {
            "title": "Acme - Chatbots",
            "url": "https://acme.io",
            "snippet": "Acme builds chatbots",
            "content": "Acme builds enterprise chatbots."
        }
    ])
    .to_string();

    let agent = WebSearcherAgent::new(
        Arc::new(FixedCompletion(knowledge_json)),
        Arc::new(ExhaustedSearch),
        3,
    );

    let outcome = agent.execute_research(&sample_plan()).await.unwrap();

    assert!(!outcome.artifact.results.is_empty());
    for result in &outcome.artifact.results {
        assert_eq!(result.source_type, SourceType::KnowledgeBase);
        assert_eq!(result.title, "Acme - Chatbots");
    }
}

#[tokio::test]
async fn test_gap_analyzer_rule_based_fallback() {
    let analyzer = GapAnalyzerAgent::new(Arc::new(FailingCompletion));
    let plan = sample_plan();

    let outcome = analyzer.analyze(&plan, &[], &[]).await.unwrap();

    assert!(outcome
        .advisory
        .as_deref()
        .unwrap()
        .starts_with("Used rule-based gap analysis"));
    assert_eq!(outcome.artifact.data_quality_score, 0.0);
    assert_eq!(outcome.artifact.confidence_scores["pricing"], 0.0);
    assert!(outcome
        .artifact
        .missing_information
        .contains(&"No competitors identified".to_string()));
}

#[tokio::test]
async fn test_gap_analyzer_score_overrides_model_output() {
    // The model claims a perfect score; the computed score must win.
    let gap_json = json!({
        "missing_information": [],
        "incomplete_areas": {},
        "confidence_scores": {"pricing": 0.9},
        "suggested_queries": [],
        "priority_gaps": [],
        "data_quality_score": 1.0
    })
    .to_string();

    let analyzer = GapAnalyzerAgent::new(Arc::new(FixedCompletion(gap_json)));
    let plan = sample_plan();
    let competitors = vec![CompetitorInfo::named("Acme")];

    let outcome = analyzer.analyze(&plan, &competitors, &[]).await.unwrap();

    let expected = data_quality_score(&competitors, &plan);
    assert_eq!(outcome.artifact.data_quality_score, expected);
    assert!(expected < 1.0);
}

#[tokio::test]
async fn test_improvement_recommendations_fallback() {
    let analyzer = GapAnalyzerAgent::new(Arc::new(FailingCompletion));

    let outcome = analyzer
        .improvement_recommendations(&GapAnalysis::default(), &[])
        .await
        .unwrap();

    assert_eq!(outcome.artifact.len(), 7);
    assert!(outcome
        .advisory
        .as_deref()
        .unwrap()
        .starts_with("Used fallback recommendations"));
}

#[tokio::test]
async fn test_improvement_recommendations_parses_array() {
    let recommendations_json =
        json!(["Search for funding news", "Compare pricing pages"]).to_string();
    let analyzer = GapAnalyzerAgent::new(Arc::new(FixedCompletion(recommendations_json)));

    let outcome = analyzer
        .improvement_recommendations(&GapAnalysis::default(), &[])
        .await
        .unwrap();

    assert_eq!(
        outcome.artifact,
        vec!["Search for funding news", "Compare pricing pages"]
    );
    assert!(outcome.advisory.is_none());
}

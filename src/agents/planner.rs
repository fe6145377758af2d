use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use super::{extract_json, StageFailure, StageReport, StageResult};
use crate::openai::{CompletionRequest, CompletionService, Message};
use crate::models::{ResearchPlan, ResearchQuery};
use crate::prompts::{
    planning_prompt, plan_refinement_prompt, PLANNER_SYSTEM_PROMPT,
    PLAN_REFINEMENT_SYSTEM_PROMPT,
};

/// Agent for the planning stage: turns a research query into a strategic
/// research plan.
///
/// Planning never hard-fails: when the model call or parse fails, a
/// deterministic fallback plan is built from the query alone and the
/// outcome carries an advisory note.
pub struct PlannerAgent {
    completion: Arc<dyn CompletionService>,
}

impl PlannerAgent {
    /// Create a new planner agent
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Create a research plan for the query.
    pub async fn create_plan(&self, query: &ResearchQuery) -> StageResult<ResearchPlan> {
        let start = Instant::now();

        match self.plan_from_model(query).await {
            Ok(plan) => {
                info!(
                    objective = %plan.objective,
                    estimated_searches = plan.estimated_searches,
                    "Research plan created"
                );
                Ok(StageReport::ok(plan, start.elapsed()))
            }
            Err(reason) => {
                warn!(reason = %reason, "Planning model call failed, using fallback plan");
                Ok(StageReport::degraded(
                    Self::fallback_plan(query),
                    format!("Used fallback plan: {}", reason),
                    start.elapsed(),
                ))
            }
        }
    }

    /// Refine an existing plan based on feedback. Unlike plan creation
    /// this has no fallback; a failed model call is a stage failure.
    pub async fn refine_plan(
        &self,
        plan: &ResearchPlan,
        feedback: &str,
    ) -> StageResult<ResearchPlan> {
        let start = Instant::now();

        let request = CompletionRequest::new(vec![
            Message::system(PLAN_REFINEMENT_SYSTEM_PROMPT),
            Message::user(plan_refinement_prompt(plan, feedback)),
        ])
        .with_json_output();

        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| StageFailure::new(format!("Failed to refine plan: {}", e), start.elapsed()))?;

        let value: serde_json::Value = extract_json(&completion)
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))
            .map_err(|e| {
                StageFailure::new(format!("Failed to refine plan: {}", e), start.elapsed())
            })?;

        let priority_areas = string_list_or(&value, "priority_areas", &plan.priority_areas);
        let competitor_names = string_list_or(&value, "competitor_names", &plan.competitor_names);
        let raw_estimate = priority_areas.len() as u32 * 2 + competitor_names.len() as u32;

        let refined = ResearchPlan {
            objective: value
                .get("objective")
                .and_then(|v| v.as_str())
                .unwrap_or(&plan.objective)
                .to_string(),
            research_questions: string_list_or(&value, "research_questions", &plan.research_questions),
            priority_areas,
            search_keywords: string_list_or(&value, "search_keywords", &plan.search_keywords),
            competitor_names,
            estimated_searches: ResearchPlan::clamp_estimated_searches(raw_estimate),
            created_at: plan.created_at,
        };

        info!(objective = %refined.objective, "Research plan refined");
        Ok(StageReport::ok(refined, start.elapsed()))
    }

    async fn plan_from_model(&self, query: &ResearchQuery) -> Result<ResearchPlan, String> {
        let request = CompletionRequest::new(vec![
            Message::system(PLANNER_SYSTEM_PROMPT),
            Message::user(planning_prompt(query)),
        ])
        .with_json_output();

        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;

        let value: serde_json::Value = extract_json(&completion)
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))?;

        Ok(Self::parse_plan(&value, query))
    }

    /// Build a plan from the model's JSON, filling gaps from the query.
    fn parse_plan(value: &serde_json::Value, query: &ResearchQuery) -> ResearchPlan {
        let research_questions = string_list_or(
            value,
            "research_questions",
            &[format!("Who are the main competitors for {}?", query.text)],
        );
        let priority_areas = string_list_or(
            value,
            "priority_areas",
            &[
                "market_position".to_string(),
                "features".to_string(),
                "pricing".to_string(),
            ],
        );
        let search_keywords = string_list_or(value, "search_keywords", &[query.text.clone()]);
        let competitor_names = string_list_or(value, "competitor_names", &[]);

        let raw_estimate = priority_areas.len() as u32 * 2
            + competitor_names.len() as u32
            + search_keywords.len() as u32 / 2;

        ResearchPlan {
            objective: value
                .get("objective")
                .and_then(|v| v.as_str())
                .unwrap_or(&query.text)
                .to_string(),
            research_questions,
            priority_areas,
            search_keywords,
            competitor_names,
            estimated_searches: ResearchPlan::clamp_estimated_searches(raw_estimate),
            created_at: Utc::now(),
        }
    }

    /// Deterministic plan built purely from the query. Always succeeds.
    pub fn fallback_plan(query: &ResearchQuery) -> ResearchPlan {
        let priority_areas = if query.focus_areas.is_empty() {
            vec![
                "market_position".to_string(),
                "features".to_string(),
                "pricing".to_string(),
                "target_market".to_string(),
            ]
        } else {
            query.focus_areas.clone()
        };

        let mut search_keywords = vec![query.text.clone()];
        if query.focus_areas.is_empty() {
            search_keywords.push("competitors".to_string());
            search_keywords.push("market analysis".to_string());
        } else {
            search_keywords.extend(query.focus_areas.clone());
        }

        ResearchPlan {
            objective: format!("Competitive analysis for: {}", query.text),
            research_questions: vec![
                format!("Who are the main competitors in the {} space?", query.text),
                "What are their key products and services?".to_string(),
                "How do they price their offerings?".to_string(),
                "What are their main competitive advantages?".to_string(),
                "Who is their target market?".to_string(),
            ],
            priority_areas,
            search_keywords,
            competitor_names: Vec::new(),
            estimated_searches: 8,
            created_at: Utc::now(),
        }
    }
}

fn string_list_or(value: &serde_json::Value, key: &str, default: &[String]) -> Vec<String> {
    let parsed: Vec<String> = value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();

    if parsed.is_empty() {
        default.to_vec()
    } else {
        parsed
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use super::{extract_json, StageReport, StageResult};
use crate::openai::{CompletionRequest, CompletionService, Message};
use crate::models::{
    CompetitiveInsights, CompetitorInfo, GapAnalysis, ResearchPlan, ResearchQuery, ResearchReport,
    SearchResult,
};
use crate::prompts::{
    executive_summary_prompt, insights_prompt, EXECUTIVE_SUMMARY_SYSTEM_PROMPT,
    INSIGHTS_SYSTEM_PROMPT,
};

/// Cap on reported limitations.
const MAX_LIMITATIONS: usize = 5;
/// Cap on recommended next steps.
const MAX_NEXT_STEPS: usize = 6;

/// Agent for the curation stage: synthesizes insights and assembles the
/// final research report.
///
/// Both model calls (insights, executive summary) have deterministic
/// fallback content; report assembly itself is pure computation and
/// cannot hard-fail.
pub struct CuratorAgent {
    completion: Arc<dyn CompletionService>,
}

impl CuratorAgent {
    /// Create a new curator agent
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Generate strategic competitive insights.
    pub async fn generate_insights(
        &self,
        competitors: &[CompetitorInfo],
        plan: &ResearchPlan,
        gap: &GapAnalysis,
    ) -> StageResult<CompetitiveInsights> {
        let start = Instant::now();
        let summary = competitor_summary(competitors);

        let request = CompletionRequest::new(vec![
            Message::system(INSIGHTS_SYSTEM_PROMPT),
            Message::user(insights_prompt(&summary, plan, gap)),
        ])
        .with_json_output();

        let parsed: Result<CompetitiveInsights, String> =
            match self.completion.complete(request).await {
                Ok(completion) => extract_json(&completion).and_then(|json| {
                    serde_json::from_str(json).map_err(|e| e.to_string())
                }),
                Err(e) => Err(e.to_string()),
            };

        match parsed {
            Ok(insights) => {
                info!(elapsed_ms = start.elapsed().as_millis(), "Insights generated");
                Ok(StageReport::ok(insights, start.elapsed()))
            }
            Err(reason) => {
                warn!(reason = %reason, "Insights model call failed, using fallback insights");
                Ok(StageReport::degraded(
                    fallback_insights(),
                    format!("Used fallback insights: {}", reason),
                    start.elapsed(),
                ))
            }
        }
    }

    /// Assemble the complete research report.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_report(
        &self,
        query: &ResearchQuery,
        plan: &ResearchPlan,
        competitors: &[CompetitorInfo],
        gap: &GapAnalysis,
        insights: &CompetitiveInsights,
        results: &[SearchResult],
        research_duration_secs: f64,
    ) -> StageResult<ResearchReport> {
        let start = Instant::now();

        let (executive_summary, advisory) =
            match self.executive_summary(query, competitors, insights, gap).await {
                Ok(summary) => (summary, None),
                Err(reason) => {
                    warn!(reason = %reason, "Summary model call failed, using fallback summary");
                    (
                        fallback_summary(query, competitors),
                        Some(format!("Used fallback executive summary: {}", reason)),
                    )
                }
            };

        let distinct_queries: BTreeSet<&str> = results.iter().map(|r| r.query.as_str()).collect();

        let report = ResearchReport {
            query: query.clone(),
            plan: plan.clone(),
            competitors: competitors.to_vec(),
            gap_analysis: gap.clone(),
            insights: insights.clone(),
            executive_summary,
            methodology: methodology_description(plan, results.len()),
            data_sources: extract_data_sources(results),
            limitations: research_limitations(gap),
            next_steps: recommended_next_steps(gap, insights),
            generated_at: Utc::now(),
            total_searches_performed: distinct_queries.len(),
            research_duration_secs,
        };

        info!(
            competitors = report.competitors.len(),
            sources = report.data_sources.len(),
            "Research report assembled"
        );

        Ok(StageReport {
            artifact: report,
            advisory,
            elapsed: start.elapsed(),
        })
    }

    async fn executive_summary(
        &self,
        query: &ResearchQuery,
        competitors: &[CompetitorInfo],
        insights: &CompetitiveInsights,
        gap: &GapAnalysis,
    ) -> Result<String, String> {
        let request = CompletionRequest::new(vec![
            Message::system(EXECUTIVE_SUMMARY_SYSTEM_PROMPT),
            Message::user(executive_summary_prompt(query, competitors, insights, gap)),
        ]);

        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;

        let summary = completion.trim().to_string();
        if summary.is_empty() {
            return Err("model returned an empty summary".to_string());
        }
        Ok(summary)
    }
}

/// Concise competitor summary for the insights prompt. Caps at 10
/// competitors to keep the prompt bounded.
fn competitor_summary(competitors: &[CompetitorInfo]) -> String {
    if competitors.is_empty() {
        return "No competitors identified in the research.".to_string();
    }

    competitors
        .iter()
        .take(10)
        .map(|comp| {
            let mut summary = format!("**{}**", comp.name);
            if let Some(website) = &comp.website {
                summary.push_str(&format!(" ({})", website));
            }
            if let Some(description) = &comp.description {
                let trimmed: String = description.chars().take(150).collect();
                let ellipsis = if description.chars().count() > 150 { "..." } else { "" };
                summary.push_str(&format!(" - {}{}", trimmed, ellipsis));
            }

            let mut details = Vec::new();
            if !comp.products.is_empty() {
                details.push(format!(
                    "Products: {}",
                    comp.products
                        .iter()
                        .take(3)
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            if !comp.pricing_info.is_empty() {
                details.push("Pricing available".to_string());
            }
            if !comp.key_features.is_empty() {
                details.push(format!("{} key features", comp.key_features.len()));
            }

            if !details.is_empty() {
                summary.push_str(&format!(" | {}", details.join(" | ")));
            }
            summary
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fallback_insights() -> CompetitiveInsights {
    CompetitiveInsights {
        market_opportunities: vec!["Identify underserved market segments".to_string()],
        competitive_advantages: vec!["Leverage unique capabilities".to_string()],
        threats_and_risks: vec!["Monitor competitive actions".to_string()],
        strategic_recommendations: vec![
            "Continue market research".to_string(),
            "Develop differentiation strategy".to_string(),
        ],
        positioning_suggestions: vec!["Focus on unique value proposition".to_string()],
        feature_gaps: vec!["Analyze feature completeness".to_string()],
        pricing_insights: vec!["Research competitive pricing".to_string()],
    }
}

fn fallback_summary(query: &ResearchQuery, competitors: &[CompetitorInfo]) -> String {
    format!(
        "This competitive research analyzed {count} competitors in the {query} space. \
The research identified key market players, their positioning, and strategic opportunities.\n\n\
Based on the analysis, several market opportunities and competitive advantages were \
identified, along with potential threats and risks. The findings suggest specific \
strategic recommendations for competitive positioning and market entry.\n\n\
Further research is recommended to address identified gaps and enhance competitive \
intelligence.",
        count = competitors.len(),
        query = query.text,
    )
}

fn methodology_description(plan: &ResearchPlan, total_results: usize) -> String {
    format!(
        "This competitive research employed a multi-agent pipeline combining AI analysis \
with live web search.\n\n\
**Research Process:**\n\
1. Strategic planning based on the research query\n\
2. Systematic web search using {keywords} keywords across {areas} priority areas\n\
3. Automated data extraction and competitor profiling\n\
4. Gap analysis to identify missing information\n\
5. Synthesis of findings into strategic insights\n\n\
**Data Collection:**\n\
- {planned} planned searches executed\n\
- {total_results} search results analyzed\n\
- Focus areas: {focus}\n\
- Search depth: Advanced web search with AI-powered content extraction",
        keywords = plan.search_keywords.len(),
        areas = plan.priority_areas.len(),
        planned = plan.estimated_searches,
        total_results = total_results,
        focus = plan.priority_areas.join(", "),
    )
}

/// Unique source domains from the result URLs, plus the two research
/// methods themselves, sorted for stable output.
fn extract_data_sources(results: &[SearchResult]) -> Vec<String> {
    let mut sources: BTreeSet<String> = results
        .iter()
        .filter(|r| r.url.starts_with("http"))
        .map(|r| match url::Url::parse(&r.url) {
            Ok(parsed) => parsed
                .host_str()
                .map(String::from)
                .unwrap_or_else(|| truncate_url(&r.url)),
            Err(_) => truncate_url(&r.url),
        })
        .collect();

    sources.insert("Tavily Web Search".to_string());
    sources.insert("AI Completion Analysis".to_string());

    sources.into_iter().collect()
}

fn truncate_url(url: &str) -> String {
    if url.chars().count() > 50 {
        format!("{}...", url.chars().take(50).collect::<String>())
    } else {
        url.to_string()
    }
}

fn research_limitations(gap: &GapAnalysis) -> Vec<String> {
    let mut limitations = Vec::new();

    if gap.data_quality_score < 0.7 {
        limitations.push(format!(
            "Data completeness score of {:.0}% indicates some information gaps",
            gap.data_quality_score * 100.0
        ));
    }

    if !gap.missing_information.is_empty() {
        limitations.push(format!(
            "Missing critical information in {} areas",
            gap.missing_information.len()
        ));
    }

    let low_confidence: Vec<&str> = gap
        .confidence_scores
        .iter()
        .filter(|(_, score)| **score < 0.6)
        .map(|(area, _)| area.as_str())
        .collect();
    if !low_confidence.is_empty() {
        limitations.push(format!(
            "Lower confidence in data for: {}",
            low_confidence.join(", ")
        ));
    }

    limitations.extend([
        "Information accuracy dependent on publicly available sources".to_string(),
        "Market conditions and competitor data subject to rapid change".to_string(),
        "Some proprietary information not accessible through public research".to_string(),
    ]);

    limitations.truncate(MAX_LIMITATIONS);
    limitations
}

fn recommended_next_steps(gap: &GapAnalysis, insights: &CompetitiveInsights) -> Vec<String> {
    let mut next_steps = Vec::new();

    if !gap.suggested_queries.is_empty() {
        next_steps.push("Conduct additional research using suggested follow-up queries".to_string());
    }
    if !gap.priority_gaps.is_empty() {
        next_steps.push("Address priority information gaps for more complete analysis".to_string());
    }
    if !insights.strategic_recommendations.is_empty() {
        next_steps
            .push("Implement strategic recommendations based on competitive analysis".to_string());
    }

    next_steps.extend([
        "Monitor competitor activities and market developments continuously".to_string(),
        "Validate findings through direct market research or customer interviews".to_string(),
        "Develop detailed competitive response strategies".to_string(),
        "Schedule regular competitive intelligence updates".to_string(),
    ]);

    next_steps.truncate(MAX_NEXT_STEPS);
    next_steps
}

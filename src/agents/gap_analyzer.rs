use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::{extract_json, StageReport, StageResult};
use crate::openai::{CompletionRequest, CompletionService, Message};
use crate::models::{CompetitorInfo, GapAnalysis, ResearchPlan, SearchResult};
use crate::prompts::{
    gap_analysis_prompt, recommendations_prompt, GapPromptData, GAP_ANALYSIS_SYSTEM_PROMPT,
    RECOMMENDATIONS_SYSTEM_PROMPT,
};

/// Cap on suggested follow-up queries.
const MAX_SUGGESTED_QUERIES: usize = 8;
/// Cap on priority gaps.
const MAX_PRIORITY_GAPS: usize = 5;

/// Agent for the gap analysis stage: measures research completeness and
/// identifies what is still missing.
///
/// The model owns the qualitative judgment (missing information, priority
/// gaps); the numeric data-quality score is always computed here in code
/// and is never taken from the model output.
pub struct GapAnalyzerAgent {
    completion: Arc<dyn CompletionService>,
}

/// Deterministic summary of the collected data, fed to the analysis
/// prompt and to the rule-based fallback.
#[derive(Debug, Clone)]
struct DataSummary {
    found_competitors: usize,
    total_results: usize,
    unique_sources: usize,
    competitor_completeness: Vec<(String, f64)>,
    area_coverage: BTreeMap<String, usize>,
}

impl GapAnalyzerAgent {
    /// Create a new gap analyzer agent
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    /// Analyze gaps in the research data.
    pub async fn analyze(
        &self,
        plan: &ResearchPlan,
        competitors: &[CompetitorInfo],
        results: &[SearchResult],
    ) -> StageResult<GapAnalysis> {
        let start = Instant::now();

        let summary = Self::summarize(plan, competitors, results);
        let quality = data_quality_score(competitors, plan);

        let (mut analysis, advisory) = match self.qualitative_analysis(plan, &summary).await {
            Ok(analysis) => (analysis, None),
            Err(reason) => {
                warn!(reason = %reason, "Gap analysis model call failed, using rule-based fallback");
                (
                    Self::fallback_analysis(&summary, plan),
                    Some(format!("Used rule-based gap analysis: {}", reason)),
                )
            }
        };

        // The computed score always wins over anything the model said.
        analysis.data_quality_score = quality;

        info!(
            competitors = competitors.len(),
            quality_score = quality,
            elapsed_ms = start.elapsed().as_millis(),
            "Gap analysis completed"
        );

        Ok(StageReport {
            artifact: analysis,
            advisory,
            elapsed: start.elapsed(),
        })
    }

    /// Generate improvement recommendations from a finished gap analysis.
    pub async fn improvement_recommendations(
        &self,
        gap: &GapAnalysis,
        competitors: &[CompetitorInfo],
    ) -> StageResult<Vec<String>> {
        let start = Instant::now();
        let names: Vec<String> = competitors.iter().map(|c| c.name.clone()).collect();

        let request = CompletionRequest::new(vec![
            Message::system(RECOMMENDATIONS_SYSTEM_PROMPT),
            Message::user(recommendations_prompt(gap, &names)),
        ]);

        let parsed: Result<Vec<String>, String> = match self.completion.complete(request).await {
            Ok(completion) => extract_json(&completion)
                .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string())),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(recommendations) if !recommendations.is_empty() => {
                Ok(StageReport::ok(recommendations, start.elapsed()))
            }
            Ok(_) => Ok(StageReport::degraded(
                Self::fallback_recommendations(),
                "Used fallback recommendations: model returned no recommendations",
                start.elapsed(),
            )),
            Err(reason) => Ok(StageReport::degraded(
                Self::fallback_recommendations(),
                format!("Used fallback recommendations: {}", reason),
                start.elapsed(),
            )),
        }
    }

    async fn qualitative_analysis(
        &self,
        plan: &ResearchPlan,
        summary: &DataSummary,
    ) -> Result<GapAnalysis, String> {
        let prompt_data = GapPromptData {
            objective: plan.objective.clone(),
            research_questions: plan.research_questions.clone(),
            priority_areas: plan.priority_areas.clone(),
            found_competitors: summary.found_competitors,
            planned_competitors: plan.competitor_names.len(),
            total_results: summary.total_results,
            unique_sources: summary.unique_sources,
            competitor_completeness: summary.competitor_completeness.clone(),
            area_coverage: summary.area_coverage.clone(),
        };

        let request = CompletionRequest::new(vec![
            Message::system(GAP_ANALYSIS_SYSTEM_PROMPT),
            Message::user(gap_analysis_prompt(&prompt_data)),
        ])
        .with_json_output();

        let completion = self
            .completion
            .complete(request)
            .await
            .map_err(|e| e.to_string())?;

        let value: serde_json::Value = extract_json(&completion)
            .and_then(|json| serde_json::from_str(json).map_err(|e| e.to_string()))?;

        Ok(GapAnalysis {
            missing_information: string_list(&value, "missing_information"),
            incomplete_areas: value
                .get("incomplete_areas")
                .and_then(|v| v.as_object())
                .map(|entries| {
                    entries
                        .iter()
                        .map(|(area, gaps)| {
                            let gaps = gaps
                                .as_array()
                                .map(|items| {
                                    items
                                        .iter()
                                        .filter_map(|g| g.as_str())
                                        .map(String::from)
                                        .collect()
                                })
                                .unwrap_or_default();
                            (area.clone(), gaps)
                        })
                        .collect()
                })
                .unwrap_or_default(),
            confidence_scores: value
                .get("confidence_scores")
                .and_then(|v| v.as_object())
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|(area, score)| {
                            score.as_f64().map(|s| (area.clone(), s.clamp(0.0, 1.0)))
                        })
                        .collect()
                })
                .unwrap_or_default(),
            suggested_queries: string_list(&value, "suggested_queries"),
            priority_gaps: string_list(&value, "priority_gaps"),
            data_quality_score: 0.0,
        })
    }

    fn summarize(
        plan: &ResearchPlan,
        competitors: &[CompetitorInfo],
        results: &[SearchResult],
    ) -> DataSummary {
        let unique_sources: HashSet<&str> = results
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.as_str())
            .collect();

        let area_coverage = plan
            .priority_areas
            .iter()
            .map(|area| {
                let needle = area.to_lowercase();
                let count = results
                    .iter()
                    .filter(|r| {
                        r.query.to_lowercase().contains(&needle)
                            || r.content.to_lowercase().contains(&needle)
                    })
                    .count();
                (area.clone(), count)
            })
            .collect();

        DataSummary {
            found_competitors: competitors.len(),
            total_results: results.len(),
            unique_sources: unique_sources.len(),
            competitor_completeness: competitors
                .iter()
                .map(|c| (c.name.clone(), c.completeness_score()))
                .collect(),
            area_coverage,
        }
    }

    /// Rule-based analysis computed directly from coverage counts.
    fn fallback_analysis(summary: &DataSummary, plan: &ResearchPlan) -> GapAnalysis {
        let mut missing_information = Vec::new();
        let mut incomplete_areas = BTreeMap::new();
        let mut confidence_scores = BTreeMap::new();
        let mut suggested_queries = Vec::new();
        let mut priority_gaps = Vec::new();

        let first_keyword = plan
            .search_keywords
            .first()
            .cloned()
            .unwrap_or_else(|| "competitors".to_string());

        if summary.found_competitors == 0 {
            missing_information.push("No competitors identified".to_string());
            priority_gaps.push("Identify main competitors in the market".to_string());
        }

        if summary.found_competitors < 3 {
            missing_information.push("Insufficient competitor coverage".to_string());
            suggested_queries.push(format!("{} market leaders", first_keyword));
        }

        for (area, count) in &summary.area_coverage {
            match count {
                0 => {
                    incomplete_areas
                        .insert(area.clone(), vec![format!("No data found for {}", area)]);
                    confidence_scores.insert(area.clone(), 0.0);
                    suggested_queries.push(format!("{} analysis {}", area, first_keyword));
                }
                1..=2 => {
                    incomplete_areas
                        .insert(area.clone(), vec![format!("Limited data for {}", area)]);
                    confidence_scores.insert(area.clone(), 0.3);
                }
                _ => {
                    confidence_scores.insert(area.clone(), 0.7);
                }
            }
        }

        if priority_gaps.is_empty() {
            priority_gaps = vec![
                "Expand competitor identification".to_string(),
                "Gather more detailed pricing information".to_string(),
                "Collect feature comparison data".to_string(),
            ];
        }

        suggested_queries.truncate(MAX_SUGGESTED_QUERIES);
        priority_gaps.truncate(MAX_PRIORITY_GAPS);

        GapAnalysis {
            missing_information,
            incomplete_areas,
            confidence_scores,
            suggested_queries,
            priority_gaps,
            data_quality_score: 0.0,
        }
    }

    fn fallback_recommendations() -> Vec<String> {
        vec![
            "Conduct deeper searches for top 3 competitors".to_string(),
            "Focus on collecting pricing information".to_string(),
            "Gather more detailed feature comparisons".to_string(),
            "Research recent company news and developments".to_string(),
            "Analyze customer reviews and feedback".to_string(),
            "Investigate partnership and acquisition activity".to_string(),
            "Monitor competitor social media and marketing".to_string(),
        ]
    }
}

/// Overall data quality in [0, 1], weighted composite of competitor
/// completeness (40%), coverage breadth (30%), and information depth
/// (30%), rounded to 2 decimal places. Bit-reproducible for a given
/// competitor list and plan.
pub fn data_quality_score(competitors: &[CompetitorInfo], plan: &ResearchPlan) -> f64 {
    if competitors.is_empty() {
        return 0.0;
    }

    let count = competitors.len() as f64;

    let avg_completeness: f64 = competitors
        .iter()
        .map(CompetitorInfo::completeness_score)
        .sum::<f64>()
        / count;
    let completeness_factor = avg_completeness * 0.4;

    let expected = plan.competitor_names.len().max(3) as f64;
    let coverage_factor = (count / expected).min(1.0) * 0.3;

    let avg_depth: f64 = competitors
        .iter()
        .map(|c| {
            let indicators = [
                !c.pricing_info.is_empty(),
                c.key_features.len() > 2,
                c.target_market.is_some(),
                c.market_position.is_some(),
                c.products.len() > 1,
            ];
            indicators.iter().filter(|&&hit| hit).count() as f64 / indicators.len() as f64
        })
        .sum::<f64>()
        / count;
    let depth_factor = avg_depth * 0.3;

    let total = completeness_factor + coverage_factor + depth_factor;
    (total * 100.0).round() / 100.0
}

fn string_list(value: &serde_json::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

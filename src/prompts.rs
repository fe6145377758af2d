//! Centralized prompt definitions for the stage agents.
//!
//! System prompts are constants; user prompts are built from the typed
//! artifacts so every agent call goes through the same text.

use std::collections::BTreeMap;

use crate::models::{
    CompetitiveInsights, CompetitorInfo, GapAnalysis, ResearchDepth, ResearchPlan, ResearchQuery,
};

/// System prompt for the planning stage.
pub const PLANNER_SYSTEM_PROMPT: &str = "You are a strategic research planner specializing in competitive analysis. Create detailed, actionable research plans.";

/// System prompt for refining an existing plan.
pub const PLAN_REFINEMENT_SYSTEM_PROMPT: &str = "You are refining a competitive research plan based on feedback. Improve the plan while maintaining its core objectives.";

/// System prompt for knowledge-based fallback searches.
pub const KNOWLEDGE_SEARCH_SYSTEM_PROMPT: &str = "You are a business information provider. Provide factual, structured information about companies and markets.";

/// System prompt for competitor extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a data extraction specialist. Extract accurate, structured competitor information from search results.";

/// System prompt for the gap analysis stage.
pub const GAP_ANALYSIS_SYSTEM_PROMPT: &str = "You are a research gap analysis expert. Identify missing information and suggest specific improvements.";

/// System prompt for improvement recommendations.
pub const RECOMMENDATIONS_SYSTEM_PROMPT: &str = "You are a strategic research advisor. Provide actionable recommendations for improving competitive research.";

/// System prompt for insight generation.
pub const INSIGHTS_SYSTEM_PROMPT: &str = "You are a strategic business analyst specializing in competitive intelligence. Provide actionable strategic insights.";

/// System prompt for executive summaries.
pub const EXECUTIVE_SUMMARY_SYSTEM_PROMPT: &str = "You are writing an executive summary for competitive research. Be concise, strategic, and actionable.";

fn depth_instructions(depth: ResearchDepth) -> &'static str {
    match depth {
        ResearchDepth::Basic => "Focus on 3-5 main competitors and essential information only.",
        ResearchDepth::Standard => {
            "Provide comprehensive analysis of 5-8 competitors with detailed information."
        }
        ResearchDepth::Comprehensive => {
            "Conduct thorough research of 8-12 competitors with deep market analysis."
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the planning prompt for a research query.
pub fn planning_prompt(query: &ResearchQuery) -> String {
    let focus_areas_text = if query.focus_areas.is_empty() {
        String::new()
    } else {
        format!(
            "\nSpecific focus areas requested: {}",
            query.focus_areas.join(", ")
        )
    };

    let exclude_text = if query.exclude_competitors.is_empty() {
        String::new()
    } else {
        format!(
            "\nExclude these competitors: {}",
            query.exclude_competitors.join(", ")
        )
    };

    format!(
        r#"You are creating a strategic competitive research plan to find and analyze companies that operate in the same market space.

Research Query: "{query}"
Research Depth: {depth} - {depth_instructions}
Maximum Results per Search: {max_results}{focus_areas_text}{exclude_text}

IMPORTANT: You are looking for companies that provide products/services in the "{query}" market space, NOT companies that provide competitive research services.

Create a detailed research plan with:

1. OBJECTIVE: Clear, specific goal to identify and analyze companies in the "{query}" market
2. RESEARCH QUESTIONS: 5-8 key questions about competitors in this specific market
3. PRIORITY AREAS: Specific areas to investigate (e.g., pricing, features, market position, funding, technology, customer base, partnerships)
4. SEARCH KEYWORDS: 8-12 strategic keywords and phrases that identify companies in this market (avoid words like "competitors", "analysis", "research")
5. COMPETITOR NAMES: Specific company/product names in this market (if mentioned or inferable)

Format your response as JSON with this exact structure:
{{
    "objective": "Clear, specific research objective",
    "research_questions": ["Question 1", "Question 2"],
    "priority_areas": ["pricing", "features", "market_position"],
    "search_keywords": ["primary keyword", "industry-specific term"],
    "competitor_names": ["Specific Company 1", "Specific Company 2"]
}}"#,
        query = query.text,
        depth = query.depth,
        depth_instructions = depth_instructions(query.depth),
        max_results = query.max_results,
    )
}

/// Build the prompt for refining an existing plan with feedback.
pub fn plan_refinement_prompt(plan: &ResearchPlan, feedback: &str) -> String {
    format!(
        r#"Refine this existing research plan based on new feedback:

CURRENT PLAN:
Objective: {objective}
Research Questions:
{questions}
Priority Areas: {areas}
Search Keywords: {keywords}
Competitor Names: {competitors}

FEEDBACK/REQUIREMENTS:
{feedback}

Create an improved plan that addresses the feedback while maintaining the core research objective.

Format as JSON with the same structure as the original plan:
{{
    "objective": "...",
    "research_questions": ["..."],
    "priority_areas": ["..."],
    "search_keywords": ["..."],
    "competitor_names": ["..."]
}}"#,
        objective = plan.objective,
        questions = bullet_list(&plan.research_questions),
        areas = plan.priority_areas.join(", "),
        keywords = plan.search_keywords.join(", "),
        competitors = plan.competitor_names.join(", "),
    )
}

/// Build the knowledge-based fallback search prompt for one query.
pub fn knowledge_search_prompt(query: &str) -> String {
    format!(
        r#"Based on your knowledge, provide information about: "{query}"

Focus on providing factual, current information about:
- Company websites and official sources
- Recent product updates and announcements
- Pricing information when available
- Key features and capabilities
- Market positioning

Format as a JSON array with entries like:
[
    {{
        "title": "Company Name - Brief Description",
        "url": "https://company-website.com (if known)",
        "snippet": "Brief description of 100-200 words",
        "content": "More detailed information about the company, products, pricing, etc."
    }}
]

Provide 3-5 relevant entries if information is available."#,
    )
}

/// Build the competitor extraction prompt from collected search snippets.
pub fn extraction_prompt(objective: &str, combined_content: &str) -> String {
    format!(
        r#"Extract competitor information from these search results for: {objective}

SEARCH RESULTS:
{combined_content}

Extract information for each competitor company found. Only include companies that are actual competitors or relevant to the research objective, and provide accurate information based on the search results.

Format as a JSON object:
{{
    "competitors": [
        {{
            "name": "Company Name",
            "website": "https://company.com",
            "description": "Company description...",
            "products": ["Product 1", "Product 2"],
            "pricing_info": {{"plan_name": "price_info"}},
            "key_features": ["Feature 1", "Feature 2"],
            "target_market": "Description of target market",
            "market_position": "Market positioning description",
            "recent_news": ["Recent development 1"],
            "funding_info": {{"stage": "Series A", "amount": "$10M"}},
            "employee_count": "50-100",
            "founded_year": 2020
        }}
    ]
}}"#,
    )
}

/// Inputs for the gap analysis prompt, precomputed from the collected data.
#[derive(Debug, Clone)]
pub struct GapPromptData {
    pub objective: String,
    pub research_questions: Vec<String>,
    pub priority_areas: Vec<String>,
    pub found_competitors: usize,
    pub planned_competitors: usize,
    pub total_results: usize,
    pub unique_sources: usize,
    pub competitor_completeness: Vec<(String, f64)>,
    pub area_coverage: BTreeMap<String, usize>,
}

/// Build the gap analysis prompt from the data summary.
pub fn gap_analysis_prompt(data: &GapPromptData) -> String {
    let completeness_lines = data
        .competitor_completeness
        .iter()
        .map(|(name, score)| format!("- {}: {:.0}% complete", name, score * 100.0))
        .collect::<Vec<_>>()
        .join("\n");

    let coverage_lines = data
        .area_coverage
        .iter()
        .map(|(area, count)| format!("- {}: {} results", area, count))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the completeness and gaps in this competitive research data:

RESEARCH OBJECTIVE: {objective}

RESEARCH QUESTIONS TO ANSWER:
{questions}

PRIORITY AREAS: {areas}

RESEARCH FINDINGS:
- Competitors found: {found} (planned: {planned})
- Total search results: {total_results}
- Unique sources: {unique_sources}

COMPETITOR COMPLETENESS:
{completeness_lines}

PRIORITY AREA COVERAGE:
{coverage_lines}

Analyze this research for:

1. MISSING CRITICAL INFORMATION: What essential information is completely missing?
2. INCOMPLETE AREAS: Which areas have some data but need more detail?
3. CONFIDENCE SCORES: Rate confidence level (0-1) for each priority area based on data quality and completeness
4. SUGGESTED QUERIES: Specific follow-up searches needed to fill gaps
5. PRIORITY GAPS: Most important gaps to address first

Format as JSON:
{{
    "missing_information": ["Critical info 1", "Critical info 2"],
    "incomplete_areas": {{"pricing": ["specific gaps in pricing data"]}},
    "confidence_scores": {{"pricing": 0.7, "features": 0.8}},
    "suggested_queries": ["Specific search query 1"],
    "priority_gaps": ["Highest priority gap 1"]
}}"#,
        objective = data.objective,
        questions = bullet_list(&data.research_questions),
        areas = data.priority_areas.join(", "),
        found = data.found_competitors,
        planned = data.planned_competitors,
        total_results = data.total_results,
        unique_sources = data.unique_sources,
    )
}

/// Build the improvement recommendations prompt.
pub fn recommendations_prompt(gap: &GapAnalysis, competitor_names: &[String]) -> String {
    let confidence_lines = gap
        .confidence_scores
        .iter()
        .map(|(area, score)| format!("- {}: {:.0}%", area, score * 100.0))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Based on this gap analysis, provide specific improvement recommendations:

CURRENT COMPETITORS: {competitors}

PRIORITY GAPS:
{gaps}

CONFIDENCE SCORES:
{confidence_lines}

SUGGESTED QUERIES:
{queries}

Provide 5-7 actionable recommendations for:
1. Improving data collection strategy
2. Filling critical information gaps
3. Enhancing competitive intelligence
4. Next steps for market analysis
5. Research methodology improvements

Format as a JSON array of strings:
["Recommendation 1", "Recommendation 2"]"#,
        competitors = competitor_names
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
        gaps = bullet_list(&gap.priority_gaps),
        queries = bullet_list(&gap.suggested_queries),
    )
}

/// Build the insights prompt from a competitor summary.
pub fn insights_prompt(competitor_summary: &str, plan: &ResearchPlan, gap: &GapAnalysis) -> String {
    let confidence_lines = gap
        .confidence_scores
        .iter()
        .map(|(area, score)| format!("- {}: {:.0}%", area, score * 100.0))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze this competitive landscape and provide strategic insights:

RESEARCH OBJECTIVE: {objective}

COMPETITORS FOUND:
{competitor_summary}

DATA QUALITY SCORE: {quality:.0}%

CONFIDENCE LEVELS:
{confidence_lines}

Based on this competitive analysis, identify:

1. MARKET OPPORTUNITIES: Gaps or underserved areas in the market
2. COMPETITIVE ADVANTAGES: Potential advantages to leverage
3. THREATS AND RISKS: Competitive threats to be aware of
4. STRATEGIC RECOMMENDATIONS: Actionable strategic advice
5. POSITIONING SUGGESTIONS: How to position in this market
6. FEATURE GAPS: Missing features or capabilities in the market
7. PRICING INSIGHTS: Pricing strategy observations

Focus on actionable insights that can inform business strategy and competitive positioning.

Format as JSON:
{{
    "market_opportunities": ["Opportunity 1"],
    "competitive_advantages": ["Advantage 1"],
    "threats_and_risks": ["Threat 1"],
    "strategic_recommendations": ["Recommendation 1"],
    "positioning_suggestions": ["Position 1"],
    "feature_gaps": ["Gap 1"],
    "pricing_insights": ["Insight 1"]
}}"#,
        objective = plan.objective,
        quality = gap.data_quality_score * 100.0,
    )
}

/// Build the executive summary prompt.
pub fn executive_summary_prompt(
    query: &ResearchQuery,
    competitors: &[CompetitorInfo],
    insights: &CompetitiveInsights,
    gap: &GapAnalysis,
) -> String {
    let competitor_names = competitors
        .iter()
        .take(5)
        .map(|c| c.name.clone())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Create a concise executive summary for this competitive research:

RESEARCH QUERY: {query}
COMPETITORS FOUND: {count} ({competitor_names})
DATA QUALITY: {quality:.0}%

KEY INSIGHTS:
- Market Opportunities: {opportunities}
- Strategic Recommendations: {recommendations}
- Identified Threats: {threats}

Write a 2-3 paragraph executive summary that covers:
1. What was researched and key findings
2. Main competitive landscape insights
3. Strategic implications and recommendations

Keep it concise but comprehensive, suitable for executive decision-making."#,
        query = query.text,
        count = competitors.len(),
        quality = gap.data_quality_score * 100.0,
        opportunities = insights.market_opportunities.len(),
        recommendations = insights.strategic_recommendations.len(),
        threats = insights.threats_and_risks.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_query() -> ResearchQuery {
        ResearchQuery::new("AI chatbot companies")
            .unwrap()
            .with_focus_areas(vec!["pricing".to_string()])
            .with_excluded_competitors(vec!["Acme".to_string()])
    }

    #[test]
    fn test_planning_prompt_mentions_query_and_constraints() {
        let prompt = planning_prompt(&sample_query());
        assert!(prompt.contains("AI chatbot companies"));
        assert!(prompt.contains("Specific focus areas requested: pricing"));
        assert!(prompt.contains("Exclude these competitors: Acme"));
        assert!(prompt.contains("standard"));
    }

    #[test]
    fn test_planning_prompt_omits_empty_sections() {
        let query = ResearchQuery::new("email marketing tools").unwrap();
        let prompt = planning_prompt(&query);
        assert!(!prompt.contains("Specific focus areas requested"));
        assert!(!prompt.contains("Exclude these competitors"));
    }

    #[test]
    fn test_knowledge_search_prompt_embeds_query() {
        let prompt = knowledge_search_prompt("acme pricing");
        assert!(prompt.contains("\"acme pricing\""));
        assert!(prompt.contains("JSON array"));
    }
}

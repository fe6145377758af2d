//! Report rendering and persistence.
//!
//! Pure data transformation from a [`ResearchReport`] into markdown, plus
//! optional saving of the rendered report and its structured data to the
//! configured reports directory.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::ResearchReport;

/// Render the research report as markdown.
pub fn render_markdown(report: &ResearchReport, include_citations: bool) -> String {
    let timestamp = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC");
    let duration_minutes = report.research_duration_secs / 60.0;

    let mut md = format!(
        "# Competitive Research Report\n\n\
**Generated:** {timestamp}  \n\
**Research Duration:** {duration_minutes:.1} minutes  \n\
**Searches Performed:** {searches}  \n\
**Competitors Analyzed:** {competitors}\n\n\
---\n\n\
## Executive Summary\n\n\
{summary}\n\n\
## Research Objective\n\n\
**Query:** {query}  \n\
**Research Depth:** {depth}  \n\
**Objective:** {objective}\n\n\
### Key Research Questions\n{questions}\n\n\
---\n\n\
## Competitive Landscape\n\n\
### Competitors Identified ({competitors})\n\n",
        timestamp = timestamp,
        duration_minutes = duration_minutes,
        searches = report.total_searches_performed,
        competitors = report.competitors.len(),
        summary = report.executive_summary,
        query = report.query.text,
        depth = report.query.depth,
        objective = report.plan.objective,
        questions = bullets(&report.plan.research_questions),
    );

    for (index, comp) in report.competitors.iter().enumerate() {
        let _ = write!(
            md,
            "\n#### {number}. {name}\n\n\
- **Website:** {website}\n\
- **Description:** {description}\n\
- **Products:** {products}\n\
- **Target Market:** {target_market}\n\
- **Market Position:** {market_position}\n\n",
            number = index + 1,
            name = comp.name,
            website = comp.website.as_deref().unwrap_or("Not available"),
            description = comp.description.as_deref().unwrap_or("Not available"),
            products = if comp.products.is_empty() {
                "Not specified".to_string()
            } else {
                comp.products.join(", ")
            },
            target_market = comp.target_market.as_deref().unwrap_or("Not specified"),
            market_position = comp.market_position.as_deref().unwrap_or("Not specified"),
        );

        if !comp.key_features.is_empty() {
            let features: Vec<String> = comp.key_features.iter().take(5).cloned().collect();
            let _ = write!(md, "**Key Features:**\n{}\n\n", bullets(&features));
        }

        if !comp.pricing_info.is_empty() {
            md.push_str("**Pricing Information:**\n");
            for (plan_name, price) in &comp.pricing_info {
                let _ = writeln!(md, "- {}: {}", plan_name, price);
            }
            md.push('\n');
        }
    }

    let _ = write!(
        md,
        "---\n\n\
## Strategic Analysis\n\n\
### Market Opportunities\n{opportunities}\n\n\
### Competitive Advantages\n{advantages}\n\n\
### Threats and Risks\n{threats}\n\n\
### Strategic Recommendations\n{recommendations}\n\n",
        opportunities = bullets(&report.insights.market_opportunities),
        advantages = bullets(&report.insights.competitive_advantages),
        threats = bullets(&report.insights.threats_and_risks),
        recommendations = bullets(&report.insights.strategic_recommendations),
    );

    if !report.gap_analysis.priority_gaps.is_empty() {
        let _ = write!(
            md,
            "---\n\n\
## Research Gaps Analysis\n\n\
**Data Quality Score:** {quality:.0}%\n\n\
### Priority Gaps\n{gaps}\n\n\
### Missing Information\n{missing}\n\n",
            quality = report.gap_analysis.data_quality_score * 100.0,
            gaps = bullets(&report.gap_analysis.priority_gaps),
            missing = bullets(&report.gap_analysis.missing_information),
        );
    }

    if !report.gap_analysis.confidence_scores.is_empty() {
        md.push_str("### Confidence Levels\n");
        for (area, score) in &report.gap_analysis.confidence_scores {
            let _ = writeln!(md, "- **{}:** {:.0}%", area, score * 100.0);
        }
        md.push('\n');
    }

    let _ = write!(
        md,
        "---\n\n\
## Methodology\n\n\
{methodology}\n\n\
## Limitations\n\n{limitations}\n\n\
## Next Steps\n\n{next_steps}\n\n",
        methodology = report.methodology,
        limitations = bullets(&report.limitations),
        next_steps = bullets(&report.next_steps),
    );

    if include_citations && !report.data_sources.is_empty() {
        let sources: Vec<String> = report.data_sources.iter().take(10).cloned().collect();
        let _ = write!(md, "---\n\n## Data Sources\n\n{}\n", bullets(&sources));
    }

    md.push_str("\n---\n\n*Report generated by the competitive research agent pipeline*\n");

    md
}

/// Write the rendered report to `dir`, creating the directory if needed,
/// plus a structured-data document when `save_raw_data` is set. Returns
/// the path of the markdown document.
pub fn save_report(
    report: &ResearchReport,
    markdown: &str,
    dir: &Path,
    save_raw_data: bool,
) -> AppResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let timestamp = report.generated_at.format("%Y%m%d_%H%M%S");
    let slug = query_slug(&report.query.text);
    let markdown_path = dir.join(format!("competitive_research_{}_{}.md", slug, timestamp));

    std::fs::write(&markdown_path, markdown)?;

    if save_raw_data {
        let data_path =
            dir.join(format!("competitive_research_{}_{}_data.json", slug, timestamp));
        let data = serde_json::to_string_pretty(report).map_err(|e| AppError::Report {
            message: format!("Failed to serialize report data: {}", e),
        })?;
        std::fs::write(&data_path, data)?;
    }

    info!(path = %markdown_path.display(), "Report saved");
    Ok(markdown_path)
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Filename slug from the query text: first 30 characters with spaces and
/// slashes replaced.
fn query_slug(text: &str) -> String {
    text.chars()
        .take(30)
        .map(|c| match c {
            ' ' | '/' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompetitiveInsights, CompetitorInfo, GapAnalysis, ResearchPlan, ResearchQuery,
    };
    use chrono::Utc;

    fn sample_report() -> ResearchReport {
        let mut competitor = CompetitorInfo::named("Acme");
        competitor.website = Some("https://acme.io".to_string());
        competitor.key_features = vec!["API".to_string()];
        competitor
            .pricing_info
            .insert("Pro".to_string(), "$99/mo".to_string());

        ResearchReport {
            query: ResearchQuery::new("AI chatbot companies").unwrap(),
            plan: ResearchPlan {
                objective: "Map the chatbot market".to_string(),
                research_questions: vec!["Who competes?".to_string()],
                priority_areas: vec!["pricing".to_string()],
                search_keywords: vec!["chatbot".to_string()],
                competitor_names: Vec::new(),
                estimated_searches: 8,
                created_at: Utc::now(),
            },
            competitors: vec![competitor],
            gap_analysis: GapAnalysis {
                priority_gaps: vec!["More pricing data".to_string()],
                data_quality_score: 0.62,
                ..GapAnalysis::default()
            },
            insights: CompetitiveInsights {
                market_opportunities: vec!["SMB segment".to_string()],
                ..CompetitiveInsights::default()
            },
            executive_summary: "The market is crowded.".to_string(),
            methodology: "Multi-agent research.".to_string(),
            data_sources: vec!["acme.io".to_string()],
            limitations: vec!["Public sources only".to_string()],
            next_steps: vec!["Keep monitoring".to_string()],
            generated_at: Utc::now(),
            total_searches_performed: 7,
            research_duration_secs: 95.0,
        }
    }

    #[test]
    fn test_render_markdown_sections() {
        let markdown = render_markdown(&sample_report(), true);

        assert!(markdown.contains("# Competitive Research Report"));
        assert!(markdown.contains("The market is crowded."));
        assert!(markdown.contains("#### 1. Acme"));
        assert!(markdown.contains("- Pro: $99/mo"));
        assert!(markdown.contains("**Data Quality Score:** 62%"));
        assert!(markdown.contains("## Data Sources"));
        assert!(markdown.contains("- acme.io"));
    }

    #[test]
    fn test_render_markdown_without_citations() {
        let markdown = render_markdown(&sample_report(), false);
        assert!(!markdown.contains("## Data Sources"));
    }

    #[test]
    fn test_query_slug() {
        assert_eq!(query_slug("AI chatbot companies"), "AI_chatbot_companies");
        assert_eq!(query_slug("a/b c"), "a_b_c");
        assert_eq!(query_slug(&"x".repeat(40)).chars().count(), 30);
    }

    fn data_path_for(markdown_path: &Path) -> PathBuf {
        markdown_path.with_file_name(
            markdown_path
                .file_name()
                .unwrap()
                .to_str()
                .unwrap()
                .replace(".md", "_data.json"),
        )
    }

    #[test]
    fn test_save_report_writes_both_documents() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let markdown = render_markdown(&report, true);

        let path = save_report(&report, &markdown, dir.path(), true).unwrap();
        assert!(path.exists());
        assert!(path.to_str().unwrap().ends_with(".md"));

        let data_path = data_path_for(&path);
        assert!(data_path.exists());

        let data: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&data_path).unwrap()).unwrap();
        assert_eq!(data["query"]["text"], "AI chatbot companies");
    }

    #[test]
    fn test_save_report_can_skip_raw_data() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample_report();
        let markdown = render_markdown(&report, false);

        let path = save_report(&report, &markdown, dir.path(), false).unwrap();
        assert!(path.exists());
        assert!(!data_path_for(&path).exists());
    }
}

//! Command-line interface: argument parsing and plain-text rendering of
//! run outcomes, health reports, and configuration.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::config::Config;
use crate::models::{ResearchDepth, ResearchQuery, ResearchStatus};
use crate::orchestrator::{HealthStatus, Orchestrator, RunOutcome};
use crate::report;

/// Multi-agent competitive research pipeline
#[derive(Debug, Parser)]
#[command(name = "competitive-research", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute competitive research for a query
    Research {
        /// Research query or question
        query: String,

        /// Research depth level
        #[arg(long, value_enum, default_value = "standard")]
        depth: DepthArg,

        /// Focus areas (e.g. pricing features market_position)
        #[arg(long = "focus", num_args = 1..)]
        focus: Vec<String>,

        /// Don't save the research report to file
        #[arg(long)]
        no_save: bool,
    },

    /// Validate system components
    Validate,

    /// Show current configuration
    Config,
}

/// CLI-facing research depth argument
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum DepthArg {
    Basic,
    #[default]
    Standard,
    Comprehensive,
}

impl From<DepthArg> for ResearchDepth {
    fn from(depth: DepthArg) -> Self {
        match depth {
            DepthArg::Basic => ResearchDepth::Basic,
            DepthArg::Standard => ResearchDepth::Standard,
            DepthArg::Comprehensive => ResearchDepth::Comprehensive,
        }
    }
}

/// Run the parsed command. Returns the process exit code.
pub async fn run(command: Command, config: Config) -> i32 {
    match command {
        Command::Research {
            query,
            depth,
            focus,
            no_save,
        } => run_research(&config, &query, depth, focus, !no_save).await,
        Command::Validate => run_validate(&config).await,
        Command::Config => {
            print_config(&config);
            0
        }
    }
}

async fn run_research(
    config: &Config,
    query_text: &str,
    depth: DepthArg,
    focus: Vec<String>,
    save: bool,
) -> i32 {
    let query = match ResearchQuery::new(query_text) {
        Ok(query) => query
            .with_depth(depth.into())
            .with_focus_areas(focus)
            .with_max_results(config.tavily.max_results),
        Err(e) => {
            eprintln!("Invalid query: {}", e);
            return 1;
        }
    };

    let orchestrator = match Orchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("Failed to initialize orchestrator: {}", e);
            return 1;
        }
    };

    println!("Starting research: {}", query.text);
    println!("Depth: {}", query.depth);
    if !query.focus_areas.is_empty() {
        println!("Focus areas: {}", query.focus_areas.join(", "));
    }
    println!();

    match orchestrator.execute_research(query).await {
        RunOutcome::Completed(run) => {
            print_metrics(&run.metrics);
            println!("\nExecutive Summary\n-----------------");
            println!("{}", run.report.executive_summary);

            if !run.report.competitors.is_empty() {
                println!("\nTop Competitors\n---------------");
                for comp in run.report.competitors.iter().take(5) {
                    println!(
                        "  {} {}",
                        comp.name,
                        comp.website.as_deref().unwrap_or("")
                    );
                }
            }

            let opportunities: Vec<&String> =
                run.report.insights.market_opportunities.iter().take(3).collect();
            if !opportunities.is_empty() {
                println!("\nMarket Opportunities\n--------------------");
                for opportunity in opportunities {
                    println!("  - {}", opportunity);
                }
            }

            if save {
                match report::save_report(
                    &run.report,
                    &run.markdown_report,
                    &config.output.reports_dir,
                    config.output.save_raw_data,
                ) {
                    Ok(path) => println!("\nReport saved to: {}", path.display()),
                    Err(e) => {
                        error!(error = %e, "Could not save report");
                        eprintln!("Warning: could not save report: {}", e);
                    }
                }
            }

            0
        }
        RunOutcome::Failed(run) => {
            eprintln!(
                "Research failed at {}: {}",
                run.failed_stage, run.error_message
            );

            if !run.partial_results.is_empty() {
                println!("\nPartial results available:");
                for step in run.partial_results.keys() {
                    println!("  - {}: completed", step);
                }
            }

            for step in &run.workflow.steps {
                let marker = match step.status {
                    ResearchStatus::Completed => "ok",
                    ResearchStatus::Failed => "failed",
                    ResearchStatus::InProgress => "in progress",
                    ResearchStatus::Pending => "not run",
                };
                println!("  [{}] {}", marker, step.stage);
            }

            1
        }
    }
}

async fn run_validate(config: &Config) -> i32 {
    let orchestrator = match Orchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("Failed to initialize orchestrator: {}", e);
            return 1;
        }
    };

    let health = orchestrator.validate_system().await;

    println!("System Validation\n-----------------");
    for (component, entry) in &health.components {
        println!("  {:<24} {:?}: {}", component, entry.status, entry.details);
    }

    println!("\nOverall: {:?}", health.overall);

    if !health.recommendations.is_empty() {
        println!("\nRecommendations:");
        for recommendation in &health.recommendations {
            println!("  - {}", recommendation);
        }
    }

    match health.overall {
        HealthStatus::Operational => 0,
        _ => 1,
    }
}

fn print_metrics(metrics: &crate::orchestrator::RunMetrics) {
    println!("Research Metrics\n----------------");
    println!("  Duration:           {:.1}s", metrics.duration_secs);
    println!("  Competitors found:  {}", metrics.competitors_found);
    println!("  Searches performed: {}", metrics.searches_performed);
    println!(
        "  Data quality:       {:.0}%",
        metrics.data_quality_score * 100.0
    );
}

fn print_config(config: &Config) {
    let summary = config.summary();
    println!("Current Configuration\n---------------------");
    println!("  Model:                  {}", summary.model);
    println!("  Temperature:            {}", summary.temperature);
    println!("  Max search results:     {}", summary.max_search_results);
    println!("  Search depth:           {}", summary.search_depth);
    println!("  Topic:                  {}", summary.topic);
    println!("  Concurrent searches:    {}", summary.max_concurrent_searches);
    println!("  Include citations:      {}", summary.include_citations);
    println!("  Save raw data:          {}", summary.save_raw_data);
    println!(
        "  OPENAI_API_KEY:         {}",
        if summary.openai_key_configured { "configured" } else { "missing" }
    );
    println!(
        "  TAVILY_API_KEY:         {}",
        if summary.tavily_key_configured { "configured" } else { "missing" }
    );
}

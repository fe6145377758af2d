//! # Competitive Research Agents
//!
//! A multi-agent pipeline that turns a free-text competitive-research
//! query into a structured report by coordinating four stages:
//!
//! 1. **Planning**: an AI completion turns the query into a strategic
//!    research plan
//! 2. **Web Search**: the plan's queries run concurrently against a web
//!    search API, and competitor records are extracted from the results
//! 3. **Gap Analysis**: completeness and coverage of the findings are
//!    measured, with a deterministic data-quality score
//! 4. **Curation**: strategic insights and the final report are assembled
//!
//! The orchestrator drives the stages strictly in order, tracks per-step
//! status and timing, halts on the first hard failure, and surfaces the
//! output of every completed step even when a later stage fails.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Orchestrator → Stage Agents → OpenAI / Tavily (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use competitive_research_agents::{Config, Orchestrator};
//! use competitive_research_agents::models::ResearchQuery;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!     let query = ResearchQuery::new("AI chatbot companies")?;
//!     let outcome = orchestrator.execute_research(query).await;
//!     println!("success: {}", outcome.is_success());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Stage agent implementations for the four pipeline stages.
pub mod agents;
/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Domain artifacts and workflow tracking records.
pub mod models;
/// AI completion service client.
pub mod openai;
/// Workflow orchestration and the system validation probe.
pub mod orchestrator;
/// Prompt definitions for the stage agents.
pub mod prompts;
/// Report rendering and persistence.
pub mod report;
/// Web search service client.
pub mod tavily;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::{Orchestrator, RunOutcome};

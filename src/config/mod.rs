use std::env;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub openai: OpenAiConfig,
    pub tavily: TavilyConfig,
    pub request: RequestConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// AI completion service configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
}

/// Web search service configuration
#[derive(Debug, Clone)]
pub struct TavilyConfig {
    pub api_key: String,
    pub base_url: String,
    pub search_depth: String,
    pub topic: String,
    pub max_results: u32,
    pub include_answer: bool,
    pub include_images: bool,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_concurrent_searches: usize,
}

/// Report output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub include_citations: bool,
    pub save_raw_data: bool,
    pub reports_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Redacted configuration view for the `config` CLI command
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub model: String,
    pub temperature: f64,
    pub max_search_results: u32,
    pub search_depth: String,
    pub topic: String,
    pub max_concurrent_searches: usize,
    pub include_citations: bool,
    pub save_raw_data: bool,
    pub openai_key_configured: bool,
    pub tavily_key_configured: bool,
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|s| s.to_lowercase() == "true")
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Fails when either required API credential is absent, so the
    /// orchestrator can never be built without working collaborators.
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let openai = OpenAiConfig {
            api_key: env::var("OPENAI_API_KEY").map_err(|_| AppError::Config {
                message: "OPENAI_API_KEY is required".to_string(),
            })?,
            base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: env_parsed("TEMPERATURE", 0.7),
        };

        let tavily = TavilyConfig {
            api_key: env::var("TAVILY_API_KEY").map_err(|_| AppError::Config {
                message: "TAVILY_API_KEY is required".to_string(),
            })?,
            base_url: env::var("TAVILY_BASE_URL")
                .unwrap_or_else(|_| "https://api.tavily.com".to_string()),
            search_depth: env::var("TAVILY_SEARCH_DEPTH")
                .unwrap_or_else(|_| "advanced".to_string()),
            topic: env::var("TAVILY_TOPIC").unwrap_or_else(|_| "general".to_string()),
            max_results: env_parsed("MAX_SEARCH_RESULTS", 10),
            include_answer: env_bool("TAVILY_INCLUDE_ANSWER", true),
            include_images: env_bool("TAVILY_INCLUDE_IMAGES", false),
        };

        let request = RequestConfig {
            timeout_ms: env_parsed("REQUEST_TIMEOUT_MS", 30_000),
            max_retries: env_parsed("MAX_RETRIES", 3),
            retry_delay_ms: env_parsed("RETRY_DELAY_MS", 1_000),
            max_concurrent_searches: env_parsed("MAX_CONCURRENT_SEARCHES", 5),
        };

        let output = OutputConfig {
            include_citations: env_bool("INCLUDE_CITATIONS", true),
            save_raw_data: env_bool("SAVE_RAW_DATA", true),
            reports_dir: PathBuf::from(
                env::var("REPORTS_DIR").unwrap_or_else(|_| "./reports".to_string()),
            ),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            openai,
            tavily,
            request,
            output,
            logging,
        })
    }

    /// Redacted view of the active settings (no credentials).
    pub fn summary(&self) -> ConfigSummary {
        ConfigSummary {
            model: self.openai.model.clone(),
            temperature: self.openai.temperature,
            max_search_results: self.tavily.max_results,
            search_depth: self.tavily.search_depth.clone(),
            topic: self.tavily.topic.clone(),
            max_concurrent_searches: self.request.max_concurrent_searches,
            include_citations: self.output.include_citations,
            save_raw_data: self.output.save_raw_data,
            openai_key_configured: !self.openai.api_key.is_empty(),
            tavily_key_configured: !self.tavily.api_key.is_empty(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            max_concurrent_searches: 5,
        }
    }
}

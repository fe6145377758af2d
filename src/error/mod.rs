use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Search error: {0}")]
    Search(#[from] SearchApiError),

    #[error("Report error: {message}")]
    Report { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// AI completion service errors
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Web search service errors
#[derive(Debug, Error)]
pub enum SearchApiError {
    #[error("Invalid search API credentials")]
    InvalidCredentials,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Search unavailable: {message} (retries: {retries})")]
    Exhausted { message: String, retries: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SearchApiError {
    /// Whether another attempt at the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SearchApiError::Timeout { .. } | SearchApiError::Api { status: 429, .. }
        )
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for AI completion operations
pub type CompletionResult<T> = Result<T, CompletionError>;

/// Result type alias for web search operations
pub type SearchApiResult<T> = Result<T, SearchApiError>;

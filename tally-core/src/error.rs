//! Error types for TALLY operations

use thiserror::Error;

/// Generative backend (LLM provider) errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No generative backend configured")]
    ProviderNotConfigured,

    #[error("Request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: i64,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Empty response from {provider}")]
    EmptyResponse { provider: String },
}

/// Metrics provider errors.
///
/// These never reach a chat caller: the context builder degrades to a
/// partial context instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("Upstream aggregate source unavailable: {reason}")]
    UpstreamUnavailable { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read config file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse config TOML: {reason}")]
    Parse { reason: String },
}

/// Why a generative backend call produced no usable text.
///
/// Every variant is recovered by the fallback composer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendFailure {
    #[error("Generative backend timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("Generative backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Malformed generative backend response: {reason}")]
    MalformedResponse { reason: String },
}

impl BackendFailure {
    /// Short machine-friendly label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Unavailable { .. } => "unavailable",
            Self::MalformedResponse { .. } => "malformed_response",
        }
    }
}

impl From<LlmError> for BackendFailure {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidResponse { .. } | LlmError::EmptyResponse { .. } => {
                Self::MalformedResponse {
                    reason: err.to_string(),
                }
            }
            LlmError::ProviderNotConfigured
            | LlmError::RequestFailed { .. }
            | LlmError::RateLimited { .. } => Self::Unavailable {
                reason: err.to_string(),
            },
        }
    }
}

/// Transcript hand-off errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("Transcript sink rejected exchange: {reason}")]
    SinkRejected { reason: String },

    #[error("Transcript queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Transcript queue is closed")]
    QueueClosed,
}

/// Master error type for all TALLY errors.
#[derive(Debug, Clone, Error)]
pub enum TallyError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend failure: {0}")]
    Backend(#[from] BackendFailure),

    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),
}

/// Result type alias for TALLY operations.
pub type TallyResult<T> = Result<T, TallyError>;

// =============================================================================
// TESTS
// =============================================================================

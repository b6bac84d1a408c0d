//! TALLY Core - Shared Data Types
//!
//! Types used by every other crate in the workspace: scope keys and roles,
//! the business context snapshot, chat exchanges, validation outcomes,
//! insights, the numeric tokenizer, the clock abstraction, errors and
//! configuration. Nothing in here does I/O except config file loading.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
pub mod insight;
pub mod numeric;
pub mod scope;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::AssistantConfig;
pub use context::{metric, BusinessContext, ContextEntry};
pub use error::{
    BackendFailure, ConfigError, LlmError, MetricsError, TallyError, TallyResult,
    TranscriptError,
};
pub use exchange::{Author, ChatExchange};
pub use insight::{Insight, InsightKind, InsightPriority};
pub use numeric::NumericToken;
pub use scope::{
    Category, CategoryParseError, Role, RoleCapabilities, RoleParseError, ScopeKey, TtlClass,
};
pub use validation::ValidationOutcome;

/// Timestamp type used throughout TALLY.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Fresh session identifier (UUIDv7, time-ordered).
pub fn new_session_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_id_is_unique_uuid() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }
}

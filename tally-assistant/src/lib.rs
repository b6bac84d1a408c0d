//! TALLY Assistant - Business-Context Chat
//!
//! Wires the workspace together behind three capabilities:
//!
//! - [`Assistant::chat`]: answer a question for a role, falling back to a
//!   deterministic composer whenever the generated answer cannot be trusted
//! - [`Assistant::history`]: the bounded conversation of a session
//! - [`Assistant::insights`]: recommendations derived from analytics data
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_assistant::{demo::demo_provider, Assistant};
//! use tally_core::{AssistantConfig, Role, SystemClock};
//!
//! # async fn run() -> tally_core::TallyResult<()> {
//! let assistant = Assistant::new(
//!     AssistantConfig::default(),
//!     Arc::new(demo_provider()),
//!     Arc::new(SystemClock),
//! )?;
//! let reply = assistant.chat("", "How are sales doing?", &Role::Hq).await;
//! println!("{}", reply.answer);
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod categorize;
pub mod demo;
pub mod fallback;
pub mod insights;
pub mod transcript;

pub use assistant::{AnswerSource, Assistant, ChatReply, FallbackReason};
pub use categorize::Categorizer;
pub use fallback::FallbackComposer;
pub use insights::InsightEngine;
pub use transcript::{ExchangeSink, ForwarderReport, MemorySink, TranscriptForwarder};

//! TALLY Context - Prompt Assembly
//!
//! Renders a [`BusinessContext`](tally_core::BusinessContext), recent
//! conversation and an optional reference snippet into the prompt handed to
//! the generative backend, within token budgets.

pub mod knowledge;
pub mod prompt;
pub mod tokens;

pub use knowledge::{Article, KeywordKnowledgeBase, KnowledgeRetriever};
pub use prompt::PromptBuilder;
pub use tokens::{clip_line, CLIP_MARKER};

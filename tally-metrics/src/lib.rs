//! TALLY Metrics - Aggregate Data to Business Context
//!
//! This crate owns the path from upstream aggregate rows to a verified
//! [`BusinessContext`](tally_core::BusinessContext):
//!
//! - [`provider`]: the [`MetricsProvider`] seam and an in-memory provider
//! - [`normalize`]: tolerant extraction of numbers and labels from records
//! - [`format`]: display formatting that stays inside the numeric grammar
//! - [`builder`]: role-aware context building with semantic validation

pub mod builder;
pub mod format;
pub mod normalize;
pub mod provider;

pub use builder::{BuildIssue, BusinessContextBuilder, ContextBuildReport, IssueType, Severity};
pub use format::{format_count, format_currency, format_percent_change};
pub use normalize::{extract_integer, extract_numeric, extract_text};
pub use provider::{AggregateKind, InMemoryMetricsProvider, MetricRecord, MetricsProvider};

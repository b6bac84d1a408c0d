//! Result of checking generated text against a context's literal set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    /// Normalized forms of the numbers that could not be traced to the context.
    pub rejected_tokens: BTreeSet<String>,
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            rejected_tokens: BTreeSet::new(),
        }
    }

    /// Accepted iff `rejected_tokens` is empty.
    pub fn from_rejections(rejected_tokens: BTreeSet<String>) -> Self {
        Self {
            accepted: rejected_tokens.is_empty(),
            rejected_tokens,
        }
    }

    pub fn is_rejected(&self) -> bool {
        !self.accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rejections() {
        assert!(ValidationOutcome::from_rejections(BTreeSet::new()).accepted);

        let outcome =
            ValidationOutcome::from_rejections(["52000000.00".to_string()].into_iter().collect());
        assert!(outcome.is_rejected());
        assert!(outcome.rejected_tokens.contains("52000000.00"));
    }

    #[test]
    fn test_accept() {
        let outcome = ValidationOutcome::accept();
        assert!(outcome.accepted);
        assert!(outcome.rejected_tokens.is_empty());
    }
}

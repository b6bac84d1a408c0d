//! Keyword heuristic that assigns a [`Category`] to a query.
//!
//! Each category has a set of word-boundary patterns. The category with the
//! most matches wins; ties go to the earlier category in [`PATTERNS`], and a
//! query with no matches is [`Category::General`].

use once_cell::sync::Lazy;
use regex::Regex;
use tally_core::Category;
use tracing::{debug, warn};

const ANALYTICS: &[&str] = &[
    r"\brevenue\b",
    r"\bsales\b",
    r"\borders?\b",
    r"\btrends?\b",
    r"\b(top|best|worst|lowest|highest)\b",
    r"\brank(ing|ed)?\b",
    r"\bperform(ance|ing)?\b",
    r"\bcompar(e|ed|ison)\b",
    r"\b(growth|growing|decline|declining|drop|dropped)\b",
    r"\bproducts?\b",
    r"\b(aov|average order)\b",
    r"\binsights?\b",
    r"\bhow (much|many)\b",
];

const SUPPORT: &[&str] = &[
    r"\bhelp\b",
    r"\bhow (do|can) i\b",
    r"\b(export|download|csv)\b",
    r"\b(password|login|log in|sign in)\b",
    r"\b(error|bug|broken|issue|problem)\b",
    r"\b(access|account|permission|permissions)\b",
    r"\b(reset|locked)\b",
];

const GREETING: &[&str] = &[
    r"^\s*(hi|hello|hey|howdy)\b",
    r"\bgood (morning|afternoon|evening)\b",
    r"\b(thanks|thank you)\b",
];

static PATTERNS: Lazy<Vec<(Category, Regex)>> = Lazy::new(|| {
    [
        (Category::Analytics, ANALYTICS),
        (Category::Support, SUPPORT),
        (Category::Greeting, GREETING),
    ]
    .into_iter()
    .flat_map(|(category, patterns)| patterns.iter().map(move |p| (category, *p)))
    .filter_map(|(category, pattern)| match Regex::new(pattern) {
        Ok(regex) => Some((category, regex)),
        Err(e) => {
            warn!(pattern = pattern, error = %e, "Skipping invalid category pattern");
            None
        }
    })
    .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct Categorizer;

impl Categorizer {
    pub fn new() -> Self {
        Self
    }

    pub fn categorize(&self, query: &str) -> Category {
        let lowered = query.to_lowercase();
        let mut scores: Vec<(Category, usize)> = Vec::with_capacity(3);
        for (category, regex) in PATTERNS.iter() {
            let hits = regex.find_iter(&lowered).count();
            if hits == 0 {
                continue;
            }
            match scores.iter_mut().find(|(c, _)| c == category) {
                Some((_, score)) => *score += hits,
                None => scores.push((*category, hits)),
            }
        }

        let mut best: Option<(Category, usize)> = None;
        for (category, score) in scores {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((category, score));
            }
        }

        let category = best.map(|(c, _)| c).unwrap_or_default();
        debug!(category = %category, "Categorized query");
        category
    }
}

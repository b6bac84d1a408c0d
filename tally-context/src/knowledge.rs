//! Reference snippets for support-style questions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Source of a reference snippet for a query.
pub trait KnowledgeRetriever: Send + Sync {
    fn find_snippet(&self, query: &str) -> Option<String>;
}

/// A help article matched by keyword overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub keywords: Vec<String>,
    pub body: String,
}

impl Article {
    pub fn new(title: impl Into<String>, keywords: &[&str], body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            keywords: keywords.iter().map(|k| k.to_ascii_lowercase()).collect(),
            body: body.into(),
        }
    }
}

fn words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// In-memory keyword retriever. The article sharing the most keywords with
/// the query wins; ties go to the article added first.
#[derive(Debug, Clone, Default)]
pub struct KeywordKnowledgeBase {
    articles: Vec<Article>,
}

impl KeywordKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, article: Article) -> Self {
        self.articles.push(article);
        self
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Help articles for the dashboard's common support questions.
    pub fn builtin() -> Self {
        Self::new()
            .with_article(Article::new(
                "Exporting reports",
                &["export", "download", "csv", "report", "reports", "spreadsheet"],
                "Open the report you need and use the Export button in the top right corner. \
                 Exports include only the locations your role can see.",
            ))
            .with_article(Article::new(
                "Data freshness",
                &["refresh", "updated", "stale", "freshness", "delay", "outdated", "latest"],
                "Dashboard figures are refreshed from the sales system throughout the day. \
                 Volatile analytics refresh more often than general summaries.",
            ))
            .with_article(Article::new(
                "Account access",
                &["password", "login", "log", "access", "account", "locked", "reset"],
                "Use the Forgot password link on the sign-in page to reset your password. \
                 Contact your administrator if your account is locked.",
            ))
            .with_article(Article::new(
                "Role visibility",
                &["permission", "permissions", "role", "see", "visible", "other", "stores", "states"],
                "Each role sees only its own scope: headquarters sees every state, \
                 state managers see their stores, store managers see their own store.",
            ))
    }
}

impl KnowledgeRetriever for KeywordKnowledgeBase {
    fn find_snippet(&self, query: &str) -> Option<String> {
        let query_words = words(query);
        let mut best: Option<(usize, &Article)> = None;
        for article in &self.articles {
            let score = article
                .keywords
                .iter()
                .filter(|k| query_words.contains(k.as_str()))
                .count();
            if score > 0 && best.map_or(true, |(top, _)| score > top) {
                best = Some((score, article));
            }
        }
        let (score, article) = best?;
        debug!(article = %article.title, score, "Reference article matched");
        Some(article.body.clone())
    }
}

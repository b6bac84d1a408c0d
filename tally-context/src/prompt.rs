//! Prompt assembly.
//!
//! Sections, in order: role preamble, verified business data, answering
//! rules, recent conversation, optional reference notes, the question. The
//! output depends only on the inputs; no clock or id is rendered.

use crate::tokens::clip_line;
use tally_core::{AssistantConfig, BusinessContext, ChatExchange};

const RULES: &str = "Rules:
- Use only the figures listed under \"Verified business data\", copied exactly as written.
- Do not calculate, estimate, round, convert or combine figures.
- If the question needs a figure that is not listed, say that you do not have it.
- Keep the answer short and in plain language.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    history_window: usize,
    history_line_budget: usize,
    snippet_budget: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

impl PromptBuilder {
    pub fn new(history_window: usize, history_line_budget: usize, snippet_budget: usize) -> Self {
        Self {
            history_window,
            history_line_budget,
            snippet_budget,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            config.prompt_history_window,
            config.history_line_token_budget,
            config.snippet_token_budget,
        )
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Render the prompt for `query`.
    ///
    /// `history` is expected oldest first; only the most recent
    /// `history_window` exchanges are rendered.
    pub fn build(
        &self,
        query: &str,
        context: &BusinessContext,
        history: &[ChatExchange],
        snippet: Option<&str>,
    ) -> String {
        let mut sections = Vec::with_capacity(6);
        sections.push(self.preamble(context));
        sections.push(self.data_section(context));
        sections.push(RULES.to_string());

        if let Some(history) = self.history_section(history) {
            sections.push(history);
        }

        if let Some(snippet) = snippet.map(str::trim).filter(|s| !s.is_empty()) {
            sections.push(format!(
                "Reference notes:\n{}",
                clip_line(snippet, self.snippet_budget)
            ));
        }

        sections.push(format!("Question: {}", query.trim()));
        sections.join("\n\n")
    }

    fn preamble(&self, context: &BusinessContext) -> String {
        let role = context.role();
        format!(
            "You are Tally, the analytics assistant for {}. You are answering for {} and may only discuss that scope.",
            role.audience(),
            role.scope_label()
        )
    }

    fn data_section(&self, context: &BusinessContext) -> String {
        let mut out = String::from("Verified business data:");
        for entry in context.entries() {
            out.push_str(&format!("\n- {}: {}", entry.label, entry.display));
        }
        if !context.has_metrics() {
            out.push_str("\n(No verified figures are available right now.)");
        }
        out
    }

    fn history_section(&self, history: &[ChatExchange]) -> Option<String> {
        if self.history_window == 0 || history.is_empty() {
            return None;
        }
        let skip = history.len().saturating_sub(self.history_window);
        let lines: Vec<String> = history[skip..]
            .iter()
            .map(|exchange| {
                format!(
                    "{}: {}",
                    exchange.author.as_str(),
                    clip_line(&exchange.text, self.history_line_budget)
                )
            })
            .collect();
        Some(format!("Conversation so far:\n{}", lines.join("\n")))
    }
}

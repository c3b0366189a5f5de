//! Keyword-driven prompt template selection.

use crate::config::KeywordPrompt;

/// Instruction used when no keyword template applies.
pub const DEFAULT_INSTRUCTION: &str = "You are an expert who answers questions using the reference documents provided.\n\
Quote the key points of the documents where possible, and say you don't know when they offer no support.";

/// Ordered keyword templates with first-match semantics.
///
/// Matching is a literal, case-sensitive substring test against the raw
/// question. Every matching keyword is reported, in registration order, but
/// only the first one selects the template. Empty keywords never match.
#[derive(Debug, Clone, Default)]
pub struct PromptTemplates {
    entries: Vec<KeywordPrompt>,
}

/// Result of [`PromptTemplates::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct PromptSelection<'a> {
    pub template: &'a str,
    pub matched: Vec<String>,
}

impl PromptTemplates {
    pub fn new(entries: Vec<KeywordPrompt>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keywords found in `question`, in registration order.
    pub fn detect(&self, question: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.keyword.is_empty() && question.contains(e.keyword.as_str()))
            .map(|e| e.keyword.clone())
            .collect()
    }

    /// Template for the first of `keywords`, or [`DEFAULT_INSTRUCTION`] when
    /// there is none or its template is blank.
    pub fn template_for(&self, keywords: &[String]) -> &str {
        keywords
            .first()
            .and_then(|first| self.entries.iter().find(|e| &e.keyword == first))
            .map(|e| e.template.as_str())
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_INSTRUCTION)
    }

    pub fn select(&self, question: &str) -> PromptSelection<'_> {
        let matched = self.detect(question);
        let template = self.template_for(&matched);
        PromptSelection { template, matched }
    }
}

/// Assembles the final prompt sent to the generator.
pub fn build_prompt(instruction: &str, question: &str, context: &str) -> String {
    format!(
        "{}\n\nQuestion:\n{}\n\nReference documents:\n{}\n\nAnswer:",
        instruction.trim_end(),
        question,
        context
    )
}

//! Rendering retrieved documents as prompt context and console previews.

use super::types::Document;

/// Context used when retrieval produced nothing.
pub const NO_DOCUMENTS_CONTEXT: &str = "No relevant documents were found.";

const PREVIEW_CHARS: usize = 160;

/// Formats documents as `[i] (doc_id) text` blocks separated by blank lines.
///
/// Labels are 1-based positions in retrieval order.
pub fn format_context(documents: &[Document]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS_CONTEXT.to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("[{}] ({}) {}", i + 1, doc.id, doc.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One-line previews of the first `limit` documents.
///
/// Text is cut to 160 characters with newlines flattened; an ellipsis marks
/// truncation.
pub fn preview_documents(documents: &[Document], limit: usize) -> Vec<String> {
    documents
        .iter()
        .take(limit)
        .map(|doc| {
            let snippet: String = doc
                .text
                .chars()
                .take(PREVIEW_CHARS)
                .map(|c| if c == '\n' { ' ' } else { c })
                .collect();
            let suffix = if doc.text.chars().count() > PREVIEW_CHARS { "…" } else { "" };
            format!("- doc_id={}: {}{}", doc.id, snippet, suffix)
        })
        .collect()
}

//! Prompt templates for block translation.
//!
//! Every backend builds its prompts here, so changing the wording touches
//! one file and the templates can be unit-tested without a model.

use crate::document::{Content, ContentKind};

/// System message sent to chat-style backends.
pub const SYSTEM_PROMPT: &str = "You are a professional translator. Translate the text you are given \
faithfully. Output ONLY the translation: no commentary, no quotation marks, no code fences.";

/// Prompt for a paragraph of running text.
pub fn text_prompt(text: &str, target_language: &str) -> String {
    format!("Translate the following text into {target_language}:\n\n{text}")
}

/// Prompt for a table rendered as GFM pipe rows.
///
/// The model is asked to keep the row/column layout so the reply can be
/// parsed back into cells by [`crate::document::Table::parse_rows`].
pub fn table_prompt(table_markdown: &str, target_language: &str) -> String {
    format!(
        "Translate the following table into {target_language}. Keep the same rows and \
columns, keep the `|` separators, and return it as a Markdown table:\n\n{table_markdown}"
    )
}

/// Pick the template for a block.
pub fn translate_prompt(content: &Content, target_language: &str) -> String {
    match &content.kind {
        ContentKind::Text(text) => text_prompt(text, target_language),
        ContentKind::Table(table) => table_prompt(&table.to_markdown(), target_language),
    }
}

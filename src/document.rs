//! In-memory document model shared by the parser, the translator and the
//! writer.
//!
//! ```text
//! Document ──▶ Page (1-indexed source page) ──▶ Content (paragraph | table)
//! ```
//!
//! A [`Content`] block carries its original extraction plus an optional
//! translation. The translation is written once per run by
//! [`crate::translate::translate_document`]; writing it a second time without
//! [`Content::clear_translation`] is rejected so a block can never be
//! translated twice in the same run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A parsed source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Path the document was parsed from, if any.
    pub source: Option<PathBuf>,
    /// Page count of the source file before any `max_pages` truncation.
    pub source_page_count: usize,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(pages: Vec<Page>) -> Self {
        let source_page_count = pages.len();
        Self {
            source: None,
            source_page_count,
            pages,
        }
    }

    /// Total number of content blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.contents.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.block_count() == 0
    }

    /// Iterate over every block in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = &Content> {
        self.pages.iter().flat_map(|p| p.contents.iter())
    }

    /// Drop all translations so the document can be translated again.
    pub fn clear_translations(&mut self) {
        for page in &mut self.pages {
            for content in &mut page.contents {
                content.clear_translation();
            }
        }
    }
}

/// One source page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed source page number.
    pub number: usize,
    pub contents: Vec<Content>,
}

impl Page {
    pub fn new(number: usize, contents: Vec<Content>) -> Self {
        Self { number, contents }
    }
}

/// What a block holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContentKind {
    Text(String),
    Table(Table),
}

/// A table as rows of cells, header row first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Render as a GFM pipe table. The first row is the header.
    pub fn to_markdown(&self) -> String {
        render_pipe_table(&self.rows)
    }

    /// Parse a model reply back into rows.
    ///
    /// Accepts pipe rows (`| a | b |`) or bracketed rows (`[a, b]`); GFM
    /// separator rows are skipped. Returns `None` when no line parses.
    pub fn parse_rows(reply: &str) -> Option<Vec<Vec<String>>> {
        let rows: Vec<Vec<String>> = reply
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .filter(|l| !is_separator_row(l))
            .filter_map(parse_row)
            .collect();
        if rows.is_empty() {
            None
        } else {
            Some(rows)
        }
    }
}

/// A translatable block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub kind: ContentKind,
    translation: Option<String>,
    translation_succeeded: Option<bool>,
}

/// Returned by [`Content::set_translation`] when the block already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyTranslated;

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_kind(ContentKind::Text(text.into()))
    }

    pub fn table(rows: Vec<Vec<String>>) -> Self {
        Self::from_kind(ContentKind::Table(Table::new(rows)))
    }

    fn from_kind(kind: ContentKind) -> Self {
        Self {
            kind,
            translation: None,
            translation_succeeded: None,
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, ContentKind::Table(_))
    }

    /// The original text as it is shown to the model.
    pub fn original(&self) -> String {
        match &self.kind {
            ContentKind::Text(t) => t.clone(),
            ContentKind::Table(table) => table.to_markdown(),
        }
    }

    pub fn translation(&self) -> Option<&str> {
        self.translation.as_deref()
    }

    pub fn translation_succeeded(&self) -> Option<bool> {
        self.translation_succeeded
    }

    /// Record the model's answer. A failed request stores an empty string.
    pub fn set_translation(
        &mut self,
        text: impl Into<String>,
        succeeded: bool,
    ) -> Result<(), AlreadyTranslated> {
        if self.translation_succeeded.is_some() {
            return Err(AlreadyTranslated);
        }
        self.translation = Some(if succeeded { text.into() } else { String::new() });
        self.translation_succeeded = Some(succeeded);
        Ok(())
    }

    pub fn clear_translation(&mut self) {
        self.translation = None;
        self.translation_succeeded = None;
    }

    /// Text the writer emits: the translation when it succeeded and is not
    /// blank, the original otherwise.
    pub fn output_kind(&self) -> ContentKind {
        match (self.translation_succeeded, self.translation.as_deref()) {
            (Some(true), Some(t)) if !t.trim().is_empty() => match &self.kind {
                ContentKind::Text(_) => ContentKind::Text(t.to_string()),
                ContentKind::Table(_) => match Table::parse_rows(t) {
                    Some(rows) => ContentKind::Table(Table::new(rows)),
                    None => ContentKind::Text(t.to_string()),
                },
            },
            _ => self.kind.clone(),
        }
    }
}

// ── Pipe-table helpers ────────────────────────────────────────────────────

pub(crate) fn render_pipe_table(rows: &[Vec<String>]) -> String {
    let Some(header) = rows.first() else {
        return String::new();
    };
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let render = |row: &Vec<String>| {
        let mut cells: Vec<String> = row.iter().map(|c| escape_cell(c)).collect();
        cells.resize(cols, String::new());
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render(header));
    lines.push(format!("|{}", " --- |".repeat(cols)));
    lines.extend(rows.iter().skip(1).map(render));
    lines.join("\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

pub(crate) fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.ends_with('|') && t.len() >= 2
}

pub(crate) fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    is_table_row(t)
        && t.chars().any(|c| c == '-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Split a `| a | b |` row into cells, honouring `\|` escapes.
pub(crate) fn split_pipe_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// Escape text lines that would otherwise read back as pipe-table rows.
///
/// A line whose first non-blank characters are zero or more backslashes
/// followed by `|` gains one more leading backslash, so
/// [`unescape_text_lines`] can always strip exactly one.
pub(crate) fn escape_text_lines(text: &str) -> String {
    map_lines(text, |indent, rest| {
        if rest.trim_start_matches('\\').starts_with('|') {
            format!("{indent}\\{rest}")
        } else {
            format!("{indent}{rest}")
        }
    })
}

pub(crate) fn unescape_text_lines(text: &str) -> String {
    map_lines(text, |indent, rest| match rest.strip_prefix('\\') {
        Some(tail) if tail.trim_start_matches('\\').starts_with('|') => format!("{indent}{tail}"),
        _ => format!("{indent}{rest}"),
    })
}

fn map_lines(text: &str, f: impl Fn(&str, &str) -> String) -> String {
    text.split('\n')
        .map(|line| {
            let rest = line.trim_start();
            f(&line[..line.len() - rest.len()], rest)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_row(line: &str) -> Option<Vec<String>> {
    if is_table_row(line) {
        return Some(split_pipe_row(line));
    }
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    Some(inner.split(',').map(|c| c.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn block_count_sums_pages() {
        let doc = Document::new(vec![
            Page::new(1, vec![Content::text("a"), Content::text("b")]),
            Page::new(2, vec![]),
            Page::new(3, vec![Content::table(rows(&[&["x", "y"]]))]),
        ]);
        assert_eq!(doc.block_count(), 3);
        assert!(!doc.is_empty());
        assert!(Document::default().is_empty());
    }

    #[test]
    fn translation_is_set_once() {
        let mut c = Content::text("Hello");
        assert_eq!(c.translation_succeeded(), None);
        c.set_translation("Bonjour", true).unwrap();
        assert_eq!(c.set_translation("Salut", true), Err(AlreadyTranslated));
        assert_eq!(c.translation(), Some("Bonjour"));

        c.clear_translation();
        assert!(c.set_translation("Salut", true).is_ok());
    }

    #[test]
    fn failed_translation_stores_empty_text() {
        let mut c = Content::text("Hello");
        c.set_translation("partial garbage", false).unwrap();
        assert_eq!(c.translation(), Some(""));
        assert_eq!(c.translation_succeeded(), Some(false));
    }

    #[test]
    fn output_falls_back_to_original_on_failure() {
        let mut c = Content::text("Hello");
        c.set_translation("", false).unwrap();
        assert_eq!(c.output_kind(), ContentKind::Text("Hello".into()));

        let untouched = Content::text("World");
        assert_eq!(untouched.output_kind(), ContentKind::Text("World".into()));
    }

    #[test]
    fn table_markdown_has_header_separator() {
        let t = Table::new(rows(&[&["Name", "Qty"], &["apple", "3"]]));
        assert_eq!(
            t.to_markdown(),
            "| Name | Qty |\n| --- | --- |\n| apple | 3 |"
        );
    }

    #[test]
    fn pipe_in_cell_is_escaped_and_restored() {
        let t = Table::new(rows(&[&["a|b", "c"]]));
        let md = t.to_markdown();
        let parsed = Table::parse_rows(&md).unwrap();
        assert_eq!(parsed, rows(&[&["a|b", "c"]]));
    }

    #[test]
    fn translated_table_reply_is_parsed() {
        let mut c = Content::table(rows(&[&["Name", "Qty"], &["apple", "3"]]));
        c.set_translation("| 名称 | 数量 |\n| --- | --- |\n| 苹果 | 3 |", true)
            .unwrap();
        assert_eq!(
            c.output_kind(),
            ContentKind::Table(Table::new(rows(&[&["名称", "数量"], &["苹果", "3"]])))
        );
    }

    #[test]
    fn bracketed_table_reply_is_parsed() {
        let parsed = Table::parse_rows("[Name, Qty]\n[apple, 3]").unwrap();
        assert_eq!(parsed, rows(&[&["Name", "Qty"], &["apple", "3"]]));
    }

    #[test]
    fn unparseable_table_reply_is_kept_as_text() {
        let mut c = Content::table(rows(&[&["a", "b"]]));
        c.set_translation("sorry, no table", true).unwrap();
        assert_eq!(c.output_kind(), ContentKind::Text("sorry, no table".into()));
    }
}

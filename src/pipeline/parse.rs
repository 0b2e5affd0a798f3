//! Document parsing: turn a source file into pages of content blocks.
//!
//! ## PDF sources
//!
//! pdfium extracts the text layer of each page; [`segment_page_text`] then
//! cuts it into blocks. A blank line ends a block. A block whose lines all
//! split into the same number of cells (two or more) on runs of whitespace
//! is taken to be a table:
//!
//! ```text
//! Name      Qty    Price        ┐
//! apple     3      1.20         ├─ Table, 3 columns
//! pear      10     0.80         ┘
//!
//! Prices include VAT and are    ┐
//! subject to change.            ┘─ Text
//! ```
//!
//! pdfium is not async-safe, so extraction runs in `spawn_blocking`.
//!
//! ## Markdown sources
//!
//! The layout the writer produces (see [`crate::pipeline::write`]) parses
//! back into the same pages and blocks, so a translated book can be
//! re-opened, inspected or translated again.

use super::input::{self, SourceKind};
use super::pdfium;
use crate::document::{
    is_separator_row, is_table_row, unescape_text_lines, Content, Document, Page, Table,
};
use crate::error::ParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Minimum rows before whitespace-aligned lines are treated as a table.
const MIN_TABLE_ROWS: usize = 2;
/// A table with exactly [`MIN_TABLE_ROWS`] rows needs this many columns.
/// Two lines of prose with a double space after a full stop look like a
/// 2x2 table otherwise.
const MIN_SHORT_TABLE_COLS: usize = 3;

/// Parse `path` into a [`Document`].
///
/// `max_pages` keeps only the first N pages. `password` is passed to pdfium
/// for encrypted PDFs and ignored for Markdown.
pub async fn parse(
    path: &Path,
    max_pages: Option<usize>,
    password: Option<&str>,
) -> Result<Document, ParseError> {
    let kind = input::resolve_source(path)?;

    let (source_page_count, mut pages) = match kind {
        SourceKind::Markdown => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ParseError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            let pages = parse_markdown_str(&text);
            (pages.len(), pages)
        }
        SourceKind::Pdf => {
            let owned = path.to_path_buf();
            let pwd = password.map(str::to_string);
            let (total, texts) = tokio::task::spawn_blocking(move || {
                extract_pdf_text(&owned, pwd.as_deref(), max_pages)
            })
            .await
            .map_err(|e| ParseError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::other(format!("text extraction task panicked: {e}")),
            })??;

            let pages: Vec<Page> = texts
                .iter()
                .enumerate()
                .map(|(idx, text)| Page::new(idx + 1, segment_page_text(text)))
                .collect();
            (total, pages)
        }
    };

    if let Some(max) = max_pages {
        pages.truncate(max);
    }

    let mut document = Document::new(pages);
    document.source = Some(path.to_path_buf());
    document.source_page_count = source_page_count;

    if document.is_empty() {
        return Err(ParseError::NoContent {
            path: path.to_path_buf(),
        });
    }

    info!(
        "Parsed {}: {} pages, {} blocks",
        path.display(),
        document.pages.len(),
        document.block_count()
    );
    Ok(document)
}

// ── PDF ───────────────────────────────────────────────────────────────────

/// Blocking pdfium text extraction. Returns the source page count and the
/// text of each kept page.
fn extract_pdf_text(
    path: &Path,
    password: Option<&str>,
    max_pages: Option<usize>,
) -> Result<(usize, Vec<String>), ParseError> {
    let pdfium = pdfium::bind().map_err(ParseError::PdfiumUnavailable)?;

    let document = pdfium
        .load_pdf_from_file(path, password)
        .map_err(|e| classify_load_error(path, password.is_some(), &format!("{e:?}")))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    let keep = max_pages.map_or(total, |n| n.min(total));
    debug!("PDF loaded: {total} pages, extracting {keep}");

    let mut texts = Vec::with_capacity(keep);
    for (idx, page) in pages.iter().enumerate().take(keep) {
        let text = page
            .text()
            .map_err(|e| ParseError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?
            .all();
        if text.trim().is_empty() {
            warn!("Page {} has no text layer", idx + 1);
        }
        texts.push(text);
    }
    Ok((total, texts))
}

/// Map a pdfium load failure to the most specific [`ParseError`].
fn classify_load_error(path: &Path, had_password: bool, detail: &str) -> ParseError {
    let path: PathBuf = path.to_path_buf();
    if detail.to_lowercase().contains("password") {
        if had_password {
            ParseError::WrongPassword { path }
        } else {
            ParseError::PasswordRequired { path }
        }
    } else {
        ParseError::CorruptPdf {
            path,
            detail: detail.to_string(),
        }
    }
}

static RE_CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+| {2,}").expect("static regex"));

/// Split one page of extracted text into ordered blocks.
pub fn segment_page_text(text: &str) -> Vec<Content> {
    let text = text.replace("\r\n", "\n").replace(['\r', '\u{000C}'], "\n");

    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(block_from_lines(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(block_from_lines(&current));
    }
    blocks
}

fn block_from_lines(lines: &[&str]) -> Content {
    match table_rows(lines) {
        Some(rows) => Content::table(rows),
        None => Content::text(join_wrapped_lines(lines)),
    }
}

fn table_rows(lines: &[&str]) -> Option<Vec<Vec<String>>> {
    if lines.len() < MIN_TABLE_ROWS {
        return None;
    }
    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| {
            RE_CELL_GAP
                .split(line.trim())
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect();

    let cols = rows[0].len();
    let min_cols = if rows.len() == MIN_TABLE_ROWS {
        MIN_SHORT_TABLE_COLS
    } else {
        2
    };
    (cols >= min_cols && rows.iter().all(|r| r.len() == cols)).then_some(rows)
}

/// Re-flow hard-wrapped lines into one paragraph. CJK lines are joined
/// without a space.
fn join_wrapped_lines(lines: &[&str]) -> String {
    let mut out = String::new();
    for line in lines.iter().map(|l| l.trim()) {
        if let Some(last) = out.chars().last() {
            let next_is_ascii = line.chars().next().is_some_and(|c| c.is_ascii());
            if last.is_ascii() || next_is_ascii {
                out.push(' ');
            }
        }
        out.push_str(line);
    }
    out
}

// ── Markdown ──────────────────────────────────────────────────────────────

static RE_PAGE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*page\s+(\d+)\s*-->$").expect("static regex"));

/// Parse Markdown in the writer's layout into pages.
///
/// Text before the first page marker belongs to page 1. Pages that end up
/// with no blocks are kept so page numbers stay aligned with the source.
pub fn parse_markdown_str(text: &str) -> Vec<Page> {
    let text = text.replace("\r\n", "\n");

    let mut pages: Vec<Page> = Vec::new();
    let mut number = 1usize;
    let mut body: Vec<&str> = Vec::new();
    let mut seen_marker = false;

    for line in text.lines() {
        if let Some(caps) = RE_PAGE_MARKER.captures(line.trim()) {
            if seen_marker || body.iter().any(|l| !l.trim().is_empty()) {
                pages.push(Page::new(number, markdown_blocks(&body)));
            }
            number = caps[1].parse().unwrap_or(pages.len() + 1);
            body.clear();
            seen_marker = true;
        } else {
            body.push(line);
        }
    }
    if seen_marker || body.iter().any(|l| !l.trim().is_empty()) {
        pages.push(Page::new(number, markdown_blocks(&body)));
    }
    pages
}

fn markdown_blocks(lines: &[&str]) -> Vec<Content> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut flush = |current: &mut Vec<&str>| {
        if current.is_empty() {
            return;
        }
        let is_table = current.iter().all(|l| is_table_row(l))
            && current.iter().any(|l| !is_separator_row(l));
        let block = match is_table
            .then(|| Table::parse_rows(&current.join("\n")))
            .flatten()
        {
            Some(rows) => Content::table(rows),
            None => Content::text(unescape_text_lines(&current.join("\n"))),
        };
        blocks.push(block);
        current.clear();
    };

    for line in lines {
        if line.trim().is_empty() {
            flush(&mut current);
        } else {
            current.push(line.trim_end());
        }
    }
    flush(&mut current);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ContentKind;

    #[test]
    fn test_paragraphs_split_on_blank_lines() {
        let blocks = segment_page_text("First paragraph\ncontinues here.\n\n\nSecond one.");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].original(), "First paragraph continues here.");
        assert_eq!(blocks[1].original(), "Second one.");
    }

    #[test]
    fn test_aligned_columns_become_table() {
        let text = "Name      Qty   Price\napple     3     1.20\npear\t10\t0.80\n\nFootnote text.";
        let blocks = segment_page_text(text);
        assert_eq!(blocks.len(), 2);
        match &blocks[0].kind {
            ContentKind::Table(t) => {
                assert_eq!(t.rows.len(), 3);
                assert_eq!(t.rows[2], vec!["pear", "10", "0.80"]);
            }
            other => panic!("expected table, got {other:?}"),
        }
        assert!(!blocks[1].is_table());
    }

    #[test]
    fn test_ragged_columns_stay_text() {
        let blocks = segment_page_text("a  b  c\nd  e");
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].is_table());
    }

    #[test]
    fn test_two_lines_of_spaced_prose_stay_text() {
        let blocks =
            segment_page_text("The results are final.  We move on\nto the next chapter.  It begins here");
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].is_table());
        assert_eq!(
            blocks[0].original(),
            "The results are final.  We move on to the next chapter.  It begins here"
        );
    }

    #[test]
    fn test_two_row_table_needs_three_columns() {
        let blocks = segment_page_text("Name    Qty    Price\napple   3      1.20");
        assert!(blocks[0].is_table());

        let blocks = segment_page_text("Name    Qty\napple   3\npear    10");
        assert!(blocks[0].is_table());
    }

    #[test]
    fn test_single_aligned_line_is_text() {
        let blocks = segment_page_text("Chapter 1    Introduction");
        assert!(!blocks[0].is_table());
    }

    #[test]
    fn test_cjk_lines_join_without_space() {
        assert_eq!(join_wrapped_lines(&["这是第一行", "这是第二行"]), "这是第一行这是第二行");
        assert_eq!(join_wrapped_lines(&["hello", "world"]), "hello world");
    }

    #[test]
    fn test_form_feed_and_crlf() {
        let blocks = segment_page_text("one\r\n\r\ntwo\u{000C}\u{000C}three");
        let texts: Vec<String> = blocks.iter().map(Content::original).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_load_error_classification() {
        let p = Path::new("x.pdf");
        assert!(matches!(
            classify_load_error(p, false, "PdfiumLibraryInternalError(PasswordError)"),
            ParseError::PasswordRequired { .. }
        ));
        assert!(matches!(
            classify_load_error(p, true, "PdfiumLibraryInternalError(PasswordError)"),
            ParseError::WrongPassword { .. }
        ));
        assert!(matches!(
            classify_load_error(p, false, "PdfiumLibraryInternalError(FormatError)"),
            ParseError::CorruptPdf { .. }
        ));
    }

    #[test]
    fn test_markdown_pages_and_blocks() {
        let md = "<!-- page 1 -->\n\nHello.\n\nSecond block.\n\n<!-- page 2 -->\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n";
        let pages = parse_markdown_str(md);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].contents.len(), 2);
        assert_eq!(pages[1].number, 2);
        match &pages[1].contents[0].kind {
            ContentKind::Table(t) => assert_eq!(t.rows, vec![vec!["A", "B"], vec!["1", "2"]]),
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn test_markdown_without_markers_is_one_page() {
        let pages = parse_markdown_str("Just some text.\n\nAnd more.\n");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].contents.len(), 2);
    }

    #[test]
    fn test_markdown_empty_page_is_kept() {
        let pages = parse_markdown_str("<!-- page 1 -->\n\n<!-- page 2 -->\n\nText\n");
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contents.is_empty());
        assert_eq!(pages[1].contents.len(), 1);
    }

    #[test]
    fn test_escaped_pipe_text_reads_back_as_text() {
        let pages = parse_markdown_str("<!-- page 1 -->\n\n\\| see note |\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n");
        let contents = &pages[0].contents;
        assert_eq!(contents.len(), 2);
        assert!(!contents[0].is_table());
        assert_eq!(contents[0].original(), "| see note |");
        assert!(contents[1].is_table());
    }

    #[tokio::test]
    async fn test_parse_markdown_file_with_max_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.md");
        std::fs::write(&path, "<!-- page 1 -->\n\nOne\n\n<!-- page 2 -->\n\nTwo\n").unwrap();

        let doc = parse(&path, Some(1), None).await.unwrap();
        assert_eq!(doc.source_page_count, 2);
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.source.as_deref(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_empty_markdown_has_no_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        std::fs::write(&path, "<!-- page 1 -->\n\n").unwrap();

        let err = parse(&path, None, None).await.unwrap_err();
        assert!(matches!(err, ParseError::NoContent { .. }));
    }
}

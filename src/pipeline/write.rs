//! Document writing: emit the translated book as Markdown or PDF.
//!
//! Every block is written through [`Content::output_kind`], so a block whose
//! translation failed keeps its original text.
//!
//! ## Markdown layout
//!
//! ```text
//! <!-- page 1 -->
//!
//! First paragraph.
//!
//! | Name | Qty |
//! | --- | --- |
//! | apple | 3 |
//!
//! <!-- page 2 -->
//! ...
//! ```
//!
//! [`crate::pipeline::parse`] reads this layout back.
//!
//! ## PDF layout
//!
//! A4 pages with a fixed margin. Each source page starts a new output page;
//! text is wrapped to the column width and flows onto extra pages when it
//! overflows. Line breaking estimates glyph widths (Latin ≈ half an em, CJK
//! one em) rather than measuring, which is close enough for a body font.
//!
//! Both formats are written to `<name>.tmp` first and renamed into place so
//! a failed run never leaves a half-written book behind.

use super::pdfium;
use crate::config::OutputFormat;
use crate::document::{escape_text_lines, Content, ContentKind, Document};
use crate::error::WriteError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 56.0;
const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 9.5;
const LINE_SPACING: f32 = 1.4;
const BLOCK_GAP: f32 = 8.0;

/// Writer settings that do not change the output format.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// TrueType font for PDF output. Needed for CJK and other scripts the
    /// built-in Helvetica cannot show.
    pub font_path: Option<PathBuf>,
}

/// Write `document` to `path` with default options.
pub async fn save(document: &Document, path: &Path, format: OutputFormat) -> Result<(), WriteError> {
    save_with(document, path, format, &WriteOptions::default()).await
}

/// Write `document` to `path` in `format`.
pub async fn save_with(
    document: &Document,
    path: &Path,
    format: OutputFormat,
    options: &WriteOptions,
) -> Result<(), WriteError> {
    let bytes = match format {
        OutputFormat::Markdown => render_markdown(document).into_bytes(),
        OutputFormat::Pdf => {
            let pages = layout(document);
            let font_path = options.font_path.clone();
            let target = path.to_path_buf();
            if font_path.is_none() && document.blocks().any(has_non_latin_output) {
                warn!("Output contains non-Latin text but no font is set; glyphs may be missing. Use --font <TTF>.");
            }
            tokio::task::spawn_blocking(move || render_pdf(&pages, font_path.as_deref(), &target))
                .await
                .map_err(|e| WriteError::PdfRenderFailed {
                    path: path.to_path_buf(),
                    detail: format!("render task panicked: {e}"),
                })??
        }
    };

    write_atomic(path, &bytes).await?;
    info!(
        "Wrote {} ({}, {} bytes)",
        path.display(),
        format,
        bytes.len()
    );
    Ok(())
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    let failed = |e: std::io::Error| WriteError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(failed)?;
    }

    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, bytes).await.map_err(failed)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(failed(e));
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Markdown ──────────────────────────────────────────────────────────────

/// Render the whole document as Markdown. A document with no pages renders
/// as the empty string.
pub fn render_markdown(document: &Document) -> String {
    let mut sections: Vec<String> = Vec::new();
    for page in &document.pages {
        sections.push(format!("<!-- page {} -->", page.number));
        sections.extend(page.contents.iter().map(render_block_markdown));
    }
    if sections.is_empty() {
        String::new()
    } else {
        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }
}

fn render_block_markdown(content: &Content) -> String {
    match content.output_kind() {
        ContentKind::Text(text) => escape_text_lines(text.trim()),
        ContentKind::Table(table) => table.to_markdown(),
    }
}

// ── PDF ───────────────────────────────────────────────────────────────────

/// One line of text placed on an output page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedLine {
    pub text: String,
    pub size: f32,
    /// Baseline, in points from the bottom edge.
    pub y: f32,
}

/// Lay the document out onto A4 pages. Always returns at least one page.
pub(crate) fn layout(document: &Document) -> Vec<Vec<PlacedLine>> {
    let column = PAGE_WIDTH - 2.0 * MARGIN;
    let mut pages: Vec<Vec<PlacedLine>> = Vec::new();

    for page in &document.pages {
        pages.push(Vec::new());
        let mut y = PAGE_HEIGHT - MARGIN;

        for content in &page.contents {
            let (lines, size) = match content.output_kind() {
                ContentKind::Text(text) => (wrap_text(&text, column, BODY_SIZE), BODY_SIZE),
                ContentKind::Table(table) => {
                    let rows: Vec<String> = table
                        .rows
                        .iter()
                        .flat_map(|row| wrap_text(&row.join(" | "), column, TABLE_SIZE))
                        .collect();
                    (rows, TABLE_SIZE)
                }
            };

            let step = size * LINE_SPACING;
            for text in lines {
                if y - step < MARGIN {
                    pages.push(Vec::new());
                    y = PAGE_HEIGHT - MARGIN;
                }
                y -= step;
                if let Some(current) = pages.last_mut() {
                    current.push(PlacedLine { text, size, y });
                }
            }
            y -= BLOCK_GAP;
        }
    }

    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

fn char_width(c: char, size: f32) -> f32 {
    if c.is_ascii() {
        size * 0.55
    } else {
        size
    }
}

/// Break `text` into lines no wider than `max_width` points. Explicit line
/// breaks are kept; Latin text breaks at spaces, CJK text anywhere.
pub(crate) fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut out = Vec::new();
    for hard_line in text.lines() {
        let mut line = String::new();
        let mut width = 0.0f32;
        // Byte offset in `line` where a break may be taken.
        let mut break_at: Option<usize> = None;

        for c in hard_line.chars() {
            let w = char_width(c, size);
            if width + w > max_width && !line.is_empty() {
                if c.is_whitespace() {
                    out.push(line.trim_end().to_string());
                    line.clear();
                    width = 0.0;
                    break_at = None;
                    continue;
                }
                match break_at.filter(|_| c.is_ascii()) {
                    Some(at) => {
                        let rest = line.split_off(at);
                        out.push(line.trim_end().to_string());
                        line = rest.trim_start().to_string();
                    }
                    None => {
                        out.push(std::mem::take(&mut line).trim_end().to_string());
                    }
                }
                width = line.chars().map(|c| char_width(c, size)).sum();
                break_at = None;
            }
            if c.is_whitespace() && line.is_empty() {
                continue;
            }
            line.push(c);
            width += w;
            if c.is_whitespace() || !c.is_ascii() {
                break_at = Some(line.len());
            }
        }
        if !line.trim().is_empty() {
            out.push(line.trim_end().to_string());
        }
    }
    out
}

fn has_non_latin_output(content: &Content) -> bool {
    let text = match content.output_kind() {
        ContentKind::Text(t) => t,
        ContentKind::Table(t) => t.to_markdown(),
    };
    text.chars().any(|c| c as u32 > 0x024F)
}

/// Build the PDF with pdfium and return its bytes. Blocking.
fn render_pdf(
    pages: &[Vec<PlacedLine>],
    font_path: Option<&Path>,
    target: &Path,
) -> Result<Vec<u8>, WriteError> {
    let render_failed = |detail: String| WriteError::PdfRenderFailed {
        path: target.to_path_buf(),
        detail,
    };

    let pdfium = pdfium::bind().map_err(WriteError::PdfiumUnavailable)?;
    let mut document = pdfium
        .create_new_pdf()
        .map_err(|e| render_failed(format!("{e:?}")))?;

    let font = match font_path {
        Some(p) => document
            .fonts_mut()
            .load_true_type_from_file(p, true)
            .map_err(|e| render_failed(format!("font {}: {e:?}", p.display())))?,
        None => document.fonts_mut().helvetica(),
    };

    for (idx, lines) in pages.iter().enumerate() {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(|e| render_failed(format!("page {}: {e:?}", idx + 1)))?;

        for line in lines {
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(MARGIN),
                    PdfPoints::new(line.y),
                    &line.text,
                    font,
                    PdfPoints::new(line.size),
                )
                .map_err(|e| render_failed(format!("page {}: {e:?}", idx + 1)))?;
        }
        debug!("Laid out output page {} ({} lines)", idx + 1, lines.len());
    }

    document
        .save_to_bytes()
        .map_err(|e| render_failed(format!("{e:?}")))
}

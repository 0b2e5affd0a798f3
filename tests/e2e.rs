//! End-to-end tests that need a pdfium library, and optionally a live LLM.
//!
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=. RUST_LOG=info cargo test --test e2e -- --nocapture
//!
//! The live-model test additionally needs `OPENAI_API_KEY`, `OPENAI_BASE_URL`
//! and a PDF at `test_cases/sample.pdf`.

use async_trait::async_trait;
use edgequake_pdf_translator::{
    parse, save, save_with, Content, Document, GatewayError, Model, OutputFormat, Page,
    ParseError, PdfTranslator, TranslatorConfig, WriteError, WriteOptions,
};
use std::path::PathBuf;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Route library logs to the test output; `RUST_LOG=debug` shows prompts.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
    };
}

struct Echo;

#[async_trait]
impl Model for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn make_request(&self, prompt: &str) -> Result<(String, bool), GatewayError> {
        let body = prompt.split_once("\n\n").map_or(prompt, |(_, b)| b);
        Ok((format!("[fr] {body}"), true))
    }
}

fn sample_document() -> Document {
    Document::new(vec![
        Page::new(
            1,
            vec![
                Content::text("Chapter one begins on a quiet morning."),
                Content::table(vec![
                    vec!["Name".into(), "Qty".into()],
                    vec!["apple".into(), "3".into()],
                ]),
            ],
        ),
        Page::new(2, vec![Content::text("The second page closes the chapter.")]),
    ])
}

// ── PDF writer + parser (pdfium, no LLM) ─────────────────────────────────────

#[tokio::test]
async fn test_pdf_written_then_parsed_keeps_pages_and_text() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pdf");

    save(&sample_document(), &path, OutputFormat::Pdf)
        .await
        .expect("PDF should be written");
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));

    let doc = parse(&path, None, None).await.expect("written PDF should parse");
    assert_eq!(doc.source_page_count, 2);
    let text: String = doc.blocks().map(Content::original).collect::<Vec<_>>().join(" ");
    assert!(text.contains("quiet morning"), "got: {text}");
    assert!(text.contains("closes the chapter"), "got: {text}");
}

#[tokio::test]
async fn test_long_page_overflows_onto_extra_pdf_pages() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("long.pdf");
    let long = vec!["A line of running text."; 150].join("\n");
    let doc = Document::new(vec![Page::new(1, vec![Content::text(long)])]);

    save(&doc, &path, OutputFormat::Pdf).await.unwrap();

    let parsed = parse(&path, None, None).await.unwrap();
    assert!(parsed.source_page_count > 1);

    let first_only = parse(&path, Some(1), None).await.unwrap();
    assert_eq!(first_only.pages.len(), 1);
}

#[tokio::test]
async fn test_empty_document_is_one_blank_pdf_page() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pdf");

    save(&Document::default(), &path, OutputFormat::Pdf)
        .await
        .unwrap();

    let err = parse(&path, None, None).await.unwrap_err();
    assert!(matches!(err, ParseError::NoContent { .. }), "got: {err}");
}

#[tokio::test]
async fn test_missing_font_is_a_render_error() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let options = WriteOptions {
        font_path: Some(dir.path().join("no-such-font.ttf")),
    };

    let err = save_with(
        &sample_document(),
        &dir.path().join("out.pdf"),
        OutputFormat::Pdf,
        &options,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, WriteError::PdfRenderFailed { .. }), "got: {err}");
}

#[tokio::test]
async fn test_translate_generated_pdf_to_markdown() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let book = dir.path().join("book.pdf");
    save(&sample_document(), &book, OutputFormat::Pdf).await.unwrap();

    let config = TranslatorConfig::builder()
        .book(&book)
        .file_format("markdown")
        .target_language("French")
        .build()
        .unwrap();
    let output = PdfTranslator::with_model(config, Arc::new(Echo))
        .translate_book()
        .await
        .unwrap();

    assert_eq!(output.output_path, dir.path().join("book_translated.md"));
    let md = std::fs::read_to_string(&output.output_path).unwrap();
    assert!(md.starts_with("<!-- page 1 -->"));
    assert!(md.contains("[fr] "));
    println!("{md}");
}

// ── Live model ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_openai_translation_of_sample() {
    e2e_skip_unless_enabled!();
    if std::env::var("OPENAI_API_KEY").is_err() || std::env::var("OPENAI_BASE_URL").is_err() {
        println!("SKIP — OPENAI_API_KEY and OPENAI_BASE_URL are required");
        return;
    }
    let book = test_cases_dir().join("sample.pdf");
    if !book.exists() {
        println!("SKIP — test file not found: {}", book.display());
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let config = TranslatorConfig::builder()
        .book(&book)
        .output_path(dir.path().join("sample_fr.md"))
        .file_format("markdown")
        .target_language("French")
        .max_pages(1)
        .build()
        .unwrap();

    let output = PdfTranslator::new(config)
        .expect("backend from env")
        .translate_book()
        .await
        .expect("translation should succeed");

    assert!(output.stats.total_blocks > 0);
    assert!(output.stats.succeeded_blocks > 0);
    println!(
        "{}/{} blocks in {}ms",
        output.stats.succeeded_blocks, output.stats.total_blocks, output.stats.duration_ms
    );
}

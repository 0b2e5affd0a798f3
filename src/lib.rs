//! # edgequake-pdf-translator
//!
//! Translate PDF books with a large language model, page by page and block
//! by block, and write the result as Markdown or as a new PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! book.pdf
//!  │
//!  ├─ 1. Input      check path, permissions, %PDF magic
//!  ├─ 2. Parse      pdfium text layer → pages → paragraph / table blocks
//!  ├─ 3. Translate  one prompt per block, in order, with rate-limit retry
//!  ├─ 4. Polish     strip fences / labels / invisible chars from replies
//!  └─ 5. Write      Markdown (atomic) or A4 PDF via pdfium
//! ```
//!
//! A block whose request fails keeps its original text in the output, so a
//! partially translated book is still complete and readable.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_translator::{PdfTranslator, TranslatorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // OpenAI backend: reads OPENAI_API_KEY and OPENAI_BASE_URL
//!     let config = TranslatorConfig::builder()
//!         .book("tests/test.pdf")
//!         .file_format("markdown")
//!         .build()?;
//!     let output = PdfTranslator::new(config)?.translate_book().await?;
//!     eprintln!(
//!         "{}: {}/{} blocks translated",
//!         output.output_path.display(),
//!         output.stats.succeeded_blocks,
//!         output.stats.total_blocks
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | `ModelKind` | Environment | Notes |
//! |-------------|-------------|-------|
//! | `openai`    | `OPENAI_API_KEY`, `OPENAI_BASE_URL` | Any OpenAI-compatible server |
//! | `glm`       | `GLM_API_URL` | ChatGLM `api.py` server |
//! | `provider`  | `EDGEQUAKE_LLM_PROVIDER`, `EDGEQUAKE_MODEL` | Any edgequake-llm provider |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-translate` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    FileConfig, ModelKind, OutputFormat, TranslatorConfig, TranslatorConfigBuilder,
};
pub use document::{Content, ContentKind, Document, Page, Table};
pub use error::{ConfigError, GatewayError, ParseError, TranslatorError, WriteError};
pub use model::{create_model, create_model_with_env, Attempt, Model, RetryPolicy};
pub use pipeline::parse::parse;
pub use pipeline::write::{save, save_with, WriteOptions};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use translate::{translate_document, PdfTranslator, TranslationOutput, TranslationStats};

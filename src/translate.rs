//! Translation entry points.
//!
//! [`translate_document`] walks a parsed [`Document`] block by block and
//! stores each reply on its block. [`PdfTranslator`] wraps the full run:
//! parse the book, translate it, write the result.
//!
//! Blocks are translated strictly in order, one request at a time. A block
//! whose request fails (rate limit not cleared, request rejected) is recorded
//! as failed and the walk goes on; a [`GatewayError`](crate::error::GatewayError)
//! stops the run.

use crate::config::TranslatorConfig;
use crate::document::Document;
use crate::error::TranslatorError;
use crate::model::{create_model, Model};
use crate::pipeline::parse::parse;
use crate::pipeline::write::{save_with, WriteOptions};
use crate::progress::TranslationProgressCallback;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Summary of one translation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub total_pages: usize,
    pub total_blocks: usize,
    pub succeeded_blocks: usize,
    pub failed_blocks: usize,
    pub duration_ms: u64,
}

/// Result of [`PdfTranslator::translate_book`].
#[derive(Debug, Clone)]
pub struct TranslationOutput {
    /// Where the translated book was written.
    pub output_path: PathBuf,
    pub stats: TranslationStats,
    /// The translated document, as written.
    pub document: Document,
}

/// Translate every block of `document` in place.
///
/// Translations from an earlier run are cleared first. A document with no
/// blocks returns immediately: the model is not called and `progress` does
/// not fire.
///
/// # Errors
/// Only fatal gateway errors. Per-block failures are counted in
/// [`TranslationStats::failed_blocks`].
pub async fn translate_document(
    document: &mut Document,
    model: &dyn Model,
    target_language: &str,
    progress: Option<&dyn TranslationProgressCallback>,
) -> Result<TranslationStats, TranslatorError> {
    let start = Instant::now();
    document.clear_translations();

    let total = document.block_count();
    let mut stats = TranslationStats {
        total_pages: document.pages.len(),
        total_blocks: total,
        ..Default::default()
    };
    if total == 0 {
        info!("Nothing to translate: document has no content blocks");
        return Ok(stats);
    }

    info!(
        "Translating {} blocks on {} pages into {} with {}",
        total,
        stats.total_pages,
        target_language,
        model.name()
    );
    if let Some(cb) = progress {
        cb.on_translation_start(total);
    }

    let mut current = 0usize;
    for page in &mut document.pages {
        for content in &mut page.contents {
            current += 1;
            if let Some(cb) = progress {
                cb.on_block_start(page.number, current, total);
            }

            let prompt = model.translate_prompt(content, target_language);
            debug!("Block {current}/{total} (page {}) prompt:\n{prompt}", page.number);

            let (text, succeeded) = model.make_request(&prompt).await?;
            if succeeded {
                debug!("Block {current}/{total} reply:\n{text}");
                stats.succeeded_blocks += 1;
            } else {
                warn!(
                    "Block {current}/{total} (page {}) was not translated; keeping the original text",
                    page.number
                );
                stats.failed_blocks += 1;
            }

            content.set_translation(text, succeeded).map_err(|_| {
                TranslatorError::Internal(format!(
                    "block {current} on page {} was translated twice",
                    page.number
                ))
            })?;

            if let Some(cb) = progress {
                cb.on_block_complete(page.number, current, succeeded);
                cb.on_progress(current as f64 / total as f64 * 100.0);
            }
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    if let Some(cb) = progress {
        cb.on_translation_complete(total, stats.succeeded_blocks);
    }
    info!(
        "Translation complete: {}/{} blocks in {}ms",
        stats.succeeded_blocks, total, stats.duration_ms
    );
    Ok(stats)
}

/// A configured translation pipeline: parse → translate → write.
///
/// ```rust,no_run
/// use edgequake_pdf_translator::{PdfTranslator, TranslatorConfig};
///
/// # async fn run() -> Result<(), edgequake_pdf_translator::TranslatorError> {
/// let config = TranslatorConfig::builder()
///     .book("docs/manual.pdf")
///     .file_format("markdown")
///     .target_language("French")
///     .build()?;
/// let output = PdfTranslator::new(config)?.translate_book().await?;
/// println!("wrote {}", output.output_path.display());
/// # Ok(())
/// # }
/// ```
pub struct PdfTranslator {
    config: TranslatorConfig,
    model: Arc<dyn Model>,
}

impl PdfTranslator {
    /// Build the backend selected by `config`. Fails with a
    /// [`ConfigError`](crate::error::ConfigError) when a required setting or
    /// environment variable is missing.
    pub fn new(config: TranslatorConfig) -> Result<Self, TranslatorError> {
        let model = create_model(&config)?;
        Ok(Self::with_model(config, model))
    }

    /// Use an already constructed backend.
    pub fn with_model(config: TranslatorConfig, model: Arc<dyn Model>) -> Self {
        Self { config, model }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate the configured book and write the result.
    ///
    /// The book path and output format are checked before the book is
    /// opened, so a misconfigured run never reaches the model.
    pub async fn translate_book(&self) -> Result<TranslationOutput, TranslatorError> {
        let book = self.config.require_book()?.to_path_buf();
        let format = self.config.output_format()?;
        let output_path = self.config.resolve_output_path(&book, format);
        info!(
            "Translating {} → {} ({})",
            book.display(),
            output_path.display(),
            format
        );

        let mut document =
            parse(&book, self.config.max_pages, self.config.password.as_deref()).await?;

        let stats = translate_document(
            &mut document,
            self.model.as_ref(),
            &self.config.target_language,
            self.config.progress_callback.as_deref(),
        )
        .await?;

        let options = WriteOptions {
            font_path: self.config.font_path.clone(),
        };
        save_with(&document, &output_path, format, &options).await?;

        Ok(TranslationOutput {
            output_path,
            stats,
            document,
        })
    }

    /// Blocking wrapper around [`Self::translate_book`].
    ///
    /// Creates a temporary tokio runtime internally; do not call from inside
    /// an async context.
    pub fn translate_book_blocking(&self) -> Result<TranslationOutput, TranslatorError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| TranslatorError::Internal(format!("Failed to create tokio runtime: {e}")))?
            .block_on(self.translate_book())
    }
}

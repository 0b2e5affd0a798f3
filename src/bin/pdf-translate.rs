//! CLI binary for edgequake-pdf-translator.
//!
//! A thin shim over the library crate: reads `config.toml`, overlays CLI
//! flags, and runs [`PdfTranslator::translate_book`].

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_translator::{
    FileConfig, ModelKind, PdfTranslator, ProgressCallback, TranslationProgressCallback,
    TranslatorConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar over the blocks of the book, with a log line for every
/// block that could not be translated.
struct CliProgressCallback {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Reading book…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failed: AtomicUsize::new(0),
        })
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_translation_start(&self, total_blocks: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>4}/{len} blocks  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_blocks as u64);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Translating {total_blocks} blocks…"))
        ));
    }

    fn on_block_start(&self, page_num: usize, _block_num: usize, _total_blocks: usize) {
        self.bar.set_message(dim(&format!("page {page_num}")));
    }

    fn on_block_complete(&self, page_num: usize, block_num: usize, succeeded: bool) {
        if !succeeded {
            self.failed.fetch_add(1, Ordering::SeqCst);
            self.bar.println(format!(
                "  {} Block {:>4} (page {})  {}",
                red("✗"),
                block_num,
                page_num,
                dim("kept original text")
            ));
        }
        self.bar.inc(1);
    }

    fn on_translation_complete(&self, total_blocks: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = self.failed.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} blocks translated",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} blocks translated  ({} kept original)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_blocks,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate the book named in config.toml
  pdf-translate

  # Translate a PDF into French Markdown
  pdf-translate book.pdf --target-language French --file-format markdown

  # Use a local ChatGLM server
  GLM_API_URL=http://localhost:8000 pdf-translate --model-type glm book.pdf

  # Any edgequake-llm provider
  pdf-translate --model-type provider --provider anthropic --model claude-3-5-haiku-latest book.pdf

  # CJK output as PDF needs a font with the right glyphs
  pdf-translate book.pdf --font /usr/share/fonts/noto/NotoSansCJK-Regular.ttc

CONFIG FILE (config.toml):
  [OpenAIModel]
  model   = "gpt-3.5-turbo"
  api_key = "sk-..."

  [GLMModel]
  model_url = "http://localhost:8000"
  timeout   = 300

  [common]
  book            = "tests/test.pdf"
  file_format     = "markdown"
  target_language = "中文"

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (unless set in config or --openai-api-key)
  OPENAI_BASE_URL         OpenAI-compatible base URL, e.g. https://api.openai.com/v1
  GLM_API_URL             ChatGLM endpoint (unless set in config or --glm-url)
  EDGEQUAKE_LLM_PROVIDER  Provider for --model-type provider
  EDGEQUAKE_MODEL         Model for --model-type provider
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides -v / -q
"#;

/// Translate PDF books with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate",
    version,
    about = "Translate PDF books block by block with LLMs",
    long_about = "Translate a PDF book page by page and block by block with an LLM and write \
the result as Markdown or PDF. Supports OpenAI-compatible APIs, ChatGLM, and every \
edgequake-llm provider.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF (or translated Markdown) to translate. Overrides `common.book`.
    book: Option<PathBuf>,

    /// Config file. Defaults to ./config.toml when present.
    #[arg(long, env = "PDF_TRANSLATE_CONFIG")]
    config: Option<PathBuf>,

    /// Backend: openai, glm, provider.
    #[arg(long, default_value = "openai")]
    model_type: String,

    /// Model name (OpenAI model, or provider model for --model-type provider).
    #[arg(long, visible_alias = "openai-model")]
    model: Option<String>,

    /// OpenAI API key. Overrides `OpenAIModel.api_key`.
    #[arg(long)]
    openai_api_key: Option<String>,

    /// OpenAI-compatible base URL. Falls back to OPENAI_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long)]
    provider: Option<String>,

    /// ChatGLM endpoint. Overrides `GLMModel.model_url`.
    #[arg(long)]
    glm_url: Option<String>,

    /// Output format: pdf or markdown. Overrides `common.file_format`.
    #[arg(long)]
    file_format: Option<String>,

    /// Language to translate into. Overrides `common.target_language`.
    #[arg(long)]
    target_language: Option<String>,

    /// Output path. Default: <book>_translated.<pdf|md>.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Translate only the first N pages.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pages: Option<u64>,

    /// PDF user password for encrypted books.
    #[arg(long, env = "PDF_TRANSLATE_PASSWORD")]
    password: Option<String>,

    /// TrueType font for PDF output (needed for CJK).
    #[arg(long)]
    font: Option<PathBuf>,

    /// Attempts per block when rate limited.
    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    /// Seconds to wait after a rate-limited attempt.
    #[arg(long, default_value_t = 60)]
    backoff: u64,

    /// HTTP timeout per request in seconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// Print run statistics as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let translator = PdfTranslator::new(config).context("Failed to set up the model backend")?;
    let output = translator
        .translate_book()
        .await
        .context("Translation failed")?;

    let stats = &output.stats;
    if cli.json {
        let json = serde_json::to_string_pretty(stats).context("Failed to serialise stats")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!(
            "{}  {}/{} blocks  {} pages  {}ms  →  {}",
            if stats.failed_blocks == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.succeeded_blocks,
            stats.total_blocks,
            stats.total_pages,
            stats.duration_ms,
            bold(&output.output_path.display().to_string()),
        );
    }

    Ok(())
}

/// Config file first, then CLI flags on top.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<TranslatorConfig> {
    let file = match cli.config {
        Some(ref path) => FileConfig::load(path)?,
        None => FileConfig::load_if_exists(DEFAULT_CONFIG_PATH)?,
    };
    let model_kind: ModelKind = cli.model_type.parse()?;

    let mut builder = TranslatorConfig::builder()
        .model_kind(model_kind)
        .merge_file(&file)
        .max_attempts(cli.max_attempts)
        .rate_limit_backoff_secs(cli.backoff);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref key) = cli.openai_api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref url) = cli.glm_url {
        builder = builder.glm_url(url);
    }
    if let Some(ref book) = cli.book {
        builder = builder.book(book);
    }
    if let Some(ref format) = cli.file_format {
        builder = builder.file_format(format);
    }
    if let Some(ref lang) = cli.target_language {
        builder = builder.target_language(lang);
    }
    if let Some(ref out) = cli.output {
        builder = builder.output_path(out);
    }
    if let Some(pages) = cli.pages {
        builder = builder.max_pages(pages as usize);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

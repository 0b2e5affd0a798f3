//! Configuration types for a translation run.
//!
//! All behaviour is controlled through [`TranslatorConfig`], built via
//! [`TranslatorConfigBuilder`]. The config is passed explicitly into
//! [`crate::translate::PdfTranslator`]; there is no process-wide instance.
//!
//! [`FileConfig`] mirrors the on-disk TOML file:
//!
//! ```toml
//! [OpenAIModel]
//! model   = "gpt-3.5-turbo"
//! api_key = "sk-..."
//!
//! [GLMModel]
//! model_url = "http://localhost:8000"
//! timeout   = 30
//!
//! [common]
//! book        = "tests/test.pdf"
//! file_format = "markdown"
//! ```
//!
//! Values given on the command line take precedence over the file: set the
//! model kind, apply [`TranslatorConfigBuilder::merge_file`], then the
//! remaining CLI setters.

use crate::error::{ConfigError, WriteError};
use crate::model::glm::DEFAULT_GLM_TIMEOUT_SECS;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default OpenAI model, matching the legacy tool.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Default target language.
pub const DEFAULT_TARGET_LANGUAGE: &str = "中文";

/// Configuration for a PDF translation run.
///
/// # Example
/// ```rust
/// use edgequake_pdf_translator::{ModelKind, TranslatorConfig};
///
/// let config = TranslatorConfig::builder()
///     .model_kind(ModelKind::OpenAi)
///     .model("gpt-4o-mini")
///     .target_language("French")
///     .file_format("markdown")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 3);
/// ```
#[derive(Clone)]
pub struct TranslatorConfig {
    /// Which backend answers the translation prompts. Default: OpenAI.
    pub model_kind: ModelKind,

    /// Model identifier. For OpenAI defaults to `gpt-3.5-turbo`; for the
    /// provider backend defaults to the provider's own default.
    pub model: Option<String>,

    /// API key. Falls back to `OPENAI_API_KEY` for the OpenAI backend.
    pub api_key: Option<String>,

    /// API base URL. Falls back to `OPENAI_BASE_URL` for the OpenAI backend.
    pub base_url: Option<String>,

    /// edgequake-llm provider name (`openai`, `anthropic`, `gemini`, `ollama`, …).
    pub provider_name: Option<String>,

    /// ChatGLM endpoint. Falls back to `GLM_API_URL`.
    pub glm_url: Option<String>,

    /// Language the blocks are translated into. Default: 中文.
    pub target_language: String,

    /// Source document.
    pub book: Option<PathBuf>,

    /// Output file. Default: `<book stem>_translated.<ext>` next to the source.
    pub output_path: Option<PathBuf>,

    /// `pdf` or `markdown` (case-insensitive). Default: pdf.
    pub file_format: String,

    /// Translate only the first N pages.
    pub max_pages: Option<usize>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// TrueType font embedded in PDF output. Needed for CJK target languages;
    /// the built-in Helvetica only covers Latin-1.
    pub font_path: Option<PathBuf>,

    /// Attempts per block when the backend reports a rate limit. Default: 3.
    pub max_attempts: u32,

    /// Fixed wait between rate-limited attempts, in seconds. Default: 60.
    pub rate_limit_backoff_secs: u64,

    /// Per-request HTTP timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Output-token cap per request. `None` lets chat models decide; legacy
    /// completion models fall back to 150.
    pub max_tokens: Option<usize>,

    /// Receives progress events as blocks complete.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::default(),
            model: None,
            api_key: None,
            base_url: None,
            provider_name: None,
            glm_url: None,
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            book: None,
            output_path: None,
            file_format: OutputFormat::default().to_string(),
            max_pages: None,
            password: None,
            font_path: None,
            max_attempts: 3,
            rate_limit_backoff_secs: 60,
            request_timeout_secs: 60,
            temperature: 0.0,
            max_tokens: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TranslatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslatorConfig")
            .field("model_kind", &self.model_kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("provider_name", &self.provider_name)
            .field("glm_url", &self.glm_url)
            .field("target_language", &self.target_language)
            .field("book", &self.book)
            .field("output_path", &self.output_path)
            .field("file_format", &self.file_format)
            .field("max_pages", &self.max_pages)
            .field("max_attempts", &self.max_attempts)
            .field("rate_limit_backoff_secs", &self.rate_limit_backoff_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn TranslationProgressCallback>"),
            )
            .finish()
    }
}

impl TranslatorConfig {
    pub fn builder() -> TranslatorConfigBuilder {
        TranslatorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Parse [`Self::file_format`].
    pub fn output_format(&self) -> Result<OutputFormat, WriteError> {
        self.file_format.parse()
    }

    /// The source path, or [`ConfigError::MissingKey`] for `common.book`.
    pub fn require_book(&self) -> Result<&Path, ConfigError> {
        self.book.as_deref().ok_or_else(|| ConfigError::MissingKey {
            key: "common.book".into(),
        })
    }

    /// Where the translated document goes.
    pub fn resolve_output_path(&self, book: &Path, format: OutputFormat) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| default_output_path(book, format))
    }
}

/// `docs/book.pdf` → `docs/book_translated.md` (for Markdown).
pub fn default_output_path(book: &Path, format: OutputFormat) -> PathBuf {
    let stem = book
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    book.with_file_name(format!("{stem}_translated.{}", format.extension()))
}

/// Builder for [`TranslatorConfig`].
#[derive(Debug)]
pub struct TranslatorConfigBuilder {
    config: TranslatorConfig,
}

impl TranslatorConfigBuilder {
    pub fn model_kind(mut self, kind: ModelKind) -> Self {
        self.config.model_kind = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn glm_url(mut self, url: impl Into<String>) -> Self {
        self.config.glm_url = Some(url.into());
        self
    }

    pub fn target_language(mut self, lang: impl Into<String>) -> Self {
        self.config.target_language = lang.into();
        self
    }

    pub fn book(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.book = Some(path.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn file_format(mut self, format: impl Into<String>) -> Self {
        self.config.file_format = format.into();
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = Some(n);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn rate_limit_backoff_secs(mut self, secs: u64) -> Self {
        self.config.rate_limit_backoff_secs = secs;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Apply every value present in the config file. Call this after
    /// [`Self::model_kind`] and before the other command-line setters so
    /// that command-line values win.
    ///
    /// The `[OpenAIModel]` section only applies to the OpenAI backend. For
    /// ChatGLM the request timeout comes from `[GLMModel] timeout`,
    /// defaulting to 30 seconds.
    pub fn merge_file(mut self, file: &FileConfig) -> Self {
        let c = &mut self.config;
        match c.model_kind {
            ModelKind::OpenAi => {
                if let Some(ref model) = file.openai.model {
                    c.model = Some(model.clone());
                }
                if let Some(ref key) = file.openai.api_key {
                    c.api_key = Some(key.clone());
                }
            }
            ModelKind::Glm => {
                c.request_timeout_secs = file.glm.timeout.unwrap_or(DEFAULT_GLM_TIMEOUT_SECS);
            }
            ModelKind::Provider => {}
        }
        if let Some(ref url) = file.glm.model_url {
            c.glm_url = Some(url.clone());
        }
        if let Some(ref book) = file.common.book {
            c.book = Some(book.clone());
        }
        if let Some(ref format) = file.common.file_format {
            c.file_format = format.clone();
        }
        if let Some(ref lang) = file.common.target_language {
            c.target_language = lang.clone();
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TranslatorConfig, ConfigError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be ≥ 1".into()));
        }
        if c.target_language.trim().is_empty() {
            return Err(ConfigError::Invalid("target language must not be empty".into()));
        }
        if c.max_pages == Some(0) {
            return Err(ConfigError::Invalid("max_pages must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which backend implements [`crate::model::Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// OpenAI-compatible HTTP API (`OPENAI_API_KEY` / `OPENAI_BASE_URL`).
    #[default]
    OpenAi,
    /// ChatGLM HTTP endpoint (`GLM_API_URL`).
    Glm,
    /// Any edgequake-llm provider.
    Provider,
}

impl FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openaimodel" => Ok(Self::OpenAi),
            "glm" | "glmmodel" | "chatglm" => Ok(Self::Glm),
            "provider" | "edgequake" => Ok(Self::Provider),
            other => Err(ConfigError::UnknownModelKind(other.to_string())),
        }
    }
}

/// Output document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Markdown,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = WriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(WriteError::UnsupportedFormat {
                format: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Markdown => "markdown",
        })
    }
}

// ── Config file ──────────────────────────────────────────────────────────

/// On-disk configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(rename = "OpenAIModel", default)]
    pub openai: OpenAiSection,

    #[serde(rename = "GLMModel", default)]
    pub glm: GlmSection,

    #[serde(default)]
    pub common: CommonSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenAiSection {
    pub model: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlmSection {
    pub model_url: Option<String>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonSection {
    pub book: Option<PathBuf>,
    pub file_format: Option<String>,
    pub target_language: Option<String>,
}

impl FileConfig {
    /// Load and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content).map_err(|detail| ConfigError::Malformed {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Load the file if it exists, otherwise return an empty config.
    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}

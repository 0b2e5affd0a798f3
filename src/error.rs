//! Error types for the edgequake-pdf-translator library.
//!
//! Each pipeline stage owns one error enum, and [`TranslatorError`] wraps
//! them for the top-level entry points:
//!
//! * [`ConfigError`]: missing environment variable or config key. Raised
//!   before any file is parsed or any request is sent.
//! * [`ParseError`]: the source document cannot be read. Raised before any
//!   translation request.
//! * [`GatewayError`]: the model backend failed in a way retrying will not
//!   fix (bad credentials, unreachable host, malformed reply). Aborts the run.
//! * [`WriteError`]: the translated document could not be written.
//!
//! Rate limiting has no variant here: it is a tagged
//! [`crate::model::Attempt`] consumed by the retry loop, and an exhausted
//! retry budget only marks the block as failed.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-translator library.
#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Write(#[from] WriteError),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Configuration ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset or empty.
    #[error("Missing required environment variables: {}", vars.join(", "))]
    MissingEnv { vars: Vec<String> },

    /// A required configuration key has no value in CLI args or config file.
    #[error("Missing required configuration value '{key}'\nSet it in the config file or pass it on the command line.")]
    MissingKey { key: String },

    /// The config file exists but could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has the wrong shape.
    #[error("Invalid config file '{path}': {detail}")]
    Malformed { path: PathBuf, detail: String },

    /// Unknown model backend name.
    #[error("Unknown model type '{0}' (expected: openai, glm, provider)")]
    UnknownModelKind(String),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ── Parsing ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ParseError {
    /// Input file was not found at the given path.
    #[error("Source file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// pdfium could not extract the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The document opened fine but yielded no content blocks.
    #[error("No extractable content in '{path}'\nScanned (image-only) PDFs need OCR before translation.")]
    NoContent { path: PathBuf },

    /// Reading a non-PDF source (Markdown) failed.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error("Failed to bind to pdfium library: {0}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.")]
    PdfiumUnavailable(String),
}

// ── Model gateway ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend rejected the credentials (401/403). Retrying will not help.
    #[error("Authentication error from '{backend}': {detail}")]
    Auth { backend: String, detail: String },

    /// The server could not be reached (DNS, TLS, refused, timeout).
    #[error("The server for '{backend}' could not be reached: {detail}")]
    Connection { backend: String, detail: String },

    /// The backend answered 2xx but the body did not have the expected shape.
    #[error("Unexpected response from '{backend}': {detail}")]
    UnexpectedResponse { backend: String, detail: String },

    /// The configured provider could not be constructed.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },
}

// ── Writing ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WriteError {
    /// Output format is neither PDF nor Markdown.
    #[error("Unsupported output format '{format}' (expected: pdf, markdown)")]
    UnsupportedFormat { format: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// pdfium failed while building or saving the output PDF.
    #[error("Failed to render PDF '{path}': {detail}")]
    PdfRenderFailed { path: PathBuf, detail: String },

    /// Could not bind to a pdfium library.
    #[error("Failed to bind to pdfium library: {0}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.")]
    PdfiumUnavailable(String),
}

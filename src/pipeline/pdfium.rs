//! Binding to the pdfium shared library.
//!
//! `PDFIUM_LIB_PATH` may name the library file itself or the directory that
//! holds it. Without it the platform's default search path is used.

use pdfium_render::prelude::Pdfium;
use std::path::PathBuf;
use tracing::debug;

/// Path to a pdfium library (file or directory).
pub const ENV_PDFIUM_LIB_PATH: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium. Blocking; call from `spawn_blocking`.
///
/// The error string is wrapped by the caller into its own
/// `PdfiumUnavailable` variant.
pub fn bind() -> Result<Pdfium, String> {
    let bindings = match std::env::var(ENV_PDFIUM_LIB_PATH) {
        Ok(raw) if !raw.trim().is_empty() => {
            let mut path = PathBuf::from(raw.trim());
            if path.is_dir() {
                path = Pdfium::pdfium_platform_library_name_at_path(&path);
            }
            debug!("Binding pdfium from {}", path.display());
            Pdfium::bind_to_library(&path).map_err(|e| format!("{}: {e}", path.display()))?
        }
        _ => {
            debug!("Binding system pdfium");
            Pdfium::bind_to_system_library().map_err(|e| e.to_string())?
        }
    };
    Ok(Pdfium::new(bindings))
}

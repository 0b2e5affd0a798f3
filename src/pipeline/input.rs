//! Input validation: make sure the book exists, is readable, and is the kind
//! of file its extension claims before handing it to a parser.
//!
//! pdfium reports a missing file and a truncated file with the same opaque
//! error, so the cheap checks happen here and produce a precise
//! [`ParseError`] instead.

use crate::error::ParseError;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// What a source file will be parsed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    /// Markdown in the layout the writer produces.
    Markdown,
}

impl SourceKind {
    /// Decide by extension; anything that is not `.md`/`.markdown` is a PDF.
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("md") | Some("markdown") => SourceKind::Markdown,
            _ => SourceKind::Pdf,
        }
    }
}

/// Validate `path` and report how it should be parsed.
pub fn resolve_source(path: &Path) -> Result<SourceKind, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ParseError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(ParseError::Io {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let kind = SourceKind::for_path(path);
    if kind == SourceKind::Pdf {
        let mut magic = [0u8; 4];
        // Files shorter than four bytes fall through to pdfium, which reports them as corrupt.
        if file.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
            return Err(ParseError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            });
        }
    }

    debug!("Resolved source {} as {:?}", path.display(), kind);
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_kind_by_extension() {
        assert_eq!(SourceKind::for_path(Path::new("book.pdf")), SourceKind::Pdf);
        assert_eq!(SourceKind::for_path(Path::new("book.PDF")), SourceKind::Pdf);
        assert_eq!(SourceKind::for_path(Path::new("book.md")), SourceKind::Markdown);
        assert_eq!(
            SourceKind::for_path(Path::new("notes.Markdown")),
            SourceKind::Markdown
        );
        assert_eq!(SourceKind::for_path(Path::new("book")), SourceKind::Pdf);
    }

    #[test]
    fn test_missing_file() {
        let err = resolve_source(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ParseError::FileNotFound { .. }));
    }

    #[test]
    fn test_not_a_pdf() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"hello, not a pdf").unwrap();
        let err = resolve_source(f.path()).unwrap_err();
        match err {
            ParseError::NotAPdf { magic, .. } => assert_eq!(&magic, b"hell"),
            other => panic!("expected NotAPdf, got {other}"),
        }
    }

    #[test]
    fn test_pdf_magic_accepted() {
        let mut f = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert_eq!(resolve_source(f.path()).unwrap(), SourceKind::Pdf);
    }

    #[test]
    fn test_markdown_skips_magic_check() {
        let mut f = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        f.write_all(b"# Title\n").unwrap();
        assert_eq!(resolve_source(f.path()).unwrap(), SourceKind::Markdown);
    }
}

//! Pipeline stages for book translation.
//!
//! Each submodule implements one step; the model call in between lives in
//! [`crate::model`] and is driven by [`crate::translate`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ parse ──▶ (model) ──▶ postprocess ──▶ write
//! (check)   (pdfium)   (LLM)      (cleanup)       (md / pdf)
//! ```
//!
//! 1. [`input`]: validate the source path and decide PDF vs Markdown
//! 2. [`parse`]: extract page text via pdfium (in `spawn_blocking`) and
//!    segment it into paragraph and table blocks
//! 3. [`postprocess`]: deterministic cleanup of every model reply
//! 4. [`write`]: emit Markdown, or build a PDF with pdfium
//!
//! [`pdfium`] holds the library binding shared by `parse` and `write`.

pub mod input;
pub mod parse;
pub mod pdfium;
pub mod postprocess;
pub mod write;

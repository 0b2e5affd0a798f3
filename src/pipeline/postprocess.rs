//! Reply cleanup: deterministic fixes for model output before it is stored
//! as a translation.
//!
//! Models ignore "no fences, no commentary" often enough that every
//! successful reply goes through [`clean_reply`]. The rules never touch the
//! wording of the translation itself, only its wrapping.
//!
//! ## Rule order
//!
//! Line endings are normalised first so the fence and label patterns only
//! have to match `\n`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule to a raw model reply.
///
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Strip an outer code fence (```` ```markdown ... ``` ````)
/// 3. Drop a leading "Translation:" style label
/// 4. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 5. Trim trailing whitespace per line
/// 6. Collapse runs of blank lines to one
/// 7. Trim the whole reply
pub fn clean_reply(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fence(&s);
    let s = strip_translation_label(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\n(.*?)\n?```\s*$").expect("static regex")
});

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 3: Leading label ────────────────────────────────────────────────────

static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:translation|translated text|译文|翻译)\s*[:：]\s*").expect("static regex")
});

fn strip_translation_label(input: &str) -> String {
    RE_LABEL.replace(input, "").to_string()
}

// ── Rule 4: Invisible Unicode ────────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 5: Trailing whitespace ──────────────────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Blank-line runs ──────────────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

//! Post-processing: recover the JSON object from a raw model reply.
//!
//! ## Why is this necessary?
//!
//! The prompt asks for "ONLY a valid JSON object", and most replies comply.
//! The ones that don't fail in a small number of repeatable ways:
//!
//! - Wrapping the object in ` ```json ... ``` ` fences
//! - Prefacing it with a sentence ("Here is the extracted synopsis:")
//! - A byte-order mark or zero-width space before the opening brace
//!
//! Each rule below is a deterministic `&str → String` pass that only removes
//! text around the JSON value. String values inside it are never touched;
//! schema-level repairs live in [`crate::schema`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::IgnoredAny;

/// Return the part of `reply` that should be handed to the JSON parser.
///
/// Rules (applied in order):
/// 1. Trim whitespace and invisible Unicode (BOM, zero-width spaces) from
///    both ends
/// 2. Strip an outer code fence, with or without a `json` tag
/// 3. If what remains already parses, or is an array, return it as-is
/// 4. Otherwise cut to the outermost `{ … }` span when prose surrounds it
///
/// If the reply contains no `{`, it is returned trimmed and unchanged so the
/// parser produces a meaningful "not JSON" error.
pub fn isolate_json(reply: &str) -> String {
    let s = strip_code_fences(trim_invisible(reply));
    if s.starts_with('[') || serde_json::from_str::<IgnoredAny>(&s).is_ok() {
        return s;
    }
    outermost_object(&s).to_string()
}

// ── Rule 1: Trim invisible Unicode ───────────────────────────────────────────

fn is_invisible(c: char) -> bool {
    matches!(c, '\u{FEFF}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}')
}

fn trim_invisible(input: &str) -> &str {
    input.trim_matches(|c: char| c.is_whitespace() || is_invisible(c))
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[ \t]*(?:json|JSON|javascript)?[ \t]*\r?\n(.*?)\r?\n?```\s*$")
        .expect("static regex")
});

/// Fences embedded after leading prose ("Sure! ```json {...} ```").
static RE_INNER_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*(?:json|JSON)?[ \t]*\r?\n(\{.*\})\s*```").expect("static regex")
});

fn strip_code_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input) {
        return trim_invisible(&caps[1]).to_string();
    }
    if let Some(caps) = RE_INNER_FENCE.captures(input) {
        return trim_invisible(&caps[1]).to_string();
    }
    input.to_string()
}

// ── Rule 4: Cut to outermost object ──────────────────────────────────────────

fn outermost_object(input: &str) -> &str {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => &input[start..=end],
        _ => input,
    }
}

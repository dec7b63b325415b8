//! Tag slug normalization.
//!
//! Every tag shown on the site gets a URL-safe slug that names its page
//! under `tags/<slug>/`. The transformation is pure and total: any input,
//! including empty or punctuation-only text, produces a non-empty slug made
//! of `[a-z0-9-]` with no leading, trailing, or doubled hyphens.
//!
//! ## Pipeline
//!
//! ```text
//! "Grüsse aus Zürich"
//!   → digraphs        "Gruesse aus Zuerich"
//!   → decompose       "Gruesse aus Zuerich"   (NFD, combining marks dropped)
//!   → lowercase       "gruesse aus zuerich"
//!   → separators      "gruesse-aus-zuerich"
//!   → filter/collapse "gruesse-aus-zuerich"
//! ```
//!
//! German umlauts are expanded to their two-letter spellings *before* the
//! decomposition, which would otherwise reduce `ü` to a bare `u`. Anything
//! without an ASCII base letter (other scripts, symbols) is dropped.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Slug returned when nothing usable survives normalization.
pub const FALLBACK_SLUG: &str = "tag";

const DIGRAPHS: &[(char, &str)] = &[
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('ß', "ss"),
];

/// Turn arbitrary tag text into a URL-safe identifier.
///
/// ```
/// use quire::slug::slugify;
///
/// assert_eq!(slugify("Java AI"), "java-ai");
/// assert_eq!(slugify("Grüsse aus Zürich"), "gruesse-aus-zuerich");
/// assert_eq!(slugify("MCP & Agent"), "mcp-agent");
/// assert_eq!(slugify("  "), "tag");
/// ```
pub fn slugify(text: &str) -> String {
    if text.trim().is_empty() {
        return FALLBACK_SLUG.to_string();
    }

    let expanded = expand_digraphs(text);
    let stripped: String = expanded.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let lower = stripped.to_lowercase();

    let mut slug = String::with_capacity(lower.len());
    for ch in lower.chars() {
        let mapped = if ch.is_whitespace() || ch == ',' {
            '-'
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            ch
        } else {
            continue;
        };
        // Collapse runs of hyphens as they are produced
        if mapped == '-' && (slug.is_empty() || slug.ends_with('-')) {
            continue;
        }
        slug.push(mapped);
    }

    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

fn expand_digraphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match DIGRAPHS.iter().find(|(from, _)| *from == ch) {
            Some((_, to)) => out.push_str(to),
            None => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_well_formed(slug: &str) {
        assert!(!slug.is_empty());
        assert!(
            slug.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
            "unexpected character in {slug:?}"
        );
        assert!(!slug.starts_with('-'), "leading hyphen in {slug:?}");
        assert!(!slug.ends_with('-'), "trailing hyphen in {slug:?}");
        assert!(!slug.contains("--"), "doubled hyphen in {slug:?}");
    }

    // =========================================================================
    // Basic text
    // =========================================================================

    #[test]
    fn words_become_hyphenated_lowercase() {
        assert_eq!(slugify("Java AI"), "java-ai");
        assert_eq!(slugify("INTERLIS goes AI"), "interlis-goes-ai");
    }

    #[test]
    fn commas_act_as_separators() {
        assert_eq!(slugify("rust,wasm"), "rust-wasm");
        assert_eq!(slugify("rust , wasm"), "rust-wasm");
    }

    #[test]
    fn digits_and_existing_hyphens_survive() {
        assert_eq!(slugify("Java 21"), "java-21");
        assert_eq!(slugify("shell-session"), "shell-session");
    }

    // =========================================================================
    // Diacritics
    // =========================================================================

    #[test]
    fn umlauts_expand_to_digraphs() {
        assert_eq!(slugify("Grüsse aus Zürich"), "gruesse-aus-zuerich");
        assert_eq!(slugify("Ärger Öl Übung"), "aerger-oel-uebung");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn other_marks_are_stripped() {
        assert_eq!(slugify("Café Crème"), "cafe-creme");
        assert_eq!(slugify("Señor"), "senor");
    }

    #[test]
    fn undecomposable_characters_are_dropped() {
        assert_eq!(slugify("日本"), FALLBACK_SLUG);
        assert_eq!(slugify("5€"), "5");
        assert_eq!(slugify("Œuvre"), "uvre");
        assert_eq!(slugify("Rust 🦀 tips"), "rust-tips");
    }

    #[test]
    fn precomposed_and_combining_forms_agree() {
        assert_eq!(slugify("Caf\u{e9}"), "cafe");
        assert_eq!(slugify("Cafe\u{301}"), "cafe");
    }

    // =========================================================================
    // Punctuation and fallback
    // =========================================================================

    #[test]
    fn punctuation_is_dropped_and_hyphens_collapse() {
        assert_eq!(slugify("MCP & Agent"), "mcp-agent");
        assert_eq!(slugify("C++ / Rust"), "c-rust");
        assert_eq!(slugify("--edge--case--"), "edge-case");
    }

    #[test]
    fn empty_or_garbage_input_falls_back() {
        assert_eq!(slugify(""), FALLBACK_SLUG);
        assert_eq!(slugify("   "), FALLBACK_SLUG);
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify(" - , - "), FALLBACK_SLUG);
    }

    #[test]
    fn output_is_always_well_formed() {
        let inputs = [
            "Java AI",
            "  leading and trailing  ",
            "tabs\tand\nnewlines",
            "emoji 🚀 launch",
            "日本語",
            "ÄÖÜ äöü ß",
            "a,,b,,c",
            "!!!",
            "",
            "x",
        ];
        for input in inputs {
            assert_well_formed(&slugify(input));
        }
    }

    #[test]
    fn slugify_is_deterministic() {
        for input in ["Java AI", "Grüsse aus Zürich", "MCP & Agent"] {
            assert_eq!(slugify(input), slugify(input));
        }
    }

    #[test]
    fn case_variants_share_a_slug() {
        assert_eq!(slugify("AI"), slugify("ai"));
        assert_eq!(slugify("Rust Lang"), slugify("RUST LANG"));
    }
}

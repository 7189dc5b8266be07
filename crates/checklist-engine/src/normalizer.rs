//! Text canonicalization for keyword comparison
//!
//! Two variants are provided:
//! - [`normalize_text`]: uppercase, accents stripped, whitespace collapsed
//! - [`normalize_for_matching`]: same, plus every character outside
//!   `[A-Z0-9 ]` replaced by a space so punctuation cannot split a keyword
//!
//! Both are total and idempotent.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// Any run of whitespace, including line breaks
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();

    /// Anything the keyword matcher does not compare on
    static ref NON_KEYWORD_CHAR: Regex = Regex::new(r"[^A-Z0-9\s]").unwrap();
}

/// Uppercase, decompose, drop combining marks
fn fold_case_and_accents(text: &str) -> String {
    text.to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Canonical form used for previews and human-facing lengths
pub fn normalize_text(text: &str) -> String {
    collapse_whitespace(&fold_case_and_accents(text))
}

/// Canonical form used by the rule catalog and the classifier
pub fn normalize_for_matching(text: &str) -> String {
    let folded = fold_case_and_accents(text);
    let stripped = NON_KEYWORD_CHAR.replace_all(&folded, " ");
    collapse_whitespace(&stripped)
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_uppercases_and_strips_accents() {
        assert_eq!(normalize_text("Certidão de Nascimento"), "CERTIDAO DE NASCIMENTO");
        assert_eq!(normalize_text("ação à vista"), "ACAO A VISTA");
    }

    #[test]
    fn test_accent_and_case_insensitive() {
        assert_eq!(
            normalize_for_matching("Contracheque"),
            normalize_for_matching("CONTRACHEQUÉ")
        );
        assert_eq!(normalize_text("Contracheque"), normalize_text("CONTRACHEQUÉ"));
        assert_eq!(
            normalize_for_matching("Habilitação"),
            normalize_for_matching("HABILITACAO")
        );
        assert_eq!(normalize_for_matching("é"), normalize_for_matching("E"));
    }

    #[test]
    fn test_collapses_whitespace_and_line_breaks() {
        assert_eq!(
            normalize_text("  recibo \n\n de\t\tpagamento \r\n"),
            "RECIBO DE PAGAMENTO"
        );
    }

    #[test]
    fn test_plain_variant_keeps_punctuation() {
        assert_eq!(normalize_text("R$ 1.234,56 - líquido"), "R$ 1.234,56 - LIQUIDO");
    }

    #[test]
    fn test_matching_variant_replaces_punctuation() {
        assert_eq!(
            normalize_for_matching("CERTIDÃO-DE-NASCIMENTO!!"),
            "CERTIDAO DE NASCIMENTO"
        );
        assert_eq!(normalize_for_matching("R$ 1.234,56"), "R 1 234 56");
    }

    #[test]
    fn test_filename_normalization() {
        assert_eq!(
            normalize_for_matching("certidao_nascimento-joão.pdf"),
            "CERTIDAO NASCIMENTO JOAO PDF"
        );
    }

    #[test]
    fn test_empty_and_blank_inputs() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_for_matching("   \n\t "), "");
        assert_eq!(normalize_for_matching("...---..."), "");
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("ÁÉÍÓÚ", 3), "ÁÉÍ...");
        assert_eq!(preview("abc", 10), "abc");
    }

    proptest! {
        #[test]
        fn normalize_text_is_idempotent(s in "[a-zA-Z0-9À-ÿ \t\n.,;:!?$/()-]{0,80}") {
            let once = normalize_text(&s);
            prop_assert_eq!(normalize_text(&once), once);
        }

        #[test]
        fn normalize_for_matching_is_idempotent(s in "[a-zA-Z0-9À-ÿ \t\n.,;:!?$/()-]{0,80}") {
            let once = normalize_for_matching(&s);
            prop_assert_eq!(normalize_for_matching(&once), once);
        }

        #[test]
        fn matching_output_alphabet_is_restricted(s in "\\PC{0,80}") {
            let out = normalize_for_matching(&s);
            prop_assert!(out.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' '));
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}

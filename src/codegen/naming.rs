//! Identifier rules for the generated tree

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SigbindError};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield", "gen",
];

/// Check that `name` can be used verbatim as a Rust type name
pub fn validate_type_name(name: &str) -> Result<()> {
    if !IDENTIFIER.is_match(name) {
        return Err(SigbindError::InvalidTemplateInput {
            reason: format!("{:?} is not a valid identifier", name),
        });
    }
    if RUST_KEYWORDS.contains(&name) || name == "_" {
        return Err(SigbindError::InvalidTemplateInput {
            reason: format!("{:?} is a reserved word", name),
        });
    }
    Ok(())
}

/// Convert a CamelCase algorithm name to a module name
///
/// Acronym runs stay together: `PitchYinFFT` becomes `pitch_yin_fft`,
/// `MFCC` becomes `mfcc`, `LoudnessEBUR128` becomes `loudness_ebur128`.
/// Reserved words get a trailing underscore.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1).copied();
            let starts_word = match prev {
                None | Some('_') => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if starts_word {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    if RUST_KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("PitchYin", "pitch_yin")]
    #[test_case("PitchYinFFT", "pitch_yin_fft")]
    #[test_case("MFCC", "mfcc")]
    #[test_case("HPCP", "hpcp")]
    #[test_case("LoudnessEBUR128", "loudness_ebur128")]
    #[test_case("RhythmExtractor2013", "rhythm_extractor2013")]
    #[test_case("TensorflowInputMusiCNN", "tensorflow_input_musi_cnn")]
    #[test_case("DCRemoval", "dc_removal")]
    #[test_case("Loop", "loop_")]
    fn test_snake_case(name: &str, expected: &str) {
        assert_eq!(snake_case(name), expected);
    }

    #[test]
    fn test_validate_type_name() {
        assert!(validate_type_name("PitchYin").is_ok());
        assert!(validate_type_name("2DFilter").is_err());
        assert!(validate_type_name("Bad-Name").is_err());
        assert!(validate_type_name("").is_err());
        assert!(validate_type_name("Self").is_err());
    }
}

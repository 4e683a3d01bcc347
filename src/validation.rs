//! Input checks run before a prompt is built.
//!
//! Every field declared by the active template must be filled. Free-text fields
//! are also screened for numeric-only values, disallowed punctuation and keyboard
//! mashing. The first failing field aborts the attempt.

use std::fmt;

use crate::error::{Result, StudioError};
use crate::models::GenerationParams;
use crate::templates::{FieldKind, Template, TemplateField};

/// Characters rejected in free-text fields.
pub const DISALLOWED_CHARACTERS: &[char] = &[
    '<', '>', '{', '}', '[', ']', '\\', '|', '^', '~', '`', '@', '#', '$', '%', '*', '=',
];

/// A run of this many identical characters marks the input as gibberish.
pub const MAX_REPEATED_RUN: usize = 5;
/// Tokens longer than this must contain at least one vowel.
pub const MAX_VOWELLESS_TOKEN: usize = 15;
/// Inputs longer than this are subject to the vowel ratio check.
pub const RATIO_MIN_INPUT_LEN: usize = 5;
pub const MIN_VOWEL_RATIO: f64 = 0.1;

/// Why a free-text value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextIssue {
    Numeric,
    DisallowedCharacter(char),
    RepeatedCharacter(char),
    VowellessToken,
    LowVowelRatio,
}

impl TextIssue {
    pub fn is_gibberish(&self) -> bool {
        matches!(
            self,
            Self::RepeatedCharacter(_) | Self::VowellessToken | Self::LowVowelRatio
        )
    }
}

impl fmt::Display for TextIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => f.write_str("must not be purely numeric"),
            Self::DisallowedCharacter(c) => write!(f, "contains a disallowed character '{c}'"),
            Self::RepeatedCharacter(c) => {
                write!(f, "looks like gibberish ('{c}' repeated {MAX_REPEATED_RUN}+ times)")
            }
            Self::VowellessToken => f.write_str("looks like gibberish (long word without vowels)"),
            Self::LowVowelRatio => f.write_str("looks like gibberish (too few vowels)"),
        }
    }
}

/// Validate params against the template they will be rendered with.
pub fn validate_params(params: &GenerationParams, template: &Template) -> Result<()> {
    if !params.creativity.is_finite() || !(0.0..=1.0).contains(&params.creativity) {
        return Err(StudioError::validation(
            "Creativity",
            format!("must be between 0 and 1, got {}", params.creativity),
        ));
    }

    for field in template.fields {
        let value = params.input(field.key).map(str::trim).unwrap_or_default();
        validate_field(field, value)?;
    }
    Ok(())
}

fn validate_field(field: &TemplateField, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(StudioError::validation(
            field.label,
            format!("Please fill in the {} field.", field.label),
        ));
    }

    match field.kind {
        FieldKind::Select => {
            if !field.options.is_empty() && !field.options.contains(&value) {
                return Err(StudioError::validation(
                    field.label,
                    format!("'{value}' is not one of the available options"),
                ));
            }
        }
        FieldKind::Text | FieldKind::Textarea => {
            if let Some(issue) = text_issue(value) {
                return Err(StudioError::validation(field.label, issue.to_string()));
            }
        }
    }
    Ok(())
}

/// First problem found in a free-text value, if any.
pub fn text_issue(value: &str) -> Option<TextIssue> {
    let value = value.trim();
    if is_purely_numeric(value) {
        return Some(TextIssue::Numeric);
    }
    if let Some(c) = value.chars().find(|c| DISALLOWED_CHARACTERS.contains(c)) {
        return Some(TextIssue::DisallowedCharacter(c));
    }
    gibberish_issue(value)
}

/// Keyboard-mashing heuristics only.
pub fn gibberish_issue(value: &str) -> Option<TextIssue> {
    if let Some(c) = repeated_run(value) {
        return Some(TextIssue::RepeatedCharacter(c));
    }
    if has_vowelless_long_token(value) {
        return Some(TextIssue::VowellessToken);
    }
    if has_low_vowel_ratio(value) {
        return Some(TextIssue::LowVowelRatio);
    }
    None
}

pub fn is_purely_numeric(value: &str) -> bool {
    let mut saw_digit = false;
    for c in value.chars() {
        if c.is_ascii_digit() {
            saw_digit = true;
        } else if !(c.is_whitespace() || matches!(c, '.' | ',' | '-' | '+')) {
            return false;
        }
    }
    saw_digit
}

/// The first non-whitespace character that repeats [`MAX_REPEATED_RUN`] times in a row.
pub fn repeated_run(value: &str) -> Option<char> {
    let mut previous: Option<char> = None;
    let mut run = 0usize;
    for c in value.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            previous = None;
            run = 0;
            continue;
        }
        if previous == Some(c) {
            run += 1;
        } else {
            previous = Some(c);
            run = 1;
        }
        if run >= MAX_REPEATED_RUN {
            return Some(c);
        }
    }
    None
}

pub fn has_vowelless_long_token(value: &str) -> bool {
    value
        .split_whitespace()
        .any(|token| token.chars().count() > MAX_VOWELLESS_TOKEN && !token.chars().any(is_vowel))
}

pub fn has_low_vowel_ratio(value: &str) -> bool {
    if value.chars().count() <= RATIO_MIN_INPUT_LEN {
        return false;
    }
    let letters = value.chars().filter(|c| c.is_alphabetic()).count();
    if letters == 0 {
        return false;
    }
    let vowels = value.chars().filter(|c| is_vowel(*c)).count();
    (vowels as f64 / letters as f64) < MIN_VOWEL_RATIO
}

fn is_vowel(c: char) -> bool {
    c.to_lowercase().any(|l| {
        matches!(
            l,
            'a' | 'e' | 'i' | 'o' | 'u'
                | 'á' | 'à' | 'â' | 'ä'
                | 'é' | 'è' | 'ê' | 'ë'
                | 'í' | 'ì' | 'î' | 'ï'
                | 'ó' | 'ò' | 'ô' | 'ö'
                | 'ú' | 'ù' | 'û' | 'ü'
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_rule_in_isolation() {
        let value = "the sea was sooooo calm";
        assert_eq!(repeated_run(value), Some('o'));
        assert!(!has_vowelless_long_token(value));
        assert!(!has_low_vowel_ratio(value));
        assert_eq!(gibberish_issue("aaaaaaa"), Some(TextIssue::RepeatedCharacter('a')));
    }

    #[test]
    fn test_four_repeats_are_allowed() {
        assert_eq!(repeated_run("zzzz"), None);
        assert_eq!(repeated_run("aa aa aa"), None);
    }

    #[test]
    fn test_token_rule_in_isolation() {
        let value = "a quiet evening bcdfghjklmnpqrstv";
        assert_eq!(repeated_run(value), None);
        assert!(has_vowelless_long_token(value));
        assert!(!has_low_vowel_ratio(value));
        assert_eq!(gibberish_issue(value), Some(TextIssue::VowellessToken));
    }

    #[test]
    fn test_ratio_rule_in_isolation() {
        let value = "xyzzzplkj";
        assert_eq!(repeated_run(value), None);
        assert!(!has_vowelless_long_token(value));
        assert!(has_low_vowel_ratio(value));
        assert_eq!(gibberish_issue(value), Some(TextIssue::LowVowelRatio));
    }

    #[test]
    fn test_short_inputs_skip_ratio_rule() {
        assert!(!has_low_vowel_ratio("Brr"));
        assert!(!has_low_vowel_ratio("hmmmm"));
    }

    #[test]
    fn test_numeric_values() {
        assert!(is_purely_numeric("1984"));
        assert!(is_purely_numeric(" 3.14 "));
        assert!(!is_purely_numeric("1984 again"));
        assert!(!is_purely_numeric("..."));
    }

    #[test]
    fn test_plain_prose_passes() {
        assert_eq!(text_issue("A retired detective with a limp"), None);
        assert_eq!(text_issue("Magic is fueled by memories"), None);
        assert_eq!(text_issue("Die boer se plaas is ver"), None);
    }

    #[test]
    fn test_disallowed_characters() {
        assert_eq!(
            text_issue("<script>"),
            Some(TextIssue::DisallowedCharacter('<'))
        );
    }
}

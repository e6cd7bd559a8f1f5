use std::sync::OnceLock;

use regex::Regex;

/// anything that is neither a word character nor whitespace
fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("static regex"))
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("static regex"))
}

fn whitespace_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Normalize raw text before tokenization.
///
/// Steps, in order:
/// 1. every character that is neither a Unicode word character nor whitespace becomes a space
/// 2. digit runs (any script) are removed
/// 3. lowercase
/// 4. whitespace runs collapse to one space
/// 5. trim
///
/// Scripts without case (Persian, Arabic, CJK, ...) pass through step 3 unchanged.
/// The result may be empty; callers treat that as "undetectable".
///
/// # Arguments
/// * `text` - raw input
///
/// # Returns
/// * `String` - normalized text
pub fn normalize(text: &str) -> String {
    let spaced = non_word_re().replace_all(text, " ");
    let no_digits = digit_run_re().replace_all(&spaced, "");
    let lower = no_digits.to_lowercase();
    let collapsed = whitespace_run_re().replace_all(&lower, " ");
    collapsed.trim().to_string()
}

/// Number of whitespace separated words in the raw input.
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

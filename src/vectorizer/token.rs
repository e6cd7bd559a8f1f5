use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn word_run_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\w+").expect("static regex"))
}

/// Split text into maximal runs of Unicode word characters.
/// Single-character runs are kept; CJK text without spaces stays one token per run.
pub fn tokenize(text: &str) -> Vec<&str> {
    word_run_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Build n-grams over adjacent tokens for every n in `min_n..=max_n`.
/// All n-grams of size `min_n` come first, then `min_n + 1`, ...
/// Tokens inside an n-gram are joined with a single space.
///
/// # Arguments
/// * `tokens` - token sequence of one document
/// * `(min_n, max_n)` - inclusive n-gram range
///
/// # Returns
/// * `Vec<String>` - n-grams in generation order (duplicates kept)
pub fn ngrams<T: AsRef<str>>(tokens: &[T], (min_n, max_n): (usize, usize)) -> Vec<String> {
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            let mut gram = String::with_capacity(window.iter().map(|t| t.as_ref().len() + 1).sum());
            for (i, t) in window.iter().enumerate() {
                if i > 0 {
                    gram.push(' ');
                }
                gram.push_str(t.as_ref());
            }
            out.push(gram);
        }
    }
    out
}

/// Counts token occurrences inside one document.
/// Iteration follows first-seen order, which the vocabulary relies on for tie breaking.
///
/// # Examples
/// ```
/// use nb_lang_detect::vectorizer::token::TokenFrequency;
/// let mut freq = TokenFrequency::new();
/// freq.add_tokens(&["hello", "world", "hello"]);
/// assert_eq!(freq.token_sum(), 3);
/// assert_eq!(freq.iter().next(), Some(("hello", 2)));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TokenFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    token_count: IndexMap<String, u32>,
    total_token_count: u64,
}

impl TokenFrequency {
    pub fn new() -> Self {
        TokenFrequency {
            token_count: IndexMap::new(),
            total_token_count: 0,
        }
    }

    /// Count one occurrence of `token`.
    #[inline]
    pub fn add_token(&mut self, token: &str) -> &mut Self {
        if let Some(count) = self.token_count.get_mut(token) {
            *count += 1;
        } else {
            self.token_count.insert(token.to_string(), 1);
        }
        self.total_token_count += 1;
        self
    }

    /// Count every token of `tokens`, in order.
    #[inline]
    pub fn add_tokens<T>(&mut self, tokens: &[T]) -> &mut Self
    where
        T: AsRef<str>,
    {
        for token in tokens {
            self.add_token(token.as_ref());
        }
        self
    }

    /// Sum of all counts.
    #[inline]
    pub fn token_sum(&self) -> u64 {
        self.total_token_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.token_count.is_empty()
    }

    /// (token, count) in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.token_count.iter().map(|(t, &c)| (t.as_str(), c))
    }
}

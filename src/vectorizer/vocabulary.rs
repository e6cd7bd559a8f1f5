use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Frozen mapping from n-gram to feature index.
/// Built once by `BowVectorizer::fit`, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    tokens: IndexSet<String>,
}

impl Vocabulary {
    /// Build from tokens already in index order.
    /// Returns `None` when a token repeats, since indices would no longer be stable.
    pub fn from_ranked<I>(ranked: I) -> Option<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut tokens = IndexSet::new();
        for token in ranked {
            if !tokens.insert(token) {
                return None;
            }
        }
        Some(Self { tokens })
    }

    #[inline]
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.tokens.get_index_of(token)
    }

    #[inline]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get_index(index).map(|s| s.as_str())
    }

    #[inline]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// tokens in index order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_ranked_order() {
        let vocab = Vocabulary::from_ranked(["b".to_string(), "a".to_string(), "a b".to_string()]).unwrap();
        assert_eq!(vocab.index_of("b"), Some(0));
        assert_eq!(vocab.index_of("a b"), Some(2));
        assert_eq!(vocab.index_of("c"), None);
        assert_eq!(vocab.token(1), Some("a"));
        assert_eq!(vocab.len(), 3);
    }

    #[test]
    fn duplicates_are_rejected() {
        assert!(Vocabulary::from_ranked(["a".to_string(), "a".to_string()]).is_none());
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vectorizer::token::TokenFrequency;

/// Per-term statistics over the fit corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermStat {
    /// number of documents containing the term
    pub doc_freq: u64,
    /// occurrences across all documents
    pub total_freq: u64,
}

/// keep document count and term statistics for vocabulary selection
/// Terms iterate in first-seen order across the corpus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    doc_num: u64,
    #[serde(with = "indexmap::map::serde_seq")]
    term_stats: IndexMap<Box<str>, TermStat>,
}

impl CorpusStats {
    /// Create a new instance
    pub fn new() -> Self {
        Self {
            doc_num: 0,
            term_stats: IndexMap::new(),
        }
    }

    /// Add a document's terms to the corpus
    pub fn add_doc(&mut self, doc: &TokenFrequency) {
        self.doc_num += 1;
        for (term, count) in doc.iter() {
            if let Some(stat) = self.term_stats.get_mut(term) {
                stat.doc_freq += 1;
                stat.total_freq += count as u64;
            } else {
                self.term_stats.insert(
                    term.into(),
                    TermStat {
                        doc_freq: 1,
                        total_freq: count as u64,
                    },
                );
            }
        }
    }

    /// Get the number of documents in the corpus
    #[inline]
    pub fn get_doc_num(&self) -> u64 {
        self.doc_num
    }

    /// Get the current candidate size (number of unique terms)
    #[inline]
    pub fn vocab_size(&self) -> usize {
        self.term_stats.len()
    }

    /// (term, stat) in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermStat)> {
        self.term_stats.iter().map(|(t, s)| (&**t, s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(tokens: &[&str]) -> TokenFrequency {
        let mut f = TokenFrequency::new();
        f.add_tokens(tokens);
        f
    }

    #[test]
    fn doc_freq_counts_documents_not_occurrences() {
        let mut stats = CorpusStats::new();
        stats.add_doc(&doc(&["a", "a", "b"]));
        stats.add_doc(&doc(&["a", "c"]));
        assert_eq!(stats.get_doc_num(), 2);
        let a = stats.iter().find(|(t, _)| *t == "a").map(|(_, s)| *s).unwrap();
        assert_eq!(a, TermStat { doc_freq: 2, total_freq: 3 });
        let b = stats.iter().find(|(t, _)| *t == "b").map(|(_, s)| *s).unwrap();
        assert_eq!(b.doc_freq, 1);
        assert_eq!(stats.vocab_size(), 3);
    }

    #[test]
    fn iteration_is_first_seen_order() {
        let mut stats = CorpusStats::new();
        stats.add_doc(&doc(&["x", "y"]));
        stats.add_doc(&doc(&["z", "x"]));
        let order: Vec<&str> = stats.iter().map(|(t, _)| t).collect();
        assert_eq!(order, vec!["x", "y", "z"]);
    }
}

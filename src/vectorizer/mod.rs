pub mod corpus;
pub mod feature;
pub mod token;
pub mod vocabulary;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};
use crate::vectorizer::{
    corpus::CorpusStats,
    feature::FeatureVector,
    token::{ngrams, tokenize, TokenFrequency},
    vocabulary::Vocabulary,
};

/// Vocabulary selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// keep at most this many features
    pub max_features: usize,
    /// minimum document frequency (absolute)
    pub min_df: u64,
    /// maximum document frequency as a fraction of the corpus size
    pub max_df: f64,
    /// inclusive n-gram range over word tokens
    pub ngram_range: (usize, usize),
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            min_df: 1,
            max_df: 0.8,
            ngram_range: (1, 2),
        }
    }
}

impl VectorizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_features == 0 {
            return Err(DetectError::InvalidConfig("max_features must be positive".into()));
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(DetectError::InvalidConfig(format!(
                "max_df must be in (0, 1], got {}",
                self.max_df
            )));
        }
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n || max_n > 2 {
            return Err(DetectError::InvalidConfig(format!(
                "ngram_range must satisfy 1 <= min <= max <= 2, got ({min_n}, {max_n})"
            )));
        }
        Ok(())
    }
}

/// Bag-of-n-grams vectorizer with a fixed vocabulary.
///
/// `fit` selects the vocabulary from a corpus of normalized documents,
/// `transform` counts vocabulary n-grams in new text and drops everything else.
/// Once built, the vectorizer is immutable, so the same text always yields
/// the same `FeatureVector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BowVectorizer {
    config: VectorizerConfig,
    vocabulary: Vocabulary,
}

impl BowVectorizer {
    /// Select a vocabulary from `docs`.
    ///
    /// Candidates are all unigrams/bigrams of the corpus. A candidate is kept when
    /// `min_df <= df <= max_df * N`; survivors are ranked by total corpus frequency
    /// (descending, first-seen order on ties) and the top `max_features` get indices
    /// in that ranked order.
    ///
    /// # Errors
    /// * `InvalidConfig` - config fails validation
    /// * `InsufficientData` - no documents, or nothing survives the df bounds
    pub fn fit<T>(docs: &[T], config: VectorizerConfig) -> Result<Self>
    where
        T: AsRef<str> + Sync,
    {
        config.validate()?;
        if docs.is_empty() {
            return Err(DetectError::InsufficientData("cannot fit a vocabulary on an empty corpus".into()));
        }

        // per-document counting is independent; merging stays sequential to keep first-seen order
        let per_doc: Vec<TokenFrequency> = docs
            .par_iter()
            .map(|d| analyze(d.as_ref(), config.ngram_range))
            .collect();
        let mut stats = CorpusStats::new();
        let mut ngram_total = 0u64;
        for freq in &per_doc {
            stats.add_doc(freq);
            ngram_total += freq.token_sum();
        }

        let max_doc_count = config.max_df * stats.get_doc_num() as f64;
        let mut candidates: Vec<(&str, u64)> = stats
            .iter()
            .filter(|(_, s)| s.doc_freq >= config.min_df && s.doc_freq as f64 <= max_doc_count)
            .map(|(t, s)| (t, s.total_freq))
            .collect();
        // stable sort keeps first-seen order among equal frequencies
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.truncate(config.max_features);

        if candidates.is_empty() {
            return Err(DetectError::InsufficientData(format!(
                "no n-gram survives document frequency bounds [{}, {:.2}] over {} documents",
                config.min_df,
                max_doc_count,
                stats.get_doc_num()
            )));
        }

        let vocabulary = Vocabulary::from_ranked(candidates.into_iter().map(|(t, _)| t.to_string()))
            .ok_or_else(|| DetectError::InsufficientData("duplicate n-gram in ranked vocabulary".into()))?;
        log::debug!(
            "vectorizer fit: {} documents, {} n-grams, {} candidates, {} features kept",
            stats.get_doc_num(),
            ngram_total,
            stats.vocab_size(),
            vocabulary.len()
        );
        Ok(Self { config, vocabulary })
    }

    /// Fit on `docs` and return their feature vectors as well.
    pub fn fit_transform<T>(docs: &[T], config: VectorizerConfig) -> Result<(Self, Vec<FeatureVector>)>
    where
        T: AsRef<str> + Sync,
    {
        let vectorizer = Self::fit(docs, config)?;
        let vectors = vectorizer.transform_many(docs);
        Ok((vectorizer, vectors))
    }

    /// Count known n-grams of `text`.
    /// Out-of-vocabulary n-grams are ignored; a text with none yields the zero vector.
    pub fn transform(&self, text: &str) -> FeatureVector {
        let freq = analyze(text, self.config.ngram_range);
        if freq.is_empty() {
            return FeatureVector::zeros(self.vocabulary.len());
        }
        let pairs = freq
            .iter()
            .filter_map(|(gram, count)| self.vocabulary.index_of(gram).map(|idx| (idx, count)));
        FeatureVector::from_pairs(self.vocabulary.len(), pairs)
    }

    /// `transform` over many documents, in parallel, preserving input order.
    pub fn transform_many<T>(&self, docs: &[T]) -> Vec<FeatureVector>
    where
        T: AsRef<str> + Sync,
    {
        docs.par_iter().map(|d| self.transform(d.as_ref())).collect()
    }

    #[inline]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[inline]
    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    /// Vocabulary size, i.e. feature vector dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.vocabulary.len()
    }
}

/// tokenize + n-gram counting for one document
fn analyze(text: &str, ngram_range: (usize, usize)) -> TokenFrequency {
    let tokens = tokenize(text);
    let mut freq = TokenFrequency::new();
    freq.add_tokens(&ngrams(&tokens, ngram_range));
    freq
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs() -> Vec<&'static str> {
        vec![
            "hello world",
            "hello there world",
            "bonjour le monde",
            "le chat",
            "hola mundo",
        ]
    }

    #[test]
    fn fit_ranks_by_frequency_then_first_seen() {
        let v = BowVectorizer::fit(&docs(), VectorizerConfig::default()).unwrap();
        let vocab = v.vocabulary();
        // hello, world, le appear twice; first seen order among them
        assert_eq!(vocab.token(0), Some("hello"));
        assert_eq!(vocab.token(1), Some("world"));
        assert_eq!(vocab.token(2), Some("le"));
        // then the singletons in first-seen order, bigrams included
        assert_eq!(vocab.token(3), Some("hello world"));
        assert!(vocab.contains("bonjour le"));
    }

    #[test]
    fn max_df_excludes_ubiquitous_terms() {
        let corpus = ["the cat", "the dog", "the bird", "a fish", "the cow"];
        let config = VectorizerConfig { max_df: 0.5, ..Default::default() };
        let v = BowVectorizer::fit(&corpus, config).unwrap();
        assert!(!v.vocabulary().contains("the"));
        assert!(v.vocabulary().contains("cat"));
    }

    #[test]
    fn min_df_and_max_features_bound_vocabulary() {
        let config = VectorizerConfig { min_df: 2, ..Default::default() };
        let v = BowVectorizer::fit(&docs(), config).unwrap();
        assert_eq!(v.dim(), 3);

        let config = VectorizerConfig { max_features: 2, ..Default::default() };
        let v = BowVectorizer::fit(&docs(), config).unwrap();
        assert_eq!(v.vocabulary().iter().collect::<Vec<_>>(), vec!["hello", "world"]);
    }

    #[test]
    fn repeated_known_token_counts_exactly() {
        let v = BowVectorizer::fit(&docs(), VectorizerConfig::default()).unwrap();
        let idx = v.vocabulary().index_of("monde").unwrap();
        let vec = v.transform("monde monde monde monde");
        assert_eq!(vec.get(idx), 4);
        // the bigram "monde monde" is unknown, everything else is zero
        assert_eq!(vec.nnz(), 1);
        assert_eq!(vec.total(), 4);
    }

    #[test]
    fn unknown_text_gives_zero_vector() {
        let v = BowVectorizer::fit(&docs(), VectorizerConfig::default()).unwrap();
        let vec = v.transform("completely unseen words");
        assert!(vec.is_zero());
        assert_eq!(vec.dim(), v.dim());
        let empty = v.transform("");
        assert!(empty.is_zero());
        assert_eq!(empty.dim(), v.dim());
    }

    #[test]
    fn transform_is_deterministic() {
        let v = BowVectorizer::fit(&docs(), VectorizerConfig::default()).unwrap();
        let a = v.transform("hello world hello le chat");
        for _ in 0..10 {
            assert_eq!(v.transform("hello world hello le chat"), a);
        }
        let refit = BowVectorizer::fit(&docs(), VectorizerConfig::default()).unwrap();
        assert_eq!(refit, v);
    }

    #[test]
    fn empty_corpus_and_bad_config_fail() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            BowVectorizer::fit(&empty, VectorizerConfig::default()),
            Err(DetectError::InsufficientData(_))
        ));
        let bad = VectorizerConfig { ngram_range: (2, 1), ..Default::default() };
        assert!(matches!(BowVectorizer::fit(&docs(), bad), Err(DetectError::InvalidConfig(_))));
        let bad = VectorizerConfig { max_df: 0.0, ..Default::default() };
        assert!(matches!(BowVectorizer::fit(&docs(), bad), Err(DetectError::InvalidConfig(_))));
    }

    #[test]
    fn nothing_surviving_is_insufficient_data() {
        // every term appears in every document
        let corpus = ["same words", "same words"];
        assert!(matches!(
            BowVectorizer::fit(&corpus, VectorizerConfig::default()),
            Err(DetectError::InsufficientData(_))
        ));
    }
}

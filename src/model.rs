use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classifier::{MultinomialNb, Posterior};
use crate::error::{DetectError, Result};
use crate::utils::normalizer::{normalize, word_count};
use crate::vectorizer::BowVectorizer;

/// A fitted vectorizer and classifier from the same training run.
/// Immutable; a retrain produces a new `LanguageModel` instead of editing this one.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageModel {
    vectorizer: BowVectorizer,
    classifier: MultinomialNb,
}

impl LanguageModel {
    /// Pair a vectorizer with a classifier fit on its output.
    /// Fails when the feature dimensions disagree.
    pub fn new(vectorizer: BowVectorizer, classifier: MultinomialNb) -> Result<Self> {
        if vectorizer.dim() != classifier.n_features() {
            return Err(DetectError::DimensionMismatch {
                expected: classifier.n_features(),
                found: vectorizer.dim(),
            });
        }
        Ok(Self { vectorizer, classifier })
    }

    pub fn vectorizer(&self) -> &BowVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &MultinomialNb {
        &self.classifier
    }

    /// trained label set, sorted
    pub fn labels(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.dim()
    }

    /// Classify text that has already gone through `normalize`.
    /// Always answers, an all-unknown text gets the prior.
    pub fn posterior_normalized(&self, normalized: &str) -> Result<Posterior> {
        let features = self.vectorizer.transform(normalized);
        self.classifier.posterior(&features)
    }

    /// Full detection for raw text.
    /// Text that normalizes to nothing gives `DetectionResult::undetected`, not an error.
    pub fn detect(&self, text: &str) -> Result<DetectionResult> {
        let processed = normalize(text);
        let text_length = text.chars().count();
        if processed.is_empty() {
            return Ok(DetectionResult::undetected(text_length, word_count(text)));
        }

        let posterior = self.posterior_normalized(&processed)?;
        let labels = self.labels();
        let mut order: Vec<usize> = (0..labels.len()).collect();
        // labels are sorted, so the stable sort breaks probability ties by label
        order.sort_by(|&a, &b| posterior.probabilities[b].total_cmp(&posterior.probabilities[a]));
        let probabilities: IndexMap<String, f64> = order
            .into_iter()
            .map(|i| (labels[i].clone(), posterior.probabilities[i]))
            .collect();

        Ok(DetectionResult {
            language: Some(labels[posterior.best].clone()),
            confidence: posterior.confidence(),
            probabilities,
            text_length,
            processed_length: processed.chars().count(),
            word_count: word_count(text),
        })
    }
}

/// Outcome of one detection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// predicted label, `None` when nothing detectable remained after normalization
    pub language: Option<String>,
    /// probability of `language`, 0.0 when undetected
    pub confidence: f64,
    /// every trained label with its probability, most probable first
    pub probabilities: IndexMap<String, f64>,
    /// raw input length in chars
    pub text_length: usize,
    /// normalized input length in chars
    pub processed_length: usize,
    /// whitespace separated words in the raw input
    pub word_count: usize,
}

impl DetectionResult {
    /// "no language detected"
    pub fn undetected(text_length: usize, word_count: usize) -> Self {
        Self {
            language: None,
            confidence: 0.0,
            probabilities: IndexMap::new(),
            text_length,
            processed_length: 0,
            word_count,
        }
    }

    #[inline]
    pub fn is_detected(&self) -> bool {
        self.language.is_some()
    }

    /// the `n` most probable labels
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        self.probabilities.iter().take(n).map(|(l, &p)| (l.as_str(), p)).collect()
    }
}

pub mod report;

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::classifier::{ClassifierConfig, MultinomialNb};
use crate::corpus::LabeledCorpus;
use crate::error::{DetectError, Result};
use crate::model::LanguageModel;
use crate::utils::normalizer::normalize;
use crate::vectorizer::{BowVectorizer, VectorizerConfig};

pub use report::{ClassMetrics, ClassificationReport};

/// Parameters of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// share of each language held out for evaluation, in (0, 1)
    pub test_fraction: f64,
    /// seed of the split shuffle
    pub seed: u64,
    pub vectorizer: VectorizerConfig,
    pub classifier: ClassifierConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            vectorizer: VectorizerConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(DetectError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        self.vectorizer.validate()?;
        self.classifier.validate()
    }
}

/// Sample indices of a stratified train/test split, each in corpus order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split `corpus` so that every label lands in both partitions.
///
/// Per label (in lexicographic order) the label's indices are shuffled with a
/// generator seeded by `seed`, and `round(n * test_fraction)` of them, clamped
/// to `[1, n - 1]`, go to the test side.
///
/// # Errors
/// * `InsufficientData` - empty corpus, fewer than two labels, or a label with fewer than two examples
/// * `InvalidConfig` - `test_fraction` outside (0, 1)
pub fn stratified_split(corpus: &LabeledCorpus, test_fraction: f64, seed: u64) -> Result<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(DetectError::InvalidConfig(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }
    if corpus.is_empty() {
        return Err(DetectError::InsufficientData("corpus is empty".into()));
    }

    let mut by_label: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, sample) in corpus.iter().enumerate() {
        by_label.entry(sample.label.as_str()).or_default().push(i);
    }
    if by_label.len() < 2 {
        return Err(DetectError::InsufficientData(format!(
            "need at least two languages, corpus has {}",
            by_label.len()
        )));
    }
    if let Some((label, idx)) = by_label.iter().find(|(_, idx)| idx.len() < 2) {
        return Err(DetectError::InsufficientData(format!(
            "language {label} has {} example(s), at least 2 are needed to appear in both partitions",
            idx.len()
        )));
    }

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut train = Vec::with_capacity(corpus.len());
    let mut test = Vec::new();
    for indices in by_label.values_mut() {
        rng.shuffle(indices);
        let n = indices.len();
        let n_test = ((n as f64 * test_fraction).round() as usize).clamp(1, n - 1);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// Fit vectorizer and classifier on already normalized documents.
pub fn fit_model<T, S>(docs: &[T], labels: &[S], config: &TrainConfig) -> Result<LanguageModel>
where
    T: AsRef<str> + Sync,
    S: AsRef<str>,
{
    let (vectorizer, vectors) = BowVectorizer::fit_transform(docs, config.vectorizer.clone())?;
    let classifier = MultinomialNb::fit(&vectors, labels, &config.classifier)?;
    LanguageModel::new(vectorizer, classifier)
}

/// Summary of a finished training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// exact-match accuracy on the test partition, in [0, 1]
    pub accuracy: f64,
    /// trained label set, sorted
    pub labels: Vec<String>,
    pub vocabulary_size: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub seed: u64,
    pub report: ClassificationReport,
}

/// Normalize, split, fit on the train side and evaluate on the test side.
/// Nothing is persisted here; see `LanguageDetector::train`.
pub fn train(corpus: &LabeledCorpus, config: &TrainConfig) -> Result<(LanguageModel, TrainingReport)> {
    config.validate()?;
    let split = stratified_split(corpus, config.test_fraction, config.seed)?;
    log::info!(
        "training on {} samples in {} languages (train={}, test={}, seed={})",
        corpus.len(),
        corpus.label_counts().len(),
        split.train.len(),
        split.test.len(),
        config.seed
    );

    let samples = corpus.samples();
    let normalized: Vec<String> = samples.par_iter().map(|s| normalize(&s.text)).collect();

    let train_docs: Vec<&str> = split.train.iter().map(|&i| normalized[i].as_str()).collect();
    let train_labels: Vec<&str> = split.train.iter().map(|&i| samples[i].label.as_str()).collect();
    let model = fit_model(&train_docs, &train_labels, config)?;
    log::info!(
        "fitted {} languages over {} features",
        model.labels().len(),
        model.vocabulary_size()
    );

    let predicted: Vec<&str> = split
        .test
        .par_iter()
        .map(|&i| {
            model
                .posterior_normalized(&normalized[i])
                .map(|p| model.labels()[p.best].as_str())
        })
        .collect::<Result<_>>()?;
    let expected: Vec<&str> = split.test.iter().map(|&i| samples[i].label.as_str()).collect();
    let report = ClassificationReport::new(&expected, &predicted);
    log::info!("accuracy on {} held out samples: {:.2}%", expected.len(), report.accuracy * 100.0);
    log::debug!("classification report\n{report}");

    let summary = TrainingReport {
        accuracy: report.accuracy,
        labels: model.labels().to_vec(),
        vocabulary_size: model.vocabulary_size(),
        train_size: split.train.len(),
        test_size: split.test.len(),
        seed: config.seed,
        report,
    };
    Ok((model, summary))
}

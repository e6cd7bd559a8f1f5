/// This crate is a language identification engine built from a bag-of-n-grams
/// vectorizer and a multinomial Naive Bayes classifier.
pub mod classifier;
pub mod corpus;
pub mod detector;
pub mod error;
pub mod model;
pub mod store;
pub mod training;
pub mod utils;
pub mod vectorizer;

/// Language Detector
/// The top-level struct of this crate. It owns the model lifecycle and serves
/// detection requests.
///
/// Internally, it holds:
/// - A model store (file or memory)
/// - The lifecycle phase (`Uninitialized`, `Loading`, `Ready`, `Training`)
/// - The currently published `LanguageModel` snapshot
///
/// Detection always runs against one immutable snapshot. Retraining builds a
/// complete new model, saves it, then swaps it in, so callers never observe a
/// half-updated model.
///
/// # Thread Safety
/// `LanguageDetector` is `Send + Sync`. Any number of threads may call `detect`
/// while one thread trains.
pub use detector::{LanguageDetector, ModelPhase};

/// Error type of this crate
/// Every fallible operation returns `Result<T, DetectError>`.
/// Text with no detectable content is not an error, see `DetectionResult`.
pub use error::{DetectError, Result};

/// Language Model
/// A fitted vectorizer and classifier pair, immutable once built.
///
/// `DetectionResult` carries the predicted label, its confidence, the full
/// probability distribution (most probable first) and text statistics.
pub use model::{DetectionResult, LanguageModel};

/// Bag-of-n-grams Vectorizer
/// Turns normalized text into sparse count vectors over a frozen vocabulary of
/// unigrams and bigrams.
///
/// # Serialization
/// Supported.
pub use vectorizer::{BowVectorizer, VectorizerConfig};

/// Multinomial Naive Bayes
/// Laplace-smoothed classifier over count vectors. Probabilities are computed
/// in log space and normalized with log-sum-exp.
///
/// # Serialization
/// Supported.
pub use classifier::{ClassPrior, ClassifierConfig, MultinomialNb};

/// Labeled corpora and where they come from
/// - `BundledCorpus`: sentences in twelve languages compiled into the binary
/// - `TsvCorpus`: a `label<TAB>sentence` file
/// - `LabeledCorpus`: an in-memory corpus, itself a source
pub use corpus::{BundledCorpus, CorpusSource, LabeledCorpus, TsvCorpus};

/// Training pipeline
/// Stratified split, fit on the train side, evaluation on the held-out side.
pub use training::{ClassificationReport, TrainConfig, TrainingReport};

/// Model persistence
/// `ModelArtifact` is the versioned on-disk bundle. `FileModelStore` writes it
/// atomically; `MemoryModelStore` keeps it in memory.
pub use store::{FileModelStore, MemoryModelStore, ModelArtifact, ModelStore};

/// Token Frequency structure
/// A first-seen ordered counter of tokens within a document.
pub use vectorizer::token::TokenFrequency;

/// Text normalization applied to every training sentence and query.
pub use utils::normalizer::normalize;

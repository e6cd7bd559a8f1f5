use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::corpus::CorpusSource;
use crate::error::{DetectError, Result};
use crate::model::{DetectionResult, LanguageModel};
use crate::store::{FileModelStore, MemoryModelStore, ModelArtifact, ModelStore};
use crate::training::{self, TrainConfig, TrainingReport};

/// Lifecycle of the served model.
///
/// ```text
/// Uninitialized -> Loading  -> Ready
/// Uninitialized -> Training -> Ready
/// Ready         -> Loading  -> Ready
/// Ready         -> Training -> Ready (new version)
/// ```
/// A failed load or training run falls back to `Ready` when a model is still
/// published, `Uninitialized` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelPhase {
    Uninitialized,
    Loading,
    Ready,
    Training,
}

impl ModelPhase {
    fn can_enter(self, next: ModelPhase) -> bool {
        use ModelPhase::*;
        matches!(
            (self, next),
            (Uninitialized, Loading) | (Uninitialized, Training) | (Ready, Loading) | (Ready, Training)
        )
    }
}

/// Serves language detection from an immutable model snapshot.
///
/// Readers clone an `Arc` of the current model and never block on training;
/// a finished training run replaces that `Arc` in one step, so every call
/// sees exactly one model version. At most one load or training run is in
/// flight at a time; callers that need a model while a load is running wait
/// for it.
pub struct LanguageDetector {
    store: Box<dyn ModelStore>,
    phase: Mutex<ModelPhase>,
    /// held for the whole of a store load
    load_gate: Mutex<()>,
    current: RwLock<Option<Arc<LanguageModel>>>,
    generation: AtomicU64,
}

/// Returns the detector to a resting phase unless the run committed.
/// Dropping it on an error path (or a panic) discards the run.
struct PhaseGuard<'a> {
    detector: &'a LanguageDetector,
    committed: bool,
}

impl PhaseGuard<'_> {
    fn commit(mut self) {
        self.committed = true;
        *self.detector.phase.lock() = ModelPhase::Ready;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.detector.settle();
        }
    }
}

impl LanguageDetector {
    pub fn new(store: impl ModelStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            phase: Mutex::new(ModelPhase::Uninitialized),
            load_gate: Mutex::new(()),
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Detector backed by `<dir>/language_model.cbor`.
    pub fn with_model_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(FileModelStore::new(dir))
    }

    /// Detector whose models only live in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryModelStore::new())
    }

    pub fn phase(&self) -> ModelPhase {
        *self.phase.lock()
    }

    /// Number of models published by this detector so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// The currently published model.
    pub fn snapshot(&self) -> Result<Arc<LanguageModel>> {
        self.current.read().clone().ok_or(DetectError::NotTrained)
    }

    /// Trained labels, empty before the first model is available.
    pub fn supported_languages(&self) -> Vec<String> {
        self.current
            .read()
            .as_ref()
            .map(|m| m.labels().to_vec())
            .unwrap_or_default()
    }

    fn begin(&self, next: ModelPhase) -> Result<PhaseGuard<'_>> {
        let mut phase = self.phase.lock();
        if !phase.can_enter(next) {
            return Err(match (*phase, next) {
                (ModelPhase::Training, ModelPhase::Training) => DetectError::TrainingInProgress,
                (from, to) => DetectError::InvalidTransition { from, to },
            });
        }
        log::debug!("model phase {:?} -> {:?}", *phase, next);
        *phase = next;
        Ok(PhaseGuard {
            detector: self,
            committed: false,
        })
    }

    /// back to Ready or Uninitialized depending on what is published
    fn settle(&self) {
        let resting = if self.is_ready() {
            ModelPhase::Ready
        } else {
            ModelPhase::Uninitialized
        };
        let mut phase = self.phase.lock();
        log::debug!("model phase {:?} -> {:?}", *phase, resting);
        *phase = resting;
    }

    fn publish(&self, model: LanguageModel) {
        let model = Arc::new(model);
        *self.current.write() = Some(model);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::info!("published model generation {generation}");
    }

    /// Load the stored model and publish it.
    ///
    /// # Errors
    /// * `ModelNotFound` - nothing stored yet
    /// * `CorruptArtifact` - stored bundle unusable; the previous model (if any) keeps serving
    /// * `InvalidTransition` - a training run is in flight
    pub fn load(&self) -> Result<()> {
        let _gate = self.load_gate.lock();
        self.load_locked()
    }

    /// caller holds `load_gate`
    fn load_locked(&self) -> Result<()> {
        let guard = self.begin(ModelPhase::Loading)?;
        match self.store.load_model() {
            Ok(model) => {
                log::info!(
                    "loaded model from {} ({} languages, {} features)",
                    self.store.describe(),
                    model.labels().len(),
                    model.vocabulary_size()
                );
                self.publish(model);
                guard.commit();
                Ok(())
            }
            Err(e) => {
                if e.is_corrupt() {
                    log::warn!("refusing stored model at {}: {e}", self.store.describe());
                }
                Err(e)
            }
        }
    }

    /// The published model, loading it from the store on first use.
    ///
    /// Concurrent callers on a cold detector share one load. A missing
    /// artifact, or a first training run that has not finished yet, surfaces
    /// as `NotTrained`.
    pub fn ensure_loaded(&self) -> Result<Arc<LanguageModel>> {
        if let Ok(model) = self.snapshot() {
            return Ok(model);
        }
        let _gate = self.load_gate.lock();
        // published while we waited on the gate
        if let Ok(model) = self.snapshot() {
            return Ok(model);
        }
        match self.load_locked() {
            Ok(()) => self.snapshot(),
            Err(DetectError::ModelNotFound { .. })
            | Err(DetectError::InvalidTransition {
                from: ModelPhase::Training,
                ..
            }) => Err(DetectError::NotTrained),
            Err(e) => Err(e),
        }
    }

    /// Detect the language of `text` with the published model.
    pub fn detect(&self, text: &str) -> Result<DetectionResult> {
        self.ensure_loaded()?.detect(text)
    }

    /// Detect many texts against one snapshot.
    pub fn detect_batch<S>(&self, texts: &[S]) -> Result<Vec<DetectionResult>>
    where
        S: AsRef<str> + Sync,
    {
        let model = self.ensure_loaded()?;
        texts.par_iter().map(|t| model.detect(t.as_ref())).collect()
    }

    /// Train on `source`, persist the artifact, then publish the new model.
    ///
    /// The previous model keeps serving while this runs. On any failure nothing
    /// is published.
    ///
    /// # Errors
    /// * `TrainingInProgress` - another run is active
    /// * `InsufficientData` / `InvalidConfig` - from the pipeline
    /// * `Io` / `Encode` - the artifact could not be saved
    pub fn train(&self, source: &dyn CorpusSource, config: &TrainConfig) -> Result<TrainingReport> {
        let guard = self.begin(ModelPhase::Training)?;
        let corpus = source.load()?;
        log::info!("training from {} corpus", source.name());
        let (model, report) = training::train(&corpus, config)?;
        self.store.save(&ModelArtifact::from_model(&model))?;
        log::info!(
            "trained languages [{}], vocabulary size {}, accuracy {:.4}",
            report.labels.join(", "),
            report.vocabulary_size,
            report.accuracy
        );
        self.publish(model);
        guard.commit();
        Ok(report)
    }
}

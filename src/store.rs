use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::classifier::MultinomialNb;
use crate::error::{DetectError, Result};
use crate::model::LanguageModel;
use crate::vectorizer::BowVectorizer;

/// Format marker written at the head of every artifact
pub const ARTIFACT_MAGIC: &str = "nb-lang-detect";
/// Bumped on any change to the artifact layout
pub const ARTIFACT_VERSION: u32 = 1;
/// File name used by `FileModelStore`
pub const DEFAULT_MODEL_FILE: &str = "language_model.cbor";

/// Serialized unit of one training run: vocabulary, classifier and labels
/// always travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    magic: String,
    version: u32,
    labels: Vec<String>,
    vectorizer: BowVectorizer,
    classifier: MultinomialNb,
}

/// Only the leading fields, decoded before trusting the rest
#[derive(Deserialize)]
struct ArtifactHeader {
    magic: String,
    version: u32,
}

impl ModelArtifact {
    pub fn from_model(model: &LanguageModel) -> Self {
        Self {
            magic: ARTIFACT_MAGIC.to_string(),
            version: ARTIFACT_VERSION,
            labels: model.labels().to_vec(),
            vectorizer: model.vectorizer().clone(),
            classifier: model.classifier().clone(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_cbor::to_vec(self).map_err(|e| DetectError::Encode(e.to_string()))
    }

    /// Decode and check the format marker. Any failure is `CorruptArtifact`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ArtifactHeader = serde_cbor::from_slice(bytes)
            .map_err(|e| DetectError::CorruptArtifact(format!("unreadable header: {e}")))?;
        if header.magic != ARTIFACT_MAGIC {
            return Err(DetectError::CorruptArtifact(format!("unknown format marker {:?}", header.magic)));
        }
        if header.version != ARTIFACT_VERSION {
            return Err(DetectError::CorruptArtifact(format!(
                "artifact version {} is not supported (expected {ARTIFACT_VERSION})",
                header.version
            )));
        }
        serde_cbor::from_slice(bytes).map_err(|e| DetectError::CorruptArtifact(format!("unreadable body: {e}")))
    }

    /// Check internal consistency and build the model.
    /// Nothing usable comes out of an inconsistent artifact.
    pub fn into_model(self) -> Result<LanguageModel> {
        self.classifier.validate().map_err(DetectError::CorruptArtifact)?;
        if self.labels.as_slice() != self.classifier.classes() {
            return Err(DetectError::CorruptArtifact(
                "label set does not match the classifier classes".into(),
            ));
        }
        if self.vectorizer.dim() != self.classifier.n_features() {
            return Err(DetectError::CorruptArtifact(format!(
                "vocabulary has {} entries but the classifier expects {}",
                self.vectorizer.dim(),
                self.classifier.n_features()
            )));
        }
        self.vectorizer
            .config()
            .validate()
            .map_err(|e| DetectError::CorruptArtifact(e.to_string()))?;
        LanguageModel::new(self.vectorizer, self.classifier)
            .map_err(|e| DetectError::CorruptArtifact(e.to_string()))
    }
}

/// Where trained models live between processes.
pub trait ModelStore: Send + Sync {
    /// Publish `artifact`. Readers see either the previous bundle or this one, never a mix.
    fn save(&self, artifact: &ModelArtifact) -> Result<()>;

    /// `ModelNotFound` when nothing was ever saved, `CorruptArtifact` when
    /// something is there but unusable.
    fn load(&self) -> Result<ModelArtifact>;

    /// for logs
    fn describe(&self) -> String;

    /// `load` + consistency checks
    fn load_model(&self) -> Result<LanguageModel> {
        self.load()?.into_model()
    }
}

/// Single-file store, written through a temp file in the same directory and
/// renamed into place.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    dir: PathBuf,
    file_name: String,
}

impl FileModelStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            file_name: DEFAULT_MODEL_FILE.to_string(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

impl ModelStore for FileModelStore {
    fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let bytes = artifact.to_bytes()?;
        fs::create_dir_all(&self.dir)?;

        let temp_file = NamedTempFile::new_in(&self.dir)?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            writer.write_all(&bytes)?;
            writer.flush()?;
        }
        temp_file.as_file().sync_all()?;
        let path = self.path();
        temp_file.persist(&path).map_err(|e| e.error)?;
        log::debug!("saved model artifact ({} bytes) to {}", bytes.len(), path.display());
        Ok(())
    }

    fn load(&self) -> Result<ModelArtifact> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(DetectError::ModelNotFound { path }),
            Err(e) => return Err(e.into()),
        };
        log::debug!("read model artifact ({} bytes) from {}", bytes.len(), path.display());
        ModelArtifact::from_bytes(&bytes)
    }

    fn describe(&self) -> String {
        self.path().display().to_string()
    }
}

/// Keeps the encoded bundle in memory; goes through the same encode/decode path as the file store.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw bytes, e.g. a damaged artifact.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes)),
        }
    }

    pub fn raw_bytes(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl ModelStore for MemoryModelStore {
    fn save(&self, artifact: &ModelArtifact) -> Result<()> {
        let bytes = artifact.to_bytes()?;
        *self.bytes.lock() = Some(bytes);
        Ok(())
    }

    fn load(&self) -> Result<ModelArtifact> {
        match self.bytes.lock().as_deref() {
            Some(bytes) => ModelArtifact::from_bytes(bytes),
            None => Err(DetectError::ModelNotFound {
                path: PathBuf::from("<memory>"),
            }),
        }
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{fit_model, TrainConfig};

    fn model() -> LanguageModel {
        let docs = ["hello world", "good morning", "bonjour le monde", "bonne nuit"];
        let labels = ["english", "english", "french", "french"];
        fit_model(&docs, &labels, &TrainConfig::default()).unwrap()
    }

    #[test]
    fn file_store_round_trip_keeps_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path().join("models"));
        let model = model();
        store.save(&ModelArtifact::from_model(&model)).unwrap();

        let loaded = store.load_model().unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.detect("bonjour le monde").unwrap(), model.detect("bonjour le monde").unwrap());
        // no temp files left next to the artifact
        let entries = fs::read_dir(dir.path().join("models")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        assert!(matches!(store.load(), Err(DetectError::ModelNotFound { .. })));
    }

    #[test]
    fn truncated_artifact_is_corrupt() {
        let bytes = ModelArtifact::from_model(&model()).to_bytes().unwrap();
        for cut in [1, bytes.len() / 4, bytes.len() / 2, bytes.len() - 1] {
            let store = MemoryModelStore::from_bytes(bytes[..cut].to_vec());
            assert!(
                matches!(store.load_model(), Err(DetectError::CorruptArtifact(_))),
                "cut at {cut} was accepted"
            );
        }
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        fs::write(store.path(), &bytes[..bytes.len() / 3]).unwrap();
        assert!(matches!(store.load_model(), Err(DetectError::CorruptArtifact(_))));
    }

    #[test]
    fn wrong_version_or_marker_is_rejected() {
        let mut artifact = ModelArtifact::from_model(&model());
        artifact.version = ARTIFACT_VERSION + 1;
        let err = ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap_err();
        assert!(matches!(err, DetectError::CorruptArtifact(msg) if msg.contains("version")));

        let mut artifact = ModelArtifact::from_model(&model());
        artifact.magic = "pickle".into();
        assert!(ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).is_err());

        assert!(ModelArtifact::from_bytes(b"not cbor at all").is_err());
    }

    #[test]
    fn mixed_training_runs_are_rejected() {
        let other = fit_model(
            &["ciao mondo", "buongiorno a tutti", "hola mundo", "buenos dias"],
            &["italian", "italian", "spanish", "spanish"],
            &TrainConfig::default(),
        )
        .unwrap();
        let mut artifact = ModelArtifact::from_model(&model());
        artifact.classifier = other.classifier().clone();
        assert!(matches!(artifact.into_model(), Err(DetectError::CorruptArtifact(_))));
    }

    #[test]
    fn memory_store_save_then_load() {
        let store = MemoryModelStore::new();
        assert!(matches!(store.load(), Err(DetectError::ModelNotFound { .. })));
        store.save(&ModelArtifact::from_model(&model())).unwrap();
        assert!(store.raw_bytes().is_some());
        assert_eq!(store.load().unwrap().labels(), &["english".to_string(), "french".to_string()]);
    }
}

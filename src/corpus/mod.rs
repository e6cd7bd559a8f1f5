use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// One labeled training sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledSample {
    pub label: String,
    pub text: String,
}

impl LabeledSample {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Ordered collection of labeled sentences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCorpus {
    samples: Vec<LabeledSample>,
}

impl LabeledCorpus {
    pub fn new() -> Self {
        Self { samples: Vec::new() }
    }

    pub fn push(&mut self, label: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.samples.push(LabeledSample::new(label, text));
        self
    }

    /// `label<TAB>sentence` per line; blank lines and lines starting with `#` are skipped.
    pub fn parse_tsv(input: &str) -> Result<Self> {
        let mut corpus = Self::new();
        for (i, raw) in input.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (label, text) = line.split_once('\t').ok_or_else(|| DetectError::MalformedCorpus {
                line: i + 1,
                reason: "expected label<TAB>sentence".into(),
            })?;
            let label = label.trim();
            if label.is_empty() {
                return Err(DetectError::MalformedCorpus {
                    line: i + 1,
                    reason: "empty label".into(),
                });
            }
            corpus.push(label, text.trim());
        }
        Ok(corpus)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[LabeledSample] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledSample> {
        self.samples.iter()
    }

    /// examples per label, labels in lexicographic order
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for s in &self.samples {
            *counts.entry(s.label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// distinct labels, sorted
    pub fn labels(&self) -> Vec<String> {
        self.label_counts().into_keys().map(str::to_string).collect()
    }
}

impl<L, T> FromIterator<(L, T)> for LabeledCorpus
where
    L: Into<String>,
    T: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (L, T)>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().map(|(l, t)| LabeledSample::new(l, t)).collect(),
        }
    }
}

/// Anything that can hand the training pipeline a labeled corpus.
pub trait CorpusSource {
    /// short name for logs
    fn name(&self) -> &str;
    fn load(&self) -> Result<LabeledCorpus>;
}

/// Corpus compiled into the binary: short everyday sentences in
/// english, persian, arabic, french, german, spanish, italian, russian,
/// turkish, chinese, japanese and hindi.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledCorpus;

impl BundledCorpus {
    const DATA: &'static str = include_str!("../../data/corpus.tsv");
}

impl CorpusSource for BundledCorpus {
    fn name(&self) -> &str {
        "bundled"
    }

    fn load(&self) -> Result<LabeledCorpus> {
        LabeledCorpus::parse_tsv(Self::DATA)
    }
}

/// Corpus read from a `label<TAB>sentence` file on disk.
#[derive(Debug, Clone)]
pub struct TsvCorpus {
    path: PathBuf,
    name: String,
}

impl TsvCorpus {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl CorpusSource for TsvCorpus {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<LabeledCorpus> {
        let content = fs::read_to_string(&self.path)?;
        LabeledCorpus::parse_tsv(&content)
    }
}

impl CorpusSource for LabeledCorpus {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn load(&self) -> Result<LabeledCorpus> {
        Ok(self.clone())
    }
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};
use crate::utils::math::{argmax, log_sum_exp, softmax_from_log};
use crate::vectorizer::feature::FeatureVector;

/// tolerance used when checking that stored distributions still sum to 1
const SUM_TOLERANCE: f64 = 1e-6;

/// How class priors are obtained at fit time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum ClassPrior {
    /// document share of each class in the training set
    #[default]
    Empirical,
    /// every class equally likely
    Uniform,
    /// caller supplied weights, normalized to sum to 1
    Fixed(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// additive (Laplace/Lidstone) smoothing, must be > 0
    pub alpha: f64,
    pub prior: ClassPrior,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            prior: ClassPrior::Empirical,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "alpha must be a positive finite number, got {}",
                self.alpha
            )));
        }
        if let ClassPrior::Fixed(weights) = &self.prior {
            if let Some((label, w)) = weights.iter().find(|(_, w)| !(w.is_finite() && **w > 0.0)) {
                return Err(DetectError::InvalidConfig(format!(
                    "prior for {label} must be positive, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Posterior over the trained classes for one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    /// index into `MultinomialNb::classes`
    pub best: usize,
    /// normalized probabilities aligned with `MultinomialNb::classes`
    pub probabilities: Vec<f64>,
}

impl Posterior {
    #[inline]
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.best]
    }
}

/// Multinomial Naive Bayes over count vectors.
///
/// Classes are kept in lexicographic order; that order is also the tie-break
/// when two classes get exactly the same posterior.
/// The parameters are computed once in `fit` and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultinomialNb {
    alpha: f64,
    classes: Vec<String>,
    /// training documents per class
    class_count: Vec<u64>,
    /// log P(class)
    class_log_prior: Vec<f64>,
    /// log P(feature | class), flattened [class * n_features + feature]
    feature_log_prob: Vec<f64>,
    n_features: usize,
}

impl MultinomialNb {
    /// Fit on feature vectors and their labels.
    ///
    /// prior(c) = docs(c) / docs (or per `ClassPrior`)
    /// P(f | c) = (count(f, c) + alpha) / (count(c) + alpha * n_features)
    ///
    /// # Errors
    /// * `InvalidConfig` - bad alpha/prior, or fixed priors missing a class
    /// * `InsufficientData` - no samples, or labels/vectors length mismatch
    /// * `DimensionMismatch` - vectors of different dimensions
    pub fn fit<S>(vectors: &[FeatureVector], labels: &[S], config: &ClassifierConfig) -> Result<Self>
    where
        S: AsRef<str>,
    {
        config.validate()?;
        if vectors.is_empty() {
            return Err(DetectError::InsufficientData("no training samples".into()));
        }
        if vectors.len() != labels.len() {
            return Err(DetectError::InsufficientData(format!(
                "{} feature vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        let n_features = vectors[0].dim();
        if n_features == 0 {
            return Err(DetectError::InsufficientData("empty feature space".into()));
        }
        if let Some(v) = vectors.iter().find(|v| v.dim() != n_features) {
            return Err(DetectError::DimensionMismatch {
                expected: n_features,
                found: v.dim(),
            });
        }

        let mut classes: Vec<String> = labels.iter().map(|l| l.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        let n_classes = classes.len();

        let mut class_count = vec![0u64; n_classes];
        let mut feature_count = vec![0u64; n_classes * n_features];
        let mut class_total = vec![0u64; n_classes];
        for (vector, label) in vectors.iter().zip(labels) {
            // classes is sorted and contains every label
            let c = classes
                .binary_search_by(|probe| probe.as_str().cmp(label.as_ref()))
                .map_err(|_| DetectError::InsufficientData("label vanished from class list".into()))?;
            class_count[c] += 1;
            for (f, count) in vector.iter() {
                feature_count[c * n_features + f] += count as u64;
                class_total[c] += count as u64;
            }
        }

        let class_log_prior = Self::log_prior(&classes, &class_count, &config.prior)?;

        let alpha = config.alpha;
        let mut feature_log_prob = vec![0f64; n_classes * n_features];
        for c in 0..n_classes {
            let denom = (class_total[c] as f64 + alpha * n_features as f64).ln();
            let row = c * n_features;
            for f in 0..n_features {
                feature_log_prob[row + f] = (feature_count[row + f] as f64 + alpha).ln() - denom;
            }
        }

        Ok(Self {
            alpha,
            classes,
            class_count,
            class_log_prior,
            feature_log_prob,
            n_features,
        })
    }

    fn log_prior(classes: &[String], class_count: &[u64], prior: &ClassPrior) -> Result<Vec<f64>> {
        let weights: Vec<f64> = match prior {
            ClassPrior::Empirical => class_count.iter().map(|&c| c as f64).collect(),
            ClassPrior::Uniform => vec![1.0; classes.len()],
            ClassPrior::Fixed(fixed) => {
                if let Some(extra) = fixed.keys().find(|k| classes.binary_search(*k).is_err()) {
                    return Err(DetectError::InvalidConfig(format!(
                        "fixed prior names unknown class {extra}"
                    )));
                }
                classes
                    .iter()
                    .map(|c| {
                        fixed.get(c).copied().ok_or_else(|| {
                            DetectError::InvalidConfig(format!("fixed prior is missing class {c}"))
                        })
                    })
                    .collect::<Result<_>>()?
            }
        };
        let total: f64 = weights.iter().sum();
        Ok(weights.iter().map(|w| (w / total).ln()).collect())
    }

    /// Unnormalized log posterior per class: log prior + sum(count * log P(f | c)).
    pub fn joint_log_likelihood(&self, x: &FeatureVector) -> Result<Vec<f64>> {
        if x.dim() != self.n_features {
            return Err(DetectError::DimensionMismatch {
                expected: self.n_features,
                found: x.dim(),
            });
        }
        let mut scores = self.class_log_prior.clone();
        for (c, score) in scores.iter_mut().enumerate() {
            let row = &self.feature_log_prob[c * self.n_features..(c + 1) * self.n_features];
            for (f, count) in x.iter() {
                *score += count as f64 * row[f];
            }
        }
        Ok(scores)
    }

    /// Normalized posterior, aligned with `classes()`.
    /// A zero vector yields the prior.
    pub fn predict_proba(&self, x: &FeatureVector) -> Result<Vec<f64>> {
        Ok(softmax_from_log(&self.joint_log_likelihood(x)?))
    }

    pub fn posterior(&self, x: &FeatureVector) -> Result<Posterior> {
        let jll = self.joint_log_likelihood(x)?;
        // argmax on the log scores, exact ties go to the lexicographically first class
        let best = argmax(&jll).unwrap_or(0);
        Ok(Posterior {
            best,
            probabilities: softmax_from_log(&jll),
        })
    }

    /// Most probable class and its probability.
    pub fn predict(&self, x: &FeatureVector) -> Result<(&str, f64)> {
        let posterior = self.posterior(x)?;
        Ok((self.classes[posterior.best].as_str(), posterior.confidence()))
    }

    #[inline]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn class_count(&self) -> &[u64] {
        &self.class_count
    }

    /// P(class) aligned with `classes()`
    pub fn priors(&self) -> Vec<f64> {
        self.class_log_prior.iter().map(|l| l.exp()).collect()
    }

    /// log P(feature | class) row for class index `c`
    pub fn feature_log_prob_row(&self, c: usize) -> Option<&[f64]> {
        (c < self.classes.len()).then(|| &self.feature_log_prob[c * self.n_features..(c + 1) * self.n_features])
    }

    /// Structural checks for parameters that did not come out of `fit`
    /// (deserialized artifacts). Fails on any inconsistency.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let n_classes = self.classes.len();
        if n_classes == 0 {
            return Err("classifier has no classes".into());
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            return Err("class labels are not sorted and unique".into());
        }
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(format!("invalid smoothing constant {}", self.alpha));
        }
        if self.n_features == 0 {
            return Err("classifier has an empty feature space".into());
        }
        if self.class_count.len() != n_classes || self.class_log_prior.len() != n_classes {
            return Err("per-class tables do not match the class list".into());
        }
        if self.feature_log_prob.len() != n_classes * self.n_features {
            return Err(format!(
                "likelihood table has {} entries, expected {} x {}",
                self.feature_log_prob.len(),
                n_classes,
                self.n_features
            ));
        }
        if self.class_log_prior.iter().chain(&self.feature_log_prob).any(|v| !v.is_finite()) {
            return Err("non-finite log probability".into());
        }
        let prior_mass = log_sum_exp(&self.class_log_prior).exp();
        if (prior_mass - 1.0).abs() > SUM_TOLERANCE {
            return Err(format!("class priors sum to {prior_mass}"));
        }
        for c in 0..n_classes {
            let row = &self.feature_log_prob[c * self.n_features..(c + 1) * self.n_features];
            let mass = log_sum_exp(row).exp();
            if (mass - 1.0).abs() > SUM_TOLERANCE {
                return Err(format!("likelihood row of {} sums to {mass}", self.classes[c]));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(dense: &[u32]) -> FeatureVector {
        FeatureVector::from_pairs(dense.len(), dense.iter().copied().enumerate())
    }

    fn toy() -> MultinomialNb {
        let x = vec![fv(&[2, 1, 0]), fv(&[1, 0, 0]), fv(&[0, 0, 3])];
        MultinomialNb::fit(&x, &["a", "a", "b"], &ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn fit_matches_hand_computed_parameters() {
        let nb = toy();
        assert_eq!(nb.classes(), &["a".to_string(), "b".to_string()]);
        let priors = nb.priors();
        assert!((priors[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((priors[1] - 1.0 / 3.0).abs() < 1e-12);
        // class a: counts (3, 1, 0), total 4, denom 4 + 3
        let row: Vec<f64> = nb.feature_log_prob_row(0).unwrap().iter().map(|l| l.exp()).collect();
        assert!((row[0] - 4.0 / 7.0).abs() < 1e-12);
        assert!((row[1] - 2.0 / 7.0).abs() < 1e-12);
        assert!((row[2] - 1.0 / 7.0).abs() < 1e-12);
        assert!(nb.validate().is_ok());
    }

    #[test]
    fn posterior_matches_hand_computation() {
        let nb = toy();
        let p = nb.predict_proba(&fv(&[1, 0, 0])).unwrap();
        // (2/3 * 4/7) / (2/3 * 4/7 + 1/3 * 1/6) = 48/55
        assert!((p[0] - 48.0 / 55.0).abs() < 1e-12);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let (label, confidence) = nb.predict(&fv(&[0, 0, 2])).unwrap();
        assert_eq!(label, "b");
        assert!(confidence > 0.5);
    }

    #[test]
    fn zero_vector_falls_back_to_prior() {
        let nb = toy();
        let p = nb.predict_proba(&FeatureVector::zeros(3)).unwrap();
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((p[1] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn exact_tie_goes_to_first_label() {
        let x = vec![fv(&[1, 0]), fv(&[0, 1])];
        let nb = MultinomialNb::fit(&x, &["zeta", "alpha"], &ClassifierConfig::default()).unwrap();
        let (label, confidence) = nb.predict(&FeatureVector::zeros(2)).unwrap();
        assert_eq!(label, "alpha");
        assert!((confidence - 0.5).abs() < 1e-12);
    }

    #[test]
    fn fixed_and_uniform_priors() {
        let x = vec![fv(&[2, 1, 0]), fv(&[1, 0, 0]), fv(&[0, 0, 3])];
        let fixed = ClassPrior::Fixed(BTreeMap::from([("a".to_string(), 0.25), ("b".to_string(), 0.5)]));
        let config = ClassifierConfig { prior: fixed, ..Default::default() };
        let nb = MultinomialNb::fit(&x, &["a", "a", "b"], &config).unwrap();
        let priors = nb.priors();
        assert!((priors[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((priors[1] - 2.0 / 3.0).abs() < 1e-12);

        let config = ClassifierConfig { prior: ClassPrior::Uniform, ..Default::default() };
        let nb = MultinomialNb::fit(&x, &["a", "a", "b"], &config).unwrap();
        assert!((nb.priors()[0] - 0.5).abs() < 1e-12);

        let missing = ClassPrior::Fixed(BTreeMap::from([("a".to_string(), 1.0)]));
        let config = ClassifierConfig { prior: missing, ..Default::default() };
        assert!(matches!(
            MultinomialNb::fit(&x, &["a", "a", "b"], &config),
            Err(DetectError::InvalidConfig(_))
        ));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let x = vec![fv(&[1, 0])];
        let config = ClassifierConfig { alpha: 0.0, ..Default::default() };
        assert!(matches!(MultinomialNb::fit(&x, &["a"], &config), Err(DetectError::InvalidConfig(_))));
        assert!(matches!(
            MultinomialNb::fit(&x, &["a", "b"], &ClassifierConfig::default()),
            Err(DetectError::InsufficientData(_))
        ));
        let mixed = vec![fv(&[1, 0]), fv(&[1, 0, 0])];
        assert!(matches!(
            MultinomialNb::fit(&mixed, &["a", "b"], &ClassifierConfig::default()),
            Err(DetectError::DimensionMismatch { .. })
        ));
        let nb = toy();
        assert!(matches!(
            nb.predict_proba(&FeatureVector::zeros(5)),
            Err(DetectError::DimensionMismatch { expected: 3, found: 5 })
        ));
    }

    #[test]
    fn validate_catches_tampered_parameters() {
        let mut nb = toy();
        nb.feature_log_prob[0] += 1.0;
        assert!(nb.validate().is_err());
        let mut nb = toy();
        nb.feature_log_prob.pop();
        assert!(nb.validate().is_err());
        let mut nb = toy();
        nb.classes.reverse();
        assert!(nb.validate().is_err());
    }
}

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Precision / recall / F1 for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// true instances of the label in the evaluated set
    pub support: usize,
}

/// Per-label evaluation of a test partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl ClassificationReport {
    /// Build from aligned true/predicted labels.
    /// Labels appearing only in predictions are reported with support 0.
    /// Undefined ratios (no predictions for a label) count as 0.
    pub fn new<S: AsRef<str>>(y_true: &[S], y_pred: &[S]) -> Self {
        let labels: BTreeSet<&str> = y_true.iter().chain(y_pred).map(|s| s.as_ref()).collect();
        let total = y_true.len();

        let mut classes = Vec::with_capacity(labels.len());
        for label in labels {
            let mut tp = 0usize;
            let mut predicted = 0usize;
            let mut support = 0usize;
            for (t, p) in y_true.iter().zip(y_pred) {
                let (t, p) = (t.as_ref(), p.as_ref());
                if t == label {
                    support += 1;
                }
                if p == label {
                    predicted += 1;
                    if t == label {
                        tp += 1;
                    }
                }
            }
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            classes.push(ClassMetrics {
                label: label.to_string(),
                precision,
                recall,
                f1: f1(precision, recall),
                support,
            });
        }

        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t.as_ref() == p.as_ref()).count();
        let n = classes.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            label: "macro avg".into(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
            support: total,
        };
        let weight = |f: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                0.0
            } else {
                classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".into(),
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
            support: total,
        };

        Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn get(&self, label: &str) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for avg in [&self.macro_avg, &self.weighted_avg] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                avg.label, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_match_hand_counts() {
        let y_true = ["en", "en", "fr", "fr", "de"];
        let y_pred = ["en", "fr", "fr", "fr", "en"];
        let report = ClassificationReport::new(&y_true, &y_pred);
        assert!((report.accuracy - 0.6).abs() < 1e-12);

        let en = report.get("en").unwrap();
        assert!((en.precision - 0.5).abs() < 1e-12);
        assert!((en.recall - 0.5).abs() < 1e-12);
        assert_eq!(en.support, 2);

        let fr = report.get("fr").unwrap();
        assert!((fr.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((fr.recall - 1.0).abs() < 1e-12);
        assert!((fr.f1 - 0.8).abs() < 1e-12);

        let de = report.get("de").unwrap();
        assert_eq!(de.precision, 0.0);
        assert_eq!(de.f1, 0.0);
        assert_eq!(report.macro_avg.support, 5);
    }

    #[test]
    fn display_lists_every_label() {
        let report = ClassificationReport::new(&["english", "persian"], &["english", "english"]);
        let table = report.to_string();
        assert!(table.contains("english"));
        assert!(table.contains("persian"));
        assert!(table.contains("weighted avg"));
    }

    #[test]
    fn empty_input_is_all_zero() {
        let empty: [&str; 0] = [];
        let report = ClassificationReport::new(&empty, &empty);
        assert!(report.classes.is_empty());
        assert_eq!(report.accuracy, 0.0);
    }
}

use crate::config::PipelineConfig;
use crate::error::{FitError, FitResult};
use crate::model::{fit_regressor, ModelKind, Regressor};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassBalance {
    pub actual_positives: usize,
    pub actual_negatives: usize,
    pub predicted_positives: usize,
    pub predicted_negatives: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl ConfusionMatrix {
    pub fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn class_balance(&self) -> ClassBalance {
        ClassBalance {
            actual_positives: self.true_positives + self.false_negatives,
            actual_negatives: self.true_negatives + self.false_positives,
            predicted_positives: self.true_positives + self.false_positives,
            predicted_negatives: self.true_negatives + self.false_negatives,
        }
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, rhs: Self) {
        self.true_positives += rhs.true_positives;
        self.false_positives += rhs.false_positives;
        self.true_negatives += rhs.true_negatives;
        self.false_negatives += rhs.false_negatives;
    }
}

/// Threshold metrics of one evaluated sample set. Undefined ratios are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FoldEvaluation {
    pub samples: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub specificity: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub class_balance: ClassBalance,
}

impl From<ConfusionMatrix> for FoldEvaluation {
    fn from(cm: ConfusionMatrix) -> Self {
        Self {
            samples: cm.total(),
            accuracy: cm.accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1: cm.f1(),
            specificity: cm.specificity(),
            confusion_matrix: cm,
            class_balance: cm.class_balance(),
        }
    }
}

/// Compare `predict(x) >= threshold` against each label. A non-finite raw
/// prediction never clears the threshold and counts as a negative.
pub fn evaluate_fold(
    model: &dyn Regressor,
    features: &[Vec<f64>],
    labels: &[bool],
    threshold: f64,
) -> FitResult<FoldEvaluation> {
    if features.len() != labels.len() {
        return Err(FitError::LengthMismatch { len_x: features.len(), len_y: labels.len() });
    }
    let mut cm = ConfusionMatrix::default();
    for (x, &actual) in features.iter().zip(labels) {
        let raw = model.predict(x)?;
        cm.record(raw >= threshold, actual);
    }
    Ok(FoldEvaluation::from(cm))
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdResult {
    pub threshold: f64,
    pub mean_f1: f64,
    /// Metrics of the confusion matrix summed over every fold.
    pub aggregate: FoldEvaluation,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationReport {
    pub folds: usize,
    pub samples: usize,
    pub positives: usize,
    pub negatives: usize,
    pub positive_fold_size: usize,
    pub negative_fold_size: usize,
    pub results: Vec<ThresholdResult>,
    pub best_threshold: f64,
    pub best_f1: f64,
    pub best: Option<FoldEvaluation>,
}

/// Stratified k-fold sweep over decision thresholds. Thresholds are given
/// on the probability scale and multiplied by the target maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    pub folds: usize,
    pub thresholds: Vec<f64>,
    pub shuffle_seed: Option<u64>,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            folds: 5,
            thresholds: vec![0.3, 0.4, 0.45, 0.5, 0.55, 0.6, 0.7],
            shuffle_seed: None,
        }
    }
}

impl CrossValidation {
    /// Test indices of fold `i`: one block of positives, one of negatives.
    fn test_indices(&self, i: usize, pos: &[usize], neg: &[usize]) -> Vec<usize> {
        let pf = pos.len() / self.folds;
        let nf = neg.len() / self.folds;
        pos[i * pf..(i + 1) * pf].iter().chain(&neg[i * nf..(i + 1) * nf]).copied().collect()
    }

    pub fn run(
        &self,
        kind: ModelKind,
        cfg: &PipelineConfig,
        features: &[Vec<f64>],
        targets: &[f64],
    ) -> FitResult<CrossValidationReport> {
        if features.len() != targets.len() {
            return Err(FitError::LengthMismatch { len_x: features.len(), len_y: targets.len() });
        }
        if self.folds < 2 {
            return Err(FitError::NotEnoughPoints { len: self.folds, needed: 2 });
        }

        let labels: Vec<bool> = targets.iter().map(|&t| cfg.target.label(t)).collect();
        let (mut pos, mut neg): (Vec<usize>, Vec<usize>) =
            (0..labels.len()).partition(|&i| labels[i]);
        if let Some(seed) = self.shuffle_seed {
            let mut rng = StdRng::seed_from_u64(seed);
            pos.shuffle(&mut rng);
            neg.shuffle(&mut rng);
        }
        log::info!(
            "Cross-validating {} samples ({} positive, {} negative) in {} folds",
            labels.len(),
            pos.len(),
            neg.len(),
            self.folds
        );

        // one fit per fold, shared by every threshold
        let mut fitted = Vec::with_capacity(self.folds);
        for i in 0..self.folds {
            let test = self.test_indices(i, &pos, &neg);
            let mut in_test = vec![false; labels.len()];
            for &idx in &test {
                in_test[idx] = true;
            }
            let (train_x, train_y): (Vec<Vec<f64>>, Vec<f64>) = (0..labels.len())
                .filter(|&idx| !in_test[idx])
                .map(|idx| (features[idx].clone(), targets[idx]))
                .unzip();
            let model = fit_regressor(kind, &train_x, &train_y, cfg)?;
            let test_x: Vec<Vec<f64>> = test.iter().map(|&idx| features[idx].clone()).collect();
            let test_labels: Vec<bool> = test.iter().map(|&idx| labels[idx]).collect();
            fitted.push((model, test_x, test_labels));
        }

        let mut results = Vec::with_capacity(self.thresholds.len());
        let mut best_threshold = cfg.target.decision_threshold();
        let mut best_f1 = 0.0;
        let mut best = None;
        for &t in &self.thresholds {
            let threshold = t * cfg.target.max();
            let mut f1_sum = 0.0;
            let mut cm = ConfusionMatrix::default();
            for (model, x, y) in &fitted {
                let eval = evaluate_fold(model.as_ref(), x, y, threshold)?;
                f1_sum += eval.f1;
                cm += eval.confusion_matrix;
            }
            let mean_f1 = f1_sum / self.folds as f64;
            let aggregate = FoldEvaluation::from(cm);
            log::debug!("threshold {threshold}: mean F1 {mean_f1:.4}");
            if mean_f1 > best_f1 {
                best_f1 = mean_f1;
                best_threshold = threshold;
                best = Some(aggregate);
            }
            results.push(ThresholdResult { threshold, mean_f1, aggregate });
        }

        Ok(CrossValidationReport {
            folds: self.folds,
            samples: labels.len(),
            positives: pos.len(),
            negatives: neg.len(),
            positive_fold_size: pos.len() / self.folds,
            negative_fold_size: neg.len() / self.folds,
            results,
            best_threshold,
            best_f1,
            best,
        })
    }
}

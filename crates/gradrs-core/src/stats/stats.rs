use crate::error::ScaleError;
use crate::record::StudentRecord;

use serde::Serialize;
use statrs::statistics::Statistics;

/// Summary of one numeric column over the valid record set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation (divides by n).
    pub std_dev: f64,
}

impl FeatureStats {
    pub fn from_values(feature: &'static str, values: &[f64]) -> Result<Self, ScaleError> {
        if values.is_empty() {
            return Err(ScaleError::Empty { feature });
        }
        Ok(Self {
            min: Statistics::min(values),
            max: Statistics::max(values),
            mean: Statistics::mean(values),
            std_dev: Statistics::population_std_dev(values),
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Grade and age statistics captured once per training pass. Every scaler
/// built from it keeps a copy, so later predictions use the same numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DatasetStatistics {
    pub grade: FeatureStats,
    pub age: FeatureStats,
}

impl DatasetStatistics {
    pub fn from_records(records: &[StudentRecord]) -> Result<Self, ScaleError> {
        let grades: Vec<f64> = records.iter().map(|r| r.grade).collect();
        let ages: Vec<f64> = records.iter().map(|r| r.age).collect();
        Ok(Self {
            grade: FeatureStats::from_values("grade", &grades)?,
            age: FeatureStats::from_values("age", &ages)?,
        })
    }
}

pub fn r2_from_predictions(y: &[f64], y_hat: &[f64]) -> Option<f64> {
    if y.len() != y_hat.len() || y.len() < 2 {
        return None;
    }

    let y_mean = y.iter().sum::<f64>() / y.len() as f64;

    let ss_res: f64 = y.iter().zip(y_hat).map(|(&yi, &yhi)| (yi - yhi).powi(2)).sum();
    let ss_tot: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return None;
    }

    Some(1.0 - ss_res / ss_tot)
}

pub fn adjusted_r2(r2: f64, n: usize, k: usize) -> f64 {
    if n <= k + 1 {
        return r2; // Not enough data to adjust
    }
    1.0 - (1.0 - r2) * (n as f64 - 1.0) / (n as f64 - k as f64 - 1.0)
}

pub fn rmse(y: &[f64], y_hat: &[f64]) -> Option<f64> {
    if y.len() != y_hat.len() || y.is_empty() {
        return None;
    }

    let sum_sq: f64 = y.iter().zip(y_hat.iter()).map(|(&yi, &yhi)| (yi - yhi).powi(2)).sum();

    Some((sum_sq / y.len() as f64).sqrt())
}

pub fn mean_abs_error(y: &[f64], y_hat: &[f64]) -> Option<f64> {
    if y.len() != y_hat.len() || y.is_empty() {
        return None;
    }
    let sum_abs: f64 = y.iter().zip(y_hat).map(|(&yi, &yhi)| (yi - yhi).abs()).sum();
    Some(sum_abs / y.len() as f64)
}

use crate::record::RecordBounds;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug)]
pub struct ParseConfigError(String);

impl fmt::Display for ParseConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for ParseConfigError {}

/// How raw records are turned into feature vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStrategy {
    /// 16 features built from grade/age z-scores with cross terms.
    ZScore,
    /// `[1, g, a, g², a², g·a]` with min-max scaled grade and age.
    #[default]
    MinMaxPoly,
    /// Grade z-score alone, fitted by a scalar polynomial.
    ScalarGrade,
}

impl FromStr for FeatureStrategy {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zscore" | "z-score" => Ok(FeatureStrategy::ZScore),
            "minmax" | "min-max" | "poly" => Ok(FeatureStrategy::MinMaxPoly),
            "scalar" | "grade" => Ok(FeatureStrategy::ScalarGrade),
            other => Err(ParseConfigError(format!("invalid feature strategy: {other}"))),
        }
    }
}

impl fmt::Display for FeatureStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureStrategy::ZScore => write!(f, "z-score"),
            FeatureStrategy::MinMaxPoly => write!(f, "min-max polynomial"),
            FeatureStrategy::ScalarGrade => write!(f, "scalar grade"),
        }
    }
}

/// Whether employed and unemployed students get their own model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    #[default]
    ByEmployment,
    Unsplit,
}

impl FromStr for SplitStrategy {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "employment" | "by-employment" | "split" => Ok(SplitStrategy::ByEmployment),
            "none" | "unsplit" => Ok(SplitStrategy::Unsplit),
            other => Err(ParseConfigError(format!("invalid split strategy: {other}"))),
        }
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitStrategy::ByEmployment => write!(f, "by employment"),
            SplitStrategy::Unsplit => write!(f, "unsplit"),
        }
    }
}

/// The target domain together with the thresholds that belong to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetScale {
    /// Boolean graduate flag, predictions on `[0, 1]`.
    #[default]
    Probability,
    /// Continuous success rate on `[0, 100]`.
    Percentage,
}

impl TargetScale {
    pub fn max(&self) -> f64 {
        match self {
            TargetScale::Probability => 1.0,
            TargetScale::Percentage => 100.0,
        }
    }
    pub fn neutral(&self) -> f64 {
        self.max() / 2.0
    }
    pub fn decision_threshold(&self) -> f64 {
        self.max() / 2.0
    }
    pub fn max_average_error(&self) -> f64 {
        self.max() / 2.0
    }
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(0.0, self.max())
    }
    /// Binary label of a target value.
    pub fn label(&self, value: f64) -> bool {
        value >= self.decision_threshold()
    }
}

impl FromStr for TargetScale {
    type Err = ParseConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "probability" | "prob" => Ok(TargetScale::Probability),
            "percentage" | "percent" => Ok(TargetScale::Percentage),
            other => Err(ParseConfigError(format!("invalid target scale: {other}"))),
        }
    }
}

impl fmt::Display for TargetScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetScale::Probability => write!(f, "probability"),
            TargetScale::Percentage => write!(f, "percentage"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureStrategy,
    pub split: SplitStrategy,
    pub target: TargetScale,
    pub bounds: RecordBounds,
    pub ridge_lambda: f64,
    pub poly_degree: usize,
    pub min_records: usize,
    pub min_success_ratio: f64,
    pub max_average_error: Option<f64>,
    pub decision_threshold: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureStrategy::default(),
            split: SplitStrategy::default(),
            target: TargetScale::default(),
            bounds: RecordBounds::default(),
            ridge_lambda: 0.01,
            poly_degree: 2,
            min_records: 2,
            min_success_ratio: 0.5,
            max_average_error: None,
            decision_threshold: None,
        }
    }
}

impl PipelineConfig {
    pub fn max_average_error(&self) -> f64 {
        self.max_average_error.unwrap_or_else(|| self.target.max_average_error())
    }

    pub fn decision_threshold(&self) -> f64 {
        self.decision_threshold.unwrap_or_else(|| self.target.decision_threshold())
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

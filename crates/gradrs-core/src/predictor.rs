use crate::config::{FeatureStrategy, PipelineConfig, SplitStrategy, TargetScale};
use crate::error::TrainError;
use crate::evaluate::{ConfusionMatrix, CrossValidation, CrossValidationReport, FoldEvaluation};
use crate::features::{FeatureInput, FeatureScaler};
use crate::model::{ModelBundle, ModelKind, ModelStats, Subset, TrainingSummary};
use crate::record::StudentRecord;
pub use crate::record::DEFAULT_AGE;
use crate::stats::DatasetStatistics;
use crate::trainer::Trainer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionQuery {
    pub grade: f64,
    pub employed: bool,
    pub age: f64,
    pub married: bool,
}

impl PredictionQuery {
    pub fn new(grade: f64, employed: bool, age: f64, married: bool) -> Self {
        Self { grade, employed, age, married }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    Model,
    Interpolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub probability: f64,
    pub will_graduate: bool,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetDiagnostics {
    pub subset: Subset,
    pub kind: ModelKind,
    pub coefficients: Vec<f64>,
    #[serde(flatten)]
    pub stats: ModelStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub trained: bool,
    pub features: FeatureStrategy,
    pub split: SplitStrategy,
    pub target: TargetScale,
    pub decision_threshold: f64,
    pub records: usize,
    pub trained_at: Option<DateTime<Utc>>,
    pub summary: Option<TrainingSummary>,
    pub statistics: Option<DatasetStatistics>,
    pub scaler: Option<FeatureScaler>,
    pub feature_names: Vec<&'static str>,
    pub subsets: Vec<SubsetDiagnostics>,
    /// Summed over every subset model.
    pub aggregate: Option<FoldEvaluation>,
}

/// Serves predictions from an optional accepted bundle, falling back to
/// interpolation over the valid records.
#[derive(Debug, Clone)]
pub struct Predictor {
    config: PipelineConfig,
    bundle: Option<ModelBundle>,
    records: Vec<StudentRecord>,
}

impl Predictor {
    /// `records` back the interpolation path. Records failing validation
    /// are dropped and the rest are kept in stable grade order.
    pub fn new(
        config: PipelineConfig,
        bundle: Option<ModelBundle>,
        mut records: Vec<StudentRecord>,
    ) -> Self {
        records.retain(|r| r.validate(&config.bounds, config.target).is_ok());
        records.sort_by(|a, b| a.grade.total_cmp(&b.grade));
        Self { config, bundle, records }
    }

    /// Validate, train once and keep whatever came out of it.
    pub fn fit(config: PipelineConfig, records: &[StudentRecord]) -> Self {
        let trainer = Trainer::new(config.clone());
        let valid = trainer.validate(records).records;
        let bundle = trainer.train(records);
        Self::new(config, bundle, valid)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        self.bundle.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    /// Model path when a usable model answers with a finite value,
    /// interpolation path otherwise. `None` only for non-finite inputs.
    pub fn predict(&self, query: &PredictionQuery, use_interpolation: bool) -> Option<Prediction> {
        if !query.grade.is_finite() || !query.age.is_finite() {
            log::warn!("Invalid input: grade {}, age {}", query.grade, query.age);
            return None;
        }
        let target = self.config.target;

        let model_value = if use_interpolation { None } else { self.model_value(query) };
        let (probability, source) = match model_value {
            Some(raw) => (target.clamp(raw), PredictionSource::Model),
            None => (self.interpolate(query), PredictionSource::Interpolation),
        };

        Some(Prediction {
            probability,
            will_graduate: probability >= self.config.decision_threshold(),
            source,
        })
    }

    /// Raw output of the subset model matching the query, if it has a
    /// finite one.
    fn model_value(&self, query: &PredictionQuery) -> Option<f64> {
        let bundle = self.bundle.as_ref()?;
        let Some(model) = bundle.model_for(query.employed) else {
            log::debug!("No model for employed={}, interpolating", query.employed);
            return None;
        };
        let input = FeatureInput::new(query.grade, query.employed, query.age, query.married);
        match model.predict(&bundle.scaler.scale(&input)) {
            Ok(raw) if raw.is_finite() => Some(raw),
            Ok(raw) => {
                log::debug!("Model returned {raw}, interpolating");
                None
            },
            Err(e) => {
                log::warn!("Prediction failed: {e}");
                None
            },
        }
    }

    /// Linear interpolation on grade between the nearest records of the
    /// same employment status (all records when none match).
    pub fn interpolate(&self, query: &PredictionQuery) -> f64 {
        if let Some(r) = self.records.iter().find(|r| {
            r.grade == query.grade && r.is_employed() == query.employed && r.age == query.age
        }) {
            return r.graduate;
        }

        let matching: Vec<&StudentRecord> =
            self.records.iter().filter(|r| r.is_employed() == query.employed).collect();
        let pool = if matching.is_empty() {
            self.records.iter().collect()
        } else {
            matching
        };

        let split = pool.partition_point(|r| r.grade < query.grade);
        let lower = split.checked_sub(1).map(|i| pool[i]);
        let upper = pool.get(split).copied();
        match (lower, upper) {
            (None, None) => self.config.target.neutral(),
            (Some(l), None) => l.graduate,
            (_, Some(u)) if u.grade == query.grade => u.graduate,
            (None, Some(u)) => u.graduate,
            (Some(l), Some(u)) => {
                // l.grade < query.grade < u.grade
                let ratio = (query.grade - l.grade) / (u.grade - l.grade);
                l.graduate + (u.graduate - l.graduate) * ratio
            },
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let mut subsets = Vec::new();
        let mut aggregate = None;
        if let Some(bundle) = &self.bundle {
            let mut cm = ConfusionMatrix::default();
            for m in bundle.models.iter() {
                cm += m.stats.evaluation.confusion_matrix;
                subsets.push(SubsetDiagnostics {
                    subset: m.subset,
                    kind: m.kind(),
                    coefficients: m.coefficients(),
                    stats: m.stats,
                });
            }
            aggregate = Some(FoldEvaluation::from(cm));
        }

        Diagnostics {
            trained: self.is_trained(),
            features: self.config.features,
            split: self.config.split,
            target: self.config.target,
            decision_threshold: self.config.decision_threshold(),
            records: self.records.len(),
            trained_at: self.bundle.as_ref().map(|b| b.trained_at),
            summary: self.bundle.as_ref().map(|b| b.summary.clone()),
            statistics: self.bundle.as_ref().map(|b| b.statistics),
            scaler: self.bundle.as_ref().map(|b| b.scaler),
            feature_names: self
                .bundle
                .as_ref()
                .map(|b| b.scaler.feature_names().to_vec())
                .unwrap_or_default(),
            subsets,
            aggregate,
        }
    }

    /// Threshold sweep over every valid record with a single model. Uses the
    /// bundle's scaler when trained, otherwise fresh statistics.
    pub fn cross_validate(
        &self,
        cv: &CrossValidation,
    ) -> Result<CrossValidationReport, TrainError> {
        let scaler = match &self.bundle {
            Some(b) => b.scaler,
            None => {
                let stats = DatasetStatistics::from_records(&self.records)?;
                FeatureScaler::from_stats(self.config.features, &stats)?
            },
        };
        let features: Vec<Vec<f64>> =
            self.records.iter().map(|r| scaler.scale_record(r)).collect();
        let targets: Vec<f64> = self.records.iter().map(|r| r.graduate).collect();
        let kind = ModelKind::for_strategy(self.config.features);
        cv.run(kind, &self.config, &features, &targets).map_err(TrainError::from)
    }
}

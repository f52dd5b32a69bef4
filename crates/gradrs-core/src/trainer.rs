use crate::config::{PipelineConfig, SplitStrategy};
use crate::error::{FitError, TrainError};
use crate::features::FeatureScaler;
use crate::model::{ModelBundle, ModelKind, Subset, SubsetModels, TrainedModel, TrainingSummary};
use crate::record::{InvalidReason, StudentRecord};
use crate::stats::DatasetStatistics;

use chrono::Utc;

use std::collections::BTreeMap;

/// Valid records in stable grade order plus the reasons the rest failed.
#[derive(Debug, Clone, Default)]
pub struct Validated {
    pub records: Vec<StudentRecord>,
    pub invalid_by_reason: BTreeMap<InvalidReason, usize>,
}

impl Validated {
    pub fn invalid_count(&self) -> usize {
        self.invalid_by_reason.values().sum()
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    pub config: PipelineConfig,
}

impl Trainer {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Train once, treating any failure as the absent-model state.
    pub fn train(&self, records: &[StudentRecord]) -> Option<ModelBundle> {
        match self.try_train(records) {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                log::warn!("Model not trained: {e}");
                None
            },
        }
    }

    pub fn validate(&self, records: &[StudentRecord]) -> Validated {
        let mut out = Validated::default();
        for r in records {
            match r.validate(&self.config.bounds, self.config.target) {
                Ok(()) => out.records.push(*r),
                Err(reason) => {
                    log::debug!("Invalid record ({reason}): {r}");
                    *out.invalid_by_reason.entry(reason).or_insert(0) += 1;
                },
            }
        }
        // sort_by is stable, ties keep input order
        out.records.sort_by(|a, b| a.grade.total_cmp(&b.grade));
        out
    }

    pub fn try_train(&self, records: &[StudentRecord]) -> Result<ModelBundle, TrainError> {
        let cfg = &self.config;
        let total = records.len();
        if total < cfg.min_records {
            return Err(TrainError::DataInsufficient { total, valid: 0 });
        }

        let validated = self.validate(records);
        let valid = &validated.records;
        if valid.len() < cfg.min_records {
            return Err(TrainError::DataInsufficient { total, valid: valid.len() });
        }
        log::info!(
            "Training on {} of {} records ({} invalid)",
            valid.len(),
            total,
            validated.invalid_count()
        );

        let statistics = DatasetStatistics::from_records(valid)?;
        let scaler = FeatureScaler::from_stats(cfg.features, &statistics)?;
        let kind = ModelKind::for_strategy(cfg.features);

        let models = match cfg.split {
            SplitStrategy::Unsplit => {
                let model = self
                    .fit_subset(Subset::All, kind, &scaler, valid)?
                    .ok_or(TrainError::DataInsufficient { total, valid: valid.len() })?;
                SubsetModels::Unsplit(model)
            },
            SplitStrategy::ByEmployment => {
                let (emp, unemp): (Vec<StudentRecord>, Vec<StudentRecord>) =
                    valid.iter().copied().partition(|r| r.is_employed());
                SubsetModels::ByEmployment {
                    employed: self.fit_subset(Subset::Employed, kind, &scaler, &emp)?,
                    unemployed: self.fit_subset(Subset::Unemployed, kind, &scaler, &unemp)?,
                }
            },
        };

        let errors: Vec<f64> = valid
            .iter()
            .filter_map(|r| {
                let model = models.model_for(r.is_employed())?;
                let raw = model.predict(&scaler.scale_record(r)).ok()?;
                raw.is_finite().then(|| (raw - r.graduate).abs())
            })
            .collect();
        let valid_predictions = errors.len();

        // all-or-nothing acceptance
        if valid_predictions == 0
            || (valid_predictions as f64) < cfg.min_success_ratio * valid.len() as f64
        {
            return Err(TrainError::ModelUnreliable(format!(
                "only {valid_predictions} of {} records produced a prediction",
                valid.len()
            )));
        }
        let average_error = errors.iter().sum::<f64>() / valid_predictions as f64;
        if average_error > cfg.max_average_error() {
            return Err(TrainError::ModelUnreliable(format!(
                "average error {average_error:.4} exceeds {}",
                cfg.max_average_error()
            )));
        }

        let employed_records = valid.iter().filter(|r| r.is_employed()).count();
        let summary = TrainingSummary {
            total_records: total,
            valid_records: valid.len(),
            invalid_records: validated.invalid_count(),
            invalid_by_reason: validated.invalid_by_reason.clone(),
            valid_predictions,
            average_error,
            employed_records,
            unemployed_records: valid.len() - employed_records,
            graduate_rate: share(
                valid.iter().filter(|r| cfg.target.label(r.graduate)).count(),
                valid.len(),
            ),
            employed_rate: share(employed_records, valid.len()),
            married_rate: share(valid.iter().filter(|r| r.is_married()).count(), valid.len()),
        };
        for m in models.iter() {
            log::info!("Fitted {m}");
        }
        log::info!("Model accepted, average error {average_error:.4}");

        Ok(ModelBundle {
            config: cfg.clone(),
            scaler,
            statistics,
            models,
            summary,
            trained_at: Utc::now(),
        })
    }

    /// Fit one subset. Subsets too small for the model are left without one.
    fn fit_subset(
        &self,
        subset: Subset,
        kind: ModelKind,
        scaler: &FeatureScaler,
        records: &[StudentRecord],
    ) -> Result<Option<TrainedModel>, TrainError> {
        if records.len() < 2 {
            log::warn!("Not enough {subset} records to fit: {}", records.len());
            return Ok(None);
        }
        let features: Vec<Vec<f64>> = records.iter().map(|r| scaler.scale_record(r)).collect();
        let targets: Vec<f64> = records.iter().map(|r| r.graduate).collect();

        match TrainedModel::from_data(subset, kind, &features, &targets, &self.config) {
            Ok(model) => Ok(Some(model)),
            Err(FitError::NotEnoughPoints { len, needed }) => {
                log::warn!("Skipping {subset} model: {len} records, {needed} needed");
                Ok(None)
            },
            Err(e) => Err(e.into()),
        }
    }
}

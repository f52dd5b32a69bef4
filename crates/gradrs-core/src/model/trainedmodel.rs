use crate::config::PipelineConfig;
use crate::error::FitResult;
use crate::evaluate::{evaluate_fold, FoldEvaluation};
use crate::model::bundle::Subset;
use crate::model::modelkind::ModelKind;
use crate::model::regressor::{fit_regressor, Regressor};
use crate::stats::{adjusted_r2, mean_abs_error, r2_from_predictions, rmse};

use serde::Serialize;

use std::fmt;

/// Goodness of fit of one subset model against its own training data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelStats {
    pub data_points: usize,
    /// `None` when the subset's targets have zero variance.
    pub r_squared: Option<f64>,
    pub adjusted_r_squared: Option<f64>,
    pub rmse: Option<f64>,
    pub mean_abs_error: Option<f64>,
    pub evaluation: FoldEvaluation,
}

#[derive(Clone)]
pub struct TrainedModel {
    pub subset: Subset,
    pub model: Box<dyn Regressor>,
    pub stats: ModelStats,
}

impl fmt::Display for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {}, n: {}, r2: {:?}",
            self.subset,
            self.model.kind(),
            self.stats.data_points,
            self.stats.r_squared
        )
    }
}

impl fmt::Debug for TrainedModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TrainedModel")
            .field("subset", &self.subset)
            .field("model", &self.model)
            .field("stats", &self.stats)
            .finish()
    }
}

impl TrainedModel {
    pub fn from_data(
        subset: Subset,
        kind: ModelKind,
        features: &[Vec<f64>],
        targets: &[f64],
        cfg: &PipelineConfig,
    ) -> FitResult<Self> {
        let model = fit_regressor(kind, features, targets, cfg)?;

        let y_hat = features.iter().map(|x| model.predict(x)).collect::<FitResult<Vec<f64>>>()?;
        // R² against this subset's own target mean
        let r_squared = r2_from_predictions(targets, &y_hat);
        let k = model.coefficients().len().saturating_sub(1);
        let adjusted_r_squared = r_squared.map(|r2| adjusted_r2(r2, targets.len(), k));

        let labels: Vec<bool> = targets.iter().map(|&t| cfg.target.label(t)).collect();
        let threshold = cfg.decision_threshold();
        let evaluation = evaluate_fold(model.as_ref(), features, &labels, threshold)?;

        let stats = ModelStats {
            data_points: targets.len(),
            r_squared,
            adjusted_r_squared,
            rmse: rmse(targets, &y_hat),
            mean_abs_error: mean_abs_error(targets, &y_hat),
            evaluation,
        };
        log::debug!("{subset} coefficients: {:?}", model.coefficients());

        Ok(Self { subset, model, stats })
    }

    pub fn predict(&self, features: &[f64]) -> FitResult<f64> {
        self.model.predict(features)
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn coefficients(&self) -> Vec<f64> {
        self.model.coefficients()
    }
}

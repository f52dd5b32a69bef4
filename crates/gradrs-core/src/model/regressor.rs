use crate::config::PipelineConfig;
use crate::error::{FitError, FitResult};
use crate::model::modelkind::ModelKind;
use crate::stats::{PolyReg, RidgeReg};

use dyn_clone::DynClone;

use std::any::Any;
use std::fmt;

/// A fitted model mapping one feature vector to one raw score.
pub trait Regressor: Sync + Send + DynClone {
    fn kind(&self) -> ModelKind;
    fn predict(&self, features: &[f64]) -> FitResult<f64>;
    fn coefficients(&self) -> Vec<f64>;
    /// Length of the feature vectors this model accepts.
    fn n_features(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}
dyn_clone::clone_trait_object!(Regressor);

impl fmt::Display for dyn Regressor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}, features: {}, coefficients: {:?}",
            self.kind(),
            self.n_features(),
            self.coefficients()
        )
    }
}

impl fmt::Debug for dyn Regressor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Regressor for RidgeReg {
    fn kind(&self) -> ModelKind {
        ModelKind::Ridge
    }
    fn predict(&self, features: &[f64]) -> FitResult<f64> {
        self.calculate(features)
    }
    fn coefficients(&self) -> Vec<f64> {
        RidgeReg::coefficients(self).map(<[f64]>::to_vec).unwrap_or_default()
    }
    fn n_features(&self) -> usize {
        RidgeReg::coefficients(self).map_or(0, <[f64]>::len)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Regressor for PolyReg {
    fn kind(&self) -> ModelKind {
        ModelKind::Poly
    }
    fn predict(&self, features: &[f64]) -> FitResult<f64> {
        match features {
            [x] => Ok(self.calculate(*x)),
            _ => Err(FitError::FeatureLengthMismatch { got: features.len(), expected: 1 }),
        }
    }
    fn coefficients(&self) -> Vec<f64> {
        self.coeffs.clone()
    }
    fn n_features(&self) -> usize {
        1
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Fit the regressor family `kind` to row-major features.
pub fn fit_regressor(
    kind: ModelKind,
    rows: &[Vec<f64>],
    y: &[f64],
    cfg: &PipelineConfig,
) -> FitResult<Box<dyn Regressor>> {
    match kind {
        ModelKind::Ridge => Ok(Box::new(RidgeReg::train_rows(rows, y, cfg.ridge_lambda)?)),
        ModelKind::Poly => {
            let x = rows
                .iter()
                .map(|r| match r.as_slice() {
                    [v] => Ok(*v),
                    _ => Err(FitError::FeatureLengthMismatch { got: r.len(), expected: 1 }),
                })
                .collect::<FitResult<Vec<f64>>>()?;
            Ok(Box::new(PolyReg::train(&x, y, cfg.poly_degree)?))
        },
    }
}

use crate::config::FeatureStrategy;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Ridge,
    Poly,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Ridge => write!(f, "Ridge regression"),
            ModelKind::Poly => write!(f, "Polynomial"),
        }
    }
}

impl ModelKind {
    /// The regressor family that consumes a feature strategy's vectors.
    pub fn for_strategy(strategy: FeatureStrategy) -> Self {
        match strategy {
            FeatureStrategy::ZScore | FeatureStrategy::MinMaxPoly => ModelKind::Ridge,
            FeatureStrategy::ScalarGrade => ModelKind::Poly,
        }
    }
}

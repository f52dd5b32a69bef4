use crate::config::{PipelineConfig, SplitStrategy};
use crate::features::FeatureScaler;
use crate::model::trainedmodel::TrainedModel;
use crate::record::InvalidReason;
use crate::stats::DatasetStatistics;

use chrono::{DateTime, Utc};
use serde::Serialize;

use std::collections::BTreeMap;
use std::fmt;

/// Which slice of the valid records a model was fit on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subset {
    Employed,
    Unemployed,
    All,
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subset::Employed => write!(f, "employed"),
            Subset::Unemployed => write!(f, "unemployed"),
            Subset::All => write!(f, "all"),
        }
    }
}

impl Subset {
    pub fn of(employed: bool, split: SplitStrategy) -> Self {
        match (split, employed) {
            (SplitStrategy::Unsplit, _) => Subset::All,
            (SplitStrategy::ByEmployment, true) => Subset::Employed,
            (SplitStrategy::ByEmployment, false) => Subset::Unemployed,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubsetModels {
    /// Either side may be missing when it had too few records.
    ByEmployment { employed: Option<TrainedModel>, unemployed: Option<TrainedModel> },
    Unsplit(TrainedModel),
}

impl SubsetModels {
    pub fn model_for(&self, employed: bool) -> Option<&TrainedModel> {
        match self {
            SubsetModels::ByEmployment { employed: e, unemployed: u } => {
                if employed {
                    e.as_ref()
                } else {
                    u.as_ref()
                }
            },
            SubsetModels::Unsplit(m) => Some(m),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainedModel> {
        let (a, b) = match self {
            SubsetModels::ByEmployment { employed, unemployed } => {
                (employed.as_ref(), unemployed.as_ref())
            },
            SubsetModels::Unsplit(m) => (Some(m), None),
        };
        a.into_iter().chain(b)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingSummary {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub invalid_by_reason: BTreeMap<InvalidReason, usize>,
    /// Valid records whose re-prediction was finite.
    pub valid_predictions: usize,
    pub average_error: f64,
    pub employed_records: usize,
    pub unemployed_records: usize,
    pub graduate_rate: f64,
    pub employed_rate: f64,
    pub married_rate: f64,
}

/// Everything produced by one accepted training pass. Immutable once built;
/// share it by reference between prediction callers.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub config: PipelineConfig,
    pub scaler: FeatureScaler,
    pub statistics: DatasetStatistics,
    pub models: SubsetModels,
    pub summary: TrainingSummary,
    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    pub fn model_for(&self, employed: bool) -> Option<&TrainedModel> {
        self.models.model_for(employed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_of() {
        assert_eq!(Subset::of(true, SplitStrategy::ByEmployment), Subset::Employed);
        assert_eq!(Subset::of(false, SplitStrategy::ByEmployment), Subset::Unemployed);
        assert_eq!(Subset::of(true, SplitStrategy::Unsplit), Subset::All);
    }

    #[test]
    fn test_empty_split_has_no_models() {
        let models = SubsetModels::ByEmployment { employed: None, unemployed: None };
        assert!(models.is_empty());
        assert!(models.model_for(true).is_none());
        assert!(models.model_for(false).is_none());
    }
}

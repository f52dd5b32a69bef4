use crate::config::FeatureStrategy;
use crate::error::ScaleError;
use crate::features::minmax::{MinMaxScaler, MINMAX_FEATURES};
use crate::features::zscore::{GradeScaler, ZScoreScaler, ZSCORE_FEATURES};
use crate::record::StudentRecord;
use crate::stats::DatasetStatistics;

use serde::Serialize;

/// Fixed-order features; index `i` always pairs with coefficient `i`.
pub type FeatureVector = Vec<f64>;

/// Raw inputs of one scaling call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureInput {
    pub grade: f64,
    pub age: f64,
    pub employed: f64,
    pub married: f64,
}

impl From<&StudentRecord> for FeatureInput {
    fn from(r: &StudentRecord) -> Self {
        Self { grade: r.grade, age: r.age, employed: r.employed, married: r.married }
    }
}

impl FeatureInput {
    pub fn new(grade: f64, employed: bool, age: f64, married: bool) -> Self {
        Self {
            grade,
            age,
            employed: f64::from(u8::from(employed)),
            married: f64::from(u8::from(married)),
        }
    }
}

/// The feature builder of one trained bundle. Its parameters are frozen at
/// construction, so scaling is pure and deterministic afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FeatureScaler {
    ZScore(ZScoreScaler),
    MinMaxPoly(MinMaxScaler),
    ScalarGrade(GradeScaler),
}

impl FeatureScaler {
    pub fn from_stats(
        strategy: FeatureStrategy,
        stats: &DatasetStatistics,
    ) -> Result<Self, ScaleError> {
        Ok(match strategy {
            FeatureStrategy::ZScore => FeatureScaler::ZScore(ZScoreScaler::new(stats)?),
            FeatureStrategy::MinMaxPoly => {
                FeatureScaler::MinMaxPoly(MinMaxScaler::from_stats(stats)?)
            },
            FeatureStrategy::ScalarGrade => FeatureScaler::ScalarGrade(GradeScaler::new(stats)?),
        })
    }

    pub fn strategy(&self) -> FeatureStrategy {
        match self {
            FeatureScaler::ZScore(_) => FeatureStrategy::ZScore,
            FeatureScaler::MinMaxPoly(_) => FeatureStrategy::MinMaxPoly,
            FeatureScaler::ScalarGrade(_) => FeatureStrategy::ScalarGrade,
        }
    }

    pub fn scale(&self, input: &FeatureInput) -> FeatureVector {
        match self {
            FeatureScaler::ZScore(s) => s.scale(input),
            FeatureScaler::MinMaxPoly(s) => s.scale(input),
            FeatureScaler::ScalarGrade(s) => s.scale(input),
        }
    }

    pub fn scale_record(&self, record: &StudentRecord) -> FeatureVector {
        self.scale(&FeatureInput::from(record))
    }

    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            FeatureScaler::ZScore(_) => &ZSCORE_FEATURES,
            FeatureScaler::MinMaxPoly(_) => &MINMAX_FEATURES,
            FeatureScaler::ScalarGrade(_) => &["z_grade"],
        }
    }

    pub fn len(&self) -> usize {
        self.feature_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FeatureStats;

    fn stats() -> DatasetStatistics {
        DatasetStatistics {
            grade: FeatureStats { min: 1.0, max: 4.0, mean: 2.5, std_dev: 0.75 },
            age: FeatureStats { min: 18.0, max: 30.0, mean: 22.0, std_dev: 3.0 },
        }
    }

    #[test]
    fn test_lengths_match_names() {
        let input = FeatureInput::new(3.0, true, 21.0, false);
        for strategy in
            [FeatureStrategy::ZScore, FeatureStrategy::MinMaxPoly, FeatureStrategy::ScalarGrade]
        {
            let scaler = FeatureScaler::from_stats(strategy, &stats()).unwrap();
            assert_eq!(scaler.strategy(), strategy);
            assert_eq!(scaler.scale(&input).len(), scaler.len());
        }
    }

    #[test]
    fn test_scale_is_deterministic() {
        let scaler = FeatureScaler::from_stats(FeatureStrategy::ZScore, &stats()).unwrap();
        let r = StudentRecord::new(3.3, false, 24.0, true, 1.0);
        assert_eq!(scaler.scale_record(&r), scaler.scale_record(&r));
    }
}

use crate::error::ScaleError;
use crate::features::scaler::FeatureInput;
use crate::stats::{DatasetStatistics, FeatureStats};

use serde::Serialize;

pub const ZSCORE_FEATURES: [&str; 16] = [
    "z_grade",
    "z_grade^2",
    "z_grade^3",
    "z_age",
    "z_age^2",
    "employed",
    "married",
    "z_grade*employed",
    "z_grade*z_age",
    "z_age*employed",
    "employed*married",
    "z_grade*married",
    "z_age*married",
    "z_grade>1",
    "z_grade>0",
    "z_grade<-1",
];

fn checked_std(feature: &'static str, stats: &FeatureStats) -> Result<f64, ScaleError> {
    if !stats.std_dev.is_finite() || stats.std_dev <= f64::EPSILON {
        return Err(ScaleError::ZeroVariance { feature });
    }
    Ok(stats.std_dev)
}

fn indicator(cond: bool) -> f64 {
    if cond {
        1.0
    } else {
        0.0
    }
}

/// Z-score normalisation of grade and age with cubic grade terms,
/// cross terms and grade bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZScoreScaler {
    pub grade_mean: f64,
    pub grade_std: f64,
    pub age_mean: f64,
    pub age_std: f64,
}

impl ZScoreScaler {
    pub fn new(stats: &DatasetStatistics) -> Result<Self, ScaleError> {
        Ok(Self {
            grade_mean: stats.grade.mean,
            grade_std: checked_std("grade", &stats.grade)?,
            age_mean: stats.age.mean,
            age_std: checked_std("age", &stats.age)?,
        })
    }

    pub fn z_grade(&self, grade: f64) -> f64 {
        (grade - self.grade_mean) / self.grade_std
    }

    pub fn z_age(&self, age: f64) -> f64 {
        (age - self.age_mean) / self.age_std
    }

    pub fn scale(&self, input: &FeatureInput) -> Vec<f64> {
        let g = self.z_grade(input.grade);
        let a = self.z_age(input.age);
        let e = input.employed;
        let m = input.married;

        vec![
            g,
            g.powi(2),
            g.powi(3),
            a,
            a.powi(2),
            e,
            m,
            g * e,
            g * a,
            a * e,
            e * m,
            g * m,
            a * m,
            indicator(g > 1.0),
            indicator(g > 0.0),
            indicator(g < -1.0),
        ]
    }
}

/// Grade z-score on its own, the input of the scalar polynomial model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradeScaler {
    pub grade_mean: f64,
    pub grade_std: f64,
}

impl GradeScaler {
    pub fn new(stats: &DatasetStatistics) -> Result<Self, ScaleError> {
        Ok(Self { grade_mean: stats.grade.mean, grade_std: checked_std("grade", &stats.grade)? })
    }

    pub fn scale(&self, input: &FeatureInput) -> Vec<f64> {
        vec![(input.grade - self.grade_mean) / self.grade_std]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(grade_mean: f64, grade_std: f64, age_mean: f64, age_std: f64) -> DatasetStatistics {
        DatasetStatistics {
            grade: FeatureStats { min: 0.0, max: 4.0, mean: grade_mean, std_dev: grade_std },
            age: FeatureStats { min: 18.0, max: 40.0, mean: age_mean, std_dev: age_std },
        }
    }

    #[test]
    fn test_zscore_vector_layout() {
        let scaler = ZScoreScaler::new(&stats(2.0, 1.0, 25.0, 5.0)).unwrap();
        let input = FeatureInput { grade: 3.5, age: 30.0, employed: 1.0, married: 0.0 };
        let v = scaler.scale(&input);

        assert_eq!(v.len(), ZSCORE_FEATURES.len());
        assert_eq!(v[0], 1.5);
        assert_eq!(v[1], 2.25);
        assert_eq!(v[2], 3.375);
        assert_eq!(v[3], 1.0);
        assert_eq!(v[4], 1.0);
        assert_eq!(v[5], 1.0);
        assert_eq!(v[6], 0.0);
        assert_eq!(v[7], 1.5);
        assert_eq!(v[8], 1.5);
        assert_eq!(v[9], 1.0);
        assert_eq!(v[10], 0.0);
        assert_eq!(v[11], 0.0);
        assert_eq!(v[12], 0.0);
        assert_eq!(&v[13..], &[1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_zscore_low_band() {
        let scaler = ZScoreScaler::new(&stats(2.0, 0.5, 25.0, 5.0)).unwrap();
        let input = FeatureInput { grade: 1.0, age: 25.0, employed: 0.0, married: 1.0 };
        let v = scaler.scale(&input);
        assert_eq!(v[0], -2.0);
        assert_eq!(&v[13..], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_zero_variance_is_an_error() {
        assert_eq!(
            ZScoreScaler::new(&stats(2.0, 1.0, 25.0, 0.0)),
            Err(ScaleError::ZeroVariance { feature: "age" })
        );
        assert_eq!(
            GradeScaler::new(&stats(2.0, 0.0, 25.0, 5.0)),
            Err(ScaleError::ZeroVariance { feature: "grade" })
        );
    }

    #[test]
    fn test_grade_scaler_ignores_age_variance() {
        let scaler = GradeScaler::new(&stats(2.0, 0.5, 25.0, 0.0)).unwrap();
        let v = scaler.scale(&FeatureInput { grade: 3.0, age: 25.0, employed: 0.0, married: 0.0 });
        assert_eq!(v, vec![2.0]);
    }
}

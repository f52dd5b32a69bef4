use crate::error::ScaleError;
use crate::features::scaler::FeatureInput;
use crate::stats::DatasetStatistics;

use serde::Serialize;

pub const MINMAX_FEATURES: [&str; 6] = ["bias", "grade", "age", "grade^2", "age^2", "grade*age"];

/// Min-max scaling of grade and age followed by a full degree-2 basis.
/// Inputs outside the training range extrapolate; nothing is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MinMaxScaler {
    pub min_grade: f64,
    pub max_grade: f64,
    pub min_age: f64,
    pub max_age: f64,
}

impl MinMaxScaler {
    pub fn new(
        min_grade: f64,
        max_grade: f64,
        min_age: f64,
        max_age: f64,
    ) -> Result<Self, ScaleError> {
        if !(max_grade - min_grade).is_finite() || max_grade - min_grade <= f64::EPSILON {
            return Err(ScaleError::ZeroRange { feature: "grade" });
        }
        if !(max_age - min_age).is_finite() || max_age - min_age <= f64::EPSILON {
            return Err(ScaleError::ZeroRange { feature: "age" });
        }
        Ok(Self { min_grade, max_grade, min_age, max_age })
    }

    pub fn from_stats(stats: &DatasetStatistics) -> Result<Self, ScaleError> {
        Self::new(stats.grade.min, stats.grade.max, stats.age.min, stats.age.max)
    }

    pub fn scaled_grade(&self, grade: f64) -> f64 {
        (grade - self.min_grade) / (self.max_grade - self.min_grade)
    }

    pub fn scaled_age(&self, age: f64) -> f64 {
        (age - self.min_age) / (self.max_age - self.min_age)
    }

    pub fn scale(&self, input: &FeatureInput) -> Vec<f64> {
        let g = self.scaled_grade(input.grade);
        let a = self.scaled_age(input.age);
        vec![1.0, g, a, g * g, a * a, g * a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(grade: f64, age: f64) -> FeatureInput {
        FeatureInput { grade, age, employed: 0.0, married: 0.0 }
    }

    #[test]
    fn test_minmax_vector() {
        let scaler = MinMaxScaler::new(1.0, 3.0, 20.0, 30.0).unwrap();
        let v = scaler.scale(&input(2.0, 25.0));
        assert_eq!(v, vec![1.0, 0.5, 0.5, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_within_range_lies_in_unit_interval() {
        let scaler = MinMaxScaler::new(0.5, 4.0, 18.0, 40.0).unwrap();
        for i in 0..=35 {
            let grade = 0.5 + i as f64 * 0.1;
            for age in [18.0, 22.5, 31.0, 40.0] {
                let v = scaler.scale(&input(grade, age));
                assert!(v[1..].iter().all(|x| (-1e-12..=1.0 + 1e-12).contains(x)), "{v:?}");
            }
        }
    }

    #[test]
    fn test_extrapolation_is_not_clamped() {
        let scaler = MinMaxScaler::new(1.0, 3.0, 20.0, 30.0).unwrap();
        let v = scaler.scale(&input(5.0, 10.0));
        assert_eq!(v[1], 2.0);
        assert_eq!(v[2], -1.0);
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_zero_range_is_an_error() {
        assert_eq!(
            MinMaxScaler::new(2.0, 2.0, 18.0, 30.0),
            Err(ScaleError::ZeroRange { feature: "grade" })
        );
        assert_eq!(
            MinMaxScaler::new(1.0, 2.0, 20.0, 20.0),
            Err(ScaleError::ZeroRange { feature: "age" })
        );
    }
}

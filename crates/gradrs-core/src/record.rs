use crate::config::TargetScale;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Age assumed when a row or query does not carry one.
pub const DEFAULT_AGE: f64 = 20.0;

/// One row of the training data. Fields are kept as raw numbers so that
/// malformed values survive ingestion and are rejected by [`StudentRecord::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub grade: f64,
    pub age: f64,
    pub employed: f64,
    pub married: f64,
    pub graduate: f64,
}

/// Inclusive ranges a record must fall in to be used for training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordBounds {
    pub grade_min: f64,
    pub grade_max: f64,
    pub age_min: f64,
    pub age_max: f64,
}

impl Default for RecordBounds {
    fn default() -> Self {
        Self::gpa()
    }
}

impl RecordBounds {
    /// GPA grades on `[0, 4]`, ages `[18, 40]`.
    pub fn gpa() -> Self {
        Self { grade_min: 0.0, grade_max: 4.0, age_min: 18.0, age_max: 40.0 }
    }

    /// Percentage grades on `[0, 100]`, ages `[16, 100]`.
    pub fn percentage() -> Self {
        Self { grade_min: 0.0, grade_max: 100.0, age_min: 16.0, age_max: 100.0 }
    }

    pub fn contains_grade(&self, grade: f64) -> bool {
        (self.grade_min..=self.grade_max).contains(&grade)
    }

    pub fn contains_age(&self, age: f64) -> bool {
        (self.age_min..=self.age_max).contains(&age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    Grade,
    Age,
    Graduate,
    Employed,
    Married,
    OutOfRange,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::Grade => write!(f, "Invalid grade"),
            InvalidReason::Age => write!(f, "Invalid age"),
            InvalidReason::Graduate => write!(f, "Invalid graduate value"),
            InvalidReason::Employed => write!(f, "Invalid employed status"),
            InvalidReason::Married => write!(f, "Invalid married status"),
            InvalidReason::OutOfRange => write!(f, "Values out of range"),
        }
    }
}

fn is_flag(v: f64) -> bool {
    v == 0.0 || v == 1.0
}

impl StudentRecord {
    pub fn new(grade: f64, employed: bool, age: f64, married: bool, graduate: f64) -> Self {
        Self {
            grade,
            age,
            employed: f64::from(u8::from(employed)),
            married: f64::from(u8::from(married)),
            graduate,
        }
    }

    /// First failing check wins; checks run in a fixed order.
    pub fn validate(
        &self,
        bounds: &RecordBounds,
        target: TargetScale,
    ) -> Result<(), InvalidReason> {
        if !self.grade.is_finite() {
            return Err(InvalidReason::Grade);
        }
        if !self.age.is_finite() {
            return Err(InvalidReason::Age);
        }
        let graduate_ok = match target {
            TargetScale::Probability => is_flag(self.graduate),
            TargetScale::Percentage => self.graduate.is_finite(),
        };
        if !graduate_ok {
            return Err(InvalidReason::Graduate);
        }
        if !is_flag(self.employed) {
            return Err(InvalidReason::Employed);
        }
        if !is_flag(self.married) {
            return Err(InvalidReason::Married);
        }
        if !bounds.contains_grade(self.grade)
            || !bounds.contains_age(self.age)
            || !(0.0..=target.max()).contains(&self.graduate)
        {
            return Err(InvalidReason::OutOfRange);
        }
        Ok(())
    }

    pub fn is_employed(&self) -> bool {
        self.employed == 1.0
    }

    pub fn is_married(&self) -> bool {
        self.married == 1.0
    }
}

impl fmt::Display for StudentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grade: {}, age: {}, employed: {}, married: {}, graduate: {}",
            self.grade, self.age, self.employed, self.married, self.graduate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(grade: f64, employed: f64, age: f64, married: f64, graduate: f64) -> StudentRecord {
        StudentRecord { grade, age, employed, married, graduate }
    }

    #[test]
    fn test_valid_record() {
        let r = StudentRecord::new(3.2, true, 22.0, false, 1.0);
        assert_eq!(r.validate(&RecordBounds::gpa(), TargetScale::Probability), Ok(()));
    }

    #[test]
    fn test_nan_grade() {
        let r = rec(f64::NAN, 0.0, 22.0, 0.0, 1.0);
        assert_eq!(
            r.validate(&RecordBounds::gpa(), TargetScale::Probability),
            Err(InvalidReason::Grade)
        );
    }

    #[test]
    fn test_non_boolean_flags() {
        let b = RecordBounds::gpa();
        assert_eq!(
            rec(3.0, 2.0, 22.0, 0.0, 1.0).validate(&b, TargetScale::Probability),
            Err(InvalidReason::Employed)
        );
        assert_eq!(
            rec(3.0, 1.0, 22.0, 0.5, 1.0).validate(&b, TargetScale::Probability),
            Err(InvalidReason::Married)
        );
        assert_eq!(
            rec(3.0, 1.0, 22.0, 0.0, 0.7).validate(&b, TargetScale::Probability),
            Err(InvalidReason::Graduate)
        );
    }

    #[test]
    fn test_out_of_range() {
        let b = RecordBounds::gpa();
        assert_eq!(
            rec(4.5, 1.0, 22.0, 0.0, 1.0).validate(&b, TargetScale::Probability),
            Err(InvalidReason::OutOfRange)
        );
        assert_eq!(
            rec(3.0, 1.0, 50.0, 0.0, 1.0).validate(&b, TargetScale::Probability),
            Err(InvalidReason::OutOfRange)
        );
    }

    #[test]
    fn test_percentage_target() {
        let b = RecordBounds::percentage();
        assert_eq!(rec(75.0, 0.0, 30.0, 1.0, 62.5).validate(&b, TargetScale::Percentage), Ok(()));
        assert_eq!(
            rec(75.0, 0.0, 30.0, 1.0, 120.0).validate(&b, TargetScale::Percentage),
            Err(InvalidReason::OutOfRange)
        );
    }
}

pub mod minmax;
pub mod scaler;
pub mod zscore;

pub use minmax::MinMaxScaler;
pub use scaler::{FeatureInput, FeatureScaler, FeatureVector};
pub use zscore::{GradeScaler, ZScoreScaler};

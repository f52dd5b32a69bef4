pub mod polyreg;
pub mod ridgereg;
pub mod stats;

pub use polyreg::PolyReg;
pub use ridgereg::RidgeReg;
pub use stats::{
    adjusted_r2, mean_abs_error, r2_from_predictions, rmse, DatasetStatistics, FeatureStats,
};

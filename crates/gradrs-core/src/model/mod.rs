pub mod bundle;
pub mod modelkind;
pub mod regressor;
pub mod trainedmodel;

pub use bundle::{ModelBundle, Subset, SubsetModels, TrainingSummary};
pub use modelkind::ModelKind;
pub use regressor::{fit_regressor, Regressor};
pub use trainedmodel::{ModelStats, TrainedModel};

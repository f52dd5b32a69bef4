pub mod config;
pub mod csv_parse;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod model;
pub mod predictor;
pub mod processevent;
pub mod record;
pub mod stats;
pub mod trainer;

pub use config::{FeatureStrategy, PipelineConfig, SplitStrategy, TargetScale};
pub use error::{FitError, IngestError, ScaleError, TrainError};
pub use model::ModelBundle;
pub use predictor::{Diagnostics, Prediction, PredictionQuery, PredictionSource, Predictor};
pub use record::{RecordBounds, StudentRecord, DEFAULT_AGE};
pub use trainer::Trainer;

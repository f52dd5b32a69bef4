use std::path::PathBuf;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("x and y have different lengths: {len_x} vs {len_y}")]
    LengthMismatch { len_x: usize, len_y: usize },
    #[error("not enough points: got {len}, need at least {needed}")]
    NotEnoughPoints { len: usize, needed: usize },
    #[error("normal equations are singular (pivot {pivot:e} in column {column})")]
    Singular { column: usize, pivot: f64 },
    #[error("{0} are singular")]
    SingularMatrix(&'static str),
    #[error("model not trained")]
    NotTrained,
    #[error("feature vector has {got} elements, model expects {expected}")]
    FeatureLengthMismatch { got: usize, expected: usize },
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

pub type FitResult<T> = Result<T, FitError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("{feature} has zero standard deviation, z-score is undefined")]
    ZeroVariance { feature: &'static str },
    #[error("{feature} has min == max, min-max scaling is undefined")]
    ZeroRange { feature: &'static str },
    #[error("no records to compute {feature} statistics from")]
    Empty { feature: &'static str },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TrainError {
    #[error("not enough data to train: {total} records, {valid} valid")]
    DataInsufficient { total: usize, valid: usize },
    #[error("model unreliable: {0}")]
    ModelUnreliable(String),
    #[error("degenerate features: {0}")]
    DegenerateFeatures(#[from] ScaleError),
    #[error("solver failed: {0}")]
    SolverDegenerate(#[from] FitError),
}

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },
    #[error("ingestion task failed: {0}")]
    Join(String),
}

use gradrs_core::csv_parse::load_records_async;
use gradrs_core::evaluate::CrossValidation;
use gradrs_core::processevent::{
    drain_progress_messages, ProcessEvent, ProcessEventSink, ProgressEvent, ReadEvent,
};
use gradrs_core::{
    FeatureStrategy, IngestError, PipelineConfig, PredictionQuery, PredictionSource, Predictor,
    RecordBounds, SplitStrategy, StudentRecord, TargetScale,
};

use itertools::iproduct;
use rayon::prelude::*;
use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/* =================== Public configuration types =================== */

#[derive(Debug)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub delimiter: u8,
    pub overrides: Overrides,
    pub action: Action,
    pub progress_receiver: Option<UnboundedReceiver<ProcessEvent>>,
}

#[derive(Debug, Clone)]
pub enum Action {
    Train,
    Predict(Predict),
    Grid(Grid),
    Evaluate(Evaluate),
}

#[derive(Debug, Clone)]
pub struct Predict {
    pub grade: f64,
    pub employed: bool,
    pub age: f64,
    pub married: bool,
    pub interpolate: bool,
}

#[derive(Debug, Clone)]
pub struct Grid {
    pub ages: Vec<f64>,
    pub step: f64,
}

#[derive(Debug, Clone)]
pub struct Evaluate {
    pub folds: usize,
    pub seed: Option<u64>,
}

/// Pipeline settings from the command line, applied over the json file
/// (or the defaults when no file is given).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub features: Option<FeatureStrategy>,
    pub split: Option<SplitStrategy>,
    pub target: Option<TargetScale>,
}

impl Overrides {
    pub fn pipeline(&self) -> Result<PipelineConfig, CmdError> {
        let mut cfg = match &self.config_file {
            Some(path) => PipelineConfig::from_json_str(&std::fs::read_to_string(path)?)?,
            None => PipelineConfig::default(),
        };
        if let Some(features) = self.features {
            cfg.features = features;
        }
        if let Some(split) = self.split {
            cfg.split = split;
        }
        if let Some(target) = self.target {
            cfg.target = target;
            // bounds from a config file win
            if self.config_file.is_none() {
                cfg.bounds = match target {
                    TargetScale::Probability => RecordBounds::gpa(),
                    TargetScale::Percentage => RecordBounds::percentage(),
                };
            }
        }
        Ok(cfg)
    }
}

/* =================== Error type (no process::exit) =================== */

#[derive(thiserror::Error, Debug)]
pub enum CmdError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ingestion failed: {0}")]
    Ingest(#[from] IngestError),
    #[error("{0}")]
    Msg(String),
}

/* =================== Output types =================== */

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPoint {
    pub grade: f64,
    pub age: f64,
    pub employed: bool,
    pub married: bool,
    pub probability: f64,
    pub will_graduate: bool,
    pub source: PredictionSource,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridReport {
    pub trained: bool,
    pub points: Vec<GridPoint>,
    /// R-squared of each subset model, keyed by subset name.
    pub r_squared: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    status: &'a str,
    message: &'a str,
}

/// Upper limit on grades per grid.
pub const MAX_GRID_GRADES: usize = 10_000;

/// Grades from `min` to `max` inclusive, `step` apart.
pub fn grid_grades(min: f64, max: f64, step: f64) -> Result<Vec<f64>, CmdError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(CmdError::Msg(format!("Grid step must be positive, got {step}")));
    }
    let steps = ((max - min) / step + 1e-9).floor();
    if !steps.is_finite() || steps >= MAX_GRID_GRADES as f64 {
        return Err(CmdError::Msg(format!(
            "Grid step {step} gives more than {MAX_GRID_GRADES} grades between {min} and {max}"
        )));
    }
    let n = steps.max(0.0) as usize + 1;
    Ok((0..n).map(|i| (min + i as f64 * step).min(max)).collect())
}

/* =================== Entry point =================== */

impl Config {
    pub fn run(&mut self) -> Result<(), CmdError> {
        let pipeline = self.overrides.pipeline()?;
        let records = self.load_records()?;
        log::info!(
            "Training on {} records, features: {}, split: {}, target: {}",
            records.len(),
            pipeline.features,
            pipeline.split,
            pipeline.target
        );
        let predictor = Predictor::fit(pipeline, &records);

        let out = match &self.action {
            Action::Train => serde_json::to_string_pretty(&predictor.diagnostics())?,
            Action::Predict(p) => run_predict(&predictor, p)?,
            Action::Grid(g) => serde_json::to_string_pretty(&run_grid(&predictor, g)?)?,
            Action::Evaluate(e) => run_evaluate(&predictor, e)?,
        };
        println!("{out}");
        Ok(())
    }
}

/* =================== Actions =================== */

fn run_predict(predictor: &Predictor, p: &Predict) -> Result<String, CmdError> {
    let query = PredictionQuery::new(p.grade, p.employed, p.age, p.married);
    match predictor.predict(&query, p.interpolate) {
        Some(prediction) => Ok(serde_json::to_string_pretty(&prediction)?),
        None => Ok(serde_json::to_string_pretty(&ErrorResponse {
            status: "error",
            message: "Invalid input: grade and age must be finite numbers",
        })?),
    }
}

pub fn run_grid(predictor: &Predictor, g: &Grid) -> Result<GridReport, CmdError> {
    let bounds = predictor.config().bounds;
    let grades = grid_grades(bounds.grade_min, bounds.grade_max, g.step)?;
    let cells: Vec<(f64, f64, bool, bool)> =
        iproduct!(grades, g.ages.iter().copied(), [false, true], [false, true]).collect();

    let points = cells
        .par_iter()
        .filter_map(|&(grade, age, employed, married)| {
            let q = PredictionQuery::new(grade, employed, age, married);
            predictor.predict(&q, false).map(|p| GridPoint {
                grade,
                age,
                employed,
                married,
                probability: p.probability,
                will_graduate: p.will_graduate,
                source: p.source,
            })
        })
        .collect();

    let r_squared = predictor
        .diagnostics()
        .subsets
        .iter()
        .map(|s| (s.subset.to_string(), s.stats.r_squared))
        .collect();

    Ok(GridReport { trained: predictor.is_trained(), points, r_squared })
}

fn run_evaluate(predictor: &Predictor, e: &Evaluate) -> Result<String, CmdError> {
    let cv = CrossValidation { folds: e.folds, shuffle_seed: e.seed, ..Default::default() };
    let report = predictor.cross_validate(&cv).map_err(|e| CmdError::Msg(e.to_string()))?;
    log::info!("Best threshold {} with mean F1 {:.3}", report.best_threshold, report.best_f1);
    Ok(serde_json::to_string_pretty(&report)?)
}

impl Config {
    fn load_records(&mut self) -> Result<Vec<StudentRecord>, CmdError> {
        if self.inputs.is_empty() {
            return Err(CmdError::Msg("No input files matched".to_owned()));
        }
        let (progress_sender, progress_receiver) = unbounded_channel::<ProcessEvent>();
        self.progress_receiver = Some(progress_receiver);

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        let handle =
            runtime.spawn(load_records_async(self.inputs.clone(), self.delimiter, progress_sender));

        loop {
            self.handle_progress_messages();
            if handle.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(50));
        }
        let records = runtime
            .block_on(handle)
            .map_err(|e| CmdError::Msg(format!("Ingestion task failed: {e}")))??;
        self.handle_progress_messages();

        if records.is_empty() {
            return Err(CmdError::Msg("No records read".to_owned()));
        }
        Ok(records)
    }

    pub fn handle_progress_messages(&mut self) {
        if let Some(mut receiver) = self.progress_receiver.take() {
            drain_progress_messages(self, &mut receiver);
            self.progress_receiver = Some(receiver);
        }
    }
}

impl ProcessEventSink for Config {
    fn on_read_event(&mut self, ev: &ReadEvent) {
        match ev {
            ReadEvent::File(filename) => {
                log::debug!("Reading file: {filename}");
            },
            ReadEvent::FileRows(filename, rows) => {
                log::info!("Read file: {filename} with {rows} rows");
            },
            ReadEvent::FileFail(filename, e) => {
                log::warn!("Failed to read file {filename}, error: {e}");
            },
            ReadEvent::RowFail { file, row, reason } => {
                log::warn!("Skipped row {row} of {file}: {reason}");
            },
        }
    }

    fn on_progress_event(&mut self, ev: &ProgressEvent) {
        match ev {
            ProgressEvent::Records(n) => log::info!("Loaded {n} records"),
        }
    }

    fn on_done(&mut self, res: &Result<(), String>) {
        match res {
            Ok(()) => log::info!("Ingestion finished."),
            Err(e) => log::warn!("Ingestion finished with error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_records() -> Vec<StudentRecord> {
        (0..40)
            .map(|i| {
                let grade = 0.1 * i as f64;
                let graduate = if grade > 2.0 { 1.0 } else { 0.0 };
                StudentRecord::new(grade, i % 2 == 0, 18.0 + (i % 7) as f64, i % 3 == 0, graduate)
            })
            .collect()
    }

    #[test]
    fn test_grid_grades_inclusive() {
        let grades = grid_grades(0.0, 4.0, 0.5).unwrap();
        assert_eq!(grades.len(), 9);
        assert_eq!(grades[0], 0.0);
        assert_eq!(grades[8], 4.0);
        assert_eq!(grid_grades(0.0, 4.0, 0.1).unwrap().len(), 41);
        assert!(grid_grades(0.0, 4.0, 0.0).is_err());
        assert!(grid_grades(0.0, 4.0, 1e-12).is_err());
        assert_eq!(grid_grades(0.0, 100.0, 0.02).unwrap().len(), 5001);
    }

    #[test]
    fn test_predict_reports_invalid_input() {
        let predictor = Predictor::fit(PipelineConfig::default(), &separable_records());
        let p = Predict {
            grade: f64::NAN,
            employed: false,
            age: 20.0,
            married: false,
            interpolate: false,
        };
        let out = run_predict(&predictor, &p).unwrap();
        assert!(out.contains("\"status\": \"error\""), "{out}");
        assert!(out.contains("must be finite"), "{out}");

        let ok = run_predict(&predictor, &Predict { grade: 3.5, ..p }).unwrap();
        assert!(ok.contains("\"willGraduate\""), "{ok}");
    }

    #[test]
    fn test_overrides_apply_over_defaults() {
        let o = Overrides {
            target: Some(TargetScale::Percentage),
            split: Some(SplitStrategy::Unsplit),
            ..Default::default()
        };
        let cfg = o.pipeline().unwrap();
        assert_eq!(cfg.target, TargetScale::Percentage);
        assert_eq!(cfg.split, SplitStrategy::Unsplit);
        assert_eq!(cfg.bounds, RecordBounds::percentage());
        assert_eq!(cfg.features, FeatureStrategy::MinMaxPoly);
    }

    #[test]
    fn test_grid_covers_every_combination() {
        let predictor = Predictor::fit(PipelineConfig::default(), &separable_records());
        let grid = Grid { ages: vec![20.0, 30.0], step: 1.0 };
        let report = run_grid(&predictor, &grid).unwrap();
        // 5 grades x 2 ages x employed x married
        assert_eq!(report.points.len(), 40);
        assert!(report.points.iter().all(|p| (0.0..=1.0).contains(&p.probability)));
        assert_eq!(report.r_squared.len(), predictor.diagnostics().subsets.len());
    }

    #[test]
    fn test_run_train_from_file() {
        let path = std::env::temp_dir().join(format!("gradrs-cli-{}.csv", std::process::id()));
        let mut csv = String::from("grade,employed,age,married,graduate\n");
        for r in separable_records() {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                r.grade, r.employed, r.age, r.married, r.graduate
            ));
        }
        std::fs::write(&path, csv).unwrap();

        let mut cfg = Config {
            inputs: vec![path.clone()],
            delimiter: b',',
            overrides: Overrides::default(),
            action: Action::Train,
            progress_receiver: None,
        };
        let res = cfg.run();
        std::fs::remove_file(&path).unwrap();
        assert!(res.is_ok(), "{res:?}");
    }

    #[test]
    fn test_no_inputs_is_an_error() {
        let mut cfg = Config {
            inputs: Vec::new(),
            delimiter: b',',
            overrides: Overrides::default(),
            action: Action::Train,
            progress_receiver: None,
        };
        assert!(matches!(cfg.run(), Err(CmdError::Msg(_))));
    }
}

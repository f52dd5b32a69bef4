use clap::{Args, Parser, Subcommand, ValueHint};
use glob::glob;
use std::path::PathBuf;

use crate::cmd::config::{Action, Config, Evaluate, Grid, Overrides, Predict};

use gradrs_core::{FeatureStrategy, SplitStrategy, TargetScale, DEFAULT_AGE};

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("delimiter must be a single ascii character, got '{s}'")),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "gradrs",
    about = "Graduation outcome prediction from student records",
    version,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Train on the input files and print diagnostics
    Train(DataArgs),

    /// Predict the outcome of one student
    Predict(PredictArgs),

    /// Print predictions over a grade x age grid for plotting
    Grid(GridArgs),

    /// Sweep decision thresholds with stratified k-fold cross-validation
    Evaluate(EvaluateArgs),
}

/* ----------------------- shared ----------------------- */

#[derive(Debug, Args)]
pub struct DataArgs {
    /// Csv files or glob patterns (quote the pattern)
    #[arg(num_args = 1..,
        value_hint = ValueHint::AnyPath,
        required = true,
        short = 'd', long = "data",
        value_name = "Input files")]
    pub inputs: Vec<String>,

    /// Field delimiter of the input files
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// Pipeline configuration as json
    #[arg(short = 'c', long = "config", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Feature strategy (zscore, minmax, scalar)
    #[arg(long)]
    pub features: Option<FeatureStrategy>,

    /// Subset split (employment, none)
    #[arg(long)]
    pub split: Option<SplitStrategy>,

    /// Target scale (probability, percentage)
    #[arg(long)]
    pub target: Option<TargetScale>,
}

impl DataArgs {
    /// Expand `inputs` into actual files.
    pub fn resolve_files(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();

        for inp in &self.inputs {
            // treat as glob if it has wildcards
            if inp.contains('*') || inp.contains('?') || inp.contains('[') {
                match glob(inp) {
                    Ok(paths) => out.extend(paths.filter_map(Result::ok)),
                    Err(e) => log::error!("Invalid glob '{inp}': {e}"),
                }
            } else {
                out.push(PathBuf::from(inp));
            }
        }

        out
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            features: self.features,
            split: self.split,
            target: self.target,
        }
    }
}

/* ----------------------- predict ----------------------- */

#[derive(Debug, Args)]
pub struct PredictArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Grade of the student
    #[arg(short = 'g', long, allow_hyphen_values = true)]
    pub grade: f64,

    /// Student is employed
    #[arg(short = 'e', long)]
    pub employed: bool,

    /// Age of the student
    #[arg(short = 'a', long, default_value_t = DEFAULT_AGE)]
    pub age: f64,

    /// Student is married
    #[arg(short = 'm', long)]
    pub married: bool,

    /// Skip the model and interpolate between neighbouring records
    #[arg(short = 'i', long)]
    pub interpolate: bool,
}

/* ------------------------- grid ------------------------- */

#[derive(Debug, Args)]
pub struct GridArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Ages to evaluate
    #[arg(short = 'a', long = "age", num_args = 1.., default_values_t = [20.0, 25.0, 30.0])]
    pub ages: Vec<f64>,

    /// Grade step between grid points
    #[arg(short = 's', long, default_value_t = 0.1)]
    pub step: f64,
}

/* ----------------------- evaluate ----------------------- */

#[derive(Debug, Args)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Number of folds
    #[arg(short = 'k', long, default_value_t = 5)]
    pub folds: usize,

    /// Seed for shuffling records before folding
    #[arg(short = 's', long)]
    pub seed: Option<u64>,
}

// -------- Map CLI -> Config/Action types --------

impl Cli {
    pub fn into_config(self) -> Config {
        let (data, action) = match self.command {
            Commands::Train(data) => (data, Action::Train),
            Commands::Predict(args) => (
                args.data,
                Action::Predict(Predict {
                    grade: args.grade,
                    employed: args.employed,
                    age: args.age,
                    married: args.married,
                    interpolate: args.interpolate,
                }),
            ),
            Commands::Grid(args) => {
                (args.data, Action::Grid(Grid { ages: args.ages, step: args.step }))
            },
            Commands::Evaluate(args) => (
                args.data,
                Action::Evaluate(Evaluate { folds: args.folds, seed: args.seed }),
            ),
        };

        Config {
            inputs: data.resolve_files(),
            delimiter: data.delimiter,
            overrides: data.overrides(),
            action,
            progress_receiver: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "gradrs", "predict", "-d", "a.csv", "b.csv", "--grade", "3.2", "--employed",
            "--features", "zscore",
        ])
        .unwrap();
        let cfg = cli.into_config();
        assert_eq!(cfg.inputs, vec![PathBuf::from("a.csv"), PathBuf::from("b.csv")]);
        assert_eq!(cfg.overrides.features, Some(FeatureStrategy::ZScore));
        match cfg.action {
            Action::Predict(p) => {
                assert_eq!(p.grade, 3.2);
                assert!(p.employed);
                assert!(!p.married);
                assert_eq!(p.age, DEFAULT_AGE);
            },
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_parse_grid_and_delimiter() {
        let cli = Cli::try_parse_from([
            "gradrs", "grid", "-d", "a.csv", "--delimiter", "tab", "--age", "19", "35",
        ])
        .unwrap();
        let cfg = cli.into_config();
        assert_eq!(cfg.delimiter, b'\t');
        match cfg.action {
            Action::Grid(g) => {
                assert_eq!(g.ages, vec![19.0, 35.0]);
                assert_eq!(g.step, 0.1);
            },
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_inputs_are_required() {
        assert!(Cli::try_parse_from(["gradrs", "train"]).is_err());
        assert!(parse_delimiter(";;").is_err());
    }
}

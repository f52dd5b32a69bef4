use gradrs_core::csv_parse::load_records_async;
use gradrs_core::evaluate::CrossValidation;
use gradrs_core::processevent::{ProcessEvent, ReadEvent};
use gradrs_core::{
    FeatureStrategy, PipelineConfig, PredictionQuery, PredictionSource, Predictor, SplitStrategy,
};

use std::fmt::Write;
use std::path::PathBuf;

use tokio::sync::mpsc::unbounded_channel;

/// Students with grade above 2.0 graduate; age and marital status vary.
fn dataset_csv() -> String {
    let mut out = String::from("grade,employed,age,married,graduate\n");
    for i in 0..60 {
        let grade = 0.05 + 0.065 * i as f64;
        let employed = i % 2;
        let age = 18 + (i * 7) % 20;
        let married = u8::from(i % 5 == 0);
        let graduate = u8::from(grade > 2.0);
        writeln!(out, "{grade:.3},{employed},{age},{married},{graduate}").unwrap();
    }
    // rejected during validation
    out.push_str("abc,0,20,0,1\n");
    out.push_str("3.1,2,20,0,1\n");
    out
}

fn write_tmp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gradrs-it-{}-{name}", std::process::id()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn ingest_train_predict() {
    let path = write_tmp("students.csv", &dataset_csv());
    let (tx, mut rx) = unbounded_channel();
    let records = load_records_async(vec![path.clone()], b',', tx).await.unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(records.len(), 62);

    let mut rows = 0;
    while let Ok(ev) = rx.try_recv() {
        if let ProcessEvent::Read(ReadEvent::FileRows(_, n)) = ev {
            rows += n;
        }
    }
    assert_eq!(rows, 62);

    let predictor = Predictor::fit(PipelineConfig::default(), &records);
    assert!(predictor.is_trained());
    let bundle = predictor.bundle().unwrap();
    assert_eq!(bundle.summary.total_records, 62);
    assert_eq!(bundle.summary.valid_records, 60);
    assert_eq!(bundle.summary.invalid_records, 2);
    assert!(bundle.summary.average_error <= 0.5);

    let strong = predictor.predict(&PredictionQuery::new(3.8, true, 22.0, false), false).unwrap();
    let weak = predictor.predict(&PredictionQuery::new(0.3, false, 22.0, false), false).unwrap();
    assert_eq!(strong.source, PredictionSource::Model);
    assert!((0.0..=1.0).contains(&strong.probability));
    assert!((0.0..=1.0).contains(&weak.probability));
    assert!(strong.probability > weak.probability);
    assert!(strong.will_graduate);
    assert!(!weak.will_graduate);

    let forced = predictor.predict(&PredictionQuery::new(3.8, true, 22.0, false), true).unwrap();
    assert_eq!(forced.source, PredictionSource::Interpolation);
    assert_eq!(forced.probability, 1.0);

    let diagnostics = predictor.diagnostics();
    assert_eq!(diagnostics.subsets.len(), 2);
    let json = serde_json::to_string(&diagnostics).unwrap();
    assert!(json.contains("\"r_squared\""));
}

#[test]
fn unsplit_scalar_pipeline_and_sweep() {
    let path = write_tmp("scalar.csv", &dataset_csv());
    let records = gradrs_core::csv_parse::read_student_csv(&path, b',').unwrap().records;
    std::fs::remove_file(&path).unwrap();

    let cfg = PipelineConfig {
        features: FeatureStrategy::ScalarGrade,
        split: SplitStrategy::Unsplit,
        ..Default::default()
    };
    let predictor = Predictor::fit(cfg, &records);
    assert!(predictor.is_trained());
    let q = PredictionQuery::new(3.5, false, 30.0, true);
    assert_eq!(predictor.predict(&q, false), predictor.predict(&q, false));

    let cv = CrossValidation { shuffle_seed: Some(1), ..Default::default() };
    let report = predictor.cross_validate(&cv).unwrap();
    assert_eq!(report.samples, 60);
    assert_eq!(report.results.len(), cv.thresholds.len());
    assert!(report.best_f1 > 0.0);
}

#[test]
fn too_little_data_falls_back_to_interpolation() {
    let records = vec![gradrs_core::StudentRecord::new(2.0, false, 20.0, false, 0.0)];
    let predictor = Predictor::fit(PipelineConfig::default(), &records);
    assert!(!predictor.is_trained());

    let p = predictor.predict(&PredictionQuery::new(3.0, false, 20.0, false), false).unwrap();
    assert_eq!(p.source, PredictionSource::Interpolation);
    assert_eq!(p.probability, 0.0);
}

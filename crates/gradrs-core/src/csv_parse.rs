use crate::error::IngestError;
use crate::processevent::{ProcessEvent, ProgressEvent, ReadEvent};
use crate::record::{StudentRecord, DEFAULT_AGE};

use csv::StringRecord;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;

use std::fs::File;
use std::path::{Path, PathBuf};

const GRADE: &[&str] = &["grade"];
const GRADUATE: &[&str] = &["graduate", "successrate", "success_rate"];
const EMPLOYED: &[&str] = &["employed"];
const AGE: &[&str] = &["age"];
const MARRIED: &[&str] = &["married"];

/// Rows of one csv file. `row_errors` holds rows the reader could not decode.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub records: Vec<StudentRecord>,
    pub row_errors: Vec<(usize, String)>,
}

struct Columns {
    grade: usize,
    graduate: usize,
    employed: Option<usize>,
    age: Option<usize>,
    married: Option<usize>,
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_ascii_lowercase();
        names.iter().any(|n| *n == h)
    })
}

impl Columns {
    fn from_headers(path: &Path, headers: &StringRecord) -> Result<Self, IngestError> {
        let required = |names: &[&str], column: &'static str| {
            find_column(headers, names)
                .ok_or_else(|| IngestError::MissingColumn { path: path.to_path_buf(), column })
        };
        Ok(Self {
            grade: required(GRADE, "grade")?,
            graduate: required(GRADUATE, "graduate")?,
            employed: find_column(headers, EMPLOYED),
            age: find_column(headers, AGE),
            married: find_column(headers, MARRIED),
        })
    }
}

/// Unparseable or empty fields become NaN and are rejected by validation.
fn parse_number(field: Option<&str>) -> f64 {
    field.map(str::trim).and_then(|s| s.parse::<f64>().ok()).unwrap_or(f64::NAN)
}

/// Optional columns fall back to `default` only when the column is absent.
fn parse_optional(row: &StringRecord, idx: Option<usize>, default: f64) -> f64 {
    match idx {
        Some(i) => parse_number(row.get(i)),
        None => default,
    }
}

pub fn mk_rdr<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<csv::Reader<File>, IngestError> {
    let path = path.as_ref();
    let file =
        File::open(path).map_err(|source| IngestError::Io { path: path.to_path_buf(), source })?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

/// Read one headed csv file. `grade` and `graduate` (or `successRate`) are
/// required; `employed` and `married` default to 0 and `age` to 20.
pub fn read_student_csv<P: AsRef<Path>>(
    path: P,
    delimiter: u8,
) -> Result<ParsedFile, IngestError> {
    let path = path.as_ref();
    let mut rdr = mk_rdr(path, delimiter)?;
    let headers = rdr
        .headers()
        .map_err(|source| IngestError::Csv { path: path.to_path_buf(), source })?
        .clone();
    let cols = Columns::from_headers(path, &headers)?;

    let mut parsed = ParsedFile::default();
    for (i, row) in rdr.records().enumerate() {
        // header is line 1
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                parsed.row_errors.push((line, e.to_string()));
                continue;
            },
        };
        parsed.records.push(StudentRecord {
            grade: parse_number(row.get(cols.grade)),
            age: parse_optional(&row, cols.age, DEFAULT_AGE),
            employed: parse_optional(&row, cols.employed, 0.0),
            married: parse_optional(&row, cols.married, 0.0),
            graduate: parse_number(row.get(cols.graduate)),
        });
    }
    Ok(parsed)
}

/// Read every file, reporting progress on `progress`. Files that fail are
/// reported and skipped; the rest are concatenated in input order.
pub fn read_student_files(
    paths: &[PathBuf],
    delimiter: u8,
    progress: &UnboundedSender<ProcessEvent>,
) -> Vec<StudentRecord> {
    let mut records = Vec::new();
    for path in paths {
        let name = path.to_string_lossy().into_owned();
        let _ = progress.send(ProcessEvent::Read(ReadEvent::File(name.clone())));
        match read_student_csv(path, delimiter) {
            Ok(parsed) => {
                for (row, reason) in parsed.row_errors {
                    let ev = ReadEvent::row_fail(path, row, reason);
                    let _ = progress.send(ProcessEvent::Read(ev));
                }
                let n = parsed.records.len();
                let _ = progress.send(ProcessEvent::Read(ReadEvent::FileRows(name, n)));
                records.extend(parsed.records);
            },
            Err(e) => {
                log::warn!("Failed to read {name}: {e}");
                let ev = ReadEvent::file_fail(path, e.to_string());
                let _ = progress.send(ProcessEvent::Read(ev));
            },
        }
    }
    let _ = progress.send(ProcessEvent::Progress(ProgressEvent::Records(records.len())));
    records
}

/// Ingestion off the async executor. The record set is fully materialised
/// before it is returned.
pub async fn load_records_async(
    paths: Vec<PathBuf>,
    delimiter: u8,
    progress: UnboundedSender<ProcessEvent>,
) -> Result<Vec<StudentRecord>, IngestError> {
    let sender = progress.clone();
    let result =
        task::spawn_blocking(move || read_student_files(&paths, delimiter, &sender)).await;
    match result {
        Ok(records) if records.is_empty() => {
            let _ = progress.send(ProcessEvent::Done(Err("No records read".to_owned())));
            Ok(records)
        },
        Ok(records) => {
            let _ = progress.send(ProcessEvent::Done(Ok(())));
            Ok(records)
        },
        Err(e) => {
            let _ = progress.send(ProcessEvent::Done(Err(e.to_string())));
            Err(IngestError::Join(e.to_string()))
        },
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ImportError;
use crate::import::{lenient_number, open};
use crate::sampling::round_dp;

/// Column layout of a `UserExercises` CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseSchema {
    /// snake_case tracker columns, distance in millimetres
    Legacy,
    /// Human-readable columns, `Duration` as `H:MM[:SS]`, distance in km
    Readable,
}

impl ExerciseSchema {
    pub fn detect(headers: &StringRecord) -> Result<Self, ImportError> {
        if headers.iter().any(|h| h.trim() == "exercise_start") {
            Ok(ExerciseSchema::Legacy)
        } else if headers.iter().any(|h| h.trim() == "Start Time") {
            Ok(ExerciseSchema::Readable)
        } else {
            Err(ImportError::UnknownSchema {
                headers: headers.iter().collect::<Vec<_>>().join(","),
            })
        }
    }

    fn start_column(&self) -> &'static str {
        match self {
            ExerciseSchema::Legacy => "exercise_start",
            ExerciseSchema::Readable => "Start Time",
        }
    }
}

/// One exercise, normalised across both schemas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub date: NaiveDate,
    pub activity_name: String,
    pub duration_minutes: f64,
    pub calories: f64,
    pub avg_heart_rate: f64,
    pub steps: f64,
    pub distance_km: f64,
}

impl ExerciseRecord {
    /// (date, activity, duration in tenths of a minute)
    fn dedup_key(&self) -> (NaiveDate, String, i64) {
        (
            self.date,
            self.activity_name.clone(),
            (self.duration_minutes * 10.0).round() as i64,
        )
    }
}

struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self { index }
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Read a `UserExercises*.csv` file
pub fn read_exercise_csv(path: &Path) -> Result<Vec<ExerciseRecord>, ImportError> {
    let file = open(path)?;
    let records = parse_exercise_csv(file)?;
    info!(
        path = %path.display(),
        records = records.len(),
        "Imported exercise log"
    );
    Ok(records)
}

/// Parse exercise rows from any reader. Rows without a start date are
/// skipped; output is newest first with duplicates removed.
pub fn parse_exercise_csv<R: Read>(reader: R) -> Result<Vec<ExerciseRecord>, ImportError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let schema = ExerciseSchema::detect(&headers)?;
    let columns = Columns::new(&headers);
    debug!(?schema, "Detected exercise schema");

    let mut records = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        match parse_row(schema, &columns, &row) {
            Some(record) => records.push(record),
            None => debug!(line = ?row.position().map(|p| p.line()), "Skipping row without start date"),
        }
    }

    // Stable sort keeps file order among same-day rows
    records.sort_by(|a, b| b.date.cmp(&a.date));
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.dedup_key()));

    Ok(records)
}

fn parse_row(schema: ExerciseSchema, columns: &Columns, row: &StringRecord) -> Option<ExerciseRecord> {
    let start_raw = columns.get(row, schema.start_column());
    let date = start_raw
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;

    let record = match schema {
        ExerciseSchema::Legacy => {
            let duration = match (
                parse_timestamp(start_raw),
                parse_timestamp(columns.get(row, "exercise_end")),
            ) {
                // An end before the start reads as an empty session
                (Some(start), Some(end)) => (end - start).num_seconds().max(0) as f64 / 60.0,
                _ => 0.0,
            };
            ExerciseRecord {
                date,
                activity_name: name_or_unknown(columns.get(row, "activity_name")),
                duration_minutes: round_dp(duration, 1),
                calories: lenient_number(columns.get(row, "tracker_total_calories")),
                avg_heart_rate: lenient_number(columns.get(row, "tracker_avg_heart_rate")),
                steps: lenient_number(columns.get(row, "tracker_total_steps")),
                distance_km: round_dp(
                    lenient_number(columns.get(row, "tracker_total_distance_mm")) / 1_000_000.0,
                    2,
                ),
            }
        }
        ExerciseSchema::Readable => ExerciseRecord {
            date,
            activity_name: name_or_unknown(columns.get(row, "Activity Name")),
            duration_minutes: round_dp(parse_duration(columns.get(row, "Duration")), 1),
            calories: lenient_number(columns.get(row, "Calories (kcal)")),
            avg_heart_rate: lenient_number(columns.get(row, "Average Heart Rate")),
            steps: lenient_number(columns.get(row, "Steps")),
            distance_km: round_dp(lenient_number(columns.get(row, "Distance (km)")), 2),
        },
    };
    Some(record)
}

fn name_or_unknown(raw: &str) -> String {
    if raw.is_empty() {
        "Unknown".to_string()
    } else {
        raw.to_string()
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// `H:MM[:SS]`, also tolerating `1h05m`; seconds are ignored
fn parse_duration(raw: &str) -> f64 {
    let normalised = raw.replace('h', ":").replace('m', ":").replace('s', "");
    let mut parts = normalised.split(':');
    match (parts.next(), parts.next()) {
        (Some(h), Some(m)) => match (h.trim().parse::<f64>(), m.trim().parse::<f64>()) {
            (Ok(h), Ok(m)) => h * 60.0 + m,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

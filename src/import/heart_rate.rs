use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::error::ImportError;
use crate::export::DATE_TIME_FMT;
use crate::import::open;
use crate::models::{Confidence, HeartRateSample};

/// Plausible physiological range; readings outside it are dropped
pub const BPM_RANGE: (u16, u16) = (30, 220);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    date_time: String,
    value: RawValue,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    bpm: i64,
    #[serde(default)]
    confidence: u8,
}

/// Read a `heart_rate-<date>.json` file back into samples, oldest first
pub fn read_heart_rate_json(path: &Path) -> Result<Vec<HeartRateSample>, ImportError> {
    let file = open(path)?;
    parse_heart_rate_json(BufReader::new(file)).map_err(|reason| ImportError::InvalidJson {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parse the intraday array. Errors carry the serde message.
pub fn parse_heart_rate_json<R: Read>(reader: R) -> Result<Vec<HeartRateSample>, String> {
    let raw: Vec<RawRecord> = serde_json::from_reader(reader).map_err(|e| e.to_string())?;
    let total = raw.len();

    let mut samples: Vec<HeartRateSample> = raw
        .into_iter()
        .filter_map(|r| {
            let bpm = u16::try_from(r.value.bpm).ok()?;
            if bpm < BPM_RANGE.0 || bpm > BPM_RANGE.1 {
                return None;
            }
            let timestamp = NaiveDateTime::parse_from_str(&r.date_time, DATE_TIME_FMT).ok()?;
            Some(HeartRateSample {
                timestamp,
                bpm,
                confidence: Confidence::from_u8(r.value.confidence).unwrap_or(Confidence::Low),
            })
        })
        .collect();

    samples.sort_by_key(|s| s.timestamp);
    if samples.len() < total {
        debug!(dropped = total - samples.len(), "Dropped unusable heart rate records");
    }
    Ok(samples)
}

//! Readers for files a consumer of the export would load back
//!
//! These close the loop on the writer: `UserExercises.csv` in either of the
//! two known column layouts, and the intraday heart-rate JSON.

use std::fs::File;
use std::path::Path;

use crate::error::ImportError;

pub mod exercise_csv;
pub mod heart_rate;

pub use exercise_csv::{parse_exercise_csv, read_exercise_csv, ExerciseRecord, ExerciseSchema};
pub use heart_rate::{parse_heart_rate_json, read_heart_rate_json};

/// Open `path` for reading, mapping failures onto [`ImportError::Unreadable`]
pub(crate) fn open(path: &Path) -> Result<File, ImportError> {
    File::open(path).map_err(|e| {
        tracing::debug!(path = %path.display(), "Open failed: {}", e);
        ImportError::Unreadable {
            path: path.to_path_buf(),
        }
    })
}

/// Parse a number that may use a comma as the decimal separator.
/// Blank or malformed input reads as zero.
pub(crate) fn lenient_number(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0)
}

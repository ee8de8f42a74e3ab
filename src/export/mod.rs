//! Output tree writer
//!
//! The whole tree is written into a sibling staging directory and renamed
//! into place once every file is on disk. Any failure removes the staging
//! directory, so a run either leaves a complete tree or nothing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::OutputSettings;
use crate::error::ExportError;
use crate::generator::Dataset;

pub mod csv;
pub mod json;

use self::csv::{write_csv, HrvRow, ProfileRow, SleepScoreRow, SpO2Row, StressRow, UserExerciseRow};
use self::json::{
    calories_records, exercise_record, steps_records, write_json, zones_record, HeartRateRecord,
    RestingHeartRateRecord, SleepLogRecord,
};

/// `MM/DD/YY HH:MM:SS`
pub const DATE_TIME_FMT: &str = "%m/%d/%y %H:%M:%S";
/// `YYYY-MM-DD`
pub const DAY_FMT: &str = "%Y-%m-%d";
/// ISO timestamp padded to milliseconds
pub const ISO_MS_FMT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

pub const GLOBAL_EXPORT_DIR: &str = "Global Export Data";
pub const HRV_DIR: &str = "Heart Rate Variability";
pub const SPO2_DIR: &str = "Oxygen Saturation (SpO2)";
pub const STRESS_DIR: &str = "Stress Score";
pub const SLEEP_SCORE_DIR: &str = "Sleep Score";
pub const PROFILE_DIR: &str = "Your Profile";
pub const EXERCISE_CSV_DIR: &str = "Physical Activity_GoogleData";

const FOLDERS: [&str; 7] = [
    GLOBAL_EXPORT_DIR,
    HRV_DIR,
    SPO2_DIR,
    STRESS_DIR,
    SLEEP_SCORE_DIR,
    PROFILE_DIR,
    EXERCISE_CSV_DIR,
];

/// Map an io error on `path` into [`ExportError::WriteFailed`]
pub(crate) fn write_failed(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::WriteFailed {
        path: path.to_path_buf(),
        source,
    }
}

/// What a successful export produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub root: PathBuf,
    pub files_written: usize,
}

/// Writes a [`Dataset`] as a Fitbit-style export tree
#[derive(Debug, Clone)]
pub struct Exporter {
    settings: OutputSettings,
}

impl Exporter {
    pub fn new(settings: OutputSettings) -> Self {
        Self { settings }
    }

    fn staging_dir(&self, seed: u64) -> PathBuf {
        let name = self
            .settings
            .dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.settings
            .dir
            .with_file_name(format!(".{}.staging-{}", name, seed))
    }

    fn check_target(&self) -> Result<(), ExportError> {
        let root = &self.settings.dir;
        if !root.exists() || self.settings.overwrite {
            return Ok(());
        }
        let mut entries = fs::read_dir(root).map_err(write_failed(root))?;
        if entries.next().is_some() {
            return Err(ExportError::OutputNotEmpty { path: root.clone() });
        }
        Ok(())
    }

    /// Write the full tree, or nothing
    pub fn export(&self, dataset: &Dataset) -> Result<ExportSummary, ExportError> {
        self.check_target()?;

        let staging = self.staging_dir(dataset.seed);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(write_failed(&staging))?;
        }
        fs::create_dir_all(&staging).map_err(write_failed(&staging))?;
        debug!(staging = %staging.display(), "Writing into staging directory");

        let written = match self.write_tree(dataset, &staging) {
            Ok(count) => count,
            Err(e) => {
                discard(&staging);
                return Err(e);
            }
        };

        if let Err(e) = self.promote(&staging) {
            discard(&staging);
            return Err(e);
        }

        info!(
            root = %self.settings.dir.display(),
            files = written,
            "Export complete"
        );

        Ok(ExportSummary {
            root: self.settings.dir.clone(),
            files_written: written,
        })
    }

    /// Move the staging directory onto the final path
    fn promote(&self, staging: &Path) -> Result<(), ExportError> {
        let root = &self.settings.dir;
        let finalize_failed = |e: io::Error| ExportError::FinalizeFailed {
            path: root.clone(),
            reason: e.to_string(),
        };

        if root.exists() {
            fs::remove_dir_all(root).map_err(finalize_failed)?;
        } else if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(finalize_failed)?;
        }
        fs::rename(staging, root).map_err(finalize_failed)
    }

    fn write_tree(&self, dataset: &Dataset, base: &Path) -> Result<usize, ExportError> {
        for folder in FOLDERS {
            let dir = base.join(folder);
            fs::create_dir_all(&dir).map_err(write_failed(&dir))?;
        }

        let pretty = self.settings.pretty_json;
        let global = base.join(GLOBAL_EXPORT_DIR);
        let (Some(first), Some(last)) = (dataset.days.first(), dataset.days.last()) else {
            warn!("Dataset has no days; writing profile only");
            write_csv(&[ProfileRow::from(&dataset.profile)], base.join(PROFILE_DIR).join("Profile.csv"))?;
            return Ok(1);
        };
        let start = first.context.date.format(DAY_FMT).to_string();
        let end = last.context.date.format(DAY_FMT).to_string();
        let mut written = 0usize;

        for day in &dataset.days {
            let date = day.context.date.format(DAY_FMT).to_string();

            let hr: Vec<HeartRateRecord> = day.heart_rate.iter().map(HeartRateRecord::from).collect();
            write_json(&hr, global.join(format!("heart_rate-{}.json", date)), pretty)?;
            write_json(
                &steps_records(&day.activity.minutes),
                global.join(format!("steps-{}.json", date)),
                pretty,
            )?;
            write_json(
                &calories_records(&day.activity.minutes),
                global.join(format!("calories-{}.json", date)),
                pretty,
            )?;
            write_json(
                &[zones_record(day.context.date, &day.derived.whole_day_zones)],
                global.join(format!("time_in_heart_rate_zones-{}.json", date)),
                pretty,
            )?;
            written += 4;
            debug!(date = %date, "Wrote intraday files");
        }

        let sleep: Vec<SleepLogRecord> = dataset.sleep_windows().map(SleepLogRecord::from).collect();
        write_json(&sleep, global.join(format!("sleep-{}.json", start)), pretty)?;

        let resting: Vec<RestingHeartRateRecord> = dataset
            .days
            .iter()
            .map(|d| RestingHeartRateRecord::from(&d.derived))
            .collect();
        write_json(&resting, global.join(format!("resting_heart_rate-{}.json", start)), pretty)?;

        let max_hr = dataset.profile.max_heart_rate();
        let exercises: Vec<_> = dataset.sessions().map(|s| exercise_record(s, max_hr)).collect();
        write_json(&exercises, global.join("exercise-0.json"), pretty)?;
        written += 3;

        let derived = || dataset.days.iter().map(|d| &d.derived);

        let hrv: Vec<HrvRow> = derived().map(HrvRow::from).collect();
        write_csv(
            &hrv,
            base.join(HRV_DIR)
                .join(format!("Daily Heart Rate Variability Summary - {}.csv", start)),
        )?;

        let spo2: Vec<SpO2Row> = derived().map(SpO2Row::from).collect();
        write_csv(
            &spo2,
            base.join(SPO2_DIR).join(format!("Daily SpO2 - {}-{}.csv", start, end)),
        )?;

        let stress: Vec<StressRow> = derived().map(StressRow::from).collect();
        write_csv(&stress, base.join(STRESS_DIR).join("Stress Score.csv"))?;

        let scores: Vec<SleepScoreRow> = derived()
            .filter_map(|d| d.sleep_score.as_ref())
            .map(SleepScoreRow::from)
            .collect();
        write_csv(&scores, base.join(SLEEP_SCORE_DIR).join("sleep_score.csv"))?;

        write_csv(
            &[ProfileRow::from(&dataset.profile)],
            base.join(PROFILE_DIR).join("Profile.csv"),
        )?;

        let user_exercises: Vec<UserExerciseRow> = dataset.sessions().map(UserExerciseRow::from).collect();
        write_csv(
            &user_exercises,
            base.join(EXERCISE_CSV_DIR).join("UserExercises.csv"),
        )?;
        written += 6;

        Ok(written)
    }
}

fn discard(staging: &Path) {
    if let Err(e) = fs::remove_dir_all(staging) {
        warn!(staging = %staging.display(), "Could not remove staging directory: {}", e);
    }
}

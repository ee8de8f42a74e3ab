use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{ActivityKind, ExerciseSpec};

/// Main generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Global seed; `None` draws a fresh one per run
    #[serde(default)]
    pub seed: Option<u64>,

    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// The simulated person
    pub profile: ProfileConfig,

    /// Calendar range to generate
    pub horizon: HorizonConfig,

    /// Global heart-rate clamp
    pub heart_rate: HeartRateBounds,

    /// Per-person physiological baselines
    pub baselines: Baselines,

    /// Which activity kinds make a "hard" day
    pub intensity: IntensitySettings,

    /// Output tree settings
    pub output: OutputSettings,

    /// Exercise schedule, in any order
    #[serde(default)]
    pub schedule: Vec<ExerciseSpec>,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,
}

/// Demographics and export profile fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub age: u8,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub member_since: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub stride_length_walking_cm: f64,
    pub stride_length_running_cm: f64,
    pub timezone: String,
}

impl ProfileConfig {
    /// Age-predicted maximum heart rate
    pub fn max_heart_rate(&self) -> u16 {
        220u16.saturating_sub(u16::from(self.age))
    }

    pub fn first_name(&self) -> &str {
        self.full_name.split_whitespace().next().unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        self.full_name
            .split_once(' ')
            .map(|(_, last)| last.trim())
            .unwrap_or("")
    }
}

/// Generation horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonConfig {
    pub start_date: NaiveDate,
    pub days: u32,
}

impl HorizonConfig {
    pub fn date_of(&self, day: u32) -> NaiveDate {
        self.start_date + chrono::Duration::days(i64::from(day))
    }

    pub fn end_date(&self) -> NaiveDate {
        self.date_of(self.days.saturating_sub(1))
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days).map(move |d| self.date_of(d))
    }
}

/// Heart-rate clamp applied to every emitted sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateBounds {
    pub min_bpm: u16,
    pub max_bpm: u16,
}

impl HeartRateBounds {
    pub fn clamp(&self, bpm: i32) -> u16 {
        bpm.clamp(i32::from(self.min_bpm), i32::from(self.max_bpm)) as u16
    }
}

/// Physiological baselines the daily metrics vary around
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baselines {
    /// Resting heart rate (bpm)
    pub resting_hr: f64,
    /// HRV RMSSD (ms)
    pub hrv_rmssd: f64,
    /// Stress / readiness score (points)
    pub stress_score: i32,
}

/// Centralised intensity classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensitySettings {
    /// Kinds whose sessions make the day a hard-exercise day
    pub hard_kinds: Vec<ActivityKind>,
}

/// Output tree settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Root of the generated tree (the `Fitbit` folder)
    pub dir: PathBuf,
    /// Indent JSON files
    pub pretty_json: bool,
    /// Replace an existing non-empty output directory
    pub overwrite: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            seed: None,
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
            },
            profile: ProfileConfig::default(),
            horizon: HorizonConfig::default(),
            heart_rate: HeartRateBounds::default(),
            baselines: Baselines::default(),
            intensity: IntensitySettings::default(),
            output: OutputSettings::default(),
            schedule: default_schedule(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        ProfileConfig {
            id: "DEMO001".to_string(),
            full_name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
            age: 30,
            gender: "MALE".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1996, 3, 15).unwrap_or_default(),
            member_since: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default(),
            height_cm: 178.0,
            weight_kg: 73.0,
            stride_length_walking_cm: 75.0,
            stride_length_running_cm: 115.0,
            timezone: "Europe/London".to_string(),
        }
    }
}

impl Default for HorizonConfig {
    fn default() -> Self {
        HorizonConfig {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap_or_default(),
            days: 14,
        }
    }
}

impl Default for HeartRateBounds {
    fn default() -> Self {
        HeartRateBounds {
            min_bpm: 48,
            max_bpm: 198,
        }
    }
}

impl Default for Baselines {
    fn default() -> Self {
        Baselines {
            resting_hr: 60.0,
            hrv_rmssd: 58.0,
            stress_score: 75,
        }
    }
}

impl Default for IntensitySettings {
    fn default() -> Self {
        IntensitySettings {
            hard_kinds: vec![
                ActivityKind::Run,
                ActivityKind::IntervalWorkout,
                ActivityKind::Bike,
            ],
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            dir: PathBuf::from("./Takeout/Fitbit"),
            pretty_json: true,
            overwrite: false,
        }
    }
}

fn session(
    day_offset: u32,
    kind: ActivityKind,
    (hour, minute): (u32, u32),
    duration_minutes: u32,
    (target_avg_hr, target_peak_hr): (u16, u16),
    distance_km: f64,
    steps: u32,
    calories_per_minute: f64,
) -> ExerciseSpec {
    ExerciseSpec {
        day_offset,
        kind,
        start_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default(),
        duration_minutes,
        target_avg_hr,
        target_peak_hr,
        distance_km,
        steps,
        calories_per_minute,
    }
}

/// Two-week demo schedule used when no schedule is configured
pub fn default_schedule() -> Vec<ExerciseSpec> {
    use ActivityKind::*;
    vec![
        session(0, Run, (7, 15), 38, (152, 171), 6.1, 6200, 11.2),
        session(1, Weights, (18, 30), 45, (112, 138), 0.0, 900, 6.0),
        session(2, Bike, (17, 45), 60, (138, 162), 22.5, 0, 9.5),
        session(4, Hike, (10, 0), 110, (118, 145), 9.8, 13500, 7.4),
        session(5, Yoga, (9, 30), 40, (88, 105), 0.0, 0, 3.2),
        session(6, IntervalWorkout, (6, 45), 32, (158, 182), 0.0, 2800, 12.5),
        session(7, Walk, (12, 30), 35, (104, 118), 3.0, 4100, 4.8),
        session(8, Run, (7, 0), 45, (149, 168), 7.4, 7600, 11.0),
        session(8, Weights, (18, 0), 30, (108, 130), 0.0, 600, 5.8),
        session(9, Swim, (19, 0), 40, (131, 152), 1.6, 0, 9.0),
        session(11, Run, (9, 30), 62, (146, 165), 10.2, 10400, 10.8),
        session(12, Walk, (15, 0), 50, (98, 112), 4.2, 5600, 4.5),
        session(13, Elliptical, (18, 0), 35, (134, 150), 0.0, 3900, 8.8),
    ]
}

/// Configuration management implementation
impl GeneratorConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: GeneratorConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".fitsynth")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(path = %config_path.display(), error = %err, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Reject configurations that would produce out-of-range output
    pub fn validate(&self) -> Result<()> {
        if self.horizon.days == 0 {
            bail!("horizon.days must be at least 1");
        }
        if let Some(seed) = self.seed {
            // TOML integers are signed 64-bit
            if seed > i64::MAX as u64 {
                bail!("seed {} is too large; the maximum is {}", seed, i64::MAX);
            }
        }

        let bounds = &self.heart_rate;
        if bounds.min_bpm >= bounds.max_bpm {
            bail!(
                "heart_rate.min_bpm ({}) must be below max_bpm ({})",
                bounds.min_bpm,
                bounds.max_bpm
            );
        }
        if bounds.min_bpm < 30 || bounds.max_bpm > 230 {
            bail!("heart_rate bounds must lie within 30-230 bpm");
        }

        for (index, spec) in self.schedule.iter().enumerate() {
            if spec.day_offset >= self.horizon.days {
                bail!(
                    "schedule[{}] ({}) is on day {} but the horizon has {} days",
                    index,
                    spec.kind,
                    spec.day_offset,
                    self.horizon.days
                );
            }
            if spec.duration_minutes == 0 {
                bail!("schedule[{}] ({}) has zero duration", index, spec.kind);
            }
            if spec.calories_per_minute < 0.0 || spec.distance_km < 0.0 {
                bail!("schedule[{}] ({}) has negative distance or calories", index, spec.kind);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: GeneratorConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.profile.max_heart_rate(), 190);
        assert_eq!(config.profile.first_name(), "Demo");
        assert_eq!(config.profile.last_name(), "User");
        assert_eq!(config.horizon.end_date(), NaiveDate::from_ymd_opt(2026, 2, 2).unwrap());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GeneratorConfig::default();
        config.horizon.days = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.heart_rate.min_bpm = 200;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.horizon.days = 5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("horizon has 5 days"), "{}", err);
    }

    #[test]
    fn test_seed_must_fit_toml_integer() {
        let mut config = GeneratorConfig::default();
        config.seed = Some(u64::MAX);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("too large"), "{}", err);
        assert!(toml::to_string(&config).is_err());

        config.seed = Some(i64::MAX as u64);
        assert!(config.validate().is_ok());
        let round_trip: GeneratorConfig = toml::from_str(&toml::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip.seed, Some(i64::MAX as u64));
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = GeneratorConfig::default();
        original.seed = Some(1234);
        original.horizon.days = 21;
        original.save_to_file(&config_path).unwrap();

        let loaded = GeneratorConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.seed, Some(1234));
        assert_eq!(loaded.horizon.days, 21);
        assert_eq!(loaded.schedule.len(), original.schedule.len());
    }

    #[test]
    fn test_partial_toml_uses_empty_schedule() {
        let toml_str = r#"
            [metadata]
            version = "1.0"

            [profile]
            id = "X"
            full_name = "Ada Lovelace"
            email = "ada@example.com"
            age = 36
            gender = "FEMALE"
            date_of_birth = "1990-12-10"
            member_since = "2023-05-01"
            height_cm = 165.0
            weight_kg = 58.0
            stride_length_walking_cm = 68.0
            stride_length_running_cm = 102.0
            timezone = "Europe/London"

            [horizon]
            start_date = "2026-03-02"
            days = 3

            [heart_rate]
            min_bpm = 46
            max_bpm = 198

            [baselines]
            resting_hr = 57.0
            hrv_rmssd = 64.0
            stress_score = 78

            [intensity]
            hard_kinds = ["run", "interval_workout"]

            [output]
            dir = "out"
            pretty_json = false
            overwrite = true
        "#;
        let config: GeneratorConfig = toml::from_str(toml_str).unwrap();
        assert!(config.schedule.is_empty());
        assert_eq!(config.seed, None);
        assert_eq!(config.intensity.hard_kinds.len(), 2);
        assert!(config.validate().is_ok());
    }
}

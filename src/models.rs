use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 00:00:00 on `date`
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Exercise activity kinds supported by the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Run,
    Walk,
    Bike,
    Swim,
    IntervalWorkout,
    Weights,
    Yoga,
    Elliptical,
    Hike,
}

impl ActivityKind {
    /// Name as it appears in exported exercise logs
    pub fn display_name(&self) -> &'static str {
        match self {
            ActivityKind::Run => "Run",
            ActivityKind::Walk => "Walk",
            ActivityKind::Bike => "Bike",
            ActivityKind::Swim => "Swim",
            ActivityKind::IntervalWorkout => "Interval Workout",
            ActivityKind::Weights => "Weights",
            ActivityKind::Yoga => "Yoga",
            ActivityKind::Elliptical => "Elliptical",
            ActivityKind::Hike => "Hike",
        }
    }

    /// Fitbit activity type identifier
    pub fn activity_type_id(&self) -> u32 {
        match self {
            ActivityKind::Run => 90009,
            ActivityKind::Walk => 90013,
            ActivityKind::Bike => 90001,
            ActivityKind::Swim => 90024,
            ActivityKind::IntervalWorkout => 3001,
            ActivityKind::Weights => 2030,
            ActivityKind::Yoga => 52001,
            ActivityKind::Elliptical => 90017,
            ActivityKind::Hike => 90012,
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One scheduled exercise session, keyed by day offset from the horizon start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSpec {
    /// Day index within the horizon (0-based)
    pub day_offset: u32,

    /// Activity kind
    pub kind: ActivityKind,

    /// Local start time of day
    pub start_time: NaiveTime,

    /// Planned duration in minutes
    pub duration_minutes: u32,

    /// Target average heart rate (bpm)
    pub target_avg_hr: u16,

    /// Target peak heart rate (bpm)
    pub target_peak_hr: u16,

    /// Planned distance in kilometres (0 for stationary sessions)
    pub distance_km: f64,

    /// Planned step count
    pub steps: u32,

    /// Energy expenditure rate in kcal per minute
    pub calories_per_minute: f64,
}

impl ExerciseSpec {
    /// Start and end of the session on the given calendar day
    pub fn window_on(&self, date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = date.and_time(self.start_time);
        let end = start + chrono::Duration::minutes(i64::from(self.duration_minutes));
        (start, end)
    }
}

/// Minutes per sleep stage (or stage counts, depending on context)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepStages {
    pub deep: u32,
    pub light: u32,
    pub rem: u32,
    pub wake: u32,
}

/// A single sleep log: the main overnight sleep or a daytime nap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepWindow {
    /// Export log identifier
    pub log_id: u64,

    /// Calendar date the sleep is attributed to (the wake-up morning)
    pub date_of_sleep: NaiveDate,

    /// Bedtime; falls on the previous calendar day when the night crosses midnight
    pub start: NaiveDateTime,

    /// Wake time
    pub end: NaiveDateTime,

    pub duration_ms: u64,
    pub minutes_in_bed: u32,
    pub minutes_asleep: u32,
    pub minutes_awake: u32,
    pub minutes_to_fall_asleep: u32,

    /// Sleep efficiency in percent (0-100)
    pub efficiency_pct: u8,

    /// Stage minutes
    pub stages: SleepStages,

    /// Number of stage episodes
    pub stage_counts: SleepStages,

    /// False for naps
    pub main_sleep: bool,
}

impl SleepWindow {
    /// Whether the instant lies within [start, end)
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t < self.end
    }

    /// Elapsed fraction of the window at `t`, in [0, 1]
    pub fn elapsed_fraction(&self, t: NaiveDateTime) -> f64 {
        let total = (self.end - self.start).num_seconds();
        if total <= 0 {
            return 0.0;
        }
        let elapsed = (t - self.start).num_seconds();
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    pub fn duration_hours(&self) -> f64 {
        f64::from(self.minutes_in_bed) / 60.0
    }
}

/// Per-sample reading confidence; 1 is the most reliable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Confidence {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Confidence::High),
            2 => Some(Confidence::Medium),
            3 => Some(Confidence::Low),
            _ => None,
        }
    }
}

/// One heart-rate reading of the intraday trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: NaiveDateTime,
    pub bpm: u16,
    pub confidence: Confidence,
}

/// Steps and energy expenditure for one calendar minute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMinute {
    pub timestamp: NaiveDateTime,
    pub steps: u32,
    /// kcal, two decimal places
    pub calories: Decimal,
}

/// Minutes per heart-rate zone: out-of-range / fat burn / cardio / peak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneMinutes {
    pub out_of_range: u32,
    pub fat_burn: u32,
    pub cardio: u32,
    pub peak: u32,
}

impl ZoneMinutes {
    pub fn total(&self) -> u32 {
        self.out_of_range + self.fat_burn + self.cardio + self.peak
    }

    /// Active Zone Minutes: cardio and peak minutes count double
    pub fn active_zone_minutes(&self) -> u32 {
        self.fat_burn + 2 * (self.cardio + self.peak)
    }

    pub fn as_array(&self) -> [u32; 4] {
        [self.out_of_range, self.fat_burn, self.cardio, self.peak]
    }
}

/// Minutes per activity level within a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLevelMinutes {
    pub sedentary: u32,
    pub lightly: u32,
    pub fairly: u32,
    pub very: u32,
}

impl ActivityLevelMinutes {
    pub fn total(&self) -> u32 {
        self.sedentary + self.lightly + self.fairly + self.very
    }
}

/// A materialised exercise session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseSession {
    pub log_id: u64,
    pub day_offset: u32,
    pub kind: ActivityKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: u32,
    pub calories: u32,
    pub steps: u32,
    pub distance_km: Decimal,
    pub avg_hr: u16,
    pub peak_hr: u16,
    pub hr_zone_minutes: ZoneMinutes,
    pub activity_level_minutes: ActivityLevelMinutes,
}

/// Training load of a calendar day, derived from the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DayLoad {
    /// No scheduled session
    Rest,
    /// At least one session, none of a high-intensity kind
    Normal,
    /// At least one high-intensity session
    Hard,
}

impl fmt::Display for DayLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayLoad::Rest => write!(f, "rest"),
            DayLoad::Normal => write!(f, "normal"),
            DayLoad::Hard => write!(f, "hard"),
        }
    }
}

/// Resting heart-rate summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestingHeartRate {
    pub value: f64,
    pub error: f64,
}

/// Daily heart-rate variability summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvSummary {
    /// RMSSD in milliseconds
    pub rmssd: f64,
    /// The day's baseline RMSSD before load scaling and noise
    pub baseline: f64,
    pub nremhr: u16,
    pub entropy: f64,
}

/// Daily SpO2 summary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpO2Summary {
    pub average: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Stress / readiness score with its components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressScore {
    pub score: u8,
    pub sleep_points: u8,
    pub responsiveness_points: u8,
    pub exertion_points: u8,
}

/// Sleep score of a main sleep log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepScore {
    pub sleep_log_id: u64,
    pub timestamp: NaiveDateTime,
    pub overall: u8,
    pub composition: u8,
    pub revitalization: u8,
    pub duration: u8,
    pub deep_sleep_minutes: u32,
    pub resting_heart_rate: u16,
    pub restlessness: f64,
}

/// All once-per-day derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDerivedMetrics {
    pub date: NaiveDate,
    pub load: DayLoad,
    pub resting_hr: RestingHeartRate,
    pub hrv: HrvSummary,
    pub spo2: SpO2Summary,
    pub stress: StressScore,
    pub sleep_score: Option<SleepScore>,
    /// Whole-day zone minutes; always sums to 1440
    pub whole_day_zones: ZoneMinutes,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: &str, end: &str) -> SleepWindow {
        SleepWindow {
            log_id: 1,
            date_of_sleep: NaiveDate::from_ymd_opt(2026, 1, 21).unwrap(),
            start: NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").unwrap(),
            end: NaiveDateTime::parse_from_str(end, "%Y-%m-%d %H:%M:%S").unwrap(),
            duration_ms: 0,
            minutes_in_bed: 450,
            minutes_asleep: 400,
            minutes_awake: 50,
            minutes_to_fall_asleep: 10,
            efficiency_pct: 89,
            stages: SleepStages::default(),
            stage_counts: SleepStages::default(),
            main_sleep: true,
        }
    }

    #[test]
    fn test_sleep_window_contains_across_midnight() {
        let w = window("2026-01-20 23:00:00", "2026-01-21 06:30:00");
        let before = NaiveDateTime::parse_from_str("2026-01-20 22:59:59", "%Y-%m-%d %H:%M:%S").unwrap();
        let after_midnight = NaiveDateTime::parse_from_str("2026-01-21 02:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let wake = NaiveDateTime::parse_from_str("2026-01-21 06:30:00", "%Y-%m-%d %H:%M:%S").unwrap();

        assert!(!w.contains(before));
        assert!(w.contains(after_midnight));
        assert!(!w.contains(wake));
        assert!((w.elapsed_fraction(after_midnight) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_zone_minutes_totals() {
        let zones = ZoneMinutes { out_of_range: 5, fat_burn: 10, cardio: 15, peak: 8 };
        assert_eq!(zones.total(), 38);
        assert_eq!(zones.active_zone_minutes(), 10 + 2 * 23);
    }

    #[test]
    fn test_confidence_round_trip() {
        for value in 1..=3u8 {
            assert_eq!(Confidence::from_u8(value).unwrap().as_u8(), value);
        }
        assert!(Confidence::from_u8(0).is_none());
    }
}

//! Exercise schedule lookups and day-load classification
//!
//! All cross-metric coupling (exercise to HRV, resting HR, stress, SpO2)
//! goes through [`ScheduleConfig::classify`], so the "was that a hard day"
//! rule exists in exactly one place.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::{GeneratorConfig, IntensitySettings};
use crate::models::{ActivityKind, DayLoad, ExerciseSpec};

/// Sessions starting before this time count as early-morning exercise
pub const EARLY_SESSION_CUTOFF: (u32, u32) = (9, 0);

/// Immutable exercise schedule plus the hard-intensity set
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    specs: Vec<ExerciseSpec>,
    hard_kinds: Vec<ActivityKind>,
}

impl ScheduleConfig {
    /// Sessions are ordered by day then start time; ties keep configuration order
    pub fn new(mut specs: Vec<ExerciseSpec>, intensity: &IntensitySettings) -> Self {
        specs.sort_by_key(|s| (s.day_offset, s.start_time));
        Self {
            specs,
            hard_kinds: intensity.hard_kinds.clone(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.schedule.clone(), &config.intensity)
    }

    pub fn specs(&self) -> &[ExerciseSpec] {
        &self.specs
    }

    pub fn sessions_on(&self, day: u32) -> impl Iterator<Item = &ExerciseSpec> + '_ {
        self.specs.iter().filter(move |s| s.day_offset == day)
    }

    pub fn has_session(&self, day: u32) -> bool {
        self.sessions_on(day).next().is_some()
    }

    /// Total scheduled steps on `day`
    pub fn exercise_steps(&self, day: u32) -> u32 {
        self.sessions_on(day).map(|s| s.steps).sum()
    }

    /// Session with the highest target average heart rate on `day`
    pub fn most_intense_session(&self, day: u32) -> Option<&ExerciseSpec> {
        self.sessions_on(day).max_by_key(|s| s.target_avg_hr)
    }

    pub fn is_hard_kind(&self, kind: ActivityKind) -> bool {
        self.hard_kinds.contains(&kind)
    }

    /// Training load of `day`
    pub fn classify(&self, day: u32) -> DayLoad {
        let mut load = DayLoad::Rest;
        for spec in self.sessions_on(day) {
            if self.is_hard_kind(spec.kind) {
                return DayLoad::Hard;
            }
            load = DayLoad::Normal;
        }
        load
    }

    /// Load of the day before `day`; the day before the horizon counts as rest
    pub fn classify_previous(&self, day: u32) -> DayLoad {
        day.checked_sub(1)
            .map_or(DayLoad::Rest, |previous| self.classify(previous))
    }

    /// Everything the per-day generators need to know about one calendar day
    pub fn day_context(&self, day: u32, date: NaiveDate) -> DayContext {
        DayContext {
            day,
            date,
            is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            load: self.classify(day),
            previous_load: self.classify_previous(day),
        }
    }
}

/// Static facts about one day of the horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayContext {
    pub day: u32,
    pub date: NaiveDate,
    pub is_weekend: bool,
    pub load: DayLoad,
    pub previous_load: DayLoad,
}

impl DayContext {
    pub fn follows_hard_day(&self) -> bool {
        self.previous_load == DayLoad::Hard
    }

    pub fn is_hard(&self) -> bool {
        self.load == DayLoad::Hard
    }

    /// No exercise today and no hard session yesterday
    pub fn is_pure_rest(&self) -> bool {
        self.load == DayLoad::Rest && self.previous_load != DayLoad::Hard
    }
}

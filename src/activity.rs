//! Per-minute steps and calories

use chrono::{Duration, NaiveDate, Timelike};
use rand::Rng;
use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{start_of_day, ActivityMinute};

/// Steps only accrue in [07:00, 22:00)
pub const ACTIVE_HOURS: (u32, u32) = (7, 22);

const MINUTES_PER_DAY: i64 = 1440;

/// Daily step-target band, keyed by scheduled exercise volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget {
    /// At least 5000 scheduled exercise steps
    High,
    /// Some exercise
    Moderate,
    /// No exercise
    Low,
}

impl StepTarget {
    pub fn for_exercise_steps(exercise_steps: u32) -> Self {
        match exercise_steps {
            s if s >= 5000 => StepTarget::High,
            0 => StepTarget::Low,
            _ => StepTarget::Moderate,
        }
    }

    pub fn range(&self) -> (u32, u32) {
        match self {
            StepTarget::High => (9000, 15000),
            StepTarget::Moderate => (6000, 10000),
            StepTarget::Low => (3000, 8000),
        }
    }
}

/// Burst size range; wider for more ambitious targets
fn burst_range(target: u32) -> (u32, u32) {
    match target {
        t if t >= 10_000 => (25, 110),
        t if t >= 6_000 => (25, 90),
        _ => (25, 70),
    }
}

/// Calories for one minute, in hundredths of a kcal
fn calorie_cents<R: Rng + ?Sized>(steps: u32, hour: u32, rng: &mut R) -> i64 {
    if steps > 50 {
        rng.gen_range(320..=650)
    } else if steps > 0 {
        rng.gen_range(160..=320)
    } else if hour < 6 || hour >= 23 {
        rng.gen_range(85..=115)
    } else {
        rng.gen_range(110..=165)
    }
}

/// One day of minute records
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityDay {
    pub date: NaiveDate,
    pub target_steps: u32,
    pub minutes: Vec<ActivityMinute>,
}

impl ActivityDay {
    pub fn total_steps(&self) -> u32 {
        self.minutes.iter().map(|m| m.steps).sum()
    }

    pub fn total_calories(&self) -> Decimal {
        self.minutes.iter().map(|m| m.calories).sum()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivitySimulator;

impl ActivitySimulator {
    pub fn new() -> Self {
        ActivitySimulator
    }

    /// 1440 minute records for `date`
    pub fn simulate_day<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        exercise_steps: u32,
        rng: &mut R,
    ) -> ActivityDay {
        let (lo, hi) = StepTarget::for_exercise_steps(exercise_steps).range();
        let target_steps = rng.gen_range(lo..=hi);
        let (burst_lo, burst_hi) = burst_range(target_steps);

        let day_start = start_of_day(date);
        let mut cumulative = 0u32;
        let mut minutes = Vec::with_capacity(MINUTES_PER_DAY as usize);

        for offset in 0..MINUTES_PER_DAY {
            let timestamp = day_start + Duration::minutes(offset);
            let hour = timestamp.hour();

            let steps = if hour >= ACTIVE_HOURS.0 && hour < ACTIVE_HOURS.1 {
                let behind = cumulative + 2000 < target_steps;
                let p = if behind { 0.35 } else { 0.20 };
                if rng.gen_bool(p) {
                    rng.gen_range(burst_lo..=burst_hi)
                } else {
                    0
                }
            } else {
                0
            };
            cumulative += steps;

            minutes.push(ActivityMinute {
                timestamp,
                steps,
                calories: Decimal::new(calorie_cents(steps, hour, rng), 2),
            });
        }

        debug!(%date, target_steps, total_steps = cumulative, "Simulated activity");

        ActivityDay {
            date,
            target_steps,
            minutes,
        }
    }
}

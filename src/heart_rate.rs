//! Continuous intraday heart-rate trace
//!
//! The trace is a biased random walk. At every sample the simulator
//! classifies the instant (sleeping, active, resting), draws a target bpm for
//! that state, and moves the current bpm by a step drawn from a fixed,
//! state-specific table of small integer changes. When the walk is more than
//! 5 bpm from the target, an extra unit of pull toward the target is applied
//! 30% of the time. The walk is drawn toward the target band without ever
//! snapping onto it, which is what gives the trace the wearable signature of
//! mostly 0/±1 bpm transitions with a mean absolute change below 2 bpm.
//!
//! The running bpm is carried as an explicit [`WalkState`] through
//! [`HeartRateSimulator::step`], so a day is a pure function of its inputs
//! and its random stream.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::Rng;
use tracing::debug;

use crate::config::HeartRateBounds;
use crate::models::{start_of_day, Confidence, ExerciseSpec, HeartRateSample, SleepWindow};
use crate::sampling::WeightedTable;

/// Step-size table while asleep
pub const SLEEPING_STEPS: WeightedTable<i16> =
    WeightedTable::new(&[(0, 0.50), (1, 0.30), (-1, 0.15), (2, 0.03), (-2, 0.02)]);

/// Step-size table while awake and idle
pub const RESTING_STEPS: WeightedTable<i16> = WeightedTable::new(&[
    (0, 0.30),
    (1, 0.25),
    (-1, 0.20),
    (2, 0.12),
    (-2, 0.08),
    (3, 0.03),
    (-3, 0.02),
]);

/// Step-size table during exercise or incidental activity
pub const ACTIVE_STEPS: WeightedTable<i16> = WeightedTable::new(&[
    (0, 0.15),
    (1, 0.22),
    (-1, 0.18),
    (2, 0.18),
    (-2, 0.14),
    (3, 0.08),
    (-3, 0.04),
    (4, 0.01),
]);

/// Reading confidence, weighted toward the most reliable value
pub const CONFIDENCE: WeightedTable<Confidence> = WeightedTable::new(&[
    (Confidence::High, 4.0),
    (Confidence::Medium, 2.0),
    (Confidence::Low, 1.0),
]);

/// Distance from target beyond which the extra pull may apply
const PULL_THRESHOLD: i32 = 5;
const PULL_PROBABILITY: f64 = 0.3;

/// Fraction of a session spent in each of the warm-up and cool-down ramps
const RAMP_FRACTION: f64 = 0.12;

/// Seconds between samples (inclusive range)
pub const SAMPLE_SPACING_SECS: (i64, i64) = (4, 7);

/// Physiological state at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HrState {
    Sleeping,
    Resting,
    Active,
}

impl HrState {
    pub fn step_table(&self) -> WeightedTable<i16> {
        match self {
            HrState::Sleeping => SLEEPING_STEPS,
            HrState::Resting => RESTING_STEPS,
            HrState::Active => ACTIVE_STEPS,
        }
    }
}

/// Where an active window came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    Scheduled,
    Incidental,
}

/// A period of elevated heart rate with a target plateau
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub target_bpm: u16,
    pub source: WindowSource,
}

impl ActiveWindow {
    pub fn from_spec(spec: &ExerciseSpec, date: NaiveDate) -> Self {
        let (start, end) = spec.window_on(date);
        ActiveWindow {
            start,
            end,
            target_bpm: spec.target_avg_hr,
            source: WindowSource::Scheduled,
        }
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        t >= self.start && t < self.end
    }

    /// Elapsed fraction of the window at `t`
    pub fn progress(&self, t: NaiveDateTime) -> f64 {
        let total = (self.end - self.start).num_seconds();
        if total <= 0 {
            return 0.0;
        }
        ((t - self.start).num_seconds() as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// How much unscheduled activity a day carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncidentalLevel {
    High,
    Normal,
    Low,
    Rest,
}

pub const INCIDENTAL_LEVELS: WeightedTable<IncidentalLevel> = WeightedTable::new(&[
    (IncidentalLevel::High, 0.20),
    (IncidentalLevel::Normal, 0.50),
    (IncidentalLevel::Low, 0.25),
    (IncidentalLevel::Rest, 0.05),
]);

/// Unscheduled activity windows for one day (commutes, errands, stairs)
pub fn incidental_windows<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> Vec<ActiveWindow> {
    // (count range, start-hour range, duration range, target range)
    let (count, hours, minutes, targets) = match INCIDENTAL_LEVELS.sample(rng) {
        IncidentalLevel::High => (rng.gen_range(2..=3), (7, 20), (30, 90), (100, 145)),
        IncidentalLevel::Normal => (rng.gen_range(1..=2), (8, 19), (20, 60), (90, 125)),
        IncidentalLevel::Low => (
            usize::from(rng.gen_bool(0.6)),
            (12, 18),
            (15, 30),
            (85, 110),
        ),
        IncidentalLevel::Rest => (0, (0, 0), (0, 0), (0, 0)),
    };

    (0..count)
        .map(|_| {
            let offset = rng.gen_range(hours.0..=hours.1) * 60 + rng.gen_range(0..60);
            let start = start_of_day(date) + Duration::minutes(offset);
            let end = start + Duration::minutes(rng.gen_range(minutes.0..=minutes.1));
            ActiveWindow {
                start,
                end,
                target_bpm: rng.gen_range(targets.0..=targets.1),
                source: WindowSource::Incidental,
            }
        })
        .collect()
}

/// What governs the heart rate at an instant
#[derive(Debug, Clone, Copy)]
pub enum Regime<'a> {
    Sleeping(&'a SleepWindow),
    Active(&'a ActiveWindow),
    Resting,
}

impl Regime<'_> {
    pub fn state(&self) -> HrState {
        match self {
            Regime::Sleeping(_) => HrState::Sleeping,
            Regime::Active(_) => HrState::Active,
            Regime::Resting => HrState::Resting,
        }
    }
}

/// Accumulator carried from sample to sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkState {
    pub bpm: i32,
}

/// Produces one ordered heart-rate trace per day
#[derive(Debug, Clone)]
pub struct HeartRateSimulator {
    bounds: HeartRateBounds,
}

impl HeartRateSimulator {
    pub fn new(bounds: HeartRateBounds) -> Self {
        Self { bounds }
    }

    /// Classify an instant. Sleep wins over activity; among active windows the
    /// first one listed that covers `t` wins.
    pub fn regime_at<'a>(
        t: NaiveDateTime,
        sleep: &'a [SleepWindow],
        active: &'a [ActiveWindow],
    ) -> Regime<'a> {
        if let Some(window) = sleep.iter().find(|w| w.contains(t)) {
            return Regime::Sleeping(window);
        }
        if let Some(window) = active.iter().find(|w| w.contains(t)) {
            return Regime::Active(window);
        }
        Regime::Resting
    }

    /// Target bpm for the regime at `t`
    pub fn target_bpm<R: Rng + ?Sized>(regime: &Regime<'_>, t: NaiveDateTime, rng: &mut R) -> i32 {
        match regime {
            Regime::Sleeping(window) => {
                let phase = window.elapsed_fraction(t);
                if phase < 1.0 / 3.0 {
                    rng.gen_range(51..=56)
                } else if phase < 2.0 / 3.0 {
                    rng.gen_range(53..=59)
                } else {
                    rng.gen_range(56..=65)
                }
            }
            Regime::Active(window) => {
                let progress = window.progress(t);
                if progress < RAMP_FRACTION || progress > 1.0 - RAMP_FRACTION {
                    rng.gen_range(75..=95)
                } else {
                    (i32::from(window.target_bpm) + rng.gen_range(-3..=3)).clamp(85, 195)
                }
            }
            Regime::Resting => rng.gen_range(62..=78),
        }
    }

    /// One step of the walk
    pub fn step<R: Rng + ?Sized>(
        &self,
        walk: WalkState,
        target: i32,
        state: HrState,
        rng: &mut R,
    ) -> WalkState {
        let diff = target - walk.bpm;
        let mut next = walk.bpm + i32::from(state.step_table().sample(rng));

        if diff.abs() > PULL_THRESHOLD && rng.gen_bool(PULL_PROBABILITY) {
            next += diff.signum();
        }

        WalkState {
            bpm: i32::from(self.bounds.clamp(next)),
        }
    }

    /// Simulate [00:00:00, 24:00:00) of `date`
    ///
    /// `sleep` should hold every window touching the day (the night ending this
    /// morning, any nap, and the night starting this evening). `active` is
    /// searched in order, scheduled sessions first.
    pub fn simulate_day<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        sleep: &[SleepWindow],
        active: &[ActiveWindow],
        rng: &mut R,
    ) -> Vec<HeartRateSample> {
        let day_start = start_of_day(date);
        let day_end = day_start + Duration::days(1);

        let mut samples = Vec::with_capacity(16_000);
        let mut walk = WalkState {
            bpm: i32::from(self.bounds.clamp(rng.gen_range(52..=58))),
        };
        let mut t = day_start;

        while t < day_end {
            let regime = Self::regime_at(t, sleep, active);
            let target = Self::target_bpm(&regime, t, rng);
            walk = self.step(walk, target, regime.state(), rng);

            samples.push(HeartRateSample {
                timestamp: t,
                bpm: self.bounds.clamp(walk.bpm),
                confidence: CONFIDENCE.sample(rng),
            });

            t += Duration::seconds(rng.gen_range(SAMPLE_SPACING_SECS.0..=SAMPLE_SPACING_SECS.1));
        }

        debug!(
            %date,
            samples = samples.len(),
            active_windows = active.len(),
            "Simulated heart-rate trace"
        );

        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SleepStages;
    use chrono::NaiveTime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 21).unwrap()
    }

    fn night(start: NaiveDateTime, minutes: u32) -> SleepWindow {
        SleepWindow {
            log_id: 1,
            date_of_sleep: date(),
            start,
            end: start + Duration::minutes(i64::from(minutes)),
            duration_ms: u64::from(minutes) * 60_000,
            minutes_in_bed: minutes,
            minutes_asleep: minutes * 9 / 10,
            minutes_awake: minutes - minutes * 9 / 10,
            minutes_to_fall_asleep: 10,
            efficiency_pct: 90,
            stages: SleepStages::default(),
            stage_counts: SleepStages::default(),
            main_sleep: true,
        }
    }

    fn standard_windows() -> Vec<SleepWindow> {
        let bedtime = date().pred_opt().unwrap().and_hms_opt(23, 0, 0).unwrap();
        let next_bedtime = date().and_hms_opt(23, 15, 0).unwrap();
        vec![night(bedtime, 450), night(next_bedtime, 420)]
    }

    fn run_window() -> ActiveWindow {
        ActiveWindow {
            start: date().and_hms_opt(17, 0, 0).unwrap(),
            end: date().and_hms_opt(18, 0, 0).unwrap(),
            target_bpm: 150,
            source: WindowSource::Scheduled,
        }
    }

    #[test]
    fn test_step_tables_are_normalised() {
        for table in [SLEEPING_STEPS, RESTING_STEPS, ACTIVE_STEPS] {
            assert!((table.total_weight() - 1.0).abs() < 1e-9);
        }
        assert!((CONFIDENCE.probability(Confidence::High) - 4.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_trace_covers_day_within_bounds() {
        let sim = HeartRateSimulator::new(HeartRateBounds::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let trace = sim.simulate_day(date(), &standard_windows(), &[run_window()], &mut rng);

        let day_start = start_of_day(date());
        let day_end = day_start + Duration::days(1);
        assert_eq!(trace[0].timestamp, day_start);
        assert!(day_end - trace.last().unwrap().timestamp <= Duration::seconds(7));

        for pair in trace.windows(2) {
            let gap = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            assert!((4..=7).contains(&gap), "gap {}", gap);
        }
        for sample in &trace {
            assert!((48..=198).contains(&sample.bpm));
            assert!((1..=3).contains(&sample.confidence.as_u8()));
            assert!(sample.timestamp < day_end);
        }
    }

    #[test]
    fn test_session_raises_heart_rate_above_sleep() {
        let sim = HeartRateSimulator::new(HeartRateBounds::default());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let trace = sim.simulate_day(date(), &standard_windows(), &[run_window()], &mut rng);

        let mean_between = |from: NaiveTime, to: NaiveTime| {
            let values: Vec<f64> = trace
                .iter()
                .filter(|s| s.timestamp.time() >= from && s.timestamp.time() < to)
                .map(|s| f64::from(s.bpm))
                .collect();
            values.iter().sum::<f64>() / values.len() as f64
        };

        let asleep = mean_between(NaiveTime::from_hms_opt(2, 0, 0).unwrap(), NaiveTime::from_hms_opt(4, 0, 0).unwrap());
        let session_core = mean_between(NaiveTime::from_hms_opt(17, 30, 0).unwrap(), NaiveTime::from_hms_opt(17, 50, 0).unwrap());
        assert!(asleep < 75.0, "asleep mean {}", asleep);
        assert!(session_core > asleep + 30.0, "session mean {}", session_core);
    }

    #[test]
    fn test_regime_precedence() {
        let sleep = standard_windows();
        let overlapping = vec![
            run_window(),
            ActiveWindow {
                start: date().and_hms_opt(17, 30, 0).unwrap(),
                end: date().and_hms_opt(19, 0, 0).unwrap(),
                target_bpm: 95,
                source: WindowSource::Incidental,
            },
        ];

        let t = date().and_hms_opt(17, 45, 0).unwrap();
        match HeartRateSimulator::regime_at(t, &sleep, &overlapping) {
            Regime::Active(w) => assert_eq!(w.target_bpm, 150),
            other => panic!("unexpected regime {:?}", other),
        }

        let t = date().and_hms_opt(3, 0, 0).unwrap();
        assert_eq!(HeartRateSimulator::regime_at(t, &sleep, &overlapping).state(), HrState::Sleeping);

        let t = date().and_hms_opt(23, 30, 0).unwrap();
        assert_eq!(HeartRateSimulator::regime_at(t, &sleep, &overlapping).state(), HrState::Sleeping);

        let t = date().and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(HeartRateSimulator::regime_at(t, &sleep, &overlapping).state(), HrState::Resting);
    }

    #[test]
    fn test_active_targets_ramp_then_plateau() {
        let window = run_window();
        let regime = Regime::Active(&window);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        for _ in 0..200 {
            let warmup = HeartRateSimulator::target_bpm(&regime, date().and_hms_opt(17, 3, 0).unwrap(), &mut rng);
            assert!((75..=95).contains(&warmup));
            let core = HeartRateSimulator::target_bpm(&regime, date().and_hms_opt(17, 30, 0).unwrap(), &mut rng);
            assert!((147..=153).contains(&core));
            let cooldown = HeartRateSimulator::target_bpm(&regime, date().and_hms_opt(17, 57, 0).unwrap(), &mut rng);
            assert!((75..=95).contains(&cooldown));
        }
    }

    #[test]
    fn test_step_respects_bounds() {
        let sim = HeartRateSimulator::new(HeartRateBounds { min_bpm: 50, max_bpm: 60 });
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut walk = WalkState { bpm: 60 };
        for _ in 0..5_000 {
            walk = sim.step(walk, 190, HrState::Active, &mut rng);
            assert!((50..=60).contains(&walk.bpm));
        }
    }

    #[test]
    fn test_incidental_windows_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        for _ in 0..500 {
            let windows = incidental_windows(date(), &mut rng);
            assert!(windows.len() <= 3);
            for w in windows {
                assert_eq!(w.source, WindowSource::Incidental);
                assert!(w.start.date() == date());
                assert!((85..=145).contains(&w.target_bpm));
                let minutes = (w.end - w.start).num_minutes();
                assert!((15..=90).contains(&minutes));
            }
        }
    }
}

//! Nightly sleep windows and weekend naps
//!
//! A night is attributed to the morning it ends on: the window for day `i`
//! usually starts on the evening of day `i - 1`. Bedtime, duration bucket,
//! efficiency and the stage split are drawn independently per night, then
//! nudged by schedule signals: an early session the next morning pulls
//! bedtime earlier, any session that day caps the wake time, and exercise
//! on the previous day deepens the night. No window overlaps a session on
//! its wake-up day.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rand::Rng;
use tracing::debug;

use crate::models::{start_of_day, SleepStages, SleepWindow};
use crate::sampling::WeightedTable;
use crate::schedule::{DayContext, EARLY_SESSION_CUTOFF};

/// First log id of the main-sleep id range
pub const SLEEP_LOG_ID_BASE: u64 = 51_000_000_000;
/// Offset of a nap's log id from the same day's main log
pub const NAP_LOG_ID_OFFSET: u64 = 500_000;
/// Weekend nap probability
pub const NAP_PROBABILITY: f64 = 0.18;

/// Minimum time between waking and the day's first session
const WAKE_BEFORE_SESSION_MIN: i64 = 30;
/// Shortest night the session cap may produce; bedtime moves earlier instead
const MIN_CAPPED_IN_BED_MIN: i64 = 240;
/// Deep-sleep ceiling after the post-exercise boost
const DEEP_SLEEP_CAP_MIN: u32 = 110;

/// Sleep-duration buckets, in hours in bed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBucket {
    Short,
    Normal,
    Good,
    Long,
}

impl DurationBucket {
    pub fn hours_range(&self) -> (f64, f64) {
        match self {
            DurationBucket::Short => (4.5, 5.5),
            DurationBucket::Normal => (5.8, 6.8),
            DurationBucket::Good => (6.8, 7.8),
            DurationBucket::Long => (7.8, 9.0),
        }
    }
}

pub const WEEKDAY_DURATIONS: WeightedTable<DurationBucket> = WeightedTable::new(&[
    (DurationBucket::Short, 0.12),
    (DurationBucket::Normal, 0.43),
    (DurationBucket::Good, 0.35),
    (DurationBucket::Long, 0.10),
]);

pub const WEEKEND_DURATIONS: WeightedTable<DurationBucket> = WeightedTable::new(&[
    (DurationBucket::Short, 0.08),
    (DurationBucket::Normal, 0.22),
    (DurationBucket::Good, 0.40),
    (DurationBucket::Long, 0.30),
]);

/// Ordinary bedtime slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BedtimeSlot {
    TenSharp,
    LateTen,
    Eleven,
    AfterMidnight,
}

const BEDTIME_SLOTS: WeightedTable<BedtimeSlot> = WeightedTable::new(&[
    (BedtimeSlot::TenSharp, 0.25),
    (BedtimeSlot::LateTen, 0.25),
    (BedtimeSlot::Eleven, 0.25),
    (BedtimeSlot::AfterMidnight, 0.25),
]);

/// Schedule signals relevant to one night
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NightSignals {
    /// Session windows on the wake-up day
    pub sessions: Vec<(NaiveDateTime, NaiveDateTime)>,
    /// Any session on the day before the night
    pub follows_exercise: bool,
}

impl NightSignals {
    pub fn first_session_start(&self) -> Option<NaiveDateTime> {
        self.sessions.iter().map(|(start, _)| *start).min()
    }

    /// Whether the first session starts before 09:00
    pub fn has_early_session(&self) -> bool {
        let (h, m) = EARLY_SESSION_CUTOFF;
        let cutoff = NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default();
        self.first_session_start().is_some_and(|start| start.time() < cutoff)
    }

    pub fn overlaps_session(&self, window: &SleepWindow) -> bool {
        self.sessions
            .iter()
            .any(|&(start, end)| window.start < end && start < window.end)
    }
}

/// The night's main sleep and an optional nap later that day
#[derive(Debug, Clone, PartialEq)]
pub struct SleepPlan {
    pub main: SleepWindow,
    pub nap: Option<SleepWindow>,
}

impl SleepPlan {
    pub fn windows(&self) -> impl Iterator<Item = &SleepWindow> {
        std::iter::once(&self.main).chain(self.nap.iter())
    }
}

/// Derives sleep windows from weekday/weekend and exercise signals
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepScheduler;

impl SleepScheduler {
    pub fn new() -> Self {
        SleepScheduler
    }

    /// Plan the night ending on the morning of `ctx.date`, plus any nap that day
    pub fn plan_day<R: Rng + ?Sized>(
        &self,
        ctx: &DayContext,
        signals: &NightSignals,
        rng: &mut R,
    ) -> SleepPlan {
        let main = self.main_window(ctx, signals, rng);
        let nap = if ctx.is_weekend && rng.gen_bool(NAP_PROBABILITY) {
            let nap = self.nap_window(ctx.date, main.log_id + NAP_LOG_ID_OFFSET, rng);
            if signals.overlaps_session(&nap) {
                debug!(day = ctx.day, nap_start = %nap.start, "Dropped nap that clashes with a session");
                None
            } else {
                Some(nap)
            }
        } else {
            None
        };

        debug!(
            day = ctx.day,
            bedtime = %main.start,
            minutes_in_bed = main.minutes_in_bed,
            efficiency = main.efficiency_pct,
            nap = nap.is_some(),
            "Planned sleep"
        );

        SleepPlan { main, nap }
    }

    fn main_window<R: Rng + ?Sized>(
        &self,
        ctx: &DayContext,
        signals: &NightSignals,
        rng: &mut R,
    ) -> SleepWindow {
        let bedtime_offset = Self::bedtime_offset_minutes(ctx.is_weekend, signals.has_early_session(), rng);
        let mut start = start_of_day(ctx.date) + Duration::minutes(bedtime_offset);

        let table = if ctx.is_weekend { WEEKEND_DURATIONS } else { WEEKDAY_DURATIONS };
        let (lo, hi) = table.sample(rng).hours_range();
        let mut minutes_in_bed = (rng.gen_range(lo..hi) * 60.0) as i64;

        if let Some(session_start) = signals.first_session_start() {
            let latest_wake = session_start - Duration::minutes(WAKE_BEFORE_SESSION_MIN);
            let available = (latest_wake - start).num_minutes();
            if available < MIN_CAPPED_IN_BED_MIN {
                // Keep the wake time and go to bed earlier
                minutes_in_bed = MIN_CAPPED_IN_BED_MIN;
                start = latest_wake - Duration::minutes(MIN_CAPPED_IN_BED_MIN);
            } else if available < minutes_in_bed {
                minutes_in_bed = available;
            }
        }

        let minutes_in_bed = minutes_in_bed.max(0) as u32;
        let hours_in_bed = f64::from(minutes_in_bed) / 60.0;

        let efficiency: u8 = rng.gen_range(84..=96);
        let minutes_asleep = minutes_in_bed * u32::from(efficiency) / 100;
        let minutes_awake = minutes_in_bed - minutes_asleep;

        let mut deep: u32 = if hours_in_bed < 5.5 {
            rng.gen_range(18..=45)
        } else if rng.gen_bool(0.12) {
            // Anomalous shallow night
            rng.gen_range(10..=32)
        } else {
            rng.gen_range(52..=92)
        };
        if signals.follows_exercise || rng.gen_bool(0.20) {
            deep = (deep + rng.gen_range(8..=18)).min(DEEP_SLEEP_CAP_MIN);
        }
        let deep = deep.min(minutes_asleep);
        let rem = rng.gen_range(65u32..=108).min(minutes_asleep - deep);
        let light = minutes_asleep - deep - rem;

        SleepWindow {
            log_id: SLEEP_LOG_ID_BASE + u64::from(ctx.day) * 1_000_000 + rng.gen_range(0..=999_999),
            date_of_sleep: ctx.date,
            start,
            end: start + Duration::minutes(i64::from(minutes_in_bed)),
            duration_ms: u64::from(minutes_in_bed) * 60_000,
            minutes_in_bed,
            minutes_asleep,
            minutes_awake,
            minutes_to_fall_asleep: rng.gen_range(3..=20),
            efficiency_pct: efficiency,
            stages: SleepStages {
                deep,
                light,
                rem,
                wake: minutes_awake,
            },
            stage_counts: SleepStages {
                deep: rng.gen_range(2..=5),
                light: rng.gen_range(12..=25),
                rem: rng.gen_range(4..=9),
                wake: rng.gen_range(10..=30),
            },
            main_sleep: true,
        }
    }

    /// Bedtime relative to midnight of the wake-up day (negative = evening before)
    fn bedtime_offset_minutes<R: Rng + ?Sized>(weekend: bool, early_session: bool, rng: &mut R) -> i64 {
        if weekend && rng.gen_bool(0.6) {
            return rng.gen_range(0..120);
        }
        if early_session && rng.gen_bool(0.8) {
            // 21:45 - 22:45
            return -rng.gen_range(75..=135);
        }
        match BEDTIME_SLOTS.sample(rng) {
            BedtimeSlot::TenSharp => -120 + rng.gen_range(0..15),
            BedtimeSlot::LateTen => -120 + rng.gen_range(15..60),
            BedtimeSlot::Eleven => -60 + rng.gen_range(0..60),
            BedtimeSlot::AfterMidnight => rng.gen_range(0..60),
        }
    }

    fn nap_window<R: Rng + ?Sized>(&self, date: NaiveDate, log_id: u64, rng: &mut R) -> SleepWindow {
        let start = start_of_day(date) + Duration::minutes(14 * 60 + rng.gen_range(-30..=30));
        let minutes_in_bed: u32 = rng.gen_range(25..=75);
        let efficiency: u8 = rng.gen_range(88..=95);
        let minutes_asleep = minutes_in_bed * u32::from(efficiency) / 100;
        let minutes_awake = minutes_in_bed - minutes_asleep;

        let deep = rng.gen_range(5..=25).min(minutes_asleep / 3);
        let rem = rng.gen_range(5..=20).min(minutes_asleep - deep);
        let light = minutes_asleep - deep - rem;

        SleepWindow {
            log_id,
            date_of_sleep: date,
            start,
            end: start + Duration::minutes(i64::from(minutes_in_bed)),
            duration_ms: u64::from(minutes_in_bed) * 60_000,
            minutes_in_bed,
            minutes_asleep,
            minutes_awake,
            minutes_to_fall_asleep: 3,
            efficiency_pct: efficiency,
            stages: SleepStages {
                deep,
                light,
                rem,
                wake: minutes_awake,
            },
            stage_counts: SleepStages {
                deep: rng.gen_range(0..=2),
                light: rng.gen_range(2..=6),
                rem: rng.gen_range(1..=3),
                wake: rng.gen_range(2..=5),
            },
            main_sleep: false,
        }
    }
}

/// Whether the night crossed midnight, i.e. began on the previous calendar day
pub fn starts_previous_evening(window: &SleepWindow) -> bool {
    window.start.date() < window.date_of_sleep && window.start.hour() >= 12
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DayLoad;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(date: NaiveDate) -> DayContext {
        use chrono::Datelike;
        DayContext {
            day: 1,
            date,
            is_weekend: date.weekday().number_from_monday() >= 6,
            load: DayLoad::Rest,
            previous_load: DayLoad::Rest,
        }
    }

    fn weekday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 21).unwrap()
    }

    fn saturday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 24).unwrap()
    }

    #[test]
    fn test_window_invariants_hold() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for i in 0..2_000 {
            let date = if i % 2 == 0 { weekday() } else { saturday() };
            let plan = scheduler.plan_day(&ctx(date), &NightSignals::default(), &mut rng);
            for w in plan.windows() {
                assert_eq!(w.minutes_in_bed, w.minutes_asleep + w.minutes_awake);
                assert!(w.efficiency_pct <= 100);
                let s = w.stages;
                assert_eq!(s.deep + s.light + s.rem, w.minutes_asleep);
                assert_eq!(s.wake, w.minutes_awake);
                assert_eq!(w.duration_ms, u64::from(w.minutes_in_bed) * 60_000);
                assert_eq!((w.end - w.start).num_minutes(), i64::from(w.minutes_in_bed));
            }
        }
    }

    #[test]
    fn test_late_bedtime_belongs_to_previous_day() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut saw_previous_evening = false;
        for _ in 0..200 {
            let plan = scheduler.plan_day(&ctx(weekday()), &NightSignals::default(), &mut rng);
            let w = &plan.main;
            if w.start.hour() >= 21 {
                assert_eq!(w.start.date(), weekday().pred_opt().unwrap());
                assert!(starts_previous_evening(w));
                saw_previous_evening = true;
            } else {
                assert!(w.start.hour() < 2);
                assert_eq!(w.start.date(), weekday());
            }
        }
        assert!(saw_previous_evening);
    }

    #[test]
    fn test_weekday_never_naps() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..500 {
            let plan = scheduler.plan_day(&ctx(weekday()), &NightSignals::default(), &mut rng);
            assert!(plan.nap.is_none());
        }
    }

    fn session_signals(date: NaiveDate, h: u32, m: u32, minutes: i64) -> NightSignals {
        let start = date.and_hms_opt(h, m, 0).unwrap();
        NightSignals {
            sessions: vec![(start, start + Duration::minutes(minutes))],
            follows_exercise: false,
        }
    }

    #[test]
    fn test_early_session_caps_wake_time() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let signals = session_signals(weekday(), 6, 45, 32);
        assert!(signals.has_early_session());
        let latest = weekday().and_hms_opt(6, 15, 0).unwrap();
        for _ in 0..300 {
            let plan = scheduler.plan_day(&ctx(weekday()), &signals, &mut rng);
            let w = &plan.main;
            assert!(w.end <= latest, "woke at {}", w.end);
            assert!(i64::from(w.minutes_in_bed) >= MIN_CAPPED_IN_BED_MIN);
        }
    }

    #[test]
    fn test_very_early_session_moves_bedtime_instead_of_wake() {
        // Weekend bedtimes run up to 02:00, so a 05:30 start leaves less than
        // the 240 minute floor for most post-midnight nights
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let signals = session_signals(saturday(), 5, 30, 45);
        let latest = saturday().and_hms_opt(5, 0, 0).unwrap();
        let mut floored = 0;
        for _ in 0..500 {
            let w = scheduler.plan_day(&ctx(saturday()), &signals, &mut rng).main;
            assert!(w.end <= latest, "woke at {}", w.end);
            assert!(!signals.overlaps_session(&w));
            if i64::from(w.minutes_in_bed) == MIN_CAPPED_IN_BED_MIN {
                assert_eq!(w.end, latest);
                assert_eq!(w.start, saturday().and_hms_opt(1, 0, 0).unwrap());
                floored += 1;
            }
        }
        assert!(floored > 0);
    }

    #[test]
    fn test_late_morning_session_caps_weekend_lie_in() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(44);
        let signals = session_signals(saturday(), 9, 30, 62);
        assert!(!signals.has_early_session());
        for _ in 0..500 {
            let w = scheduler.plan_day(&ctx(saturday()), &signals, &mut rng).main;
            assert!(w.end <= saturday().and_hms_opt(9, 0, 0).unwrap(), "woke at {}", w.end);
        }
    }

    #[test]
    fn test_nap_never_clashes_with_afternoon_session() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let signals = session_signals(saturday(), 14, 0, 50);
        for _ in 0..1_000 {
            let plan = scheduler.plan_day(&ctx(saturday()), &signals, &mut rng);
            if let Some(nap) = &plan.nap {
                assert!(!signals.overlaps_session(nap));
            }
        }
    }

    #[test]
    fn test_exercise_deepens_sleep_on_average() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mean_deep = |follows: bool, rng: &mut ChaCha8Rng| {
            let signals = NightSignals {
                sessions: Vec::new(),
                follows_exercise: follows,
            };
            let total: u32 = (0..1_000)
                .map(|_| scheduler.plan_day(&ctx(weekday()), &signals, rng).main.stages.deep)
                .sum();
            f64::from(total) / 1_000.0
        };
        let rested = mean_deep(false, &mut rng);
        let exercised = mean_deep(true, &mut rng);
        assert!(exercised > rested + 5.0, "rested {} exercised {}", rested, exercised);
    }

    #[test]
    fn test_nap_window_shape() {
        let scheduler = SleepScheduler::new();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let nap = scheduler.nap_window(saturday(), 42, &mut rng);
        assert!(!nap.main_sleep);
        assert!((25..=75).contains(&nap.minutes_in_bed));
        let earliest = saturday().and_hms_opt(13, 30, 0).unwrap();
        let latest = saturday().and_hms_opt(14, 30, 0).unwrap();
        assert!(nap.start >= earliest && nap.start <= latest);
    }

    #[test]
    fn test_duration_tables_bias() {
        assert!(WEEKDAY_DURATIONS.probability(DurationBucket::Normal) > WEEKDAY_DURATIONS.probability(DurationBucket::Long));
        assert!(WEEKEND_DURATIONS.probability(DurationBucket::Long) > WEEKDAY_DURATIONS.probability(DurationBucket::Long));
    }
}

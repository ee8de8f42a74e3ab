//! Materialises scheduled sessions into exercise log records

use chrono::NaiveDate;
use rand::distributions::Distribution;
use rand::Rng;
use rust_decimal::Decimal;
use statrs::distribution::LogNormal;
use tracing::{debug, warn};

use crate::models::{ActivityLevelMinutes, ExerciseSession, ExerciseSpec, ZoneMinutes};

/// Exercise logIds: base + day * 100 + index within the day
pub const EXERCISE_LOG_ID_BASE: u64 = 48_000_000_000;

/// Bounds on the calorie multiplier drawn around 1.0
const CALORIE_JITTER: (f64, f64) = (0.92, 1.08);
const CALORIE_SIGMA: f64 = 0.04;

/// Zone share (out-of-range, fat burn, cardio, peak) by session average heart rate
fn zone_proportions(avg_hr: u16) -> [f64; 4] {
    match avg_hr {
        hr if hr >= 160 => [0.05, 0.15, 0.45, 0.35],
        hr if hr >= 145 => [0.08, 0.27, 0.50, 0.15],
        hr if hr >= 125 => [0.15, 0.50, 0.30, 0.05],
        _ => [0.40, 0.50, 0.10, 0.0],
    }
}

/// Split `duration` minutes across the four zones; the peak band absorbs rounding
pub fn zone_breakdown(avg_hr: u16, duration: u32) -> ZoneMinutes {
    let [out, fat, cardio, _] = zone_proportions(avg_hr);
    let share = |p: f64| (f64::from(duration) * p).floor() as u32;

    let out_of_range = share(out);
    let fat_burn = share(fat);
    let cardio = share(cardio);
    ZoneMinutes {
        out_of_range,
        fat_burn,
        cardio,
        peak: duration - out_of_range - fat_burn - cardio,
    }
}

/// Sedentary / lightly / fairly / very active split of a session
pub fn activity_levels(duration: u32) -> ActivityLevelMinutes {
    let sedentary = duration * 8 / 100;
    let lightly = duration * 12 / 100;
    let fairly = duration * 35 / 100;
    ActivityLevelMinutes {
        sedentary,
        lightly,
        fairly,
        very: duration - sedentary - lightly - fairly,
    }
}

/// Named heart-rate band of an exercise log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneBand {
    pub name: &'static str,
    pub min: u16,
    pub max: u16,
}

/// Fitbit default zones: 50%, 70% and 85% of the age-predicted maximum
pub fn zone_bands(max_hr: u16) -> [ZoneBand; 4] {
    let at = |pct: u32| (u32::from(max_hr) * pct / 100) as u16;
    [
        ZoneBand { name: "Out of Range", min: 30, max: at(50) },
        ZoneBand { name: "Fat Burn", min: at(50), max: at(70) },
        ZoneBand { name: "Cardio", min: at(70), max: at(85) },
        ZoneBand { name: "Peak", min: at(85), max: max_hr },
    ]
}

#[derive(Debug, Clone)]
pub struct ExerciseSessionBuilder {
    calorie_jitter: Option<LogNormal>,
}

impl Default for ExerciseSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExerciseSessionBuilder {
    pub fn new() -> Self {
        let calorie_jitter = match LogNormal::new(0.0, CALORIE_SIGMA) {
            Ok(dist) => Some(dist),
            Err(e) => {
                warn!("Calorie jitter distribution unavailable: {}", e);
                None
            }
        };
        Self { calorie_jitter }
    }

    /// Build the session for `spec`, the `index`-th session of its day
    pub fn build<R: Rng + ?Sized>(
        &self,
        spec: &ExerciseSpec,
        date: NaiveDate,
        index: usize,
        rng: &mut R,
    ) -> ExerciseSession {
        let (start, end) = spec.window_on(date);
        let duration = spec.duration_minutes;

        let avg_hr = (i32::from(spec.target_avg_hr) + rng.gen_range(-4..=4)).max(1) as u16;
        let peak_offset = rng.gen_range(3..=5) * if rng.gen_bool(0.5) { 1 } else { -1 };
        let peak_hr = (i32::from(spec.target_peak_hr) + peak_offset).max(i32::from(avg_hr) + 1) as u16;

        let multiplier = self
            .calorie_jitter
            .as_ref()
            .map_or(1.0, |dist| dist.sample(rng))
            .clamp(CALORIE_JITTER.0, CALORIE_JITTER.1);
        let calories = (f64::from(duration) * spec.calories_per_minute * multiplier).round() as u32;

        let distance = spec.distance_km * rng.gen_range(0.95..=1.05);
        let distance_km = Decimal::new((distance * 100.0).round() as i64, 2);
        let steps = (f64::from(spec.steps) * rng.gen_range(0.96..=1.04)).round() as u32;

        let session = ExerciseSession {
            log_id: EXERCISE_LOG_ID_BASE + u64::from(spec.day_offset) * 100 + index as u64,
            day_offset: spec.day_offset,
            kind: spec.kind,
            start,
            end,
            duration_minutes: duration,
            calories,
            steps,
            distance_km,
            avg_hr,
            peak_hr,
            hr_zone_minutes: zone_breakdown(avg_hr, duration),
            activity_level_minutes: activity_levels(duration),
        };

        debug!(
            day = spec.day_offset,
            kind = %spec.kind,
            avg_hr,
            peak_hr,
            calories,
            "Built exercise session"
        );

        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityKind;
    use chrono::NaiveTime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run_spec() -> ExerciseSpec {
        ExerciseSpec {
            day_offset: 0,
            kind: ActivityKind::Run,
            start_time: NaiveTime::from_hms_opt(7, 15, 0).unwrap(),
            duration_minutes: 38,
            target_avg_hr: 152,
            target_peak_hr: 171,
            distance_km: 6.4,
            steps: 6200,
            calories_per_minute: 11.5,
        }
    }

    #[test]
    fn test_zone_breakdown_sums_to_duration() {
        for avg in [100u16, 125, 140, 145, 150, 160, 180] {
            for duration in [1u32, 7, 38, 45, 61, 120] {
                assert_eq!(zone_breakdown(avg, duration).total(), duration);
            }
        }
    }

    #[test]
    fn test_harder_sessions_shift_into_high_zones() {
        let easy = zone_breakdown(110, 60);
        let hard = zone_breakdown(165, 60);
        assert!(hard.cardio + hard.peak > easy.cardio + easy.peak);
        assert_eq!(easy.peak, 0);
    }

    #[test]
    fn test_activity_levels() {
        let levels = activity_levels(50);
        assert_eq!(levels.sedentary, 4);
        assert_eq!(levels.lightly, 6);
        assert_eq!(levels.fairly, 17);
        assert_eq!(levels.total(), 50);
    }

    #[test]
    fn test_zone_bands_for_thirty_year_old() {
        let bands = zone_bands(190);
        assert_eq!(bands[1].min, 95);
        assert_eq!(bands[2].min, 133);
        assert_eq!(bands[3].min, 161);
        assert_eq!(bands[3].max, 190);
    }

    #[test]
    fn test_session_jitter_bounds() {
        let builder = ExerciseSessionBuilder::new();
        let spec = run_spec();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let date = NaiveDate::from_ymd_opt(2026, 1, 20).unwrap();
        let base_calories: f64 = 38.0 * 11.5;

        for _ in 0..500 {
            let s = builder.build(&spec, date, 0, &mut rng);
            assert!((148..=156).contains(&s.avg_hr));
            assert!(s.peak_hr > s.avg_hr);
            assert!((166..=176).contains(&s.peak_hr));
            assert_eq!(s.hr_zone_minutes.total(), 38);
            assert_eq!(s.activity_level_minutes.total(), 38);
            let c = f64::from(s.calories);
            assert!(c >= (base_calories * 0.92).floor() && c <= (base_calories * 1.08).ceil());
            assert!((5950..=6450).contains(&s.steps));
            assert_eq!(s.start, date.and_hms_opt(7, 15, 0).unwrap());
        }
    }
}

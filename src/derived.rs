//! Once-per-day derived metrics
//!
//! Every metric here reads the day's training load from [`DayContext`]
//! rather than re-deriving it, so the "hard day" rule is applied
//! consistently: resting HR, HRV, SpO2 and stress all respond to
//! yesterday's hard session, while the sleep score only looks at the
//! night's own sleep window.

use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal;
use tracing::{debug, warn};

use crate::config::Baselines;
use crate::models::{
    DailyDerivedMetrics, DayLoad, ExerciseSpec, HrvSummary, RestingHeartRate, SleepScore, SleepWindow,
    SpO2Summary, StressScore, ZoneMinutes,
};
use crate::sampling::{round_dp, uniform_rounded, WeightedTable};
use crate::schedule::DayContext;

pub const MINUTES_PER_DAY: u32 = 1440;

pub const RESTING_HR_RANGE: (f64, f64) = (45.0, 80.0);
pub const HRV_RANGE: (f64, f64) = (28.0, 95.0);
pub const STRESS_RANGE: (i32, i32) = (50, 92);
const HRV_NOISE_SIGMA: f64 = 3.5;

/// Whole-day zone allocation: (fat burn, cardio, peak) ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneProfile {
    Intense,
    Moderate,
    Light,
    Idle,
}

impl ZoneProfile {
    fn ranges(&self) -> [(u32, u32); 3] {
        match self {
            ZoneProfile::Intense => [(35, 55), (20, 40), (8, 20)],
            ZoneProfile::Moderate => [(20, 35), (10, 25), (3, 12)],
            ZoneProfile::Light => [(10, 25), (5, 15), (0, 8)],
            ZoneProfile::Idle => [(5, 15), (0, 8), (0, 0)],
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ZoneMinutes {
        let [fat, cardio, peak] = self.ranges().map(|(lo, hi)| rng.gen_range(lo..=hi));
        ZoneMinutes {
            out_of_range: MINUTES_PER_DAY - fat - cardio - peak,
            fat_burn: fat,
            cardio,
            peak,
        }
    }
}

const HIGH_AVG_PROFILES: WeightedTable<ZoneProfile> = WeightedTable::new(&[
    (ZoneProfile::Intense, 0.60),
    (ZoneProfile::Moderate, 0.30),
    (ZoneProfile::Light, 0.10),
]);

const MID_AVG_PROFILES: WeightedTable<ZoneProfile> = WeightedTable::new(&[
    (ZoneProfile::Intense, 0.20),
    (ZoneProfile::Moderate, 0.55),
    (ZoneProfile::Light, 0.25),
]);

const LOW_AVG_PROFILES: WeightedTable<ZoneProfile> = WeightedTable::new(&[
    (ZoneProfile::Moderate, 0.25),
    (ZoneProfile::Light, 0.60),
    (ZoneProfile::Idle, 0.15),
]);

const REST_DAY_PROFILES: WeightedTable<ZoneProfile> =
    WeightedTable::new(&[(ZoneProfile::Light, 0.20), (ZoneProfile::Idle, 0.80)]);

/// Profile table for a day, keyed by its most intense session
pub fn zone_profiles(session: Option<&ExerciseSpec>) -> WeightedTable<ZoneProfile> {
    match session.map(|s| s.target_avg_hr) {
        Some(hr) if hr >= 155 => HIGH_AVG_PROFILES,
        Some(hr) if hr >= 130 => MID_AVG_PROFILES,
        Some(_) => LOW_AVG_PROFILES,
        None => REST_DAY_PROFILES,
    }
}

/// Computes [`DailyDerivedMetrics`] for one day
#[derive(Debug, Clone)]
pub struct DerivedMetricsGenerator {
    baselines: Baselines,
    hrv_noise: Option<Normal>,
}

impl DerivedMetricsGenerator {
    pub fn new(baselines: Baselines) -> Self {
        let hrv_noise = match Normal::new(0.0, HRV_NOISE_SIGMA) {
            Ok(dist) => Some(dist),
            Err(e) => {
                warn!("HRV noise distribution unavailable: {}", e);
                None
            }
        };
        Self {
            baselines,
            hrv_noise,
        }
    }

    pub fn generate<R: Rng + ?Sized>(
        &self,
        ctx: &DayContext,
        main_sleep: &SleepWindow,
        top_session: Option<&ExerciseSpec>,
        rng: &mut R,
    ) -> DailyDerivedMetrics {
        let resting_hr = self.resting_hr(ctx, rng);
        let hrv = self.hrv(ctx, rng);
        let spo2 = self.spo2(ctx, rng);
        let stress = self.stress(ctx, rng);
        let sleep_score = main_sleep
            .main_sleep
            .then(|| self.sleep_score(main_sleep, resting_hr.value.round() as u16, rng));
        let profile = zone_profiles(top_session).sample(rng);
        let whole_day_zones = profile.sample(rng);

        debug!(
            day = ctx.day,
            load = %ctx.load,
            rhr = resting_hr.value,
            rmssd = hrv.rmssd,
            stress = stress.score,
            "Derived daily metrics"
        );

        DailyDerivedMetrics {
            date: ctx.date,
            load: ctx.load,
            resting_hr,
            hrv,
            spo2,
            stress,
            sleep_score,
            whole_day_zones,
        }
    }

    pub fn resting_hr<R: Rng + ?Sized>(&self, ctx: &DayContext, rng: &mut R) -> RestingHeartRate {
        let mut value = self.baselines.resting_hr + f64::from(rng.gen_range(-3i32..=3));
        if ctx.follows_hard_day() {
            value -= f64::from(rng.gen_range(1i32..=3));
        }
        if ctx.load != DayLoad::Rest {
            value += f64::from(rng.gen_range(0i32..=2));
        }

        RestingHeartRate {
            value: value.round().clamp(RESTING_HR_RANGE.0, RESTING_HR_RANGE.1),
            error: rng.gen_range(7.0..13.0),
        }
    }

    pub fn hrv<R: Rng + ?Sized>(&self, ctx: &DayContext, rng: &mut R) -> HrvSummary {
        let baseline = self.baselines.hrv_rmssd + rng.gen_range(-4.0..4.0);
        let scale = if ctx.follows_hard_day() {
            rng.gen_range(0.75..0.90)
        } else if ctx.is_hard() {
            rng.gen_range(0.85..1.05)
        } else {
            rng.gen_range(0.92..1.18)
        };
        let noise = self.hrv_noise.as_ref().map_or(0.0, |n| n.sample(rng));
        let rmssd = round_dp((baseline * scale + noise).clamp(HRV_RANGE.0, HRV_RANGE.1), 3);

        let mut nremhr = rng.gen_range(52..=62u16);
        if ctx.follows_hard_day() {
            nremhr += rng.gen_range(1..=3);
        }

        HrvSummary {
            rmssd,
            baseline,
            nremhr,
            entropy: uniform_rounded(rng, 1.1, 1.7, 3),
        }
    }

    pub fn spo2<R: Rng + ?Sized>(&self, ctx: &DayContext, rng: &mut R) -> SpO2Summary {
        let average = if ctx.follows_hard_day() {
            uniform_rounded(rng, 95.8, 97.2, 1)
        } else {
            uniform_rounded(rng, 96.8, 99.3, 1)
        };
        let lower_bound = round_dp(average - rng.gen_range(0.8..2.0), 1);
        let upper_bound = round_dp(average + rng.gen_range(0.5..1.5), 1).min(100.0);

        SpO2Summary {
            average,
            lower_bound,
            upper_bound,
        }
    }

    pub fn stress<R: Rng + ?Sized>(&self, ctx: &DayContext, rng: &mut R) -> StressScore {
        let mut score = self.baselines.stress_score;
        if ctx.follows_hard_day() {
            score -= rng.gen_range(4..=12);
        }
        if ctx.is_pure_rest() {
            score += rng.gen_range(1..=4);
        }
        score += rng.gen_range(-4..=4);

        let exertion_points = if ctx.is_hard() || ctx.follows_hard_day() {
            rng.gen_range(32..=40)
        } else {
            rng.gen_range(26..=38)
        };

        StressScore {
            score: score.clamp(STRESS_RANGE.0, STRESS_RANGE.1) as u8,
            sleep_points: rng.gen_range(20..=30),
            responsiveness_points: rng.gen_range(22..=30),
            exertion_points,
        }
    }

    /// Score a main sleep log from its own efficiency, deep minutes and duration
    pub fn sleep_score<R: Rng + ?Sized>(
        &self,
        window: &SleepWindow,
        resting_heart_rate: u16,
        rng: &mut R,
    ) -> SleepScore {
        let deep = window.stages.deep;
        let hours_asleep = f64::from(window.minutes_asleep) / 60.0;

        let mut base = i32::from(window.efficiency_pct) - 5;
        if deep > 70 {
            base += rng.gen_range(3..=8);
        } else if deep < 40 {
            base -= rng.gen_range(5..=12);
        }
        if hours_asleep >= 7.5 {
            base += rng.gen_range(2..=5);
        } else if hours_asleep < 6.0 {
            base -= rng.gen_range(3..=8);
        }

        let overall = (base + rng.gen_range(-3..=3)).clamp(55, 95) as u8;
        let composition = (deep as i32 / 4 + rng.gen_range(-2..=3)).clamp(15, 25) as u8;
        let revitalization = rng.gen_range(18..=24);
        let duration = ((hours_asleep * 5.5) as i32 + rng.gen_range(-3..=3)).clamp(20, 45) as u8;

        SleepScore {
            sleep_log_id: window.log_id,
            timestamp: window.end,
            overall,
            composition,
            revitalization,
            duration,
            deep_sleep_minutes: deep,
            resting_heart_rate,
            restlessness: uniform_rounded(rng, 0.04, 0.09, 2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SleepStages;
    use chrono::{Duration, NaiveDate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx(load: DayLoad, previous_load: DayLoad) -> DayContext {
        DayContext {
            day: 3,
            date: NaiveDate::from_ymd_opt(2026, 1, 23).unwrap(),
            is_weekend: false,
            load,
            previous_load,
        }
    }

    fn sleep(efficiency: u8, asleep: u32, deep: u32) -> SleepWindow {
        let start = NaiveDate::from_ymd_opt(2026, 1, 22).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let in_bed = asleep * 100 / u32::from(efficiency);
        SleepWindow {
            log_id: 51_003_000_123,
            date_of_sleep: NaiveDate::from_ymd_opt(2026, 1, 23).unwrap(),
            start,
            end: start + Duration::minutes(i64::from(in_bed)),
            duration_ms: u64::from(in_bed) * 60_000,
            minutes_in_bed: in_bed,
            minutes_asleep: asleep,
            minutes_awake: in_bed - asleep,
            minutes_to_fall_asleep: 8,
            efficiency_pct: efficiency,
            stages: SleepStages { deep, light: asleep - deep - 90, rem: 90, wake: in_bed - asleep },
            stage_counts: SleepStages::default(),
            main_sleep: true,
        }
    }

    fn generator() -> DerivedMetricsGenerator {
        DerivedMetricsGenerator::new(Baselines::default())
    }

    #[test]
    fn test_values_stay_in_documented_ranges() {
        let g = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let window = sleep(90, 420, 75);
        for (load, prev) in [
            (DayLoad::Rest, DayLoad::Rest),
            (DayLoad::Hard, DayLoad::Rest),
            (DayLoad::Normal, DayLoad::Hard),
        ] {
            for _ in 0..300 {
                let m = g.generate(&ctx(load, prev), &window, None, &mut rng);
                assert!((45.0..=80.0).contains(&m.resting_hr.value));
                assert!((7.0..13.0).contains(&m.resting_hr.error));
                assert!((28.0..=95.0).contains(&m.hrv.rmssd));
                assert!(m.spo2.upper_bound <= 100.0);
                assert!(m.spo2.lower_bound < m.spo2.average);
                assert!((50..=92).contains(&m.stress.score));
                assert!((26..=40).contains(&m.stress.exertion_points));
                assert_eq!(m.whole_day_zones.total(), 1440);
                let score = m.sleep_score.unwrap();
                assert!((55..=95).contains(&score.overall));
                assert!((15..=25).contains(&score.composition));
                assert!((18..=24).contains(&score.revitalization));
                assert!((20..=45).contains(&score.duration));
            }
        }
    }

    #[test]
    fn test_hard_day_suppresses_next_day_hrv() {
        let g = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let after_hard = ctx(DayLoad::Rest, DayLoad::Hard);
        let rested = ctx(DayLoad::Rest, DayLoad::Rest);

        let mean_ratio = |c: &DayContext, rng: &mut ChaCha8Rng| {
            (0..400)
                .map(|_| {
                    let hrv = g.hrv(c, rng);
                    hrv.rmssd / hrv.baseline
                })
                .sum::<f64>()
                / 400.0
        };

        let suppressed = mean_ratio(&after_hard, &mut rng);
        let recovered = mean_ratio(&rested, &mut rng);
        assert!((0.75..=0.90).contains(&suppressed), "ratio {}", suppressed);
        assert!(recovered > 0.95, "ratio {}", recovered);
    }

    #[test]
    fn test_hard_day_lowers_stress_and_raises_exertion() {
        let g = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut after_hard = 0i32;
        let mut rested = 0i32;
        for _ in 0..300 {
            let s = g.stress(&ctx(DayLoad::Rest, DayLoad::Hard), &mut rng);
            assert!(s.exertion_points >= 32);
            after_hard += i32::from(s.score);
            rested += i32::from(g.stress(&ctx(DayLoad::Rest, DayLoad::Rest), &mut rng).score);
        }
        assert!(after_hard < rested);
    }

    #[test]
    fn test_sleep_score_tracks_sleep_quality() {
        let g = generator();
        let mut rng = ChaCha8Rng::seed_from_u64(24);
        let mut good = 0u32;
        let mut poor = 0u32;
        for _ in 0..200 {
            good += u32::from(g.sleep_score(&sleep(95, 480, 85), 58, &mut rng).overall);
            poor += u32::from(g.sleep_score(&sleep(85, 320, 30), 58, &mut rng).overall);
        }
        assert!(good > poor + 200 * 10);
    }

    #[test]
    fn test_zone_profile_selection() {
        let spec = |hr: u16| ExerciseSpec {
            target_avg_hr: hr,
            ..crate::config::default_schedule()[0].clone()
        };
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(zone_profiles(None).probability(ZoneProfile::Idle), 0.8));
        assert!(close(zone_profiles(Some(&spec(160))).probability(ZoneProfile::Intense), 0.6));
        assert!(close(zone_profiles(Some(&spec(140))).probability(ZoneProfile::Moderate), 0.55));
        assert!(close(zone_profiles(Some(&spec(110))).probability(ZoneProfile::Idle), 0.15));
    }
}

//! One generation pass over the configured horizon
//!
//! Sleep plans are computed first, sequentially, for every night the
//! horizon touches. Everything else is per-day and runs in parallel: each
//! (day, component) pair draws from its own seeded stream, so the result
//! does not depend on thread scheduling.

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::activity::{ActivityDay, ActivitySimulator};
use crate::config::{GeneratorConfig, ProfileConfig};
use crate::derived::DerivedMetricsGenerator;
use crate::exercise::ExerciseSessionBuilder;
use crate::heart_rate::{incidental_windows, ActiveWindow, HeartRateSimulator};
use crate::models::{DailyDerivedMetrics, ExerciseSession, HeartRateSample, SleepWindow};
use crate::sampling::{day_stream, fresh_seed, Stream};
use crate::schedule::{DayContext, ScheduleConfig};
use crate::sleep::{NightSignals, SleepPlan, SleepScheduler};
use crate::validation::FluidityReport;

/// Day whose leading samples feed the fluidity self-check
const FLUIDITY_CHECK_DAY: usize = 2;

/// Options that affect presentation only, never the generated data
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    pub show_progress: bool,
}

/// Everything generated for one calendar day
#[derive(Debug, Clone)]
pub struct DayOutput {
    pub context: DayContext,
    pub heart_rate: Vec<HeartRateSample>,
    pub activity: ActivityDay,
    pub derived: DailyDerivedMetrics,
    pub sessions: Vec<ExerciseSession>,
}

/// The full synthetic dataset of one run
#[derive(Debug, Clone)]
pub struct Dataset {
    pub seed: u64,
    pub profile: ProfileConfig,
    /// Night plans indexed by wake-up day
    pub sleep: Vec<SleepPlan>,
    pub days: Vec<DayOutput>,
    pub fluidity: Option<FluidityReport>,
}

impl Dataset {
    /// All sleep logs in chronological order (main sleep, then any nap)
    pub fn sleep_windows(&self) -> impl Iterator<Item = &SleepWindow> {
        self.sleep.iter().flat_map(|plan| plan.windows())
    }

    pub fn sessions(&self) -> impl Iterator<Item = &ExerciseSession> {
        self.days.iter().flat_map(|d| d.sessions.iter())
    }

    pub fn summary(&self, elapsed_ms: u128) -> GenerationSummary {
        GenerationSummary {
            seed: self.seed,
            days: self.days.len(),
            heart_rate_samples: self.days.iter().map(|d| d.heart_rate.len()).sum(),
            sleep_logs: self.sleep_windows().count(),
            naps: self.sleep.iter().filter(|p| p.nap.is_some()).count(),
            exercise_sessions: self.sessions().count(),
            total_steps: self.days.iter().map(|d| u64::from(d.activity.total_steps())).sum(),
            elapsed_ms,
        }
    }
}

/// Counts reported at the end of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub seed: u64,
    pub days: usize,
    pub heart_rate_samples: usize,
    pub sleep_logs: usize,
    pub naps: usize,
    pub exercise_sessions: usize,
    pub total_steps: u64,
    pub elapsed_ms: u128,
}

impl GenerationSummary {
    pub fn to_string_pretty(&self) -> String {
        format!(
            "Generated {} days (seed {}): {} heart-rate samples, {} sleep logs ({} naps), {} exercise sessions, {} steps in {}ms",
            self.days,
            self.seed,
            self.heart_rate_samples,
            self.sleep_logs,
            self.naps,
            self.exercise_sessions,
            self.total_steps,
            self.elapsed_ms
        )
    }
}

/// Wires the per-component generators together
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    schedule: ScheduleConfig,
    sleep: SleepScheduler,
    heart_rate: HeartRateSimulator,
    activity: ActivitySimulator,
    derived: DerivedMetricsGenerator,
    exercise: ExerciseSessionBuilder,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            schedule: ScheduleConfig::from_config(&config),
            sleep: SleepScheduler::new(),
            heart_rate: HeartRateSimulator::new(config.heart_rate),
            activity: ActivitySimulator::new(),
            derived: DerivedMetricsGenerator::new(config.baselines.clone()),
            exercise: ExerciseSessionBuilder::new(),
            config,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    /// Configured seed, or a fresh one for unseeded runs
    pub fn resolve_seed(&self) -> u64 {
        match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = fresh_seed();
                info!(seed, "No seed configured; drew a fresh one");
                seed
            }
        }
    }

    fn context(&self, day: u32) -> DayContext {
        self.schedule.day_context(day, self.config.horizon.date_of(day))
    }

    fn night_signals(&self, day: u32) -> NightSignals {
        let date = self.config.horizon.date_of(day);
        NightSignals {
            sessions: self.schedule.sessions_on(day).map(|s| s.window_on(date)).collect(),
            follows_exercise: day
                .checked_sub(1)
                .is_some_and(|previous| self.schedule.has_session(previous)),
        }
    }

    /// Plan every night the horizon touches: one per day plus the night
    /// starting on the final evening
    pub fn plan_sleep(&self, seed: u64) -> Vec<SleepPlan> {
        (0..=self.config.horizon.days)
            .map(|day| {
                let mut rng = day_stream(seed, day, Stream::Sleep);
                self.sleep
                    .plan_day(&self.context(day), &self.night_signals(day), &mut rng)
            })
            .collect()
    }

    /// Scheduled session windows first, then incidental ones
    fn active_windows<R: Rng + ?Sized>(&self, ctx: &DayContext, rng: &mut R) -> Vec<ActiveWindow> {
        let mut windows: Vec<ActiveWindow> = self
            .schedule
            .sessions_on(ctx.day)
            .map(|spec| ActiveWindow::from_spec(spec, ctx.date))
            .collect();
        windows.extend(incidental_windows(ctx.date, rng));
        windows
    }

    /// Generate one day; `plans` must cover `day` and `day + 1`
    pub fn generate_day(&self, seed: u64, day: u32, plans: &[SleepPlan]) -> DayOutput {
        let ctx = self.context(day);
        let index = day as usize;

        let sleep_windows: Vec<SleepWindow> = plans[index..]
            .iter()
            .take(2)
            .flat_map(|plan| plan.windows().cloned())
            .collect();

        let mut hr_rng = day_stream(seed, day, Stream::HeartRate);
        let active = self.active_windows(&ctx, &mut hr_rng);
        let heart_rate = self
            .heart_rate
            .simulate_day(ctx.date, &sleep_windows, &active, &mut hr_rng);

        let mut activity_rng = day_stream(seed, day, Stream::Activity);
        let activity =
            self.activity
                .simulate_day(ctx.date, self.schedule.exercise_steps(day), &mut activity_rng);

        let mut derived_rng = day_stream(seed, day, Stream::Derived);
        let derived = self.derived.generate(
            &ctx,
            &plans[index].main,
            self.schedule.most_intense_session(day),
            &mut derived_rng,
        );

        let mut exercise_rng = day_stream(seed, day, Stream::Exercise);
        let sessions = self
            .schedule
            .sessions_on(day)
            .enumerate()
            .map(|(i, spec)| self.exercise.build(spec, ctx.date, i, &mut exercise_rng))
            .collect();

        debug!(day, date = %ctx.date, samples = heart_rate.len(), "Generated day");

        DayOutput {
            context: ctx,
            heart_rate,
            activity,
            derived,
            sessions,
        }
    }

    /// Run a full pass over the horizon
    pub fn generate(&self, options: &GenerationOptions) -> Dataset {
        let started = Instant::now();
        let seed = self.resolve_seed();
        let days = self.config.horizon.days;

        info!(
            seed,
            days,
            start = %self.config.horizon.start_date,
            sessions = self.schedule.specs().len(),
            "Starting generation"
        );

        let sleep = self.plan_sleep(seed);

        let progress = options.show_progress.then(|| {
            let pb = ProgressBar::new(u64::from(days));
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} days ({msg})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        });

        let outputs: Vec<DayOutput> = (0..days)
            .into_par_iter()
            .map(|day| {
                let output = self.generate_day(seed, day, &sleep);
                if let Some(pb) = &progress {
                    pb.set_message(output.context.date.to_string());
                    pb.inc(1);
                }
                output
            })
            .collect();

        if let Some(pb) = progress {
            pb.finish_with_message("complete");
        }

        let fluidity = outputs
            .get(FLUIDITY_CHECK_DAY)
            .or_else(|| outputs.last())
            .map(|day| FluidityReport::leading_window(&day.heart_rate));
        if let Some(report) = &fluidity {
            if report.passes() {
                info!(
                    small_changes = report.small_change_fraction(),
                    mean_change = report.mean_change,
                    "Heart-rate fluidity check passed"
                );
            } else {
                warn!(
                    small_changes = report.small_change_fraction(),
                    mean_change = report.mean_change,
                    "Heart-rate fluidity check failed"
                );
            }
        }

        let dataset = Dataset {
            seed,
            profile: self.config.profile.clone(),
            sleep: sleep.into_iter().take(days as usize).collect(),
            days: outputs,
            fluidity,
        };

        info!("{}", dataset.summary(started.elapsed().as_millis()).to_string_pretty());
        dataset
    }
}

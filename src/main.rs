use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tabled::{settings::Style, Table, Tabled};

use fitsynth::config::GeneratorConfig;
use fitsynth::export::Exporter;
use fitsynth::generator::{Dataset, GenerationOptions, Generator};
use fitsynth::import::read_heart_rate_json;
use fitsynth::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use fitsynth::schedule::ScheduleConfig;
use fitsynth::validation::FluidityReport;
use fitsynth::FitSynthError;

/// fitsynth - synthetic wearable health exports
///
/// Generates a multi-day, Fitbit-style export tree whose heart rate, sleep,
/// activity and daily summary metrics are statistically coupled.
#[derive(Parser)]
#[command(name = "fitsynth")]
#[command(version)]
#[command(about = "Synthetic wearable health export generator", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, default_value = "compact", global = true)]
    log_format: String,

    /// Also write JSON logs to this file
    #[arg(long, value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an export tree
    Generate {
        /// Output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of days to generate
        #[arg(short, long)]
        days: Option<u32>,

        /// First day (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Replace a non-empty output directory
        #[arg(short, long)]
        force: bool,

        /// Indent JSON output
        #[arg(long)]
        pretty: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Check heart-rate fluidity of every heart_rate-*.json under a directory
    Verify {
        /// Export root or Global Export Data directory
        dir: PathBuf,
    },

    /// Show the exercise schedule and day classification
    Schedule,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the effective configuration as TOML
    Show,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Sleep (h)")]
    sleep_hours: String,
    #[tabled(rename = "Resting HR")]
    resting_hr: String,
    #[tabled(rename = "HRV (ms)")]
    hrv: String,
    #[tabled(rename = "Stress")]
    stress: u8,
    #[tabled(rename = "Steps")]
    steps: u32,
    #[tabled(rename = "Sessions")]
    sessions: usize,
}

#[derive(Tabled)]
struct ScheduleRow {
    #[tabled(rename = "Day")]
    day: u32,
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "Avg/Peak HR")]
    heart_rate: String,
}

#[derive(Tabled)]
struct FluidityRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "Δ0-1")]
    small: String,
    #[tabled(rename = "Mean Δ")]
    mean: String,
    #[tabled(rename = "Std Δ")]
    std_dev: String,
    #[tabled(rename = "Result")]
    result: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: LogLevel::from_verbosity(cli.verbose),
        format: cli
            .log_format
            .parse::<LogFormat>()
            .map_err(anyhow::Error::msg)?,
        file_path: cli.log_file.clone(),
        ..LogConfig::default()
    };
    init_logging(&log_config)?;

    match cli.command {
        Commands::Generate {
            out,
            days,
            start,
            seed,
            force,
            pretty,
            no_progress,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(out) = out {
                config.output.dir = out;
            }
            if let Some(start) = start {
                config.horizon.start_date = start;
            }
            if let Some(days) = days {
                config.horizon.days = days;
                let before = config.schedule.len();
                config.schedule.retain(|s| s.day_offset < days);
                if config.schedule.len() < before {
                    tracing::warn!(
                        dropped = before - config.schedule.len(),
                        days,
                        "Dropped sessions beyond the shortened horizon"
                    );
                }
            }
            if seed.is_some() {
                config.seed = seed;
            }
            config.output.overwrite |= force;
            config.output.pretty_json |= pretty;
            config.validate()?;

            generate(config, !no_progress)?;
        }

        Commands::Verify { dir } => verify(&dir)?,

        Commands::Schedule => {
            let config = load_config(cli.config.as_deref())?;
            print_schedule(&config);
        }

        Commands::Config { action } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(GeneratorConfig::default_config_path);
            match action {
                ConfigAction::Init { force } => {
                    if path.exists() && !force {
                        anyhow::bail!(
                            "{} already exists; pass --force to overwrite",
                            path.display()
                        );
                    }
                    GeneratorConfig::default().save_to_file(&path)?;
                    println!(
                        "{} Wrote default configuration to {}",
                        "✓".green(),
                        path.display()
                    );
                }
                ConfigAction::Show => {
                    let config = load_config(cli.config.as_deref())?;
                    let toml = toml::to_string_pretty(&config)
                        .context("Failed to serialize configuration")?;
                    println!("{}", toml);
                }
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load_from_file(path),
        None => Ok(GeneratorConfig::load_or_default()),
    }
}

fn generate(config: GeneratorConfig, show_progress: bool) -> Result<()> {
    println!("{}", "Generating synthetic export...".green().bold());
    println!(
        "  Horizon: {} to {} ({} days)",
        config.horizon.start_date,
        config.horizon.end_date(),
        config.horizon.days
    );

    let started = Instant::now();
    let exporter = Exporter::new(config.output.clone());
    let dataset = Generator::new(config).generate(&GenerationOptions { show_progress });

    let summary = match exporter.export(&dataset) {
        Ok(summary) => summary,
        Err(e) => {
            let err = FitSynthError::from(e);
            eprintln!("{} {}", "✗".red(), err.user_message());
            return Err(err.into());
        }
    };

    println!("{}", day_table(&dataset));
    if let Some(report) = &dataset.fluidity {
        let line = format!(
            "Fluidity: {:.1}% of steps within 1 bpm, mean change {:.2} bpm",
            report.small_change_fraction() * 100.0,
            report.mean_change
        );
        if report.passes() {
            println!("{}", line.green());
        } else {
            println!("{}", line.yellow());
        }
    }
    println!("{}", dataset.summary(started.elapsed().as_millis()).to_string_pretty().dimmed());
    println!(
        "{} Wrote {} files to {}",
        "✓".green(),
        summary.files_written,
        summary.root.display()
    );
    Ok(())
}

fn day_table(dataset: &Dataset) -> String {
    let rows: Vec<DayRow> = dataset
        .days
        .iter()
        .zip(dataset.sleep.iter())
        .map(|(day, plan)| DayRow {
            date: day.context.date.to_string(),
            load: day.context.load.to_string(),
            sleep_hours: format!("{:.1}", plan.main.duration_hours()),
            resting_hr: format!("{:.0}", day.derived.resting_hr.value),
            hrv: format!("{:.1}", day.derived.hrv.rmssd),
            stress: day.derived.stress.score,
            steps: day.activity.total_steps(),
            sessions: day.sessions.len(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn print_schedule(config: &GeneratorConfig) {
    let schedule = ScheduleConfig::from_config(config);
    let mut rows = Vec::new();

    for (day, date) in (0..config.horizon.days).zip(config.horizon.dates()) {
        let load = schedule.classify(day).to_string();
        let mut sessions = schedule.sessions_on(day).peekable();
        if sessions.peek().is_none() {
            rows.push(ScheduleRow {
                day,
                date,
                load,
                activity: "-".to_string(),
                start: "-".to_string(),
                minutes: "-".to_string(),
                heart_rate: "-".to_string(),
            });
            continue;
        }
        for spec in sessions {
            rows.push(ScheduleRow {
                day,
                date,
                load: load.clone(),
                activity: spec.kind.to_string(),
                start: spec.start_time.format("%H:%M").to_string(),
                minutes: spec.duration_minutes.to_string(),
                heart_rate: format!("{}/{}", spec.target_avg_hr, spec.target_peak_hr),
            });
        }
    }

    println!(
        "{}",
        format!(
            "Schedule: {} sessions over {} days",
            schedule.specs().len(),
            config.horizon.days
        )
        .cyan()
        .bold()
    );
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn verify(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Path is not a directory: {}", dir.display());
    }

    let mut files = Vec::new();
    collect_heart_rate_files(dir, &mut files)?;
    files.sort();
    if files.is_empty() {
        println!("No heart_rate-*.json files found in {}", dir.display());
        return Ok(());
    }

    let mut rows = Vec::new();
    let mut failures = 0usize;
    for path in &files {
        let samples = read_heart_rate_json(path).map_err(FitSynthError::from)?;
        let report = FluidityReport::leading_window(&samples);
        let passed = report.passes();
        if !passed {
            failures += 1;
        }
        rows.push(FluidityRow {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            samples: samples.len(),
            small: format!("{:.1}%", report.small_change_fraction() * 100.0),
            mean: format!("{:.2}", report.mean_change),
            std_dev: format!("{:.2}", report.std_dev_change),
            result: if passed {
                "pass".green().to_string()
            } else {
                "FAIL".red().to_string()
            },
        });
    }

    println!("{}", Table::new(rows).with(Style::rounded()));
    if failures == 0 {
        println!("{} All {} traces look fluid", "✓".green(), files.len());
        Ok(())
    } else {
        anyhow::bail!("{} of {} traces failed the fluidity check", failures, files.len())
    }
}

fn collect_heart_rate_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_heart_rate_files(&path, files)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("heart_rate-") && n.ends_with(".json"))
        {
            files.push(path);
        }
    }
    Ok(())
}

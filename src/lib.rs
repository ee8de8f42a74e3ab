// Library interface for fitsynth
// The CLI, integration tests and benches all drive generation through here

pub mod activity;
pub mod config;
pub mod derived;
pub mod error;
pub mod exercise;
pub mod export;
pub mod generator;
pub mod heart_rate;
pub mod import;
pub mod logging;
pub mod models;
pub mod sampling;
pub mod schedule;
pub mod sleep;
pub mod validation;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::GeneratorConfig;
pub use error::{ExportError, FitSynthError, ImportError, Result};
pub use export::{ExportSummary, Exporter};
pub use generator::{Dataset, GenerationOptions, Generator};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use schedule::ScheduleConfig;
pub use validation::FluidityReport;

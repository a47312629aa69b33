//! Panel Data Cleaning Library
//!
//! Deduplication and imputation for country-year life expectancy panels,
//! built on Polars.
//!
//! # Overview
//!
//! A panel is a flat table with one row per country per year. Raw exports
//! repeat rows, leave the development status blank, and skip life
//! expectancy values. One cleaning pass fixes what the data allows:
//!
//! - **Deduplication**: one record per `(country, year)`, keeping the first row seen
//! - **Status Imputation**: blank statuses filled from the country's other years
//! - **Interpolation**: a blank life expectancy between two known adjacent years
//!   becomes their mean, rounded half-up
//! - **Quality Analysis**: blank counts before and after, and invariant checks
//! - **Progress Reporting**: stage updates through a `Send + Sync` reporter
//!
//! Blanks that cannot be filled are left blank and listed in the summary.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_panel::{CleaningConfig, Pipeline, frame::load_csv};
//!
//! let df = load_csv("life_expectancy.csv")?;
//!
//! let config = CleaningConfig::builder()
//!     .country_column("Country")
//!     .life_expectancy_column("Life expectancy ")
//!     .output_dir("output")
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//!
//! println!("{} duplicates removed", result.summary.duplicates_removed());
//! println!("{} statuses filled", result.summary.statuses_filled);
//! ```
//!
//! # Typed Records
//!
//! Callers that already hold records can skip the table layer:
//!
//! ```rust,ignore
//! use lex_panel::{DataCleaner, LifeExpectancyInterpolator, Record, StatusImputer};
//!
//! let deduped = DataCleaner.deduplicate(records);
//! let filled = StatusImputer::default().fill_missing_status(deduped.records)?;
//! let interpolated = LifeExpectancyInterpolator::default().interpolate(filled.records)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod frame;
pub mod imputers;
pub mod pipeline;
pub mod quality;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::DataCleaner;
pub use config::{
    CleaningConfig, CleaningConfigBuilder, ColumnMapping, ConfigValidationError,
    MissingValuePolicy, StatusConflictPolicy, ZeroPolicy,
};
pub use error::{PanelError, Result as PanelResult, ResultExt};
pub use frame::{PanelFrame, load_csv};
pub use imputers::{LifeExpectancyInterpolator, StatusImputer};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Pipeline, PipelineBuilder, ProgressReporter,
    ProgressUpdate,
};
pub use quality::QualityAnalyzer;
pub use reporting::{CleaningReport, ReportGenerator};
pub use types::{
    ActionType, CleaningAction, CleaningResult, CleaningSummary, CountryYear, DedupOutcome,
    InterpolationOutcome, InvariantViolation, MissingValueSummary, Record, RemovedRecord, Status,
    StatusConflict, StatusFillOutcome, UnresolvedReason, UnresolvedValue,
};
pub use utils::{is_missing_marker, midpoint_half_up, normalize_header, parse_numeric_string};

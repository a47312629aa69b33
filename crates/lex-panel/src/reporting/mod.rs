//! Report generation module.
//!
//! This module writes the cleaned dataset and builds the JSON report of a
//! cleaning run.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_panel::reporting::ReportGenerator;
//!
//! let report = ReportGenerator::build_report(
//!     Some("data/who.csv"),
//!     result.output_path.as_deref(),
//!     (original_df.height(), original_df.width()),
//!     (result.data.height(), result.data.width()),
//!     &result.summary,
//!     &config,
//! );
//!
//! // Print as JSON
//! println!("{}", serde_json::to_string_pretty(&report)?);
//!
//! // Or write to file
//! let generator = ReportGenerator::new(PathBuf::from("output"), None);
//! generator.write_report_to_file(&report, "who")?;
//! ```

mod generator;

pub use generator::{CleaningReport, ReportGenerator};

use crate::config::CleaningConfig;
use crate::error::{PanelError, Result, ResultExt};
use crate::types::CleaningSummary;
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// Report Types
// ============================================================================

/// Report of one cleaning run.
///
/// Serialized for `--json` output, written by `--emit-report`, and written
/// next to the cleaned dataset when the config enables reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    /// Path to the input file, when cleaning started from a file
    pub input_file: Option<String>,
    /// Path to the cleaned dataset (if written)
    pub output_file: Option<String>,
    /// Source table shape (rows, columns)
    pub original_shape: (usize, usize),
    /// Cleaned table shape (rows, columns)
    pub final_shape: (usize, usize),
    /// What the cleaning pass did
    pub summary: CleaningSummary,
    /// Effective configuration of the run
    pub config: CleaningConfig,
}

pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a new ReportGenerator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    /// Create a generator writing where the config says.
    pub fn from_config(config: &CleaningConfig) -> Self {
        Self::new(config.output_dir.clone(), config.output_name.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path the cleaned dataset is written to.
    pub fn dataset_path(&self) -> PathBuf {
        let stem = self.output_name.as_deref().unwrap_or("cleaned_panel");
        self.output_dir.join(format!("{}.csv", stem))
    }

    /// Assemble a report from a finished run.
    pub fn build_report(
        input_file: Option<&str>,
        output_file: Option<&Path>,
        original_shape: (usize, usize),
        final_shape: (usize, usize),
        summary: &CleaningSummary,
        config: &CleaningConfig,
    ) -> CleaningReport {
        CleaningReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.map(String::from),
            output_file: output_file.map(|p| p.display().to_string()),
            original_shape,
            final_shape,
            summary: summary.clone(),
            config: config.clone(),
        }
    }

    /// Write the cleaned dataset as CSV.
    pub fn write_dataset(&self, df: &mut DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)
            .map_err(PanelError::from)
            .context(format!("Creating {}", self.output_dir.display()))?;

        let output_path = self.dataset_path();
        let mut file = File::create(&output_path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .context(format!("Writing {}", output_path.display()))?;

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Write a report to a JSON file.
    ///
    /// The report is written to the output directory with the specified base name.
    /// For example, if `report_base_name` is "life_expectancy", the file will be
    /// "life_expectancy_report.json".
    pub fn write_report_to_file(
        &self,
        report: &CleaningReport,
        report_base_name: &str,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", report_base_name));
        let json = serde_json::to_string_pretty(report)?;
        let mut file = File::create(&report_path)?;
        file.write_all(json.as_bytes())?;

        if !report.summary.violations.is_empty() {
            warn!(
                "Report lists {} invariant violations",
                report.summary.violations.len()
            );
        }
        debug!("Report size: {} bytes", json.len());
        info!("Report saved: {}", report_path.display());

        Ok(report_path)
    }
}

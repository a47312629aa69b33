//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating the panel cleaning workflow.

use crate::cleaner::DataCleaner;
use crate::config::{CleaningConfig, ConfigValidationError};
use crate::error::{PanelError, Result};
use crate::frame::PanelFrame;
use crate::imputers::{LifeExpectancyInterpolator, StatusImputer};
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::quality::QualityAnalyzer;
use crate::reporting::ReportGenerator;
use crate::types::{
    ActionType, CleaningAction, CleaningResult, CleaningSummary, InvariantViolation, Record,
};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The main cleaning pipeline.
///
/// Runs deduplication, then status imputation, then life expectancy
/// interpolation, then checks the result. The order is fixed: imputation
/// must see one record per key.
///
/// # Example
///
/// ```rust,ignore
/// use lex_panel::{CleaningConfig, Pipeline};
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().save_to_disk(false).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// println!("{} duplicates removed", result.summary.duplicates_removed());
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cleaner: DataCleaner,
    status_imputer: StatusImputer,
    interpolator: LifeExpectancyInterpolator,
    reporter: ReportGenerator,
}

// Pipeline can be moved to and shared with a worker thread
static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean a table.
    ///
    /// Extracts records, cleans them, and applies them back onto the table.
    /// Writes the cleaned CSV (and report) when the config asks for it.
    pub fn process(&self, df: DataFrame) -> Result<CleaningResult> {
        let result = self.process_internal(df);
        self.finish(result)
    }

    /// Clean records directly, without a table.
    ///
    /// Nothing is written to disk.
    pub fn process_records(&self, records: Vec<Record>) -> Result<(Vec<Record>, CleaningSummary)> {
        let start_time = Instant::now();
        let result = self.clean_records(records).map(|(records, mut summary)| {
            summary.duration_ms = start_time.elapsed().as_millis() as u64;
            (records, summary)
        });
        self.finish(result)
    }

    fn finish<T>(&self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(value)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: DataFrame) -> Result<CleaningResult> {
        let start_time = Instant::now();
        let original_shape = df.shape();

        info!("Starting cleaning pipeline...");
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Starting cleaning pipeline...",
        ));

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            0.0,
            "Extracting records...",
        ));
        let frame = PanelFrame::from_dataframe(df, &self.config)?;
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            1.0,
            format!("Extracted {} records", frame.records().len()),
        ));

        let (records, mut summary) = self.clean_records(frame.records().to_vec())?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::ReportGeneration,
            0.0,
            "Materializing cleaned table...",
        ));
        info!("Step 5: Materializing cleaned table...");
        let mut data = frame.materialize(&records)?;

        let output_path = if self.config.save_to_disk {
            let path = self
                .reporter
                .write_dataset(&mut data)
                .map_err(|e| PanelError::ReportGenerationFailed(e.to_string()))?;
            Some(path)
        } else {
            debug!("Skipping dataset output (save_to_disk disabled)");
            None
        };

        summary.duration_ms = start_time.elapsed().as_millis() as u64;

        let report_path = if self.config.save_to_disk && self.config.generate_reports {
            let report = ReportGenerator::build_report(
                None,
                output_path.as_deref(),
                original_shape,
                data.shape(),
                &summary,
                &self.config,
            );
            let path = self
                .reporter
                .write_report_to_file(&report, &self.config.output_stem())
                .map_err(|e| PanelError::ReportGenerationFailed(e.to_string()))?;
            Some(path)
        } else {
            None
        };

        self.report_progress(ProgressUpdate::new(
            CleaningStage::ReportGeneration,
            1.0,
            "Outputs ready",
        ));

        Ok(CleaningResult {
            data,
            records,
            summary,
            output_path,
            report_path,
        })
    }

    fn clean_records(&self, records: Vec<Record>) -> Result<(Vec<Record>, CleaningSummary)> {
        if records.is_empty() {
            return Err(PanelError::EmptyDataset);
        }

        let mut summary = CleaningSummary::new();
        summary.rows_before = records.len();
        summary.missing_before = QualityAnalyzer::missing_summary(&records);

        // Step 1: Deduplication
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Deduplication,
            0.0,
            "Removing duplicate records...",
        ));
        info!("Step 1: Removing duplicate records...");

        let dedup = self.cleaner.deduplicate(records);
        if dedup.removed_count() > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate records", dedup.removed_count()),
            ));
        }
        summary.removed_records = dedup.removed;
        let records = dedup.records;

        self.report_progress(ProgressUpdate::with_items(
            CleaningStage::Deduplication,
            records.len(),
            summary.rows_before,
            format!("{} duplicate records removed", summary.duplicates_removed()),
        ));

        // Step 2: Status imputation
        let records = if self.config.fill_status {
            self.report_progress(ProgressUpdate::new(
                CleaningStage::StatusImputation,
                0.0,
                "Filling blank statuses...",
            ));
            info!("Step 2: Filling blank statuses...");

            let outcome = self.status_imputer.fill_missing_status(records)?;
            if outcome.filled > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::StatusFilled,
                    "status",
                    format!("Filled {} blank statuses", outcome.filled),
                ));
            }
            for conflict in &outcome.conflicts {
                let statuses: Vec<&str> = conflict.statuses.iter().map(|s| s.as_str()).collect();
                summary.add_action(
                    CleaningAction::new(
                        ActionType::StatusConflictFlagged,
                        &conflict.country,
                        format!("Rows of '{}' disagree on status", conflict.country),
                    )
                    .with_details(statuses.join(", ")),
                );
            }
            summary.statuses_filled = outcome.filled;
            summary.status_conflicts = outcome.conflicts;
            summary.unresolved.extend(outcome.unresolved);

            self.report_progress(ProgressUpdate::new(
                CleaningStage::StatusImputation,
                1.0,
                format!("{} statuses filled", summary.statuses_filled),
            ));
            outcome.records
        } else {
            info!("Step 2: Skipping status imputation (disabled)");
            summary.add_action(CleaningAction::new(
                ActionType::StepSkipped,
                "status",
                "Status imputation disabled",
            ));
            records
        };

        // Step 3: Interpolation
        let records = if self.config.interpolate_life_expectancy {
            self.report_progress(ProgressUpdate::new(
                CleaningStage::Interpolation,
                0.0,
                "Interpolating life expectancy...",
            ));
            info!("Step 3: Interpolating life expectancy...");

            let outcome = self.interpolator.interpolate(records)?;
            if outcome.filled > 0 {
                summary.add_action(CleaningAction::new(
                    ActionType::LifeExpectancyInterpolated,
                    "life_expectancy",
                    format!(
                        "Interpolated {} values from adjacent years (rounded half-up to {} decimals)",
                        outcome.filled, self.config.interpolation_decimals
                    ),
                ));
            }
            summary.life_expectancy_interpolated = outcome.filled;
            summary.unresolved.extend(outcome.unresolved);

            self.report_progress(ProgressUpdate::new(
                CleaningStage::Interpolation,
                1.0,
                format!(
                    "{} life expectancy values interpolated",
                    summary.life_expectancy_interpolated
                ),
            ));
            outcome.records
        } else {
            info!("Step 3: Skipping interpolation (disabled)");
            summary.add_action(CleaningAction::new(
                ActionType::StepSkipped,
                "life_expectancy",
                "Life expectancy interpolation disabled",
            ));
            records
        };

        // Step 4: Quality analysis
        self.report_progress(ProgressUpdate::new(
            CleaningStage::QualityAnalysis,
            0.0,
            "Checking cleaned records...",
        ));
        info!("Step 4: Checking cleaned records...");

        summary.rows_after = records.len();
        summary.missing_after = QualityAnalyzer::missing_summary(&records);
        let violations = QualityAnalyzer::check_invariants(&records);
        self.review_violations(&violations, &mut summary)?;
        summary.violations = violations;
        self.add_warnings(&mut summary);

        self.report_progress(ProgressUpdate::new(
            CleaningStage::QualityAnalysis,
            1.0,
            format!("{} invariant violations", summary.violations.len()),
        ));

        Ok((records, summary))
    }

    /// Fail on violations the enabled steps guarantee cannot happen.
    fn review_violations(
        &self,
        violations: &[InvariantViolation],
        summary: &mut CleaningSummary,
    ) -> Result<()> {
        let mut blank_status = 0;
        let mut interpolatable = 0;

        for violation in violations {
            match violation {
                InvariantViolation::DuplicateKey { .. } => {
                    return Err(PanelError::Internal(format!(
                        "deduplicated records still contain a repeated key: {}",
                        violation
                    )));
                }
                InvariantViolation::InterpolatableLifeExpectancy { .. }
                    if self.config.interpolate_life_expectancy =>
                {
                    return Err(PanelError::Internal(format!(
                        "interpolation left a fillable value blank: {}",
                        violation
                    )));
                }
                InvariantViolation::InterpolatableLifeExpectancy { .. } => interpolatable += 1,
                InvariantViolation::BlankStatus { .. } => blank_status += 1,
            }
        }

        if blank_status > 0 {
            warn!("{} records still have a blank status", blank_status);
            summary.add_warning(format!(
                "{} records have a blank status although their country has a known status",
                blank_status
            ));
        }
        if interpolatable > 0 {
            summary.add_warning(format!(
                "{} blank life expectancy values could be interpolated (interpolation disabled)",
                interpolatable
            ));
        }
        Ok(())
    }

    fn add_warnings(&self, summary: &mut CleaningSummary) {
        let blank_life = summary.unresolved_count("life_expectancy");
        if blank_life > 0 {
            warn!("{} life expectancy values left blank", blank_life);
            summary.add_warning(format!(
                "{} life expectancy values could not be interpolated",
                blank_life
            ));
        }

        let no_status = summary
            .unresolved
            .iter()
            .filter(|u| u.field == "status")
            .count();
        if no_status > 0 {
            summary.add_warning(format!("{} statuses could not be filled", no_status));
        }

        if !summary.status_conflicts.is_empty() {
            let countries: Vec<&str> = summary
                .status_conflicts
                .iter()
                .map(|c| c.country.as_str())
                .collect();
            summary.add_warning(format!(
                "Conflicting statuses in {} countries: {}",
                countries.len(),
                countries.join(", ")
            ));
        }

        if summary.rows_removed_percentage() > 30.0 {
            summary.add_warning(format!(
                "High duplicate rate: {:.1}% of rows were removed",
                summary.rows_removed_percentage()
            ));
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_panel::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            status_imputer: StatusImputer::new(config.status_conflict_policy),
            interpolator: LifeExpectancyInterpolator::new(config.interpolation_decimals),
            reporter: ReportGenerator::from_config(&config),
            cleaner: DataCleaner,
            progress_reporter: self.progress_reporter,
            config,
        })
    }
}

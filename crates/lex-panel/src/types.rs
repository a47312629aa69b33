use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Records
// ============================================================================

/// Development status of a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Status {
    Developing,
    Developed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Developing => "Developing",
            Self::Developed => "Developed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "developing" => Ok(Self::Developing),
            "developed" => Ok(Self::Developed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One observation of a country in a year.
///
/// Optional fields use `None` as the only missing-value sentinel; zeros and
/// blank cells are mapped to `None` while loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Arrival position of the row in the input table.
    pub row_id: usize,
    pub country: String,
    pub year: i32,
    pub status: Option<Status>,
    pub life_expectancy: Option<f64>,
    pub adult_mortality: Option<f64>,
    pub gdp: Option<f64>,
    pub bmi: Option<f64>,
}

impl Record {
    /// Create a record with only the key fields set.
    pub fn new(row_id: usize, country: impl Into<String>, year: i32) -> Self {
        Self {
            row_id,
            country: country.into(),
            year,
            status: None,
            life_expectancy: None,
            adult_mortality: None,
            gdp: None,
            bmi: None,
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_life_expectancy(mut self, value: f64) -> Self {
        self.life_expectancy = Some(value);
        self
    }

    /// The composite key of this record.
    pub fn key(&self) -> CountryYear {
        CountryYear::new(self.country.clone(), self.year)
    }
}

/// The `(country, year)` composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryYear {
    pub country: String,
    pub year: i32,
}

impl CountryYear {
    pub fn new(country: impl Into<String>, year: i32) -> Self {
        Self {
            country: country.into(),
            year,
        }
    }
}

impl fmt::Display for CountryYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.country, self.year)
    }
}

// ============================================================================
// Operation Outcomes
// ============================================================================

/// A record discarded by deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedRecord {
    pub row_id: usize,
    /// Row id of the record that was kept for the same key.
    pub kept_row_id: usize,
    pub key: CountryYear,
}

/// Result of [`DataCleaner::deduplicate`](crate::cleaner::DataCleaner::deduplicate).
#[derive(Debug, Clone, PartialEq)]
pub struct DedupOutcome {
    pub records: Vec<Record>,
    pub removed: Vec<RemovedRecord>,
}

impl DedupOutcome {
    /// Number of records discarded.
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// A country whose known statuses disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConflict {
    pub country: String,
    pub statuses: Vec<Status>,
}

/// Why a blank value could not be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No other record of the country has a status.
    NoKnownStatus,
    /// The country's statuses conflict and the policy leaves them blank.
    ConflictingStatus,
    /// No record for the previous year.
    NoPreviousYear,
    /// No record for the next year.
    NoNextYear,
    /// A neighboring year exists but its value is blank too.
    BlankNeighbor,
}

impl UnresolvedReason {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NoKnownStatus => "no known status for country",
            Self::ConflictingStatus => "conflicting statuses for country",
            Self::NoPreviousYear => "no previous year",
            Self::NoNextYear => "no next year",
            Self::BlankNeighbor => "neighboring year is blank",
        }
    }
}

/// A blank value left in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedValue {
    pub key: CountryYear,
    pub field: String,
    pub reason: UnresolvedReason,
}

/// Result of [`StatusImputer::fill_missing_status`](crate::imputers::StatusImputer::fill_missing_status).
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFillOutcome {
    pub records: Vec<Record>,
    pub filled: usize,
    pub unresolved: Vec<UnresolvedValue>,
    pub conflicts: Vec<StatusConflict>,
}

/// Result of [`LifeExpectancyInterpolator::interpolate`](crate::imputers::LifeExpectancyInterpolator::interpolate).
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationOutcome {
    pub records: Vec<Record>,
    pub filled: usize,
    pub unresolved: Vec<UnresolvedValue>,
}

// ============================================================================
// Cleaning Summary
// ============================================================================

/// Blank-value counts over a set of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingValueSummary {
    pub records: usize,
    pub countries: usize,
    /// Keys that occur more than once.
    pub duplicate_keys: usize,
    pub blank_status: usize,
    pub blank_life_expectancy: usize,
    pub blank_adult_mortality: usize,
    pub blank_gdp: usize,
    pub blank_bmi: usize,
    /// Fraction of non-blank optional cells (0.0 - 1.0).
    pub completeness: f32,
}

/// A post-cleaning invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvariantViolation {
    DuplicateKey { key: CountryYear, count: usize },
    BlankStatus { key: CountryYear },
    InterpolatableLifeExpectancy { key: CountryYear },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey { key, count } => write!(f, "{} occurs {} times", key, count),
            Self::BlankStatus { key } => write!(f, "{} has no status", key),
            Self::InterpolatableLifeExpectancy { key } => {
                write!(f, "{} has a blank life expectancy between two known years", key)
            }
        }
    }
}

/// Types of actions taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Duplicate records were removed.
    DuplicatesRemoved,
    /// Blank statuses were filled.
    StatusFilled,
    /// Blank life expectancy values were interpolated.
    LifeExpectancyInterpolated,
    /// A country's statuses were found to disagree.
    StatusConflictFlagged,
    /// A cleaning step was disabled by configuration.
    StepSkipped,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::StatusFilled => "Status Filled",
            Self::LifeExpectancyInterpolated => "Life Expectancy Interpolated",
            Self::StatusConflictFlagged => "Status Conflict Flagged",
            Self::StepSkipped => "Step Skipped",
        }
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Target of the action (field name, country or "dataset").
    pub target: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// What the cleaning pass did, for reports and UI display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,

    /// Records discarded by deduplication.
    pub removed_records: Vec<RemovedRecord>,

    pub statuses_filled: usize,
    pub status_conflicts: Vec<StatusConflict>,
    pub life_expectancy_interpolated: usize,

    /// Blanks left in place, with the reason.
    pub unresolved: Vec<UnresolvedValue>,

    pub missing_before: MissingValueSummary,
    pub missing_after: MissingValueSummary,

    /// Invariants that still do not hold after cleaning.
    pub violations: Vec<InvariantViolation>,

    pub actions: Vec<CleaningAction>,
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn duplicates_removed(&self) -> usize {
        self.removed_records.len()
    }

    /// Unresolved blanks for one field.
    pub fn unresolved_count(&self, field: &str) -> usize {
        self.unresolved.iter().filter(|u| u.field == field).count()
    }

    /// Percentage of rows removed by deduplication.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.duplicates_removed() as f32 / self.rows_before as f32) * 100.0
        }
    }

    /// Completeness improvement in percentage points.
    pub fn completeness_improvement(&self) -> f32 {
        (self.missing_after.completeness - self.missing_before.completeness) * 100.0
    }
}

/// Output of [`Pipeline::process`](crate::pipeline::Pipeline::process).
#[derive(Debug, Clone)]
pub struct CleaningResult {
    /// The cleaned table, with the source schema.
    pub data: DataFrame,
    /// The cleaned records, in source order.
    pub records: Vec<Record>,
    pub summary: CleaningSummary,
    /// Where the cleaned CSV was written, if saved.
    pub output_path: Option<PathBuf>,
    /// Where the JSON report was written, if generated.
    pub report_path: Option<PathBuf>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!("Developing".parse::<Status>(), Ok(Status::Developing));
        assert_eq!(" developed ".parse::<Status>(), Ok(Status::Developed));
        assert!("Emerging".parse::<Status>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Developing.to_string(), "Developing");
        assert_eq!(Status::Developed.to_string(), "Developed");
    }

    #[test]
    fn test_record_builder() {
        let record = Record::new(3, "Chad", 2004)
            .with_status(Status::Developing)
            .with_life_expectancy(48.9);
        assert_eq!(record.key(), CountryYear::new("Chad", 2004));
        assert_eq!(record.status, Some(Status::Developing));
        assert_eq!(record.life_expectancy, Some(48.9));
        assert_eq!(record.gdp, None);
    }

    #[test]
    fn test_summary_percentages() {
        let mut summary = CleaningSummary::new();
        summary.rows_before = 10;
        summary.removed_records = vec![RemovedRecord {
            row_id: 4,
            kept_row_id: 1,
            key: CountryYear::new("Z", 2005),
        }];
        summary.missing_before.completeness = 0.8;
        summary.missing_after.completeness = 0.9;

        assert_eq!(summary.duplicates_removed(), 1);
        assert!((summary.rows_removed_percentage() - 10.0).abs() < 0.01);
        assert!((summary.completeness_improvement() - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_invariant_violation_serialization() {
        let violation = InvariantViolation::BlankStatus {
            key: CountryYear::new("Y", 2000),
        };
        let json = serde_json::to_string(&violation).unwrap();
        assert!(json.contains("\"kind\":\"blank_status\""));
        assert!(json.contains("\"country\":\"Y\""));
    }

    #[test]
    fn test_action_types_serialize() {
        let json = serde_json::to_string(&ActionType::LifeExpectancyInterpolated).unwrap();
        assert_eq!(json, "\"life_expectancy_interpolated\"");
        assert_eq!(
            ActionType::DuplicatesRemoved.display_name(),
            "Duplicates Removed"
        );
    }

    #[test]
    fn test_unresolved_count() {
        let mut summary = CleaningSummary::new();
        summary.unresolved.push(UnresolvedValue {
            key: CountryYear::new("Y", 2000),
            field: "life_expectancy".to_string(),
            reason: UnresolvedReason::NoPreviousYear,
        });
        summary.unresolved.push(UnresolvedValue {
            key: CountryYear::new("Q", 2001),
            field: "status".to_string(),
            reason: UnresolvedReason::NoKnownStatus,
        });
        assert_eq!(summary.unresolved_count("life_expectancy"), 1);
        assert_eq!(summary.unresolved_count("status"), 1);
        assert_eq!(summary.unresolved_count("gdp"), 0);
    }
}

//! Configuration types for the panel cleaning pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use crate::utils::normalize_header;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Largest number of decimal places accepted for interpolated values.
pub const MAX_INTERPOLATION_DECIMALS: u32 = 10;

/// How a literal zero in a numeric measure is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ZeroPolicy {
    /// Zero means "not recorded" and loads as a blank
    #[default]
    Missing,
    /// Zero is a genuine observation
    Value,
}

/// Per-field zero handling for the numeric measures.
///
/// Blank cells are always missing. This only decides what a `0` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MissingValuePolicy {
    pub life_expectancy: ZeroPolicy,
    pub adult_mortality: ZeroPolicy,
    pub gdp: ZeroPolicy,
    pub bmi: ZeroPolicy,
}

impl MissingValuePolicy {
    /// Treat zero as a real value in every numeric measure.
    pub fn zeros_are_values() -> Self {
        Self {
            life_expectancy: ZeroPolicy::Value,
            adult_mortality: ZeroPolicy::Value,
            gdp: ZeroPolicy::Value,
            bmi: ZeroPolicy::Value,
        }
    }
}

/// What to do when a country's known statuses disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusConflictPolicy {
    /// Fill blanks with "Developing" (the conflict is still reported)
    #[default]
    PreferDeveloping,
    /// Leave that country's blank statuses unresolved
    LeaveBlank,
    /// Abort cleaning with a `StatusConflict` error
    Fail,
}

/// Header names of the logical columns in the input table.
///
/// Headers are compared after normalization (lower-cased, non-alphanumerics
/// removed), so `"Life expectancy "` matches `life_expectancy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub country: String,
    pub year: String,
    pub status: String,
    pub life_expectancy: String,
    pub adult_mortality: String,
    pub gdp: String,
    pub bmi: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            country: "country".to_string(),
            year: "year".to_string(),
            status: "status".to_string(),
            life_expectancy: "life_expectancy".to_string(),
            adult_mortality: "adult_mortality".to_string(),
            gdp: "gdp".to_string(),
            bmi: "bmi".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Logical field names paired with the configured header names.
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("country", self.country.as_str()),
            ("year", self.year.as_str()),
            ("status", self.status.as_str()),
            ("life_expectancy", self.life_expectancy.as_str()),
            ("adult_mortality", self.adult_mortality.as_str()),
            ("gdp", self.gdp.as_str()),
            ("bmi", self.bmi.as_str()),
        ]
    }
}

/// Configuration for the cleaning pipeline.
///
/// Use [`CleaningConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_panel::config::{CleaningConfig, StatusConflictPolicy};
///
/// let config = CleaningConfig::builder()
///     .status_conflict_policy(StatusConflictPolicy::Fail)
///     .interpolation_decimals(2)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Header names of the logical columns.
    pub columns: ColumnMapping,

    /// Zero handling for the numeric measures.
    /// Default: zero is missing everywhere
    pub missing_values: MissingValuePolicy,

    /// Resolution of countries whose rows disagree on status.
    /// Default: PreferDeveloping
    pub status_conflict_policy: StatusConflictPolicy,

    /// Whether to fill blank statuses from the country's other rows.
    /// Default: true
    pub fill_status: bool,

    /// Whether to interpolate blank life expectancy from adjacent years.
    /// Default: true
    pub interpolate_life_expectancy: bool,

    /// Decimal places kept on interpolated values (rounded half-up).
    /// Default: 1
    pub interpolation_decimals: u32,

    /// Output directory for the cleaned dataset and report.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, uses "cleaned_panel".
    /// Default: None
    pub output_name: Option<String>,

    /// Whether to write a JSON report next to the cleaned dataset.
    /// Default: true
    pub generate_reports: bool,

    /// Whether to save the cleaned data and report to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            missing_values: MissingValuePolicy::default(),
            status_conflict_policy: StatusConflictPolicy::default(),
            fill_status: true,
            interpolate_life_expectancy: true,
            interpolation_decimals: 1,
            output_dir: PathBuf::from("output"),
            output_name: None,
            generate_reports: true,
            save_to_disk: true,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration builder.
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.interpolation_decimals > MAX_INTERPOLATION_DECIMALS {
            return Err(ConfigValidationError::InvalidDecimals(
                self.interpolation_decimals,
            ));
        }

        let mut seen: HashMap<String, &'static str> = HashMap::new();
        for (field, header) in self.columns.fields() {
            let normalized = normalize_header(header);
            if normalized.is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
            }
            if let Some(previous) = seen.insert(normalized, field) {
                return Err(ConfigValidationError::DuplicateColumnName {
                    first: previous.to_string(),
                    second: field.to_string(),
                    header: header.to_string(),
                });
            }
        }

        if let Some(name) = &self.output_name
            && name.trim().is_empty()
        {
            return Err(ConfigValidationError::EmptyOutputName);
        }

        Ok(())
    }

    /// File stem of the cleaned dataset.
    pub fn output_stem(&self) -> String {
        self.output_name
            .clone()
            .unwrap_or_else(|| "cleaned_panel".to_string())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid interpolation decimals: {0} (must be at most 10)")]
    InvalidDecimals(u32),

    #[error("Column name for '{0}' is empty")]
    EmptyColumnName(String),

    #[error("Fields '{first}' and '{second}' both map to column '{header}'")]
    DuplicateColumnName {
        first: String,
        second: String,
        header: String,
    },

    #[error("Output name is empty")]
    EmptyOutputName,
}

/// Builder for [`CleaningConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    columns: Option<ColumnMapping>,
    country_column: Option<String>,
    year_column: Option<String>,
    status_column: Option<String>,
    life_expectancy_column: Option<String>,
    missing_values: Option<MissingValuePolicy>,
    status_conflict_policy: Option<StatusConflictPolicy>,
    fill_status: Option<bool>,
    interpolate_life_expectancy: Option<bool>,
    interpolation_decimals: Option<u32>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    generate_reports: Option<bool>,
    save_to_disk: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Replace the whole column mapping.
    ///
    /// Individual overrides such as [`country_column`](Self::country_column)
    /// are applied on top of it.
    pub fn columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Header of the country column.
    pub fn country_column(mut self, name: impl Into<String>) -> Self {
        self.country_column = Some(name.into());
        self
    }

    /// Header of the year column.
    pub fn year_column(mut self, name: impl Into<String>) -> Self {
        self.year_column = Some(name.into());
        self
    }

    /// Header of the status column.
    pub fn status_column(mut self, name: impl Into<String>) -> Self {
        self.status_column = Some(name.into());
        self
    }

    /// Header of the life expectancy column.
    pub fn life_expectancy_column(mut self, name: impl Into<String>) -> Self {
        self.life_expectancy_column = Some(name.into());
        self
    }

    /// Set the zero handling for numeric measures.
    pub fn missing_values(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_values = Some(policy);
        self
    }

    /// Set the resolution for conflicting statuses.
    pub fn status_conflict_policy(mut self, policy: StatusConflictPolicy) -> Self {
        self.status_conflict_policy = Some(policy);
        self
    }

    /// Enable or disable status filling.
    pub fn fill_status(mut self, enable: bool) -> Self {
        self.fill_status = Some(enable);
        self
    }

    /// Enable or disable life expectancy interpolation.
    pub fn interpolate_life_expectancy(mut self, enable: bool) -> Self {
        self.interpolate_life_expectancy = Some(enable);
        self
    }

    /// Set the decimal places kept on interpolated values.
    ///
    /// # Arguments
    /// * `decimals` - Between 0 and 10
    pub fn interpolation_decimals(mut self, decimals: u32) -> Self {
        self.interpolation_decimals = Some(decimals);
        self
    }

    /// Set the output directory for the cleaned data and report.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable report generation.
    pub fn generate_reports(mut self, generate: bool) -> Self {
        self.generate_reports = Some(generate);
        self
    }

    /// Enable or disable saving results to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `CleaningConfig` or an error if validation fails.
    pub fn build(self) -> Result<CleaningConfig, ConfigValidationError> {
        let mut columns = self.columns.unwrap_or_default();
        if let Some(name) = self.country_column {
            columns.country = name;
        }
        if let Some(name) = self.year_column {
            columns.year = name;
        }
        if let Some(name) = self.status_column {
            columns.status = name;
        }
        if let Some(name) = self.life_expectancy_column {
            columns.life_expectancy = name;
        }

        let config = CleaningConfig {
            columns,
            missing_values: self.missing_values.unwrap_or_default(),
            status_conflict_policy: self.status_conflict_policy.unwrap_or_default(),
            fill_status: self.fill_status.unwrap_or(true),
            interpolate_life_expectancy: self.interpolate_life_expectancy.unwrap_or(true),
            interpolation_decimals: self.interpolation_decimals.unwrap_or(1),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from("output")),
            output_name: self.output_name,
            generate_reports: self.generate_reports.unwrap_or(true),
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.interpolation_decimals, 1);
        assert_eq!(
            config.status_conflict_policy,
            StatusConflictPolicy::PreferDeveloping
        );
        assert_eq!(config.missing_values.gdp, ZeroPolicy::Missing);
        assert!(config.fill_status);
        assert!(config.interpolate_life_expectancy);
        assert_eq!(config.output_stem(), "cleaned_panel");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = CleaningConfig::builder()
            .status_conflict_policy(StatusConflictPolicy::LeaveBlank)
            .interpolation_decimals(2)
            .country_column("Country")
            .life_expectancy_column("Life expectancy ")
            .output_name("who_clean")
            .fill_status(false)
            .build()
            .unwrap();

        assert_eq!(
            config.status_conflict_policy,
            StatusConflictPolicy::LeaveBlank
        );
        assert_eq!(config.interpolation_decimals, 2);
        assert_eq!(config.columns.country, "Country");
        assert_eq!(config.columns.life_expectancy, "Life expectancy ");
        assert_eq!(config.columns.year, "year");
        assert_eq!(config.output_stem(), "who_clean");
        assert!(!config.fill_status);
    }

    #[test]
    fn test_validation_invalid_decimals() {
        let result = CleaningConfig::builder().interpolation_decimals(11).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidDecimals(11)
        ));
    }

    #[test]
    fn test_validation_duplicate_column() {
        let result = CleaningConfig::builder()
            .status_column("Country")
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateColumnName { .. }
        ));
    }

    #[test]
    fn test_validation_empty_column() {
        let result = CleaningConfig::builder().year_column("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyColumnName(field) if field == "year"
        ));
    }

    #[test]
    fn test_validation_empty_output_name() {
        let result = CleaningConfig::builder().output_name(" ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyOutputName
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "columns": {
                "country": "Country",
                "year": "Year",
                "status": "Status",
                "life_expectancy": "Lifeexpectancy",
                "adult_mortality": "AdultMortality",
                "gdp": "GDP",
                "bmi": "BMI"
            },
            "missing_values": {
                "life_expectancy": "Missing",
                "adult_mortality": "Value",
                "gdp": "Missing",
                "bmi": "Value"
            },
            "status_conflict_policy": "Fail",
            "fill_status": true,
            "interpolate_life_expectancy": false,
            "interpolation_decimals": 1,
            "output_dir": "custom_output",
            "output_name": null,
            "generate_reports": false,
            "save_to_disk": false
        }"#;

        let config: CleaningConfig =
            serde_json::from_str(json).expect("Should deserialize from JSON");

        assert_eq!(config.columns.life_expectancy, "Lifeexpectancy");
        assert_eq!(config.missing_values.adult_mortality, ZeroPolicy::Value);
        assert_eq!(config.missing_values.gdp, ZeroPolicy::Missing);
        assert_eq!(config.status_conflict_policy, StatusConflictPolicy::Fail);
        assert!(!config.interpolate_life_expectancy);
        assert_eq!(config.output_dir.to_str().unwrap(), "custom_output");
        assert!(config.validate().is_ok());
    }
}

//! Table I/O for panel datasets.
//!
//! Cleaning runs on typed [`Record`]s. This module moves data between a
//! polars `DataFrame` and those records:
//!
//! - [`load_csv`] reads the input file with a chain of fallbacks
//! - [`PanelFrame::from_dataframe`] resolves the logical columns and extracts records
//! - [`PanelFrame::materialize`] applies cleaned records back onto the source table,
//!   keeping every column the cleaner does not touch

use crate::config::{CleaningConfig, MissingValuePolicy, ZeroPolicy};
use crate::error::{PanelError, Result, ResultExt};
use crate::types::{Record, Status};
use crate::utils::{is_missing_marker, normalize_header, parse_numeric_string, parse_year};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// ============================================================================
// CSV Loading
// ============================================================================

/// Load a CSV file, retrying with looser settings when the first read fails.
///
/// 1. Standard read with `"` as the quote character
/// 2. Read without quote handling
/// 3. Read pre-cleaned content (collapsed doubled quotes, no blank lines)
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(None))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading without quotes failed: {}", e),
    }

    let content = std::fs::read_to_string(path)
        .map_err(PanelError::from)
        .context(format!("Could not read {}", path.display()))?;
    let cleaned = clean_csv_content(&content);

    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()
        .context(format!("Could not parse {} as CSV", path.display()))
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Column Resolution
// ============================================================================

/// Actual header names of the logical columns found in a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub country: String,
    pub year: String,
    pub status: String,
    pub life_expectancy: String,
    pub adult_mortality: Option<String>,
    pub gdp: Option<String>,
    pub bmi: Option<String>,
}

impl ResolvedColumns {
    /// Match the configured headers against the table's headers.
    ///
    /// When two table headers normalize to the same name the first one wins.
    pub fn resolve(df: &DataFrame, config: &CleaningConfig) -> Result<Self> {
        let mut by_normalized: HashMap<String, String> = HashMap::new();
        for name in df.get_column_names() {
            by_normalized
                .entry(normalize_header(name))
                .or_insert_with(|| name.to_string());
        }

        let find = |configured: &str| by_normalized.get(&normalize_header(configured)).cloned();
        let require = |configured: &str| {
            find(configured).ok_or_else(|| PanelError::ColumnNotFound(configured.to_string()))
        };

        let columns = &config.columns;
        Ok(Self {
            country: require(&columns.country)?,
            year: require(&columns.year)?,
            status: require(&columns.status)?,
            life_expectancy: require(&columns.life_expectancy)?,
            adult_mortality: find(&columns.adult_mortality),
            gdp: find(&columns.gdp),
            bmi: find(&columns.bmi),
        })
    }
}

// ============================================================================
// Panel Frame
// ============================================================================

/// A source table paired with the records extracted from it.
#[derive(Debug, Clone)]
pub struct PanelFrame {
    source: DataFrame,
    columns: ResolvedColumns,
    records: Vec<Record>,
}

impl PanelFrame {
    /// Extract records from a table.
    ///
    /// Each record's `row_id` is its zero-based row position. Blank cells
    /// and missing markers load as `None`; zeros in numeric measures load as
    /// `None` unless the field's [`ZeroPolicy`] is `Value`.
    ///
    /// # Errors
    ///
    /// - `EmptyDataset` if the table has no rows
    /// - `ColumnNotFound` if a required column is absent
    /// - `InvalidValue` for a blank country or year, an unknown status, or a
    ///   negative or non-numeric measure
    pub fn from_dataframe(df: DataFrame, config: &CleaningConfig) -> Result<Self> {
        if df.height() == 0 {
            return Err(PanelError::EmptyDataset);
        }

        let columns = ResolvedColumns::resolve(&df, config)?;
        debug!("Resolved columns: {:?}", columns);

        let countries = read_text_column(&df, &columns.country)?;
        let years = read_text_column(&df, &columns.year)?;
        let statuses = read_text_column(&df, &columns.status)?;
        let policy = config.missing_values;
        let life_expectancy = read_measure_column(
            &df,
            Some(&columns.life_expectancy),
            policy.life_expectancy,
        )?;
        let adult_mortality =
            read_measure_column(&df, columns.adult_mortality.as_deref(), policy.adult_mortality)?;
        let gdp = read_measure_column(&df, columns.gdp.as_deref(), policy.gdp)?;
        let bmi = read_measure_column(&df, columns.bmi.as_deref(), policy.bmi)?;

        let mut records = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let country = countries[row]
                .as_deref()
                .map(str::trim)
                .filter(|c| !is_missing_marker(c))
                .ok_or_else(|| invalid(&columns.country, row, &countries[row], "country is blank"))?;

            let year = years[row]
                .as_deref()
                .and_then(parse_year)
                .ok_or_else(|| invalid(&columns.year, row, &years[row], "expected an integer year"))?;

            let status = match statuses[row].as_deref() {
                Some(s) if !is_missing_marker(s) => Some(
                    s.parse::<Status>()
                        .map_err(|reason| invalid(&columns.status, row, &statuses[row], &reason))?,
                ),
                _ => None,
            };

            records.push(Record {
                row_id: row,
                country: country.to_string(),
                year,
                status,
                life_expectancy: measure_value(&life_expectancy, row, &columns.life_expectancy)?,
                adult_mortality: optional_measure_value(&adult_mortality, row, &columns.adult_mortality)?,
                gdp: optional_measure_value(&gdp, row, &columns.gdp)?,
                bmi: optional_measure_value(&bmi, row, &columns.bmi)?,
            });
        }

        info!(
            "Extracted {} records ({} columns in source)",
            records.len(),
            df.width()
        );

        Ok(Self {
            source: df,
            columns,
            records,
        })
    }

    /// Records in arrival order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Apply cleaned records to the source table.
    ///
    /// Rows whose `row_id` is not among `records` are dropped. The status and
    /// life expectancy columns are rewritten from the records; every other
    /// column passes through unchanged. Surviving rows keep their source order.
    pub fn materialize(&self, records: &[Record]) -> Result<DataFrame> {
        let height = self.source.height();
        let mut ordered: Vec<&Record> = records.iter().collect();
        ordered.sort_by_key(|r| r.row_id);

        let mut seen = HashSet::with_capacity(ordered.len());
        for record in &ordered {
            if record.row_id >= height || !seen.insert(record.row_id) {
                return Err(PanelError::Internal(format!(
                    "record row_id {} does not map to a unique source row",
                    record.row_id
                )));
            }
        }

        let mask: Vec<bool> = (0..height).map(|row| seen.contains(&row)).collect();
        let mask = BooleanChunked::from_slice("keep".into(), &mask);
        let mut df = self
            .source
            .filter(&mask)
            .context("Failed to filter surviving rows")?;

        let status_values: Vec<Option<&str>> = ordered
            .iter()
            .map(|r| r.status.map(|s| s.as_str()))
            .collect();
        let status_series = Series::new(self.columns.status.as_str().into(), status_values);
        df.replace(&self.columns.status, status_series)
            .context("Failed to write status column")?;

        let life_values: Vec<Option<f64>> = ordered.iter().map(|r| r.life_expectancy).collect();
        let life_series = Series::new(self.columns.life_expectancy.as_str().into(), life_values);
        df.replace(&self.columns.life_expectancy, life_series)
            .context("Failed to write life expectancy column")?;

        if df.height() < height {
            debug!("Materialized {} of {} source rows", df.height(), height);
        }

        Ok(df)
    }
}

// ============================================================================
// Cell Parsing
// ============================================================================

fn read_text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)?
        .cast(&DataType::String)
        .context(format!("Column '{}' cannot be read as text", name))?;
    let values = column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

fn read_measure_column(
    df: &DataFrame,
    name: Option<&str>,
    zero_policy: ZeroPolicy,
) -> Result<Option<Vec<Option<f64>>>> {
    let Some(name) = name else {
        return Ok(None);
    };

    let cells = read_text_column(df, name)?;
    let mut values = Vec::with_capacity(cells.len());
    for (row, cell) in cells.iter().enumerate() {
        let value = match cell.as_deref() {
            None => None,
            Some(text) if is_missing_marker(text) => None,
            Some(text) => {
                let number = parse_numeric_string(text)
                    .ok_or_else(|| invalid(name, row, cell, "expected a number"))?;
                if number < 0.0 {
                    return Err(invalid(name, row, cell, "negative values are not allowed"));
                }
                if number == 0.0 && zero_policy == ZeroPolicy::Missing {
                    None
                } else {
                    Some(number)
                }
            }
        };
        values.push(value);
    }
    Ok(Some(values))
}

fn measure_value(values: &Option<Vec<Option<f64>>>, row: usize, column: &str) -> Result<Option<f64>> {
    match values {
        Some(values) => Ok(values[row]),
        None => Err(PanelError::ColumnNotFound(column.to_string())),
    }
}

fn optional_measure_value(
    values: &Option<Vec<Option<f64>>>,
    row: usize,
    column: &Option<String>,
) -> Result<Option<f64>> {
    match (values, column) {
        (Some(values), Some(_)) => Ok(values[row]),
        _ => Ok(None),
    }
}

fn invalid(column: &str, row: usize, value: &Option<String>, reason: &str) -> PanelError {
    PanelError::InvalidValue {
        column: column.to_string(),
        row,
        value: value.clone().unwrap_or_default(),
        reason: reason.to_string(),
    }
}

/// Count zero cells in the numeric measures that will load as blanks.
///
/// Used by the dry run to show what the zero policy does to a file.
pub fn count_zero_blanks(df: &DataFrame, config: &CleaningConfig) -> Result<HashMap<String, usize>> {
    let columns = ResolvedColumns::resolve(df, config)?;
    let MissingValuePolicy {
        life_expectancy,
        adult_mortality,
        gdp,
        bmi,
    } = config.missing_values;

    let mut counts = HashMap::new();
    let fields = [
        (Some(columns.life_expectancy.clone()), life_expectancy),
        (columns.adult_mortality.clone(), adult_mortality),
        (columns.gdp.clone(), gdp),
        (columns.bmi.clone(), bmi),
    ];
    for (name, policy) in fields {
        let Some(name) = name else { continue };
        if policy == ZeroPolicy::Value {
            continue;
        }
        let zeros = read_text_column(df, &name)?
            .iter()
            .filter(|cell| {
                cell.as_deref()
                    .and_then(parse_numeric_string)
                    .is_some_and(|v| v == 0.0)
            })
            .count();
        if zeros > 0 {
            warn!("Column '{}' has {} zero values that load as blank", name, zeros);
        }
        counts.insert(name, zeros);
    }
    Ok(counts)
}

// ============================================================================
// Tests
// ============================================================================

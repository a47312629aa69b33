//! Quality analysis of panel records.
//!
//! Blank-value summaries taken before and after cleaning, and the checks a
//! cleaned panel must pass.

use crate::types::{CountryYear, InvariantViolation, MissingValueSummary, Record, Status};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Analyzer for blank values and cleaned-panel invariants.
pub struct QualityAnalyzer;

impl QualityAnalyzer {
    /// Count blank values per field.
    ///
    /// Completeness covers status and life expectancy, plus each other
    /// measure that has at least one value (a measure that is blank
    /// everywhere is most likely an absent column).
    pub fn missing_summary(records: &[Record]) -> MissingValueSummary {
        let blank = |f: fn(&Record) -> bool| records.iter().filter(|r| f(r)).count();

        let blank_status = blank(|r| r.status.is_none());
        let blank_life_expectancy = blank(|r| r.life_expectancy.is_none());
        let blank_adult_mortality = blank(|r| r.adult_mortality.is_none());
        let blank_gdp = blank(|r| r.gdp.is_none());
        let blank_bmi = blank(|r| r.bmi.is_none());

        let mut tracked = vec![blank_status, blank_life_expectancy];
        for blanks in [blank_adult_mortality, blank_gdp, blank_bmi] {
            if blanks < records.len() {
                tracked.push(blanks);
            }
        }
        let total_cells = tracked.len() * records.len();
        let blank_cells: usize = tracked.iter().sum();
        let completeness = if total_cells == 0 {
            1.0
        } else {
            1.0 - (blank_cells as f32 / total_cells as f32)
        };

        let countries: HashSet<&str> = records.iter().map(|r| r.country.as_str()).collect();

        MissingValueSummary {
            records: records.len(),
            countries: countries.len(),
            duplicate_keys: Self::key_counts(records)
                .values()
                .filter(|&&count| count > 1)
                .count(),
            blank_status,
            blank_life_expectancy,
            blank_adult_mortality,
            blank_gdp,
            blank_bmi,
            completeness,
        }
    }

    /// Check the cleaned-panel invariants.
    ///
    /// - every key occurs once
    /// - no blank status in a country with exactly one known status (a
    ///   country whose statuses disagree may keep blanks by policy)
    /// - no blank life expectancy with known values in both adjacent years
    ///
    /// Violations are sorted by key for stable reports.
    pub fn check_invariants(records: &[Record]) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let counts = Self::key_counts(records);
        let mut duplicates: Vec<(&CountryYear, &usize)> =
            counts.iter().filter(|&(_, &count)| count > 1).collect();
        duplicates.sort();
        violations.extend(duplicates.into_iter().map(|(key, &count)| {
            InvariantViolation::DuplicateKey {
                key: key.clone(),
                count,
            }
        }));

        let mut statuses: HashMap<&str, BTreeSet<Status>> = HashMap::new();
        for record in records {
            if let Some(status) = record.status {
                statuses
                    .entry(record.country.as_str())
                    .or_default()
                    .insert(status);
            }
        }
        let single_status = |country: &str| statuses.get(country).is_some_and(|s| s.len() == 1);

        let mut life: HashMap<CountryYear, Option<f64>> = HashMap::with_capacity(records.len());
        for record in records {
            life.entry(record.key()).or_insert(record.life_expectancy);
        }
        let known = |country: &str, year: Option<i32>| {
            year.and_then(|y| life.get(&CountryYear::new(country, y)).copied().flatten())
                .is_some()
        };

        let mut blanks = Vec::new();
        for record in records {
            if record.status.is_none() && single_status(&record.country) {
                blanks.push(InvariantViolation::BlankStatus { key: record.key() });
            }
            if record.life_expectancy.is_none()
                && known(&record.country, record.year.checked_sub(1))
                && known(&record.country, record.year.checked_add(1))
            {
                blanks.push(InvariantViolation::InterpolatableLifeExpectancy { key: record.key() });
            }
        }
        blanks.sort_by(|a, b| violation_key(a).cmp(violation_key(b)));
        violations.extend(blanks);

        violations
    }

    fn key_counts(records: &[Record]) -> HashMap<CountryYear, usize> {
        let mut counts = HashMap::with_capacity(records.len());
        for record in records {
            *counts.entry(record.key()).or_insert(0) += 1;
        }
        counts
    }
}

fn violation_key(violation: &InvariantViolation) -> &CountryYear {
    match violation {
        InvariantViolation::DuplicateKey { key, .. }
        | InvariantViolation::BlankStatus { key }
        | InvariantViolation::InterpolatableLifeExpectancy { key } => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use pretty_assertions::assert_eq;

    fn record(row_id: usize, country: &str, year: i32) -> Record {
        Record::new(row_id, country, year)
    }

    #[test]
    fn test_missing_summary_counts() {
        let mut a = record(0, "A", 2000).with_status(Status::Developed);
        a.gdp = Some(100.0);
        let b = record(1, "A", 2001).with_life_expectancy(70.0);
        let c = record(2, "B", 2000)
            .with_status(Status::Developing)
            .with_life_expectancy(60.0);
        let d = record(3, "B", 2000);

        let summary = QualityAnalyzer::missing_summary(&[a, b, c, d]);

        assert_eq!(summary.records, 4);
        assert_eq!(summary.countries, 2);
        assert_eq!(summary.duplicate_keys, 1);
        assert_eq!(summary.blank_status, 2);
        assert_eq!(summary.blank_life_expectancy, 2);
        assert_eq!(summary.blank_gdp, 3);
        assert_eq!(summary.blank_bmi, 4);
        // status, life expectancy and gdp are tracked: 7 blanks out of 12 cells
        assert!((summary.completeness - 5.0 / 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_summary_empty() {
        let summary = QualityAnalyzer::missing_summary(&[]);
        assert_eq!(summary.records, 0);
        assert_eq!(summary.completeness, 1.0);
    }

    #[test]
    fn test_clean_panel_has_no_violations() {
        let records = vec![
            record(0, "A", 2000)
                .with_status(Status::Developed)
                .with_life_expectancy(80.0),
            record(1, "A", 2001).with_status(Status::Developed),
            record(2, "Q", 2000),
        ];
        assert!(QualityAnalyzer::check_invariants(&records).is_empty());
    }

    #[test]
    fn test_conflicting_country_blanks_are_exempt() {
        let records = vec![
            record(0, "A", 2000).with_status(Status::Developed),
            record(1, "A", 2001).with_status(Status::Developing),
            record(2, "A", 2002),
            record(3, "B", 2000).with_status(Status::Developing),
            record(4, "B", 2001),
        ];

        let violations = QualityAnalyzer::check_invariants(&records);

        assert_eq!(
            violations,
            vec![InvariantViolation::BlankStatus {
                key: CountryYear::new("B", 2001),
            }]
        );
    }

    #[test]
    fn test_detects_each_violation() {
        let records = vec![
            record(0, "A", 2000)
                .with_status(Status::Developed)
                .with_life_expectancy(70.0),
            record(1, "A", 2001),
            record(2, "A", 2002).with_life_expectancy(72.0),
            record(3, "A", 2002).with_life_expectancy(73.0),
        ];

        let violations = QualityAnalyzer::check_invariants(&records);

        assert_eq!(
            violations,
            vec![
                InvariantViolation::DuplicateKey {
                    key: CountryYear::new("A", 2002),
                    count: 2,
                },
                InvariantViolation::BlankStatus {
                    key: CountryYear::new("A", 2001),
                },
                InvariantViolation::InterpolatableLifeExpectancy {
                    key: CountryYear::new("A", 2001),
                },
                InvariantViolation::BlankStatus {
                    key: CountryYear::new("A", 2002),
                },
                InvariantViolation::BlankStatus {
                    key: CountryYear::new("A", 2002),
                },
            ]
        );
    }
}

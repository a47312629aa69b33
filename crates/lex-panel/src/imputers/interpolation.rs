//! Life expectancy interpolation from adjacent years.

use crate::error::Result;
use crate::types::{CountryYear, InterpolationOutcome, Record, UnresolvedReason, UnresolvedValue};
use crate::utils::midpoint_half_up;
use std::collections::HashMap;
use tracing::{debug, info};

/// Fills a blank life expectancy with the mean of the year before and the
/// year after, rounded half-up.
///
/// Only single gaps are filled: there is no multi-hop interpolation and no
/// extrapolation past the first or last observed year.
#[derive(Debug, Clone, Copy)]
pub struct LifeExpectancyInterpolator {
    decimals: u32,
}

impl Default for LifeExpectancyInterpolator {
    fn default() -> Self {
        Self { decimals: 1 }
    }
}

impl LifeExpectancyInterpolator {
    pub fn new(decimals: u32) -> Self {
        Self { decimals }
    }

    /// Interpolate blank life expectancy values.
    ///
    /// Neighbor values come from a snapshot taken before any fill, so a value
    /// produced here never feeds another fill in the same pass. With repeated
    /// keys the first record of the key is used as the neighbor.
    pub fn interpolate(&self, records: Vec<Record>) -> Result<InterpolationOutcome> {
        let mut snapshot: HashMap<CountryYear, Option<f64>> = HashMap::with_capacity(records.len());
        for record in &records {
            snapshot.entry(record.key()).or_insert(record.life_expectancy);
        }

        let mut records = records;
        let mut filled = 0;
        let mut unresolved = Vec::new();

        for record in records.iter_mut().filter(|r| r.life_expectancy.is_none()) {
            let previous = neighbor(&snapshot, &record.country, record.year.checked_sub(1));
            let next = neighbor(&snapshot, &record.country, record.year.checked_add(1));

            let reason = match (previous, next) {
                (Some(Some(before)), Some(Some(after))) => {
                    let value = midpoint_half_up(before, after, self.decimals);
                    debug!(
                        "Interpolated life expectancy of {}: ({} + {}) / 2 = {}",
                        record.key(),
                        before,
                        after,
                        value
                    );
                    record.life_expectancy = Some(value);
                    filled += 1;
                    continue;
                }
                (None, _) => UnresolvedReason::NoPreviousYear,
                (_, None) => UnresolvedReason::NoNextYear,
                _ => UnresolvedReason::BlankNeighbor,
            };

            debug!(
                "Life expectancy of {} left blank: {}",
                record.key(),
                reason.display_name()
            );
            unresolved.push(UnresolvedValue {
                key: record.key(),
                field: "life_expectancy".to_string(),
                reason,
            });
        }

        info!(
            "Interpolated {} blank life expectancy values ({} left blank)",
            filled,
            unresolved.len()
        );

        Ok(InterpolationOutcome {
            records,
            filled,
            unresolved,
        })
    }
}

/// Snapshot lookup: `None` if the year has no record, `Some(None)` if its
/// value is blank.
fn neighbor(
    snapshot: &HashMap<CountryYear, Option<f64>>,
    country: &str,
    year: Option<i32>,
) -> Option<Option<f64>> {
    let year = year?;
    snapshot.get(&CountryYear::new(country, year)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn record(row_id: usize, country: &str, year: i32, life: Option<f64>) -> Record {
        let mut record = Record::new(row_id, country, year);
        record.life_expectancy = life;
        record
    }

    fn values(outcome: &InterpolationOutcome) -> Vec<Option<f64>> {
        outcome.records.iter().map(|r| r.life_expectancy).collect()
    }

    #[test]
    fn test_interpolates_single_gap() {
        let records = vec![
            record(0, "Y", 1999, Some(70.0)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, Some(72.0)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();

        assert_eq!(values(&outcome), vec![Some(70.0), Some(71.0), Some(72.0)]);
        assert_eq!(outcome.filled, 1);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_midpoint_rounds_half_up() {
        let records = vec![
            record(0, "Y", 1999, Some(70.0)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, Some(70.1)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();
        assert_eq!(outcome.records[1].life_expectancy, Some(70.1));

        let records = vec![
            record(0, "Y", 1999, Some(70.0)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, Some(70.1)),
        ];
        let outcome = LifeExpectancyInterpolator::new(2)
            .interpolate(records)
            .unwrap();
        assert_eq!(outcome.records[1].life_expectancy, Some(70.05));
    }

    #[test]
    fn test_values_beyond_decimal_range_still_fill() {
        let records = vec![
            record(0, "Y", 1999, Some(5e28)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, Some(5e28)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();

        assert_eq!(outcome.records[1].life_expectancy, Some(5e28));
        assert_eq!(outcome.filled, 1);
    }

    #[test]
    fn test_boundary_years_stay_blank() {
        let records = vec![
            record(0, "Y", 1999, None),
            record(1, "Y", 2000, Some(65.0)),
            record(2, "Y", 2001, None),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();

        assert_eq!(values(&outcome), vec![None, Some(65.0), None]);
        let reasons: Vec<UnresolvedReason> = outcome.unresolved.iter().map(|u| u.reason).collect();
        assert_eq!(
            reasons,
            vec![UnresolvedReason::NoPreviousYear, UnresolvedReason::NoNextYear]
        );
    }

    #[test]
    fn test_no_cascade_across_consecutive_gaps() {
        let records = vec![
            record(0, "Y", 1999, Some(70.0)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, None),
            record(3, "Y", 2002, Some(74.0)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();

        assert_eq!(values(&outcome), vec![Some(70.0), None, None, Some(74.0)]);
        assert!(
            outcome
                .unresolved
                .iter()
                .all(|u| u.reason == UnresolvedReason::BlankNeighbor)
        );
    }

    #[test]
    fn test_neighbors_are_per_country() {
        let records = vec![
            record(0, "A", 1999, Some(60.0)),
            record(1, "B", 2000, None),
            record(2, "A", 2001, Some(62.0)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();
        assert_eq!(outcome.records[1].life_expectancy, None);
    }

    #[test]
    fn test_year_gap_is_not_bridged() {
        let records = vec![
            record(0, "Y", 1998, Some(70.0)),
            record(1, "Y", 2000, None),
            record(2, "Y", 2001, Some(72.0)),
        ];

        let outcome = LifeExpectancyInterpolator::default()
            .interpolate(records)
            .unwrap();
        assert_eq!(outcome.records[1].life_expectancy, None);
        assert_eq!(outcome.unresolved[0].reason, UnresolvedReason::NoPreviousYear);
    }

    #[test]
    fn test_known_values_never_change() {
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..30 {
            let records: Vec<Record> = (0..20)
                .map(|i| {
                    let life = if rng.gen_bool(0.3) {
                        None
                    } else {
                        Some(rng.gen_range(400..800) as f64 / 10.0)
                    };
                    record(i, "R", 1990 + i as i32, life)
                })
                .collect();

            let outcome = LifeExpectancyInterpolator::default()
                .interpolate(records.clone())
                .unwrap();

            for (before, after) in records.iter().zip(&outcome.records) {
                if before.life_expectancy.is_some() {
                    assert_eq!(before.life_expectancy, after.life_expectancy);
                }
            }

            // every blank left behind has no two known neighbors
            for (i, after) in outcome.records.iter().enumerate() {
                if after.life_expectancy.is_none() && i > 0 && i + 1 < records.len() {
                    assert!(
                        records[i - 1].life_expectancy.is_none()
                            || records[i + 1].life_expectancy.is_none()
                    );
                }
            }
            assert_eq!(
                outcome.filled + outcome.unresolved.len(),
                records.iter().filter(|r| r.life_expectancy.is_none()).count()
            );
        }
    }
}

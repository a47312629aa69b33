//! Status imputation.
//!
//! A country's development status rarely changes within a panel, so a blank
//! status is filled from the statuses observed in the country's other rows.

use crate::config::StatusConflictPolicy;
use crate::error::{PanelError, Result};
use crate::types::{
    Record, Status, StatusConflict, StatusFillOutcome, UnresolvedReason, UnresolvedValue,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Fills blank statuses from the other records of the same country.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusImputer {
    policy: StatusConflictPolicy,
}

impl StatusImputer {
    pub fn new(policy: StatusConflictPolicy) -> Self {
        Self { policy }
    }

    /// Fill every blank status whose country has a known status.
    ///
    /// "Developing" wins over "Developed" when a country's rows disagree,
    /// unless the conflict policy says otherwise. Every disagreeing country is
    /// returned in `conflicts` whatever the policy. Records that already have
    /// a status are never changed.
    ///
    /// # Errors
    ///
    /// Returns `StatusConflict` for the first conflicting country (by name)
    /// when the policy is [`StatusConflictPolicy::Fail`].
    pub fn fill_missing_status(&self, records: Vec<Record>) -> Result<StatusFillOutcome> {
        let known = Self::known_statuses(&records);

        let conflicts: Vec<StatusConflict> = known
            .iter()
            .filter(|(_, statuses)| statuses.len() > 1)
            .map(|(country, statuses)| StatusConflict {
                country: country.clone(),
                statuses: statuses.iter().copied().collect(),
            })
            .collect();

        for conflict in &conflicts {
            warn!(
                "Country '{}' has conflicting statuses: {:?}",
                conflict.country, conflict.statuses
            );
        }

        if self.policy == StatusConflictPolicy::Fail
            && let Some(conflict) = conflicts.first()
        {
            return Err(PanelError::StatusConflict {
                country: conflict.country.clone(),
                statuses: conflict.statuses.iter().map(|s| s.to_string()).collect(),
            });
        }

        let mut records = records;
        let mut filled = 0;
        let mut unresolved = Vec::new();

        for record in records.iter_mut().filter(|r| r.status.is_none()) {
            let resolved = match known.get(record.country.as_str()) {
                None => Err(UnresolvedReason::NoKnownStatus),
                Some(statuses)
                    if statuses.len() > 1 && self.policy == StatusConflictPolicy::LeaveBlank =>
                {
                    Err(UnresolvedReason::ConflictingStatus)
                }
                Some(statuses) if statuses.contains(&Status::Developing) => Ok(Status::Developing),
                Some(_) => Ok(Status::Developed),
            };

            match resolved {
                Ok(status) => {
                    debug!("Filled status of {} with {}", record.key(), status);
                    record.status = Some(status);
                    filled += 1;
                }
                Err(reason) => {
                    debug!(
                        "Status of {} left blank: {}",
                        record.key(),
                        reason.display_name()
                    );
                    unresolved.push(UnresolvedValue {
                        key: record.key(),
                        field: "status".to_string(),
                        reason,
                    });
                }
            }
        }

        info!(
            "Filled {} blank statuses ({} left blank, {} conflicting countries)",
            filled,
            unresolved.len(),
            conflicts.len()
        );

        Ok(StatusFillOutcome {
            records,
            filled,
            unresolved,
            conflicts,
        })
    }

    /// Statuses observed per country, built once for the whole pass.
    fn known_statuses(records: &[Record]) -> BTreeMap<String, BTreeSet<Status>> {
        let mut known: BTreeMap<String, BTreeSet<Status>> = BTreeMap::new();
        for record in records {
            if let Some(status) = record.status {
                known
                    .entry(record.country.clone())
                    .or_default()
                    .insert(status);
            }
        }
        known
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(row_id: usize, country: &str, year: i32, status: Option<Status>) -> Record {
        let mut record = Record::new(row_id, country, year);
        record.status = status;
        record
    }

    #[test]
    fn test_fill_from_other_year() {
        let records = vec![
            record(0, "X", 2000, None),
            record(1, "X", 2001, Some(Status::Developed)),
        ];

        let outcome = StatusImputer::default().fill_missing_status(records).unwrap();

        assert_eq!(outcome.records[0].status, Some(Status::Developed));
        assert_eq!(outcome.records[1].status, Some(Status::Developed));
        assert_eq!(outcome.filled, 1);
        assert!(outcome.unresolved.is_empty());
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn test_developing_preferred_on_conflict() {
        let records = vec![
            record(0, "X", 2000, Some(Status::Developed)),
            record(1, "X", 2001, None),
            record(2, "X", 2002, Some(Status::Developing)),
        ];

        let outcome = StatusImputer::default().fill_missing_status(records).unwrap();

        assert_eq!(outcome.records[1].status, Some(Status::Developing));
        // resolved fields are untouched
        assert_eq!(outcome.records[0].status, Some(Status::Developed));
        assert_eq!(
            outcome.conflicts,
            vec![StatusConflict {
                country: "X".to_string(),
                statuses: vec![Status::Developing, Status::Developed],
            }]
        );
    }

    #[test]
    fn test_no_known_status_stays_blank() {
        let records = vec![record(0, "Q", 2000, None), record(1, "Q", 2001, None)];

        let outcome = StatusImputer::default().fill_missing_status(records).unwrap();

        assert_eq!(outcome.filled, 0);
        assert!(outcome.records.iter().all(|r| r.status.is_none()));
        assert_eq!(outcome.unresolved.len(), 2);
        assert_eq!(outcome.unresolved[0].reason, UnresolvedReason::NoKnownStatus);
    }

    #[test]
    fn test_leave_blank_policy() {
        let records = vec![
            record(0, "X", 2000, Some(Status::Developed)),
            record(1, "X", 2001, None),
            record(2, "X", 2002, Some(Status::Developing)),
            record(3, "Y", 2000, None),
            record(4, "Y", 2001, Some(Status::Developed)),
        ];

        let outcome = StatusImputer::new(StatusConflictPolicy::LeaveBlank)
            .fill_missing_status(records)
            .unwrap();

        assert_eq!(outcome.records[1].status, None);
        assert_eq!(outcome.records[3].status, Some(Status::Developed));
        assert_eq!(outcome.unresolved.len(), 1);
        assert_eq!(
            outcome.unresolved[0].reason,
            UnresolvedReason::ConflictingStatus
        );
        assert_eq!(outcome.conflicts.len(), 1);
    }

    #[test]
    fn test_fail_policy() {
        let records = vec![
            record(0, "X", 2000, Some(Status::Developed)),
            record(1, "X", 2001, Some(Status::Developing)),
        ];

        let err = StatusImputer::new(StatusConflictPolicy::Fail)
            .fill_missing_status(records)
            .unwrap_err();

        assert_eq!(err.error_code(), "STATUS_CONFLICT");
        assert!(err.to_string().contains("'X'"));
    }

    #[test]
    fn test_fail_policy_without_conflicts() {
        let records = vec![
            record(0, "X", 2000, Some(Status::Developed)),
            record(1, "X", 2001, None),
        ];

        let outcome = StatusImputer::new(StatusConflictPolicy::Fail)
            .fill_missing_status(records)
            .unwrap();
        assert_eq!(outcome.records[1].status, Some(Status::Developed));
    }

    #[test]
    fn test_countries_do_not_leak() {
        let records = vec![
            record(0, "A", 2000, Some(Status::Developing)),
            record(1, "B", 2000, None),
        ];

        let outcome = StatusImputer::default().fill_missing_status(records).unwrap();
        assert_eq!(outcome.records[1].status, None);
    }
}

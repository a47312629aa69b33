//! Record deduplication.
//!
//! A panel holds one intended observation per `(country, year)`. Rows that
//! repeat a key are discarded, keeping the first row seen for it.

use crate::types::{CountryYear, DedupOutcome, Record, RemovedRecord};
use std::collections::HashMap;
use tracing::{debug, info};

/// Data cleaner for structural cleaning of panel records.
pub struct DataCleaner;

impl DataCleaner {
    /// Remove records that repeat a `(country, year)` key.
    ///
    /// The canonical record of each key is the one with the lowest arrival
    /// position, so the result does not depend on anything but input order.
    /// Surviving records keep their relative order and are otherwise
    /// untouched, which makes the operation idempotent.
    pub fn deduplicate(&self, records: Vec<Record>) -> DedupOutcome {
        let total = records.len();
        let mut kept_by_key: HashMap<CountryYear, usize> = HashMap::with_capacity(total);
        let mut kept = Vec::with_capacity(total);
        let mut removed = Vec::new();

        for record in records {
            let key = record.key();
            match kept_by_key.get(&key) {
                Some(&kept_row_id) => {
                    debug!(
                        "Discarding row {} (duplicate of row {} for {})",
                        record.row_id, kept_row_id, key
                    );
                    removed.push(RemovedRecord {
                        row_id: record.row_id,
                        kept_row_id,
                        key,
                    });
                }
                None => {
                    kept_by_key.insert(key, record.row_id);
                    kept.push(record);
                }
            }
        }

        if removed.is_empty() {
            debug!("No duplicate records found");
        } else {
            let pct = (removed.len() as f64 / total as f64) * 100.0;
            info!(
                "Removed {} duplicate records ({:.1}%), {} remain",
                removed.len(),
                pct,
                kept.len()
            );
        }

        DedupOutcome {
            records: kept,
            removed,
        }
    }
}

//! Concatenation, deduplication and ordering of measurement sequences.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{Measurement, Parameter, UtcDateTime};

/// Assembled table plus what deduplication removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Assembled {
    pub measurements: Vec<Measurement>,
    /// Exact copies of an earlier record.
    pub duplicates_removed: usize,
    /// Non-identical records sharing a key with an earlier record.
    pub conflicts_resolved: usize,
}

/// Concatenates in arrival order, keeps the first record for each
/// `(timestamp, station_id, parameter)` key and sorts by timestamp descending,
/// then station id, then parameter. Idempotent.
pub fn assemble<I>(sequences: I) -> Assembled
where
    I: IntoIterator<Item = Vec<Measurement>>,
{
    let mut measurements: Vec<Measurement> = Vec::new();
    let mut index: HashMap<(UtcDateTime, String, Parameter), usize> = HashMap::new();
    let mut duplicates_removed = 0;
    let mut conflicts_resolved = 0;

    for measurement in sequences.into_iter().flatten() {
        let key = (
            measurement.timestamp,
            measurement.station_id.clone(),
            measurement.parameter,
        );
        match index.get(&key) {
            Some(&kept) if measurements[kept] == measurement => duplicates_removed += 1,
            Some(_) => conflicts_resolved += 1,
            None => {
                index.insert(key, measurements.len());
                measurements.push(measurement);
            }
        }
    }

    measurements.sort_by(table_order);

    Assembled {
        measurements,
        duplicates_removed,
        conflicts_resolved,
    }
}

fn table_order(left: &Measurement, right: &Measurement) -> Ordering {
    right
        .timestamp
        .cmp(&left.timestamp)
        .then_with(|| left.station_id.cmp(&right.station_id))
        .then_with(|| left.parameter.cmp(&right.parameter))
}

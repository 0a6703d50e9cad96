//! Discovery of the monitoring locations an endpoint knows about.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::data_source::EndpointAttempt;
use crate::descriptor::{first_map, LocationMapping};
use crate::normalize::{number, text};
use crate::pagination::RawPage;

/// One monitoring location as listed by an upstream `locations` collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    /// Upstream identifier, usable as a request's `location_id`.
    pub id: String,
    pub name: String,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Result of walking the chain for a location listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDiscovery {
    /// Descriptor that produced the listing; `None` when every endpoint failed.
    pub source: Option<String>,
    pub locations: Vec<Location>,
    /// Records dropped for lacking an identifier.
    pub skipped: usize,
    pub attempts: Vec<EndpointAttempt>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl LocationDiscovery {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Maps raw location records; records without an id are counted and dropped,
/// and repeated ids keep their first listing.
pub fn parse_locations(pages: &[RawPage], mapping: &LocationMapping) -> (Vec<Location>, usize) {
    let mut seen = HashSet::new();
    let mut locations = Vec::new();
    let mut skipped = 0;

    for record in pages.iter().flat_map(|page| page.records.iter()) {
        match parse_location(record, mapping) {
            Some(location) => {
                if seen.insert(location.id.clone()) {
                    locations.push(location);
                }
            }
            None => {
                debug!("skipping location record without an id");
                skipped += 1;
            }
        }
    }

    (locations, skipped)
}

fn parse_location(record: &Value, mapping: &LocationMapping) -> Option<Location> {
    if !record.is_object() {
        return None;
    }
    let id = first_map(record, &mapping.id, text)?;

    Some(Location {
        name: first_map(record, &mapping.name, text).unwrap_or_else(|| id.clone()),
        city: first_map(record, &mapping.city, text),
        latitude: first_map(record, &mapping.latitude, number),
        longitude: first_map(record, &mapping.longitude, number),
        id,
    })
}

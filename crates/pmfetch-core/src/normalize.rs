//! Mapping of heterogeneous upstream JSON into canonical [`Measurement`]s.

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::{first_map, first_present, EndpointDescriptor};
use crate::domain::{DataOrigin, Measurement, Parameter, UtcDateTime, ABSENT_STATION};
use crate::pagination::RawPage;

/// Per-reason counts of dropped records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipTally {
    pub not_an_object: usize,
    pub missing_timestamp: usize,
    pub invalid_timestamp: usize,
    pub missing_value: usize,
    pub invalid_value: usize,
    pub unknown_parameter: usize,
}

impl SkipTally {
    pub const fn total(&self) -> usize {
        self.not_an_object
            + self.missing_timestamp
            + self.invalid_timestamp
            + self.missing_value
            + self.invalid_value
            + self.unknown_parameter
    }

    pub fn merge(&mut self, other: &Self) {
        self.not_an_object += other.not_an_object;
        self.missing_timestamp += other.missing_timestamp;
        self.invalid_timestamp += other.invalid_timestamp;
        self.missing_value += other.missing_value;
        self.invalid_value += other.invalid_value;
        self.unknown_parameter += other.unknown_parameter;
    }

    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NotAnObject => self.not_an_object += 1,
            SkipReason::MissingTimestamp => self.missing_timestamp += 1,
            SkipReason::InvalidTimestamp => self.invalid_timestamp += 1,
            SkipReason::MissingValue => self.missing_value += 1,
            SkipReason::InvalidValue => self.invalid_value += 1,
            SkipReason::UnknownParameter => self.unknown_parameter += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    NotAnObject,
    MissingTimestamp,
    InvalidTimestamp,
    MissingValue,
    InvalidValue,
    UnknownParameter,
}

impl SkipReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::MissingTimestamp => "missing_timestamp",
            Self::InvalidTimestamp => "invalid_timestamp",
            Self::MissingValue => "missing_value",
            Self::InvalidValue => "invalid_value",
            Self::UnknownParameter => "unknown_parameter",
        }
    }
}

/// Records that survived normalization plus what was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPage {
    pub measurements: Vec<Measurement>,
    pub skipped: SkipTally,
}

/// Never fails: bad records are counted and dropped.
pub fn normalize(page: &RawPage, descriptor: &EndpointDescriptor) -> NormalizedPage {
    let mut normalized = NormalizedPage {
        measurements: Vec::with_capacity(page.records.len()),
        skipped: SkipTally::default(),
    };

    for record in &page.records {
        match normalize_record(record, descriptor, page.parameter_hint) {
            Ok(measurement) => normalized.measurements.push(measurement),
            Err(reason) => {
                debug!(
                    descriptor = %descriptor.name,
                    page = page.index,
                    reason = reason.as_str(),
                    "skipping malformed record"
                );
                normalized.skipped.record(reason);
            }
        }
    }

    normalized
}

fn normalize_record(
    record: &Value,
    descriptor: &EndpointDescriptor,
    parameter_hint: Option<Parameter>,
) -> Result<Measurement, SkipReason> {
    if !record.is_object() {
        return Err(SkipReason::NotAnObject);
    }
    let mapping = &descriptor.mapping;

    let timestamp = first_map(record, &mapping.timestamp, |raw| {
        raw.as_str()
            .and_then(|raw| UtcDateTime::parse_lenient(raw).ok())
    })
    .ok_or_else(|| {
        absent_or_invalid(
            record,
            &mapping.timestamp,
            SkipReason::MissingTimestamp,
            SkipReason::InvalidTimestamp,
        )
    })?;

    let value = first_map(record, &mapping.value, number).ok_or_else(|| {
        absent_or_invalid(
            record,
            &mapping.value,
            SkipReason::MissingValue,
            SkipReason::InvalidValue,
        )
    })?;

    let parameter = match first_map(record, &mapping.parameter, |raw| mapping.parameter_for(raw)) {
        Some(parameter) => parameter,
        None if first_present(record, &mapping.parameter).is_some() => {
            return Err(SkipReason::UnknownParameter)
        }
        None => parameter_hint.ok_or(SkipReason::UnknownParameter)?,
    };

    let station_id = first_map(record, &mapping.station_id, text)
        .unwrap_or_else(|| String::from(ABSENT_STATION));

    let measurement = Measurement::new(timestamp, station_id, parameter, value, DataOrigin::Live)
        .map_err(|_| SkipReason::InvalidValue)?
        .with_city(first_map(record, &mapping.city, text))
        .with_region(first_map(record, &mapping.region, text))
        .with_coordinates(
            first_map(record, &mapping.latitude, number),
            first_map(record, &mapping.longitude, number),
        );

    Ok(measurement)
}

/// Something was at one of the paths but none of it was usable.
fn absent_or_invalid(
    record: &Value,
    candidates: &[String],
    missing: SkipReason,
    invalid: SkipReason,
) -> SkipReason {
    if first_present(record, candidates).is_some() {
        invalid
    } else {
        missing
    }
}

pub(crate) fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    }
}

pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

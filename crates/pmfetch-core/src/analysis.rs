//! Descriptive statistics and model-ready reshaping of an assembled table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{Measurement, Parameter, Region, Season, UtcDateTime};

const ROLLING_WINDOW: usize = 7;

/// Grouping a summary row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SummaryScope {
    Overall,
    City,
    Season,
}

/// Distribution of one parameter inside one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub parameter: Parameter,
    pub statistic: SummaryScope,
    pub category: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; absent for single-value groups.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub q25: f64,
    pub q75: f64,
}

/// Overall, per-city and per-season rows for every parameter present.
/// Groups appear in order of first occurrence; values are rounded to two
/// decimals.
pub fn summarize(measurements: &[Measurement]) -> Vec<SummaryRow> {
    let mut rows = Vec::new();

    for parameter in Parameter::ALL {
        let values = values_where(measurements, parameter, |_| true);
        if let Some(row) = summary_row(parameter, SummaryScope::Overall, "All", values) {
            rows.push(row);
        }
    }

    for city in first_seen(measurements.iter().filter_map(|m| m.city.as_deref())) {
        for parameter in Parameter::ALL {
            let values = values_where(measurements, parameter, |m| m.city.as_deref() == Some(city));
            if let Some(row) = summary_row(parameter, SummaryScope::City, city, values) {
                rows.push(row);
            }
        }
    }

    for season in first_seen(measurements.iter().map(Measurement::season)) {
        for parameter in Parameter::ALL {
            let values = values_where(measurements, parameter, |m| m.season() == season);
            if let Some(row) = summary_row(parameter, SummaryScope::Season, season.label(), values) {
                rows.push(row);
            }
        }
    }

    rows
}

fn values_where<F>(measurements: &[Measurement], parameter: Parameter, keep: F) -> Vec<f64>
where
    F: Fn(&Measurement) -> bool,
{
    measurements
        .iter()
        .filter(|m| m.parameter == parameter && keep(m))
        .map(|m| m.value)
        .collect()
}

fn first_seen<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = Vec::new();
    for item in items {
        if !seen.contains(&item) {
            seen.push(item);
        }
    }
    seen
}

fn summary_row(
    parameter: Parameter,
    statistic: SummaryScope,
    category: &str,
    mut values: Vec<f64>,
) -> Option<SummaryRow> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        round2(variance.sqrt())
    });

    Some(SummaryRow {
        parameter,
        statistic,
        category: category.to_owned(),
        count,
        mean: round2(mean),
        median: round2(quantile(&values, 0.5)),
        std,
        min: round2(values[0]),
        max: round2(values[count - 1]),
        q25: round2(quantile(&values, 0.25)),
        q75: round2(quantile(&values, 0.75)),
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One (timestamp, station) observation with both parameters side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlRow {
    pub datetime: UtcDateTime,
    pub station_id: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub season: Season,
    pub region: Region,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    /// Monday is 0.
    pub weekday: u8,
    pub is_weekend: bool,
    pub pm25_lag1: Option<f64>,
    pub pm10_lag1: Option<f64>,
    pub pm25_rolling_7: Option<f64>,
    pub pm10_rolling_7: Option<f64>,
}

#[derive(Default)]
struct PivotCell<'a> {
    first: Option<&'a Measurement>,
    pm25: Vec<f64>,
    pm10: Vec<f64>,
}

/// Pivots to one row per (station, timestamp), ordered by station then time,
/// with previous-sample lags and 7-sample rolling means per station. A
/// rolling mean needs seven present values.
pub fn ml_ready(measurements: &[Measurement]) -> Vec<MlRow> {
    let mut cells: BTreeMap<(&str, UtcDateTime), PivotCell<'_>> = BTreeMap::new();
    for measurement in measurements {
        let cell = cells
            .entry((measurement.station_id.as_str(), measurement.timestamp))
            .or_default();
        if cell.first.is_none() {
            cell.first = Some(measurement);
        }
        match measurement.parameter {
            Parameter::Pm25 => cell.pm25.push(measurement.value),
            Parameter::Pm10 => cell.pm10.push(measurement.value),
        }
    }

    let mut rows: Vec<MlRow> = Vec::with_capacity(cells.len());
    let mut station_start = 0;
    for ((station_id, timestamp), cell) in cells {
        let Some(first) = cell.first else { continue };
        if rows
            .last()
            .is_some_and(|previous| previous.station_id != station_id)
        {
            station_start = rows.len();
        }

        let at = timestamp.into_inner();
        let weekday = at.weekday().number_days_from_monday();
        let mut row = MlRow {
            datetime: timestamp,
            station_id: station_id.to_owned(),
            city: first.city.clone(),
            state: first.region.clone(),
            latitude: first.latitude,
            longitude: first.longitude,
            season: first.season(),
            region: first.geographic_region(),
            pm25: average(&cell.pm25),
            pm10: average(&cell.pm10),
            year: at.year(),
            month: u8::from(at.month()),
            day: at.day(),
            hour: at.hour(),
            weekday,
            is_weekend: weekday >= 5,
            pm25_lag1: None,
            pm10_lag1: None,
            pm25_rolling_7: None,
            pm10_rolling_7: None,
        };

        let history = &rows[station_start..];
        if let Some(previous) = history.last() {
            row.pm25_lag1 = previous.pm25;
            row.pm10_lag1 = previous.pm10;
        }
        row.pm25_rolling_7 = rolling_mean(history, row.pm25, |r| r.pm25);
        row.pm10_rolling_7 = rolling_mean(history, row.pm10, |r| r.pm10);
        rows.push(row);
    }

    rows
}

fn average(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn rolling_mean<F>(history: &[MlRow], current: Option<f64>, pick: F) -> Option<f64>
where
    F: Fn(&MlRow) -> Option<f64>,
{
    if history.len() + 1 < ROLLING_WINDOW {
        return None;
    }
    let mut sum = current?;
    for row in &history[history.len() + 1 - ROLLING_WINDOW..] {
        sum += pick(row)?;
    }
    Some(sum / ROLLING_WINDOW as f64)
}

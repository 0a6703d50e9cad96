//! Deterministic synthetic measurements for when no live endpoint delivers.
//!
//! Every value is `baseline * seasonal * daily * hourly * random`, clamped to
//! the parameter's physical range and rounded to one decimal. The random
//! factor is drawn once per (station, day, sample hour) from a generator
//! seeded by `(seed, station_id, date, hour)`, so output does not depend on
//! the window, station subset or parameter set it is generated with.

use std::f64::consts::PI;
use std::sync::Arc;

use time::Date;
use tracing::{info, warn};

use crate::data_source::FetchRequest;
use crate::domain::{
    DataOrigin, DateWindow, Measurement, Parameter, Season, Station, StationTable,
    UtcDateTime,
};
use crate::ValidationError;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_YEAR: i32 = 2023;

/// Sample hours per day; 24 is stamped as 00:00 of the same date.
pub const SAMPLE_HOURS: [u8; 4] = [6, 12, 18, 24];

pub fn seasonal_factor(month: u8) -> f64 {
    Season::from_month(month).factor()
}

/// `0.8 + 0.4 * sin(2 pi * day_of_year / 365)`.
pub fn daily_variation(day_of_year: u16) -> f64 {
    0.8 + 0.4 * (2.0 * PI * f64::from(day_of_year) / 365.0).sin()
}

/// Rush hours are dirtier, midday and midnight cleaner.
pub fn hourly_factor(hour: u8) -> f64 {
    match hour {
        6 | 18 => 1.2,
        12 | 24 => 0.9,
        _ => 1.0,
    }
}

/// Uniform draw in `[0.7, 1.3)`.
pub fn random_factor(seed: u64, station_id: &str, date: Date, hour: u8) -> f64 {
    let day_key = (i64::from(date.year()) * 1_000 + i64::from(date.ordinal())) as u64;
    let key = mix(mix(mix(seed ^ fnv1a(station_id)) ^ day_key) ^ u64::from(hour));
    let mut rng = fastrand::Rng::with_seed(key);
    0.7 + 0.6 * rng.f64()
}

fn fnv1a(value: &str) -> u64 {
    value.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn mix(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Synthetic rows plus the notes produced while choosing stations.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticBatch {
    pub measurements: Vec<Measurement>,
    pub warnings: Vec<String>,
}

/// Seasonal/diurnal/noise model over an immutable station table.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    stations: Arc<StationTable>,
    seed: u64,
}

impl SyntheticGenerator {
    pub fn new(stations: Arc<StationTable>, seed: u64) -> Self {
        Self { stations, seed }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stations(&self) -> &StationTable {
        &self.stations
    }

    /// Full calendar year for every station.
    pub fn generate(
        &self,
        year: i32,
        parameters: &[Parameter],
    ) -> Result<Vec<Measurement>, ValidationError> {
        let window = DateWindow::calendar_year(year)?;
        Ok(self.generate_window(&window, parameters))
    }

    pub fn generate_window(&self, window: &DateWindow, parameters: &[Parameter]) -> Vec<Measurement> {
        let stations = self.stations.stations().iter().collect::<Vec<_>>();
        self.generate_for(&stations, window, parameters)
    }

    /// Rows for the request's parameter and station filters. When the filters
    /// match no station the whole table is used and a warning is returned.
    /// Without a request window the whole of `fallback_year` is generated.
    pub fn generate_request(
        &self,
        request: &FetchRequest,
        fallback_year: i32,
    ) -> Result<SyntheticBatch, ValidationError> {
        let mut warnings = Vec::new();

        let mut stations = self.stations.select(request.city(), request.location_id());
        if stations.is_empty() {
            let message = format!(
                "no reference station matches city={:?} location_id={:?}; using all {} stations",
                request.city(),
                request.location_id(),
                self.stations.len()
            );
            warn!(%message, "synthetic station filter matched nothing");
            warnings.push(message);
            stations = self.stations.stations().iter().collect();
        }

        let window = match request.window() {
            Some(window) => window,
            None => DateWindow::calendar_year(fallback_year)?,
        };

        Ok(SyntheticBatch {
            measurements: self.generate_for(&stations, &window, &[request.parameter()]),
            warnings,
        })
    }

    fn generate_for(
        &self,
        stations: &[&Station],
        window: &DateWindow,
        parameters: &[Parameter],
    ) -> Vec<Measurement> {
        let mut measurements = Vec::with_capacity(
            window.day_count() * stations.len() * SAMPLE_HOURS.len() * parameters.len(),
        );

        for date in window.days() {
            let seasonal = seasonal_factor(u8::from(date.month()));
            let daily = daily_variation(date.ordinal());

            for station in stations {
                for hour in SAMPLE_HOURS {
                    let random = random_factor(self.seed, &station.station_id, date, hour);
                    let timestamp = UtcDateTime::at_hour(date, hour);
                    let shared = seasonal * daily * hourly_factor(hour) * random;

                    for parameter in parameters {
                        measurements.push(synthetic_measurement(
                            station, *parameter, timestamp, shared,
                        ));
                    }
                }
            }
        }

        info!(
            stations = stations.len(),
            days = window.day_count(),
            records = measurements.len(),
            seed = self.seed,
            "generated synthetic measurements"
        );
        measurements
    }
}

fn synthetic_measurement(
    station: &Station,
    parameter: Parameter,
    timestamp: UtcDateTime,
    factor: f64,
) -> Measurement {
    let (floor, ceiling) = parameter.synthetic_bounds();
    let value = round_one_decimal((station.baseline(parameter) * factor).clamp(floor, ceiling));

    Measurement {
        timestamp,
        station_id: station.station_id.clone(),
        city: Some(station.city.clone()),
        region: Some(station.state.clone()),
        parameter,
        value,
        latitude: Some(station.latitude),
        longitude: Some(station.longitude),
        origin: DataOrigin::Synthetic,
        station_type: Some(station.station_type.clone()),
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{AqiCategory, Parameter, Region, Season, UtcDateTime};
use crate::ValidationError;

/// Station id recorded when an upstream record carries none.
pub const ABSENT_STATION: &str = "unknown";

/// Whether a record came from a live endpoint or the synthetic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataOrigin {
    Live,
    Synthetic,
}

impl DataOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Synthetic => "synthetic",
        }
    }
}

impl Display for DataOrigin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical pollutant reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: UtcDateTime,
    pub station_id: String,
    pub city: Option<String>,
    /// State or province name.
    pub region: Option<String>,
    pub parameter: Parameter,
    pub value: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub origin: DataOrigin,
    pub station_type: Option<String>,
}

impl Measurement {
    pub fn new(
        timestamp: UtcDateTime,
        station_id: impl Into<String>,
        parameter: Parameter,
        value: f64,
        origin: DataOrigin,
    ) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "value" });
        }
        if value < 0.0 {
            return Err(ValidationError::NegativeValue { field: "value" });
        }

        let station_id = station_id.into();
        let station_id = if station_id.trim().is_empty() {
            String::from(ABSENT_STATION)
        } else {
            station_id
        };

        Ok(Self {
            timestamp,
            station_id,
            city: None,
            region: None,
            parameter,
            value,
            latitude: None,
            longitude: None,
            origin,
            station_type: None,
        })
    }

    pub fn with_city(mut self, city: Option<String>) -> Self {
        self.city = city;
        self
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_station_type(mut self, station_type: Option<String>) -> Self {
        self.station_type = station_type;
        self
    }

    /// Out-of-range coordinates are stored as absent.
    pub fn with_coordinates(mut self, latitude: Option<f64>, longitude: Option<f64>) -> Self {
        self.latitude = latitude.and_then(|value| checked_latitude(value).ok());
        self.longitude = longitude.and_then(|value| checked_longitude(value).ok());
        self
    }

    pub fn season(&self) -> Season {
        Season::from_month(self.timestamp.month())
    }

    pub fn aqi_category(&self) -> AqiCategory {
        AqiCategory::classify(self.parameter, self.value)
    }

    pub fn geographic_region(&self) -> Region {
        Region::from_state(self.region.as_deref())
    }

    /// Uniqueness key inside an assembled table.
    pub fn key(&self) -> (UtcDateTime, &str, Parameter) {
        (self.timestamp, self.station_id.as_str(), self.parameter)
    }
}

pub fn checked_latitude(value: f64) -> Result<f64, ValidationError> {
    check_coordinate("latitude", value, 90.0)
}

pub fn checked_longitude(value: f64) -> Result<f64, ValidationError> {
    check_coordinate("longitude", value, 180.0)
}

fn check_coordinate(field: &'static str, value: f64, limit: f64) -> Result<f64, ValidationError> {
    if value.is_finite() && value.abs() <= limit {
        Ok(value)
    } else {
        Err(ValidationError::CoordinateOutOfRange { field, value })
    }
}

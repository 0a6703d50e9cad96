use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Particulate-matter parameter measured by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Parameter {
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "PM10")]
    Pm10,
}

impl Parameter {
    pub const ALL: [Self; 2] = [Self::Pm25, Self::Pm10];

    /// Lower-case wire code (`pm25`, `pm10`).
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
        }
    }

    /// Display label used in tables (`PM2.5`, `PM10`).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pm25 => "PM2.5",
            Self::Pm10 => "PM10",
        }
    }

    /// Physical floor and ceiling applied to synthetic values, in ug/m3.
    pub const fn synthetic_bounds(self) -> (f64, f64) {
        match self {
            Self::Pm25 => (5.0, 500.0),
            Self::Pm10 => (10.0, 800.0),
        }
    }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Parameter {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Ok(Self::Pm25),
            "pm10" => Ok(Self::Pm10),
            other => Err(ValidationError::UnknownParameter {
                value: other.to_owned(),
            }),
        }
    }
}

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::Parameter;

/// US-EPA style air quality band for a single particulate reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    Hazardous,
}

const PM25_BREAKPOINTS: [f64; 5] = [12.0, 35.4, 55.4, 150.4, 250.4];
const PM10_BREAKPOINTS: [f64; 5] = [54.0, 154.0, 254.0, 354.0, 424.0];

impl AqiCategory {
    /// Upper bounds are inclusive: a PM2.5 reading of exactly 12.0 is `Good`.
    pub fn classify(parameter: Parameter, value: f64) -> Self {
        let breakpoints = match parameter {
            Parameter::Pm25 => &PM25_BREAKPOINTS,
            Parameter::Pm10 => &PM10_BREAKPOINTS,
        };

        let band = breakpoints
            .iter()
            .position(|upper| value <= *upper)
            .unwrap_or(breakpoints.len());

        match band {
            0 => Self::Good,
            1 => Self::Moderate,
            2 => Self::UnhealthyForSensitiveGroups,
            3 => Self::Unhealthy,
            4 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            Self::Unhealthy => "Unhealthy",
            Self::VeryUnhealthy => "Very Unhealthy",
            Self::Hazardous => "Hazardous",
        }
    }
}

impl Display for AqiCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Broad geographic grouping of Indian states and union territories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    North,
    South,
    East,
    West,
    Central,
}

const NORTH: &[&str] = &[
    "Delhi",
    "Punjab",
    "Haryana",
    "Himachal Pradesh",
    "Jammu and Kashmir",
    "Ladakh",
    "Uttarakhand",
    "Uttar Pradesh",
];
const SOUTH: &[&str] = &[
    "Andhra Pradesh",
    "Karnataka",
    "Kerala",
    "Tamil Nadu",
    "Telangana",
];
const EAST: &[&str] = &[
    "West Bengal",
    "Odisha",
    "Jharkhand",
    "Bihar",
    "Assam",
    "Meghalaya",
    "Manipur",
    "Mizoram",
    "Nagaland",
    "Tripura",
    "Arunachal Pradesh",
    "Sikkim",
];
const WEST: &[&str] = &[
    "Maharashtra",
    "Gujarat",
    "Rajasthan",
    "Goa",
    "Madhya Pradesh",
    "Chhattisgarh",
];

impl Region {
    /// Unlisted or missing states fall into `Central`.
    pub fn from_state(state: Option<&str>) -> Self {
        let Some(state) = state.map(str::trim) else {
            return Self::Central;
        };
        let matches = |names: &[&str]| names.iter().any(|name| name.eq_ignore_ascii_case(state));

        if matches(NORTH) {
            Self::North
        } else if matches(SOUTH) {
            Self::South
        } else if matches(EAST) {
            Self::East
        } else if matches(WEST) {
            Self::West
        } else {
            Self::Central
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
            Self::Central => "Central",
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

use serde::{Deserialize, Serialize};

use super::{checked_latitude, checked_longitude, Parameter};
use crate::ValidationError;

/// Monitoring station with per-parameter baselines used by the synthetic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub station_id: String,
    pub city: String,
    pub state: String,
    pub latitude: f64,
    pub longitude: f64,
    pub station_type: String,
    pub pm25_baseline: f64,
    pub pm10_baseline: f64,
}

impl Station {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        station_id: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        latitude: f64,
        longitude: f64,
        station_type: impl Into<String>,
        pm25_baseline: f64,
        pm10_baseline: f64,
    ) -> Result<Self, ValidationError> {
        let station_id = station_id.into();
        if station_id.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "station_id",
            });
        }

        for (field, value) in [
            ("pm25_baseline", pm25_baseline),
            ("pm10_baseline", pm10_baseline),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field });
            }
            if value < 0.0 {
                return Err(ValidationError::NegativeValue { field });
            }
        }

        Ok(Self {
            station_id,
            city: city.into(),
            state: state.into(),
            latitude: checked_latitude(latitude)?,
            longitude: checked_longitude(longitude)?,
            station_type: station_type.into(),
            pm25_baseline,
            pm10_baseline,
        })
    }

    pub const fn baseline(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Pm25 => self.pm25_baseline,
            Parameter::Pm10 => self.pm10_baseline,
        }
    }
}

/// Immutable set of stations the synthetic generator samples from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationTable {
    stations: Vec<Station>,
}

impl StationTable {
    pub fn new(stations: Vec<Station>) -> Result<Self, ValidationError> {
        if stations.is_empty() {
            return Err(ValidationError::EmptyStationTable);
        }
        Ok(Self { stations })
    }

    /// The 37 CPCB-style reference stations across Indian cities.
    pub fn india_reference() -> Self {
        let stations = INDIA_REFERENCE
            .iter()
            .map(
                |&(station_id, city, state, latitude, longitude, station_type, pm25, pm10)| Station {
                    station_id: station_id.to_owned(),
                    city: city.to_owned(),
                    state: state.to_owned(),
                    latitude,
                    longitude,
                    station_type: station_type.to_owned(),
                    pm25_baseline: pm25,
                    pm10_baseline: pm10,
                },
            )
            .collect();
        Self { stations }
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Stations matching the optional city and location filters
    /// (case-insensitive). An empty result means nothing matched.
    pub fn select(&self, city: Option<&str>, location_id: Option<&str>) -> Vec<&Station> {
        self.stations
            .iter()
            .filter(|station| city.is_none_or(|city| station.city.eq_ignore_ascii_case(city.trim())))
            .filter(|station| {
                location_id.is_none_or(|id| station.station_id.eq_ignore_ascii_case(id.trim()))
            })
            .collect()
    }

    pub fn find(&self, station_id: &str) -> Option<&Station> {
        self.stations
            .iter()
            .find(|station| station.station_id.eq_ignore_ascii_case(station_id))
    }
}

type StationRow = (&'static str, &'static str, &'static str, f64, f64, &'static str, f64, f64);

const INDIA_REFERENCE: [StationRow; 37] = [
    ("Anand Vihar", "Delhi", "Delhi", 28.6469, 77.3152, "Urban", 120.0, 200.0),
    ("Punjabi Bagh", "Delhi", "Delhi", 28.6742, 77.1341, "Urban", 110.0, 180.0),
    ("R K Puram", "Delhi", "Delhi", 28.5631, 77.1716, "Residential", 100.0, 170.0),
    ("Dwarka", "Delhi", "Delhi", 28.5921, 77.0460, "Residential", 95.0, 160.0),
    ("Sector 62", "Noida", "Uttar Pradesh", 28.6139, 77.3616, "Urban", 105.0, 175.0),
    ("Sector 30", "Gurgaon", "Haryana", 28.4595, 77.0266, "Urban", 100.0, 170.0),
    ("Bandra", "Mumbai", "Maharashtra", 19.0544, 72.8423, "Urban", 65.0, 95.0),
    ("Worli", "Mumbai", "Maharashtra", 19.0183, 72.8148, "Urban", 70.0, 100.0),
    ("Powai", "Mumbai", "Maharashtra", 19.1197, 72.9062, "Residential", 60.0, 90.0),
    ("Nerul", "Navi Mumbai", "Maharashtra", 19.0330, 73.0297, "Residential", 55.0, 85.0),
    ("Silk Board", "Bengaluru", "Karnataka", 12.9185, 77.6220, "Urban", 55.0, 80.0),
    ("BTM Layout", "Bengaluru", "Karnataka", 12.9116, 77.6107, "Residential", 50.0, 75.0),
    ("Whitefield", "Bengaluru", "Karnataka", 12.9698, 77.7500, "IT Hub", 45.0, 70.0),
    ("Peenya", "Bengaluru", "Karnataka", 13.0281, 77.5179, "Industrial", 65.0, 95.0),
    ("Adyar", "Chennai", "Tamil Nadu", 13.0067, 80.2206, "Residential", 45.0, 70.0),
    ("T Nagar", "Chennai", "Tamil Nadu", 13.0418, 80.2341, "Commercial", 50.0, 75.0),
    ("Manali", "Chennai", "Tamil Nadu", 13.1693, 80.2644, "Industrial", 60.0, 90.0),
    ("Ballygunge", "Kolkata", "West Bengal", 22.5354, 88.3643, "Residential", 75.0, 115.0),
    ("Jadavpur", "Kolkata", "West Bengal", 22.4999, 88.3712, "Educational", 70.0, 110.0),
    ("Howrah", "Howrah", "West Bengal", 22.5958, 88.2636, "Industrial", 80.0, 125.0),
    ("Hyderabad Central", "Hyderabad", "Telangana", 17.3850, 78.4867, "Urban", 55.0, 85.0),
    ("Pune Station", "Pune", "Maharashtra", 18.5204, 73.8567, "Urban", 60.0, 90.0),
    ("Ahmedabad Central", "Ahmedabad", "Gujarat", 23.0225, 72.5714, "Urban", 75.0, 110.0),
    ("Jaipur Central", "Jaipur", "Rajasthan", 26.9124, 75.7873, "Urban", 80.0, 125.0),
    ("Lucknow Central", "Lucknow", "Uttar Pradesh", 26.8467, 80.9462, "Urban", 90.0, 140.0),
    ("Kanpur Central", "Kanpur", "Uttar Pradesh", 26.4499, 80.3319, "Industrial", 110.0, 170.0),
    ("Patna Central", "Patna", "Bihar", 25.5941, 85.1376, "Urban", 100.0, 155.0),
    ("Bhopal Central", "Bhopal", "Madhya Pradesh", 23.2599, 77.4126, "Urban", 70.0, 105.0),
    ("Indore Central", "Indore", "Madhya Pradesh", 22.7196, 75.8577, "Urban", 75.0, 115.0),
    ("Visakhapatnam Port", "Visakhapatnam", "Andhra Pradesh", 17.6868, 83.2185, "Industrial", 50.0, 80.0),
    ("Thiruvananthapuram Central", "Thiruvananthapuram", "Kerala", 8.5241, 76.9366, "Urban", 35.0, 55.0),
    ("Kochi Central", "Kochi", "Kerala", 9.9312, 76.2673, "Urban", 40.0, 65.0),
    ("Guwahati Central", "Guwahati", "Assam", 26.1445, 91.7362, "Urban", 60.0, 90.0),
    ("Bhubaneswar Central", "Bhubaneswar", "Odisha", 20.2961, 85.8245, "Urban", 65.0, 95.0),
    ("Chandigarh Central", "Chandigarh", "Punjab", 30.7333, 76.7794, "Urban", 85.0, 130.0),
    ("Dehradun Central", "Dehradun", "Uttarakhand", 30.3165, 78.0322, "Urban", 70.0, 110.0),
    ("Srinagar Central", "Srinagar", "Jammu and Kashmir", 34.0837, 74.7973, "Urban", 45.0, 75.0),
];

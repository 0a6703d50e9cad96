//! Typed upstream endpoint descriptions.
//!
//! Each descriptor names an API version, a base URL and the field mapping the
//! normalizer uses to read its records. Descriptors are validated once, when
//! a fallback chain is built.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;

use crate::data_source::FetchRequest;
use crate::domain::Parameter;
use crate::http_client::HttpRequest;
use crate::ValidationError;

pub const OPENAQ_V3_BASE_URL: &str = "https://api.openaq.org/v3";
pub const OPENAQ_V2_BASE_URL: &str = "https://api.openaq.org/v2";
pub const OPENAQ_V2_MIRROR_BASE_URL: &str = "https://u50g7n0cbj.execute-api.us-east-1.amazonaws.com/v2";

/// Query dialect spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiVersion {
    V2,
    V3,
}

impl ApiVersion {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }
}

impl Display for ApiVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an endpoint identifies a parameter on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKey {
    Code(String),
    Id(u64),
}

impl ParameterKey {
    pub fn code(code: &str) -> Self {
        Self::Code(code.to_ascii_lowercase())
    }

    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Code(code), Value::String(candidate)) => {
                code.eq_ignore_ascii_case(candidate.trim())
            }
            (Self::Id(id), Value::Number(number)) => number.as_u64() == Some(*id),
            (Self::Id(id), Value::String(candidate)) => {
                candidate.trim().parse::<u64>().ok() == Some(*id)
            }
            _ => false,
        }
    }
}

/// Candidate dotted JSON paths for each canonical field plus the parameter
/// lookup table. The first path whose value converts to the field's type wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMapping {
    pub results: String,
    pub timestamp: Vec<String>,
    pub value: Vec<String>,
    pub station_id: Vec<String>,
    pub city: Vec<String>,
    pub region: Vec<String>,
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
    pub parameter: Vec<String>,
    pub parameters: Vec<(ParameterKey, Parameter)>,
}

impl FieldMapping {
    pub fn openaq_v3() -> Self {
        Self {
            results: String::from("results"),
            timestamp: paths(&["datetime.utc", "datetime", "period.datetimeFrom.utc", "date.utc"]),
            value: paths(&["value"]),
            station_id: paths(&["location.name", "location", "locationName", "locationId"]),
            city: paths(&["city", "location.locality"]),
            region: paths(&["state", "region"]),
            latitude: paths(&["coordinates.latitude"]),
            longitude: paths(&["coordinates.longitude"]),
            parameter: paths(&["parameter.id", "parameter.name", "parameter"]),
            parameters: vec![
                (ParameterKey::Id(2), Parameter::Pm25),
                (ParameterKey::Id(1), Parameter::Pm10),
                (ParameterKey::code("pm25"), Parameter::Pm25),
                (ParameterKey::code("pm10"), Parameter::Pm10),
            ],
        }
    }

    pub fn openaq_v2() -> Self {
        Self {
            results: String::from("results"),
            timestamp: paths(&["date.utc", "datetime"]),
            value: paths(&["value"]),
            station_id: paths(&["location", "locationId"]),
            city: paths(&["city"]),
            region: paths(&["state", "region"]),
            latitude: paths(&["coordinates.latitude"]),
            longitude: paths(&["coordinates.longitude"]),
            parameter: paths(&["parameter"]),
            parameters: vec![
                (ParameterKey::code("pm25"), Parameter::Pm25),
                (ParameterKey::code("pm10"), Parameter::Pm10),
            ],
        }
    }

    /// Resolves a wire identifier through the parameter table.
    pub fn parameter_for(&self, value: &Value) -> Option<Parameter> {
        self.parameters
            .iter()
            .find(|(key, _)| key.matches(value))
            .map(|(_, parameter)| *parameter)
    }

    fn wire_code(&self, parameter: Parameter) -> Option<&str> {
        self.parameters.iter().find_map(|(key, mapped)| match key {
            ParameterKey::Code(code) if *mapped == parameter => Some(code.as_str()),
            _ => None,
        })
    }

    fn wire_id(&self, parameter: Parameter) -> Option<u64> {
        self.parameters.iter().find_map(|(key, mapped)| match key {
            ParameterKey::Id(id) if *mapped == parameter => Some(*id),
            _ => None,
        })
    }

    fn validate(&self, descriptor: &str) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFieldMapping {
            descriptor: descriptor.to_owned(),
            reason: reason.to_owned(),
        };

        if self.results.trim().is_empty() {
            return Err(invalid("results path is empty"));
        }
        for (field, candidates) in [
            ("timestamp", &self.timestamp),
            ("value", &self.value),
            ("parameter", &self.parameter),
        ] {
            if candidates.iter().all(|path| path.trim().is_empty()) {
                return Err(invalid(&format!("no path declared for required field '{field}'")));
            }
        }

        let mut seen = HashSet::new();
        for (key, _) in &self.parameters {
            if !seen.insert(key) {
                return Err(invalid(&format!("parameter key {key:?} is mapped twice")));
            }
        }
        for parameter in Parameter::ALL {
            if !self.parameters.iter().any(|(_, mapped)| *mapped == parameter) {
                return Err(invalid(&format!("parameter table has no entry for {parameter}")));
            }
        }

        Ok(())
    }
}

/// Candidate paths for the fields of a `locations` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationMapping {
    pub results: String,
    pub id: Vec<String>,
    pub name: Vec<String>,
    pub city: Vec<String>,
    pub latitude: Vec<String>,
    pub longitude: Vec<String>,
}

impl LocationMapping {
    pub fn openaq_v3() -> Self {
        Self {
            results: String::from("results"),
            id: paths(&["id"]),
            name: paths(&["name"]),
            city: paths(&["locality", "city"]),
            latitude: paths(&["coordinates.latitude"]),
            longitude: paths(&["coordinates.longitude"]),
        }
    }

    pub fn openaq_v2() -> Self {
        Self {
            results: String::from("results"),
            id: paths(&["id", "locationId"]),
            name: paths(&["name", "location"]),
            city: paths(&["city"]),
            latitude: paths(&["coordinates.latitude"]),
            longitude: paths(&["coordinates.longitude"]),
        }
    }

    fn validate(&self, descriptor: &str) -> Result<(), ValidationError> {
        if self.results.trim().is_empty() || self.id.iter().all(|path| path.trim().is_empty()) {
            return Err(ValidationError::InvalidFieldMapping {
                descriptor: descriptor.to_owned(),
                reason: String::from("location mapping needs a results path and an id path"),
            });
        }
        Ok(())
    }
}

fn paths(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

/// Reads a dotted path (`coordinates.latitude`) from a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.get(segment))
}

/// First non-null value among candidate paths.
pub fn first_present<'a>(value: &'a Value, candidates: &[String]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|found| !found.is_null())
}

/// First candidate whose value `convert` accepts. A path that resolves to a
/// value of the wrong shape does not stop the search.
pub fn first_map<T>(
    value: &Value,
    candidates: &[String],
    convert: impl FnMut(&Value) -> Option<T>,
) -> Option<T> {
    candidates
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter(|found| !found.is_null())
        .find_map(convert)
}

/// One upstream endpoint in the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointDescriptor {
    pub name: String,
    pub version: ApiVersion,
    pub base_url: String,
    pub mapping: FieldMapping,
    pub locations: LocationMapping,
    /// ISO country code to numeric id; only consulted by v3 endpoints.
    pub country_ids: BTreeMap<String, u64>,
}

impl EndpointDescriptor {
    pub fn new(
        name: impl Into<String>,
        version: ApiVersion,
        base_url: impl Into<String>,
        mapping: FieldMapping,
    ) -> Self {
        let locations = match version {
            ApiVersion::V2 => LocationMapping::openaq_v2(),
            ApiVersion::V3 => LocationMapping::openaq_v3(),
        };
        Self {
            name: name.into(),
            version,
            base_url: base_url.into(),
            mapping,
            locations,
            country_ids: BTreeMap::new(),
        }
    }

    pub fn openaq_v3() -> Self {
        Self::new("openaq-v3", ApiVersion::V3, OPENAQ_V3_BASE_URL, FieldMapping::openaq_v3())
            .with_country_id("IN", 91)
    }

    pub fn openaq_v2() -> Self {
        Self::new("openaq-v2", ApiVersion::V2, OPENAQ_V2_BASE_URL, FieldMapping::openaq_v2())
    }

    pub fn openaq_v2_mirror() -> Self {
        Self::new(
            "openaq-v2-mirror",
            ApiVersion::V2,
            OPENAQ_V2_MIRROR_BASE_URL,
            FieldMapping::openaq_v2(),
        )
    }

    /// Reference chain: v3, v2, then the v2 mirror.
    pub fn defaults() -> Vec<Self> {
        vec![Self::openaq_v3(), Self::openaq_v2(), Self::openaq_v2_mirror()]
    }

    pub fn with_country_id(mut self, country_code: &str, id: u64) -> Self {
        self.country_ids
            .insert(country_code.to_ascii_uppercase(), id);
        self
    }

    pub fn with_location_mapping(mut self, locations: LocationMapping) -> Self {
        self.locations = locations;
        self
    }

    pub fn measurements_url(&self) -> String {
        format!("{}/measurements", self.base_url.trim_end_matches('/'))
    }

    pub fn locations_url(&self) -> String {
        format!("{}/locations", self.base_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField {
                field: "descriptor.name",
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidFieldMapping {
                descriptor: self.name.clone(),
                reason: format!("base url '{}' is not http(s)", self.base_url),
            });
        }
        let wire_ok = match self.version {
            ApiVersion::V2 => Parameter::ALL
                .iter()
                .all(|parameter| self.mapping.wire_code(*parameter).is_some()),
            ApiVersion::V3 => Parameter::ALL
                .iter()
                .all(|parameter| self.mapping.wire_id(*parameter).is_some()),
        };
        if !wire_ok {
            return Err(ValidationError::InvalidFieldMapping {
                descriptor: self.name.clone(),
                reason: format!(
                    "{} endpoints need a wire {} for every parameter",
                    self.version,
                    match self.version {
                        ApiVersion::V2 => "code",
                        ApiVersion::V3 => "id",
                    }
                ),
            });
        }
        self.mapping.validate(&self.name)?;
        self.locations.validate(&self.name)
    }

    /// First-page request, or `None` when this endpoint cannot express the
    /// request (for example a v3 endpoint without a numeric id for the country).
    pub fn build_request(&self, request: &FetchRequest) -> Option<HttpRequest> {
        let base = HttpRequest::get(self.measurements_url());

        let http = match self.version {
            ApiVersion::V3 => {
                let country_id = self.country_ids.get(request.country_code())?;
                let parameter_id = self.mapping.wire_id(request.parameter())?;
                let mut http = base
                    .with_query("countries_id", country_id)
                    .with_query("parameters_id", parameter_id)
                    .with_query("limit", request.page_size())
                    .with_query("page", 1)
                    .with_query("sort", "datetime")
                    .with_query("order", "desc");
                if let Some(location_id) = request.location_id() {
                    http = http.with_query("locations_id", location_id);
                }
                http
            }
            ApiVersion::V2 => {
                let code = self.mapping.wire_code(request.parameter())?;
                let mut http = base
                    .with_query("country", request.country_code())
                    .with_query("parameter", code)
                    .with_query("limit", request.page_size())
                    .with_query("page", 1)
                    .with_query("order_by", "datetime")
                    .with_query("sort", "desc");
                if let Some(location_id) = request.location_id() {
                    http = http.with_query("location_id", location_id);
                }
                if let Some(city) = request.city() {
                    http = http.with_query("city", city);
                }
                http
            }
        };

        Some(http)
    }

    /// First-page request listing monitoring locations that report any
    /// supported parameter. The request's parameter does not narrow it.
    pub fn build_locations_request(&self, request: &FetchRequest) -> Option<HttpRequest> {
        let base = HttpRequest::get(self.locations_url());

        let http = match self.version {
            ApiVersion::V3 => {
                let country_id = self.country_ids.get(request.country_code())?;
                let ids = Parameter::ALL
                    .iter()
                    .map(|parameter| self.mapping.wire_id(*parameter).map(|id| id.to_string()))
                    .collect::<Option<Vec<_>>>()?;
                base.with_query("countries_id", country_id)
                    .with_query("parameters_id", ids.join(","))
                    .with_query("limit", request.page_size())
                    .with_query("page", 1)
            }
            ApiVersion::V2 => {
                let codes = Parameter::ALL
                    .iter()
                    .map(|parameter| self.mapping.wire_code(*parameter))
                    .collect::<Option<Vec<_>>>()?;
                let mut http = base
                    .with_query("country", request.country_code())
                    .with_query("parameter", codes.join(","))
                    .with_query("limit", request.page_size())
                    .with_query("page", 1)
                    .with_query("order_by", "lastUpdated")
                    .with_query("sort", "desc");
                if let Some(city) = request.city() {
                    http = http.with_query("city", city);
                }
                http
            }
        };

        Some(http)
    }
}

/// Validates every descriptor and rejects duplicate names.
pub fn validate_descriptors(descriptors: &[EndpointDescriptor]) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for descriptor in descriptors {
        descriptor.validate()?;
        if !names.insert(descriptor.name.as_str()) {
            return Err(ValidationError::DuplicateDescriptor {
                name: descriptor.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pm25_request(country: &str) -> FetchRequest {
        FetchRequest::builder(Parameter::Pm25)
            .country_code(country)
            .city("Delhi")
            .build()
            .expect("valid request")
    }

    #[test]
    fn default_descriptors_are_valid() {
        validate_descriptors(&EndpointDescriptor::defaults()).expect("defaults validate");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = validate_descriptors(&[
            EndpointDescriptor::openaq_v2(),
            EndpointDescriptor::openaq_v2(),
        ])
        .expect_err("duplicate");
        assert_eq!(
            err,
            ValidationError::DuplicateDescriptor {
                name: String::from("openaq-v2")
            }
        );
    }

    #[test]
    fn parameter_table_must_be_exhaustive() {
        let mut descriptor = EndpointDescriptor::openaq_v2();
        descriptor
            .mapping
            .parameters
            .retain(|(_, parameter)| *parameter == Parameter::Pm25);

        assert!(matches!(
            descriptor.validate(),
            Err(ValidationError::InvalidFieldMapping { .. })
        ));
    }

    #[test]
    fn v3_request_uses_numeric_ids() {
        let http = EndpointDescriptor::openaq_v3()
            .build_request(&pm25_request("IN"))
            .expect("expressible");

        assert_eq!(http.url, "https://api.openaq.org/v3/measurements");
        assert_eq!(http.query_value("countries_id"), Some("91"));
        assert_eq!(http.query_value("parameters_id"), Some("2"));
        assert_eq!(http.query_value("sort"), Some("datetime"));
        assert_eq!(http.query_value("order"), Some("desc"));
        assert_eq!(http.query_value("city"), None);
    }

    #[test]
    fn locations_request_lists_every_parameter() {
        let v3 = EndpointDescriptor::openaq_v3()
            .build_locations_request(&pm25_request("IN"))
            .expect("expressible");
        assert_eq!(v3.url, format!("{OPENAQ_V3_BASE_URL}/locations"));
        assert_eq!(v3.query_value("countries_id"), Some("91"));
        assert_eq!(v3.query_value("parameters_id"), Some("2,1"));

        let v2 = EndpointDescriptor::openaq_v2()
            .build_locations_request(&pm25_request("IN"))
            .expect("expressible");
        assert_eq!(v2.url, format!("{OPENAQ_V2_BASE_URL}/locations"));
        assert_eq!(v2.query_value("parameter"), Some("pm25,pm10"));
        assert_eq!(v2.query_value("order_by"), Some("lastUpdated"));
        assert_eq!(v2.query_value("city"), Some("Delhi"));
    }

    #[test]
    fn v3_skips_unmapped_countries() {
        assert!(EndpointDescriptor::openaq_v3()
            .build_request(&pm25_request("NP"))
            .is_none());
    }

    #[test]
    fn v2_request_uses_codes_and_city() {
        let http = EndpointDescriptor::openaq_v2_mirror()
            .build_request(&pm25_request("IN"))
            .expect("expressible");

        assert!(http.url.starts_with(OPENAQ_V2_MIRROR_BASE_URL));
        assert_eq!(http.query_value("country"), Some("IN"));
        assert_eq!(http.query_value("parameter"), Some("pm25"));
        assert_eq!(http.query_value("order_by"), Some("datetime"));
        assert_eq!(http.query_value("city"), Some("Delhi"));
    }

    #[test]
    fn lookup_follows_dotted_paths() {
        let record = json!({"date": {"utc": "2024-01-01T00:00:00Z"}, "parameter": {"id": 2}});
        let mapping = FieldMapping::openaq_v3();

        assert_eq!(
            lookup(&record, "date.utc").and_then(Value::as_str),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            first_present(&record, &mapping.parameter).and_then(|v| mapping.parameter_for(v)),
            Some(Parameter::Pm25)
        );
    }
}

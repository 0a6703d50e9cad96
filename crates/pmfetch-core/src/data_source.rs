//! Request and result types for the acquisition pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`FetchRequest`] | Validated, immutable description of what to acquire |
//! | [`FetchOutcome`] | Non-empty table plus provenance and completeness |
//! | [`FetchError`] | Hard failures returned to the caller |

use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::domain::{DateWindow, Measurement, Parameter};
use crate::normalize::SkipTally;
use crate::retry::Cancelled;
use crate::ValidationError;

pub const DEFAULT_COUNTRY: &str = "IN";
pub const DEFAULT_PAGE_SIZE: usize = 1_000;
pub const DEFAULT_MAX_RECORDS: usize = 100_000;

/// What to acquire. Built through [`FetchRequestBuilder`]; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    parameter: Parameter,
    country_code: String,
    location_id: Option<String>,
    city: Option<String>,
    page_size: usize,
    max_records: usize,
    window: Option<DateWindow>,
}

impl FetchRequest {
    /// Request with reference defaults for one parameter in India.
    pub fn new(parameter: Parameter) -> Self {
        Self {
            parameter,
            country_code: String::from(DEFAULT_COUNTRY),
            location_id: None,
            city: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
            window: None,
        }
    }

    pub fn builder(parameter: Parameter) -> FetchRequestBuilder {
        FetchRequestBuilder {
            parameter,
            country_code: String::from(DEFAULT_COUNTRY),
            location_id: None,
            city: None,
            page_size: DEFAULT_PAGE_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
            window: None,
        }
    }

    pub const fn parameter(&self) -> Parameter {
        self.parameter
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub const fn max_records(&self) -> usize {
        self.max_records
    }

    pub const fn window(&self) -> Option<DateWindow> {
        self.window
    }

    /// Same filters for a different parameter.
    pub fn for_parameter(&self, parameter: Parameter) -> Self {
        Self {
            parameter,
            ..self.clone()
        }
    }
}

/// Builder that validates every field in [`FetchRequestBuilder::build`].
#[derive(Debug, Clone)]
pub struct FetchRequestBuilder {
    parameter: Parameter,
    country_code: String,
    location_id: Option<String>,
    city: Option<String>,
    page_size: usize,
    max_records: usize,
    window: Option<DateWindow>,
}

impl FetchRequestBuilder {
    pub fn country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    pub fn location_id(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn max_records(mut self, max_records: usize) -> Self {
        self.max_records = max_records;
        self
    }

    pub fn window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn build(self) -> Result<FetchRequest, ValidationError> {
        let country_code = self.country_code.trim().to_ascii_uppercase();
        if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode {
                value: self.country_code,
            });
        }
        if self.page_size == 0 {
            return Err(ValidationError::ZeroLimit { field: "page_size" });
        }
        if self.max_records == 0 {
            return Err(ValidationError::ZeroLimit {
                field: "max_records",
            });
        }

        Ok(FetchRequest {
            parameter: self.parameter,
            country_code,
            location_id: non_blank(self.location_id, "location_id")?,
            city: non_blank(self.city, "city")?,
            page_size: self.page_size,
            max_records: self.max_records,
            window: self.window,
        })
    }
}

fn non_blank(
    value: Option<String>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match value {
        Some(value) if value.trim().is_empty() => Err(ValidationError::EmptyField { field }),
        Some(value) => Ok(Some(value.trim().to_owned())),
        None => Ok(None),
    }
}

/// Where the rows of a result came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provenance {
    Live { descriptor: String },
    Synthetic,
}

impl Provenance {
    pub fn live(descriptor: impl Into<String>) -> Self {
        Self::Live {
            descriptor: descriptor.into(),
        }
    }

    pub const fn is_synthetic(&self) -> bool {
        matches!(self, Self::Synthetic)
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live { descriptor } => write!(f, "live:{descriptor}"),
            Self::Synthetic => f.write_str("synthetic"),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Whether the live drain reached the natural end of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    /// The record cap was reached before the collection ended.
    Capped,
    /// A page failed after earlier pages succeeded.
    Partial { failed_page: u32, reason: String },
}

/// One descriptor tried by the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointAttempt {
    pub descriptor: String,
    pub pages_requested: u32,
    pub records: usize,
    /// `None` when the descriptor produced the returned rows.
    pub failure: Option<String>,
}

impl EndpointAttempt {
    pub fn skipped(descriptor: &str, reason: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.to_owned(),
            pages_requested: 0,
            records: 0,
            failure: Some(reason.into()),
        }
    }
}

/// Successful pipeline result; `measurements` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub parameter: Parameter,
    pub measurements: Vec<Measurement>,
    pub provenance: Provenance,
    pub skipped: SkipTally,
    pub completeness: Completeness,
    pub attempts: Vec<EndpointAttempt>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

impl FetchOutcome {
    /// Separates the rows from the bookkeeping.
    pub fn split(self) -> (Vec<Measurement>, ParameterReport) {
        let report = ParameterReport {
            parameter: self.parameter,
            provenance: self.provenance,
            records: self.measurements.len(),
            skipped: self.skipped,
            completeness: self.completeness,
            attempts: self.attempts,
            warnings: self.warnings,
            latency_ms: self.latency_ms,
        };
        (self.measurements, report)
    }
}

/// [`FetchOutcome`] without its rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterReport {
    pub parameter: Parameter,
    pub provenance: Provenance,
    pub records: usize,
    pub skipped: SkipTally,
    pub completeness: Completeness,
    pub attempts: Vec<EndpointAttempt>,
    pub warnings: Vec<String>,
    pub latency_ms: u64,
}

/// Hard failures returned to the caller. Upstream trouble never surfaces here;
/// it ends in the synthetic fallback instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("fetch cancelled")]
    Cancelled,
}

impl From<Cancelled> for FetchError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl FetchError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "fetch.invalid_request",
            Self::Cancelled => "fetch.cancelled",
        }
    }
}

pub type FetchResult = Result<FetchOutcome, FetchError>;

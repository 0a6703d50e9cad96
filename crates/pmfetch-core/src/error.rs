use thiserror::Error;

/// Validation and contract errors exposed by `pmfetch-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid parameter '{value}', expected one of pm25, pm10")]
    UnknownParameter { value: String },

    #[error("country code must be two ASCII letters: '{value}'")]
    InvalidCountryCode { value: String },
    #[error("field '{field}' must be greater than zero")]
    ZeroLimit { field: &'static str },
    #[error("field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unparseable timestamp: '{value}'")]
    InvalidTimestamp { value: String },
    #[error("date window starts after it ends: {start} > {end}")]
    InvertedWindow { start: String, end: String },
    #[error("year {year} is outside the supported range")]
    InvalidYear { year: i32 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' is outside the geographic range: {value}")]
    CoordinateOutOfRange { field: &'static str, value: f64 },

    #[error("descriptor '{descriptor}' has an invalid field mapping: {reason}")]
    InvalidFieldMapping { descriptor: String, reason: String },
    #[error("descriptor name '{name}' is used more than once")]
    DuplicateDescriptor { name: String },
    #[error("station table must contain at least one station")]
    EmptyStationTable,

    #[error("invalid configuration value for {key}: '{value}'")]
    InvalidConfig { key: &'static str, value: String },
}

/// Top-level error type for core operations outside the fetch path.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

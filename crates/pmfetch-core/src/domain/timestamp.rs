use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Strict parse: RFC3339 with a `Z`/`+00:00` offset.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    /// Accepts any RFC3339 offset (converted to UTC) or a naive
    /// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` string read as UTC.
    pub fn parse_lenient(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
            return Ok(Self(parsed.to_offset(UtcOffset::UTC)));
        }

        for format in [NAIVE_SPACE, NAIVE_T] {
            let description = time::format_description::parse(format).map_err(|_| {
                ValidationError::InvalidTimestamp {
                    value: input.to_owned(),
                }
            })?;
            if let Ok(parsed) = PrimitiveDateTime::parse(trimmed, &description) {
                return Ok(Self(parsed.assume_utc()));
            }
        }

        Err(ValidationError::InvalidTimestamp {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    /// Midnight-based wall clock on `date`; `hour` is taken modulo 24.
    pub fn at_hour(date: Date, hour: u8) -> Self {
        let time = Time::from_hms(hour % 24, 0, 0).unwrap_or(Time::MIDNIGHT);
        Self(PrimitiveDateTime::new(date, time).assume_utc())
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn date(self) -> Date {
        self.0.date()
    }

    pub fn month(self) -> u8 {
        u8::from(self.0.month())
    }

    pub fn hour(self) -> u8 {
        self.0.hour()
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }

    /// `YYYY-MM-DD HH:MM:SS`, the layout used in CSV exports.
    pub fn format_naive(self) -> String {
        let Ok(description) = time::format_description::parse(NAIVE_SPACE) else {
            return self.format_rfc3339();
        };
        self.0
            .format(&description)
            .unwrap_or_else(|_| self.format_rfc3339())
    }
}

const NAIVE_SPACE: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";
const NAIVE_T: &str = "[year]-[month]-[day]T[hour]:[minute]:[second]";

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

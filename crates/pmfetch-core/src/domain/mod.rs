//! # Domain Models
//!
//! Canonical types for particulate-matter acquisition.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Measurement`] | One pollutant reading at a station and instant |
//! | [`Parameter`] | PM2.5 or PM10 |
//! | [`Station`] / [`StationTable`] | Monitoring sites with synthetic baselines |
//! | [`Season`] | Month partition shared by labels and the synthetic model |
//! | [`AqiCategory`] / [`Region`] | Enrichment used by exports |
//! | [`DateWindow`] | Inclusive calendar-date range |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Constructors validate their invariants and return [`crate::ValidationError`].

mod classification;
mod measurement;
mod parameter;
mod season;
mod station;
mod timestamp;
mod window;

pub use classification::{AqiCategory, Region};
pub use measurement::{checked_latitude, checked_longitude, DataOrigin, Measurement, ABSENT_STATION};
pub use parameter::Parameter;
pub use season::Season;
pub use station::{Station, StationTable};
pub use timestamp::UtcDateTime;
pub use window::DateWindow;
pub(crate) use window::validate_year;

//! # pmfetch Core
//!
//! Resilient acquisition of particulate-matter (PM2.5, PM10) measurements.
//!
//! ## Overview
//!
//! - **Transport** with typed outcomes instead of transport errors
//! - **Retry/backoff** around every request, honoring cancellation
//! - **Pagination** that drains an endpoint to a short page, a cap or a failure
//! - **Fallback chain** over typed endpoint descriptors (OpenAQ v3, v2, v2 mirror)
//! - **Synthetic generator** with a seasonal/diurnal model when no endpoint delivers
//! - **Assembly** that deduplicates and orders the final table
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`http_client`] | HTTP transport abstraction |
//! | [`retry`] | Backoff strategy and retry loop |
//! | [`pagination`] | Page draining |
//! | [`descriptor`] | Endpoint descriptors and field mappings |
//! | [`routing`] | Fallback chain and its builder |
//! | [`normalize`] | JSON to [`Measurement`] mapping |
//! | [`locations`] | Monitoring-location listings |
//! | [`synthetic`] | Deterministic synthetic generator |
//! | [`assemble`] | Deduplication and ordering |
//! | [`analysis`] | Summary statistics and ML-ready rows |
//! | [`export`] | CSV writers |
//! | [`config`] | Pipeline configuration |
//! | [`domain`] | Domain models |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pmfetch_core::{FallbackChainBuilder, FetchRequest, Parameter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let chain = FallbackChainBuilder::from_env()?.build()?;
//!     let request = FetchRequest::builder(Parameter::Pm25).city("Delhi").build()?;
//!
//!     let outcome = chain.fetch(&request).await?;
//!     println!("{} rows from {}", outcome.measurements.len(), outcome.provenance);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Upstream failures never reach the caller: they are retried, recorded as
//! endpoint attempts, and finally replaced by synthetic data. Only
//! [`FetchError::InvalidRequest`] and [`FetchError::Cancelled`] are returned.

pub mod analysis;
pub mod assemble;
pub mod config;
pub mod data_source;
pub mod descriptor;
pub mod domain;
pub mod error;
pub mod export;
pub mod http_client;
pub mod locations;
pub mod normalize;
pub mod pagination;
pub mod retry;
pub mod routing;
pub mod synthetic;

pub use analysis::{ml_ready, summarize, MlRow, SummaryRow, SummaryScope};
pub use assemble::{assemble, Assembled};
pub use config::{PipelineConfig, SyntheticConfig};
pub use data_source::{
    Completeness, EndpointAttempt, FetchError, FetchOutcome, FetchRequest, FetchRequestBuilder,
    FetchResult, ParameterReport, Provenance,
};
pub use descriptor::{ApiVersion, EndpointDescriptor, FieldMapping, LocationMapping, ParameterKey};
pub use domain::{
    AqiCategory, DataOrigin, DateWindow, Measurement, Parameter, Region, Season, Station,
    StationTable, UtcDateTime, ABSENT_STATION,
};
pub use error::{CoreError, ValidationError};
pub use export::{export_dataset, ExportKind, ExportOptions, ExportedFile};
pub use http_client::{
    HttpAuth, HttpClient, HttpOutcome, HttpRequest, OfflineHttpClient, ReqwestHttpClient,
    ScriptedHttpClient,
};
pub use locations::{parse_locations, Location, LocationDiscovery};
pub use normalize::{normalize, NormalizedPage, SkipTally};
pub use pagination::{DrainEnd, DrainReport, PageDrain, PagePlan, Paginator, RawPage};
pub use retry::{Attempted, Backoff, Cancelled, RetryConfig, RetryPolicy};
pub use routing::{CombinedOutcome, FallbackChain, FallbackChainBuilder};
pub use synthetic::{SyntheticBatch, SyntheticGenerator, DEFAULT_SEED};

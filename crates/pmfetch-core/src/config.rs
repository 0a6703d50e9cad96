//! Pipeline configuration with environment overrides.
//!
//! # Environment Variables
//!
//! | Setting | Primary Env Var | Fallback Env Var |
//! |---------|-----------------|------------------|
//! | OpenAQ API key | `PMFETCH_OPENAQ_API_KEY` | `OPENAQ_API_KEY` |
//! | Synthetic seed | `PMFETCH_SYNTHETIC_SEED` | - |
//! | Synthetic year | `PMFETCH_SYNTHETIC_YEAR` | - |
//! | Page delay (ms) | `PMFETCH_PAGE_DELAY_MS` | - |
//! | Request timeout (ms) | `PMFETCH_TIMEOUT_MS` | - |
//! | Max attempts per request | `PMFETCH_MAX_ATTEMPTS` | - |

use std::env;
use std::fmt::{Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use crate::descriptor::{validate_descriptors, EndpointDescriptor};
use crate::domain::validate_year;
use crate::pagination::DEFAULT_PAGE_DELAY;
use crate::retry::RetryConfig;
use crate::synthetic::{DEFAULT_SEED, DEFAULT_YEAR};
use crate::ValidationError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("pmfetch/", env!("CARGO_PKG_VERSION"));

/// Seed and default year for the synthetic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    pub seed: u64,
    /// Year generated when a request carries no window.
    pub year: i32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            year: DEFAULT_YEAR,
        }
    }
}

/// Everything the fallback chain needs besides its transport and stations.
#[derive(Clone, PartialEq)]
pub struct PipelineConfig {
    pub descriptors: Vec<EndpointDescriptor>,
    pub retry: RetryConfig,
    pub page_delay: Duration,
    pub request_timeout: Duration,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub synthetic: SyntheticConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            descriptors: EndpointDescriptor::defaults(),
            retry: RetryConfig::default(),
            page_delay: DEFAULT_PAGE_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            api_key: None,
            user_agent: String::from(DEFAULT_USER_AGENT),
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl Debug for PipelineConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field(
                "descriptors",
                &self
                    .descriptors
                    .iter()
                    .map(|descriptor| descriptor.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("retry", &self.retry)
            .field("page_delay", &self.page_delay)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("synthetic", &self.synthetic)
            .finish()
    }
}

impl PipelineConfig {
    /// Defaults overlaid with process environment variables.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`; blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.api_key = read("PMFETCH_OPENAQ_API_KEY").or_else(|| read("OPENAQ_API_KEY"));
        if let Some(seed) = parse_var::<u64>(read("PMFETCH_SYNTHETIC_SEED"), "PMFETCH_SYNTHETIC_SEED")? {
            config.synthetic.seed = seed;
        }
        if let Some(year) = parse_var::<i32>(read("PMFETCH_SYNTHETIC_YEAR"), "PMFETCH_SYNTHETIC_YEAR")? {
            config.synthetic.year = year;
        }
        if let Some(ms) = parse_var::<u64>(read("PMFETCH_PAGE_DELAY_MS"), "PMFETCH_PAGE_DELAY_MS")? {
            config.page_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(read("PMFETCH_TIMEOUT_MS"), "PMFETCH_TIMEOUT_MS")? {
            config.request_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(read("PMFETCH_MAX_ATTEMPTS"), "PMFETCH_MAX_ATTEMPTS")? {
            config.retry.max_attempts = attempts;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_descriptors(&self.descriptors)?;
        if self.retry.max_attempts == 0 {
            return Err(ValidationError::InvalidConfig {
                key: "retry.max_attempts",
                value: String::from("0"),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ValidationError::InvalidConfig {
                key: "request_timeout",
                value: String::from("0ms"),
            });
        }
        validate_year(self.synthetic.year)?;
        Ok(())
    }

    pub fn request_timeout_ms(&self) -> u64 {
        u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX)
    }
}

fn parse_var<T: FromStr>(
    value: Option<String>,
    key: &'static str,
) -> Result<Option<T>, ValidationError> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ValidationError::InvalidConfig { key, value: raw })
        })
        .transpose()
}

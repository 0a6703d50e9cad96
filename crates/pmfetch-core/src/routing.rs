use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::assemble::assemble;
use crate::config::PipelineConfig;
use crate::data_source::{
    Completeness, EndpointAttempt, FetchError, FetchOutcome, FetchRequest, FetchResult,
    ParameterReport, Provenance,
};
use crate::descriptor::EndpointDescriptor;
use crate::domain::{Measurement, Parameter, StationTable};
use crate::http_client::{
    HttpAuth, HttpClient, HttpRequest, OfflineHttpClient, ReqwestHttpClient,
};
use crate::locations::{parse_locations, LocationDiscovery};
use crate::normalize::{normalize, SkipTally};
use crate::pagination::{DrainEnd, PagePlan, Paginator};
use crate::retry::RetryPolicy;
use crate::synthetic::SyntheticGenerator;
use crate::ValidationError;

/// One table covering several parameters, with a report per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedOutcome {
    pub measurements: Vec<Measurement>,
    pub reports: Vec<ParameterReport>,
    pub latency_ms: u64,
}

impl CombinedOutcome {
    /// True when at least one parameter fell back to synthetic data.
    pub fn any_synthetic(&self) -> bool {
        self.reports
            .iter()
            .any(|report| report.provenance.is_synthetic())
    }
}

/// Ordered endpoint descriptors with a synthetic generator behind them.
pub struct FallbackChain {
    descriptors: Vec<EndpointDescriptor>,
    paginator: Paginator,
    generator: SyntheticGenerator,
    auth: HttpAuth,
    user_agent: String,
    timeout_ms: u64,
    synthetic_year: i32,
}

impl FallbackChain {
    pub fn builder() -> FallbackChainBuilder {
        FallbackChainBuilder::new()
    }

    pub fn descriptors(&self) -> &[EndpointDescriptor] {
        &self.descriptors
    }

    pub fn generator(&self) -> &SyntheticGenerator {
        &self.generator
    }

    pub async fn fetch(&self, request: &FetchRequest) -> FetchResult {
        self.fetch_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Tries each descriptor in order and returns the first non-empty table;
    /// falls back to synthetic data when none delivers.
    pub async fn fetch_with_cancel(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> FetchResult {
        let started = Instant::now();
        let parameter = request.parameter();
        let mut attempts = Vec::with_capacity(self.descriptors.len());
        let mut warnings = Vec::new();
        let mut skipped = SkipTally::default();

        for descriptor in &self.descriptors {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let Some(http) = descriptor.build_request(request) else {
                info!(
                    descriptor = %descriptor.name,
                    country = request.country_code(),
                    "descriptor cannot express request, skipping"
                );
                attempts.push(EndpointAttempt::skipped(
                    &descriptor.name,
                    format!(
                        "{} endpoint cannot express country '{}' / parameter {}",
                        descriptor.version,
                        request.country_code(),
                        parameter
                    ),
                ));
                continue;
            };

            let plan = self.page_plan(
                http,
                &descriptor.mapping.results,
                request,
                Some(parameter),
            );

            info!(descriptor = %descriptor.name, %parameter, "draining endpoint");
            let report = self.paginator.drain(plan, cancel).collect_pages().await;

            let completeness = match &report.end {
                DrainEnd::Exhausted => Completeness::Complete,
                DrainEnd::Capped => Completeness::Capped,
                DrainEnd::Failed { page, reason } => Completeness::Partial {
                    failed_page: *page,
                    reason: reason.clone(),
                },
                DrainEnd::Cancelled => return Err(FetchError::Cancelled),
            };

            let mut descriptor_skips = SkipTally::default();
            let pages = report
                .pages
                .iter()
                .map(|page| {
                    let normalized = normalize(page, descriptor);
                    descriptor_skips.merge(&normalized.skipped);
                    normalized.measurements
                })
                .collect::<Vec<_>>();
            let assembled = assemble(pages);
            skipped.merge(&descriptor_skips);

            let failure = match (&report.end, assembled.measurements.is_empty()) {
                (DrainEnd::Failed { page, reason }, _) => Some(format!("page {page}: {reason}")),
                (_, true) => Some(String::from("no usable records")),
                _ => None,
            };
            attempts.push(EndpointAttempt {
                descriptor: descriptor.name.clone(),
                pages_requested: report.pages_requested,
                records: assembled.measurements.len(),
                failure: failure.clone(),
            });

            if assembled.measurements.is_empty() {
                warn!(
                    descriptor = %descriptor.name,
                    pages = report.pages_requested,
                    skipped = descriptor_skips.total(),
                    reason = failure.as_deref().unwrap_or_default(),
                    "endpoint yielded no records, trying next"
                );
                continue;
            }

            let failed_before = attempts.len() - 1;
            if failed_before > 0 {
                warnings.push(format!(
                    "live fallback succeeded with '{}' after {} failed attempt(s)",
                    descriptor.name, failed_before
                ));
            }
            if let Completeness::Partial {
                failed_page,
                reason,
            } = &completeness
            {
                warnings.push(format!(
                    "'{}' failed on page {failed_page} ({reason}); table is partial",
                    descriptor.name
                ));
            }
            if assembled.conflicts_resolved > 0 {
                warnings.push(format!(
                    "{} conflicting duplicate record(s) resolved by keeping the first",
                    assembled.conflicts_resolved
                ));
            }

            info!(
                descriptor = %descriptor.name,
                %parameter,
                records = assembled.measurements.len(),
                skipped = skipped.total(),
                "live data acquired"
            );
            return Ok(FetchOutcome {
                parameter,
                measurements: assembled.measurements,
                provenance: Provenance::live(descriptor.name.as_str()),
                skipped,
                completeness,
                attempts,
                warnings,
                latency_ms: elapsed_ms(started),
            });
        }

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        if self.descriptors.is_empty() {
            info!(%parameter, "no live endpoints configured, generating synthetic data");
            warnings.push(String::from(
                "no live endpoints configured; using synthetic data",
            ));
        } else {
            warn!(
                %parameter,
                endpoints = self.descriptors.len(),
                "all live endpoints exhausted, generating synthetic data"
            );
            warnings.push(format!(
                "all {} live endpoint(s) returned no usable records; using synthetic data",
                self.descriptors.len()
            ));
        }

        let batch = self
            .generator
            .generate_request(request, self.synthetic_year)?;
        warnings.extend(batch.warnings);
        let assembled = assemble([batch.measurements]);

        Ok(FetchOutcome {
            parameter,
            measurements: assembled.measurements,
            provenance: Provenance::Synthetic,
            skipped,
            completeness: Completeness::Complete,
            attempts,
            warnings,
            latency_ms: elapsed_ms(started),
        })
    }

    /// Lists the monitoring locations of the request's country (and city, where
    /// the endpoint supports it) from the first descriptor that returns any.
    /// There is no synthetic stand-in: an empty listing has `source == None`.
    pub async fn discover_locations(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<LocationDiscovery, FetchError> {
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(self.descriptors.len());
        let mut warnings = Vec::new();
        let mut skipped = 0;

        for descriptor in &self.descriptors {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let Some(http) = descriptor.build_locations_request(request) else {
                attempts.push(EndpointAttempt::skipped(
                    &descriptor.name,
                    format!(
                        "{} endpoint cannot list locations for country '{}'",
                        descriptor.version,
                        request.country_code()
                    ),
                ));
                continue;
            };

            let plan = self.page_plan(http, &descriptor.locations.results, request, None);
            info!(descriptor = %descriptor.name, "listing locations");
            let report = self.paginator.drain(plan, cancel).collect_pages().await;
            if report.end == DrainEnd::Cancelled {
                return Err(FetchError::Cancelled);
            }

            let (locations, dropped) = parse_locations(&report.pages, &descriptor.locations);
            skipped += dropped;

            let failure = match (&report.end, locations.is_empty()) {
                (DrainEnd::Failed { page, reason }, _) => Some(format!("page {page}: {reason}")),
                (_, true) => Some(String::from("no usable locations")),
                _ => None,
            };
            attempts.push(EndpointAttempt {
                descriptor: descriptor.name.clone(),
                pages_requested: report.pages_requested,
                records: locations.len(),
                failure: failure.clone(),
            });

            if locations.is_empty() {
                warn!(
                    descriptor = %descriptor.name,
                    reason = failure.as_deref().unwrap_or_default(),
                    "endpoint listed no locations, trying next"
                );
                continue;
            }

            let failed_before = attempts.len() - 1;
            if failed_before > 0 {
                warnings.push(format!(
                    "location listing succeeded with '{}' after {} failed attempt(s)",
                    descriptor.name, failed_before
                ));
            }
            if let DrainEnd::Failed { page, reason } = &report.end {
                warnings.push(format!(
                    "'{}' failed on page {page} ({reason}); listing is partial",
                    descriptor.name
                ));
            }

            info!(
                descriptor = %descriptor.name,
                locations = locations.len(),
                "locations listed"
            );
            return Ok(LocationDiscovery {
                source: Some(descriptor.name.clone()),
                locations,
                skipped,
                attempts,
                warnings,
                latency_ms: elapsed_ms(started),
            });
        }

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        warn!(
            endpoints = self.descriptors.len(),
            "no endpoint listed any locations"
        );
        warnings.push(format!(
            "none of {} live endpoint(s) listed any locations",
            self.descriptors.len()
        ));

        Ok(LocationDiscovery {
            source: None,
            locations: Vec::new(),
            skipped,
            attempts,
            warnings,
            latency_ms: elapsed_ms(started),
        })
    }

    fn page_plan(
        &self,
        http: HttpRequest,
        results_path: &str,
        request: &FetchRequest,
        parameter_hint: Option<Parameter>,
    ) -> PagePlan {
        PagePlan {
            request: http
                .with_auth(&self.auth)
                .with_header("user-agent", self.user_agent.as_str())
                .with_timeout_ms(self.timeout_ms),
            results_path: results_path.to_owned(),
            page_size: request.page_size(),
            max_records: request.max_records(),
            parameter_hint,
        }
    }

    /// Fetches each parameter concurrently with the same filters and merges the
    /// results into one table.
    pub async fn fetch_parameters(
        &self,
        request: &FetchRequest,
        parameters: &[Parameter],
        cancel: &CancellationToken,
    ) -> Result<CombinedOutcome, FetchError> {
        let started = Instant::now();
        let mut unique = parameters.to_vec();
        unique.sort();
        unique.dedup();

        let requests = unique
            .iter()
            .map(|parameter| request.for_parameter(*parameter))
            .collect::<Vec<_>>();
        let results = join_all(
            requests
                .iter()
                .map(|request| self.fetch_with_cancel(request, cancel)),
        )
        .await;

        let mut tables = Vec::with_capacity(results.len());
        let mut reports = Vec::with_capacity(results.len());
        for result in results {
            let (measurements, report) = result?.split();
            tables.push(measurements);
            reports.push(report);
        }

        Ok(CombinedOutcome {
            measurements: assemble(tables).measurements,
            reports,
            latency_ms: elapsed_ms(started),
        })
    }
}

/// Builds a [`FallbackChain`] from configuration, a transport and stations.
///
/// ```rust,ignore
/// use pmfetch_core::FallbackChainBuilder;
///
/// let chain = FallbackChainBuilder::from_env()?.build()?;
/// let offline = FallbackChainBuilder::new().offline().build()?;
/// ```
#[derive(Default)]
pub struct FallbackChainBuilder {
    config: PipelineConfig,
    client: Option<Arc<dyn HttpClient>>,
    stations: Option<Arc<StationTable>>,
    offline: bool,
}

impl FallbackChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`PipelineConfig::from_env`].
    pub fn from_env() -> Result<Self, ValidationError> {
        Ok(Self::new().with_config(PipelineConfig::from_env()?))
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn with_descriptors(mut self, descriptors: Vec<EndpointDescriptor>) -> Self {
        self.config.descriptors = descriptors;
        self
    }

    pub fn with_http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Drops every descriptor and never touches the network; every fetch ends
    /// in synthetic data.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    pub fn with_stations(mut self, stations: Arc<StationTable>) -> Self {
        self.stations = Some(stations);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.synthetic.seed = seed;
        self
    }

    pub fn build(self) -> Result<FallbackChain, ValidationError> {
        self.config.validate()?;

        let client: Arc<dyn HttpClient> = if self.offline {
            Arc::new(OfflineHttpClient)
        } else if let Some(client) = self.client {
            client
        } else {
            Arc::new(ReqwestHttpClient::new(&self.config.user_agent))
        };
        let stations = self
            .stations
            .unwrap_or_else(|| Arc::new(StationTable::india_reference()));

        Ok(FallbackChain {
            paginator: Paginator::new(
                client,
                RetryPolicy::new(self.config.retry.clone()),
                self.config.page_delay,
            ),
            generator: SyntheticGenerator::new(stations, self.config.synthetic.seed),
            auth: HttpAuth::api_key(self.config.api_key.as_deref()),
            timeout_ms: self.config.request_timeout_ms(),
            synthetic_year: self.config.synthetic.year,
            user_agent: self.config.user_agent,
            descriptors: if self.offline {
                Vec::new()
            } else {
                self.config.descriptors
            },
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

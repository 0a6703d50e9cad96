//! Draining of paged `measurements` collections.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::descriptor::lookup;
use crate::domain::Parameter;
use crate::http_client::{HttpClient, HttpOutcome, HttpRequest};
use crate::retry::RetryPolicy;

/// Pause between consecutive page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(500);

/// One page of raw upstream records.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    /// 1-based page index.
    pub index: u32,
    pub records: Vec<Value>,
    /// Parameter the page was requested for; used when a record omits it.
    pub parameter_hint: Option<Parameter>,
}

/// What to drain: the first-page request and the limits that end the drain.
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub request: HttpRequest,
    /// Dotted path of the results array inside each response body.
    pub results_path: String,
    pub page_size: usize,
    pub max_records: usize,
    pub parameter_hint: Option<Parameter>,
}

/// Why a drain stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainEnd {
    /// A short or empty page marked the end of the collection.
    Exhausted,
    /// The record cap was reached; the final page was truncated to fit.
    Capped,
    Failed { page: u32, reason: String },
    Cancelled,
}

/// Everything a finished drain produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainReport {
    pub pages: Vec<RawPage>,
    pub pages_requested: u32,
    pub records: usize,
    pub end: DrainEnd,
}

impl DrainReport {
    /// A failure after at least one usable page.
    pub fn is_partial(&self) -> bool {
        matches!(self.end, DrainEnd::Failed { .. }) && self.records > 0
    }
}

/// Issues page requests through the retry policy, pausing between pages.
#[derive(Clone)]
pub struct Paginator {
    client: Arc<dyn HttpClient>,
    policy: RetryPolicy,
    page_delay: Duration,
}

impl Paginator {
    pub fn new(client: Arc<dyn HttpClient>, policy: RetryPolicy, page_delay: Duration) -> Self {
        Self {
            client,
            policy,
            page_delay,
        }
    }

    pub fn drain<'p>(&'p self, plan: PagePlan, cancel: &CancellationToken) -> PageDrain<'p> {
        PageDrain {
            paginator: self,
            plan,
            cancel: cancel.clone(),
            next_index: 1,
            collected: 0,
            pages_requested: 0,
            end: None,
        }
    }
}

/// Lazy, finite cursor over the pages of one collection. Not restartable:
/// once [`PageDrain::end`] is set, `next_page` keeps returning `None`.
pub struct PageDrain<'p> {
    paginator: &'p Paginator,
    plan: PagePlan,
    cancel: CancellationToken,
    next_index: u32,
    collected: usize,
    pages_requested: u32,
    end: Option<DrainEnd>,
}

impl PageDrain<'_> {
    pub fn end(&self) -> Option<&DrainEnd> {
        self.end.as_ref()
    }

    pub const fn pages_requested(&self) -> u32 {
        self.pages_requested
    }

    pub const fn records(&self) -> usize {
        self.collected
    }

    pub async fn next_page(&mut self) -> Option<RawPage> {
        if self.end.is_some() {
            return None;
        }

        let index = self.next_index;
        if self.plan.page_size == 0 {
            self.end = Some(DrainEnd::Failed {
                page: index,
                reason: String::from("page size must be positive"),
            });
            return None;
        }
        if index > 1 {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.end = Some(DrainEnd::Cancelled);
                    return None;
                }
                _ = tokio::time::sleep(self.paginator.page_delay) => {}
            }
        }

        let mut request = self.plan.request.clone();
        request.set_query("page", index);
        debug!(page = index, url = %request.url, "requesting page");

        let client = self.paginator.client.as_ref();
        let attempted = match self
            .paginator
            .policy
            .execute(&self.cancel, |_| client.send(request.clone()))
            .await
        {
            Ok(attempted) => attempted,
            Err(_) => {
                self.end = Some(DrainEnd::Cancelled);
                return None;
            }
        };
        self.pages_requested += 1;
        self.next_index += 1;

        let body = match attempted.outcome {
            HttpOutcome::Success { body, .. } => body,
            other => {
                let reason = format!(
                    "{} after {} attempt(s)",
                    other.describe(),
                    attempted.attempts
                );
                warn!(page = index, %reason, "page request failed");
                self.end = Some(DrainEnd::Failed {
                    page: index,
                    reason,
                });
                return None;
            }
        };

        let Some(mut records) = lookup(&body, &self.plan.results_path)
            .and_then(Value::as_array)
            .cloned()
        else {
            let reason = format!("response has no '{}' array", self.plan.results_path);
            warn!(page = index, %reason, "page body rejected");
            self.end = Some(DrainEnd::Failed {
                page: index,
                reason,
            });
            return None;
        };

        let fetched = records.len();
        let remaining = self.plan.max_records.saturating_sub(self.collected);
        if fetched > remaining {
            records.truncate(remaining);
            self.end = Some(DrainEnd::Capped);
        } else if fetched == 0 || fetched < self.plan.page_size {
            self.end = Some(DrainEnd::Exhausted);
        } else if fetched == remaining {
            self.end = Some(DrainEnd::Capped);
        }
        self.collected += records.len();

        debug!(
            page = index,
            fetched,
            kept = records.len(),
            total = self.collected,
            "page received"
        );

        if records.is_empty() {
            return None;
        }

        Some(RawPage {
            index,
            records,
            parameter_hint: self.plan.parameter_hint,
        })
    }

    /// Drains every remaining page.
    pub async fn collect_pages(mut self) -> DrainReport {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await {
            pages.push(page);
        }

        DrainReport {
            pages,
            pages_requested: self.pages_requested,
            records: self.collected,
            end: self.end.unwrap_or(DrainEnd::Exhausted),
        }
    }
}

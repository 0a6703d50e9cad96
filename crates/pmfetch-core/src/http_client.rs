use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

const BODY_EXCERPT_CHARS: usize = 200;

/// Authentication strategy applied to outgoing HTTP requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpAuth {
    None,
    Header { name: String, value: String },
}

impl HttpAuth {
    /// `X-API-Key` header auth, or none when the key is absent.
    pub fn api_key(key: Option<&str>) -> Self {
        match key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => Self::Header {
                name: String::from("X-API-Key"),
                value: key.to_owned(),
            },
            None => Self::None,
        }
    }

    pub fn apply(&self, headers: &mut BTreeMap<String, String>) {
        match self {
            Self::None => {}
            Self::Header { name, value } => {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
        }
    }
}

/// One HTTP GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            headers: BTreeMap::new(),
            timeout_ms: 30_000,
        }
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Replaces an existing query parameter or appends it.
    pub fn set_query(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.query.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.query.push((name.to_owned(), value)),
        }
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_auth(mut self, auth: &HttpAuth) -> Self {
        auth.apply(&mut self.headers);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// URL with the percent-encoded query string appended.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }

        let query = self
            .query
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(value)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.url)
    }
}

/// Result of exactly one HTTP attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpOutcome {
    Success { status: u16, body: Value },
    RateLimited { retry_after: Option<Duration> },
    HttpError { status: u16, body_excerpt: String },
    NetworkError { cause: String },
}

impl HttpOutcome {
    pub fn ok(body: Value) -> Self {
        Self::Success { status: 200, body }
    }

    pub fn network(cause: impl Into<String>) -> Self {
        Self::NetworkError {
            cause: cause.into(),
        }
    }

    pub fn http_error(status: u16, body: &str) -> Self {
        Self::HttpError {
            status,
            body_excerpt: excerpt(body),
        }
    }

    /// Rate limits and network failures are worth another attempt.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::NetworkError { .. })
    }

    /// Short human-readable reason used in logs and attempt records.
    pub fn describe(&self) -> String {
        match self {
            Self::Success { status, .. } => format!("http {status}"),
            Self::RateLimited { .. } => String::from("rate limited (http 429)"),
            Self::HttpError {
                status,
                body_excerpt,
            } if body_excerpt.is_empty() => format!("http {status}"),
            Self::HttpError {
                status,
                body_excerpt,
            } => format!("http {status}: {body_excerpt}"),
            Self::NetworkError { cause } => format!("network error: {cause}"),
        }
    }
}

fn excerpt(body: &str) -> String {
    body.trim().chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Transport contract: one attempt, never panics, never returns `Err`.
pub trait HttpClient: Send + Sync {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpOutcome> + Send + 'a>>;
}

/// Production HTTP client using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new(user_agent: &str) -> Self {
        Self {
            client: Arc::new(
                reqwest::Client::builder()
                    .user_agent(user_agent)
                    .build()
                    .unwrap_or_else(|_| reqwest::Client::new()),
            ),
        }
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new(concat!("pmfetch/", env!("CARGO_PKG_VERSION")))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpOutcome> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .get(request.full_url())
                .timeout(Duration::from_millis(request.timeout_ms));
            for (name, value) in &request.headers {
                builder = builder.header(name, value);
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(error) if error.is_timeout() => {
                    return HttpOutcome::network(format!("request timeout: {error}"));
                }
                Err(error) if error.is_connect() => {
                    return HttpOutcome::network(format!("connection failed: {error}"));
                }
                Err(error) => return HttpOutcome::network(format!("request failed: {error}")),
            };

            let status = response.status().as_u16();
            if status == 429 {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);
                return HttpOutcome::RateLimited { retry_after };
            }

            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    return HttpOutcome::network(format!("failed to read response body: {error}"));
                }
            };

            if !(200..300).contains(&status) {
                return HttpOutcome::http_error(status, &body);
            }

            match serde_json::from_str::<Value>(&body) {
                Ok(body) => HttpOutcome::Success { status, body },
                Err(_) => HttpOutcome::http_error(status, &body),
            }
        })
    }
}

/// Transport that never reaches the network; every request fails with
/// `NetworkError`, which forces the synthetic path.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineHttpClient;

impl HttpClient for OfflineHttpClient {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpOutcome> + Send + 'a>> {
        Box::pin(async move {
            HttpOutcome::network(format!("offline mode: {} not requested", request.url))
        })
    }
}

/// Deterministic transport double: replays scripted outcomes per URL prefix
/// and records every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<(String, VecDeque<HttpOutcome>)>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues outcomes for URLs starting with `prefix`, replayed in order.
    pub fn script<I>(self, prefix: impl Into<String>, outcomes: I) -> Self
    where
        I: IntoIterator<Item = HttpOutcome>,
    {
        self.push(prefix, outcomes);
        self
    }

    pub fn push<I>(&self, prefix: impl Into<String>, outcomes: I)
    where
        I: IntoIterator<Item = HttpOutcome>,
    {
        let prefix = prefix.into();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        match routes.iter_mut().find(|(existing, _)| *existing == prefix) {
            Some((_, queue)) => queue.extend(outcomes),
            None => routes.push((prefix, outcomes.into_iter().collect())),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|request| request.url.starts_with(prefix))
            .count()
    }

    fn next_outcome(&self, request: &HttpRequest) -> HttpOutcome {
        let url = request.full_url();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        routes
            .iter_mut()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .find_map(|(_, queue)| queue.pop_front())
            .unwrap_or_else(|| HttpOutcome::network(format!("no scripted outcome for {url}")))
    }
}

impl HttpClient for ScriptedHttpClient {
    fn send<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = HttpOutcome> + Send + 'a>> {
        Box::pin(async move {
            let outcome = self.next_outcome(&request);
            self.seen
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            outcome
        })
    }
}

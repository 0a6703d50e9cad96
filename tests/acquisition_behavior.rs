//! Behavior-driven tests for live acquisition
//!
//! These tests verify HOW pages are drained, how transient failures are retried,
//! and how the fallback chain moves between endpoints and finally to synthetic data.
//! Time is paused so every backoff and page delay runs on virtual time.

use std::sync::Arc;
use std::time::Duration;

use pmfetch_core::{
    ApiVersion, Completeness, DataOrigin, DateWindow, DrainEnd, EndpointDescriptor,
    FallbackChainBuilder, FetchError, FetchRequest, FieldMapping, HttpClient, HttpOutcome,
    HttpRequest, PagePlan, Paginator, Parameter, Provenance, RetryConfig, RetryPolicy,
    ScriptedHttpClient, Station, StationTable,
};
use serde_json::{json, Value};
use time::{Date, Month};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const PAGE_DELAY: Duration = Duration::from_millis(500);

fn v2_record(index: usize, parameter: &str) -> Value {
    json!({
        "location": format!("Station {index}"),
        "city": "Delhi",
        "parameter": parameter,
        "value": 40.0 + (index % 50) as f64,
        "date": { "utc": "2024-01-15T06:00:00Z" },
        "coordinates": { "latitude": 28.6, "longitude": 77.2 }
    })
}

fn page_of(count: usize, offset: usize) -> HttpOutcome {
    let results = (offset..offset + count)
        .map(|index| v2_record(index, "pm25"))
        .collect::<Vec<_>>();
    HttpOutcome::ok(json!({ "results": results }))
}

fn plan(url: &str) -> PagePlan {
    PagePlan {
        request: HttpRequest::get(url),
        results_path: String::from("results"),
        page_size: 1_000,
        max_records: 100_000,
        parameter_hint: Some(Parameter::Pm25),
    }
}

fn v2_descriptor(name: &str, host: &str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        name,
        ApiVersion::V2,
        format!("https://{host}/v2"),
        FieldMapping::openaq_v2(),
    )
}

fn one_station() -> Arc<StationTable> {
    let station = Station::new(
        "Anand Vihar",
        "Delhi",
        "Delhi",
        28.6469,
        77.3152,
        "Urban",
        120.0,
        200.0,
    )
    .expect("valid station");
    Arc::new(StationTable::new(vec![station]).expect("non-empty table"))
}

fn one_day() -> DateWindow {
    DateWindow::day(Date::from_calendar_date(2023, Month::March, 14).expect("valid date"))
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_last_page_is_short_drain_stops_after_it() {
    // Given: An endpoint serving pages of 1000, 1000 and 400 records
    let client = Arc::new(ScriptedHttpClient::new().script(
        "https://api.example.test",
        [page_of(1_000, 0), page_of(1_000, 1_000), page_of(400, 2_000)],
    ));
    let paginator = Paginator::new(
        client.clone(),
        RetryPolicy::new(RetryConfig::default()),
        PAGE_DELAY,
    );
    let started = Instant::now();

    // When: The paginator drains the collection
    let report = paginator
        .drain(
            plan("https://api.example.test/v2/measurements"),
            &CancellationToken::new(),
        )
        .collect_pages()
        .await;

    // Then: Three requests were made and every record was kept
    assert_eq!(report.pages_requested, 3);
    assert_eq!(report.records, 2_400);
    assert_eq!(report.end, DrainEnd::Exhausted);
    assert_eq!(client.request_count("https://api.example.test"), 3);

    // And: Pages were requested in order with a politeness delay between them
    let pages = client
        .requests()
        .iter()
        .map(|request| request.query_value("page").map(str::to_owned))
        .collect::<Vec<_>>();
    assert_eq!(
        pages,
        vec![
            Some(String::from("1")),
            Some(String::from("2")),
            Some(String::from("3"))
        ]
    );
    assert!(started.elapsed() >= PAGE_DELAY * 2);
}

#[tokio::test(start_paused = true)]
async fn when_page_after_a_full_page_is_empty_drain_ends_there() {
    // Given: One full page followed by an empty one
    let client = Arc::new(
        ScriptedHttpClient::new()
            .script("https://api.example.test", [page_of(1_000, 0), page_of(0, 0)]),
    );
    let paginator = Paginator::new(
        client.clone(),
        RetryPolicy::new(RetryConfig::default()),
        PAGE_DELAY,
    );

    // When: The paginator drains the collection
    let report = paginator
        .drain(
            plan("https://api.example.test/v2/measurements"),
            &CancellationToken::new(),
        )
        .collect_pages()
        .await;

    // Then: Two requests, one usable page
    assert_eq!(report.pages_requested, 2);
    assert_eq!(report.records, 1_000);
    assert_eq!(report.pages.len(), 1);
    assert_eq!(report.end, DrainEnd::Exhausted);
}

#[tokio::test(start_paused = true)]
async fn when_page_size_is_zero_drain_ends_without_requesting() {
    // Given: A plan with a zero page size against an endpoint that always answers
    let client = Arc::new(ScriptedHttpClient::new().script(
        "https://api.example.test",
        [page_of(5, 0), page_of(5, 5), page_of(5, 10)],
    ));
    let paginator = Paginator::new(
        client.clone(),
        RetryPolicy::new(RetryConfig::default()),
        PAGE_DELAY,
    );
    let mut zero = plan("https://api.example.test/v2/measurements");
    zero.page_size = 0;

    // When: The paginator drains the collection
    let mut drain = paginator.drain(zero, &CancellationToken::new());
    let first = drain.next_page().await;

    // Then: The drain ends at once and no request is sent
    assert!(first.is_none());
    assert!(matches!(drain.end(), Some(DrainEnd::Failed { page: 1, .. })));
    assert!(drain.next_page().await.is_none());
    assert_eq!(client.requests().len(), 0);
}

#[tokio::test(start_paused = true)]
async fn when_record_cap_is_hit_mid_page_the_page_is_truncated() {
    // Given: A cap of 1500 records over full pages of 1000
    let client = Arc::new(ScriptedHttpClient::new().script(
        "https://api.example.test",
        [page_of(1_000, 0), page_of(1_000, 1_000), page_of(1_000, 2_000)],
    ));
    let paginator = Paginator::new(
        client.clone(),
        RetryPolicy::new(RetryConfig::default()),
        PAGE_DELAY,
    );
    let mut capped = plan("https://api.example.test/v2/measurements");
    capped.max_records = 1_500;

    // When: The paginator drains the collection
    let report = paginator
        .drain(capped, &CancellationToken::new())
        .collect_pages()
        .await;

    // Then: Exactly the cap is returned and no third page is requested
    assert_eq!(report.records, 1_500);
    assert_eq!(report.pages[1].records.len(), 500);
    assert_eq!(report.end, DrainEnd::Capped);
    assert_eq!(client.request_count("https://api.example.test"), 2);
}

// =============================================================================
// Retry / Backoff
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_rate_limited_twice_third_attempt_succeeds_after_doubling_sleeps() {
    // Given: Two rate limits followed by a success, three attempts allowed
    let client = ScriptedHttpClient::new().script(
        "https://api.example.test",
        [
            HttpOutcome::RateLimited { retry_after: None },
            HttpOutcome::RateLimited { retry_after: None },
            HttpOutcome::ok(json!({ "results": [] })),
        ],
    );
    let policy = RetryPolicy::new(RetryConfig::default());
    let request = HttpRequest::get("https://api.example.test/v2/measurements");
    let started = Instant::now();
    let mut attempt_times = Vec::new();

    // When: The request runs through the retry policy
    let attempted = policy
        .execute(&CancellationToken::new(), |_| {
            attempt_times.push(started.elapsed());
            client.send(request.clone())
        })
        .await
        .expect("not cancelled");

    // Then: The third attempt succeeds after sleeping 1s then 2s
    assert_eq!(attempted.attempts, 3);
    assert!(matches!(attempted.outcome, HttpOutcome::Success { .. }));
    let expected = [Duration::ZERO, Duration::from_secs(1), Duration::from_secs(3)];
    assert_eq!(attempt_times.len(), expected.len());
    for (actual, expected) in attempt_times.iter().zip(expected) {
        assert!(
            *actual >= expected && *actual < expected + Duration::from_millis(10),
            "attempt at {actual:?}, expected {expected:?}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn when_attempts_run_out_last_transient_outcome_is_returned() {
    // Given: An endpoint that never answers
    let client = ScriptedHttpClient::new();
    let policy = RetryPolicy::new(RetryConfig::default());
    let request = HttpRequest::get("https://api.example.test/v2/measurements");

    // When: The request runs through the retry policy
    let attempted = policy
        .execute(&CancellationToken::new(), |_| client.send(request.clone()))
        .await
        .expect("not cancelled");

    // Then: All three attempts were spent and the network error surfaces
    assert_eq!(attempted.attempts, 3);
    assert!(matches!(attempted.outcome, HttpOutcome::NetworkError { .. }));
    assert_eq!(client.request_count("https://api.example.test"), 3);
}

// =============================================================================
// Fallback Chain
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_first_endpoint_is_empty_second_endpoint_wins() {
    // Given: Endpoint A returns no records and endpoint B returns five
    let client = Arc::new(
        ScriptedHttpClient::new()
            .script(
                "https://a.example.test",
                [HttpOutcome::ok(json!({ "results": [] }))],
            )
            .script("https://b.example.test", [page_of(5, 0)]),
    );
    let chain = FallbackChainBuilder::new()
        .with_descriptors(vec![
            v2_descriptor("A", "a.example.test"),
            v2_descriptor("B", "b.example.test"),
        ])
        .with_http_client(client.clone())
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .build()
        .expect("valid request");

    // When: The chain fetches
    let outcome = chain.fetch(&request).await.expect("fetch succeeds");

    // Then: B's five live records are returned without synthetic data
    assert_eq!(outcome.provenance, Provenance::live("B"));
    assert_eq!(outcome.provenance.to_string(), "live:B");
    assert_eq!(outcome.measurements.len(), 5);
    assert!(outcome
        .measurements
        .iter()
        .all(|measurement| measurement.origin == DataOrigin::Live));
    assert_eq!(outcome.completeness, Completeness::Complete);

    // And: A is recorded as a failed attempt and the recovery is reported
    assert_eq!(outcome.attempts.len(), 2);
    assert!(outcome.attempts[0].failure.is_some());
    assert!(outcome.attempts[1].failure.is_none());
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("fallback succeeded with 'B' after 1 failed attempt(s)")));
    assert_eq!(client.request_count("https://b.example.test"), 1);
}

#[tokio::test(start_paused = true)]
async fn when_every_endpoint_fails_synthetic_data_fills_the_request() {
    // Given: The default chain against a transport that always fails
    //   and a single station over a single day
    let client = Arc::new(ScriptedHttpClient::new());
    let chain = FallbackChainBuilder::new()
        .with_http_client(client.clone())
        .with_stations(one_station())
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .window(one_day())
        .build()
        .expect("valid request");

    // When: The chain fetches
    let outcome = chain.fetch(&request).await.expect("fetch succeeds");

    // Then: Four synthetic PM2.5 readings are returned
    assert_eq!(outcome.provenance, Provenance::Synthetic);
    assert_eq!(outcome.measurements.len(), 4);
    assert!(outcome.measurements.iter().all(|measurement| {
        measurement.origin == DataOrigin::Synthetic
            && measurement.parameter == Parameter::Pm25
            && measurement.station_id == "Anand Vihar"
    }));

    // And: Every live endpoint was tried with the full retry budget
    assert_eq!(outcome.attempts.len(), 3);
    assert!(outcome
        .attempts
        .iter()
        .all(|attempt| attempt.failure.is_some()));
    assert_eq!(client.requests().len(), 9);
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("using synthetic data")));
}

#[tokio::test(start_paused = true)]
async fn when_a_later_page_fails_the_table_is_marked_partial() {
    // Given: A full first page and a server error on page two
    let client = Arc::new(ScriptedHttpClient::new().script(
        "https://p.example.test",
        [page_of(3, 0), HttpOutcome::http_error(500, "upstream exploded")],
    ));
    let chain = FallbackChainBuilder::new()
        .with_descriptors(vec![v2_descriptor("only", "p.example.test")])
        .with_http_client(client)
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .page_size(3)
        .build()
        .expect("valid request");

    // When: The chain fetches
    let outcome = chain.fetch(&request).await.expect("fetch succeeds");

    // Then: The first page is kept and the table is flagged partial, not complete
    assert_eq!(outcome.provenance, Provenance::live("only"));
    assert_eq!(outcome.measurements.len(), 3);
    assert!(matches!(
        outcome.completeness,
        Completeness::Partial { failed_page: 2, .. }
    ));
    assert!(outcome
        .warnings
        .iter()
        .any(|warning| warning.contains("table is partial")));
}

#[tokio::test(start_paused = true)]
async fn when_records_are_malformed_they_are_skipped_and_counted() {
    // Given: A page mixing valid, negative, non-numeric and timestamp-less records
    let page = HttpOutcome::ok(json!({
        "results": [
            v2_record(1, "pm25"),
            { "location": "X", "parameter": "pm25", "value": -3.0,
              "date": { "utc": "2024-01-15T06:00:00Z" } },
            { "location": "Y", "parameter": "pm25", "value": "n/a",
              "date": { "utc": "2024-01-15T06:00:00Z" } },
            { "location": "Z", "parameter": "pm25", "value": 12.0 },
            "not an object"
        ]
    }));
    let client = Arc::new(ScriptedHttpClient::new().script("https://m.example.test", [page]));
    let chain = FallbackChainBuilder::new()
        .with_descriptors(vec![v2_descriptor("mixed", "m.example.test")])
        .with_http_client(client)
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .build()
        .expect("valid request");

    // When: The chain fetches
    let outcome = chain.fetch(&request).await.expect("fetch succeeds");

    // Then: Only the valid record survives and the rest are tallied
    assert_eq!(outcome.measurements.len(), 1);
    assert_eq!(outcome.skipped.total(), 4);
    assert_eq!(outcome.skipped.not_an_object, 1);
    assert_eq!(outcome.skipped.missing_timestamp, 1);
}

// =============================================================================
// Cancellation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_cancelled_during_backoff_fetch_stops_promptly() {
    // Given: A failing transport and a token cancelled half a second in
    let client = Arc::new(ScriptedHttpClient::new());
    let chain = FallbackChainBuilder::new()
        .with_http_client(client.clone())
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm10)
        .build()
        .expect("valid request");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });
    let started = Instant::now();

    // When: The chain fetches
    let result = chain.fetch_with_cancel(&request, &cancel).await;

    // Then: The fetch is cancelled inside the first backoff sleep
    assert_eq!(result, Err(FetchError::Cancelled));
    assert_eq!(client.requests().len(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn when_token_is_already_cancelled_no_request_is_sent() {
    // Given: A cancelled token
    let client = Arc::new(ScriptedHttpClient::new());
    let chain = FallbackChainBuilder::new()
        .with_http_client(client.clone())
        .build()
        .expect("valid chain");
    let request = FetchRequest::new(Parameter::Pm25);
    let cancel = CancellationToken::new();
    cancel.cancel();

    // When: The chain fetches
    let result = chain.fetch_with_cancel(&request, &cancel).await;

    // Then: Nothing goes over the wire
    assert_eq!(result, Err(FetchError::Cancelled));
    assert!(client.requests().is_empty());
}

// =============================================================================
// Multi-parameter
// =============================================================================

#[tokio::test(start_paused = true)]
async fn when_offline_both_parameters_merge_into_one_ordered_table() {
    // Given: An offline chain over one station and one day
    let chain = FallbackChainBuilder::new()
        .offline()
        .with_stations(one_station())
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .window(one_day())
        .build()
        .expect("valid request");

    // When: Both parameters are fetched, one of them twice
    let combined = chain
        .fetch_parameters(
            &request,
            &[Parameter::Pm10, Parameter::Pm25, Parameter::Pm10],
            &CancellationToken::new(),
        )
        .await
        .expect("fetch succeeds");

    // Then: Eight rows, one report per distinct parameter, newest first
    //   and no endpoint was attempted
    assert_eq!(combined.measurements.len(), 8);
    assert_eq!(combined.reports.len(), 2);
    assert!(combined.any_synthetic());
    assert!(combined
        .reports
        .iter()
        .all(|report| report.attempts.is_empty()));
    assert!(combined
        .measurements
        .windows(2)
        .all(|pair| pair[0].timestamp >= pair[1].timestamp));
}

// =============================================================================
// Location Discovery
// =============================================================================

fn v2_location(id: u64, name: &str, city: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "city": city,
        "coordinates": { "latitude": 28.6, "longitude": 77.2 }
    })
}

#[tokio::test(start_paused = true)]
async fn when_first_endpoint_cannot_list_locations_the_next_one_does() {
    // Given: Endpoint A answers its listing with a server error
    //   and endpoint B lists two locations, one of them twice
    let client = Arc::new(
        ScriptedHttpClient::new()
            .script(
                "https://a.example.test",
                [HttpOutcome::http_error(500, "internal error")],
            )
            .script(
                "https://b.example.test/v2/locations",
                [HttpOutcome::ok(json!({ "results": [
                    v2_location(8118, "Anand Vihar", "Delhi"),
                    v2_location(9000, "Bandra", "Mumbai"),
                    v2_location(8118, "Anand Vihar", "Delhi"),
                ] }))],
            )
            .script(
                "https://b.example.test/v2/measurements",
                [page_of(3, 0)],
            ),
    );
    let chain = FallbackChainBuilder::new()
        .with_descriptors(vec![
            v2_descriptor("A", "a.example.test"),
            v2_descriptor("B", "b.example.test"),
        ])
        .with_http_client(client.clone())
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm25)
        .build()
        .expect("valid request");

    // When: The chain lists locations
    let discovery = chain
        .discover_locations(&request, &CancellationToken::new())
        .await
        .expect("discovery runs");

    // Then: B's two distinct locations are returned
    assert_eq!(discovery.source.as_deref(), Some("B"));
    let ids = discovery
        .locations
        .iter()
        .map(|location| location.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["8118", "9000"]);
    assert_eq!(discovery.locations[1].city.as_deref(), Some("Mumbai"));

    // And: A's failure is recorded and the listing asked for both parameters
    assert_eq!(discovery.attempts.len(), 2);
    assert!(discovery.attempts[0].failure.is_some());
    assert!(discovery
        .warnings
        .iter()
        .any(|warning| warning.contains("succeeded with 'B' after 1 failed attempt(s)")));
    let listing = client
        .requests()
        .into_iter()
        .find(|request| request.url.starts_with("https://b.example.test"))
        .expect("listing request");
    assert_eq!(listing.url, "https://b.example.test/v2/locations");
    assert_eq!(listing.query_value("parameter"), Some("pm25,pm10"));
    assert_eq!(listing.query_value("country"), Some("IN"));

    // When: A discovered location is fetched on its own
    let scoped = FetchRequest::builder(Parameter::Pm25)
        .location_id(discovery.locations[0].id.clone())
        .build()
        .expect("valid request");
    let outcome = chain.fetch(&scoped).await.expect("fetch succeeds");

    // Then: The measurement request is narrowed to that location
    assert_eq!(outcome.provenance, Provenance::live("B"));
    let narrowed = client
        .requests()
        .into_iter()
        .find(|request| request.url == "https://b.example.test/v2/measurements")
        .expect("measurement request");
    assert_eq!(narrowed.query_value("location_id"), Some("8118"));
}

#[tokio::test]
async fn when_offline_location_discovery_reports_no_source() {
    // Given: An offline chain
    let chain = FallbackChainBuilder::new()
        .offline()
        .build()
        .expect("valid chain");
    let request = FetchRequest::builder(Parameter::Pm10)
        .build()
        .expect("valid request");

    // When: Locations are listed
    let discovery = chain
        .discover_locations(&request, &CancellationToken::new())
        .await
        .expect("discovery runs");

    // Then: Nothing is listed and nothing was attempted
    assert!(discovery.is_empty());
    assert_eq!(discovery.source, None);
    assert!(discovery.attempts.is_empty());
    assert_eq!(discovery.warnings.len(), 1);
}

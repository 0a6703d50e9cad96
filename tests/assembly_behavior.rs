//! Behavior-driven tests for table assembly and analysis
//!
//! These tests verify HOW sequences from several sources are merged into one
//! table and how that table is summarized and reshaped.

use std::sync::Arc;

use pmfetch_core::{
    assemble, ml_ready, summarize, DataOrigin, DateWindow, Measurement, Parameter, StationTable,
    SummaryScope, SyntheticGenerator, UtcDateTime,
};
use time::{Date, Month};

fn reading(ts: &str, station: &str, parameter: Parameter, value: f64) -> Measurement {
    Measurement::new(
        UtcDateTime::parse(ts).expect("valid timestamp"),
        station,
        parameter,
        value,
        DataOrigin::Live,
    )
    .expect("valid measurement")
    .with_city(Some(String::from("Delhi")))
    .with_region(Some(String::from("Delhi")))
}

fn synthetic_week() -> Vec<Measurement> {
    let generator = SyntheticGenerator::new(Arc::new(StationTable::india_reference()), 11);
    let window = DateWindow::new(
        Date::from_calendar_date(2023, Month::December, 1).expect("valid date"),
        Date::from_calendar_date(2023, Month::December, 7).expect("valid date"),
    )
    .expect("ordered window");
    generator.generate_window(&window, &Parameter::ALL)
}

// =============================================================================
// Deduplication and Ordering
// =============================================================================

#[test]
fn when_sources_overlap_first_arrival_wins_and_order_is_newest_first() {
    // Given: A live sequence and a later sequence repeating one key
    let live = vec![
        reading("2024-01-15T06:00:00Z", "Dwarka", Parameter::Pm25, 88.0),
        reading("2024-01-15T12:00:00Z", "Dwarka", Parameter::Pm25, 95.0),
    ];
    let later = vec![
        reading("2024-01-15T06:00:00Z", "Dwarka", Parameter::Pm25, 10.0),
        reading("2024-01-15T06:00:00Z", "Anand Vihar", Parameter::Pm10, 201.0),
    ];

    // When: Both are assembled
    let assembled = assemble([live, later]);

    // Then: The earlier value is kept and the clash is counted
    assert_eq!(assembled.measurements.len(), 3);
    assert_eq!(assembled.conflicts_resolved, 1);
    assert_eq!(assembled.duplicates_removed, 0);
    let kept = assembled
        .measurements
        .iter()
        .find(|m| m.station_id == "Dwarka" && m.timestamp.hour() == 6)
        .expect("kept record");
    assert_eq!(kept.value, 88.0);

    // And: Rows are newest first, then by station id
    let order = assembled
        .measurements
        .iter()
        .map(|m| (m.timestamp.hour(), m.station_id.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(order, vec![(12, "Dwarka"), (6, "Anand Vihar"), (6, "Dwarka")]);
}

#[test]
fn when_a_table_is_assembled_twice_nothing_changes() {
    // Given: A week of synthetic data fed in twice
    let week = synthetic_week();

    // When: It is assembled, then the result assembled again
    let once = assemble([week.clone(), week]);
    let twice = assemble([once.measurements.clone()]);

    // Then: The second pass is a no-op
    assert_eq!(once.duplicates_removed, once.measurements.len());
    assert_eq!(twice.measurements, once.measurements);
    assert_eq!(twice.duplicates_removed, 0);
    assert_eq!(twice.conflicts_resolved, 0);
}

// =============================================================================
// Summary Statistics
// =============================================================================

#[test]
fn when_a_table_is_summarized_each_scope_covers_every_parameter() {
    // Given: A week of synthetic December data across all cities
    let week = synthetic_week();

    // When: The table is summarized
    let rows = summarize(&week);

    // Then: The overall rows count every reading per parameter
    let overall = rows
        .iter()
        .filter(|row| row.statistic == SummaryScope::Overall)
        .collect::<Vec<_>>();
    assert_eq!(overall.len(), 2);
    assert!(overall
        .iter()
        .all(|row| row.category == "All" && row.count == week.len() / 2));

    // And: December only produces the winter season group
    let seasons = rows
        .iter()
        .filter(|row| row.statistic == SummaryScope::Season)
        .map(|row| row.category.as_str())
        .collect::<Vec<_>>();
    assert_eq!(seasons, vec!["Winter", "Winter"]);

    // And: Order statistics are internally consistent
    for row in &rows {
        assert!(row.min <= row.q25 && row.q25 <= row.median);
        assert!(row.median <= row.q75 && row.q75 <= row.max);
    }
}

// =============================================================================
// ML-ready Rows
// =============================================================================

#[test]
fn when_a_week_is_reshaped_rolling_means_start_at_the_seventh_sample() {
    // Given: A week of synthetic data for the reference stations
    let week = synthetic_week();
    let stations = StationTable::india_reference().len();

    // When: The table is pivoted into ML rows
    let rows = ml_ready(&week);

    // Then: One row per station and sample with both parameters present
    assert_eq!(rows.len(), stations * 7 * 4);
    assert!(rows.iter().all(|row| row.pm25.is_some() && row.pm10.is_some()));

    // And: The first samples of each station lack lags and rolling means
    let first_station = rows[0].station_id.clone();
    let station_rows = rows
        .iter()
        .filter(|row| row.station_id == first_station)
        .collect::<Vec<_>>();
    assert_eq!(station_rows[0].pm25_lag1, None);
    assert_eq!(station_rows[1].pm25_lag1, station_rows[0].pm25);
    assert!(station_rows[..6]
        .iter()
        .all(|row| row.pm25_rolling_7.is_none()));
    assert!(station_rows[6].pm25_rolling_7.is_some());
}

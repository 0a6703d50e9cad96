//! Behavior-driven tests for the synthetic generator
//!
//! These tests verify HOW synthetic data is shaped: physical clamps, seasonal
//! labels, sample hours, determinism and station selection.

use std::collections::BTreeSet;
use std::sync::Arc;

use pmfetch_core::synthetic::{seasonal_factor, SAMPLE_HOURS};
use pmfetch_core::{
    DataOrigin, DateWindow, FetchRequest, Parameter, Season, StationTable, SyntheticGenerator,
    ValidationError, DEFAULT_SEED,
};
use time::{Date, Month};

fn reference_generator(seed: u64) -> SyntheticGenerator {
    SyntheticGenerator::new(Arc::new(StationTable::india_reference()), seed)
}

fn day(year: i32, month: Month, day: u8) -> DateWindow {
    DateWindow::day(Date::from_calendar_date(year, month, day).expect("valid date"))
}

// =============================================================================
// Value Model
// =============================================================================

#[test]
fn when_a_full_year_is_generated_every_value_respects_its_clamp() {
    // Given: The reference station table
    let generator = reference_generator(DEFAULT_SEED);

    // When: A full year for both parameters is generated
    let measurements = generator
        .generate(2023, &Parameter::ALL)
        .expect("valid year");

    // Then: One row per station, day, sample hour and parameter
    assert_eq!(
        measurements.len(),
        generator.stations().len() * 365 * SAMPLE_HOURS.len() * 2
    );

    // And: Every value sits inside its parameter's range with one decimal
    for measurement in &measurements {
        let (floor, ceiling) = measurement.parameter.synthetic_bounds();
        assert!(
            (floor..=ceiling).contains(&measurement.value),
            "{} {} out of range",
            measurement.parameter,
            measurement.value
        );
        let tenths = measurement.value * 10.0;
        assert!((tenths - tenths.round()).abs() < 1e-6);
        assert_eq!(measurement.origin, DataOrigin::Synthetic);
    }
}

#[test]
fn when_winter_and_monsoon_days_are_compared_winter_is_dirtier() {
    // Given: The same station on a January day and a July day
    let generator = reference_generator(DEFAULT_SEED);

    // When: Both days are generated
    let january = generator.generate_window(&day(2023, Month::January, 20), &[Parameter::Pm25]);
    let july = generator.generate_window(&day(2023, Month::July, 20), &[Parameter::Pm25]);

    // Then: The seasonal labels and factors agree with each month
    assert!(january
        .iter()
        .all(|measurement| measurement.season() == Season::Winter));
    assert!(july
        .iter()
        .all(|measurement| measurement.season() == Season::Monsoon));
    assert_eq!(Season::from_month(1).factor(), seasonal_factor(1));
    assert_eq!(seasonal_factor(1), 1.4);
    assert_eq!(seasonal_factor(7), 0.7);

    // And: Averaged over every station, winter is clearly above monsoon
    let mean = |rows: &[pmfetch_core::Measurement]| {
        rows.iter().map(|row| row.value).sum::<f64>() / rows.len() as f64
    };
    assert!(mean(&january) > mean(&july));
}

#[test]
fn when_a_day_is_generated_hour_24_is_stamped_midnight_of_the_same_date() {
    // Given: One day for the reference table
    let generator = reference_generator(DEFAULT_SEED);
    let window = day(2023, Month::March, 14);

    // When: The day is generated
    let measurements = generator.generate_window(&window, &[Parameter::Pm10]);

    // Then: Every row is on that date at 00:00, 06:00, 12:00 or 18:00
    let hours = measurements
        .iter()
        .map(|measurement| {
            assert_eq!(measurement.timestamp.date(), window.start());
            measurement.timestamp.hour()
        })
        .collect::<BTreeSet<_>>();
    assert_eq!(hours, BTreeSet::from([0, 6, 12, 18]));
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn when_the_seed_is_fixed_output_is_reproducible() {
    // Given: Two generators with the same seed and one with another seed
    let window = day(2022, Month::November, 2);

    // When: The same window is generated by each
    let first = reference_generator(7).generate_window(&window, &Parameter::ALL);
    let second = reference_generator(7).generate_window(&window, &Parameter::ALL);
    let other = reference_generator(8).generate_window(&window, &Parameter::ALL);

    // Then: Equal seeds agree exactly and a different seed changes values
    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn when_a_narrower_window_is_generated_it_matches_the_full_year() {
    // Given: A full year and a single day of it
    let generator = reference_generator(DEFAULT_SEED);
    let window = day(2023, Month::August, 9);

    // When: Both are generated
    let year = generator
        .generate(2023, &[Parameter::Pm25])
        .expect("valid year");
    let single = generator.generate_window(&window, &[Parameter::Pm25]);

    // Then: The day's rows are identical to the same rows of the year
    let from_year = year
        .into_iter()
        .filter(|measurement| measurement.timestamp.date() == window.start())
        .collect::<Vec<_>>();
    assert_eq!(single, from_year);
}

// =============================================================================
// Station Selection
// =============================================================================

#[test]
fn when_request_names_a_known_city_only_its_stations_are_generated() {
    // Given: A one-day request for Delhi
    let generator = reference_generator(DEFAULT_SEED);
    let request = FetchRequest::builder(Parameter::Pm25)
        .city("delhi")
        .window(day(2023, Month::May, 1))
        .build()
        .expect("valid request");

    // When: A synthetic batch is generated for the request
    let batch = generator
        .generate_request(&request, 2023)
        .expect("valid batch");

    // Then: Four Delhi stations with four samples each, no warnings
    assert_eq!(batch.measurements.len(), 16);
    assert!(batch.warnings.is_empty());
    assert!(batch
        .measurements
        .iter()
        .all(|measurement| measurement.city.as_deref() == Some("Delhi")));
}

#[test]
fn when_request_names_an_unknown_city_the_whole_table_is_used_with_a_warning() {
    // Given: A one-day request for a city with no reference station
    let generator = reference_generator(DEFAULT_SEED);
    let request = FetchRequest::builder(Parameter::Pm10)
        .city("Atlantis")
        .window(day(2023, Month::May, 1))
        .build()
        .expect("valid request");

    // When: A synthetic batch is generated for the request
    let batch = generator
        .generate_request(&request, 2023)
        .expect("valid batch");

    // Then: Every station contributes and the substitution is reported
    assert_eq!(
        batch.measurements.len(),
        generator.stations().len() * SAMPLE_HOURS.len()
    );
    assert_eq!(batch.warnings.len(), 1);
    assert!(batch.warnings[0].contains("Atlantis"));
}

#[test]
fn when_year_is_out_of_range_generation_is_rejected() {
    // Given: The reference generator
    let generator = reference_generator(DEFAULT_SEED);

    // When: A year before 1970 is requested
    let result = generator.generate(1800, &Parameter::ALL);

    // Then: The year is rejected before any work is done
    assert!(matches!(result, Err(ValidationError::InvalidYear { year: 1800 })));
}

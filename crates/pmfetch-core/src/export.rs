//! CSV writers for assembled tables, per-parameter splits and analysis rows.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use time::Weekday;
use tracing::info;

use crate::analysis::{ml_ready, summarize, MlRow, SummaryRow};
use crate::domain::{AqiCategory, DataOrigin, Measurement, Parameter, Region, Season};
use crate::CoreError;

pub const UNIT_LABEL: &str = "µg/m³";

/// Flat, enriched CSV row for one measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRow<'a> {
    pub datetime: String,
    pub date: String,
    pub time: String,
    pub station_id: &'a str,
    pub city: Option<&'a str>,
    pub state: Option<&'a str>,
    pub parameter: Parameter,
    pub value: f64,
    pub unit: &'static str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub station_type: Option<&'a str>,
    pub country: &'a str,
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub quarter: u8,
    /// ISO 8601 week number.
    pub week_of_year: u8,
    pub weekday: String,
    pub is_weekend: bool,
    pub season: Season,
    pub region: Region,
    pub aqi_category: AqiCategory,
    pub origin: DataOrigin,
}

impl<'a> MeasurementRow<'a> {
    pub fn new(measurement: &'a Measurement, country: &'a str) -> Self {
        let at = measurement.timestamp.into_inner();
        let datetime = measurement.timestamp.format_naive();
        let (date, time) = datetime
            .split_once(' ')
            .map(|(date, time)| (date.to_owned(), time.to_owned()))
            .unwrap_or_else(|| (datetime.clone(), String::new()));

        let weekday = at.weekday();

        Self {
            date,
            time,
            datetime,
            station_id: &measurement.station_id,
            city: measurement.city.as_deref(),
            state: measurement.region.as_deref(),
            parameter: measurement.parameter,
            value: measurement.value,
            unit: UNIT_LABEL,
            latitude: measurement.latitude,
            longitude: measurement.longitude,
            station_type: measurement.station_type.as_deref(),
            country,
            year: at.year(),
            month: u8::from(at.month()),
            day: at.day(),
            hour: at.hour(),
            quarter: (u8::from(at.month()) - 1) / 3 + 1,
            week_of_year: at.iso_week(),
            weekday: weekday.to_string(),
            is_weekend: matches!(weekday, Weekday::Saturday | Weekday::Sunday),
            season: measurement.season(),
            region: measurement.geographic_region(),
            aqi_category: measurement.aqi_category(),
            origin: measurement.origin,
        }
    }
}

/// Display name for an ISO country code; unknown codes pass through.
pub fn country_name(code: &str) -> &str {
    match code.to_ascii_uppercase().as_str() {
        "IN" => "India",
        _ => code,
    }
}

/// Writes any serializable rows with a header line.
pub fn write_rows<W, T, I>(writer: W, rows: I) -> Result<usize, CoreError>
where
    W: Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut csv = csv::Writer::from_writer(writer);
    let mut written = 0;
    for row in rows {
        csv.serialize(row)?;
        written += 1;
    }
    csv.flush()?;
    Ok(written)
}

pub fn write_measurements<W: Write>(
    writer: W,
    measurements: &[Measurement],
    country: &str,
) -> Result<usize, CoreError> {
    write_rows(
        writer,
        measurements
            .iter()
            .map(|measurement| MeasurementRow::new(measurement, country)),
    )
}

pub fn write_summary<W: Write>(writer: W, rows: &[SummaryRow]) -> Result<usize, CoreError> {
    write_rows(writer, rows)
}

pub fn write_ml_rows<W: Write>(writer: W, rows: &[MlRow]) -> Result<usize, CoreError> {
    write_rows(writer, rows)
}

/// Which kind of file an export produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    Table,
    Parameter,
    Summary,
    MlReady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub kind: ExportKind,
    pub path: PathBuf,
    pub rows: usize,
}

/// Options for [`export_dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions<'a> {
    pub prefix: &'a str,
    pub country: &'a str,
    pub split_parameters: bool,
    pub include_analysis: bool,
}

/// Writes `<prefix>.csv` and, as requested, `<prefix>_pm25.csv`,
/// `<prefix>_pm10.csv`, `<prefix>_summary.csv` and `<prefix>_ml_ready.csv`
/// into `dir`, creating it if needed.
pub fn export_dataset(
    dir: &Path,
    measurements: &[Measurement],
    options: &ExportOptions<'_>,
) -> Result<Vec<ExportedFile>, CoreError> {
    fs::create_dir_all(dir)?;
    let mut files = Vec::new();

    let path = dir.join(format!("{}.csv", options.prefix));
    let rows = write_measurements(create(&path)?, measurements, options.country)?;
    files.push(ExportedFile {
        kind: ExportKind::Table,
        path,
        rows,
    });

    if options.split_parameters {
        for parameter in Parameter::ALL {
            let subset = measurements
                .iter()
                .filter(|measurement| measurement.parameter == parameter)
                .cloned()
                .collect::<Vec<_>>();
            if subset.is_empty() {
                continue;
            }
            let path = dir.join(format!("{}_{}.csv", options.prefix, parameter.code()));
            let rows = write_measurements(create(&path)?, &subset, options.country)?;
            files.push(ExportedFile {
                kind: ExportKind::Parameter,
                path,
                rows,
            });
        }
    }

    if options.include_analysis {
        let path = dir.join(format!("{}_summary.csv", options.prefix));
        let rows = write_summary(create(&path)?, &summarize(measurements))?;
        files.push(ExportedFile {
            kind: ExportKind::Summary,
            path,
            rows,
        });

        let path = dir.join(format!("{}_ml_ready.csv", options.prefix));
        let rows = write_ml_rows(create(&path)?, &ml_ready(measurements))?;
        files.push(ExportedFile {
            kind: ExportKind::MlReady,
            path,
            rows,
        });
    }

    for file in &files {
        info!(path = %file.path.display(), rows = file.rows, "wrote csv");
    }
    Ok(files)
}

fn create(path: &Path) -> Result<BufWriter<File>, CoreError> {
    Ok(BufWriter::new(File::create(path)?))
}

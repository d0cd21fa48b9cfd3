//! CSV and JSON export of coverage reports.
//!
//! Areas are converted to the requested [`AreaUnit`] on the way out;
//! percentages and change are unit-free and written unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ward_cover_engine::CoverageReport;
use ward_cover_models::{ChangeStatus, RejectedRegion, ResultRow, Snapshot, StudySummary};

use crate::IoError;

/// Unit for reported areas. Inputs are assumed to be in metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    #[serde(alias = "square_meters")]
    SquareMetres,
    Hectares,
    #[serde(alias = "square_kilometers")]
    SquareKilometres,
}

impl AreaUnit {
    /// Square metres in one unit.
    #[must_use]
    pub const fn square_metres(self) -> f64 {
        match self {
            Self::SquareMetres => 1.0,
            Self::Hectares => 10_000.0,
            Self::SquareKilometres => 1_000_000.0,
        }
    }

    /// Converts an area in square metres to this unit.
    #[must_use]
    pub fn convert(self, square_metres: f64) -> f64 {
        square_metres / self.square_metres()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SquareMetres => "square_metres",
            Self::Hectares => "hectares",
            Self::SquareKilometres => "square_kilometres",
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AreaUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square_metres" | "square_meters" | "m2" => Ok(Self::SquareMetres),
            "hectares" | "ha" => Ok(Self::Hectares),
            "square_kilometres" | "square_kilometers" | "km2" => Ok(Self::SquareKilometres),
            other => Err(format!("unknown area unit: {other}")),
        }
    }
}

/// Report file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Flat CSV record for one region.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    region_id: &'a str,
    region_name: &'a str,
    base_area: f64,
    coverage_area: f64,
    coverage_percent: f64,
    prior_percent: Option<f64>,
    change: Option<f64>,
    status: &'static str,
    missing_snapshot: Option<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn new(row: &'a ResultRow, unit: AreaUnit) -> Self {
        let missing_snapshot = match &row.status {
            ChangeStatus::Incomplete { missing } => Some(missing.as_str()),
            ChangeStatus::Single | ChangeStatus::Complete => None,
        };

        Self {
            region_id: row.region_id.as_str(),
            region_name: &row.region_name,
            base_area: unit.convert(row.base_area),
            coverage_area: unit.convert(row.coverage_area),
            coverage_percent: row.coverage_percent,
            prior_percent: row.prior_percent,
            change: row.change,
            status: row.status.label(),
            missing_snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    unit: AreaUnit,
    current: &'a Snapshot,
    prior: Option<&'a Snapshot>,
    rows: Vec<ResultRow>,
    summary: StudySummary,
    rejected_regions: &'a [RejectedRegion],
    skipped_features: &'a BTreeMap<Snapshot, usize>,
}

/// Writes one CSV record per region.
///
/// # Errors
///
/// Returns [`IoError`] if a record cannot be written.
pub fn write_csv<W: Write>(
    report: &CoverageReport,
    unit: AreaUnit,
    writer: W,
) -> Result<(), IoError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in &report.rows {
        out.serialize(CsvRow::new(row, unit))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the whole report, including the summary and rejected regions,
/// as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`IoError`] if the report cannot be written.
pub fn write_json<W: Write>(
    report: &CoverageReport,
    unit: AreaUnit,
    mut writer: W,
) -> Result<(), IoError> {
    let rows = report
        .rows
        .iter()
        .map(|row| ResultRow {
            base_area: unit.convert(row.base_area),
            coverage_area: unit.convert(row.coverage_area),
            ..row.clone()
        })
        .collect();

    let summary = StudySummary {
        base_area: unit.convert(report.summary.base_area),
        coverage_area: unit.convert(report.summary.coverage_area),
        ..report.summary.clone()
    };

    let json = JsonReport {
        unit,
        current: &report.current,
        prior: report.prior.as_ref(),
        rows,
        summary,
        rejected_regions: &report.rejected_regions,
        skipped_features: &report.skipped_features,
    };

    serde_json::to_writer_pretty(&mut writer, &json)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Writes `report` in `format`.
///
/// # Errors
///
/// Returns [`IoError`] if the report cannot be written.
pub fn write_report<W: Write>(
    report: &CoverageReport,
    format: OutputFormat,
    unit: AreaUnit,
    writer: W,
) -> Result<(), IoError> {
    match format {
        OutputFormat::Csv => write_csv(report, unit, writer),
        OutputFormat::Json => write_json(report, unit, writer),
    }
}

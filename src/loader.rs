//! Reader for the semicolon-separated GeoNames cities export.
//!
//! The export starts with a header row; columns are located by name so their
//! order does not matter and unknown columns are ignored. The columns read are:
//!
//! | Column              | Field                                   |
//! |---------------------|-----------------------------------------|
//! | `Geoname ID`        | [`PlaceRecord::id`]                     |
//! | `Name`              | [`PlaceRecord::name`]                   |
//! | `ASCII Name`        | [`PlaceRecord::ascii_name`]             |
//! | `Alternate Names`   | comma-separated, blanks and repeats dropped |
//! | `Country Code`      | [`PlaceRecord::country_code`]           |
//! | `Country name EN`   | [`PlaceRecord::country_name`]           |
//! | `Population`        | empty means 0                           |
//! | `Timezone`          | [`PlaceRecord::timezone`]               |
//! | `Modification date` | `YYYY-MM-DD`                            |
//! | `LABEL EN`          | [`PlaceRecord::label`]                  |
//! | `Coordinates`       | `"lat, lon"`                            |
//!
//! Rows keep their file order, which becomes the gazetteer table order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::PlaceRecord;

const COLUMNS: [&str; 11] = [
    "Geoname ID",
    "Name",
    "ASCII Name",
    "Alternate Names",
    "Country Code",
    "Country name EN",
    "Population",
    "Timezone",
    "Modification date",
    "LABEL EN",
    "Coordinates",
];

/// One row of the export, as named in its header.
#[derive(Deserialize)]
struct ExportRow {
    #[serde(rename = "Geoname ID")]
    id: u64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "ASCII Name")]
    ascii_name: String,
    #[serde(rename = "Alternate Names")]
    alternate_names: String,
    #[serde(rename = "Country Code")]
    country_code: String,
    #[serde(rename = "Country name EN")]
    country_name: String,
    #[serde(rename = "Population")]
    population: Option<u64>,
    #[serde(rename = "Timezone")]
    timezone: String,
    #[serde(rename = "Modification date")]
    modification_date: String,
    #[serde(rename = "LABEL EN")]
    label: String,
    #[serde(rename = "Coordinates")]
    coordinates: String,
}

impl ExportRow {
    fn into_record(self) -> std::result::Result<PlaceRecord, String> {
        let modification_date = NaiveDate::parse_from_str(&self.modification_date, "%Y-%m-%d")
            .map_err(|e| format!("invalid modification date: {}", e))?;
        let (latitude, longitude) = parse_coordinates(&self.coordinates)?;

        Ok(PlaceRecord {
            id: self.id,
            name: self.name,
            ascii_name: self.ascii_name,
            alternate_names: split_alternate_names(&self.alternate_names),
            country_code: self.country_code,
            country_name: self.country_name,
            population: self.population.unwrap_or(0),
            timezone: self.timezone,
            modification_date,
            label: self.label,
            latitude,
            longitude,
        })
    }
}

/// Reads and parses an export file.
pub fn read_csv(path: impl AsRef<Path>) -> Result<Vec<PlaceRecord>> {
    parse(File::open(path)?)
}

/// Parses an export from any reader.
///
/// # Errors
///
/// [`Error::Parse`] with the 1-based line number for a missing header column,
/// a short row or an unparsable value; [`Error::Io`] if reading fails.
///
/// # Examples
///
/// ```
/// let data = "\
/// Geoname ID;Name;ASCII Name;Alternate Names;Country Code;Country name EN;Population;Timezone;Modification date;LABEL EN;Coordinates
/// 3620170;Diriamba;Diriamba;Diriamba,Diriambo;NI;Nicaragua;35008;America/Managua;2018-08-08;Nicaragua;11.85812, -86.23922
/// ";
/// let records = geocity::loader::parse(data.as_bytes()).unwrap();
/// assert_eq!(records[0].id, 3620170);
/// assert_eq!(records[0].longitude, -86.23922);
/// ```
pub fn parse<R: Read>(reader: R) -> Result<Vec<PlaceRecord>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .trim(Trim::All)
        .from_reader(reader);

    let headers: StringRecord = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}'))
        .collect();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Ok(Vec::new());
    }
    if let Some(missing) = COLUMNS.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(Error::Parse {
            line: 1,
            message: format!("missing column '{}'", missing),
        });
    }

    let mut records = Vec::new();
    let mut raw = StringRecord::new();
    while reader.read_record(&mut raw).map_err(csv_error)? {
        let line = raw.position().map_or(0, |p| p.line() as usize);
        let row: ExportRow = raw
            .deserialize(Some(&headers))
            .map_err(|e| Error::Parse {
                line,
                message: e.to_string(),
            })?;
        records.push(row.into_record().map_err(|message| Error::Parse { line, message })?);
    }

    debug!(records = records.len(), "parsed gazetteer export");
    Ok(records)
}

fn csv_error(err: csv::Error) -> Error {
    let line = err.position().map_or(0, |p| p.line() as usize);
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::Io(e),
        _ => Error::Parse { line, message },
    }
}

/// Splits a combined `"lat, lon"` value.
fn parse_coordinates(raw: &str) -> std::result::Result<(f64, f64), String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("coordinates '{}' are not 'lat, lon'", raw))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid coordinate '{}': {}", s.trim(), e))
    };
    Ok((parse(lat)?, parse(lon)?))
}

fn split_alternate_names(raw: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

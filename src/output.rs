//! Presentation of a [`ResultSet`] in one of two shapes.
//!
//! - [`OutputMode::Rows`] - a list of row objects, one per result record
//! - [`OutputMode::Columns`] - a mapping from column name to a mapping from
//!   row number to value
//!
//! Both shapes use the GeoNames export's column names. `CoordIndex` is only
//! present for batch requests.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{json, Value};

use crate::assemble::ResultSet;
use crate::error::Error;
use crate::types::ResultRecord;

/// Which shape [`render`] produces.
///
/// ```
/// use geocity::OutputMode;
///
/// assert_eq!("rows".parse::<OutputMode>().unwrap(), OutputMode::Rows);
/// assert_eq!("dict".parse::<OutputMode>().unwrap(), OutputMode::Columns);
/// assert!("xml".parse::<OutputMode>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Tabular form: one object per record
    #[default]
    Rows,
    /// Nested mapping form: column name to row number to value
    Columns,
}

impl FromStr for OutputMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rows" | "records" | "df" => Ok(OutputMode::Rows),
            "columns" | "dict" => Ok(OutputMode::Columns),
            other => Err(Error::InvalidArgument(format!(
                "unknown output mode '{}', expected 'rows' or 'columns'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Rows => f.write_str("rows"),
            OutputMode::Columns => f.write_str("columns"),
        }
    }
}

/// One result record in the GeoNames export layout.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    #[serde(rename = "CoordIndex", skip_serializing_if = "Option::is_none")]
    pub coord_index: Option<usize>,
    #[serde(rename = "Geoname ID")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ASCII Name")]
    pub ascii_name: String,
    /// Comma-joined, as in the source file
    #[serde(rename = "Alternate Names")]
    pub alternate_names: String,
    #[serde(rename = "Country Code")]
    pub country_code: String,
    #[serde(rename = "Country name EN")]
    pub country_name: String,
    #[serde(rename = "Population")]
    pub population: u64,
    #[serde(rename = "Timezone")]
    pub timezone: String,
    #[serde(rename = "Modification date")]
    pub modification_date: NaiveDate,
    #[serde(rename = "LABEL EN")]
    pub label: String,
    /// `"lat, lon"`
    #[serde(rename = "Coordinates")]
    pub coordinates: String,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
}

impl From<&ResultRecord> for Row {
    fn from(record: &ResultRecord) -> Self {
        let place = &record.place;
        Row {
            coord_index: record.coord_index,
            id: place.id,
            name: place.name.clone(),
            ascii_name: place.ascii_name.clone(),
            alternate_names: place.alternate_names.join(","),
            country_code: place.country_code.clone(),
            country_name: place.country_name.clone(),
            population: place.population,
            timezone: place.timezone.clone(),
            modification_date: place.modification_date,
            label: place.label.clone(),
            coordinates: format!("{}, {}", place.latitude, place.longitude),
            longitude: place.longitude,
            latitude: place.latitude,
        }
    }
}

/// Column-oriented view of a result set; columns keep a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct Columns {
    columns: Vec<(&'static str, Vec<Value>)>,
}

impl Columns {
    /// Column names, in output order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|(name, _)| *name)
    }

    /// Values of one column, indexed by row number.
    pub fn get(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.as_slice())
    }

    fn from_rows(rows: &[Row], batch: bool) -> Self {
        let mut columns: Vec<(&'static str, Vec<Value>)> = Vec::with_capacity(14);
        let mut column = |name: &'static str, value: fn(&Row) -> Value| {
            columns.push((name, rows.iter().map(value).collect()));
        };

        if batch {
            column("CoordIndex", |r| json!(r.coord_index));
        }
        column("Geoname ID", |r| json!(r.id));
        column("Name", |r| json!(r.name));
        column("ASCII Name", |r| json!(r.ascii_name));
        column("Alternate Names", |r| json!(r.alternate_names));
        column("Country Code", |r| json!(r.country_code));
        column("Country name EN", |r| json!(r.country_name));
        column("Population", |r| json!(r.population));
        column("Timezone", |r| json!(r.timezone));
        column("Modification date", |r| json!(r.modification_date));
        column("LABEL EN", |r| json!(r.label));
        column("Coordinates", |r| json!(r.coordinates));
        column("Longitude", |r| json!(r.longitude));
        column("Latitude", |r| json!(r.latitude));

        Self { columns }
    }
}

impl Serialize for Columns {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, values) in &self.columns {
            map.serialize_entry(name, &IndexedValues(values))?;
        }
        map.end()
    }
}

/// Serializes a column as `{ "0": v0, "1": v1, ... }`.
struct IndexedValues<'a>(&'a [Value]);

impl Serialize for IndexedValues<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (idx, value) in self.0.iter().enumerate() {
            map.serialize_entry(&idx, value)?;
        }
        map.end()
    }
}

/// A rendered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// See [`OutputMode::Rows`]
    Rows(Vec<Row>),
    /// See [`OutputMode::Columns`]
    Columns(Columns),
}

/// Converts a result set into rows, preserving record order.
pub fn to_rows(results: &ResultSet) -> Vec<Row> {
    results.iter().map(Row::from).collect()
}

/// Converts a result set into the column-oriented form.
pub fn to_columns(results: &ResultSet) -> Columns {
    Columns::from_rows(&to_rows(results), results.is_batch())
}

/// Renders `results` in the requested shape.
pub fn render(results: &ResultSet, mode: OutputMode) -> Output {
    match mode {
        OutputMode::Rows => Output::Rows(to_rows(results)),
        OutputMode::Columns => Output::Columns(to_columns(results)),
    }
}

//! Core data structures for gazetteer records and query results.
//!
//! - [`PlaceRecord`] - One immutable gazetteer entry
//! - [`QueryCoordinate`] - A latitude/longitude pair with distance helpers
//! - [`ResultRecord`] - A place matched by a query, tagged with its group and rank
//! - [`QueryOptions`] - Neighbor count and optional population ordering

use chrono::{DateTime, NaiveDate, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A populated place from the gazetteer.
///
/// Records are produced by the dataset loader (or decoded from a snapshot) and
/// never change afterwards. Their position in the table is the identifier the
/// spatial index uses to refer back to them.
///
/// # Examples
///
/// ```
/// use geocity::PlaceRecord;
///
/// let place = PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922)
///     .country("NI", "Nicaragua")
///     .population(35008)
///     .timezone("America/Managua")
///     .build();
///
/// assert_eq!(place.ascii_name, "Diriamba");
/// assert_eq!(place.label, "Nicaragua");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    /// GeoNames identifier (e.g., 3620170 for Diriamba)
    pub id: u64,
    /// Place name in its local spelling
    pub name: String,
    /// Place name restricted to ASCII characters
    pub ascii_name: String,
    /// Other known spellings, without duplicates; may be empty
    pub alternate_names: Vec<String>,
    /// ISO 3166-1 alpha-2 country code (e.g., "NI")
    pub country_code: String,
    /// English country name (e.g., "Nicaragua")
    pub country_name: String,
    /// Number of inhabitants, 0 when unknown
    pub population: u64,
    /// IANA timezone identifier (e.g., "America/Managua")
    pub timezone: String,
    /// Date the source entry was last modified
    pub modification_date: NaiveDate,
    /// English display label
    pub label: String,
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
}

impl PlaceRecord {
    /// Starts a record with the fields every entry needs; the rest default to empty.
    pub fn builder(id: u64, name: &str, latitude: f64, longitude: f64) -> PlaceRecordBuilder {
        PlaceRecordBuilder {
            record: PlaceRecord {
                id,
                name: name.to_string(),
                ascii_name: name.to_string(),
                alternate_names: Vec::new(),
                country_code: String::new(),
                country_name: String::new(),
                population: 0,
                timezone: String::new(),
                modification_date: NaiveDate::default(),
                label: String::new(),
                latitude,
                longitude,
            },
        }
    }

    /// The record's coordinates.
    pub fn location(&self) -> QueryCoordinate {
        QueryCoordinate::new(self.latitude, self.longitude)
    }

    /// Parses the record's timezone name, `None` if it is not a known IANA zone.
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        self.timezone.parse().ok()
    }

    /// Offset from UTC in seconds at the given instant, accounting for DST.
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use geocity::PlaceRecord;
    ///
    /// let place = PlaceRecord::builder(1, "Managua", 12.13282, -86.2504)
    ///     .timezone("America/Managua")
    ///     .build();
    /// let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    /// assert_eq!(place.utc_offset_at(noon), Some(-6 * 3600));
    /// ```
    pub fn utc_offset_at(&self, at: DateTime<Utc>) -> Option<i32> {
        let tz = self.tz()?;
        Some(
            tz.offset_from_utc_datetime(&at.naive_utc())
                .fix()
                .local_minus_utc(),
        )
    }

    pub(crate) fn in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Formats an offset in seconds the way clocks are usually labelled
/// (`UTC`, `UTC-6`, `UTC+5:30`).
///
/// ```
/// assert_eq!(geocity::types::utc_offset_str(19800), "UTC+5:30");
/// assert_eq!(geocity::types::utc_offset_str(-21600), "UTC-6");
/// assert_eq!(geocity::types::utc_offset_str(0), "UTC");
/// ```
pub fn utc_offset_str(seconds: i32) -> String {
    if seconds == 0 {
        return "UTC".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.unsigned_abs();
    let (hours, minutes) = (abs / 3600, (abs % 3600) / 60);
    if minutes == 0 {
        format!("UTC{}{}", sign, hours)
    } else {
        format!("UTC{}{}:{:02}", sign, hours, minutes)
    }
}

/// Fluent constructor for [`PlaceRecord`], mostly useful for tests and fixtures.
#[derive(Debug, Clone)]
pub struct PlaceRecordBuilder {
    record: PlaceRecord,
}

impl PlaceRecordBuilder {
    /// Sets the ASCII spelling of the name.
    pub fn ascii_name(mut self, ascii_name: &str) -> Self {
        self.record.ascii_name = ascii_name.to_string();
        self
    }

    /// Sets the alternate spellings.
    pub fn alternate_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.alternate_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the country code and name; the label follows the country name.
    pub fn country(mut self, code: &str, name: &str) -> Self {
        self.record.country_code = code.to_string();
        self.record.country_name = name.to_string();
        self.record.label = name.to_string();
        self
    }

    /// Sets the population.
    pub fn population(mut self, population: u64) -> Self {
        self.record.population = population;
        self
    }

    /// Sets the IANA timezone name.
    pub fn timezone(mut self, timezone: &str) -> Self {
        self.record.timezone = timezone.to_string();
        self
    }

    /// Sets the modification date.
    pub fn modified(mut self, date: NaiveDate) -> Self {
        self.record.modification_date = date;
        self
    }

    /// Sets the display label.
    pub fn label(mut self, label: &str) -> Self {
        self.record.label = label.to_string();
        self
    }

    /// Finishes the record.
    pub fn build(self) -> PlaceRecord {
        self.record
    }
}

/// A coordinate pair supplied by a caller.
///
/// Distances used for ranking are planar: Euclidean distance on the raw
/// (latitude, longitude) degrees, with no spherical correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryCoordinate {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl QueryCoordinate {
    /// Constructs a coordinate.
    ///
    /// ```
    /// use geocity::QueryCoordinate;
    ///
    /// let coord = QueryCoordinate::new(11.85812, -86.23922);
    /// assert_eq!(coord.latitude, 11.85812);
    /// ```
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub(crate) fn as_point(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }

    /// Planar distance in degrees, the metric the spatial index ranks by.
    ///
    /// ```
    /// use geocity::QueryCoordinate;
    ///
    /// let a = QueryCoordinate::new(0.0, 0.0);
    /// let b = QueryCoordinate::new(3.0, 4.0);
    /// assert_eq!(a.distance_to(&b), 5.0);
    /// ```
    pub fn distance_to(&self, other: &QueryCoordinate) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Great-circle distance in kilometers using the haversine formula.
    ///
    /// Informational only; results are never ranked by it.
    ///
    /// ```
    /// use geocity::QueryCoordinate;
    ///
    /// let nyc = QueryCoordinate::new(40.7128, -74.0060);
    /// let la = QueryCoordinate::new(34.0522, -118.2437);
    /// let km = nyc.haversine_km(&la);
    /// assert!(km > 3900.0 && km < 4000.0);
    /// ```
    pub fn haversine_km(&self, other: &QueryCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        6371.0 * c
    }
}

impl From<(f64, f64)> for QueryCoordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self::new(latitude, longitude)
    }
}

impl From<[f64; 2]> for QueryCoordinate {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        Self::new(latitude, longitude)
    }
}

/// A gazetteer record returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Position of the originating coordinate in a batch request; `None` for
    /// a single-coordinate request.
    pub coord_index: Option<usize>,
    /// 0-based position among the neighbors found for that coordinate, by
    /// distance, before any population reordering.
    pub rank: usize,
    /// Planar distance from the query coordinate, in degrees.
    pub distance: f64,
    /// Row of the record in the gazetteer table.
    pub row: usize,
    /// The matched place.
    pub place: PlaceRecord,
}

/// Direction of the optional population re-sort within each coordinate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopulationOrder {
    /// Least populous first
    Ascending,
    /// Most populous first
    Descending,
}

impl PopulationOrder {
    /// Maps the ternary `ascending` flag: `Some(true)`, `Some(false)` or unset.
    pub fn from_ascending(ascending: Option<bool>) -> Option<Self> {
        ascending.map(|asc| {
            if asc {
                PopulationOrder::Ascending
            } else {
                PopulationOrder::Descending
            }
        })
    }
}

/// Parameters of a query.
///
/// ```
/// use geocity::{PopulationOrder, QueryOptions};
///
/// let options = QueryOptions::default().with_k(5).ascending(false);
/// assert_eq!(options.k, 5);
/// assert_eq!(options.population_order, Some(PopulationOrder::Descending));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Number of neighbors per coordinate; must be at least 1, values above
    /// the table size are clamped.
    pub k: usize,
    /// Population ordering within each coordinate group; `None` keeps
    /// ascending distance order.
    pub population_order: Option<PopulationOrder>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            k: 1,
            population_order: None,
        }
    }
}

impl QueryOptions {
    /// Sets the number of neighbors per coordinate.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Re-sorts each group by population in the given direction.
    pub fn ascending(mut self, ascending: bool) -> Self {
        self.population_order = PopulationOrder::from_ascending(Some(ascending));
        self
    }
}

use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::assemble::{assemble, ResultSet};
use crate::error::{Error, Result};
use crate::kdtree::{Neighbor, SpatialIndex};
use crate::loader;
use crate::query::{CoordinateInput, QueryShape};
use crate::types::{PlaceRecord, QueryCoordinate, QueryOptions};

/// A loaded gazetteer together with the spatial index built over it.
///
/// This is the session object every query goes through. Build it once, then
/// share it by reference (or in an `Arc`) across as many threads as needed;
/// nothing inside changes after construction.
///
/// # Examples
///
/// ```
/// use geocity::{CoordinateInput, Geocoder, PlaceRecord, QueryOptions};
///
/// let geocoder = Geocoder::new(vec![
///     PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922).population(35008).build(),
///     PlaceRecord::builder(3620269, "Corinto", 12.4825, -87.17304).population(19183).build(),
/// ])?;
///
/// let results = geocoder.query(&CoordinateInput::from([12.4, -87.0]), &QueryOptions::default())?;
/// assert_eq!(results.records()[0].place.name, "Corinto");
/// # Ok::<(), geocity::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Geocoder {
    records: Vec<PlaceRecord>,
    index: SpatialIndex,
}

impl Geocoder {
    /// Builds the spatial index over `records`; row `i` of the table is `records[i]`.
    ///
    /// # Errors
    ///
    /// [`Error::Construction`] if `records` is empty or a record's coordinates
    /// fall outside latitude -90..=90 / longitude -180..=180.
    pub fn new(records: Vec<PlaceRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::Construction("gazetteer table is empty".to_string()));
        }
        if let Some((row, place)) = records.iter().enumerate().find(|(_, p)| !p.in_range()) {
            return Err(Error::Construction(format!(
                "row {} ({}) has out-of-range coordinates {}, {}",
                row, place.id, place.latitude, place.longitude
            )));
        }

        let points: Vec<[f64; 2]> = records.iter().map(|p| p.location().as_point()).collect();
        let index = SpatialIndex::build(&points)?;
        info!(records = records.len(), "gazetteer indexed");

        Ok(Self { records, index })
    }

    /// Loads a gazetteer from disk: `.csv` files go through the GeoNames export
    /// loader, anything else is read as a binary snapshot.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        let records = if is_csv {
            loader::read_csv(path)?
        } else {
            Database::decode(&std::fs::read(path)?)?.into_records()?
        };
        info!(path = %path.display(), records = records.len(), "gazetteer loaded");
        Self::new(records)
    }

    /// Decodes a snapshot produced by [`Geocoder::to_snapshot_bytes`] or the
    /// `build-database` tool.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self> {
        Self::new(Database::decode(bytes)?.into_records()?)
    }

    /// Encodes the table as a compact binary snapshot.
    pub fn to_snapshot_bytes(&self) -> Result<Vec<u8>> {
        Database::from_records(&self.records).encode()
    }

    /// The gazetteer table, in row order.
    pub fn records(&self) -> &[PlaceRecord] {
        &self.records
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always `false`; a geocoder cannot be built over an empty table.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The spatial index over the table.
    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// The single nearest place, or `None` for non-finite coordinates.
    pub fn nearest(&self, latitude: f64, longitude: f64) -> Option<&PlaceRecord> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        self.index
            .nearest([latitude, longitude], 1)
            .first()
            .map(|n| &self.records[n.row])
    }

    /// Resolves `input` into a single coordinate or a batch and returns the
    /// `k` nearest places for each coordinate.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `options.k` is 0.
    /// - [`Error::InvalidCoordinate`] if `input` is not one pair or a list of pairs.
    pub fn query(&self, input: &CoordinateInput, options: &QueryOptions) -> Result<ResultSet> {
        check_k(options.k)?;
        let shape = QueryShape::resolve(input)?;
        self.query_shape(&shape, options)
    }

    /// Queries an already resolved shape.
    ///
    /// Use this with [`QueryShape::Batch`] to get grouped, tagged results for
    /// a batch of exactly one coordinate.
    pub fn query_shape(&self, shape: &QueryShape, options: &QueryOptions) -> Result<ResultSet> {
        check_k(options.k)?;
        if let Some(bad) = shape
            .coordinates()
            .iter()
            .find(|c| !c.latitude.is_finite() || !c.longitude.is_finite())
        {
            return Err(Error::InvalidCoordinate(format!(
                "coordinate values must be finite, got {}, {}",
                bad.latitude, bad.longitude
            )));
        }

        let k = if options.k > self.len() {
            warn!(
                requested = options.k,
                available = self.len(),
                "k exceeds table size, clamping"
            );
            self.len()
        } else {
            options.k
        };

        let neighbors = self.search(shape.coordinates(), k);
        debug!(
            batch = shape.is_batch(),
            groups = neighbors.len(),
            k,
            "query complete"
        );

        Ok(assemble(
            &self.records,
            neighbors,
            shape.is_batch(),
            options.population_order,
        ))
    }

    #[cfg(feature = "parallel")]
    fn search(&self, coords: &[QueryCoordinate], k: usize) -> Vec<Vec<Neighbor>> {
        coords
            .par_iter()
            .map(|c| self.index.nearest(c.as_point(), k))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn search(&self, coords: &[QueryCoordinate], k: usize) -> Vec<Vec<Neighbor>> {
        coords
            .iter()
            .map(|c| self.index.nearest(c.as_point(), k))
            .collect()
    }
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidArgument(
            "k must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Compressed storage format using string table indices.
///
/// All string fields are `u32` indices into [`Database::strings`]; country
/// names, timezones and labels repeat across thousands of rows and are stored
/// once. Coordinates stay `f64` so a query at a record's own position reports
/// distance 0.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct CompactPlace {
    /// GeoNames identifier
    pub id: u64,
    /// Index into the string table for the name
    pub name: u32,
    /// Index into the string table for the ASCII name
    pub ascii_name: u32,
    /// Indices into the string table for the alternate names
    pub alternate_names: Vec<u32>,
    /// Index into the string table for the country code
    pub country_code: u32,
    /// Index into the string table for the country name
    pub country_name: u32,
    /// Number of inhabitants
    pub population: u64,
    /// Index into the string table for the timezone identifier
    pub timezone: u32,
    /// Modification date as days since 0001-01-01 (day 1)
    pub modified: i32,
    /// Index into the string table for the label
    pub label: u32,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// The binary snapshot of a gazetteer table.
///
/// Row order is preserved, so a geocoder rebuilt from a snapshot answers every
/// query exactly as the one it was written from.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct Database {
    /// Deduplicated string table
    pub strings: Vec<String>,
    /// All places in table order
    pub places: Vec<CompactPlace>,
}

impl Database {
    /// Interns the string fields of `records`.
    pub fn from_records<'a>(records: &'a [PlaceRecord]) -> Self {
        let mut positions: FxHashMap<&str, u32> = FxHashMap::default();
        let mut strings: Vec<String> = Vec::new();

        let mut intern = |s: &'a str| -> u32 {
            *positions.entry(s).or_insert_with(|| {
                strings.push(s.to_owned());
                (strings.len() - 1) as u32
            })
        };

        let places = records
            .iter()
            .map(|p| CompactPlace {
                id: p.id,
                name: intern(&p.name),
                ascii_name: intern(&p.ascii_name),
                alternate_names: p.alternate_names.iter().map(|s| intern(s)).collect(),
                country_code: intern(&p.country_code),
                country_name: intern(&p.country_name),
                population: p.population,
                timezone: intern(&p.timezone),
                modified: chrono::Datelike::num_days_from_ce(&p.modification_date),
                label: intern(&p.label),
                latitude: p.latitude,
                longitude: p.longitude,
            })
            .collect();

        Self { strings, places }
    }

    /// Expands the snapshot back into records, in stored order.
    ///
    /// # Errors
    ///
    /// [`Error::Snapshot`] if a string index or date is out of range.
    pub fn into_records(self) -> Result<Vec<PlaceRecord>> {
        let strings = self.strings;
        let lookup = |idx: u32| -> Result<String> {
            strings
                .get(idx as usize)
                .cloned()
                .ok_or_else(|| Error::Snapshot(format!("string index {} out of range", idx)))
        };

        self.places
            .into_iter()
            .map(|p| {
                Ok(PlaceRecord {
                    id: p.id,
                    name: lookup(p.name)?,
                    ascii_name: lookup(p.ascii_name)?,
                    alternate_names: p
                        .alternate_names
                        .iter()
                        .map(|&idx| lookup(idx))
                        .collect::<Result<_>>()?,
                    country_code: lookup(p.country_code)?,
                    country_name: lookup(p.country_name)?,
                    population: p.population,
                    timezone: lookup(p.timezone)?,
                    modification_date: chrono::NaiveDate::from_num_days_from_ce_opt(p.modified)
                        .ok_or_else(|| {
                            Error::Snapshot(format!("invalid date for place {}", p.id))
                        })?,
                    label: lookup(p.label)?,
                    latitude: p.latitude,
                    longitude: p.longitude,
                })
            })
            .collect()
    }

    /// Serializes with bincode's standard configuration.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Deserializes bytes written by [`Database::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (db, _): (Database, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PopulationOrder;
    use chrono::NaiveDate;

    fn places() -> Vec<PlaceRecord> {
        vec![
            PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922)
                .alternate_names(["Diriamba", "Diriambo"])
                .country("NI", "Nicaragua")
                .population(35008)
                .timezone("America/Managua")
                .modified(NaiveDate::from_ymd_opt(2018, 8, 8).unwrap())
                .build(),
            PlaceRecord::builder(3620163, "Dolores", 11.85672, -86.21552)
                .country("NI", "Nicaragua")
                .population(7065)
                .timezone("America/Managua")
                .modified(NaiveDate::from_ymd_opt(2018, 8, 8).unwrap())
                .build(),
            PlaceRecord::builder(3620269, "Corinto", 12.4825, -87.17304)
                .country("NI", "Nicaragua")
                .population(19183)
                .timezone("America/Managua")
                .modified(NaiveDate::from_ymd_opt(2018, 8, 8).unwrap())
                .build(),
        ]
    }

    #[test]
    fn empty_table_is_a_construction_error() {
        assert!(matches!(
            Geocoder::new(Vec::new()),
            Err(Error::Construction(_))
        ));
    }

    #[test]
    fn out_of_range_record_is_a_construction_error() {
        let mut records = places();
        records[1].latitude = 91.0;
        let err = Geocoder::new(records).unwrap_err();
        assert!(matches!(err, Error::Construction(msg) if msg.contains("row 1")));
    }

    #[test]
    fn zero_k_is_rejected_before_coordinates() {
        let geocoder = Geocoder::new(places()).unwrap();
        let err = geocoder
            .query(
                &CoordinateInput::from(vec![1.0, 2.0, 3.0]),
                &QueryOptions::default().with_k(0),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn nearest_convenience() {
        let geocoder = Geocoder::new(places()).unwrap();
        assert_eq!(geocoder.nearest(12.4, -87.1).unwrap().name, "Corinto");
        assert!(geocoder.nearest(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn explicit_one_element_batch_is_tagged() {
        let geocoder = Geocoder::new(places()).unwrap();
        let shape = QueryShape::Batch(vec![QueryCoordinate::new(11.85812, -86.23922)]);
        let set = geocoder
            .query_shape(&shape, &QueryOptions::default())
            .unwrap();
        assert!(set.is_batch());
        assert_eq!(set.records()[0].coord_index, Some(0));
    }

    #[test]
    fn k_is_clamped_to_table_size() {
        let geocoder = Geocoder::new(places()).unwrap();
        let set = geocoder
            .query(
                &CoordinateInput::from([11.85812, -86.23922]),
                &QueryOptions::default().with_k(10),
            )
            .unwrap();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn population_order_applies_to_single_queries() {
        let geocoder = Geocoder::new(places()).unwrap();
        let options = QueryOptions {
            k: 2,
            population_order: Some(PopulationOrder::Descending),
        };
        let set = geocoder
            .query(&CoordinateInput::from([11.8567, -86.2155]), &options)
            .unwrap();
        // Dolores is nearer, Diriamba is larger.
        let names: Vec<_> = set.iter().map(|r| r.place.name.as_str()).collect();
        assert_eq!(names, vec!["Diriamba", "Dolores"]);
        assert_eq!(set.records()[0].rank, 1);
    }

    #[test]
    fn snapshot_preserves_table() {
        let geocoder = Geocoder::new(places()).unwrap();
        let bytes = geocoder.to_snapshot_bytes().unwrap();
        let restored = Geocoder::from_snapshot_bytes(&bytes).unwrap();
        assert_eq!(restored.records(), geocoder.records());
    }

    #[test]
    fn snapshot_interns_repeated_strings() {
        let db = Database::from_records(&places());
        let nicaragua = db.strings.iter().filter(|s| *s == "Nicaragua").count();
        assert_eq!(nicaragua, 1);
        assert_eq!(db.places[0].country_name, db.places[2].label);
        assert_eq!(db.places[0].name, 0);
        assert_eq!(db.strings[db.places[1].name as usize], places()[1].name);
    }

    #[test]
    fn corrupt_snapshot_is_reported() {
        let mut db = Database::from_records(&places());
        db.places[0].name = 999;
        assert!(matches!(db.into_records(), Err(Error::Snapshot(_))));
        assert!(matches!(
            Database::decode(&[0xff, 0xff, 0xff]),
            Err(Error::Snapshot(_))
        ));
    }
}

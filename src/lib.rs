//! Offline reverse geocoding with k-nearest place lookup.
//!
//! `geocity` maps latitude/longitude pairs to the nearest populated places of a
//! GeoNames gazetteer: name, country, population, timezone and more. Everything
//! runs in-process against a table loaded once, with no network calls.
//!
//! # Features
//!
//! - **k-Nearest Lookup** - Up to `k` candidates per coordinate, nearest first
//! - **Batch Queries** - One call for many coordinates, grouped in request order
//! - **Population Ranking** - Re-sort each group's candidates by population
//! - **Deterministic** - Equidistant places come back in table order
//! - **Thread-Safe** - The built [`Geocoder`] is immutable and `Send + Sync`
//! - **Compact Snapshots** - Interned, bincode-encoded tables load in milliseconds
//!
//! # Quick Start
//!
//! ```
//! use geocity::{Geocoder, PlaceRecord};
//!
//! # fn main() -> Result<(), geocity::Error> {
//! let geocoder = Geocoder::new(vec![
//!     PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922)
//!         .country("NI", "Nicaragua")
//!         .population(35008)
//!         .build(),
//!     PlaceRecord::builder(3620269, "Corinto", 12.4825, -87.17304)
//!         .country("NI", "Nicaragua")
//!         .population(19183)
//!         .build(),
//! ])?;
//!
//! // Single coordinate
//! let results = geocity::query(&geocoder, [11.86, -86.24], 1, None)?;
//! assert_eq!(results.records()[0].place.name, "Diriamba");
//!
//! // Batch: results are grouped per input coordinate
//! let results = geocity::query(&geocoder, vec![[11.86, -86.24], [12.48, -87.17]], 1, None)?;
//! assert_eq!(results.records()[1].coord_index, Some(1));
//! assert_eq!(results.records()[1].place.name, "Corinto");
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ## Gazetteer Table
//!
//! A `Vec<PlaceRecord>` fixed at load time. Row positions are the only thing
//! the index knows about records; it never holds their content.
//!
//! ## Spatial Index
//!
//! A balanced 2-D k-d tree ([`SpatialIndex`]) over `(latitude, longitude)`,
//! split alternately on each axis at the median. Distances are planar
//! Euclidean distances in degrees. That is not a geodesic distance and ranks
//! places near the poles or across the antimeridian poorly, but it keeps
//! results identical to the reference datasets' tooling.
//!
//! ## Query Resolution
//!
//! Input is resolved by [`QueryShape::resolve`]: two numbers after flattening
//! mean one coordinate, a list of pairs means a batch. See [`query`] for what
//! this implies for one-element batches.
//!
//! ## Result Assembly
//!
//! Neighbors become [`ResultRecord`]s carrying the place, its distance, its
//! distance rank and, for batches, the originating coordinate's position.
//! Groups stay in request order; an optional [`PopulationOrder`] re-sorts
//! records within each group only.
//!
//! # Thread Safety
//!
//! Construction is the only write. After that any number of threads can query
//! the same [`Geocoder`] without locks. With the default `parallel` feature,
//! batch queries also fan out across a rayon pool; output order is unaffected.
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use geocity::{Geocoder, PlaceRecord};
//!
//! let geocoder = Arc::new(Geocoder::new(vec![
//!     PlaceRecord::builder(1, "Diriamba", 11.85812, -86.23922).build(),
//! ]).unwrap());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let geocoder = Arc::clone(&geocoder);
//!         thread::spawn(move || geocoder.nearest(11.0 + i as f64, -86.0).map(|p| p.id))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     assert_eq!(handle.join().unwrap(), Some(1));
//! }
//! ```
//!
//! # Data Sources
//!
//! Tables come from [GeoNames.org](https://www.geonames.org/) under the
//! [Creative Commons Attribution 4.0 License](https://creativecommons.org/licenses/by/4.0/),
//! either as the semicolon-separated cities export ([`loader`]) or as a binary
//! snapshot written by the `build-database` tool ([`Database`]).
//!
//! # Modules
//!
//! - [`types`] - Records, coordinates and query options
//! - [`kdtree`] - The spatial index
//! - [`query`] - Coordinate input and shape resolution
//! - [`output`] - Row and column renderings of results
//! - [`loader`] - GeoNames export reader

#![warn(missing_docs)]

mod assemble;
mod database;
mod error;
pub mod kdtree;
pub mod loader;
pub mod output;
pub mod query;
pub mod types;

pub use assemble::ResultSet;
pub use database::{CompactPlace, Database, Geocoder};
pub use error::{Error, Result};
pub use kdtree::{Neighbor, SpatialIndex};
pub use output::{OutputMode, Row};
pub use query::{CoordinateInput, QueryShape};
pub use types::{PlaceRecord, PopulationOrder, QueryCoordinate, QueryOptions, ResultRecord};

/// Builds a geocoder (gazetteer table plus spatial index) over `records`.
///
/// Equivalent to [`Geocoder::new`].
///
/// # Errors
///
/// [`Error::Construction`] if `records` is empty or holds out-of-range coordinates.
pub fn build_index(records: Vec<PlaceRecord>) -> Result<Geocoder> {
    Geocoder::new(records)
}

/// Finds the `k` nearest places for a coordinate or a batch of coordinates.
///
/// `ascending` re-sorts each coordinate's results by population: `Some(true)`
/// least populous first, `Some(false)` most populous first, `None` keeps
/// ascending distance.
///
/// # Shape resolution
///
/// If `coordinates` flattens to exactly two numbers it is one coordinate and
/// its results carry no `coord_index`. This includes a batch holding a single
/// pair, `[[lat, lon]]`. Use [`Geocoder::query_shape`] with
/// [`QueryShape::Batch`] when tagged results are needed for one pair.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if `k` is 0
/// - [`Error::InvalidCoordinate`] if `coordinates` is not one pair or a list of pairs
///
/// # Examples
///
/// ```
/// use geocity::{Geocoder, PlaceRecord};
///
/// let geocoder = Geocoder::new(vec![
///     PlaceRecord::builder(3620170, "Diriamba", 11.85812, -86.23922).population(35008).build(),
///     PlaceRecord::builder(3620163, "Dolores", 11.85672, -86.21552).population(7065).build(),
/// ]).unwrap();
///
/// // Dolores is nearer, Diriamba more populous.
/// let results = geocity::query(&geocoder, [11.8567, -86.2155], 2, Some(false)).unwrap();
/// assert_eq!(results.records()[0].place.name, "Diriamba");
///
/// assert!(geocity::query(&geocoder, [11.8567, -86.2155], 0, None).is_err());
/// ```
pub fn query(
    geocoder: &Geocoder,
    coordinates: impl Into<CoordinateInput>,
    k: usize,
    ascending: Option<bool>,
) -> Result<ResultSet> {
    let options = QueryOptions {
        k,
        population_order: PopulationOrder::from_ascending(ascending),
    };
    geocoder.query(&coordinates.into(), &options)
}

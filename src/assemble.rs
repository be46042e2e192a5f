//! Turns raw neighbor lists into ordered result records.

use serde::Serialize;

use crate::kdtree::Neighbor;
use crate::types::{PlaceRecord, PopulationOrder, ResultRecord};

/// The ordered records produced by one query.
///
/// Records are grouped by originating coordinate, groups appearing in request
/// order. Inside a group records are in ascending distance order unless a
/// [`PopulationOrder`] was requested, in which case they are stably re-sorted by
/// population (equal populations keep their distance order).
///
/// The set owns copies of the matched places and stays valid independently of
/// the [`Geocoder`](crate::Geocoder) that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    records: Vec<ResultRecord>,
    group_len: usize,
    batch: bool,
}

impl ResultSet {
    /// All records, flat, group after group.
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    /// Consumes the set, returning the flat record list.
    pub fn into_records(self) -> Vec<ResultRecord> {
        self.records
    }

    /// Records split per originating coordinate, in request order.
    ///
    /// A single-coordinate request yields exactly one group.
    pub fn groups(&self) -> impl Iterator<Item = &[ResultRecord]> {
        self.records.chunks(self.group_len.max(1))
    }

    /// Whether the request was resolved as a batch, i.e. records carry a
    /// `coord_index`.
    pub fn is_batch(&self) -> bool {
        self.batch
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates the flat record list.
    pub fn iter(&self) -> std::slice::Iter<'_, ResultRecord> {
        self.records.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = ResultRecord;
    type IntoIter = std::vec::IntoIter<ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ResultRecord;
    type IntoIter = std::slice::Iter<'a, ResultRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Materializes neighbor lists (one per coordinate, in request order) against
/// the table they were found in.
pub(crate) fn assemble(
    table: &[PlaceRecord],
    neighbors: Vec<Vec<Neighbor>>,
    batch: bool,
    order: Option<PopulationOrder>,
) -> ResultSet {
    let group_len = neighbors.first().map_or(0, Vec::len);
    let mut records = Vec::with_capacity(group_len * neighbors.len());

    for (coord_index, group) in neighbors.into_iter().enumerate() {
        let start = records.len();
        records.extend(group.into_iter().enumerate().map(|(rank, n)| ResultRecord {
            coord_index: batch.then_some(coord_index),
            rank,
            distance: n.distance,
            row: n.row,
            place: table[n.row].clone(),
        }));
        if let Some(order) = order {
            sort_by_population(&mut records[start..], order);
        }
    }

    ResultSet {
        records,
        group_len,
        batch,
    }
}

fn sort_by_population(group: &mut [ResultRecord], order: PopulationOrder) {
    match order {
        PopulationOrder::Ascending => group.sort_by_key(|r| r.place.population),
        PopulationOrder::Descending => {
            group.sort_by(|a, b| b.place.population.cmp(&a.place.population))
        }
    }
}

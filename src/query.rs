//! Normalization of caller coordinates into single or batch queries.
//!
//! Callers hand over either one coordinate pair or a sequence of pairs, often
//! straight from JSON. [`QueryShape::resolve`] decides which one it is:
//!
//! 1. The input must be a rectangular nest of numbers (no ragged lists, no
//!    strings, booleans or nulls, no NaN or infinities).
//! 2. Flattened, exactly two numbers mean a single coordinate. Results of a
//!    single query carry no coordinate-group tag.
//! 3. Otherwise the input must be a list of pairs, each becoming one
//!    coordinate of a batch in the given order.
//!
//! A batch holding one pair, `[[lat, lon]]`, flattens to two numbers and is
//! therefore resolved as a single coordinate. This is long-standing behavior
//! that callers rely on; pass the pair through [`QueryShape::Batch`] directly
//! to get group tags for a one-element batch.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::QueryCoordinate;

/// Loosely shaped coordinate input, as received from a caller.
///
/// Deserializes from any JSON value; anything that is neither a number nor a
/// list is kept as [`CoordinateInput::Other`] and rejected during resolution.
///
/// # Examples
///
/// ```
/// use geocity::CoordinateInput;
///
/// let single = CoordinateInput::from([11.85812, -86.23922]);
/// let batch = CoordinateInput::from(vec![[11.85812, -86.23922], [12.4825, -87.17304]]);
/// let parsed = CoordinateInput::from_json("[[11.85812, -86.23922], [12.4825, -87.17304]]").unwrap();
/// assert_eq!(parsed, batch);
/// assert_ne!(single, batch);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    /// A bare number
    Number(f64),
    /// A sequence, possibly nested
    List(Vec<CoordinateInput>),
    /// Anything else (strings, booleans, null, objects)
    Other(serde_json::Value),
}

impl CoordinateInput {
    /// Parses JSON text such as `[11.8, -86.2]` or `[[11.8, -86.2], [12.4, -87.1]]`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCoordinate`] if the text is not valid JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidCoordinate(e.to_string()))
    }

    /// Dimensions of the nest, outermost first; a bare number has none.
    fn dims(&self) -> Result<Vec<usize>> {
        match self {
            CoordinateInput::Number(_) => Ok(Vec::new()),
            CoordinateInput::Other(value) => Err(Error::InvalidCoordinate(format!(
                "expected a number, got {}",
                value
            ))),
            CoordinateInput::List(items) => {
                let Some((first, rest)) = items.split_first() else {
                    return Ok(vec![0]);
                };
                let inner = first.dims()?;
                for item in rest {
                    if item.dims()? != inner {
                        return Err(Error::InvalidCoordinate(
                            "ragged nested sequence".to_string(),
                        ));
                    }
                }
                let mut dims = Vec::with_capacity(inner.len() + 1);
                dims.push(items.len());
                dims.extend(inner);
                Ok(dims)
            }
        }
    }

    fn flatten_into(&self, out: &mut Vec<f64>) {
        match self {
            CoordinateInput::Number(value) => out.push(*value),
            CoordinateInput::List(items) => items.iter().for_each(|item| item.flatten_into(out)),
            CoordinateInput::Other(_) => {}
        }
    }
}

impl From<f64> for CoordinateInput {
    fn from(value: f64) -> Self {
        CoordinateInput::Number(value)
    }
}

impl From<[f64; 2]> for CoordinateInput {
    fn from([latitude, longitude]: [f64; 2]) -> Self {
        CoordinateInput::List(vec![latitude.into(), longitude.into()])
    }
}

impl From<(f64, f64)> for CoordinateInput {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        [latitude, longitude].into()
    }
}

impl From<QueryCoordinate> for CoordinateInput {
    fn from(coord: QueryCoordinate) -> Self {
        [coord.latitude, coord.longitude].into()
    }
}

impl From<&[[f64; 2]]> for CoordinateInput {
    fn from(pairs: &[[f64; 2]]) -> Self {
        CoordinateInput::List(pairs.iter().map(|&pair| pair.into()).collect())
    }
}

impl<T: Into<CoordinateInput>> From<Vec<T>> for CoordinateInput {
    fn from(items: Vec<T>) -> Self {
        CoordinateInput::List(items.into_iter().map(Into::into).collect())
    }
}

/// A request after shape resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryShape {
    /// One coordinate; results are not tagged with a group.
    Single(QueryCoordinate),
    /// Ordered coordinates; results are grouped and tagged by position.
    Batch(Vec<QueryCoordinate>),
}

impl QueryShape {
    /// Resolves loosely shaped input into a single coordinate or a batch.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidCoordinate`] for non-numeric or non-finite values,
    /// ragged nesting, or any shape other than one pair or a list of pairs.
    /// Nothing is partially resolved: one bad pair rejects the whole batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use geocity::{CoordinateInput, QueryCoordinate, QueryShape};
    ///
    /// let shape = QueryShape::resolve(&CoordinateInput::from([11.85812, -86.23922])).unwrap();
    /// assert_eq!(shape, QueryShape::Single(QueryCoordinate::new(11.85812, -86.23922)));
    ///
    /// // A one-pair batch flattens to two numbers and resolves as a single coordinate.
    /// let shape = QueryShape::resolve(&CoordinateInput::from(vec![[11.85812, -86.23922]])).unwrap();
    /// assert!(!shape.is_batch());
    ///
    /// assert!(QueryShape::resolve(&CoordinateInput::from(vec![1.0, 2.0, 3.0])).is_err());
    /// ```
    pub fn resolve(input: &CoordinateInput) -> Result<Self> {
        let dims = input.dims()?;
        if dims.is_empty() {
            return Err(Error::InvalidCoordinate(
                "expected a coordinate pair or a list of pairs, got a single number".to_string(),
            ));
        }

        let mut flat = Vec::with_capacity(dims.iter().product());
        input.flatten_into(&mut flat);
        if let Some(bad) = flat.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidCoordinate(format!(
                "coordinate values must be finite, got {}",
                bad
            )));
        }

        if flat.len() == 2 {
            return Ok(QueryShape::Single(QueryCoordinate::new(flat[0], flat[1])));
        }

        match dims.as_slice() {
            [_, 2] => Ok(QueryShape::Batch(
                flat.chunks_exact(2)
                    .map(|pair| QueryCoordinate::new(pair[0], pair[1]))
                    .collect(),
            )),
            _ => Err(Error::InvalidCoordinate(format!(
                "expected a coordinate pair or a list of pairs, got shape ({})",
                dims.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    /// The coordinates to search for, in request order.
    pub fn coordinates(&self) -> &[QueryCoordinate] {
        match self {
            QueryShape::Single(coord) => std::slice::from_ref(coord),
            QueryShape::Batch(coords) => coords.as_slice(),
        }
    }

    /// Whether results should carry a coordinate-group tag.
    pub fn is_batch(&self) -> bool {
        matches!(self, QueryShape::Batch(_))
    }
}

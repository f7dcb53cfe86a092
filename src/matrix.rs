//! The [`EventMatrix`] and [`Profile`] types.
//!
//! An [`EventMatrix`] is the common currency of this library: one row per
//! genomic event (e.g. a skipped exon or a peak), one column per position
//! relative to some landmark of the event. Both axes carry labels. Rows are
//! identified by an event name, which is what normalized signal and control
//! matrices are joined on; columns are an ordered list of position labels.
//!
//! # Missing Values
//!
//! Upstream density files use `-1` to mark positions that are not covered by
//! an event (e.g. a region that runs off the end of a short exon). These are
//! *not* zero densities, so they are stored as `None` and skipped by every
//! sum, mean, and test. Use [`EventMatrix::from_raw`] to convert the sentinel
//! encoding into this representation.

use indexmap::IndexSet;
use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::RbpMapsError;

/// The value upstream density files use for uncovered positions.
pub const MISSING_SENTINEL: f64 = -1.0;

/// An event × position matrix of optional values.
#[derive(Clone, Debug)]
pub struct EventMatrix {
    events: IndexSet<String>,
    positions: Vec<String>,
    values: Array2<Option<f64>>,
}

impl EventMatrix {
    /// Create a new [`EventMatrix`] from event identifiers, position labels,
    /// and an `Array2` of optional values.
    ///
    /// Any `Some(NaN)` cell is stored as missing.
    pub fn new(
        events: Vec<String>,
        positions: Vec<String>,
        mut values: Array2<Option<f64>>,
    ) -> Result<Self, RbpMapsError> {
        if values.nrows() != events.len() {
            return Err(RbpMapsError::EventCountMismatch {
                events: events.len(),
                rows: values.nrows(),
            });
        }
        if values.ncols() != positions.len() {
            return Err(RbpMapsError::RaggedMatrix {
                expected: positions.len(),
                found: values.ncols(),
            });
        }
        let mut event_set = IndexSet::with_capacity(events.len());
        for event in events {
            if event_set.contains(&event) {
                return Err(RbpMapsError::DuplicateEvent(event));
            }
            event_set.insert(event);
        }
        values.mapv_inplace(|x| x.filter(|v| !v.is_nan()));
        Ok(Self {
            events: event_set,
            positions,
            values,
        })
    }

    /// Create a new [`EventMatrix`] from raw densities, where
    /// [`MISSING_SENTINEL`] (or NaN) marks a missing cell.
    pub fn from_raw(
        events: Vec<String>,
        positions: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, RbpMapsError> {
        let values = values.mapv(|x| {
            if x == MISSING_SENTINEL || x.is_nan() {
                None
            } else {
                Some(x)
            }
        });
        Self::new(events, positions, values)
    }

    /// Like [`EventMatrix::from_raw`], but from a `Vec` of rows.
    pub fn from_raw_rows(
        events: Vec<String>,
        positions: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, RbpMapsError> {
        let ncols = positions.len();
        let nrows = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != ncols) {
            return Err(RbpMapsError::RaggedMatrix {
                expected: ncols,
                found: row.len(),
            });
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((nrows, ncols), flat)?;
        Self::from_raw(events, positions, values)
    }

    /// Get the number of events (rows).
    pub fn nevents(&self) -> usize {
        self.values.nrows()
    }

    /// Get the number of positions (columns).
    pub fn npositions(&self) -> usize {
        self.values.ncols()
    }

    /// Return whether this matrix has no events.
    pub fn is_empty(&self) -> bool {
        self.nevents() == 0
    }

    /// The ordered position labels.
    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    /// Iterate over the event identifiers, in row order.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|event| event.as_str())
    }

    /// Get the row index of an event.
    pub fn event_index(&self, event: &str) -> Option<usize> {
        self.events.get_index_of(event)
    }

    /// The underlying values.
    pub fn values(&self) -> &Array2<Option<f64>> {
        &self.values
    }

    /// Get a view of the row for `event`.
    pub fn row(&self, event: &str) -> Option<ArrayView1<'_, Option<f64>>> {
        self.event_index(event)
            .map(|index| self.values.index_axis(Axis(0), index))
    }

    /// Get the value of `event` at column index `position`.
    pub fn get(&self, event: &str, position: usize) -> Option<f64> {
        let index = self.event_index(event)?;
        self.values.get((index, position)).copied().flatten()
    }

    /// Collect the present (non-missing) values of column `position`.
    pub fn column_values(&self, position: usize) -> Vec<f64> {
        self.values
            .index_axis(Axis(1), position)
            .iter()
            .filter_map(|x| *x)
            .collect()
    }

    /// Sum the present values of each row.
    pub fn row_sums(&self) -> Array1<f64> {
        self.values
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter_map(|x| *x).sum())
            .collect()
    }

    /// The smallest strictly positive present value, if any.
    pub fn min_positive(&self) -> Option<f64> {
        self.values
            .iter()
            .filter_map(|x| *x)
            .filter(|x| *x > 0.0)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Check that every present value is a non-negative density.
    ///
    /// Event matrices in general may hold negative values (e.g. a
    /// subtraction), but raw densities may not.
    pub fn ensure_nonnegative(&self) -> Result<(), RbpMapsError> {
        for ((row, column), value) in self.values.indexed_iter() {
            if let Some(value) = value {
                if *value < 0.0 {
                    return Err(RbpMapsError::NegativeDensity {
                        event: self.events.get_index(row).cloned().unwrap_or_default(),
                        position: self.positions[column].clone(),
                        value: *value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Keep only rows whose summed signal exceeds `threshold`.
    ///
    /// Rows summing to zero (including rows with every cell missing) are
    /// always dropped. Returns the filtered matrix and the number of rows
    /// dropped.
    pub fn filter_by_density(&self, threshold: f64) -> (EventMatrix, usize) {
        let keep: Vec<usize> = self
            .row_sums()
            .iter()
            .enumerate()
            .filter(|(_, sum)| **sum > threshold && **sum > 0.0)
            .map(|(index, _)| index)
            .collect();
        let dropped = self.nevents() - keep.len();
        (self.select_rows(&keep), dropped)
    }

    /// Build a new matrix from the rows at `indices`, in that order.
    fn select_rows(&self, indices: &[usize]) -> EventMatrix {
        let events = indices
            .iter()
            .filter_map(|index| self.events.get_index(*index).cloned())
            .collect();
        EventMatrix {
            events,
            positions: self.positions.clone(),
            values: self.values.select(Axis(0), indices),
        }
    }

    /// Apply `func` to every present cell, leaving missing cells missing.
    pub fn map_present<F>(&self, func: F) -> EventMatrix
    where
        F: Fn(f64) -> f64,
    {
        EventMatrix {
            events: self.events.clone(),
            positions: self.positions.clone(),
            values: self.values.mapv(|x| x.map(&func)),
        }
    }

    /// Replace the values, keeping the labels. `values` must have the
    /// same shape as this matrix.
    pub(crate) fn with_values(&self, values: Array2<Option<f64>>) -> EventMatrix {
        assert_eq!(
            values.dim(),
            self.values.dim(),
            "Replacement values have a different shape than the EventMatrix!"
        );
        EventMatrix {
            events: self.events.clone(),
            positions: self.positions.clone(),
            values,
        }
    }

    /// Combine two matrices with identical events and positions cell by
    /// cell. A cell missing on either side is missing in the output.
    pub(crate) fn zip_present<F>(&self, other: &EventMatrix, func: F) -> EventMatrix
    where
        F: Fn(f64, f64) -> f64,
    {
        debug_assert_eq!(self.values.dim(), other.values.dim());
        let mut values = self.values.clone();
        values.zip_mut_with(&other.values, |left, right| {
            *left = match (*left, *right) {
                (Some(left), Some(right)) => Some(func(left, right)),
                _ => None,
            }
        });
        EventMatrix {
            events: self.events.clone(),
            positions: self.positions.clone(),
            values,
        }
    }

    /// The mean over events of each position, ignoring missing cells.
    pub fn column_means(&self) -> Profile {
        let values = (0..self.npositions())
            .map(|position| {
                let column = self.column_values(position);
                if column.is_empty() {
                    None
                } else {
                    Some(column.iter().sum::<f64>() / column.len() as f64)
                }
            })
            .collect();
        Profile {
            positions: self.positions.clone(),
            values,
        }
    }

    /// Check that `other` shares this matrix's position axis.
    pub fn ensure_same_positions(&self, other: &EventMatrix) -> Result<(), RbpMapsError> {
        if self.positions != other.positions {
            return Err(RbpMapsError::PositionMismatch {
                left: self.npositions(),
                right: other.npositions(),
            });
        }
        Ok(())
    }
}

impl PartialEq for EventMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.events.iter().eq(other.events.iter())
            && self.positions == other.positions
            && self.values == other.values
    }
}

/// A single position-indexed series, e.g. the mean of a matrix over events.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    positions: Vec<String>,
    values: Array1<Option<f64>>,
}

impl Profile {
    /// Create a new [`Profile`].
    pub fn new(positions: Vec<String>, values: Array1<Option<f64>>) -> Result<Self, RbpMapsError> {
        if positions.len() != values.len() {
            return Err(RbpMapsError::RaggedMatrix {
                expected: positions.len(),
                found: values.len(),
            });
        }
        Ok(Self { positions, values })
    }

    /// The ordered position labels.
    pub fn positions(&self) -> &[String] {
        &self.positions
    }

    /// The values, one per position.
    pub fn values(&self) -> &Array1<Option<f64>> {
        &self.values
    }

    /// Get the value at column index `position`.
    pub fn get(&self, position: usize) -> Option<f64> {
        self.values.get(position).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subtract `other` position by position.
    pub(crate) fn difference(&self, other: &Profile) -> Profile {
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(left, right)| match (left, right) {
                (Some(left), Some(right)) => Some(left - right),
                _ => None,
            })
            .collect();
        Profile {
            positions: self.positions.clone(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{density_test_case_01, labels};

    #[test]
    fn test_sentinel_is_missing() {
        let m = EventMatrix::from_raw_rows(
            labels("event", 2),
            labels("pos", 3),
            vec![vec![1.0, -1.0, 3.0], vec![f64::NAN, 0.0, 2.0]],
        )
        .unwrap();
        assert_eq!(m.get("event0", 1), None);
        assert_eq!(m.get("event1", 0), None);
        assert_eq!(m.get("event1", 1), Some(0.0));
        assert_eq!(m.row_sums().to_vec(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_ragged_rows() {
        let result = EventMatrix::from_raw_rows(
            labels("event", 2),
            labels("pos", 3),
            vec![vec![1.0, 2.0, 3.0], vec![1.0]],
        );
        assert!(matches!(
            result,
            Err(RbpMapsError::RaggedMatrix {
                expected: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn test_duplicate_event() {
        let result = EventMatrix::from_raw_rows(
            vec!["a".to_string(), "a".to_string()],
            labels("pos", 1),
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(result, Err(RbpMapsError::DuplicateEvent(e)) if e == "a"));
    }

    #[test]
    fn test_filter_by_density() {
        let m = EventMatrix::from_raw_rows(
            labels("event", 3),
            labels("pos", 2),
            vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![5.0, -1.0]],
        )
        .unwrap();

        let (kept, dropped) = m.filter_by_density(0.0);
        assert_eq!(dropped, 1);
        assert_eq!(kept.events().collect::<Vec<_>>(), vec!["event1", "event2"]);

        let (kept, dropped) = m.filter_by_density(2.0);
        assert_eq!(dropped, 2);
        assert_eq!(kept.events().collect::<Vec<_>>(), vec!["event2"]);

        // zero-sum rows are dropped even with a negative threshold
        let (_, dropped) = m.filter_by_density(-10.0);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_min_positive() {
        let m = density_test_case_01();
        assert_eq!(m.min_positive(), Some(2.0));
    }

    #[test]
    fn test_column_means_skip_missing() {
        let m = EventMatrix::from_raw_rows(
            labels("event", 2),
            labels("pos", 3),
            vec![vec![1.0, -1.0, -1.0], vec![3.0, 4.0, -1.0]],
        )
        .unwrap();
        let means = m.column_means();
        assert_eq!(means.get(0), Some(2.0));
        assert_eq!(means.get(1), Some(4.0));
        assert_eq!(means.get(2), None);
    }

    #[test]
    fn test_position_mismatch() {
        let a = density_test_case_01();
        let b = EventMatrix::from_raw_rows(labels("event", 1), labels("pos", 2), vec![vec![1.0, 1.0]])
            .unwrap();
        assert!(matches!(
            a.ensure_same_positions(&b),
            Err(RbpMapsError::PositionMismatch { left: 3, right: 2 })
        ));
    }
}

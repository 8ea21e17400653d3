//! Copy-on-write matrices of shared vectors.
//!
//! A [`SharedMatrix`] never edits its vector array in place. Loading builds a
//! brand-new array and swaps it into an [`ArcSwap`] slot, so a reader that
//! took a snapshot before the swap keeps working on the old vectors.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::{MemoryError, Result};
use crate::lock_order;
use crate::orientation::Orientation;
use crate::vector::SharedVector;

/// An immutable snapshot of a matrix's vectors.
pub type Snapshot = Arc<Vec<Arc<SharedVector>>>;

/// A rectangular matrix held as a collection of [`SharedVector`]s.
///
/// All vectors share one length and one orientation. A row-major matrix holds
/// one vector per row; a column-major matrix holds one vector per column.
pub struct SharedMatrix {
    id: u64,
    vectors: ArcSwap<Vec<Arc<SharedVector>>>,
}

impl SharedMatrix {
    /// Creates an empty matrix.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: lock_order::next_id(),
            vectors: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Creates a row-major matrix from a 2D array.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotRectangular`] if the rows differ in length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let matrix = Self::new();
        matrix.load_row_major(rows)?;
        Ok(matrix)
    }

    /// Returns the identity used for lock ordering.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Replaces the contents with one row vector per input row.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotRectangular`] if the rows differ in length.
    /// The current contents are left untouched on error.
    pub fn load_row_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        check_rectangular(rows)?;
        let vectors = rows
            .iter()
            .map(|row| Arc::new(SharedVector::row(row.clone())))
            .collect();
        self.vectors.store(Arc::new(vectors));
        Ok(())
    }

    /// Replaces the contents with one column vector per input column.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::NotRectangular`] if the rows differ in length.
    /// The current contents are left untouched on error.
    pub fn load_column_major(&self, rows: &[Vec<f64>]) -> Result<()> {
        let num_cols = check_rectangular(rows)?;
        let vectors = (0..num_cols)
            .map(|col| {
                let column = rows.iter().map(|row| row[col]).collect();
                Arc::new(SharedVector::column(column))
            })
            .collect();
        self.vectors.store(Arc::new(vectors));
        Ok(())
    }

    /// Returns the contents as row-major data.
    ///
    /// Every vector of the current snapshot stays read-locked while copying,
    /// so the result is consistent even while other threads mutate rows.
    ///
    /// A column-major read takes as many rows as the shortest vector holds,
    /// so vectors left at different lengths by direct edits never index out
    /// of bounds.
    #[must_use]
    pub fn read_row_major(&self) -> Vec<Vec<f64>> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let reads = SharedVector::read_all(&snapshot);
        let states = reads.by_index();
        let first = states[0];

        match first.orientation {
            Orientation::RowMajor => states.iter().map(|s| s.values.clone()).collect(),
            Orientation::ColumnMajor => {
                let rows = states.iter().map(|s| s.values.len()).min().unwrap_or(0);
                (0..rows)
                    .map(|row| states.iter().map(|column| column.values[row]).collect())
                    .collect()
            }
        }
    }

    /// Returns the vector at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::IndexOutOfBounds`] if `index >= len`.
    pub fn get(&self, index: usize) -> Result<Arc<SharedVector>> {
        let snapshot = self.vectors.load();
        snapshot
            .get(index)
            .cloned()
            .ok_or(MemoryError::IndexOutOfBounds {
                index,
                len: snapshot.len(),
            })
    }

    /// Returns the number of vectors in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.load().len()
    }

    /// Returns true if the matrix holds no vectors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.load().is_empty()
    }

    /// Returns the orientation of vector 0, or row-major for an empty matrix.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.vectors
            .load()
            .first()
            .map_or(Orientation::RowMajor, |v| v.orientation())
    }

    /// Returns `(rows, cols)` in row-major terms.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        let snapshot = self.snapshot();
        let Some(first) = snapshot.first() else {
            return (0, 0);
        };
        match first.orientation() {
            Orientation::RowMajor => (snapshot.len(), first.len()),
            Orientation::ColumnMajor => (first.len(), snapshot.len()),
        }
    }

    /// Returns the current vector array.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.vectors.load_full()
    }
}

impl Default for SharedMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SharedMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedMatrix")
            .field("id", &self.id)
            .field("orientation", &self.orientation())
            .field("rows", &self.read_row_major())
            .finish()
    }
}

/// Checks that every row has the length of row 0 and returns that length.
fn check_rectangular(rows: &[Vec<f64>]) -> Result<usize> {
    let Some(first) = rows.first() else {
        return Ok(0);
    };
    let expected = first.len();
    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(MemoryError::NotRectangular {
            row,
            expected,
            found: rows[row].len(),
        }),
        None => Ok(expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<f64>> {
        vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]
    }

    #[test]
    fn test_empty_matrix() {
        let m = SharedMatrix::new();
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
        assert_eq!(m.orientation(), Orientation::RowMajor);
        assert_eq!(m.shape(), (0, 0));
        assert!(m.read_row_major().is_empty());
        assert_eq!(
            m.get(0).unwrap_err(),
            MemoryError::IndexOutOfBounds { index: 0, len: 0 }
        );
    }

    #[test]
    fn test_row_major_round_trip() {
        let m = SharedMatrix::from_rows(&sample()).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.orientation(), Orientation::RowMajor);
        assert_eq!(m.read_row_major(), sample());
    }

    #[test]
    fn test_column_major_round_trip() {
        let m = SharedMatrix::new();
        m.load_column_major(&sample()).unwrap();
        assert_eq!(m.len(), 3);
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m.orientation(), Orientation::ColumnMajor);
        assert_eq!(m.get(1).unwrap().to_vec(), vec![2.0, 5.0]);
        assert_eq!(m.read_row_major(), sample());
    }

    #[test]
    fn test_ragged_input_rejected_without_mutation() {
        let m = SharedMatrix::from_rows(&sample()).unwrap();
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            m.load_row_major(&ragged),
            Err(MemoryError::NotRectangular {
                row: 1,
                expected: 2,
                found: 1,
            })
        );
        assert!(m.load_column_major(&ragged).is_err());
        assert_eq!(m.read_row_major(), sample());
    }

    #[test]
    fn test_transposed_rows_read_as_columns() {
        let m = SharedMatrix::from_rows(&[vec![-1.0, -2.0]]).unwrap();
        m.get(0).unwrap().transpose();
        assert_eq!(m.read_row_major(), vec![vec![-1.0], vec![-2.0]]);
        assert_eq!(m.shape(), (2, 1));
    }

    #[test]
    fn test_reload_keeps_old_snapshot_alive() {
        let m = SharedMatrix::from_rows(&sample()).unwrap();
        let old_row = m.get(0).unwrap();
        m.load_row_major(&[vec![9.0]]).unwrap();
        assert_eq!(old_row.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(m.read_row_major(), vec![vec![9.0]]);
        assert_ne!(m.get(0).unwrap().id(), old_row.id());
    }

    #[test]
    fn test_rows_of_zero_width() {
        let m = SharedMatrix::from_rows(&[vec![], vec![]]).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.read_row_major(), vec![Vec::<f64>::new(), Vec::new()]);

        let c = SharedMatrix::new();
        c.load_column_major(&[vec![], vec![]]).unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn test_uneven_columns_read_shortest() {
        let m = SharedMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let wide = SharedMatrix::from_rows(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]).unwrap();
        m.get(1).unwrap().row_times_matrix(&wide).unwrap();
        m.get(0).unwrap().transpose();
        assert_eq!(m.get(1).unwrap().len(), 3);
        assert_eq!(m.read_row_major(), vec![vec![1.0, 3.0], vec![2.0, 4.0]]);
    }
}

//! Oriented vectors guarded by a reader/writer lock.
//!
//! A [`SharedVector`] is the unit of parallel work: row tasks mutate one
//! vector each, and read the vectors of other matrices while doing so.

use std::fmt;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::{MemoryError, Result};
use crate::lock_order::{self, LockOrder};
use crate::matrix::SharedMatrix;
use crate::orientation::Orientation;

/// Locked contents of a vector.
#[derive(Clone, Debug)]
pub(crate) struct VectorState {
    pub(crate) values: Vec<f64>,
    pub(crate) orientation: Orientation,
}

/// One row or column of floating-point values behind a reader/writer lock.
pub struct SharedVector {
    id: u64,
    state: RwLock<VectorState>,
}

impl SharedVector {
    /// Creates a new vector with the given values and orientation.
    #[must_use]
    pub fn new(values: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            id: lock_order::next_id(),
            state: RwLock::new(VectorState {
                values,
                orientation,
            }),
        }
    }

    /// Creates a row vector.
    #[must_use]
    pub fn row(values: Vec<f64>) -> Self {
        Self::new(values, Orientation::RowMajor)
    }

    /// Creates a column vector.
    #[must_use]
    pub fn column(values: Vec<f64>) -> Self {
        Self::new(values, Orientation::ColumnMajor)
    }

    /// Returns the identity used for lock ordering.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the value at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::IndexOutOfBounds`] if `index >= len`.
    pub fn get(&self, index: usize) -> Result<f64> {
        let state = self.state.read();
        state
            .values
            .get(index)
            .copied()
            .ok_or(MemoryError::IndexOutOfBounds {
                index,
                len: state.values.len(),
            })
    }

    /// Returns the number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().values.len()
    }

    /// Returns true if the vector holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }

    /// Returns the current orientation.
    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.state.read().orientation
    }

    /// Returns a copy of the values.
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.state.read().values.clone()
    }

    /// Flips the orientation. The values are not moved.
    pub fn transpose(&self) {
        let mut state = self.state.write();
        state.orientation = state.orientation.flipped();
    }

    /// Negates every element in place.
    pub fn negate(&self) {
        let mut state = self.state.write();
        for value in &mut state.values {
            *value = -*value;
        }
    }

    /// Adds `other` into `self` element by element.
    ///
    /// `v.add(&v)` doubles every element exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::OrientationMismatch`] or
    /// [`MemoryError::LengthMismatch`] if the vectors are incompatible. Nothing
    /// is written in that case.
    pub fn add(&self, other: &SharedVector) -> Result<()> {
        match lock_order::order(self.id, other.id) {
            LockOrder::Tie => {
                let _tie = lock_order::tie_guard();
                let mut this = self.state.write();
                for value in &mut this.values {
                    *value += *value;
                }
                Ok(())
            }
            LockOrder::SelfFirst => {
                let mut this = self.state.write();
                let that = other.state.read();
                add_into(&mut this, &that)
            }
            LockOrder::OtherFirst => {
                let that = other.state.read();
                let mut this = self.state.write();
                add_into(&mut this, &that)
            }
        }
    }

    /// Returns the inner product of `self` and `other`.
    ///
    /// Takes the same locks as [`SharedVector::add`], including the write
    /// lock on `self`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::OrientationMismatch`] or
    /// [`MemoryError::LengthMismatch`] if the vectors are incompatible.
    pub fn dot(&self, other: &SharedVector) -> Result<f64> {
        match lock_order::order(self.id, other.id) {
            LockOrder::Tie => {
                let _tie = lock_order::tie_guard();
                let this = self.state.write();
                Ok(this.values.iter().map(|v| v * v).sum())
            }
            LockOrder::SelfFirst => {
                let this = self.state.write();
                let that = other.state.read();
                dot_of(&this, &that)
            }
            LockOrder::OtherFirst => {
                let that = other.state.read();
                let this = self.state.write();
                dot_of(&this, &that)
            }
        }
    }

    /// Replaces `self` with the row-vector product `self × matrix`.
    ///
    /// The matrix may be stored in either orientation. The result is always
    /// row-major. The write lock on `self` and read locks on every vector of
    /// the matrix are held together, in ascending identity order.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::EmptyMatrix`] if the matrix has no vectors and
    /// [`MemoryError::DimensionMismatch`] if `self.len()` differs from the
    /// matrix's row count.
    pub fn row_times_matrix(&self, matrix: &SharedMatrix) -> Result<()> {
        let snapshot = matrix.snapshot();
        if snapshot.is_empty() {
            return Err(MemoryError::EmptyMatrix);
        }

        let mut others: Vec<usize> = (0..snapshot.len())
            .filter(|&i| snapshot[i].id != self.id)
            .collect();
        others.sort_unstable_by_key(|&i| snapshot[i].id);
        let split = others.partition_point(|&i| snapshot[i].id < self.id);

        let mut reads = ReadSet::with_capacity(others.len());
        for &i in &others[..split] {
            reads.push(i, snapshot[i].state.read());
        }
        let mut this = self.state.write();
        for &i in &others[split..] {
            reads.push(i, snapshot[i].state.read());
        }

        let product = {
            let mut parts = reads.by_index();
            // A vector that is part of the matrix is read through its own write guard.
            for (i, v) in snapshot.iter().enumerate() {
                if v.id == self.id {
                    parts.insert(i, &*this);
                }
            }
            multiply(&this.values, &parts)?
        };

        this.values = product;
        this.orientation = Orientation::RowMajor;
        Ok(())
    }

    /// Read-locks every vector in `vectors` in ascending identity order.
    pub(crate) fn read_all(vectors: &[Arc<SharedVector>]) -> ReadSet<'_> {
        let mut order: Vec<usize> = (0..vectors.len()).collect();
        order.sort_unstable_by_key(|&i| vectors[i].id);
        let mut reads = ReadSet::with_capacity(vectors.len());
        for i in order {
            reads.push(i, vectors[i].state.read());
        }
        reads
    }
}

impl fmt::Debug for SharedVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("SharedVector")
            .field("id", &self.id)
            .field("orientation", &state.orientation)
            .field("values", &state.values)
            .finish()
    }
}

/// Read guards held as one unit, released in reverse acquisition order.
pub(crate) struct ReadSet<'a> {
    guards: Vec<(usize, RwLockReadGuard<'a, VectorState>)>,
}

impl<'a> ReadSet<'a> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            guards: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, index: usize, guard: RwLockReadGuard<'a, VectorState>) {
        self.guards.push((index, guard));
    }

    /// Returns the locked states sorted by their index in the source slice.
    pub(crate) fn by_index(&self) -> Vec<&VectorState> {
        let mut states: Vec<(usize, &VectorState)> =
            self.guards.iter().map(|(i, g)| (*i, &**g)).collect();
        states.sort_unstable_by_key(|(i, _)| *i);
        states.into_iter().map(|(_, s)| s).collect()
    }
}

impl Drop for ReadSet<'_> {
    // `Vec` drops front to back; locks must be released last-taken first.
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

fn check_compatible(left: Orientation, left_len: usize, right: &VectorState) -> Result<()> {
    if left != right.orientation {
        return Err(MemoryError::OrientationMismatch {
            left,
            right: right.orientation,
        });
    }
    if left_len != right.values.len() {
        return Err(MemoryError::LengthMismatch {
            left: left_len,
            right: right.values.len(),
        });
    }
    Ok(())
}

fn add_into(this: &mut VectorState, other: &VectorState) -> Result<()> {
    check_compatible(this.orientation, this.values.len(), other)?;
    for (a, b) in this.values.iter_mut().zip(&other.values) {
        *a += b;
    }
    Ok(())
}

fn dot_of(this: &VectorState, other: &VectorState) -> Result<f64> {
    check_compatible(this.orientation, this.values.len(), other)?;
    Ok(this
        .values
        .iter()
        .zip(&other.values)
        .map(|(a, b)| a * b)
        .sum())
}

/// Computes `lhs × M` where `parts` are the vectors of `M` in index order.
fn multiply(lhs: &[f64], parts: &[&VectorState]) -> Result<Vec<f64>> {
    let Some(first) = parts.first() else {
        return Err(MemoryError::EmptyMatrix);
    };

    match first.orientation {
        Orientation::RowMajor => {
            if lhs.len() != parts.len() {
                return Err(MemoryError::DimensionMismatch {
                    expected: parts.len(),
                    found: lhs.len(),
                });
            }
            let mut out = vec![0.0; first.values.len()];
            for (scale, row) in lhs.iter().zip(parts) {
                for (acc, value) in out.iter_mut().zip(&row.values) {
                    *acc += scale * value;
                }
            }
            Ok(out)
        }
        Orientation::ColumnMajor => {
            if lhs.len() != first.values.len() {
                return Err(MemoryError::DimensionMismatch {
                    expected: first.values.len(),
                    found: lhs.len(),
                });
            }
            Ok(parts
                .iter()
                .map(|column| {
                    lhs.iter()
                        .zip(&column.values)
                        .map(|(a, b)| a * b)
                        .sum()
                })
                .collect())
        }
    }
}

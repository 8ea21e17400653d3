//! Row/column orientation tags.

use std::fmt;

/// Whether a vector holds one row or one column of its matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    /// The vector is a row.
    #[default]
    RowMajor,
    /// The vector is a column.
    ColumnMajor,
}

impl Orientation {
    /// Returns the other orientation.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Orientation::RowMajor => Orientation::ColumnMajor,
            Orientation::ColumnMajor => Orientation::RowMajor,
        }
    }

    /// Returns true for [`Orientation::RowMajor`].
    #[must_use]
    pub fn is_row_major(self) -> bool {
        matches!(self, Orientation::RowMajor)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::RowMajor => f.write_str("row-major"),
            Orientation::ColumnMajor => f.write_str("column-major"),
        }
    }
}

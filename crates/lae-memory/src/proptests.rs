//! Property-based tests for matrix loading and vector involutions.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{Orientation, SharedMatrix, SharedVector};

    // Integer-valued entries keep comparisons exact.
    fn entry() -> impl Strategy<Value = f64> {
        (-1000i32..1000i32).prop_map(f64::from)
    }

    // Rectangular matrices up to 5x5, including zero rows or zero columns.
    fn rectangular() -> impl Strategy<Value = Vec<Vec<f64>>> {
        (0usize..6, 0usize..6).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(prop::collection::vec(entry(), cols), rows)
        })
    }

    fn transposed(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let cols = rows.first().map_or(0, Vec::len);
        (0..cols)
            .map(|c| rows.iter().map(|row| row[c]).collect())
            .collect()
    }

    proptest! {
        #[test]
        fn row_major_round_trip(rows in rectangular()) {
            let m = SharedMatrix::new();
            m.load_row_major(&rows).unwrap();
            prop_assert_eq!(m.read_row_major(), rows);
        }

        #[test]
        fn column_major_round_trip(rows in rectangular()) {
            let m = SharedMatrix::new();
            m.load_column_major(&rows).unwrap();
            // Zero columns load as zero vectors, so nothing is read back.
            let width = rows.first().map_or(0, Vec::len);
            let expected = if width == 0 { Vec::new() } else { rows };
            prop_assert_eq!(m.read_row_major(), expected);
        }

        #[test]
        fn transposing_every_row_reads_transpose(rows in rectangular()) {
            prop_assume!(rows.first().is_some_and(|row| !row.is_empty()));
            let m = SharedMatrix::from_rows(&rows).unwrap();
            for i in 0..m.len() {
                m.get(i).unwrap().transpose();
            }
            prop_assert_eq!(m.read_row_major(), transposed(&rows));
            for i in 0..m.len() {
                m.get(i).unwrap().transpose();
            }
            prop_assert_eq!(m.read_row_major(), rows);
        }

        #[test]
        fn transpose_twice_is_identity(values in prop::collection::vec(entry(), 0..8)) {
            let v = SharedVector::row(values.clone());
            v.transpose();
            prop_assert_eq!(v.orientation(), Orientation::ColumnMajor);
            v.transpose();
            prop_assert_eq!(v.orientation(), Orientation::RowMajor);
            prop_assert_eq!(v.to_vec(), values);
        }

        #[test]
        fn negate_twice_is_identity(values in prop::collection::vec(entry(), 0..8)) {
            let v = SharedVector::column(values.clone());
            v.negate();
            prop_assert_eq!(v.to_vec(), values.iter().map(|x| -x).collect::<Vec<_>>());
            v.negate();
            prop_assert_eq!(v.to_vec(), values);
            prop_assert_eq!(v.orientation(), Orientation::ColumnMajor);
        }
    }
}

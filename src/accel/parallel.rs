// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Producer-side helpers for feeding accumulators from the Rayon pool.

use arrow::array::{Array, Float64Array, Int64Array};
use log::*;
use rayon::{current_num_threads, prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};

use crate::errors::{Error, Result};
use crate::knn::{MatrixAccumulator, RowAccumulator};
use crate::types::ItemId;

/// Configure the global thread pool used by [`put_parallel`].
pub fn init_pool(n_threads: usize) -> std::result::Result<(), ThreadPoolBuildError> {
    debug!(
        "initializing accumulator thread pool with {} threads",
        n_threads
    );
    ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

pub fn thread_count() -> usize {
    current_num_threads()
}

/// Store a batch of `(row, col, score)` entries from the Rayon pool.
///
/// Fails with the first error any worker reports; entries stored by other
/// workers before the failure are kept.
pub fn put_parallel<A: RowAccumulator>(
    acc: &MatrixAccumulator<A>,
    entries: &[(ItemId, ItemId, f64)],
) -> Result<()> {
    trace!("storing {} entries in parallel", entries.len());
    entries
        .par_iter()
        .try_for_each(|(row, col, score)| acc.put(*row, *col, *score))
}

/// Collect `(row, col, score)` entries from parallel Arrow arrays.
///
/// The arrays must have equal lengths and no nulls.
pub fn entries_from_arrow(
    rows: &Int64Array,
    cols: &Int64Array,
    sims: &Float64Array,
) -> Result<Vec<(ItemId, ItemId, f64)>> {
    if rows.len() != cols.len() || rows.len() != sims.len() {
        return Err(Error::InvalidInput(format!(
            "array length mismatch ({}, {}, {})",
            rows.len(),
            cols.len(),
            sims.len()
        )));
    }
    for (name, nulls) in [
        ("rows", rows.null_count()),
        ("cols", cols.null_count()),
        ("sims", sims.null_count()),
    ] {
        if nulls > 0 {
            return Err(Error::InvalidInput(format!(
                "{} array has {} nulls",
                name, nulls
            )));
        }
    }

    Ok(rows
        .values()
        .iter()
        .zip(cols.values().iter())
        .zip(sims.values().iter())
        .map(|((r, c), s)| (*r, *c, *s))
        .collect())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::config::RetentionStrategy;
    use crate::knn::SimilarityMatrix;
    use crate::types::{ItemUniverse, Neighbor};

    const N_ROWS: i64 = 16;
    const N_COLS: i64 = 500;

    /// Deterministic scores with plenty of ties.
    fn entries() -> Vec<(ItemId, ItemId, f64)> {
        let mut out = Vec::new();
        for row in 0..N_ROWS {
            for col in 0..N_COLS {
                let score = ((row * 31 + col * 17) % 97) as f64 / 50.0 - 0.5;
                out.push((row, col, score));
            }
        }
        out
    }

    fn accumulator() -> MatrixAccumulator {
        let mut acc = MatrixAccumulator::new(0.1, RetentionStrategy::Signed);
        acc.init(10, ItemUniverse::new(0..N_ROWS)).unwrap();
        acc
    }

    fn sequential(entries: &[(ItemId, ItemId, f64)]) -> SimilarityMatrix {
        let mut acc = accumulator();
        for (r, c, s) in entries {
            acc.put(*r, *c, *s).unwrap();
        }
        acc.build().unwrap()
    }

    fn row_scores(mat: &SimilarityMatrix, row: ItemId) -> Vec<f64> {
        mat.row(row).unwrap().iter().map(|n| n.score).collect()
    }

    #[test]
    fn test_disjoint_rows_match_sequential() {
        let entries = entries();
        let expected = sequential(&entries);

        let mut acc = accumulator();
        thread::scope(|s| {
            for row in 0..N_ROWS {
                let acc = &acc;
                let mine: Vec<_> = entries.iter().filter(|e| e.0 == row).copied().collect();
                s.spawn(move || {
                    for (r, c, sc) in mine.iter().rev() {
                        acc.put(*r, *c, *sc).unwrap();
                    }
                });
            }
        });
        let mat = acc.build().unwrap();

        // each row was fed by a single thread, in reverse order
        for row in 0..N_ROWS {
            assert_eq!(row_scores(&mat, row), row_scores(&expected, row));
        }
    }

    #[test]
    fn test_shared_rows_match_sequential() {
        let entries = entries();
        let expected = sequential(&entries);

        let mut acc = accumulator();
        thread::scope(|s| {
            for chunk in entries.chunks(700) {
                let acc = &acc;
                s.spawn(move || {
                    for (r, c, sc) in chunk {
                        acc.put(*r, *c, *sc).unwrap();
                    }
                });
            }
        });
        let mat = acc.build().unwrap();

        assert_eq!(mat.nnz(), expected.nnz());
        for row in 0..N_ROWS {
            assert_eq!(row_scores(&mat, row), row_scores(&expected, row));
        }
    }

    #[test]
    fn test_put_parallel() {
        let entries = entries();
        let expected = sequential(&entries);

        let mut acc = accumulator();
        put_parallel(&acc, &entries).unwrap();
        let mat = acc.build().unwrap();

        for row in 0..N_ROWS {
            let got = mat.row(row).unwrap();
            assert!(got.len() <= 10);
            assert_eq!(row_scores(&mat, row), row_scores(&expected, row));
        }
    }

    #[test]
    fn test_put_parallel_unique_scores() {
        // with distinct scores the retained entries are fully determined
        let entries: Vec<_> = (0..2000)
            .map(|i| (i % 4, i, ((i * 7919) % 2003) as f64 / 2003.0))
            .collect();
        let expected = {
            let mut acc = MatrixAccumulator::new(0.0, RetentionStrategy::Signed);
            acc.init(5, ItemUniverse::new(0..4)).unwrap();
            for (r, c, s) in &entries {
                acc.put(*r, *c, *s).unwrap();
            }
            acc.build().unwrap()
        };

        let mut acc = MatrixAccumulator::new(0.0, RetentionStrategy::Signed);
        acc.init(5, ItemUniverse::new(0..4)).unwrap();
        put_parallel(&acc, &entries).unwrap();
        let mat = acc.build().unwrap();

        for row in 0..4 {
            let got: Vec<Neighbor> = mat.row(row).unwrap().to_vec();
            assert_eq!(got, expected.row(row).unwrap().to_vec());
        }
    }

    #[test]
    fn test_put_parallel_unknown_row() {
        let acc = accumulator();
        let res = put_parallel(&acc, &[(0, 1, 0.5), (N_ROWS + 3, 1, 0.5)]);
        assert!(matches!(res, Err(Error::UnknownRow(_))));
    }

    #[test]
    fn test_thread_count() {
        assert!(thread_count() >= 1);
    }

    #[test]
    fn test_entries_from_arrow() {
        let rows = Int64Array::from(vec![1, 2]);
        let cols = Int64Array::from(vec![3, 4]);
        let sims = Float64Array::from(vec![0.5, -0.25]);
        let entries = entries_from_arrow(&rows, &cols, &sims).unwrap();
        assert_eq!(entries, vec![(1, 3, 0.5), (2, 4, -0.25)]);
    }

    #[test]
    fn test_entries_from_arrow_null_row() {
        let rows = Int64Array::from(vec![Some(1), None]);
        let cols = Int64Array::from(vec![3, 4]);
        let sims = Float64Array::from(vec![0.5, 0.7]);
        let res = entries_from_arrow(&rows, &cols, &sims);
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_entries_from_arrow_null_score() {
        let rows = Int64Array::from(vec![1, 2]);
        let cols = Int64Array::from(vec![3, 4]);
        let sims = Float64Array::from(vec![Some(0.5), None]);
        let res = entries_from_arrow(&rows, &cols, &sims);
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_entries_from_arrow_length_mismatch() {
        let rows = Int64Array::from(vec![1, 2]);
        let cols = Int64Array::from(vec![3]);
        let sims = Float64Array::from(vec![0.5, 0.7]);
        let res = entries_from_arrow(&rows, &cols, &sims);
        assert!(matches!(res, Err(Error::InvalidInput(_))));
    }
}

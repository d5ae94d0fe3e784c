// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Accumulator for item similarities that go into the item-item model.
use std::mem;

use log::*;

use crate::atomic::AtomicCell;
use crate::config::{AccumulatorConfig, RetentionStrategy};
use crate::errors::{Error, Result};
use crate::knn::accum::{RowAccumulator, TopKSelector};
use crate::knn::matrix::SimilarityMatrix;
use crate::types::{ItemId, ItemUniverse, Neighbor};

/// Lifecycle state of the accumulator.
enum State<A: RowAccumulator> {
    Uninitialized,
    Accumulating {
        universe: ItemUniverse,
        rows: Vec<AtomicCell<A>>,
    },
    Finalized,
}

/// Accumulates similarities into bounded rows and builds the final matrix.
///
/// `put` takes `&self` and may be called from many threads at once; each row
/// has its own lock, so writers to different rows never contend.  `init` and
/// `build` take `&mut self`, so no `put` can be in flight while they run.
pub struct MatrixAccumulator<A: RowAccumulator = TopKSelector> {
    config: AccumulatorConfig,
    state: State<A>,
}

impl MatrixAccumulator<TopKSelector> {
    /// Create an accumulator keeping the top entries of each row.
    pub fn new(threshold: f64, retention: RetentionStrategy) -> Self {
        Self::with_config(AccumulatorConfig::new(threshold, retention))
    }
}

impl<A: RowAccumulator> MatrixAccumulator<A> {
    /// Create an accumulator with an arbitrary row accumulator.
    pub fn with_config(config: AccumulatorConfig) -> Self {
        MatrixAccumulator {
            config,
            state: State::Uninitialized,
        }
    }

    pub fn config(&self) -> &AccumulatorConfig {
        &self.config
    }

    /// Set up a row for each item in the universe.
    ///
    /// Must be called exactly once, before any entries are stored.
    pub fn init(&mut self, model_size: usize, universe: ItemUniverse) -> Result<()> {
        match self.state {
            State::Uninitialized => (),
            _ => {
                trace!("rejecting repeated initialization");
                return Err(Error::AlreadyInitialized);
            }
        }
        debug!(
            "using model size of {} for {} items",
            model_size,
            universe.len()
        );

        let rows = AtomicCell::new_vec((0..universe.len()).map(|_| A::create(model_size)));
        self.state = State::Accumulating { universe, rows };
        Ok(())
    }

    /// Store an entry in the similarity matrix.
    ///
    /// `score` is the similarity of `col` to `row`.  It is transformed by the
    /// retention strategy, and dropped (successfully) if it does not exceed
    /// the threshold.  The column is stored as-is, even if it is not in the
    /// universe.
    pub fn put(&self, row: ItemId, col: ItemId, score: f64) -> Result<()> {
        let (universe, rows) = match &self.state {
            State::Accumulating { universe, rows } => (universe, rows),
            State::Uninitialized => return Err(Error::NotInitialized),
            State::Finalized => return Err(Error::AlreadyFinalized),
        };

        let Some(score) = self.config.admit(score) else {
            return Ok(());
        };

        let pos = universe.position(row).ok_or(Error::UnknownRow(row))?;
        rows[pos]
            .update(|acc| acc.offer(col, score))
            .map_err(|_| Error::PoisonedRow(row))
    }

    /// Find the first row whose accumulator panicked during an update.
    fn poisoned_row(&self) -> Option<ItemId> {
        match &self.state {
            State::Accumulating { universe, rows } => rows
                .iter()
                .position(AtomicCell::is_poisoned)
                .map(|pos| universe.ids()[pos]),
            _ => None,
        }
    }

    /// Check whether the accumulator is still accepting entries.
    pub fn is_accumulating(&self) -> bool {
        matches!(self.state, State::Accumulating { .. })
    }

    /// Finish every row and move the results into a similarity matrix.
    ///
    /// The row accumulators are consumed; afterwards every `put` or `build`
    /// fails with [`Error::AlreadyFinalized`].  If a row accumulator panicked
    /// earlier, this fails with [`Error::PoisonedRow`] and leaves the
    /// accumulator unchanged.
    pub fn build(&mut self) -> Result<SimilarityMatrix> {
        if let Some(row) = self.poisoned_row() {
            warn!("cannot build matrix, row {} is poisoned", row);
            return Err(Error::PoisonedRow(row));
        }
        let (universe, rows) = match mem::replace(&mut self.state, State::Finalized) {
            State::Accumulating { universe, rows } => (universe, rows),
            State::Uninitialized => {
                self.state = State::Uninitialized;
                return Err(Error::NotInitialized);
            }
            State::Finalized => return Err(Error::AlreadyFinalized),
        };

        let rows: Vec<Box<[Neighbor]>> = rows
            .into_iter()
            .zip(universe.ids())
            .map(|(cell, id)| {
                cell.into_inner()
                    .map(|acc| acc.finish().into_boxed_slice())
                    .map_err(|_| Error::PoisonedRow(*id))
            })
            .collect::<Result<_>>()?;
        let nnz: usize = rows.iter().map(|r| r.len()).sum();
        debug!(
            "built similarity matrix with {} entries in {} rows",
            nnz,
            rows.len()
        );

        Ok(SimilarityMatrix::new(universe, rows))
    }
}

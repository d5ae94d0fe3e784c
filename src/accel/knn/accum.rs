// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Per-row accumulators for similarity entries.
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem;

use ordered_float::NotNan;

use crate::types::{ItemId, Neighbor};

/// Trait for accumulating the entries of a single matrix row.
pub trait RowAccumulator: Send + Sized {
    /// Create an accumulator for a model of the specified size.
    fn create(model_size: usize) -> Self;

    /// Offer an entry to the row.  NaN scores are ignored.
    fn offer(&mut self, item: ItemId, score: f64);

    /// Get the number of entries currently retained.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finish the row into its entries, sorted by decreasing score.
    fn finish(self) -> Vec<Neighbor>;
}

/// Entries in the accumulator heaps.
///
/// Entries order from strongest to weakest: higher scores first, and for
/// equal scores the earlier-offered entry first.  The max-heap top is
/// therefore the weakest entry, the next one to evict.
#[derive(Debug, Clone, Copy)]
struct AccEntry {
    score: NotNan<f64>,
    seq: u64,
    item: ItemId,
}

impl AccEntry {
    fn neighbor(&self) -> Neighbor {
        Neighbor::new(self.item, self.score.into_inner())
    }
}

impl PartialEq for AccEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AccEntry {}

impl PartialOrd for AccEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reverse the score ordering to make a min-heap
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Working storage: a plain vector until the limit is reached, then a heap.
#[derive(Debug, Clone)]
enum Selection {
    Partial(Vec<AccEntry>),
    Full(BinaryHeap<AccEntry>),
}

/// Bounded selector keeping the `k` highest-scoring entries of a row.
///
/// Once full, an offer is kept only if its score is strictly greater than
/// the current minimum, which it then evicts.  Equal scores favor the
/// entry offered first: an offer tying the minimum is dropped, and when
/// several retained entries share the minimum the latest of them goes.
#[derive(Debug, Clone)]
pub struct TopKSelector {
    limit: usize,
    next_seq: u64,
    selection: Selection,
}

impl TopKSelector {
    pub fn new(limit: usize) -> TopKSelector {
        TopKSelector {
            limit,
            next_seq: 0,
            selection: Selection::Partial(Vec::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Get the lowest retained score, if the selector is full.
    ///
    /// Offers must beat this score to be kept.
    pub fn min_score(&self) -> Option<f64> {
        match &self.selection {
            Selection::Full(heap) => heap.peek().map(|e| e.score.into_inner()),
            Selection::Partial(_) => None,
        }
    }
}

impl RowAccumulator for TopKSelector {
    fn create(model_size: usize) -> Self {
        TopKSelector::new(model_size)
    }

    fn offer(&mut self, item: ItemId, score: f64) {
        if self.limit == 0 {
            return;
        }
        let Ok(score) = NotNan::new(score) else {
            return;
        };
        let entry = AccEntry {
            score,
            seq: self.next_seq,
            item,
        };
        self.next_seq += 1;

        match &mut self.selection {
            Selection::Partial(vec) => {
                vec.push(entry);
                if vec.len() >= self.limit {
                    let heap = BinaryHeap::from(mem::take(vec));
                    self.selection = Selection::Full(heap);
                }
            }
            Selection::Full(heap) => {
                if let Some(mut top) = heap.peek_mut() {
                    if entry.score > top.score {
                        *top = entry;
                    }
                }
            }
        }
    }

    fn len(&self) -> usize {
        match &self.selection {
            Selection::Partial(vec) => vec.len(),
            Selection::Full(heap) => heap.len(),
        }
    }

    fn finish(self) -> Vec<Neighbor> {
        let sorted = match self.selection {
            Selection::Partial(mut vec) => {
                vec.sort_unstable();
                vec
            }
            Selection::Full(heap) => heap.into_sorted_vec(),
        };
        sorted.iter().map(AccEntry::neighbor).collect()
    }
}

/// Row accumulator that keeps every entry, ignoring the model size.
#[derive(Debug, Clone, Default)]
pub struct UnlimitedAccumulator {
    entries: Vec<AccEntry>,
}

impl RowAccumulator for UnlimitedAccumulator {
    fn create(_model_size: usize) -> Self {
        UnlimitedAccumulator::default()
    }

    fn offer(&mut self, item: ItemId, score: f64) {
        if let Ok(score) = NotNan::new(score) {
            let seq = self.entries.len() as u64;
            self.entries.push(AccEntry { score, seq, item });
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn finish(mut self) -> Vec<Neighbor> {
        self.entries.sort_unstable();
        self.entries.iter().map(AccEntry::neighbor).collect()
    }
}

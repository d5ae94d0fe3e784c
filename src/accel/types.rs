// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Item identifiers, neighbor entries, and the item universe.
use rustc_hash::FxHashMap;

/// Opaque identifier of a recommendable item.
pub type ItemId = i64;

/// A retained similarity entry in a matrix row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub item: ItemId,
    pub score: f64,
}

impl Neighbor {
    pub fn new(item: ItemId, score: f64) -> Neighbor {
        Neighbor { item, score }
    }
}

impl From<(ItemId, f64)> for Neighbor {
    fn from((item, score): (ItemId, f64)) -> Self {
        Neighbor { item, score }
    }
}

/// Sorted, duplicate-free set of item IDs, defining the rows of a matrix.
///
/// Positions are dense (`0..len`) and follow ID order.
#[derive(Debug, Clone, Default)]
pub struct ItemUniverse {
    ids: Vec<ItemId>,
    index: FxHashMap<ItemId, usize>,
}

impl ItemUniverse {
    /// Build a universe from item IDs, sorting them and dropping repeats.
    pub fn new<I: IntoIterator<Item = ItemId>>(ids: I) -> ItemUniverse {
        let mut ids: Vec<ItemId> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.shrink_to_fit();

        let mut index = FxHashMap::default();
        index.reserve(ids.len());
        for (pos, id) in ids.iter().enumerate() {
            index.insert(*id, pos);
        }

        ItemUniverse { ids, index }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Get the item IDs in universe order.
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Look up the row position of an item.
    pub fn position(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }
}

impl FromIterator<ItemId> for ItemUniverse {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        ItemUniverse::new(iter)
    }
}

#[test]
fn test_universe_sorted_unique() {
    let u = ItemUniverse::new(vec![5, 3, 9, 3, 5]);
    assert_eq!(u.ids(), &[3, 5, 9]);
    assert_eq!(u.len(), 3);
}

#[test]
fn test_universe_positions() {
    let u: ItemUniverse = vec![42, -7, 10].into_iter().collect();
    assert_eq!(u.position(-7), Some(0));
    assert_eq!(u.position(10), Some(1));
    assert_eq!(u.position(42), Some(2));
    assert_eq!(u.position(11), None);
    assert!(u.contains(42));
    assert!(!u.contains(0));
}

#[test]
fn test_universe_positions_cover_ids() {
    let u = ItemUniverse::new((0..100_000).map(|i| i * 3 - 7));
    for (pos, id) in u.ids().iter().enumerate() {
        assert_eq!(u.position(*id), Some(pos));
    }
}

#[test]
fn test_universe_empty() {
    let u = ItemUniverse::new(Vec::new());
    assert!(u.is_empty());
    assert_eq!(u.position(0), None);
}

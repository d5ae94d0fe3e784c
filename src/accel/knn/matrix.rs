// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! The finished item-item similarity matrix.
use std::sync::Arc;

use arrow::{
    array::{Float64Builder, Int64Array, Int64Builder, LargeListArray, RecordBatch, StructArray},
    buffer::OffsetBuffer,
};
use arrow_schema::{DataType, Field, Fields, Schema};

use crate::errors::{Error, Result};
use crate::types::{ItemId, ItemUniverse, Neighbor};

/// Immutable sparse similarity matrix with a bounded row per item.
///
/// Only produced by [`MatrixAccumulator::build`](super::MatrixAccumulator::build).
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    universe: ItemUniverse,
    rows: Vec<Box<[Neighbor]>>,
}

impl SimilarityMatrix {
    pub(super) fn new(universe: ItemUniverse, rows: Vec<Box<[Neighbor]>>) -> SimilarityMatrix {
        assert_eq!(universe.len(), rows.len(), "row count mismatch");
        SimilarityMatrix { universe, rows }
    }

    /// Get the neighbors of an item, sorted by decreasing score.
    pub fn row(&self, item: ItemId) -> Result<&[Neighbor]> {
        self.universe
            .position(item)
            .map(|pos| &*self.rows[pos])
            .ok_or(Error::UnknownRow(item))
    }

    /// Get the item universe of this matrix.
    pub fn items(&self) -> &ItemUniverse {
        &self.universe
    }

    pub fn contains(&self, item: ItemId) -> bool {
        self.universe.contains(item)
    }

    /// Number of rows (items in the universe).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of retained entries.
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    /// Iterate over rows in universe order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &[Neighbor])> + '_ {
        self.universe
            .ids()
            .iter()
            .zip(self.rows.iter())
            .map(|(id, row)| (*id, &**row))
    }

    /// Convert the matrix into an Arrow record batch.
    ///
    /// The batch has one record per item, with an `item` column and a
    /// `neighbors` list of `{item, score}` structs.
    pub fn to_arrow(&self) -> Result<RecordBatch> {
        let n_entries = self.nnz();
        let mut col_bld = Int64Builder::with_capacity(n_entries);
        let mut val_bld = Float64Builder::with_capacity(n_entries);
        for row in &self.rows {
            for nbr in row.iter() {
                col_bld.append_value(nbr.item);
                val_bld.append_value(nbr.score);
            }
        }

        let struct_fields = Fields::from(vec![
            Field::new("item", DataType::Int64, false),
            Field::new("score", DataType::Float64, false),
        ]);
        let sa = StructArray::try_new(
            struct_fields.clone(),
            vec![Arc::new(col_bld.finish()), Arc::new(val_bld.finish())],
            None,
        )?;
        let list_field = Arc::new(Field::new("rows", DataType::Struct(struct_fields), false));
        let list = LargeListArray::try_new(
            list_field.clone(),
            OffsetBuffer::from_lengths(self.rows.iter().map(|r| r.len())),
            Arc::new(sa),
            None,
        )?;
        let items = Int64Array::from(self.universe.ids().to_vec());

        let schema = Schema::new(vec![
            Field::new("item", DataType::Int64, false),
            Field::new("neighbors", DataType::LargeList(list_field), false),
        ]);
        let batch = RecordBatch::try_new(Arc::new(schema), vec![Arc::new(items), Arc::new(list)])?;
        Ok(batch)
    }
}

// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Sparse item-item similarity matrix accumulation for k-NN models.
//!
//! Similarity producers call [`MatrixAccumulator::put`] concurrently; each row
//! keeps only its `k` strongest neighbors, and [`MatrixAccumulator::build`]
//! turns the accumulated rows into an immutable [`SimilarityMatrix`].

pub mod atomic;
pub mod config;
pub mod errors;
pub mod knn;
pub mod parallel;
#[cfg(feature = "python")]
mod python;
pub mod types;

pub use config::{AccumulatorConfig, RetentionStrategy};
pub use errors::{Error, Result};
pub use knn::{
    MatrixAccumulator, RowAccumulator, SimilarityMatrix, TopKSelector, UnlimitedAccumulator,
};
pub use types::{ItemId, ItemUniverse, Neighbor};

// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Item-item similarity matrix construction for k-NN models.

mod accum;
mod builder;
mod matrix;

pub use accum::{RowAccumulator, TopKSelector, UnlimitedAccumulator};
pub use builder::MatrixAccumulator;
pub use matrix::SimilarityMatrix;

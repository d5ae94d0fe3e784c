// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2026 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Error types for similarity accumulation.
use arrow_schema::ArrowError;
use thiserror::Error;

use crate::types::ItemId;

/// Errors reported by the accumulator and the finished model.
///
/// The lifecycle variants are contract violations by the caller; values
/// that fail the threshold are dropped silently and never show up here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("similarity matrix accumulator already initialized")]
    AlreadyInitialized,
    #[error("similarity matrix accumulator not initialized")]
    NotInitialized,
    #[error("similarity matrix already built")]
    AlreadyFinalized,
    #[error("unknown row item {0}")]
    UnknownRow(ItemId),
    #[error("row {0} poisoned by a panic in its accumulator")]
    PoisonedRow(ItemId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid retention strategy code {0}")]
    InvalidRetention(i32),
    #[error("unknown retention strategy '{0}'")]
    UnknownRetention(String),
    #[error("invalid accumulator configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("error assembling result array: {0}")]
    Arrow(#[from] ArrowError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "python")]
mod py {
    use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};
    use pyo3::PyErr;

    use super::Error;

    impl From<Error> for PyErr {
        fn from(value: Error) -> Self {
            let msg = format!("{}", value);
            match value {
                Error::UnknownRow(_) => PyKeyError::new_err(msg),
                Error::InvalidRetention(_)
                | Error::UnknownRetention(_)
                | Error::Config(_)
                | Error::InvalidInput(_) => PyValueError::new_err(msg),
                _ => PyRuntimeError::new_err(msg),
            }
        }
    }
}

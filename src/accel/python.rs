// This file is part of LensKit.
// Copyright (C) 2018-2023 Boise State University.
// Copyright (C) 2023-2025 Drexel University.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Python bindings for the similarity accumulator.
use arrow::{
    array::{make_array, Array, ArrayData, AsArray, PrimitiveArray, RecordBatch},
    datatypes::{ArrowPrimitiveType, Float64Type, Int64Type},
    pyarrow::PyArrowType,
};
use log::*;
use pyo3::{
    exceptions::{PyRuntimeError, PyTypeError},
    prelude::*,
};

use crate::knn::{MatrixAccumulator, SimilarityMatrix};
use crate::parallel;
use crate::types::ItemUniverse;
use crate::RetentionStrategy;

/// Python handle to a similarity matrix accumulator.
#[pyclass]
pub struct SimilarityMatrixAccumulator {
    inner: MatrixAccumulator,
}

/// Python handle to a finished similarity matrix.
#[pyclass]
pub struct SimilarityMatrixModel {
    matrix: SimilarityMatrix,
}

fn checked_primitive<T: ArrowPrimitiveType>(
    name: &str,
    array: &dyn Array,
) -> PyResult<PrimitiveArray<T>> {
    array
        .as_primitive_opt::<T>()
        .cloned()
        .ok_or_else(|| {
            PyTypeError::new_err(format!(
                "invalid {} type {}, expected {}",
                name,
                array.data_type(),
                T::DATA_TYPE
            ))
        })
}

#[pymethods]
impl SimilarityMatrixAccumulator {
    #[new]
    #[pyo3(signature = (threshold=0.0, retention="signed"))]
    fn new(threshold: f64, retention: &str) -> PyResult<Self> {
        let retention: RetentionStrategy = retention.parse()?;
        Ok(SimilarityMatrixAccumulator {
            inner: MatrixAccumulator::new(threshold, retention),
        })
    }

    /// Initialize with the model size and the item universe.
    fn init(&mut self, model_size: usize, items: Vec<i64>) -> PyResult<()> {
        Ok(self.inner.init(model_size, ItemUniverse::new(items))?)
    }

    fn put(&self, i: i64, j: i64, sim: f64) -> PyResult<()> {
        Ok(self.inner.put(i, j, sim)?)
    }

    /// Store parallel arrays of rows, columns, and similarities.
    fn put_arrays(
        &self,
        py: Python<'_>,
        rows: PyArrowType<ArrayData>,
        cols: PyArrowType<ArrayData>,
        sims: PyArrowType<ArrayData>,
    ) -> PyResult<()> {
        let rows = make_array(rows.0);
        let cols = make_array(cols.0);
        let sims = make_array(sims.0);
        let rows = checked_primitive::<Int64Type>("rows", &rows)?;
        let cols = checked_primitive::<Int64Type>("cols", &cols)?;
        let sims = checked_primitive::<Float64Type>("sims", &sims)?;

        let entries = parallel::entries_from_arrow(&rows, &cols, &sims)?;
        debug!("storing {} similarities from arrays", entries.len());

        let inner = &self.inner;
        py.allow_threads(|| parallel::put_parallel(inner, &entries))?;
        Ok(())
    }

    /// Build the finished similarity matrix.
    fn build(&mut self) -> PyResult<SimilarityMatrixModel> {
        let matrix = self.inner.build()?;
        Ok(SimilarityMatrixModel { matrix })
    }
}

#[pymethods]
impl SimilarityMatrixModel {
    /// Get the neighbors of an item as `(item, score)` pairs.
    fn row(&self, item: i64) -> PyResult<Vec<(i64, f64)>> {
        let row = self.matrix.row(item)?;
        Ok(row.iter().map(|n| (n.item, n.score)).collect())
    }

    fn items(&self) -> Vec<i64> {
        self.matrix.items().ids().to_vec()
    }

    #[getter]
    fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    fn to_arrow(&self) -> PyResult<PyArrowType<RecordBatch>> {
        Ok(self.matrix.to_arrow()?.into())
    }

    fn __len__(&self) -> usize {
        self.matrix.len()
    }
}

#[pyfunction]
fn init_accel_pool(n_threads: usize) -> PyResult<()> {
    parallel::init_pool(n_threads)
        .map_err(|_| PyErr::new::<PyRuntimeError, _>("Rayon initialization error"))
}

#[pyfunction]
fn thread_count() -> PyResult<usize> {
    Ok(parallel::thread_count())
}

/// Entry point for the accumulator module.
#[pymodule]
fn knn_accel(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();
    m.add_class::<SimilarityMatrixAccumulator>()?;
    m.add_class::<SimilarityMatrixModel>()?;
    m.add_function(wrap_pyfunction!(init_accel_pool, m)?)?;
    m.add_function(wrap_pyfunction!(thread_count, m)?)?;
    Ok(())
}

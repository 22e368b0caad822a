use lineseg_core::{Error, Grid, LineScores, PixelScores};
use numpy::ndarray::ArrayView2;
use numpy::{Element, PyArray1, PyArray2, PyArrayMethods, PyReadonlyArray2};
use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

/// Missing paths become `FileNotFoundError`, other I/O failures `OSError`,
/// everything else `ValueError`.
pub fn to_py_err(err: Error) -> PyErr {
    match &err {
        Error::ResourceNotFound(_) => PyFileNotFoundError::new_err(err.to_string()),
        Error::Io(_) | Error::Image(_) => PyIOError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Copy a 2-D array view into a row-major grid. Works for non-contiguous views.
pub fn grid_from_view<T: Copy>(view: ArrayView2<'_, T>) -> PyResult<Grid<T>> {
    let (h, w) = view.dim();
    Grid::from_vec(h, w, view.iter().copied().collect()).map_err(to_py_err)
}

pub fn grid_from_py<T: Element + Copy>(arr: &PyReadonlyArray2<'_, T>) -> PyResult<Grid<T>> {
    grid_from_view(arr.as_array())
}

pub fn grid_to_py<'py, T: Element>(py: Python<'py>, grid: Grid<T>) -> PyResult<Bound<'py, PyArray2<T>>> {
    let (h, w) = grid.shape();
    PyArray1::from_vec(py, grid.data).reshape([h, w])
}

pub fn line_scores_to_py<'py>(py: Python<'py>, s: &LineScores) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("true_positives", s.true_positives)?;
    dict.set_item("false_positives", s.false_positives)?;
    dict.set_item("false_negatives", s.false_negatives)?;
    dict.set_item("precision", s.precision)?;
    dict.set_item("recall", s.recall)?;
    dict.set_item("jaccard", s.jaccard)?;
    dict.set_item("f1", s.f1)?;
    Ok(dict)
}

pub fn pixel_scores_to_py<'py>(py: Python<'py>, s: &PixelScores) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("precision", s.precision)?;
    dict.set_item("recall", s.recall)?;
    dict.set_item("f1", s.f1)?;
    Ok(dict)
}

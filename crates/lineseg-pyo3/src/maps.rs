use std::path::Path;

use lineseg_core::{codec, foreground, label_map, raster, stack, RgbaBuffer, SegDict};
use numpy::{
    PyArray1, PyArray2, PyArray3, PyArrayMethods, PyReadonlyArray2, PyReadonlyArray3,
    PyReadwriteArray2, PyUntypedArrayMethods,
};
use pyo3::prelude::*;

use crate::convert::{grid_from_py, grid_from_view, grid_to_py, to_py_err};

/// Label map (uint32, H×W) to its H×W×4 byte form.
#[pyfunction]
pub fn encode<'py>(py: Python<'py>, map: PyReadonlyArray2<'py, u32>) -> PyResult<Bound<'py, PyArray3<u8>>> {
    let map = grid_from_py(&map)?;
    let buf = codec::encode(&map);
    let (h, w, c) = buf.shape();
    PyArray1::from_vec(py, buf.into_bytes()).reshape([h, w, c])
}

/// H×W×4 byte array back to a uint32 label map.
#[pyfunction]
pub fn decode<'py>(py: Python<'py>, buffer: PyReadonlyArray3<'py, u8>) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let shape = buffer.shape();
    let bytes: Vec<u8> = buffer.as_array().iter().copied().collect();
    let buf = RgbaBuffer::from_raw(shape[0], shape[1], shape[2], bytes).map_err(to_py_err)?;
    grid_to_py(py, codec::decode(&buf))
}

/// Stack `label` onto `map` in place wherever `polygon_mask` is set.
#[pyfunction]
pub fn apply_polygon_mask(
    mut map: PyReadwriteArray2<'_, u32>,
    polygon_mask: PyReadonlyArray2<'_, bool>,
    label: u32,
) -> PyResult<()> {
    let mut grid = grid_from_view(map.as_array())?;
    let mask = grid_from_py(&polygon_mask)?;
    label_map::apply_polygon_mask(&mut grid, &mask, label).map_err(to_py_err)?;
    for (dst, src) in map.as_array_mut().iter_mut().zip(grid.data) {
        *dst = src;
    }
    Ok(())
}

#[pyfunction]
pub fn recover_labels(value: u32) -> Vec<u32> {
    stack::recover_labels(value)
}

#[pyfunction]
pub fn depth<'py>(py: Python<'py>, map: PyReadonlyArray2<'py, u32>) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let map = grid_from_py(&map)?;
    grid_to_py(py, label_map::depth(&map))
}

#[pyfunction]
pub fn retrieve_polygon_mask<'py>(
    py: Python<'py>,
    map: PyReadonlyArray2<'py, u32>,
    label: u32,
) -> PyResult<Bound<'py, PyArray2<bool>>> {
    let map = grid_from_py(&map)?;
    grid_to_py(py, label_map::retrieve_polygon_mask(&map, label))
}

/// Rasterise one polygon (`[[x, y], ...]`) onto an `h × w` canvas.
#[pyfunction]
pub fn rasterize<'py>(
    py: Python<'py>,
    vertices: Vec<[f64; 2]>,
    h: usize,
    w: usize,
) -> PyResult<Bound<'py, PyArray2<bool>>> {
    grid_to_py(py, raster::rasterize(&vertices, h, w))
}

/// Label map for the lines of a segmentation-dictionary JSON file.
#[pyfunction]
pub fn from_segdict<'py>(py: Python<'py>, path: &str, h: usize, w: usize) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let segdict = SegDict::from_file(Path::new(path)).map_err(to_py_err)?;
    let map = label_map::from_segdict(h, w, &segdict).map_err(to_py_err)?;
    grid_to_py(py, map)
}

/// Foreground mask of a page image.
#[pyfunction]
pub fn binarize<'py>(py: Python<'py>, path: &str) -> PyResult<Bound<'py, PyArray2<bool>>> {
    let mask = foreground::mask_from_path(Path::new(path)).map_err(to_py_err)?;
    grid_to_py(py, mask)
}

#[pyfunction]
pub fn save_png(map: PyReadonlyArray2<'_, u32>, path: &str) -> PyResult<()> {
    let map = grid_from_py(&map)?;
    codec::encode(&map)
        .save_png(Path::new(path))
        .map_err(to_py_err)
}

#[pyfunction]
pub fn load_png<'py>(py: Python<'py>, path: &str) -> PyResult<Bound<'py, PyArray2<u32>>> {
    let buf = RgbaBuffer::load_png(Path::new(path)).map_err(to_py_err)?;
    grid_to_py(py, codec::decode(&buf))
}

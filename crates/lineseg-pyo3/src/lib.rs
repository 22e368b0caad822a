use std::path::Path;

use numpy::{PyArray1, PyArray3, PyArrayMethods, PyReadonlyArray2, PyReadonlyArray3, PyUntypedArrayMethods};
use pyo3::prelude::*;
use pyo3::types::PyDict;

mod convert;
mod maps;

use convert::{grid_from_py, line_scores_to_py, pixel_scores_to_py, to_py_err};

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[pyclass(name = "Metrics")]
#[derive(Clone)]
struct PyMetrics {
    inner: lineseg_core::MetricsGrid,
}

#[pymethods]
impl PyMetrics {
    /// Rebuild from a stored `P × G × 4` tensor. Labels default to 1..=P and 1..=G.
    #[staticmethod]
    #[pyo3(signature = (values, pred_labels=None, gt_labels=None))]
    fn from_tensor(
        values: PyReadonlyArray3<'_, f64>,
        pred_labels: Option<Vec<u32>>,
        gt_labels: Option<Vec<u32>>,
    ) -> PyResult<Self> {
        let shape = values.shape();
        let pred_labels = pred_labels.unwrap_or_else(|| (1..=shape[0] as u32).collect());
        let gt_labels = gt_labels.unwrap_or_else(|| (1..=shape[1] as u32).collect());
        let flat: Vec<f64> = values.as_array().iter().copied().collect();
        let inner = lineseg_core::MetricsGrid::from_channels(pred_labels, gt_labels, flat)
            .map_err(to_py_err)?;
        Ok(PyMetrics { inner })
    }

    /// `P × G × 4` array: intersection, union, precision, recall.
    #[getter]
    fn values<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray3<f64>>> {
        let (p, g) = self.inner.shape();
        PyArray1::from_vec(py, self.inner.values().to_vec()).reshape([p, g, lineseg_core::metrics::METRIC_CHANNELS])
    }

    #[getter]
    fn pred_labels(&self) -> Vec<u32> {
        self.inner.pred_labels.clone()
    }

    #[getter]
    fn gt_labels(&self) -> Vec<u32> {
        self.inner.gt_labels.clone()
    }

    #[getter]
    fn pred_areas(&self) -> Vec<f64> {
        self.inner.pred_areas.clone()
    }

    #[getter]
    fn gt_areas(&self) -> Vec<f64> {
        self.inner.gt_areas.clone()
    }

    fn iou(&self, i: usize, j: usize) -> PyResult<f64> {
        let (p, g) = self.inner.shape();
        if i >= p || j >= g {
            return Err(pyo3::exceptions::PyIndexError::new_err(format!(
                "pair ({}, {}) outside a {}x{} grid",
                i, j, p, g
            )));
        }
        Ok(self.inner.iou(i, j))
    }

    fn without_background(&self) -> PyMetrics {
        PyMetrics {
            inner: self.inner.without_background(),
        }
    }

    fn __repr__(&self) -> String {
        let (p, g) = self.inner.shape();
        format!("Metrics(pred_labels={}, gt_labels={})", p, g)
    }
}

#[pyfunction]
#[pyo3(signature = (pred, gt, mask=None, label_distance=None))]
fn pixel_metrics(
    pred: PyReadonlyArray2<'_, u32>,
    gt: PyReadonlyArray2<'_, u32>,
    mask: Option<PyReadonlyArray2<'_, bool>>,
    label_distance: Option<u32>,
) -> PyResult<PyMetrics> {
    let pred = grid_from_py(&pred)?;
    let gt = grid_from_py(&gt)?;
    let mask = mask.map(|m| grid_from_py(&m)).transpose()?;
    let inner = lineseg_core::pixel_metrics(&pred, &gt, mask.as_ref(), label_distance)
        .map_err(to_py_err)?;
    Ok(PyMetrics { inner })
}

#[pyfunction]
fn line_based_scores<'py>(py: Python<'py>, metrics: &PyMetrics, iou_thr: f64) -> PyResult<Bound<'py, PyDict>> {
    line_scores_to_py(py, &lineseg_core::line_based_scores(&metrics.inner, iou_thr))
}

#[pyfunction]
fn pixel_based_scores<'py>(py: Python<'py>, metrics: &PyMetrics, iou_thr: f64) -> PyResult<Bound<'py, PyDict>> {
    pixel_scores_to_py(py, &lineseg_core::pixel_based_scores(&metrics.inner, iou_thr))
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

#[pyclass(name = "Params")]
#[derive(Clone)]
struct PyParams {
    inner: lineseg_core::Params,
}

#[pymethods]
impl PyParams {
    #[new]
    #[pyo3(signature = (iou_thrs=None, label_distance=None, use_mask=true))]
    fn new(iou_thrs: Option<Vec<f64>>, label_distance: Option<u32>, use_mask: bool) -> Self {
        let mut inner = lineseg_core::Params::default();
        if let Some(thrs) = iou_thrs {
            inner.iou_thrs = thrs;
        }
        inner.label_distance = label_distance;
        inner.use_mask = use_mask;
        PyParams { inner }
    }

    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        let inner = lineseg_core::Params::from_file(Path::new(path)).map_err(to_py_err)?;
        Ok(PyParams { inner })
    }

    #[getter]
    fn iou_thrs(&self) -> Vec<f64> {
        self.inner.iou_thrs.clone()
    }

    #[setter]
    fn set_iou_thrs(&mut self, val: Vec<f64>) {
        self.inner.iou_thrs = val;
    }

    #[getter]
    fn label_distance(&self) -> Option<u32> {
        self.inner.label_distance
    }

    #[setter]
    fn set_label_distance(&mut self, val: Option<u32>) {
        self.inner.label_distance = val;
    }

    #[getter]
    fn use_mask(&self) -> bool {
        self.inner.use_mask
    }

    #[setter]
    fn set_use_mask(&mut self, val: bool) {
        self.inner.use_mask = val;
    }
}

// ---------------------------------------------------------------------------
// SegEval
// ---------------------------------------------------------------------------

#[pyclass(name = "SegEval")]
struct PySegEval {
    inner: lineseg_core::SegEval,
}

#[pymethods]
impl PySegEval {
    #[new]
    #[pyo3(signature = (pred, gt, params=None, mask=None))]
    fn new(
        pred: PyReadonlyArray2<'_, u32>,
        gt: PyReadonlyArray2<'_, u32>,
        params: Option<&PyParams>,
        mask: Option<PyReadonlyArray2<'_, bool>>,
    ) -> PyResult<Self> {
        let params = params.map(|p| p.inner.clone()).unwrap_or_default();
        let mut inner = lineseg_core::SegEval::new(grid_from_py(&pred)?, grid_from_py(&gt)?, params);
        if let Some(mask) = mask {
            inner = inner.with_mask(grid_from_py(&mask)?);
        }
        Ok(PySegEval { inner })
    }

    fn evaluate(&mut self) -> PyResult<()> {
        self.inner.evaluate().map_err(to_py_err)
    }

    fn summarize(&mut self) {
        self.inner.summarize();
    }

    #[getter]
    fn params(&self) -> PyParams {
        PyParams {
            inner: self.inner.params.clone(),
        }
    }

    #[setter]
    fn set_params(&mut self, params: &PyParams) {
        self.inner.params = params.inner.clone();
    }

    #[getter]
    fn metrics(&self) -> Option<PyMetrics> {
        self.inner
            .metrics
            .clone()
            .map(|inner| PyMetrics { inner })
    }

    #[getter]
    fn stats(&self) -> Vec<f64> {
        self.inner.stats.clone()
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

#[pymodule]
fn lineseg(py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMetrics>()?;
    m.add_class::<PyParams>()?;
    m.add_class::<PySegEval>()?;
    m.add_function(wrap_pyfunction!(pixel_metrics, m)?)?;
    m.add_function(wrap_pyfunction!(line_based_scores, m)?)?;
    m.add_function(wrap_pyfunction!(pixel_based_scores, m)?)?;

    // maps submodule
    let maps_mod = PyModule::new(py, "maps")?;
    maps_mod.add_function(wrap_pyfunction!(maps::encode, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::decode, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::apply_polygon_mask, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::recover_labels, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::depth, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::retrieve_polygon_mask, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::rasterize, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::from_segdict, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::binarize, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::save_png, &maps_mod)?)?;
    maps_mod.add_function(wrap_pyfunction!(maps::load_png, &maps_mod)?)?;
    m.add_submodule(&maps_mod)?;

    Ok(())
}

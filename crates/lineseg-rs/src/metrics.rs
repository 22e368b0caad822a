//! Pairwise pixel metrics between a predicted and a ground-truth label map.
//!
//! Every pixel splits its credit among the labels stacked on it: each label of
//! a `d`-deep stack gets `1/d` of area, and each (pred, gt) pair present on the
//! pixel gets `1/(d_pred * d_gt)` of intersection. Doubly or triply covered
//! pixels are therefore never counted twice, and summing a pred label's
//! intersections over all gt labels (background included) gives back its area.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::codec::{self, RgbaBuffer};
use crate::error::{Error, Result};
use crate::scores::ratio;
use crate::stack::LabelStack;
use crate::types::{BinaryMask, LabelMap};

/// Number of metric channels per label pair.
pub const METRIC_CHANNELS: usize = 4;

/// Channel index into a [`MetricsGrid`] cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Intersection = 0,
    Union = 1,
    Precision = 2,
    Recall = 3,
}

/// `P × G × 4` metrics tensor with its label axes and per-label areas.
///
/// `pred_labels[i]` and `gt_labels[j]` are ascending label ids; the cell for
/// pair (i, j) holds intersection, union, precision and recall in that order.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MetricsGrid {
    pub pred_labels: Vec<u32>,
    pub gt_labels: Vec<u32>,
    pub pred_areas: Vec<f64>,
    pub gt_areas: Vec<f64>,
    values: Vec<f64>,
}

impl MetricsGrid {
    fn from_parts(
        pred_labels: Vec<u32>,
        gt_labels: Vec<u32>,
        pred_areas: Vec<f64>,
        gt_areas: Vec<f64>,
        intersections: &[f64],
    ) -> Self {
        let ng = gt_labels.len();
        let mut values = Vec::with_capacity(pred_labels.len() * ng * METRIC_CHANNELS);
        for (i, &a_p) in pred_areas.iter().enumerate() {
            for (j, &a_g) in gt_areas.iter().enumerate() {
                let inter = intersections[i * ng + j];
                values.extend_from_slice(&[
                    inter,
                    a_p + a_g - inter,
                    ratio(inter, a_p),
                    ratio(inter, a_g),
                ]);
            }
        }
        MetricsGrid {
            pred_labels,
            gt_labels,
            pred_areas,
            gt_areas,
            values,
        }
    }

    /// Rebuild a grid from a bare `P × G × 4` tensor.
    ///
    /// Areas are recovered as `I / precision` (pred) and `I / recall` (gt)
    /// from any pair that overlaps. A label with no overlap at all falls back
    /// to `U + I - other_area` against a pair whose other area is known, and
    /// otherwise to 0.
    pub fn from_channels(pred_labels: Vec<u32>, gt_labels: Vec<u32>, values: Vec<f64>) -> Result<Self> {
        let (np, ng) = (pred_labels.len(), gt_labels.len());
        if values.len() != np * ng * METRIC_CHANNELS {
            return Err(Error::Shape(format!(
                "{} values cannot hold a {}x{}x{} metrics tensor",
                values.len(),
                np,
                ng,
                METRIC_CHANNELS
            )));
        }
        let at = |i: usize, j: usize, c: Channel| values[(i * ng + j) * METRIC_CHANNELS + c as usize];

        let mut pred_areas: Vec<Option<f64>> = (0..np)
            .map(|i| {
                (0..ng)
                    .find(|&j| at(i, j, Channel::Precision) > 0.0)
                    .map(|j| at(i, j, Channel::Intersection) / at(i, j, Channel::Precision))
            })
            .collect();
        let mut gt_areas: Vec<Option<f64>> = (0..ng)
            .map(|j| {
                (0..np)
                    .find(|&i| at(i, j, Channel::Recall) > 0.0)
                    .map(|i| at(i, j, Channel::Intersection) / at(i, j, Channel::Recall))
            })
            .collect();

        for i in 0..np {
            if pred_areas[i].is_none() {
                pred_areas[i] = (0..ng).find_map(|j| {
                    gt_areas[j].map(|a_g| at(i, j, Channel::Union) + at(i, j, Channel::Intersection) - a_g)
                });
            }
        }
        for j in 0..ng {
            if gt_areas[j].is_none() {
                gt_areas[j] = (0..np).find_map(|i| {
                    pred_areas[i].map(|a_p| at(i, j, Channel::Union) + at(i, j, Channel::Intersection) - a_p)
                });
            }
        }

        Ok(MetricsGrid {
            pred_labels,
            gt_labels,
            pred_areas: pred_areas.into_iter().map(|a| a.unwrap_or(0.0)).collect(),
            gt_areas: gt_areas.into_iter().map(|a| a.unwrap_or(0.0)).collect(),
            values,
        })
    }

    /// `(pred labels, gt labels)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.pred_labels.len(), self.gt_labels.len())
    }

    pub fn is_empty(&self) -> bool {
        self.pred_labels.is_empty() || self.gt_labels.is_empty()
    }

    /// Flat `P × G × 4` values, row-major.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, i: usize, j: usize, channel: Channel) -> f64 {
        self.values[(i * self.gt_labels.len() + j) * METRIC_CHANNELS + channel as usize]
    }

    pub fn intersection(&self, i: usize, j: usize) -> f64 {
        self.get(i, j, Channel::Intersection)
    }

    pub fn union(&self, i: usize, j: usize) -> f64 {
        self.get(i, j, Channel::Union)
    }

    pub fn precision(&self, i: usize, j: usize) -> f64 {
        self.get(i, j, Channel::Precision)
    }

    pub fn recall(&self, i: usize, j: usize) -> f64 {
        self.get(i, j, Channel::Recall)
    }

    /// Intersection over union; 0 for an empty union.
    pub fn iou(&self, i: usize, j: usize) -> f64 {
        ratio(self.intersection(i, j), self.union(i, j))
    }

    /// Position of `label` on the pred axis.
    pub fn pred_index(&self, label: u32) -> Option<usize> {
        self.pred_labels.binary_search(&label).ok()
    }

    /// Position of `label` on the gt axis.
    pub fn gt_index(&self, label: u32) -> Option<usize> {
        self.gt_labels.binary_search(&label).ok()
    }

    /// Copy of the grid with the background label (0) removed from both axes.
    pub fn without_background(&self) -> MetricsGrid {
        let keep_p: Vec<usize> = (0..self.pred_labels.len())
            .filter(|&i| self.pred_labels[i] != 0)
            .collect();
        let keep_g: Vec<usize> = (0..self.gt_labels.len())
            .filter(|&j| self.gt_labels[j] != 0)
            .collect();

        let mut values = Vec::with_capacity(keep_p.len() * keep_g.len() * METRIC_CHANNELS);
        for &i in &keep_p {
            for &j in &keep_g {
                let start = (i * self.gt_labels.len() + j) * METRIC_CHANNELS;
                values.extend_from_slice(&self.values[start..start + METRIC_CHANNELS]);
            }
        }
        MetricsGrid {
            pred_labels: keep_p.iter().map(|&i| self.pred_labels[i]).collect(),
            gt_labels: keep_g.iter().map(|&j| self.gt_labels[j]).collect(),
            pred_areas: keep_p.iter().map(|&i| self.pred_areas[i]).collect(),
            gt_areas: keep_g.iter().map(|&j| self.gt_areas[j]).collect(),
            values,
        }
    }
}

const NO_INDEX: usize = usize::MAX;

/// Sorted labels present in valid cells of `map`, and a label → axis index table.
fn label_axis(map: &LabelMap) -> (Vec<u32>, [usize; 256]) {
    let mut seen = [false; 256];
    for &v in &map.data {
        if let Some(stack) = LabelStack::layers(v) {
            for &l in stack.as_slice() {
                seen[l as usize] = true;
            }
        }
    }
    let mut index = [NO_INDEX; 256];
    let mut labels = Vec::new();
    for (l, _) in seen.iter().enumerate().filter(|(_, &s)| s) {
        index[l] = labels.len();
        labels.push(l as u32);
    }
    (labels, index)
}

/// Per-thread partial sums.
struct Accumulator {
    pred_areas: Vec<f64>,
    gt_areas: Vec<f64>,
    intersections: Vec<f64>,
    skipped: usize,
}

impl Accumulator {
    fn new(np: usize, ng: usize) -> Self {
        Accumulator {
            pred_areas: vec![0.0; np],
            gt_areas: vec![0.0; ng],
            intersections: vec![0.0; np * ng],
            skipped: 0,
        }
    }

    fn merge(mut self, other: Accumulator) -> Accumulator {
        for (a, b) in self.pred_areas.iter_mut().zip(&other.pred_areas) {
            *a += b;
        }
        for (a, b) in self.gt_areas.iter_mut().zip(&other.gt_areas) {
            *a += b;
        }
        for (a, b) in self.intersections.iter_mut().zip(&other.intersections) {
            *a += b;
        }
        self.skipped += other.skipped;
        self
    }
}

/// Compute the metrics grid for two label maps of the same shape.
///
/// Cells outside `mask` (when given) contribute nothing. With
/// `label_distance = Some(d)`, only pairs whose labels differ by at most `2d`
/// accumulate intersection. Both axes include background (0) when present;
/// see [`MetricsGrid::without_background`].
pub fn pixel_metrics(
    pred: &LabelMap,
    gt: &LabelMap,
    mask: Option<&BinaryMask>,
    label_distance: Option<u32>,
) -> Result<MetricsGrid> {
    pred.check_same_shape(gt, "ground-truth map")?;
    if let Some(mask) = mask {
        pred.check_same_shape(mask, "foreground mask")?;
    }

    let (pred_labels, pred_index) = label_axis(pred);
    let (gt_labels, gt_index) = label_axis(gt);
    let (np, ng) = (pred_labels.len(), gt_labels.len());
    let window = label_distance.map(|d| d.saturating_mul(2));
    let width = pred.width;

    let acc = (0..pred.height)
        .into_par_iter()
        .fold(
            || Accumulator::new(np, ng),
            |mut acc, row| {
                let start = row * width;
                for idx in start..start + width {
                    if mask.is_some_and(|m| !m.data[idx]) {
                        continue;
                    }
                    let (Some(sp), Some(sg)) =
                        (LabelStack::layers(pred.data[idx]), LabelStack::layers(gt.data[idx]))
                    else {
                        acc.skipped += 1;
                        continue;
                    };

                    let (dp, dg) = (sp.len() as f64, sg.len() as f64);
                    for &l in sp.as_slice() {
                        acc.pred_areas[pred_index[l as usize]] += 1.0 / dp;
                    }
                    for &l in sg.as_slice() {
                        acc.gt_areas[gt_index[l as usize]] += 1.0 / dg;
                    }

                    let share = 1.0 / (dp * dg);
                    for &a in sp.as_slice() {
                        let i = pred_index[a as usize];
                        for &b in sg.as_slice() {
                            if window.is_some_and(|w| a.abs_diff(b) as u32 > w) {
                                continue;
                            }
                            acc.intersections[i * ng + gt_index[b as usize]] += share;
                        }
                    }
                }
                acc
            },
        )
        .reduce(|| Accumulator::new(np, ng), Accumulator::merge);

    if acc.skipped > 0 {
        log::warn!(
            "skipped {} pixel(s) with more than {} stacked labels",
            acc.skipped,
            crate::stack::STACK_CAPACITY
        );
    }
    log::debug!("metrics grid: {} pred x {} gt labels", np, ng);

    Ok(MetricsGrid::from_parts(
        pred_labels,
        gt_labels,
        acc.pred_areas,
        acc.gt_areas,
        &acc.intersections,
    ))
}

/// [`pixel_metrics`] over two encoded 4-channel buffers.
pub fn pixel_metrics_from_buffers(
    pred: &RgbaBuffer,
    gt: &RgbaBuffer,
    mask: Option<&BinaryMask>,
    label_distance: Option<u32>,
) -> Result<MetricsGrid> {
    if pred.shape() != gt.shape() {
        return Err(Error::Shape(format!(
            "map buffers differ in shape: {:?} vs {:?}",
            pred.shape(),
            gt.shape()
        )));
    }
    pixel_metrics(&codec::decode(pred), &codec::decode(gt), mask, label_distance)
}

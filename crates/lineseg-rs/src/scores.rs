//! Reduce a [`MetricsGrid`] to line-level and pixel-level scores.
//!
//! Both reductions expect a grid with background already removed
//! ([`MetricsGrid::without_background`]).

use serde::{Deserialize, Serialize};

use crate::metrics::MetricsGrid;

/// `num / den`, or 0 when `den` is 0.
pub fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Line-level detection counts and rates at one IoU threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct LineScores {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub jaccard: f64,
    pub f1: f64,
}

/// Pixel-level rates over the matched line pairs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct PixelScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Index of the highest positive value, lowest index on ties.
fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (k, v) in values.enumerate() {
        if v > 0.0 && best.map_or(true, |(_, b)| v > b) {
            best = Some((k, v));
        }
    }
    best.map(|(k, _)| k)
}

/// Mutually-best (pred, gt) index pairs whose IoU reaches `iou_thr`.
pub fn matches(grid: &MetricsGrid, iou_thr: f64) -> Vec<(usize, usize)> {
    let (np, ng) = grid.shape();
    let best_gt: Vec<Option<usize>> = (0..np)
        .map(|i| argmax((0..ng).map(|j| grid.iou(i, j))))
        .collect();
    let best_pred: Vec<Option<usize>> = (0..ng)
        .map(|j| argmax((0..np).map(|i| grid.iou(i, j))))
        .collect();

    best_gt
        .iter()
        .enumerate()
        .filter_map(|(i, &g)| g.map(|j| (i, j)))
        .filter(|&(i, j)| best_pred[j] == Some(i) && grid.iou(i, j) >= iou_thr)
        .collect()
}

/// Count mutual best matches as true positives; every other pred line is a
/// false positive and every other gt line a false negative.
pub fn line_based_scores(grid: &MetricsGrid, iou_thr: f64) -> LineScores {
    let (np, ng) = grid.shape();
    let tp = matches(grid, iou_thr).len();
    let (fp, fn_) = (np - tp, ng - tp);
    let (tp_f, fp_f, fn_f) = (tp as f64, fp as f64, fn_ as f64);

    LineScores {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        precision: ratio(tp_f, tp_f + fp_f),
        recall: ratio(tp_f, tp_f + fn_f),
        jaccard: ratio(tp_f, tp_f + fp_f + fn_f),
        f1: ratio(2.0 * tp_f, 2.0 * tp_f + fp_f + fn_f),
    }
}

/// Matched intersection area over total predicted area (precision) and over
/// total ground-truth area (recall).
pub fn pixel_based_scores(grid: &MetricsGrid, iou_thr: f64) -> PixelScores {
    let matched: f64 = matches(grid, iou_thr)
        .into_iter()
        .map(|(i, j)| grid.intersection(i, j))
        .sum();
    let precision = ratio(matched, grid.pred_areas.iter().sum());
    let recall = ratio(matched, grid.gt_areas.iter().sum());
    PixelScores {
        precision,
        recall,
        f1: ratio(2.0 * precision * recall, precision + recall),
    }
}

//! Page-level evaluation driver: evaluate, then summarize over IoU thresholds.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::label_map;
use crate::metrics::{self, MetricsGrid};
use crate::params::Params;
use crate::scores::{self, LineScores, PixelScores};
use crate::types::{BinaryMask, LabelMap, SegDict};

/// Number of values stored in [`SegEval::stats`] per IoU threshold.
pub const STATS_PER_THRESHOLD: usize = 6;

/// Scores at one IoU threshold.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThresholdScores {
    pub iou_thr: f64,
    pub line: LineScores,
    pub pixel: PixelScores,
}

/// Evaluation of one predicted page against its ground truth.
pub struct SegEval {
    pub pred: LabelMap,
    pub gt: LabelMap,
    pub params: Params,
    mask: Option<BinaryMask>,
    pub metrics: Option<MetricsGrid>,
    /// Flat summary: for each threshold, line P/R/F1 then pixel P/R/F1.
    pub stats: Vec<f64>,
}

impl SegEval {
    pub fn new(pred: LabelMap, gt: LabelMap, params: Params) -> Self {
        SegEval {
            pred,
            gt,
            params,
            mask: None,
            metrics: None,
            stats: Vec::new(),
        }
    }

    /// Build both label maps from segmentation dictionaries on an `h × w` page.
    pub fn from_segdicts(pred: &SegDict, gt: &SegDict, h: usize, w: usize, params: Params) -> Result<Self> {
        let pred = label_map::from_segdict(h, w, pred)?;
        let gt = label_map::from_segdict(h, w, gt)?;
        Ok(SegEval::new(pred, gt, params))
    }

    /// Restrict evaluation to foreground pixels. Ignored when
    /// `params.use_mask` is false.
    pub fn with_mask(mut self, mask: BinaryMask) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Compute the metrics grid, background row and column removed.
    pub fn evaluate(&mut self) -> Result<()> {
        let mask = self.mask.as_ref().filter(|_| self.params.use_mask);
        let grid = metrics::pixel_metrics(&self.pred, &self.gt, mask, self.params.label_distance)?;
        let grid = grid.without_background();
        log::info!(
            "evaluated {} predicted against {} ground-truth lines",
            grid.pred_labels.len(),
            grid.gt_labels.len()
        );
        self.metrics = Some(grid);
        Ok(())
    }

    /// Line and pixel scores at every configured threshold, or `None` before
    /// [`SegEval::evaluate`].
    pub fn scores(&self) -> Option<Vec<ThresholdScores>> {
        let grid = self.metrics.as_ref()?;
        Some(
            self.params
                .iou_thrs
                .iter()
                .map(|&t| ThresholdScores {
                    iou_thr: t,
                    line: scores::line_based_scores(grid, t),
                    pixel: scores::pixel_based_scores(grid, t),
                })
                .collect(),
        )
    }

    /// Print one line per IoU threshold and fill [`SegEval::stats`].
    pub fn summarize(&mut self) {
        let Some(all) = self.scores() else {
            eprintln!("Please run evaluate() first.");
            return;
        };

        self.stats.clear();
        for s in &all {
            self.stats.extend_from_slice(&[
                s.line.precision,
                s.line.recall,
                s.line.f1,
                s.pixel.precision,
                s.pixel.recall,
                s.pixel.f1,
            ]);
            println!(
                " Lines (P/R/F1) @[ IoU={:<4.2} ] = {:0.3} {:0.3} {:0.3} | Pixels (P/R/F1) = {:0.3} {:0.3} {:0.3}",
                s.iou_thr,
                s.line.precision,
                s.line.recall,
                s.line.f1,
                s.pixel.precision,
                s.pixel.recall,
                s.pixel.f1
            );
        }
        let masked = self.mask.is_some() && self.params.use_mask;
        println!(
            "Masked: {} | label distance: {}",
            masked,
            self.params
                .label_distance
                .map_or_else(|| "none".to_string(), |d| d.to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(h: usize, w: usize, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, label: u32) -> LabelMap {
        let mut map = LabelMap::new(h, w);
        for r in rows {
            for c in cols.clone() {
                map.data[r * w + c] = label;
            }
        }
        map
    }

    #[test]
    fn test_summarize_before_evaluate_leaves_stats_empty() {
        let map = LabelMap::new(2, 2);
        let mut e = SegEval::new(map.clone(), map, Params::default());
        e.summarize();
        assert!(e.stats.is_empty());
        assert!(e.scores().is_none());
    }

    #[test]
    fn test_identical_maps_score_perfectly() {
        let map = block(4, 4, 1..3, 0..4, 1);
        let mut e = SegEval::new(map.clone(), map, Params::default());
        e.evaluate().unwrap();
        e.summarize();
        assert_eq!(e.stats.len(), 10 * STATS_PER_THRESHOLD);
        assert!(e.stats.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_mask_is_applied_and_can_be_disabled() {
        let pred = block(2, 4, 0..2, 0..4, 1);
        let gt = block(2, 4, 0..2, 0..2, 1);
        // only the shared half is foreground
        let mask = BinaryMask::from_vec(2, 4, vec![true, true, false, false, true, true, false, false]).unwrap();

        let params = Params {
            iou_thrs: vec![0.9],
            ..Params::default()
        };
        let mut masked = SegEval::new(pred.clone(), gt.clone(), params.clone()).with_mask(mask.clone());
        masked.evaluate().unwrap();
        let s = masked.scores().unwrap();
        assert_eq!(s[0].line.true_positives, 1);

        let mut unmasked = SegEval::new(
            pred,
            gt,
            Params {
                use_mask: false,
                ..params
            },
        )
        .with_mask(mask);
        unmasked.evaluate().unwrap();
        let s = unmasked.scores().unwrap();
        assert_eq!(s[0].line.true_positives, 0);
        assert_eq!(s[0].pixel.precision, 0.0);
        let grid = unmasked.metrics.as_ref().unwrap();
        assert!((grid.iou(0, 0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_from_segdicts() {
        let json = r#"{"lines": [{"boundary": [[0,0],[3,0],[3,2],[0,2]]}]}"#;
        let segdict: SegDict = serde_json::from_str(json).unwrap();
        let mut e = SegEval::from_segdicts(&segdict, &segdict, 4, 4, Params::default()).unwrap();
        assert_eq!(e.pred.data.iter().filter(|&&v| v == 1).count(), 6);
        e.evaluate().unwrap();
        let grid = e.metrics.as_ref().unwrap();
        assert_eq!(grid.pred_labels, vec![1]);
        assert!((grid.iou(0, 0) - 1.0).abs() < 1e-12);
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{require_file, Result};

/// Evaluation parameters: IoU thresholds, label window and masking.
///
/// Defaults: 10 IoU thresholds (0.50:0.05:0.95), no label window, and the
/// foreground mask enabled. Any field missing from a JSON config keeps its
/// default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {
    /// IoU thresholds at which lines are matched (default: 0.50, 0.55, ..., 0.95).
    pub iou_thrs: Vec<f64>,
    /// Compare pred label `i` only with gt labels `j` where `|i - j| <= 2d`.
    pub label_distance: Option<u32>,
    /// Restrict metrics to foreground pixels of the page image.
    pub use_mask: bool,
}

impl Default for Params {
    fn default() -> Self {
        let iou_thrs: Vec<f64> = (0..10).map(|i| 0.5 + 0.05 * i as f64).collect();
        Params {
            iou_thrs,
            label_distance: None,
            use_mask: true,
        }
    }
}

impl Params {
    /// Load parameters from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        require_file(path)?;
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

pub mod codec;
pub mod error;
pub mod eval;
pub mod foreground;
pub mod label_map;
pub mod metrics;
pub mod params;
pub mod raster;
pub mod scores;
pub mod stack;
pub mod types;

pub use codec::{decode, encode, RgbaBuffer};
pub use error::{Error, Result};
pub use eval::{SegEval, ThresholdScores};
pub use label_map::{apply_polygon_mask, depth, retrieve_polygon_mask};
pub use metrics::{pixel_metrics, pixel_metrics_from_buffers, Channel, MetricsGrid};
pub use params::Params;
pub use scores::{line_based_scores, pixel_based_scores, LineScores, PixelScores};
pub use stack::{recover_labels, LabelStack};
pub use types::{BinaryMask, DepthMap, Grid, LabelMap, Line, Polygon, SegDict};

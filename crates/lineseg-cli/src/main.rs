use std::path::{Path, PathBuf};

use clap::Parser;
use lineseg_rs::{codec, foreground, label_map};
use lineseg_rs::{BinaryMask, LabelMap, Params, RgbaBuffer, SegDict, SegEval};

#[derive(Parser)]
#[command(name = "lineseg-eval")]
#[command(
    about = "Text-line segmentation evaluation: pixel-level P/R/F1 for predicted vs. ground-truth line polygons"
)]
struct Cli {
    /// Predicted lines: segmentation dictionary (.json) or encoded label map (.png)
    #[arg(long)]
    pred: PathBuf,

    /// Ground-truth lines: segmentation dictionary (.json) or encoded label map (.png)
    #[arg(long)]
    gt: PathBuf,

    /// Page image; sets the canvas size and provides the foreground mask
    #[arg(long)]
    image: Option<PathBuf>,

    /// Count every pixel, not only foreground ones
    #[arg(long)]
    no_mask: bool,

    /// IoU thresholds (comma-separated, e.g., "0.5,0.75")
    #[arg(long, value_delimiter = ',')]
    iou_thrs: Option<Vec<f64>>,

    /// Only compare labels i and j with |i - j| <= 2 * distance
    #[arg(long)]
    label_distance: Option<u32>,

    /// JSON file with evaluation parameters; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write both label maps as encoded PNGs into this directory
    #[arg(long)]
    save_maps: Option<PathBuf>,
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Load an encoded map, or rasterise a segmentation dictionary on an `h × w` canvas.
fn load_map(path: &Path, size: Option<(usize, usize)>) -> Result<LabelMap, Box<dyn std::error::Error>> {
    if is_png(path) {
        return Ok(codec::decode(&RgbaBuffer::load_png(path)?));
    }
    let Some((h, w)) = size else {
        return Err(format!(
            "{}: a page image (--image) is needed to rasterise a segmentation dictionary",
            path.display()
        )
        .into());
    };
    let segdict = SegDict::from_file(path)?;
    log::info!("{}: {} lines", path.display(), segdict.lines.len());
    Ok(label_map::from_segdict(h, w, &segdict)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut params = match &cli.config {
        Some(path) => Params::from_file(path)?,
        None => Params::default(),
    };
    if let Some(iou_thrs) = cli.iou_thrs {
        params.iou_thrs = iou_thrs;
    }
    if let Some(d) = cli.label_distance {
        params.label_distance = Some(d);
    }
    if cli.no_mask {
        params.use_mask = false;
    }

    let mut mask: Option<BinaryMask> = None;
    let mut size = None;
    if let Some(path) = &cli.image {
        log::info!("Loading page image from {:?}...", path);
        let page = foreground::load_image(path)?;
        size = Some((page.height() as usize, page.width() as usize));
        if params.use_mask {
            mask = Some(foreground::binarize(&page));
        }
    }

    log::info!("Loading predictions from {:?}...", cli.pred);
    let pred = load_map(&cli.pred, size)?;
    log::info!("Loading ground truth from {:?}...", cli.gt);
    let gt = load_map(&cli.gt, size)?;

    if let Some(dir) = &cli.save_maps {
        std::fs::create_dir_all(dir)?;
        codec::encode(&pred).save_png(&dir.join("pred_map.png"))?;
        codec::encode(&gt).save_png(&dir.join("gt_map.png"))?;
        log::info!("Saved label maps to {:?}", dir);
    }

    let mut seg_eval = SegEval::new(pred, gt, params);
    if let Some(mask) = mask {
        seg_eval = seg_eval.with_mask(mask);
    }

    log::info!("Evaluating...");
    seg_eval.evaluate()?;
    seg_eval.summarize();

    // Machine-readable stats line
    let stats_strs: Vec<String> = seg_eval.stats.iter().map(|v| format!("{:.15}", v)).collect();
    println!("stats: [{}]", stats_strs.join(", "));

    Ok(())
}

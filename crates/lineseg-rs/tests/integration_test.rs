use std::path::PathBuf;

use image::{Rgb, RgbImage};
use lineseg_rs::{codec, foreground, label_map, metrics};
use lineseg_rs::{Error, Params, RgbaBuffer, SegDict, SegEval};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_pair() -> (SegDict, SegDict) {
    let pred = SegDict::from_file(&fixtures_dir().join("pred.json")).expect("Failed to load pred");
    let gt = SegDict::from_file(&fixtures_dir().join("gt.json")).expect("Failed to load GT");
    (pred, gt)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_load_segdicts() {
    let (pred, gt) = load_pair();
    assert_eq!(pred.lines.len(), 2);
    assert_eq!(gt.lines.len(), 2);
    assert_eq!(pred.kind.as_deref(), Some("baselines"));
    assert!(gt.lines[0].baseline.is_none());
}

#[test]
fn test_maps_from_fixtures() {
    let (pred, gt) = load_pair();
    let pred_map = label_map::from_segdict(6, 6, &pred).unwrap();
    let gt_map = label_map::from_segdict(6, 6, &gt).unwrap();

    assert_eq!(label_map::retrieve_polygon_mask(&pred_map, 1).count(), 9);
    assert_eq!(label_map::retrieve_polygon_mask(&pred_map, 2).count(), 6);
    assert_eq!(gt_map.get(4, 5), Some(&2));
    assert_eq!(pred_map.get(4, 5), Some(&0));
    assert_eq!(pred_map.get(3, 2), Some(&2));
    assert!(label_map::depth(&pred_map).data.iter().all(|&d| d == 1));
}

#[test]
fn test_end_to_end_scores() {
    let (pred, gt) = load_pair();
    let params = Params {
        iou_thrs: vec![0.5, 0.6],
        ..Params::default()
    };
    let mut e = SegEval::from_segdicts(&pred, &gt, 6, 6, params).unwrap();
    e.evaluate().unwrap();
    e.summarize();

    let expected = [
        // IoU 0.5: both lines match
        1.0, 1.0, 1.0, 13.0 / 15.0, 13.0 / 15.0, 13.0 / 15.0,
        // IoU 0.6: only the fully overlapping line
        0.5, 0.5, 0.5, 0.6, 0.6, 0.6,
    ];
    assert_eq!(e.stats.len(), expected.len());
    for (k, (&got, &want)) in e.stats.iter().zip(&expected).enumerate() {
        assert!(close(got, want), "stats[{}] = {}, expected {}", k, got, want);
    }

    let scores = e.scores().unwrap();
    assert!(scores[1].pixel.precision > 0.25);
    assert!(scores[1].pixel.recall > 0.5);
    assert_eq!(scores[1].line.true_positives, 1);
    assert_eq!(scores[1].line.false_positives, 1);
    assert_eq!(scores[1].line.false_negatives, 1);
}

#[test]
fn test_png_storage_preserves_metrics() {
    let (pred, gt) = load_pair();
    let pred_map = label_map::from_segdict(6, 6, &pred).unwrap();
    let gt_map = label_map::from_segdict(6, 6, &gt).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let pred_path = dir.path().join("pred.png");
    let gt_path = dir.path().join("gt.png");
    codec::encode(&pred_map).save_png(&pred_path).unwrap();
    codec::encode(&gt_map).save_png(&gt_path).unwrap();

    let pred_buf = RgbaBuffer::load_png(&pred_path).unwrap();
    let gt_buf = RgbaBuffer::load_png(&gt_path).unwrap();
    assert_eq!(codec::decode(&pred_buf), pred_map);

    let from_maps = metrics::pixel_metrics(&pred_map, &gt_map, None, None).unwrap();
    let from_pngs = metrics::pixel_metrics_from_buffers(&pred_buf, &gt_buf, None, None).unwrap();
    assert_eq!(from_maps, from_pngs);
}

#[test]
fn test_foreground_mask_from_page_image() {
    let (pred, gt) = load_pair();
    // ink only in the first line's region
    let mut page = RgbImage::from_pixel(6, 6, Rgb([235, 235, 235]));
    for y in 0..3 {
        for x in 0..3 {
            page.put_pixel(x, y, Rgb([20, 20, 20]));
        }
    }
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.png");
    page.save(&path).unwrap();

    let mask = foreground::mask_from_path(&path).unwrap();
    assert_eq!(mask.count(), 9);

    let params = Params {
        iou_thrs: vec![0.6],
        ..Params::default()
    };
    let mut e = SegEval::from_segdicts(&pred, &gt, 6, 6, params)
        .unwrap()
        .with_mask(mask);
    e.evaluate().unwrap();
    let grid = e.metrics.as_ref().unwrap();
    // the second line has no ink, so both its areas are zero
    assert!(close(grid.pred_areas[1], 0.0));
    assert!(close(grid.gt_areas[1], 0.0));
    let s = e.scores().unwrap();
    assert_eq!(s[0].line.true_positives, 1);
    assert!(close(s[0].pixel.precision, 1.0));
}

#[test]
fn test_params_from_config() {
    let params = Params::from_file(&fixtures_dir().join("params.json")).unwrap();
    assert_eq!(params.iou_thrs, vec![0.5, 0.6]);
    assert_eq!(params.label_distance, Some(4));
    assert!(params.use_mask);
}

#[test]
fn test_four_overlapping_lines_overflow() {
    let json = r#"{"lines": [
        {"boundary": [[0,0],[4,0],[4,4],[0,4]]},
        {"boundary": [[1,1],[4,1],[4,4],[1,4]]},
        {"boundary": [[2,2],[4,2],[4,4],[2,4]]},
        {"boundary": [[3,3],[4,3],[4,4],[3,4]]}
    ]}"#;
    let segdict: SegDict = serde_json::from_str(json).unwrap();
    let err = label_map::from_segdict(4, 4, &segdict).unwrap_err();
    match err {
        Error::Overflow { row, col, value } => {
            assert_eq!((row, col), (3, 3));
            assert_eq!(value, 0x010203);
        }
        other => panic!("expected overflow, got {other:?}"),
    }
}

#[test]
fn test_missing_inputs() {
    let err = SegDict::from_file(&fixtures_dir().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(_)));
    let err = foreground::load_image(&fixtures_dir().join("absent.png")).unwrap_err();
    assert!(matches!(err, Error::ResourceNotFound(_)));
}

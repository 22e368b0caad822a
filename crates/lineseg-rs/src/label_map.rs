//! Building label maps from polygons, and per-pixel queries over them.

use crate::error::{Error, Result};
use crate::raster;
use crate::stack::{label_byte, LabelStack};
use crate::types::{BinaryMask, DepthMap, LabelMap, Polygon, SegDict};

/// Stack `label` onto every pixel of `map` where `polygon_mask` is set.
///
/// An empty pixel takes the label as is; an occupied one shifts its labels up
/// one byte and stores `label` in the low byte. A pixel already holding three
/// labels fails with [`Error::Overflow`]. All pixels are checked before any is
/// written, so a failed call leaves `map` untouched.
pub fn apply_polygon_mask(map: &mut LabelMap, polygon_mask: &BinaryMask, label: u32) -> Result<()> {
    let byte = label_byte(label)?;
    map.check_same_shape(polygon_mask, "polygon mask")?;

    let mut stacked: Vec<(usize, u32)> = Vec::new();
    for (idx, (&value, &inside)) in map.data.iter().zip(&polygon_mask.data).enumerate() {
        if !inside {
            continue;
        }
        let overflow = || Error::Overflow {
            row: idx / map.width,
            col: idx % map.width,
            value,
        };
        let mut stack = LabelStack::unpack(value).ok_or_else(overflow)?;
        stack.push(byte).map_err(|_| overflow())?;
        stacked.push((idx, stack.pack()));
    }

    for (idx, value) in stacked {
        map.data[idx] = value;
    }
    Ok(())
}

/// Mask of the pixels whose label stack contains `label`.
pub fn retrieve_polygon_mask(map: &LabelMap, label: u32) -> BinaryMask {
    let Ok(byte) = label_byte(label) else {
        return BinaryMask::new(map.height, map.width);
    };
    map.map(|&v| LabelStack::unpack(v).is_some_and(|s| s.contains(byte)))
}

/// Number of labels stacked on each pixel; background counts as one layer and
/// cells without a valid decomposition get 0.
pub fn depth(map: &LabelMap) -> DepthMap {
    map.map(|&v| LabelStack::layers(v).map_or(0, |s| s.len() as u32))
}

/// Rasterise `polygons` in order onto an empty `h × w` map.
pub fn from_polygons(h: usize, w: usize, polygons: &[Polygon]) -> Result<LabelMap> {
    let mut map = LabelMap::new(h, w);
    for polygon in polygons {
        let mask = raster::rasterize(&polygon.vertices, h, w);
        log::debug!(
            "polygon {}: {} vertices, {} pixels",
            polygon.label,
            polygon.vertices.len(),
            mask.count()
        );
        apply_polygon_mask(&mut map, &mask, polygon.label)?;
    }
    Ok(map)
}

/// Label map for a segmentation dictionary; line `i` (0-based) gets label `i + 1`.
pub fn from_segdict(h: usize, w: usize, segdict: &SegDict) -> Result<LabelMap> {
    from_polygons(h, w, &segdict.polygons())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_6x6(rows: [[u32; 6]; 6]) -> LabelMap {
        LabelMap::from_vec(6, 6, rows.concat()).unwrap()
    }

    fn mask_6x6(rows: [[u8; 6]; 6]) -> BinaryMask {
        BinaryMask::from_vec(6, 6, rows.concat().into_iter().map(|v| v != 0).collect()).unwrap()
    }

    fn top_left_2() -> LabelMap {
        map_6x6([
            [2, 2, 2, 0, 0, 0],
            [2, 2, 2, 0, 0, 0],
            [2, 2, 2, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ])
    }

    #[test]
    fn test_single_polygon_on_empty_map() {
        let mut map = LabelMap::new(6, 6);
        let mask = mask_6x6([
            [1, 1, 1, 0, 0, 0],
            [1, 1, 1, 0, 0, 0],
            [1, 1, 1, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        apply_polygon_mask(&mut map, &mask, 2).unwrap();
        assert_eq!(map, top_left_2());
    }

    #[test]
    fn test_two_intersecting_polygons() {
        let mut map = top_left_2();
        let mask = mask_6x6([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 0, 0],
            [0, 0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        apply_polygon_mask(&mut map, &mask, 3).unwrap();
        assert_eq!(
            map,
            map_6x6([
                [2, 2, 2, 0, 0, 0],
                [2, 2, 2, 0, 0, 0],
                [2, 2, 0x203, 3, 0, 0],
                [0, 0, 3, 3, 3, 0],
                [0, 0, 0, 0, 0, 0],
                [0, 0, 0, 0, 0, 0],
            ])
        );
    }

    #[test]
    fn test_three_intersecting_polygons() {
        let mut map = top_left_2();
        let mask_3 = mask_6x6([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 0, 0],
            [0, 0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let mask_4 = mask_6x6([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 1, 0],
            [0, 0, 1, 1, 1, 1],
            [0, 0, 1, 1, 1, 0],
            [0, 0, 1, 1, 0, 0],
        ]);
        apply_polygon_mask(&mut map, &mask_3, 3).unwrap();
        apply_polygon_mask(&mut map, &mask_4, 4).unwrap();
        assert_eq!(
            map,
            map_6x6([
                [2, 2, 2, 0, 0, 0],
                [2, 2, 2, 0, 0, 0],
                [2, 2, 0x20304, 0x304, 4, 0],
                [0, 0, 0x304, 0x304, 0x304, 4],
                [0, 0, 4, 4, 4, 0],
                [0, 0, 4, 4, 0, 0],
            ])
        );
    }

    #[test]
    fn test_large_labels_do_not_overflow() {
        let mut map = top_left_2().map(|&v| if v == 2 { 255 } else { 0 });
        let mask = mask_6x6([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        apply_polygon_mask(&mut map, &mask, 255).unwrap();
        apply_polygon_mask(&mut map, &mask, 255).unwrap();
        assert_eq!(map.get(2, 2), Some(&0xffffff));
        assert_eq!(map.get(2, 3), Some(&0xffff));
    }

    #[test]
    fn test_single_pixel_stacking_order() {
        let mut map = LabelMap::new(1, 1);
        let mask = BinaryMask::from_vec(1, 1, vec![true]).unwrap();
        apply_polygon_mask(&mut map, &mask, 3).unwrap();
        apply_polygon_mask(&mut map, &mask, 4).unwrap();
        assert_eq!(map.data[0], 0x0304);
        apply_polygon_mask(&mut map, &mask, 7).unwrap();
        assert_eq!(map.data[0], 0x030407);
    }

    #[test]
    fn test_fourth_polygon_overflows_and_leaves_map_untouched() {
        let mut map = LabelMap::from_vec(2, 2, vec![2, 2, 2, 0]).unwrap();
        let mask = BinaryMask::from_vec(2, 2, vec![false, true, true, true]).unwrap();
        apply_polygon_mask(&mut map, &mask, 3).unwrap();
        apply_polygon_mask(&mut map, &mask, 3).unwrap();
        let before = map.clone();

        let err = apply_polygon_mask(&mut map, &mask, 1).unwrap_err();
        match err {
            Error::Overflow { row, col, value } => {
                assert_eq!((row, col), (0, 1));
                assert_eq!(value, 0x020303);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        assert_eq!(map, before);
    }

    #[test]
    fn test_apply_rejects_bad_label_and_shape() {
        let mut map = LabelMap::new(2, 2);
        let mask = BinaryMask::new(2, 2);
        assert!(matches!(
            apply_polygon_mask(&mut map, &mask, 0),
            Err(Error::InvalidLabel(0))
        ));
        assert!(matches!(
            apply_polygon_mask(&mut map, &mask, 300),
            Err(Error::InvalidLabel(300))
        ));
        let small = BinaryMask::new(1, 2);
        assert!(matches!(
            apply_polygon_mask(&mut map, &small, 1),
            Err(Error::Shape(_))
        ));
    }

    #[test]
    fn test_retrieve_polygon_mask() {
        let map = map_6x6([
            [2, 2, 2, 0, 0, 0],
            [2, 2, 2, 0, 0, 0],
            [2, 2, 0x20304, 0x304, 4, 0],
            [0, 3, 0x304, 0x304, 0x304, 4],
            [0, 0, 3, 4, 4, 0],
            [0, 0, 4, 4, 0, 0],
        ]);
        let expected = mask_6x6([
            [0, 0, 0, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
            [0, 0, 1, 1, 0, 0],
            [0, 1, 1, 1, 1, 0],
            [0, 0, 1, 0, 0, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        assert_eq!(retrieve_polygon_mask(&map, 3), expected);
        // retrieval leaves the map unchanged
        assert_eq!(retrieve_polygon_mask(&map, 3), expected);
        assert_eq!(retrieve_polygon_mask(&map, 9).count(), 0);
    }

    #[test]
    fn test_depth() {
        let map = map_6x6([
            [2, 2, 2, 0, 0, 0],
            [2, 2, 2, 0, 0, 0],
            [2, 2, 0x20304, 0x304, 4, 0],
            [0, 0, 0x304, 0x304, 0x304, 4],
            [0, 0, 4, 4, 4, 0],
            [0, 0, 4, 4, 0, 0],
        ]);
        let expected = map_6x6([
            [1, 1, 1, 1, 1, 1],
            [1, 1, 1, 1, 1, 1],
            [1, 1, 3, 2, 1, 1],
            [1, 1, 2, 2, 2, 1],
            [1, 1, 1, 1, 1, 1],
            [1, 1, 1, 1, 1, 1],
        ]);
        assert_eq!(depth(&map), expected);
    }

    #[test]
    fn test_depth_invalid_cell_is_zero() {
        let map = LabelMap::from_vec(1, 2, vec![0x1ffffff, 0]).unwrap();
        assert_eq!(depth(&map).data, vec![0, 1]);
    }

    #[test]
    fn test_from_polygons_overlapping_rectangles() {
        let polygons = vec![
            Polygon {
                label: 1,
                vertices: vec![[0.0, 0.0], [3.0, 0.0], [3.0, 2.0], [0.0, 2.0]],
            },
            Polygon {
                label: 2,
                vertices: vec![[2.0, 1.0], [4.0, 1.0], [4.0, 3.0], [2.0, 3.0]],
            },
        ];
        let map = from_polygons(4, 4, &polygons).unwrap();
        assert_eq!(
            map.data,
            vec![
                1, 1, 1, 0, //
                1, 1, 0x102, 2, //
                0, 0, 2, 2, //
                0, 0, 0, 0,
            ]
        );
    }
}

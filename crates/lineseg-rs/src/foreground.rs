//! Foreground extraction: global Otsu binarisation over luminance.

use std::path::Path;

use image::{DynamicImage, GrayImage};
use imageproc::contrast::otsu_level;

use crate::error::{require_file, Result};
use crate::types::BinaryMask;

/// Otsu threshold of a grayscale image.
///
/// Returns `None` when the image holds a single grey level, since no split
/// separates two classes.
pub fn otsu_threshold(gray: &GrayImage) -> Option<u8> {
    let mut levels = gray.pixels().map(|p| p.0[0]);
    let first = levels.next()?;
    if levels.all(|l| l == first) {
        return None;
    }
    Some(otsu_level(gray))
}

/// Binarise an image: a pixel is foreground when its luma is at or below the
/// Otsu threshold.
pub fn binarize(img: &DynamicImage) -> BinaryMask {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    let mut mask = BinaryMask::new(h as usize, w as usize);

    let Some(threshold) = otsu_threshold(&gray) else {
        log::debug!("uniform {}x{} image, no foreground", h, w);
        return mask;
    };
    for (cell, p) in mask.data.iter_mut().zip(gray.pixels()) {
        *cell = p.0[0] <= threshold;
    }
    log::debug!(
        "otsu threshold {}: {} of {} pixels foreground",
        threshold,
        mask.count(),
        mask.len()
    );
    mask
}

/// Open a page image, failing with `ResourceNotFound` if the path is absent.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    require_file(path)?;
    Ok(image::open(path)?)
}

/// Load a page image and binarise it.
pub fn mask_from_path(path: &Path) -> Result<BinaryMask> {
    let img = load_image(path)?;
    Ok(binarize(&img))
}

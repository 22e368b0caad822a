//! Lossless conversion between a [`LabelMap`] and its 4-channel byte form.
//!
//! Channel 0 carries bits 0..8 of the packed value, channel 1 bits 8..16 and
//! channel 2 bits 16..24. Channel 3 is always zero. Values must stay below
//! 2^24; anything above is truncated.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::LabelMap;

pub const CHANNELS: usize = 4;

/// `height × width × 4` bytes, channel-last.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawBuffer")]
pub struct RgbaBuffer {
    height: usize,
    width: usize,
    data: Vec<u8>,
}

#[derive(Deserialize)]
struct RawBuffer {
    height: usize,
    width: usize,
    data: Vec<u8>,
}

impl TryFrom<RawBuffer> for RgbaBuffer {
    type Error = Error;

    fn try_from(raw: RawBuffer) -> Result<Self> {
        RgbaBuffer::from_raw(raw.height, raw.width, CHANNELS, raw.data)
    }
}

impl RgbaBuffer {
    /// Wrap raw channel-last bytes, validating channel count and length.
    pub fn from_raw(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if channels != CHANNELS {
            return Err(Error::Shape(format!(
                "expected a {}-channel buffer, got {} channel(s)",
                CHANNELS, channels
            )));
        }
        let expected = height.checked_mul(width).and_then(|n| n.checked_mul(CHANNELS));
        if expected != Some(data.len()) {
            return Err(Error::Shape(format!(
                "{} bytes cannot hold a {}x{}x{} buffer",
                data.len(),
                height,
                width,
                CHANNELS
            )));
        }
        Ok(RgbaBuffer {
            height,
            width,
            data,
        })
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, CHANNELS)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The four channel bytes of pixel (row, col), or `None` off the buffer.
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; CHANNELS]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let i = (row * self.width + col) * CHANNELS;
        self.data.get(i..i + CHANNELS)?.try_into().ok()
    }

    /// View as an RGBA image for PNG storage.
    pub fn to_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.data.clone())
            .ok_or_else(|| Error::Shape("buffer does not fit an RGBA image".into()))
    }

    pub fn from_image(img: RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        RgbaBuffer {
            height: h as usize,
            width: w as usize,
            data: img.into_raw(),
        }
    }

    /// Write as a PNG file. PNG is lossless, so the packed labels survive.
    pub fn save_png(&self, path: &std::path::Path) -> Result<()> {
        self.to_image()?.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    pub fn load_png(path: &std::path::Path) -> Result<Self> {
        crate::error::require_file(path)?;
        Ok(RgbaBuffer::from_image(image::open(path)?.into_rgba8()))
    }
}

/// Split each cell into its three low bytes.
pub fn encode(map: &LabelMap) -> RgbaBuffer {
    let mut data = Vec::with_capacity(map.len() * CHANNELS);
    for &v in &map.data {
        data.extend_from_slice(&[
            (v & 0xff) as u8,
            ((v >> 8) & 0xff) as u8,
            ((v >> 16) & 0xff) as u8,
            0,
        ]);
    }
    RgbaBuffer {
        height: map.height,
        width: map.width,
        data,
    }
}

/// Recombine the three low channels into packed cell values.
pub fn decode(buf: &RgbaBuffer) -> LabelMap {
    let data = buf
        .data
        .chunks_exact(CHANNELS)
        .map(|px| px[0] as u32 + ((px[1] as u32) << 8) + ((px[2] as u32) << 16))
        .collect();
    LabelMap {
        height: buf.height,
        width: buf.width,
        data,
    }
}

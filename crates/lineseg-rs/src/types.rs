use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Row-major `height × width` grid: cell (row, col) is at index `row * width + col`.
///
/// Deserialisation goes through [`Grid::from_vec`], so a decoded grid always
/// holds exactly `height * width` cells.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawGrid<T>")]
pub struct Grid<T> {
    pub height: usize,
    pub width: usize,
    pub data: Vec<T>,
}

#[derive(Deserialize)]
struct RawGrid<T> {
    height: usize,
    width: usize,
    data: Vec<T>,
}

impl<T> TryFrom<RawGrid<T>> for Grid<T> {
    type Error = Error;

    fn try_from(raw: RawGrid<T>) -> Result<Self> {
        Grid::from_vec(raw.height, raw.width, raw.data)
    }
}

impl<T: Clone + Default> Grid<T> {
    /// A grid filled with `T::default()`.
    pub fn new(height: usize, width: usize) -> Self {
        Grid {
            height,
            width,
            data: vec![T::default(); height * width],
        }
    }
}

impl<T> Grid<T> {
    /// Wrap an existing row-major buffer. Length must be `height * width`.
    pub fn from_vec(height: usize, width: usize, data: Vec<T>) -> Result<Self> {
        let grid = Grid {
            height,
            width,
            data,
        };
        grid.validate()?;
        Ok(grid)
    }

    /// Fail with [`Error::Shape`] unless `data` holds exactly `height * width`
    /// cells. The fields are public, so a grid can be edited out of shape.
    pub fn validate(&self) -> Result<()> {
        if self.height.checked_mul(self.width) != Some(self.data.len()) {
            return Err(Error::Shape(format!(
                "buffer of {} cells cannot hold a {}x{} grid",
                self.data.len(),
                self.height,
                self.width
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.height && col < self.width {
            self.data.get(row * self.width + col)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.height && col < self.width {
            self.data.get_mut(row * self.width + col)
        } else {
            None
        }
    }

    /// The cells of one row.
    pub fn row(&self, row: usize) -> &[T] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    pub fn map<U, F: Fn(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            height: self.height,
            width: self.width,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Fail with [`Error::Shape`] unless both grids are well formed and
    /// `other` has the same spatial shape.
    pub fn check_same_shape<U>(&self, other: &Grid<U>, what: &str) -> Result<()> {
        self.validate()?;
        other.validate()?;
        if self.shape() != other.shape() {
            return Err(Error::Shape(format!(
                "{} is {}x{}, expected {}x{}",
                what, other.height, other.width, self.height, self.width
            )));
        }
        Ok(())
    }
}

/// Foreground/background grid; `true` marks a foreground (ink) pixel.
pub type BinaryMask = Grid<bool>;

/// Packed polygon labels: up to 3 labels per cell, one byte each, oldest in
/// the most-significant occupied byte.
pub type LabelMap = Grid<u32>;

/// Number of polygons covering each pixel; background pixels count as 1.
pub type DepthMap = Grid<u32>;

impl BinaryMask {
    /// Number of foreground pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

/// A polygon with its map label. Vertices are `[x, y]` in pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Polygon {
    pub label: u32,
    pub vertices: Vec<[f64; 2]>,
}

/// Segmentation dictionary as emitted by the line-detection model and by the
/// ground-truth converters.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SegDict {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub imagename: Option<String>,
    #[serde(default)]
    pub text_direction: Option<String>,
    #[serde(default)]
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Line {
    #[serde(default)]
    pub line_id: Option<String>,
    /// Closed outline of the line region.
    pub boundary: Vec<[f64; 2]>,
    #[serde(default)]
    pub baseline: Option<Vec<[f64; 2]>>,
}

impl SegDict {
    /// Load a segmentation dictionary from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        crate::error::require_file(path)?;
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Polygons labelled by 1-based line position.
    pub fn polygons(&self) -> Vec<Polygon> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| Polygon {
                label: (i + 1) as u32,
                vertices: line.boundary.clone(),
            })
            .collect()
    }
}

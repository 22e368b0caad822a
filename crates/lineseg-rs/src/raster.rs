//! Scan-line polygon rasterisation.
//!
//! Vertices are upsampled 5x and each edge is traced to dense integer points.
//! Wherever the outline crosses a pixel-column centre, the crossing becomes a
//! fill toggle at a column-major offset; the toggles are then replayed into a
//! row-major [`BinaryMask`].

use crate::types::BinaryMask;

const SCALE: f64 = 5.0;

/// Rasterise a closed polygon onto an `h × w` canvas.
///
/// Fewer than 3 vertices yields an empty mask. An axis-aligned rectangle with
/// integer corners `(x0, y0)`–`(x1, y1)` covers columns `x0..x1` and rows
/// `y0..y1`.
pub fn rasterize(vertices: &[[f64; 2]], h: usize, w: usize) -> BinaryMask {
    let mut mask = BinaryMask::new(h, w);
    let k = vertices.len();
    if k < 3 || h == 0 || w == 0 {
        return mask;
    }

    // Upsampled, closed outline.
    let mut outline: Vec<(i32, i32)> = vertices
        .iter()
        .map(|&[x, y]| ((SCALE * x + 0.5) as i32, (SCALE * y + 0.5) as i32))
        .collect();
    outline.push(outline[0]);

    let mut points = Vec::new();
    for edge in outline.windows(2) {
        trace_edge(edge[0], edge[1], &mut points);
    }
    let mut toggles = column_crossings(&points, h, w);
    toggles.sort_unstable();

    // Each toggle flips fill state; duplicates cancel out.
    let total = h * w;
    let mut filled = false;
    let mut start = 0usize;
    for &t in toggles.iter().chain(std::iter::once(&total)) {
        let t = t.min(total);
        if filled {
            for idx in start..t {
                let (x, y) = (idx / h, idx % h);
                mask.data[y * w + x] = true;
            }
        }
        filled = !filled;
        start = t;
    }
    mask
}

/// Append the integer points of one upsampled edge, in walk order.
///
/// The edge is stepped along its major axis and the minor coordinate is
/// interpolated from the end with the smaller major coordinate, so an edge
/// rounds to the same points whichever way it is walked.
fn trace_edge(from: (i32, i32), to: (i32, i32), points: &mut Vec<(i32, i32)>) {
    let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
    let x_major = dx >= dy;
    let steps = dx.max(dy);
    let reversed = if x_major { from.0 > to.0 } else { from.1 > to.1 };
    let (lo, hi) = if reversed { (to, from) } else { (from, to) };
    let slope = match (steps, x_major) {
        (0, _) => 0.0,
        (_, true) => (hi.1 - lo.1) as f64 / steps as f64,
        (_, false) => (hi.0 - lo.0) as f64 / steps as f64,
    };

    points.reserve(steps as usize + 1);
    for d in 0..=steps {
        let t = if reversed { steps - d } else { d };
        let minor = |base: i32| (base as f64 + slope * t as f64 + 0.5) as i32;
        points.push(if x_major {
            (lo.0 + t, minor(lo.1))
        } else {
            (minor(lo.0), lo.1 + t)
        });
    }
}

/// Column-major offsets where the outline crosses a pixel-column centre,
/// downsampled back to pixel resolution.
fn column_crossings(points: &[(i32, i32)], h: usize, w: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for pair in points.windows(2) {
        let ((u0, v0), (u1, v1)) = (pair[0], pair[1]);
        if u1 == u0 {
            continue;
        }
        let xd_raw = if u1 < u0 { u1 } else { u1 - 1 };
        let xd = (xd_raw as f64 + 0.5) / SCALE - 0.5;
        if xd != xd.floor() || xd < 0.0 || xd > (w - 1) as f64 {
            continue;
        }
        let yd_raw = v1.min(v0);
        let yd = ((yd_raw as f64 + 0.5) / SCALE - 0.5).clamp(0.0, h as f64).ceil();
        out.push(xd as usize * h + yd as usize);
    }
    out
}

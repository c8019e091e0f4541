//! Weighted traversal grid for seam routing.

use om_core::Image;

/// Per-pixel traversal cost.
///
/// Cells hold one of three values: [`CostGrid::EDGE`] on detected edges,
/// [`CostGrid::DEFAULT`] elsewhere, and [`CostGrid::BARRIER`] on rasterized
/// candidate lines.
#[derive(Debug, Clone)]
pub struct CostGrid {
    cells: Image<f32>,
}

impl CostGrid {
    pub const EDGE: f32 = 0.0;
    pub const DEFAULT: f32 = 1.0;
    pub const BARRIER: f32 = 9999.0;

    pub fn uniform(width: usize, height: usize) -> Self {
        Self {
            cells: Image::new_fill(width, height, Self::DEFAULT),
        }
    }

    pub fn from_edges(edges: &Image<bool>) -> Self {
        Self {
            cells: edges.map(|&e| if e { Self::EDGE } else { Self::DEFAULT }),
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        self.cells.get(x, y).copied()
    }

    pub fn as_image(&self) -> &Image<f32> {
        &self.cells
    }

    pub(crate) fn data(&self) -> &[f32] {
        self.cells.data()
    }

    /// Number of cells holding exactly `value`.
    pub fn count(&self, value: f32) -> usize {
        self.cells.data().iter().filter(|&&v| v == value).count()
    }

    /// Writes a barrier along the segment `a`-`b` (inclusive). Pixels outside
    /// the grid are ignored.
    pub fn write_barrier(&mut self, a: (usize, usize), b: (usize, usize)) {
        for (x, y) in rasterize_line(a, b) {
            if let Some(c) = self.cells.get_mut(x, y) {
                *c = Self::BARRIER;
            }
        }
    }

    /// Traversal cost of a pixel path under the routing step metric.
    ///
    /// Returns `None` if the path leaves the grid or takes a non 8-connected
    /// step.
    pub fn path_cost(&self, path: &[(usize, usize)]) -> Option<f64> {
        let mut total = 0.0;
        for w in path.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            let dx = x0.abs_diff(x1);
            let dy = y0.abs_diff(y1);
            if dx > 1 || dy > 1 {
                return None;
            }
            total += step_cost(self.get(x0, y0)?, self.get(x1, y1)?, dx + dy == 2);
        }
        Some(total)
    }
}

/// Mean of the two cell costs times the Euclidean step length.
#[inline]
pub(crate) fn step_cost(from: f32, to: f32, diagonal: bool) -> f64 {
    let len = if diagonal { std::f64::consts::SQRT_2 } else { 1.0 };
    0.5 * (f64::from(from) + f64::from(to)) * len
}

/// Bresenham rasterization of the segment `a`-`b`, both ends included.
pub fn rasterize_line(a: (usize, usize), b: (usize, usize)) -> Vec<(usize, usize)> {
    let (mut x, mut y) = (a.0 as isize, a.1 as isize);
    let (x1, y1) = (b.0 as isize, b.1 as isize);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut out = Vec::with_capacity(dx.max(-dy) as usize + 1);
    loop {
        out.push((x as usize, y as usize));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    out
}

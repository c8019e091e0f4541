//! Canny-style edge masks used to make seams prefer image edges.
//!
//! Steps: `smooth_passes` binomial blurs, Scharr gradients, thinning to
//! gradient maxima, then hysteresis between two thresholds.
//!
//! With both thresholds left at zero they are derived from the strongest
//! thinned response (`low = 0.1 * peak`, `high = 0.2 * peak`). Swapped
//! thresholds are reordered. Border pixels never carry an edge, and a flat
//! band gives an empty mask.

use om_core::{Image, ImageView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Number of 3x3 binomial passes before differentiation. Two passes are
    /// close to a Gaussian with sigma 1.
    pub smooth_passes: usize,
    pub low_thresh: f32,
    pub high_thresh: f32,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            smooth_passes: 2,
            low_thresh: 0.0,
            high_thresh: 0.0,
        }
    }
}

/// Edge detector owning its scratch grids.
///
/// Buffers are resized only when the input dimensions change, so running the
/// detector over many equally sized cost grids allocates once.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    tmp: Image<f32>,
    gx: Image<f32>,
    gy: Image<f32>,
    mag: Image<f32>,
    nms: Image<f32>,
    weak: Vec<u8>,
    visited: Vec<u8>,
    stack: Vec<usize>,
}

fn blank() -> Image<f32> {
    Image::new_fill(0, 0, 0.0)
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self {
            tmp: blank(),
            gx: blank(),
            gy: blank(),
            mag: blank(),
            nms: blank(),
            weak: Vec::new(),
            visited: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Returns a mask of `img`'s dimensions, `true` on edge pixels.
    pub fn detect(&mut self, img: &ImageView<'_, f32>, cfg: &EdgeConfig) -> Image<bool> {
        let (w, h) = (img.width(), img.height());
        let mut mask = Image::new_fill(w, h, false);
        if w == 0 || h == 0 {
            return mask;
        }

        self.resize(w, h);
        for y in 0..h {
            self.tmp.row_mut(y).copy_from_slice(img.row(y));
        }
        for _ in 0..cfg.smooth_passes {
            self.smooth_binomial3();
        }
        self.compute_scharr();
        self.non_max_suppression();
        self.hysteresis(cfg);

        for (m, &v) in mask.data_mut().iter_mut().zip(&self.visited) {
            *m = v != 0;
        }
        mask
    }

    fn resize(&mut self, w: usize, h: usize) {
        if (self.tmp.width(), self.tmp.height()) != (w, h) {
            for grid in [
                &mut self.tmp,
                &mut self.gx,
                &mut self.gy,
                &mut self.mag,
                &mut self.nms,
            ] {
                *grid = Image::new_fill(w, h, 0.0);
            }
            self.weak = vec![0; w * h];
            self.visited = vec![0; w * h];
        }
    }

    /// One separable `[1 2 1] / 4` pass with replicated borders.
    fn smooth_binomial3(&mut self) {
        let (w, h) = (self.tmp.width(), self.tmp.height());

        for y in 0..h {
            let src = self.tmp.row(y);
            let dst = self.gx.row_mut(y);
            for (x, out) in dst.iter_mut().enumerate() {
                let (l, r) = (x.saturating_sub(1), (x + 1).min(w - 1));
                *out = 0.25 * (src[l] + 2.0 * src[x] + src[r]);
            }
        }

        for y in 0..h {
            let (up, down) = (y.saturating_sub(1), (y + 1).min(h - 1));
            for x in 0..w {
                let v = self.gx.row(up)[x] + 2.0 * self.gx.row(y)[x] + self.gx.row(down)[x];
                self.tmp.row_mut(y)[x] = 0.25 * v;
            }
        }
    }

    fn compute_scharr(&mut self) {
        let (w, h) = (self.tmp.width(), self.tmp.height());

        for y in 0..h {
            let above = self.tmp.row(y.saturating_sub(1));
            let here = self.tmp.row(y);
            let below = self.tmp.row((y + 1).min(h - 1));
            for x in 0..w {
                let (l, r) = (x.saturating_sub(1), (x + 1).min(w - 1));
                let dx = 3.0 * (above[r] - above[l]) + 10.0 * (here[r] - here[l])
                    + 3.0 * (below[r] - below[l]);
                let dy = 3.0 * (below[l] - above[l]) + 10.0 * (below[x] - above[x])
                    + 3.0 * (below[r] - above[r]);

                let i = y * w + x;
                self.gx.data_mut()[i] = dx;
                self.gy.data_mut()[i] = dy;
                self.mag.data_mut()[i] = dx.hypot(dy);
            }
        }
    }

    /// Keeps gradient maxima along the direction quantized to 45 degrees.
    fn non_max_suppression(&mut self) {
        let (w, h) = (self.tmp.width(), self.tmp.height());
        self.nms.fill(0.0);
        if w < 3 || h < 3 {
            return;
        }

        // tan(22.5) and tan(67.5)
        const LOW_SLOPE: f32 = 0.414_213_57;
        const HIGH_SLOPE: f32 = 2.414_213_7;

        let mag = self.mag.data();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * w + x;
                let m = mag[i];
                if m <= 0.0 {
                    continue;
                }

                let (dx, dy) = (self.gx.data()[i], self.gy.data()[i]);
                let step = if dy.abs() <= dx.abs() * LOW_SLOPE {
                    1
                } else if dy.abs() >= dx.abs() * HIGH_SLOPE {
                    w
                } else if dx * dy > 0.0 {
                    w + 1
                } else {
                    w - 1
                };

                // Ties on a plateau keep only the first pixel in scan order.
                if m > mag[i - step] && m >= mag[i + step] {
                    self.nms.data_mut()[i] = m;
                }
            }
        }
    }

    fn hysteresis(&mut self, cfg: &EdgeConfig) {
        let (w, h) = (self.tmp.width(), self.tmp.height());
        self.weak.fill(0);
        self.visited.fill(0);
        self.stack.clear();

        let (mut low, mut high) = (cfg.low_thresh, cfg.high_thresh);
        if low == 0.0 && high == 0.0 {
            let peak = self.nms.data().iter().copied().fold(0.0f32, f32::max);
            // Float noise on a flat field is not an edge.
            if peak <= 1e-6 {
                return;
            }
            (low, high) = (0.1 * peak, 0.2 * peak);
        }
        if high < low {
            std::mem::swap(&mut low, &mut high);
        }

        for (i, &v) in self.nms.data().iter().enumerate() {
            if v > 0.0 && v >= low {
                self.weak[i] = 1;
                if v >= high {
                    self.visited[i] = 1;
                    self.stack.push(i);
                }
            }
        }

        // Grow strong seeds through 8-connected weak pixels.
        while let Some(i) = self.stack.pop() {
            let (x, y) = (i % w, i / w);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let n = ny * w + nx;
                    if self.weak[n] != 0 && self.visited[n] == 0 {
                        self.visited[n] = 1;
                        self.stack.push(n);
                    }
                }
            }
        }
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot convenience around [`EdgeDetector::detect`].
pub fn edge_mask(img: &ImageView<'_, f32>, cfg: &EdgeConfig) -> Image<bool> {
    EdgeDetector::new().detect(img, cfg)
}

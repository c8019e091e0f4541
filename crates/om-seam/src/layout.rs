//! Regular network of candidate cut lines.
//!
//! For each orientation the raster is split into `divisions` strips of
//! `offset = floor(extent / divisions)` pixels. Candidate lines sit on the
//! `divisions - 1` interior strip boundaries `k * offset`; the seams routed
//! for them run half a strip before each line, plus one extra seam half a
//! strip past the last line.

use std::fmt;

use crate::CutlineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Lines run top to bottom, spaced along x.
    Vertical,
    /// Lines run left to right, spaced along y.
    Horizontal,
}

impl Orientation {
    /// Routing order. Vertical barriers and seams are placed first.
    pub const ALL: [Orientation; 2] = [Orientation::Vertical, Orientation::Horizontal];

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Vertical => "vertical",
            Orientation::Horizontal => "horizontal",
        }
    }

    /// Raster extent along which lines of this orientation are spaced.
    #[inline]
    pub fn spacing_extent(self, width: usize, height: usize) -> usize {
        match self {
            Orientation::Vertical => width,
            Orientation::Horizontal => height,
        }
    }

    /// Raster extent a line of this orientation spans.
    #[inline]
    pub fn span_extent(self, width: usize, height: usize) -> usize {
        match self {
            Orientation::Vertical => height,
            Orientation::Horizontal => width,
        }
    }

    /// Pixel `(x, y)` at `across` on the spacing axis and `along` the line.
    #[inline]
    pub fn pixel(self, across: usize, along: usize) -> (usize, usize) {
        match self {
            Orientation::Vertical => (across, along),
            Orientation::Horizontal => (along, across),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Axis-aligned, full-span line at one grid position plus the padding
/// applied to its routing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateLine {
    pub orientation: Orientation,
    pub position: usize,
    pub padding: usize,
}

impl CandidateLine {
    /// Edge-to-edge endpoints of the line itself.
    pub fn endpoints(&self, width: usize, height: usize) -> [(usize, usize); 2] {
        self.endpoints_at(self.position, width, height)
    }

    /// Endpoints shifted by `-padding` (toward the preceding strip).
    pub fn padded_before(&self, width: usize, height: usize) -> [(usize, usize); 2] {
        self.endpoints_at(self.position - self.padding, width, height)
    }

    /// Endpoints shifted by `+padding` (outward past the last line).
    pub fn padded_after(&self, width: usize, height: usize) -> [(usize, usize); 2] {
        self.endpoints_at(self.position + self.padding, width, height)
    }

    fn endpoints_at(&self, across: usize, width: usize, height: usize) -> [(usize, usize); 2] {
        let last = self.orientation.span_extent(width, height) - 1;
        [
            self.orientation.pixel(across, 0),
            self.orientation.pixel(across, last),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeamLayout {
    width: usize,
    height: usize,
    divisions: usize,
}

impl SeamLayout {
    /// Spacing at or below this many pixels leaves no room between a line
    /// and its padded seams.
    pub const MIN_SPACING: usize = 2;

    /// `divisions = max(min_divisions, ceil(min(width, height) / cell_pixels))`.
    pub fn new(
        width: usize,
        height: usize,
        min_divisions: usize,
        cell_pixels: usize,
    ) -> Result<Self, CutlineError> {
        let divisions = min_divisions
            .max(width.min(height).div_ceil(cell_pixels.max(1)))
            .max(1);
        let layout = Self {
            width,
            height,
            divisions,
        };

        if Orientation::ALL
            .iter()
            .any(|&o| layout.offset(o) <= Self::MIN_SPACING)
        {
            return Err(CutlineError::TooSmallRaster { width, height });
        }
        Ok(layout)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn divisions(&self) -> usize {
        self.divisions
    }

    /// Distance between neighbouring lines of `orientation`.
    pub fn offset(&self, orientation: Orientation) -> usize {
        orientation.spacing_extent(self.width, self.height) / self.divisions
    }

    /// Interior candidate lines of `orientation`, in increasing position.
    pub fn lines(&self, orientation: Orientation) -> Vec<CandidateLine> {
        let offset = self.offset(orientation);
        (1..self.divisions)
            .map(|k| CandidateLine {
                orientation,
                position: k * offset,
                padding: offset / 2,
            })
            .collect()
    }

    /// Start/end pixel pairs for the seams of `orientation`.
    pub fn route_endpoints(&self, orientation: Orientation) -> Vec<[(usize, usize); 2]> {
        let lines = self.lines(orientation);
        let mut out: Vec<_> = lines
            .iter()
            .map(|l| l.padded_before(self.width, self.height))
            .collect();
        if let Some(last) = lines.last() {
            out.push(last.padded_after(self.width, self.height));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{Orientation, SeamLayout};
    use crate::CutlineError;

    #[test]
    fn divisions_grow_with_raster_size() {
        let small = SeamLayout::new(640, 480, 8, 256).expect("layout");
        assert_eq!(small.divisions(), 8);

        let large = SeamLayout::new(4000, 3000, 8, 256).expect("layout");
        assert_eq!(large.divisions(), 12);
        assert_eq!(large.offset(Orientation::Vertical), 333);
        assert_eq!(large.offset(Orientation::Horizontal), 250);
    }

    #[test]
    fn sixteen_pixel_raster_is_too_small() {
        assert!(matches!(
            SeamLayout::new(16, 16, 8, 256),
            Err(CutlineError::TooSmallRaster {
                width: 16,
                height: 16
            })
        ));
        // One narrow axis is enough to abort.
        assert!(SeamLayout::new(400, 20, 8, 256).is_err());
        assert!(SeamLayout::new(24, 24, 8, 256).is_ok());
    }

    #[test]
    fn lines_sit_on_interior_strip_boundaries() {
        let layout = SeamLayout::new(64, 48, 8, 256).expect("layout");
        let v = layout.lines(Orientation::Vertical);
        assert_eq!(v.len(), 7);
        assert_eq!(v[0].position, 8);
        assert_eq!(v[6].position, 56);
        assert_eq!(v[0].endpoints(64, 48), [(8, 0), (8, 47)]);

        let h = layout.lines(Orientation::Horizontal);
        assert_eq!(h[0].position, 6);
        assert_eq!(h[0].endpoints(64, 48), [(0, 6), (63, 6)]);
    }

    #[test]
    fn seams_are_padded_off_the_barriers() {
        let layout = SeamLayout::new(64, 48, 8, 256).expect("layout");

        let v = layout.route_endpoints(Orientation::Vertical);
        assert_eq!(v.len(), 8);
        let xs: Vec<usize> = v.iter().map(|[a, _]| a.0).collect();
        assert_eq!(xs, vec![4, 12, 20, 28, 36, 44, 52, 60]);
        assert!(v.iter().all(|[a, b]| a.1 == 0 && b.1 == 47 && a.0 == b.0));

        let h = layout.route_endpoints(Orientation::Horizontal);
        let ys: Vec<usize> = h.iter().map(|[a, _]| a.1).collect();
        assert_eq!(ys, vec![3, 9, 15, 21, 27, 33, 39, 45]);
        assert!(h.iter().all(|[a, b]| a.0 == 0 && b.0 == 63));
    }
}

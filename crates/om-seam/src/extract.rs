//! Region filtering and cutline polygon selection.

use geo::{Area, BooleanOps, BoundingRect, Centroid, MultiPolygon, Polygon};
use om_io::CropArea;

use crate::CutlineError;

/// Applies the crop filter to polygonized faces.
///
/// Faces must lie fully inside the crop area to be retained.
pub fn select_regions(
    faces: Vec<Polygon<f64>>,
    crop: Option<&CropArea>,
) -> Result<Vec<Polygon<f64>>, CutlineError> {
    if faces.is_empty() {
        return Err(CutlineError::NoPolygonsFormed);
    }
    let Some(crop) = crop else {
        return Ok(faces);
    };

    let total = faces.len();
    let kept: Vec<_> = faces.into_iter().filter(|p| crop.contains(p)).collect();
    log::debug!("{} of {total} regions inside crop area", kept.len());
    if kept.is_empty() {
        return Err(CutlineError::NoPolygonsInCrop);
    }
    Ok(kept)
}

/// Holes no larger than this fraction of their component are overlay noise.
const SLIVER_FRACTION: f64 = 1e-6;

/// Removes interior rings left behind where faces share an edge.
///
/// Faces of one noded graph meet exactly, but the floating point overlay can
/// still leave zero-width rings along slanted shared edges, most visibly far
/// from the origin. A ring is kept only when its area exceeds both the
/// snapping tolerance squared and [`SLIVER_FRACTION`] of the exterior.
fn drop_slivers(poly: Polygon<f64>) -> Polygon<f64> {
    if poly.interiors().is_empty() {
        return poly;
    }
    let magnitude = poly.bounding_rect().map_or(1.0, |r| {
        [r.min().x, r.min().y, r.max().x, r.max().y]
            .into_iter()
            .fold(1.0f64, |m, v| m.max(v.abs()))
    });
    let tolerance = 1e-9 * magnitude;

    let (exterior, interiors) = poly.into_inner();
    let outer = Polygon::new(exterior.clone(), Vec::new()).unsigned_area();
    let min_hole = (tolerance * tolerance).max(SLIVER_FRACTION * outer);

    let total = interiors.len();
    let holes: Vec<_> = interiors
        .into_iter()
        .filter(|ring| Polygon::new(ring.clone(), Vec::new()).unsigned_area() > min_hole)
        .collect();
    if holes.len() < total {
        log::debug!("dropped {} sliver holes", total - holes.len());
    }
    Polygon::new(exterior, holes)
}

/// Unions `regions` and returns the largest connected component with its
/// area.
///
/// Sliver holes from the overlay are removed; holes left by faces that were
/// filtered out remain. On exactly equal areas the component with the smaller
/// centroid x wins, then the smaller centroid y.
pub fn largest_component(regions: &[Polygon<f64>]) -> Option<(Polygon<f64>, f64)> {
    let merged = regions
        .iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(p));
    log::debug!(
        "merged {} regions into {} components",
        regions.len(),
        merged.0.len()
    );

    let centroid_key = |p: &Polygon<f64>| p.centroid().map_or((0.0, 0.0), |c| (c.x(), c.y()));
    merged
        .into_iter()
        .map(drop_slivers)
        .map(|p| {
            let area = p.unsigned_area();
            (p, area)
        })
        .reduce(|best, cand| {
            let better = cand.1 > best.1
                || (cand.1 == best.1 && {
                    let (cx, cy) = centroid_key(&cand.0);
                    let (bx, by) = centroid_key(&best.0);
                    cx.total_cmp(&bx).then(cy.total_cmp(&by)).is_lt()
                });
            if better { cand } else { best }
        })
}

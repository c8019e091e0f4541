//! Vector store: polygon layers as GeoJSON feature collections.

use std::fs;
use std::path::Path;

use geo::{BooleanOps, Contains, Coord, LineString, MultiPolygon, Polygon};
use serde_json::{Value, json};

use crate::{IoError, Result, ensure_parent_dir};

/// Polygonal features of one layer, in file order.
#[derive(Debug, Clone, Default)]
pub struct PolygonLayer {
    pub crs: Option<String>,
    pub features: Vec<MultiPolygon<f64>>,
}

/// Region restricting which polygonized cells may form the cutline.
///
/// Parts are dissolved on construction, so a cell straddling the shared edge
/// of two touching parts still counts as inside.
#[derive(Debug, Clone)]
pub struct CropArea {
    pub shape: MultiPolygon<f64>,
    pub crs: Option<String>,
}

impl CropArea {
    pub fn new(parts: Vec<Polygon<f64>>, crs: Option<String>) -> Self {
        let shape = match parts.len() {
            0 | 1 => MultiPolygon(parts),
            _ => parts
                .iter()
                .fold(MultiPolygon::new(Vec::new()), |acc, p| acc.union(p)),
        };
        Self { shape, crs }
    }

    pub fn is_empty(&self) -> bool {
        self.shape.0.is_empty()
    }

    /// True when the crop area as a whole contains `p`.
    pub fn contains(&self, p: &Polygon<f64>) -> bool {
        self.shape.contains(p)
    }
}

pub fn read_polygon_layer(path: &Path) -> Result<PolygonLayer> {
    let data = fs::read_to_string(path).map_err(|e| IoError::io(path, e))?;
    let root: Value = serde_json::from_str(&data).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |reason: &str| IoError::InvalidGeoJson {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    };

    let crs = root
        .pointer("/crs/properties/name")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let geometries: Vec<&Value> = match root.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => root
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("feature collection without a features array"))?
            .iter()
            .map(|f| f.get("geometry").unwrap_or(&Value::Null))
            .collect(),
        Some("Feature") => vec![root.get("geometry").unwrap_or(&Value::Null)],
        Some(_) => vec![&root],
        None => return Err(invalid("missing type member")),
    };

    let features = geometries
        .into_iter()
        .map(|g| {
            parse_polygonal(g).ok_or_else(|| invalid("feature is not a Polygon or MultiPolygon"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PolygonLayer { crs, features })
}

/// Reads a crop area from the first feature of a polygon layer. A layer
/// without features yields an empty area.
pub fn read_crop_area(path: &Path) -> Result<CropArea> {
    let layer = read_polygon_layer(path)?;
    let parts = layer
        .features
        .into_iter()
        .next()
        .map(|mp| mp.0)
        .unwrap_or_default();
    Ok(CropArea::new(parts, layer.crs))
}

/// Writes `polygon` as the only feature of a new layer, replacing any
/// existing file at `path`.
pub fn write_cutline(path: &Path, polygon: &Polygon<f64>, crs: Option<&str>) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|e| IoError::io(path, e))?;
    }
    ensure_parent_dir(path)?;

    let mut rings = vec![ring_coords(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_coords));

    let mut doc = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {},
            "geometry": { "type": "Polygon", "coordinates": rings },
        }],
    });
    if let Some(crs) = crs {
        doc["crs"] = json!({ "type": "name", "properties": { "name": crs } });
    }

    let text = serde_json::to_string(&doc).map_err(|source| IoError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(|e| IoError::io(path, e))
}

fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

fn parse_polygonal(geometry: &Value) -> Option<MultiPolygon<f64>> {
    let coords = geometry.get("coordinates")?;
    match geometry.get("type")?.as_str()? {
        "Polygon" => Some(MultiPolygon(vec![parse_polygon(coords)?])),
        "MultiPolygon" => coords
            .as_array()?
            .iter()
            .map(parse_polygon)
            .collect::<Option<Vec<_>>>()
            .map(MultiPolygon),
        _ => None,
    }
}

fn parse_polygon(rings: &Value) -> Option<Polygon<f64>> {
    let mut rings = rings
        .as_array()?
        .iter()
        .map(parse_ring)
        .collect::<Option<Vec<_>>>()?;
    if rings.is_empty() {
        return None;
    }
    let exterior = rings.remove(0);
    Some(Polygon::new(exterior, rings))
}

fn parse_ring(ring: &Value) -> Option<LineString<f64>> {
    ring.as_array()?
        .iter()
        .map(|p| {
            let p = p.as_array()?;
            Some(Coord {
                x: p.first()?.as_f64()?,
                y: p.get(1)?.as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

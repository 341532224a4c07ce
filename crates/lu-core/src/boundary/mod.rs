//! Boundary validation
//!
//! The drawing tool hands us raw GeoJSON. Only closed polygons with a real
//! interior are allowed through; everything else is rejected here so that no
//! remote call is ever spent on a geometry the services cannot measure.

mod ring;

use geo::{BoundingRect, LineString, Polygon, Rect};

pub use ring::MAX_RING_VERTICES;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("boundary is empty")]
    Empty,

    #[error("{0} geometries enclose no area")]
    NoArea(String),

    #[error("unsupported geometry type: {0}")]
    Unsupported(String),

    #[error("malformed GeoJSON: {0}")]
    Malformed(String),

    #[error("ring {ring} is not closed")]
    OpenRing { ring: usize },

    #[error("ring {ring} has {found} distinct vertices, at least 3 are required")]
    TooFewVertices { ring: usize, found: usize },

    #[error("ring {ring} position {position} is not a valid longitude/latitude pair")]
    InvalidCoordinate { ring: usize, position: usize },

    #[error("ring {ring} intersects itself")]
    SelfIntersecting { ring: usize },

    #[error("ring {ring} encloses zero area")]
    ZeroArea { ring: usize },

    #[error("ring {ring} has {found} vertices, at most {} are supported", MAX_RING_VERTICES)]
    TooManyVertices { ring: usize, found: usize },
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated, closed polygon in WGS84 longitude/latitude.
///
/// Keeps the positions exactly as drawn (altitudes and repeated points
/// included) for sending on, next to the cleaned polygon used for measuring.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    polygon: Polygon<f64>,
    geometry: Value,
}

impl Boundary {
    /// Distinct vertices on the exterior ring, not counting the closing point
    pub fn vertex_count(&self) -> usize {
        self.polygon.exterior().0.len().saturating_sub(1)
    }

    pub fn hole_count(&self) -> usize {
        self.polygon.interiors().len()
    }

    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.polygon.bounding_rect()
    }

    /// GeoJSON `Polygon` geometry with the coordinates as they were drawn
    pub fn to_geojson(&self) -> Value {
        self.geometry.clone()
    }
}

impl Serialize for Boundary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.geometry.serialize(serializer)
    }
}

/// Validate a raw GeoJSON geometry (or a Feature wrapping one).
pub fn validate(raw: &Value) -> Result<Boundary, ValidationError> {
    let geometry = unwrap_feature(raw)?;

    let kind = geometry
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::Malformed("missing geometry type".to_string()))?;

    match kind {
        "Polygon" => {}
        "Point" | "MultiPoint" | "LineString" | "MultiLineString" => {
            return Err(ValidationError::NoArea(kind.to_string()));
        }
        other => return Err(ValidationError::Unsupported(other.to_string())),
    }

    let rings = match geometry.get("coordinates") {
        None | Some(Value::Null) => return Err(ValidationError::Empty),
        Some(Value::Array(rings)) => rings,
        Some(_) => {
            return Err(ValidationError::Malformed(
                "polygon coordinates must be an array of rings".to_string(),
            ))
        }
    };

    if rings.is_empty() {
        return Err(ValidationError::Empty);
    }

    let mut parsed = Vec::with_capacity(rings.len());
    for (index, raw_ring) in rings.iter().enumerate() {
        let coords = ring::parse_ring(raw_ring, index)?;
        let closed = ring::check_ring(coords, index)?;
        parsed.push(LineString::from(closed));
    }

    let mut parsed = parsed.into_iter();
    let exterior = parsed.next().ok_or(ValidationError::Empty)?;

    Ok(Boundary {
        polygon: Polygon::new(exterior, parsed.collect()),
        geometry: json!({
            "type": "Polygon",
            "coordinates": rings,
        }),
    })
}

fn unwrap_feature(raw: &Value) -> Result<&Value, ValidationError> {
    match raw {
        Value::Null => Err(ValidationError::Empty),
        Value::Object(map) if map.is_empty() => Err(ValidationError::Empty),
        Value::Object(map) => match map.get("type").and_then(Value::as_str) {
            Some("Feature") => match map.get("geometry") {
                None | Some(Value::Null) => Err(ValidationError::Empty),
                Some(geometry) => Ok(geometry),
            },
            _ => Ok(raw),
        },
        _ => Err(ValidationError::Malformed(
            "expected a GeoJSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [81.62, 21.25], [81.63, 21.25], [81.63, 21.26], [81.62, 21.26], [81.62, 21.25]
            ]]
        })
    }

    #[test]
    fn test_accepts_square() {
        let boundary = validate(&square()).unwrap();
        assert_eq!(boundary.vertex_count(), 4);
        assert_eq!(boundary.hole_count(), 0);
    }

    #[test]
    fn test_accepts_drawn_rectangle_feature() {
        let feature = json!({
            "type": "Feature",
            "properties": {},
            "geometry": square(),
        });
        let boundary = validate(&feature).unwrap();
        assert_eq!(boundary.to_geojson(), square());
    }

    #[test]
    fn test_rejects_open_ring() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]
        });
        assert_eq!(validate(&raw), Err(ValidationError::OpenRing { ring: 0 }));
    }

    #[test]
    fn test_rejects_two_vertices() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(
            validate(&raw),
            Err(ValidationError::TooFewVertices { ring: 0, found: 2 })
        );
    }

    #[test]
    fn test_rejects_geometries_without_area() {
        let point = json!({ "type": "Point", "coordinates": [81.6, 21.2] });
        let line = json!({ "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] });
        assert_eq!(validate(&point), Err(ValidationError::NoArea("Point".into())));
        assert_eq!(validate(&line), Err(ValidationError::NoArea("LineString".into())));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert_eq!(validate(&Value::Null), Err(ValidationError::Empty));
        assert_eq!(validate(&json!({})), Err(ValidationError::Empty));
        let empty = json!({ "type": "Polygon", "coordinates": [] });
        assert_eq!(validate(&empty), Err(ValidationError::Empty));
        let no_geometry = json!({ "type": "Feature", "geometry": null });
        assert_eq!(validate(&no_geometry), Err(ValidationError::Empty));
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let raw = json!({ "type": "GeometryCollection", "geometries": [] });
        assert!(matches!(validate(&raw), Err(ValidationError::Unsupported(_))));
    }

    #[test]
    fn test_rejects_bowtie() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(
            validate(&raw),
            Err(ValidationError::SelfIntersecting { ring: 0 })
        );
    }

    #[test]
    fn test_rejects_collinear_ring() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [0.0, 0.0]]]
        });
        assert_eq!(validate(&raw), Err(ValidationError::ZeroArea { ring: 0 }));
    }

    #[test]
    fn test_rejects_out_of_range_coordinate() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [190.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        });
        assert_eq!(
            validate(&raw),
            Err(ValidationError::InvalidCoordinate { ring: 0, position: 1 })
        );
    }

    #[test]
    fn test_accepts_polygon_with_hole() {
        let raw = json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0], [0.0, 0.0]],
                [[1.0, 1.0], [2.0, 1.0], [2.0, 2.0], [1.0, 2.0], [1.0, 1.0]]
            ]
        });
        let boundary = validate(&raw).unwrap();
        assert_eq!(boundary.hole_count(), 1);
        assert_eq!(boundary.to_geojson(), raw);
    }

    #[test]
    fn test_drawn_coordinates_are_sent_unchanged() {
        let raw = json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [0.0, 0.0, 5.0], [1.0, 0.0, 5.0], [1.0, 0.0, 5.0], [1.0, 1.0, 5.0], [0.0, 0.0, 5.0]
                ]]
            }
        });
        let boundary = validate(&raw).unwrap();

        assert_eq!(boundary.vertex_count(), 3);
        assert_eq!(boundary.to_geojson(), raw["geometry"]);
        assert_eq!(serde_json::to_value(&boundary).unwrap(), raw["geometry"]);
    }

    #[test]
    fn test_rejects_oversized_ring() {
        let ring: Vec<Value> = (0..=MAX_RING_VERTICES)
            .map(|i| {
                let angle = i as f64 / (MAX_RING_VERTICES + 1) as f64 * std::f64::consts::TAU;
                json!([angle.cos(), angle.sin()])
            })
            .chain(std::iter::once(json!([1.0, 0.0])))
            .collect();
        let raw = json!({ "type": "Polygon", "coordinates": [ring] });

        assert_eq!(
            validate(&raw),
            Err(ValidationError::TooManyVertices {
                ring: 0,
                found: MAX_RING_VERTICES + 1
            })
        );
    }

    #[test]
    fn test_validation_error_serializes_as_message() {
        let json = serde_json::to_value(ValidationError::OpenRing { ring: 0 }).unwrap();
        assert_eq!(json, json!("ring 0 is not closed"));
    }
}

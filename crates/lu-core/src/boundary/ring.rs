//! Linear ring checks

use super::ValidationError;
use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line};
use serde_json::Value;

const COLLINEAR_TOLERANCE: f64 = 1e-12;

/// Upper bound on positions per ring; the simplicity check is quadratic.
pub const MAX_RING_VERTICES: usize = 5_000;

/// Parse one GeoJSON ring into coordinates, checking each position.
pub(super) fn parse_ring(raw: &Value, ring: usize) -> Result<Vec<Coord<f64>>, ValidationError> {
    let positions = raw.as_array().ok_or_else(|| {
        ValidationError::Malformed(format!("ring {} is not an array of positions", ring))
    })?;

    positions
        .iter()
        .enumerate()
        .map(|(position, value)| parse_position(value, ring, position))
        .collect()
}

fn parse_position(value: &Value, ring: usize, position: usize) -> Result<Coord<f64>, ValidationError> {
    let invalid = || ValidationError::InvalidCoordinate { ring, position };

    // Positions may carry an altitude as a third element; it is ignored.
    let pair = value.as_array().filter(|p| p.len() >= 2).ok_or_else(invalid)?;
    let lon = pair[0].as_f64().ok_or_else(invalid)?;
    let lat = pair[1].as_f64().ok_or_else(invalid)?;

    if !lon.is_finite() || !lat.is_finite() || !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(invalid());
    }

    Ok(Coord { x: lon, y: lat })
}

/// Check closure, vertex count, area and simplicity of a ring.
///
/// Returns the ring with consecutive duplicate points removed, still closed.
/// The caller keeps the positions as drawn for anything sent on.
pub(super) fn check_ring(coords: Vec<Coord<f64>>, ring: usize) -> Result<Vec<Coord<f64>>, ValidationError> {
    let (first, last) = match (coords.first(), coords.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(ValidationError::TooFewVertices { ring, found: 0 }),
    };

    if first != last {
        return Err(ValidationError::OpenRing { ring });
    }

    let found = coords.len() - 1;
    if found > MAX_RING_VERTICES {
        return Err(ValidationError::TooManyVertices { ring, found });
    }

    let mut closed = coords;
    closed.dedup();

    let vertices = &closed[..closed.len() - 1];
    let found = distinct_count(vertices);
    if found < 3 {
        return Err(ValidationError::TooFewVertices { ring, found });
    }

    if all_collinear(vertices) {
        return Err(ValidationError::ZeroArea { ring });
    }

    if self_intersects(&closed) {
        return Err(ValidationError::SelfIntersecting { ring });
    }

    Ok(closed)
}

fn distinct_count(vertices: &[Coord<f64>]) -> usize {
    let mut seen: Vec<Coord<f64>> = Vec::with_capacity(vertices.len());
    for vertex in vertices {
        if !seen.contains(vertex) {
            seen.push(*vertex);
        }
    }
    seen.len()
}

fn all_collinear(vertices: &[Coord<f64>]) -> bool {
    let origin = vertices[0];
    let Some(&pivot) = vertices.iter().find(|v| **v != origin) else {
        return true;
    };

    let u = pivot - origin;
    vertices.iter().all(|&vertex| {
        let v = vertex - origin;
        let cross = u.x * v.y - u.y * v.x;
        let scale = (u.x.hypot(u.y) * v.x.hypot(v.y)).max(f64::MIN_POSITIVE);
        cross.abs() <= COLLINEAR_TOLERANCE * scale
    })
}

/// Pairwise segment test: non-adjacent edges must not meet at all, adjacent
/// edges may only share their common vertex.
fn self_intersects(closed: &[Coord<f64>]) -> bool {
    let edges: Vec<Line<f64>> = closed.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = edges.len();

    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if !adjacent => return true,
                Some(LineIntersection::SinglePoint { .. }) => {}
            }
        }
    }

    false
}

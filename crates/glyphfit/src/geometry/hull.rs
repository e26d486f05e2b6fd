use serde::{Deserialize, Serialize};

use super::{cross, polygon_centroid, signed_area, GeometryError};

/// Convex hull with vertices in counter-clockwise order (positive shoelace
/// area; this reads clockwise on a y-down display). The first vertex is the
/// lexicographically smallest `(x, y)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexHull {
    pub vertices: Vec<[f64; 2]>,
}

impl ConvexHull {
    pub fn area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    pub fn perimeter(&self) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| {
                let p = self.vertices[i];
                let q = self.vertices[(i + 1) % n];
                (q[0] - p[0]).hypot(q[1] - p[1])
            })
            .sum()
    }

    /// Area centroid.
    pub fn centroid(&self) -> [f64; 2] {
        polygon_centroid(&self.vertices)
    }

    /// Vertical extent of the hull.
    pub fn height(&self) -> f64 {
        let (lo, hi) = self
            .vertices
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p[1]), hi.max(p[1]))
            });
        hi - lo
    }

    /// Distance from `p` to the nearest hull edge.
    pub fn distance_to_boundary(&self, p: [f64; 2]) -> f64 {
        let n = self.vertices.len();
        (0..n)
            .map(|i| segment_distance(p, self.vertices[i], self.vertices[(i + 1) % n]))
            .fold(f64::INFINITY, f64::min)
    }
}

fn segment_distance(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (ux, uy) = (b[0] - a[0], b[1] - a[1]);
    let len2 = ux * ux + uy * uy;
    let t = if len2 > 0.0 {
        (((p[0] - a[0]) * ux + (p[1] - a[1]) * uy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (p[0] - a[0] - t * ux).hypot(p[1] - a[1] - t * uy)
}

/// Andrew's monotone chain. Collinear points on hull edges are dropped.
pub fn convex_hull(points: &[[f64; 2]]) -> Result<ConvexHull, GeometryError> {
    if points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
        return Err(GeometryError::NonFinite);
    }
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
    pts.dedup();
    let distinct = pts.len();
    if distinct < 3 {
        return Err(GeometryError::TooFewPoints { distinct });
    }

    let mut lower: Vec<[f64; 2]> = Vec::with_capacity(distinct);
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<[f64; 2]> = Vec::with_capacity(distinct);
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        return Err(GeometryError::Collinear { distinct });
    }
    Ok(ConvexHull { vertices: lower })
}

/// Contour points lying on the hull boundary within `tol`, in contour order.
///
/// For a glyph with a gap this keeps the outer silhouette and drops the
/// inner edge visible through the opening.
pub fn silhouette(contour: &[[f64; 2]], hull: &ConvexHull, tol: f64) -> Vec<[f64; 2]> {
    contour
        .iter()
        .copied()
        .filter(|&p| hull.distance_to_boundary(p) <= tol)
        .collect()
}

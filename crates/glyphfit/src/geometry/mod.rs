//! Planar geometry for glyph contours.
//!
//! - [`convex_hull`]: monotone-chain hull, counter-clockwise.
//! - [`AxisEllipse`]: axis-aligned ellipse with exact nearest-point distance.
//! - [`fit_ellipse`]: geometric least-squares fit over `(cx, cy, semi_x, semi_y)`.
//! - [`fit_quality`], [`fit_quality_on`]: policy-free quality metrics of a fit.
//!
//! All functions are pure; inputs are document-space points.

mod ellipse;
mod fit;
mod hull;
mod optimizer;
mod quality;

pub use ellipse::AxisEllipse;
pub use fit::{fit_ellipse, EllipseFit, FitConfig};
pub use hull::{convex_hull, silhouette, ConvexHull};
pub use quality::{fit_quality, fit_quality_on, FitMetrics};

// ── Error type ─────────────────────────────────────────────────────────────

/// Input that cannot support a hull or a fit.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Fewer than three distinct points.
    TooFewPoints { distinct: usize },
    /// All points lie on one line.
    Collinear { distinct: usize },
    /// A coordinate is NaN or infinite.
    NonFinite,
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints { distinct } => {
                write!(f, "need at least 3 distinct points, got {}", distinct)
            }
            Self::Collinear { distinct } => write!(f, "all {} distinct points are collinear", distinct),
            Self::NonFinite => write!(f, "non-finite coordinate in input"),
        }
    }
}

impl std::error::Error for GeometryError {}

// ── Polygon helpers ────────────────────────────────────────────────────────

/// Twice the z-component of `(a - o) × (b - o)`.
#[inline]
pub(crate) fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Signed shoelace area; positive for counter-clockwise vertex order.
pub(crate) fn signed_area(poly: &[[f64; 2]]) -> f64 {
    let n = poly.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        acc += p[0] * q[1] - q[0] * p[1];
    }
    0.5 * acc
}

/// Area centroid of a simple polygon, falling back to the vertex mean for
/// zero-area input.
pub(crate) fn polygon_centroid(poly: &[[f64; 2]]) -> [f64; 2] {
    let a = signed_area(poly);
    let n = poly.len();
    if a.abs() < f64::EPSILON || n < 3 {
        return mean_point(poly);
    }
    let (mut cx, mut cy) = (0.0, 0.0);
    for i in 0..n {
        let p = poly[i];
        let q = poly[(i + 1) % n];
        let w = p[0] * q[1] - q[0] * p[1];
        cx += (p[0] + q[0]) * w;
        cy += (p[1] + q[1]) * w;
    }
    [cx / (6.0 * a), cy / (6.0 * a)]
}

pub(crate) fn mean_point(points: &[[f64; 2]]) -> [f64; 2] {
    if points.is_empty() {
        return [0.0, 0.0];
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    [sx / n, sy / n]
}

/// `[min_x, min_y, max_x, max_y]` of a non-empty point set.
pub(crate) fn bounding_box(points: &[[f64; 2]]) -> [f64; 4] {
    points.iter().fold(
        [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
        |b, p| [b[0].min(p[0]), b[1].min(p[1]), b[2].max(p[0]), b[3].max(p[1])],
    )
}

/// Sutherland–Hodgman clip of `subject` against the convex counter-clockwise
/// polygon `clip`.
pub(crate) fn clip_convex(subject: &[[f64; 2]], clip: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut output = subject.to_vec();
    let m = clip.len();
    for i in 0..m {
        if output.is_empty() {
            break;
        }
        let a = clip[i];
        let b = clip[(i + 1) % m];
        let input = std::mem::take(&mut output);
        let n = input.len();
        for j in 0..n {
            let cur = input[j];
            let prev = input[(j + n - 1) % n];
            let cur_in = cross(a, b, cur) >= 0.0;
            let prev_in = cross(a, b, prev) >= 0.0;
            if cur_in {
                if !prev_in {
                    output.push(intersect(prev, cur, a, b));
                }
                output.push(cur);
            } else if prev_in {
                output.push(intersect(prev, cur, a, b));
            }
        }
    }
    output
}

/// Intersection of segment `p→q` with the infinite line through `a→b`.
fn intersect(p: [f64; 2], q: [f64; 2], a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    let cp = cross(a, b, p);
    let cq = cross(a, b, q);
    let denom = cp - cq;
    if denom.abs() < f64::MIN_POSITIVE {
        return q;
    }
    let t = cp / denom;
    [p[0] + t * (q[0] - p[0]), p[1] + t * (q[1] - p[1])]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SQUARE: [[f64; 2]; 4] = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];

    #[test]
    fn area_and_centroid_of_square() {
        assert_relative_eq!(signed_area(&SQUARE), 4.0);
        let rev: Vec<_> = SQUARE.iter().rev().copied().collect();
        assert_relative_eq!(signed_area(&rev), -4.0);
        assert_eq!(polygon_centroid(&SQUARE), [1.0, 1.0]);
        assert_eq!(bounding_box(&SQUARE), [0.0, 0.0, 2.0, 2.0]);
    }

    #[test]
    fn clipping_overlapping_squares() {
        let shifted: Vec<_> = SQUARE.iter().map(|p| [p[0] + 1.0, p[1] + 1.0]).collect();
        let clipped = clip_convex(&SQUARE, &shifted);
        assert_relative_eq!(signed_area(&clipped), 1.0, epsilon = 1e-12);

        let far: Vec<_> = SQUARE.iter().map(|p| [p[0] + 10.0, p[1]]).collect();
        assert!(signed_area(&clip_convex(&SQUARE, &far)).abs() < 1e-12);
    }
}

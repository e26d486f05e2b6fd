use serde::{Deserialize, Serialize};

use super::ellipse::AxisEllipse;
use super::hull::ConvexHull;
use super::{bounding_box, clip_convex, signed_area};

/// Vertices of the polygon standing in for the ellipse in the coverage
/// computation.
const ELLIPSE_POLYGON_VERTICES: usize = 720;

/// Policy-free quality metrics of an ellipse fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    /// Distance between fit center and the hull area centroid over glyph
    /// height. This is the offset the acceptance policy checks.
    pub center_offset: f64,
    /// Distance between fit center and the mean of all contour points over
    /// glyph height. Sparse or one-sided contours pull this away from the
    /// shape's center, so it is reported but not thresholded.
    pub contour_center_offset: f64,
    /// Mean distance from the boundary point set to the fit, over the fit's
    /// mean radius.
    pub mean_boundary: f64,
    /// Max distance from the boundary point set to the fit, over the fit's
    /// mean radius.
    pub max_boundary: f64,
    /// Area of hull ∩ ellipse over hull area.
    pub hull_coverage: f64,
    /// Vertical over horizontal semi-axis.
    pub aspect_ratio: f64,
    /// Vertical extent of the contour.
    pub glyph_height: f64,
    /// `(semi_x + semi_y) / 2` of the fit.
    pub mean_radius: f64,
}

/// Quality of `fit` against `contour` and its `hull`, with boundary
/// distances taken over every contour point.
///
/// A degenerate ellipse yields infinite boundary distances and zero coverage
/// instead of an error.
pub fn fit_quality(contour: &[[f64; 2]], hull: &ConvexHull, fit: &AxisEllipse) -> FitMetrics {
    fit_quality_on(contour, contour, hull, fit)
}

/// Like [`fit_quality`], but boundary distances are measured from
/// `boundary_points` (for example the silhouette of an open glyph) while
/// glyph height and the contour centroid still come from `contour`.
pub fn fit_quality_on(
    contour: &[[f64; 2]],
    boundary_points: &[[f64; 2]],
    hull: &ConvexHull,
    fit: &AxisEllipse,
) -> FitMetrics {
    let glyph_height = if contour.is_empty() {
        hull.height()
    } else {
        let b = bounding_box(contour);
        b[3] - b[1]
    };
    let relative = |c: [f64; 2]| {
        if glyph_height > 0.0 {
            (fit.cx - c[0]).hypot(fit.cy - c[1]) / glyph_height
        } else {
            f64::INFINITY
        }
    };
    let center_offset = relative(hull.centroid());
    let contour_center_offset = if contour.is_empty() {
        center_offset
    } else {
        relative(vertex_mean(contour))
    };

    if !fit.is_valid() {
        return FitMetrics {
            center_offset,
            contour_center_offset,
            mean_boundary: f64::INFINITY,
            max_boundary: f64::INFINITY,
            hull_coverage: 0.0,
            aspect_ratio: f64::INFINITY,
            glyph_height,
            mean_radius: fit.mean_radius(),
        };
    }

    let mean_radius = fit.mean_radius();
    let points = if !boundary_points.is_empty() {
        boundary_points
    } else if !contour.is_empty() {
        contour
    } else {
        hull.vertices.as_slice()
    };
    let (sum, max) = points.iter().fold((0.0, 0.0f64), |(s, m), &p| {
        let d = fit.distance(p);
        (s + d, m.max(d))
    });
    let mean = sum / points.len().max(1) as f64;

    let hull_area = hull.area();
    let hull_coverage = if hull_area > 0.0 {
        let ellipse_poly = fit.sample_points(ELLIPSE_POLYGON_VERTICES);
        let inter = clip_convex(&hull.vertices, &ellipse_poly);
        (signed_area(&inter) / hull_area).clamp(0.0, 1.0)
    } else {
        0.0
    };

    FitMetrics {
        center_offset,
        contour_center_offset,
        mean_boundary: mean / mean_radius,
        max_boundary: max / mean_radius,
        hull_coverage,
        aspect_ratio: fit.aspect_ratio(),
        glyph_height,
        mean_radius,
    }
}

fn vertex_mean(points: &[[f64; 2]]) -> [f64; 2] {
    let n = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p[0], sy + p[1]));
    [sx / n, sy / n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::convex_hull;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_fit_scores_ideal() {
        let e = AxisEllipse::new(20.0, 30.0, 8.0, 11.0);
        let contour = e.sample_points(720);
        let hull = convex_hull(&contour).unwrap();
        let m = fit_quality(&contour, &hull, &e);
        assert!(m.center_offset < 1e-6);
        assert!(m.contour_center_offset < 1e-6);
        assert!(m.mean_boundary < 1e-9);
        assert!(m.max_boundary < 1e-9);
        assert_relative_eq!(m.hull_coverage, 1.0, epsilon = 1e-3);
        assert_relative_eq!(m.aspect_ratio, 11.0 / 8.0);
        assert_relative_eq!(m.glyph_height, 22.0, epsilon = 1e-9);
    }

    #[test]
    fn shifted_fit_is_penalized() {
        let truth = AxisEllipse::new(0.0, 0.0, 10.0, 10.0);
        let contour = truth.sample_points(360);
        let hull = convex_hull(&contour).unwrap();
        let shifted = AxisEllipse::new(3.0, 0.0, 10.0, 10.0);
        let m = fit_quality(&contour, &hull, &shifted);
        assert_relative_eq!(m.center_offset, 0.15, epsilon = 1e-3);
        assert!(m.max_boundary > 0.25);
        assert!(m.hull_coverage < 0.85);
    }

    #[test]
    fn one_sided_contour_moves_only_the_contour_centroid() {
        let e = AxisEllipse::new(0.0, 0.0, 5.0, 5.0);
        // Dense on the left half, sparse on the right.
        let mut contour: Vec<[f64; 2]> = (0..=180)
            .map(|i| e.point_at(std::f64::consts::FRAC_PI_2 + (i as f64).to_radians()))
            .collect();
        contour.extend(
            (1..18).map(|i| e.point_at(-std::f64::consts::FRAC_PI_2 + ((10 * i) as f64).to_radians())),
        );
        let hull = convex_hull(&contour).unwrap();
        let m = fit_quality(&contour, &hull, &e);
        assert!(m.center_offset < 0.01, "{}", m.center_offset);
        assert!(m.contour_center_offset > 0.1, "{}", m.contour_center_offset);
        assert!(m.mean_boundary < 1e-9);
    }

    #[test]
    fn boundary_metrics_follow_the_boundary_point_set() {
        let e = AxisEllipse::new(0.0, 0.0, 10.0, 10.0);
        let mut contour = e.sample_points(360);
        // Inner edge seen through a gap: far from the outer boundary.
        let inner = AxisEllipse::new(0.0, 0.0, 7.0, 7.0).sample_points(90);
        contour.extend(inner);
        let outer = e.sample_points(360);
        let hull = convex_hull(&contour).unwrap();

        let all = fit_quality(&contour, &hull, &e);
        let outer_only = fit_quality_on(&contour, &outer, &hull, &e);
        assert!(all.max_boundary > 0.25);
        assert!(outer_only.max_boundary < 1e-9);
        assert_relative_eq!(all.glyph_height, outer_only.glyph_height);
        assert_relative_eq!(all.contour_center_offset, outer_only.contour_center_offset);
    }

    #[test]
    fn degenerate_ellipse_gives_worst_scores() {
        let contour = [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]];
        let hull = convex_hull(&contour).unwrap();
        let m = fit_quality(&contour, &hull, &AxisEllipse::new(2.0, 2.0, 0.0, 2.0));
        assert_eq!(m.hull_coverage, 0.0);
        assert!(m.mean_boundary.is_infinite());
        assert_relative_eq!(m.center_offset, 0.0);
    }
}

//! Geometric least-squares fit of an axis-aligned ellipse.
//!
//! The objective is the mean squared Euclidean distance from each point to
//! its nearest point on the ellipse boundary (computed exactly, see
//! [`AxisEllipse::nearest_point`]). Nelder–Mead refines the bounding-box
//! initialization; the best simplex vertex is restarted a few times to
//! escape premature collapse.

use nalgebra::Vector4;
use serde::{Deserialize, Serialize};

use super::ellipse::AxisEllipse;
use super::hull::convex_hull;
use super::optimizer::{nelder_mead, NelderMeadOptions};
use super::{bounding_box, GeometryError};
use crate::document::ShapeKind;

/// Optimizer settings for [`fit_ellipse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Nelder–Mead iteration cap per run.
    pub max_iters: usize,
    /// Extra runs restarted from the best point.
    pub restarts: usize,
    /// Objective spread tolerance, relative to the squared initial size.
    pub f_tol: f64,
    /// Simplex diameter tolerance, relative to the initial size.
    pub x_tol: f64,
    /// Point budget; larger inputs are subsampled with a fixed stride.
    pub max_points: usize,
    /// Initial simplex edge as a fraction of the initial size.
    pub initial_step_frac: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iters: 4000,
            restarts: 2,
            f_tol: 1e-12,
            x_tol: 1e-9,
            max_points: 720,
            initial_step_frac: 0.05,
        }
    }
}

/// Result of [`fit_ellipse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseFit {
    pub ellipse: AxisEllipse,
    /// False when the iteration cap was hit; `ellipse` is then the best
    /// parameters found.
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    /// Root mean squared point-to-boundary distance over the fit point set.
    pub rms_residual: f64,
    /// Number of points the objective was evaluated on.
    pub n_points: usize,
    pub shape: ShapeKind,
}

fn objective(points: &[[f64; 2]], v: &Vector4<f64>, min_axis: f64) -> f64 {
    if !v.iter().all(|x| x.is_finite()) || v[2] < min_axis || v[3] < min_axis {
        return f64::MAX;
    }
    let e = AxisEllipse::new(v[0], v[1], v[2], v[3]);
    let sum: f64 = points
        .iter()
        .map(|&p| {
            let d = e.distance(p);
            d * d
        })
        .sum();
    sum / points.len() as f64
}

fn subsample(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if max_points == 0 || points.len() <= max_points {
        return points.to_vec();
    }
    let stride = points.len().div_ceil(max_points);
    points.iter().step_by(stride).copied().collect()
}

/// Fit an axis-aligned ellipse to `points`.
///
/// `Closed` shapes are fit against the points as given; `Open` shapes are
/// fit against the vertices of their convex hull so the gap does not pull
/// the center toward the open side.
pub fn fit_ellipse(
    points: &[[f64; 2]],
    shape: ShapeKind,
    cfg: &FitConfig,
) -> Result<EllipseFit, GeometryError> {
    let hull = convex_hull(points)?;
    let fit_points = match shape {
        ShapeKind::Closed => subsample(points, cfg.max_points),
        ShapeKind::Open => subsample(&hull.vertices, cfg.max_points),
    };

    let [x0, y0, x1, y1] = bounding_box(&fit_points);
    let init = Vector4::new(
        0.5 * (x0 + x1),
        0.5 * (y0 + y1),
        0.5 * (x1 - x0),
        0.5 * (y1 - y0),
    );
    let size = init[2].max(init[3]);
    if size <= 0.0 {
        return Err(GeometryError::Collinear {
            distinct: fit_points.len(),
        });
    }

    let opts = NelderMeadOptions {
        max_iters: cfg.max_iters,
        f_tol: cfg.f_tol * size * size,
        x_tol: cfg.x_tol * size,
    };
    let min_axis = 1e-9 * size;
    let step = cfg.initial_step_frac * size;

    let mut x = init;
    let mut f = objective(&fit_points, &x, min_axis);
    let mut iterations = 0;
    let mut evaluations = 1;
    let mut converged = false;
    for run in 0..=cfg.restarts {
        let r = nelder_mead(|v| objective(&fit_points, v, min_axis), x, step, opts);
        iterations += r.iterations;
        evaluations += r.evaluations;
        converged = r.converged;
        let improvement = f - r.f;
        if r.f <= f {
            x = r.x;
            f = r.f;
        }
        tracing::trace!(run, f = r.f, iterations = r.iterations, converged = r.converged, "ellipse fit run");
        if run > 0 && converged && improvement <= opts.f_tol {
            break;
        }
    }

    Ok(EllipseFit {
        ellipse: AxisEllipse::new(x[0], x[1], x[2], x[3]),
        converged,
        iterations,
        evaluations,
        rms_residual: f.sqrt(),
        n_points: fit_points.len(),
        shape,
    })
}

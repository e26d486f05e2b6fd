//! Derivative-free Nelder–Mead minimizer over fixed-size parameter vectors.

use nalgebra::SVector;

#[derive(Debug, Clone, Copy)]
pub(crate) struct NelderMeadOptions {
    pub max_iters: usize,
    /// Absolute spread of objective values across the simplex.
    pub f_tol: f64,
    /// Absolute simplex diameter (max-norm).
    pub x_tol: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct NelderMeadResult<const N: usize> {
    pub x: SVector<f64, N>,
    pub f: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub converged: bool,
}

const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

/// Minimize `f` starting from an axis-aligned simplex of edge `step`
/// around `x0`.
pub(crate) fn nelder_mead<const N: usize, F>(
    mut f: F,
    x0: SVector<f64, N>,
    step: f64,
    opts: NelderMeadOptions,
) -> NelderMeadResult<N>
where
    F: FnMut(&SVector<f64, N>) -> f64,
{
    let mut simplex: Vec<(SVector<f64, N>, f64)> = Vec::with_capacity(N + 1);
    simplex.push((x0, f(&x0)));
    for i in 0..N {
        let mut x = x0;
        x[i] += step;
        let fx = f(&x);
        simplex.push((x, fx));
    }
    let mut evaluations = N + 1;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < opts.max_iters {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[N].1;
        let diameter = simplex[1..]
            .iter()
            .map(|(x, _)| (x - simplex[0].0).amax())
            .fold(0.0, f64::max);
        if (worst - best) <= opts.f_tol && diameter <= opts.x_tol {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = simplex[..N]
            .iter()
            .fold(SVector::<f64, N>::zeros(), |acc, (x, _)| acc + x)
            / N as f64;
        let xw = simplex[N].0;

        let xr = centroid + (centroid - xw) * ALPHA;
        let fr = f(&xr);
        evaluations += 1;

        if fr < best {
            let xe = centroid + (xr - centroid) * GAMMA;
            let fe = f(&xe);
            evaluations += 1;
            simplex[N] = if fe < fr { (xe, fe) } else { (xr, fr) };
            continue;
        }
        if fr < simplex[N - 1].1 {
            simplex[N] = (xr, fr);
            continue;
        }

        let (xc, fc, accept) = if fr < worst {
            let xc = centroid + (xr - centroid) * RHO;
            let fc = f(&xc);
            (xc, fc, fc <= fr)
        } else {
            let xc = centroid + (xw - centroid) * RHO;
            let fc = f(&xc);
            (xc, fc, fc < worst)
        };
        evaluations += 1;
        if accept {
            simplex[N] = (xc, fc);
            continue;
        }

        let x_best = simplex[0].0;
        for entry in simplex.iter_mut().skip(1) {
            let x = x_best + (entry.0 - x_best) * SIGMA;
            entry.1 = f(&x);
            entry.0 = x;
            evaluations += 1;
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, fx) = simplex[0];
    NelderMeadResult {
        x,
        f: fx,
        iterations,
        evaluations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;

    #[test]
    fn minimizes_rosenbrock() {
        let opts = NelderMeadOptions {
            max_iters: 5000,
            f_tol: 1e-16,
            x_tol: 1e-9,
        };
        let r = nelder_mead(
            |v: &Vector2<f64>| (1.0 - v[0]).powi(2) + 100.0 * (v[1] - v[0] * v[0]).powi(2),
            Vector2::new(-1.2, 1.0),
            0.1,
            opts,
        );
        assert!(r.converged);
        assert_relative_eq!(r.x[0], 1.0, epsilon = 1e-5);
        assert_relative_eq!(r.x[1], 1.0, epsilon = 1e-5);
        assert!(r.evaluations > r.iterations);
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let opts = NelderMeadOptions {
            max_iters: 3,
            f_tol: 0.0,
            x_tol: 0.0,
        };
        let r = nelder_mead(
            |v: &Vector2<f64>| v.norm_squared(),
            Vector2::new(5.0, 5.0),
            1.0,
            opts,
        );
        assert!(!r.converged);
        assert_eq!(r.iterations, 3);
        assert!(r.f < 50.0);
    }
}

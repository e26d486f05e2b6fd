use serde::{Deserialize, Serialize};

/// Bisection cap for the nearest-point root search.
const ROOT_MAX_ITERS: usize = 200;

/// Axis-aligned ellipse.
///
/// `semi_y` is the vertical semi-axis (the major axis of an upright glyph),
/// `semi_x` the horizontal one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisEllipse {
    pub cx: f64,
    pub cy: f64,
    pub semi_x: f64,
    pub semi_y: f64,
}

impl AxisEllipse {
    pub fn new(cx: f64, cy: f64, semi_x: f64, semi_y: f64) -> Self {
        Self {
            cx,
            cy,
            semi_x,
            semi_y,
        }
    }

    /// Finite parameters with strictly positive semi-axes.
    pub fn is_valid(&self) -> bool {
        [self.cx, self.cy, self.semi_x, self.semi_y]
            .iter()
            .all(|v| v.is_finite())
            && self.semi_x > 0.0
            && self.semi_y > 0.0
    }

    pub fn center(&self) -> [f64; 2] {
        [self.cx, self.cy]
    }

    /// Vertical over horizontal semi-axis.
    pub fn aspect_ratio(&self) -> f64 {
        self.semi_y / self.semi_x
    }

    pub fn mean_radius(&self) -> f64 {
        0.5 * (self.semi_x + self.semi_y)
    }

    pub fn area(&self) -> f64 {
        std::f64::consts::PI * self.semi_x * self.semi_y
    }

    pub fn eccentricity(&self) -> f64 {
        let (a, b) = if self.semi_x >= self.semi_y {
            (self.semi_x, self.semi_y)
        } else {
            (self.semi_y, self.semi_x)
        };
        (1.0 - (b * b) / (a * a)).max(0.0).sqrt()
    }

    /// Point at parameter `t` (radians), counter-clockwise in coordinate values.
    pub fn point_at(&self, t: f64) -> [f64; 2] {
        [
            self.cx + self.semi_x * t.cos(),
            self.cy + self.semi_y * t.sin(),
        ]
    }

    /// `n` points evenly spaced in parameter angle.
    pub fn sample_points(&self, n: usize) -> Vec<[f64; 2]> {
        (0..n)
            .map(|i| self.point_at(2.0 * std::f64::consts::PI * i as f64 / n as f64))
            .collect()
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        let u = (p[0] - self.cx) / self.semi_x;
        let v = (p[1] - self.cy) / self.semi_y;
        u * u + v * v <= 1.0
    }

    /// Euclidean distance from `p` to the ellipse boundary.
    pub fn distance(&self, p: [f64; 2]) -> f64 {
        let q = self.nearest_point(p);
        (p[0] - q[0]).hypot(p[1] - q[1])
    }

    /// Nearest point on the boundary, found by the robust bisection scheme
    /// of Eberly ("Distance from a point to an ellipse").
    pub fn nearest_point(&self, p: [f64; 2]) -> [f64; 2] {
        let dx = p[0] - self.cx;
        let dy = p[1] - self.cy;
        let (ax, ay) = (self.semi_x.abs(), self.semi_y.abs());

        // Reduce to the first quadrant with the larger axis first.
        let swap = ay > ax;
        let (e0, e1, y0, y1) = if swap {
            (ay, ax, dy.abs(), dx.abs())
        } else {
            (ax, ay, dx.abs(), dy.abs())
        };
        let (x0, x1) = nearest_first_quadrant(e0, e1, y0, y1);
        let (qx, qy) = if swap { (x1, x0) } else { (x0, x1) };
        [
            self.cx + qx.copysign(dx),
            self.cy + qy.copysign(dy),
        ]
    }
}

/// Nearest boundary point for `e0 >= e1 > 0` and a query `(y0, y1)` in the
/// closed first quadrant.
fn nearest_first_quadrant(e0: f64, e1: f64, y0: f64, y1: f64) -> (f64, f64) {
    if e1 <= 0.0 {
        return (y0.min(e0), 0.0);
    }
    if y1 > 0.0 {
        if y0 > 0.0 {
            let z0 = y0 / e0;
            let z1 = y1 / e1;
            let g = z0 * z0 + z1 * z1 - 1.0;
            if g == 0.0 {
                return (y0, y1);
            }
            let r0 = (e0 / e1) * (e0 / e1);
            let s = root(r0, z0, z1, g);
            (r0 * y0 / (s + r0), y1 / (s + 1.0))
        } else {
            (0.0, e1)
        }
    } else {
        let numer = e0 * y0;
        let denom = e0 * e0 - e1 * e1;
        if numer < denom {
            let xde0 = numer / denom;
            (e0 * xde0, e1 * (1.0 - xde0 * xde0).max(0.0).sqrt())
        } else {
            (e0, 0.0)
        }
    }
}

fn root(r0: f64, z0: f64, z1: f64, g: f64) -> f64 {
    let n0 = r0 * z0;
    let mut s0 = z1 - 1.0;
    let mut s1 = if g < 0.0 { 0.0 } else { n0.hypot(z1) - 1.0 };
    let mut s = 0.0;
    for _ in 0..ROOT_MAX_ITERS {
        s = 0.5 * (s0 + s1);
        if s == s0 || s == s1 || (s1 - s0) <= 1e-15 * (1.0 + s.abs()) {
            break;
        }
        let ratio0 = n0 / (s + r0);
        let ratio1 = z1 / (s + 1.0);
        let g = ratio0 * ratio0 + ratio1 * ratio1 - 1.0;
        if g > 0.0 {
            s0 = s;
        } else if g < 0.0 {
            s1 = s;
        } else {
            break;
        }
    }
    s
}

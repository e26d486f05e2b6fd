use serde::{Deserialize, Serialize};

/// Axis-aligned affine map `p' = (sx·x + tx, sy·y + ty)`.
///
/// Group transforms are folded into this form for nominal layout. Rotations
/// and skews cannot be expressed and are reported as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisAffine {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AxisAffine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AxisAffine {
    pub const IDENTITY: Self = Self {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [self.sx * p[0] + self.tx, self.sy * p[1] + self.ty]
    }

    /// `self ∘ inner`: apply `inner` first.
    pub fn then_inner(&self, inner: &Self) -> Self {
        Self {
            sx: self.sx * inner.sx,
            sy: self.sy * inner.sy,
            tx: self.sx * inner.tx + self.tx,
            ty: self.sy * inner.ty + self.ty,
        }
    }

    /// Parse an SVG `transform` list. Returns `None` when the list contains
    /// a rotation, a skew or a matrix with shear terms.
    pub fn parse(list: &str) -> Option<Self> {
        let mut acc = Self::IDENTITY;
        let mut rest = list.trim();
        while !rest.is_empty() {
            let open = rest.find('(')?;
            let close = rest.find(')')?;
            if close < open {
                return None;
            }
            let name = rest[..open].trim().trim_start_matches(',').trim();
            let args: Vec<f64> = rest[open + 1..close]
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<f64>().ok())
                .collect::<Option<_>>()?;
            let step = match (name, args.as_slice()) {
                ("translate", [tx]) => Self { tx: *tx, ..Self::IDENTITY },
                ("translate", [tx, ty]) => Self {
                    tx: *tx,
                    ty: *ty,
                    ..Self::IDENTITY
                },
                ("scale", [s]) => Self {
                    sx: *s,
                    sy: *s,
                    ..Self::IDENTITY
                },
                ("scale", [sx, sy]) => Self {
                    sx: *sx,
                    sy: *sy,
                    ..Self::IDENTITY
                },
                ("matrix", [a, b, c, d, e, f]) if *b == 0.0 && *c == 0.0 => Self {
                    sx: *a,
                    sy: *d,
                    tx: *e,
                    ty: *f,
                },
                ("rotate", [angle]) | ("rotate", [angle, _, _]) if *angle == 0.0 => Self::IDENTITY,
                _ => return None,
            };
            acc = acc.then_inner(&step);
            rest = rest[close + 1..].trim();
        }
        Some(acc)
    }
}

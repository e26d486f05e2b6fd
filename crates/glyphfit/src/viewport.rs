//! Document ↔ raster coordinate mapping.
//!
//! A [`Viewport`] is read from the root element (`width`, `height`,
//! `viewBox`, `preserveAspectRatio`). Given the raster size chosen for a
//! zoom factor, [`ViewportTransform`] maps root user space to pixel space and
//! back. Both directions are exact inverses of the same axis-aligned affine
//! map, so a contour traced in pixels lands where the renderer drew it.

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentError};

/// Alignment along one axis for `preserveAspectRatio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Min,
    Mid,
    Max,
}

impl Align {
    fn factor(self) -> f64 {
        match self {
            Self::Min => 0.0,
            Self::Mid => 0.5,
            Self::Max => 1.0,
        }
    }
}

/// Parsed `preserveAspectRatio`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    /// `(x, y)` alignment; `None` stretches non-uniformly.
    pub align: Option<(Align, Align)>,
    pub slice: bool,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            align: Some((Align::Mid, Align::Mid)),
            slice: false,
        }
    }
}

impl AspectRatio {
    pub fn parse(s: &str) -> Self {
        let mut parts = s.split_whitespace();
        let mut first = parts.next().unwrap_or("xMidYMid");
        if first == "defer" {
            first = parts.next().unwrap_or("xMidYMid");
        }
        let slice = parts.next() == Some("slice");
        if first == "none" {
            return Self { align: None, slice };
        }
        let axis = |s: &str| match s {
            "Min" => Some(Align::Min),
            "Mid" => Some(Align::Mid),
            "Max" => Some(Align::Max),
            _ => None,
        };
        let align = first
            .strip_prefix('x')
            .and_then(|rest| rest.split_once('Y'))
            .and_then(|(x, y)| Some((axis(x)?, axis(y)?)))
            .unwrap_or((Align::Mid, Align::Mid));
        Self {
            align: Some(align),
            slice,
        }
    }
}

/// Declared viewport of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Viewport width in CSS pixels.
    pub width: f64,
    /// Viewport height in CSS pixels.
    pub height: f64,
    /// `[min_x, min_y, width, height]`.
    pub view_box: [f64; 4],
    pub aspect: AspectRatio,
}

/// Parse an absolute length into CSS pixels. Percentages yield `None`.
fn parse_length(s: &str) -> Option<f64> {
    let s = s.trim();
    let units: [(&str, f64); 7] = [
        ("px", 1.0),
        ("pt", 4.0 / 3.0),
        ("pc", 16.0),
        ("mm", 96.0 / 25.4),
        ("cm", 96.0 / 2.54),
        ("in", 96.0),
        ("em", 16.0),
    ];
    let (num, factor) = units
        .iter()
        .find_map(|(u, f)| s.strip_suffix(u).map(|n| (n, *f)))
        .unwrap_or((s, 1.0));
    let v = num.trim().parse::<f64>().ok()? * factor;
    (v.is_finite() && v > 0.0).then_some(v)
}

fn parse_view_box(s: &str) -> Option<[f64; 4]> {
    let v: Vec<f64> = s
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<f64>().ok())
        .collect::<Option<_>>()?;
    match v.as_slice() {
        [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some([*x, *y, *w, *h]),
        _ => None,
    }
}

impl Viewport {
    pub fn from_document(doc: &Document) -> Result<Self, DocumentError> {
        let root = &doc.root;
        let view_box = root.attr("viewBox").and_then(parse_view_box);
        let width = root.attr("width").and_then(parse_length);
        let height = root.attr("height").and_then(parse_length);

        let (width, height, view_box) = match (width, height, view_box) {
            (Some(w), Some(h), vb) => (w, h, vb.unwrap_or([0.0, 0.0, w, h])),
            (w, h, Some(vb)) => {
                // Derive a missing dimension from the viewBox aspect.
                let (w, h) = match (w, h) {
                    (Some(w), None) => (w, w * vb[3] / vb[2]),
                    (None, Some(h)) => (h * vb[2] / vb[3], h),
                    _ => (vb[2], vb[3]),
                };
                (w, h, vb)
            }
            _ => {
                return Err(DocumentError::InvalidViewport(
                    "no usable width/height or viewBox".to_string(),
                ))
            }
        };

        Ok(Self {
            width,
            height,
            view_box,
            aspect: root
                .attr("preserveAspectRatio")
                .map(AspectRatio::parse)
                .unwrap_or_default(),
        })
    }

    /// Raster size for a zoom factor: `round(viewport × zoom)`, at least 1 px.
    pub fn raster_size(&self, zoom: f64) -> [u32; 2] {
        let px = |v: f64| (v * zoom).round().clamp(1.0, u32::MAX as f64) as u32;
        [px(self.width), px(self.height)]
    }
}

/// Affine map from root user space to raster pixels:
/// `pixel = scale ⊙ doc + translate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportTransform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
    pub raster_size: [u32; 2],
}

impl ViewportTransform {
    /// Transform for rendering `viewport` into a `raster_size` bitmap.
    pub fn new(viewport: &Viewport, raster_size: [u32; 2]) -> Self {
        let [vx, vy, vw, vh] = viewport.view_box;
        let (w, h) = (viewport.width, viewport.height);

        let (sx, sy, tx, ty) = match viewport.aspect.align {
            None => {
                let (sx, sy) = (w / vw, h / vh);
                (sx, sy, -vx * sx, -vy * sy)
            }
            Some((ax, ay)) => {
                let (fx, fy) = (w / vw, h / vh);
                let s = if viewport.aspect.slice {
                    fx.max(fy)
                } else {
                    fx.min(fy)
                };
                let tx = -vx * s + (w - vw * s) * ax.factor();
                let ty = -vy * s + (h - vh * s) * ay.factor();
                (s, s, tx, ty)
            }
        };

        // Viewport CSS pixels to raster pixels, per axis after rounding.
        let kx = raster_size[0] as f64 / w;
        let ky = raster_size[1] as f64 / h;
        Self {
            scale: [sx * kx, sy * ky],
            translate: [tx * kx, ty * ky],
            raster_size,
        }
    }

    pub fn from_zoom(viewport: &Viewport, zoom: f64) -> Self {
        Self::new(viewport, viewport.raster_size(zoom))
    }

    pub fn to_pixels(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.scale[0] * p[0] + self.translate[0],
            self.scale[1] * p[1] + self.translate[1],
        ]
    }

    pub fn to_doc(&self, p: [f64; 2]) -> [f64; 2] {
        [
            (p[0] - self.translate[0]) / self.scale[0],
            (p[1] - self.translate[1]) / self.scale[1],
        ]
    }

    /// Pixel length along x converted to document units.
    pub fn length_x_to_doc(&self, px: f64) -> f64 {
        px / self.scale[0].abs()
    }

    /// Pixel length along y converted to document units.
    pub fn length_y_to_doc(&self, px: f64) -> f64 {
        px / self.scale[1].abs()
    }

    /// Relative difference between the two axis scales.
    pub fn anisotropy(&self) -> f64 {
        let (a, b) = (self.scale[0].abs(), self.scale[1].abs());
        (a - b).abs() / a.max(b)
    }

    /// Homogeneous matrix of the doc → pixel map.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.scale[0],
            0.0,
            self.translate[0],
            0.0,
            self.scale[1],
            self.translate[1],
            0.0,
            0.0,
            1.0,
        )
    }
}

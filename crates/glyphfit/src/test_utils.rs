//! Shared helpers for unit tests.

use image::{Rgba, RgbaImage};

use crate::document::{find_all_glyphs, parse_color, Document, ShapeKind};
use crate::render::{RenderError, Renderer};
use crate::viewport::{Viewport, ViewportTransform};

const SUPERSAMPLE: usize = 4;
/// Stroke weight of synthetic round glyphs, in ems.
const STROKE_EM: f64 = 0.1;
/// Half-angle of the synthetic "C" opening, in radians.
const GAP_HALF_ANGLE: f64 = 35.0 * std::f64::consts::PI / 180.0;

/// Paint `color` into every pixel of `bbox = [x0, y0, x1, y1]` (pixel
/// coordinates) in proportion to the fraction of subsamples `inside` accepts.
pub(crate) fn paint_coverage(
    img: &mut RgbaImage,
    bbox: [f64; 4],
    color: [u8; 3],
    inside: impl Fn(f64, f64) -> bool,
) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = (bbox[0].floor() as i64).clamp(0, w);
    let y0 = (bbox[1].floor() as i64).clamp(0, h);
    let x1 = (bbox[2].ceil() as i64).clamp(0, w);
    let y1 = (bbox[3].ceil() as i64).clamp(0, h);
    let n = (SUPERSAMPLE * SUPERSAMPLE) as f64;
    for y in y0..y1 {
        for x in x0..x1 {
            let mut hits = 0usize;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let px = x as f64 + (sx as f64 + 0.5) / SUPERSAMPLE as f64;
                    let py = y as f64 + (sy as f64 + 0.5) / SUPERSAMPLE as f64;
                    if inside(px, py) {
                        hits += 1;
                    }
                }
            }
            if hits == 0 {
                continue;
            }
            let c = hits as f64 / n;
            let p = img.get_pixel_mut(x as u32, y as u32);
            for k in 0..3 {
                p.0[k] = (p.0[k] as f64 * (1.0 - c) + color[k] as f64 * c).round() as u8;
            }
            p.0[3] = 255;
        }
    }
}

/// Black elliptical ring with outer semi-axes `semi`; `gap` cuts an opening
/// of that half-angle (radians) around the +x direction.
pub(crate) fn draw_ring(
    img: &mut RgbaImage,
    center: [f64; 2],
    semi: [f64; 2],
    thickness: f64,
    gap: Option<f64>,
) {
    draw_ring_colored(img, center, semi, thickness, gap, [0, 0, 0]);
}

fn draw_ring_colored(
    img: &mut RgbaImage,
    center: [f64; 2],
    semi: [f64; 2],
    thickness: f64,
    gap: Option<f64>,
    color: [u8; 3],
) {
    let inner = [(semi[0] - thickness).max(0.0), (semi[1] - thickness).max(0.0)];
    let bbox = [
        center[0] - semi[0],
        center[1] - semi[1],
        center[0] + semi[0],
        center[1] + semi[1],
    ];
    paint_coverage(img, bbox, color, |x, y| {
        let (dx, dy) = (x - center[0], y - center[1]);
        let outer_r = (dx / semi[0]).powi(2) + (dy / semi[1]).powi(2);
        let inner_r = if inner[0] > 0.0 && inner[1] > 0.0 {
            (dx / inner[0]).powi(2) + (dy / inner[1]).powi(2)
        } else {
            f64::INFINITY
        };
        let in_gap = gap.is_some_and(|g| dy.atan2(dx).abs() < g);
        outer_r <= 1.0 && inner_r >= 1.0 && !in_gap
    });
}

/// Solid black ellipse.
pub(crate) fn draw_filled_ellipse(img: &mut RgbaImage, center: [f64; 2], semi: [f64; 2]) {
    let bbox = [
        center[0] - semi[0],
        center[1] - semi[1],
        center[0] + semi[0],
        center[1] + semi[1],
    ];
    paint_coverage(img, bbox, [0, 0, 0], |x, y| {
        ((x - center[0]) / semi[0]).powi(2) + ((y - center[1]) / semi[1]).powi(2) <= 1.0
    });
}

/// In-process stand-in for an SVG rasterizer.
///
/// Draws `rect` elements with a visible fill, then every character whose
/// resolved fill differs from the background, using the nominal layout:
/// closed round glyphs as elliptical rings, the rest of the open round
/// glyphs as rings with an opening on the right, everything else as a
/// solid box.
pub(crate) struct SyntheticRenderer {
    pub background: [u8; 3],
}

impl Default for SyntheticRenderer {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
        }
    }
}

impl SyntheticRenderer {
    fn visible(&self, paint: &str) -> Option<[u8; 3]> {
        if paint == "none" {
            return None;
        }
        let rgb = parse_color(paint).unwrap_or([0, 0, 0]);
        (rgb != self.background).then_some(rgb)
    }
}

impl Renderer for SyntheticRenderer {
    fn render(&self, svg: &str, size: [u32; 2]) -> Result<RgbaImage, RenderError> {
        let doc = Document::parse(svg).map_err(|e| RenderError::Decode(e.to_string()))?;
        let vp = Viewport::from_document(&doc).map_err(|e| RenderError::Decode(e.to_string()))?;
        let t = ViewportTransform::new(&vp, size);
        let [r, g, b] = self.background;
        let mut img = RgbaImage::from_pixel(size[0], size[1], Rgba([r, g, b, 255]));

        for (_, el) in doc.root.child_elements() {
            if !el.is_svg("rect") {
                continue;
            }
            let Some(color) = el.property("fill").and_then(|f| self.visible(&f)) else {
                continue;
            };
            let num = |name: &str| el.attr(name).and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0);
            let p0 = t.to_pixels([num("x"), num("y")]);
            let p1 = t.to_pixels([num("x") + num("width"), num("y") + num("height")]);
            paint_coverage(&mut img, [p0[0], p0[1], p1[0], p1[1]], color, |_, _| true);
        }

        for occ in find_all_glyphs(&doc) {
            let Some(color) = self.visible(&occ.fill) else {
                continue;
            };
            let b = occ.nominal_box;
            let p0 = t.to_pixels([b.x0, b.y0]);
            let p1 = t.to_pixels([b.x1, b.y1]);
            let center = [0.5 * (p0[0] + p1[0]), 0.5 * (p0[1] + p1[1])];
            let semi = [0.5 * (p1[0] - p0[0]), 0.5 * (p1[1] - p0[1])];
            let stroke = STROKE_EM * occ.font.size * t.scale[0].abs();
            match (occ.shape, occ.ch) {
                (ShapeKind::Closed, _) => {
                    draw_ring_colored(&mut img, center, semi, stroke, None, color)
                }
                (ShapeKind::Open, 'C' | 'c' | 'G') => {
                    draw_ring_colored(&mut img, center, semi, stroke, Some(GAP_HALF_ANGLE), color)
                }
                _ => paint_coverage(&mut img, [p0[0], p0[1], p1[0], p1[1]], color, |_, _| true),
            }
        }
        Ok(img)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

/// Renderer that always fails.
pub(crate) struct BrokenRenderer;

impl Renderer for BrokenRenderer {
    fn render(&self, _svg: &str, _size: [u32; 2]) -> Result<RgbaImage, RenderError> {
        Err(RenderError::Exit {
            code: Some(1),
            stderr: "boom".to_string(),
        })
    }

    fn probe(&self) -> Result<(), RenderError> {
        Err(RenderError::Spawn {
            program: "broken".to_string(),
            message: "not installed".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Count pixels darker than mid-gray inside `[x0, y0, x1, y1)`.
pub(crate) fn dark_pixels_in(img: &RgbaImage, region: [u32; 4]) -> usize {
    let mut n = 0;
    for y in region[1]..region[3].min(img.height()) {
        for x in region[0]..region[2].min(img.width()) {
            let p = img.get_pixel(x, y).0;
            if (p[0] as u32 + p[1] as u32 + p[2] as u32) < 3 * 128 {
                n += 1;
            }
        }
    }
    n
}

/// Single-glyph test document.
pub(crate) fn single_glyph_svg(ch: char, font_size: f64) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="30" viewBox="0 0 40 30">
  <rect x="0" y="0" width="40" height="30" fill="#eeeeee"/>
  <text x="10" y="20" font-family="sans-serif" font-size="{}" fill="#000000">{}</text>
</svg>"##,
        font_size, ch
    )
}

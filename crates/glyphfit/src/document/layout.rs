//! Nominal glyph placement.
//!
//! A fixed per-class advance table stands in for font metrics. It is coarse
//! on purpose: the boxes are reported next to the fitted ellipse as a sanity
//! reference and drive the synthetic renderer in tests. The fit itself never
//! depends on them.

use serde::{Deserialize, Serialize};

use super::style::TextAnchor;
use super::text::ResolvedText;
use super::transform::AxisAffine;

const TRACKING_EM: f64 = 0.04;
const SIDE_BEARING_EM: f64 = 0.05;
const CAP_HEIGHT_EM: f64 = 0.72;
const X_HEIGHT_EM: f64 = 0.53;
const OVERSHOOT_EM: f64 = 0.015;

/// Axis-aligned ink box in document user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlyphBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl GlyphBox {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> [f64; 2] {
        [0.5 * (self.x0 + self.x1), 0.5 * (self.y0 + self.y1)]
    }

    /// Map through an axis-aligned transform, keeping `x0 <= x1`, `y0 <= y1`.
    pub fn map(&self, t: &AxisAffine) -> Self {
        let a = t.apply([self.x0, self.y0]);
        let b = t.apply([self.x1, self.y1]);
        Self {
            x0: a[0].min(b[0]),
            y0: a[1].min(b[1]),
            x1: a[0].max(b[0]),
            y1: a[1].max(b[1]),
        }
    }

    fn shifted(&self, dx: f64) -> Self {
        Self {
            x0: self.x0 + dx,
            x1: self.x1 + dx,
            ..*self
        }
    }
}

/// Advance width of `ch` in ems.
pub fn advance_em(ch: char) -> f64 {
    match ch {
        ' ' => 0.32,
        'O' | 'Q' => 0.78,
        'C' | 'G' | 'D' => 0.70,
        'W' | 'M' | 'm' | 'w' => 0.90,
        'I' | 'J' | 'i' | 'j' | 'l' | 'f' | 't' | 'r' => 0.30,
        '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.30,
        '0'..='9' => 0.62,
        c if c.is_uppercase() => 0.66,
        _ => 0.55,
    }
}

fn is_round(ch: char) -> bool {
    matches!(ch, 'O' | 'Q' | 'C' | 'G' | 'o' | 'c' | 'e')
}

/// Ink box of `ch` drawn with its pen at `pen` (baseline origin).
pub fn glyph_box_at(ch: char, pen: [f64; 2], font_size: f64) -> GlyphBox {
    let adv = advance_em(ch) * font_size;
    let side = SIDE_BEARING_EM * font_size;
    let height = if ch.is_uppercase() || ch.is_ascii_digit() {
        CAP_HEIGHT_EM
    } else {
        X_HEIGHT_EM
    } * font_size;
    let overshoot = if is_round(ch) {
        OVERSHOOT_EM * font_size
    } else {
        0.0
    };
    GlyphBox {
        x0: pen[0] + side,
        y0: pen[1] - height - overshoot,
        x1: pen[0] + adv - side,
        y1: pen[1] + overshoot,
    }
}

struct Chunk {
    members: Vec<usize>,
    start: f64,
    end: f64,
    anchor: TextAnchor,
}

impl Chunk {
    fn flush(&mut self, boxes: &mut [Option<GlyphBox>]) {
        let width = self.end - self.start;
        let shift = match self.anchor {
            TextAnchor::Start => 0.0,
            TextAnchor::Middle => -0.5 * width,
            TextAnchor::End => -width,
        };
        for &i in &self.members {
            if let Some(b) = boxes[i].as_mut() {
                *b = b.shifted(shift);
            }
        }
        self.members.clear();
    }
}

/// Nominal ink box for every character of `text` (in the text element's
/// own user space). Non-addressable characters get `None`.
pub fn layout_text(text: &ResolvedText) -> Vec<Option<GlyphBox>> {
    let mut boxes = vec![None; text.chars.len()];
    let mut pen = [0.0f64; 2];
    let mut chunk = Chunk {
        members: Vec::new(),
        start: 0.0,
        end: 0.0,
        anchor: TextAnchor::Start,
    };

    for (i, c) in text.chars.iter().enumerate() {
        if !c.addressable {
            continue;
        }
        let style = text.style_of(c);
        let fs = style.font.size;
        let pos = c.position;

        if let Some(x) = pos.x {
            chunk.flush(&mut boxes);
            pen[0] = x;
        }
        if let Some(y) = pos.y {
            pen[1] = y;
        }
        if chunk.members.is_empty() {
            chunk.start = pen[0];
            chunk.anchor = style.anchor;
        }
        pen[0] += pos.dx.unwrap_or(0.0);
        pen[1] += pos.dy.unwrap_or(0.0);

        boxes[i] = Some(glyph_box_at(c.ch, pen, fs));
        chunk.members.push(i);
        chunk.end = pen[0] + advance_em(c.ch) * fs;
        pen[0] = chunk.end + TRACKING_EM * fs;
    }
    chunk.flush(&mut boxes);
    boxes
}

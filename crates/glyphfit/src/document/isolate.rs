//! Per-glyph isolation documents.
//!
//! Every occurrence gets its own deep copy of the source document in which
//! all paint is set to the background except the one target character. The
//! run holding that character is split into one `tspan` per character, each
//! carrying the explicit positional values the character had before the
//! split, so only paint changes and no glyph moves.

use serde::{Deserialize, Serialize};

use super::glyphs::GlyphOccurrence;
use super::style::InheritedStyle;
use super::text::{resolve_text, CharPosition, ResolvedText};
use super::{Document, Element, Node, NodePath};

const SHAPES: [&str; 8] = [
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon", "use",
];

/// Paint applied to non-text graphics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapePaint {
    /// Paint fill and stroke with the background colour.
    Background,
    /// Remove fill and stroke entirely.
    None,
}

/// Paint of the target character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlyphPaint {
    /// Keep the fill and stroke the character had in the source.
    Original,
    /// Use a fixed fill colour, no stroke.
    Ink(String),
}

/// Isolation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    /// Background colour used for hidden content and by the renderer.
    pub background: String,
    pub shape_paint: ShapePaint,
    pub glyph_paint: GlyphPaint,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            background: "#ffffff".to_string(),
            shape_paint: ShapePaint::Background,
            glyph_paint: GlyphPaint::Original,
        }
    }
}

/// Structural mismatch between an occurrence and the document.
#[derive(Debug, Clone, PartialEq)]
pub enum IsolationError {
    TextElementNotFound { path: NodePath },
    RunNotFound { path: NodePath },
    IndexOutOfRange { index: usize, len: usize },
    CharMismatch { index: usize, expected: char, found: char },
    /// Splitting the run changed the resolved position of a character.
    PositionDrift { index: usize },
}

impl std::fmt::Display for IsolationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TextElementNotFound { path } => {
                write!(f, "no text element at node path {:?}", path)
            }
            Self::RunNotFound { path } => write!(f, "no text run at node path {:?}", path),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "character index {} out of range for run of {}", index, len)
            }
            Self::CharMismatch {
                index,
                expected,
                found,
            } => write!(
                f,
                "character {} of run is {:?}, expected {:?}",
                index, found, expected
            ),
            Self::PositionDrift { index } => write!(
                f,
                "split changed the position of addressable character {}",
                index
            ),
        }
    }
}

impl std::error::Error for IsolationError {}

/// One character of the split run.
#[derive(Debug, Clone, PartialEq)]
pub struct CharRecord {
    pub ch: char,
    pub position: CharPosition,
    pub visible: bool,
}

/// A document copy in which only one glyph is painted.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationDocument {
    pub occurrence: usize,
    pub document: Document,
    /// Sub-runs that replaced the target run, in order.
    pub records: Vec<CharRecord>,
}

impl IsolationDocument {
    pub fn to_svg_string(&self) -> String {
        self.document.to_svg_string()
    }
}

/// Style inherited by the element at `path` from its ancestors.
fn inherited_style_at(doc: &Document, path: &[usize]) -> InheritedStyle {
    let mut style = InheritedStyle::default();
    let mut el = &doc.root;
    for &i in path {
        style = style.inherit(el);
        match el.children.get(i) {
            Some(Node::Element(e)) => el = e,
            _ => break,
        }
    }
    style
}

fn positions(text: &ResolvedText) -> Vec<(char, CharPosition)> {
    text.addressable().map(|c| (c.ch, c.position)).collect()
}

/// Build the isolation document for `occ`. `doc` is never modified.
pub fn build_isolation(
    doc: &Document,
    occ: &GlyphOccurrence,
    cfg: &IsolationConfig,
) -> Result<IsolationDocument, IsolationError> {
    let text_path = &occ.text_element;
    let text_el = doc
        .element_at(text_path)
        .filter(|e| e.is_svg("text"))
        .ok_or_else(|| IsolationError::TextElementNotFound {
            path: text_path.clone(),
        })?;

    let run_ok = occ.run.len() > text_path.len()
        && occ.run.starts_with(text_path)
        && matches!(doc.node_at(&occ.run), Some(Node::Text(_)));
    if !run_ok {
        return Err(IsolationError::RunNotFound {
            path: occ.run.clone(),
        });
    }

    let style = inherited_style_at(doc, text_path);
    let before = resolve_text(text_el, text_path, &style);
    let run: Vec<_> = before.run_chars(&occ.run).collect();
    let target = run
        .get(occ.index_in_run)
        .ok_or(IsolationError::IndexOutOfRange {
            index: occ.index_in_run,
            len: run.len(),
        })?;
    if target.ch != occ.ch {
        return Err(IsolationError::CharMismatch {
            index: occ.index_in_run,
            expected: occ.ch,
            found: target.ch,
        });
    }

    let records: Vec<CharRecord> = run
        .iter()
        .map(|c| CharRecord {
            ch: c.ch,
            position: c.position,
            visible: c.index_in_run == occ.index_in_run,
        })
        .collect();

    let mut out = doc.clone();
    recolor(&mut out.root, cfg, false);

    let (fill, stroke) = match &cfg.glyph_paint {
        GlyphPaint::Original => (
            occ.fill.clone(),
            occ.stroke.clone().unwrap_or_else(|| "none".to_string()),
        ),
        GlyphPaint::Ink(color) => (color.clone(), "none".to_string()),
    };
    let sub_runs: Vec<Node> = records
        .iter()
        .map(|r| {
            let mut span = Element::sibling_kind(text_el, "tspan");
            for (name, v) in r.position.attributes() {
                span.set_attr(name, format!("{}", v));
            }
            if r.visible {
                span.set_property("fill", &fill);
                span.set_property("stroke", &stroke);
            } else {
                span.set_property("fill", &cfg.background);
                span.set_property("stroke", "none");
            }
            span.children.push(Node::Text(r.ch.to_string()));
            Node::Element(span)
        })
        .collect();

    let (parent_path, run_idx) = occ.run.split_at(occ.run.len() - 1);
    let parent = out
        .element_at_mut(parent_path)
        .ok_or_else(|| IsolationError::RunNotFound {
            path: occ.run.clone(),
        })?;
    parent.children.splice(run_idx[0]..=run_idx[0], sub_runs);

    // The split must leave every resolved position untouched.
    let after_el = out
        .element_at(text_path)
        .ok_or_else(|| IsolationError::TextElementNotFound {
            path: text_path.clone(),
        })?;
    let after = resolve_text(after_el, text_path, &inherited_style_at(&out, text_path));
    let (a, b) = (positions(&before), positions(&after));
    if let Some(index) = (0..a.len().max(b.len())).find(|&i| a.get(i) != b.get(i)) {
        return Err(IsolationError::PositionDrift { index });
    }

    tracing::trace!(
        occurrence = occ.id,
        sub_runs = records.len(),
        "isolation document built"
    );
    Ok(IsolationDocument {
        occurrence: occ.id,
        document: out,
        records,
    })
}

fn recolor(el: &mut Element, cfg: &IsolationConfig, inside_text: bool) {
    // Paint inside masks and clip paths defines geometry, not visible ink.
    if el.is_svg("mask") || el.is_svg("clipPath") {
        return;
    }
    // Sheet rules are already attributes; left in place they would also
    // reach the new sub-runs.
    if el.is_svg("style") {
        el.children.clear();
        return;
    }
    let is_text = el.is_svg("text")
        || el.is_svg("tspan")
        || el.is_svg("textPath")
        || (inside_text && el.is_svg("a"));

    if is_text {
        el.set_property("fill", &cfg.background);
        el.set_property("stroke", "none");
    } else if SHAPES.iter().any(|s| el.is_svg(s)) {
        let paint = match cfg.shape_paint {
            ShapePaint::Background => cfg.background.as_str(),
            ShapePaint::None => "none",
        };
        el.set_property("fill", paint);
        el.set_property("stroke", paint);
    } else if el.is_svg("image") || el.is_svg("foreignObject") {
        el.set_property("opacity", "0");
    }

    for child in &mut el.children {
        if let Node::Element(e) = child {
            recolor(e, cfg, inside_text || is_text);
        }
    }
}

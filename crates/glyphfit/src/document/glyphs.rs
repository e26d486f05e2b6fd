//! Glyph occurrence discovery.

use serde::{Deserialize, Serialize};

use super::layout::{layout_text, GlyphBox};
use super::style::{FontAttrs, InheritedStyle};
use super::text::{resolve_text, CharPosition};
use super::transform::AxisAffine;
use super::{Document, Element, NodePath};

/// Containers whose content is never rendered directly.
const NON_RENDERED: [&str; 11] = [
    "defs", "clipPath", "mask", "symbol", "pattern", "marker", "title", "desc", "metadata",
    "style", "script",
];

/// Whether a glyph outline is a closed loop or has a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Closed,
    Open,
}

impl ShapeKind {
    pub fn for_char(ch: char) -> Self {
        match ch {
            'O' | 'o' | '0' | 'Q' => Self::Closed,
            _ => Self::Open,
        }
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
        }
    }
}

/// One target character found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlyphOccurrence {
    /// Position in discovery order.
    pub id: usize,
    pub ch: char,
    pub shape: ShapeKind,
    /// Path of the enclosing `text` element.
    pub text_element: NodePath,
    /// Path of the text node (the run) holding the character.
    pub run: NodePath,
    /// Character index inside the run.
    pub index_in_run: usize,
    pub font: FontAttrs,
    pub fill: String,
    pub stroke: Option<String>,
    /// Positional values in effect at this character.
    pub offsets: CharPosition,
    /// Nominal ink box in root user space.
    pub nominal_box: GlyphBox,
    /// False when an ancestor transform rotates or skews the text, or a
    /// `rotate` value turns this character; the nominal box ignores both.
    pub axis_aligned: bool,
    /// Rendered text of the whole `text` element, for reporting.
    pub source_text: String,
}

/// All occurrences of characters in `letters`, in document order.
pub fn find_glyphs(doc: &Document, letters: &str) -> Vec<GlyphOccurrence> {
    discover(doc, &|ch| letters.contains(ch))
}

/// Every addressable non-whitespace character.
pub fn find_all_glyphs(doc: &Document) -> Vec<GlyphOccurrence> {
    discover(doc, &|ch| !ch.is_whitespace())
}

struct Scope {
    style: InheritedStyle,
    transform: AxisAffine,
    axis_aligned: bool,
}

fn discover(doc: &Document, wanted: &dyn Fn(char) -> bool) -> Vec<GlyphOccurrence> {
    let mut out = Vec::new();
    let scope = Scope {
        style: InheritedStyle::default(),
        transform: AxisAffine::IDENTITY,
        axis_aligned: true,
    };
    visit(&doc.root, &mut Vec::new(), &scope, wanted, &mut out);
    tracing::debug!(occurrences = out.len(), "glyph discovery finished");
    out
}

fn visit(
    el: &Element,
    path: &mut NodePath,
    parent: &Scope,
    wanted: &dyn Fn(char) -> bool,
    out: &mut Vec<GlyphOccurrence>,
) {
    if NON_RENDERED.iter().any(|n| el.is_svg(n)) {
        return;
    }

    let (transform, axis_aligned) = match el.attr("transform").map(AxisAffine::parse) {
        None => (parent.transform, parent.axis_aligned),
        Some(Some(t)) => (parent.transform.then_inner(&t), parent.axis_aligned),
        Some(None) => (parent.transform, false),
    };

    if el.is_svg("text") {
        collect_text(el, path, parent, transform, axis_aligned, wanted, out);
        return;
    }

    let scope = Scope {
        style: parent.style.inherit(el),
        transform,
        axis_aligned,
    };
    for (i, child) in el.child_elements() {
        path.push(i);
        visit(child, path, &scope, wanted, out);
        path.pop();
    }
}

fn collect_text(
    el: &Element,
    path: &NodePath,
    parent: &Scope,
    transform: AxisAffine,
    axis_aligned: bool,
    wanted: &dyn Fn(char) -> bool,
    out: &mut Vec<GlyphOccurrence>,
) {
    let text = resolve_text(el, path, &parent.style);
    let boxes = layout_text(&text);
    let source_text = text.text();

    for (c, b) in text.chars.iter().zip(boxes) {
        if !c.addressable || !wanted(c.ch) {
            continue;
        }
        let Some(b) = b else { continue };
        let style = text.style_of(c);
        let upright = c.position.rotate.map_or(true, |r| r.rem_euclid(360.0) == 0.0);
        out.push(GlyphOccurrence {
            id: out.len(),
            ch: c.ch,
            shape: ShapeKind::for_char(c.ch),
            text_element: path.clone(),
            run: c.run.clone(),
            index_in_run: c.index_in_run,
            font: style.font.clone(),
            fill: style.fill.clone(),
            stroke: style.stroke.clone(),
            offsets: c.position,
            nominal_box: b.map(&transform),
            axis_aligned: axis_aligned && upright,
            source_text: source_text.clone(),
        });
    }
}

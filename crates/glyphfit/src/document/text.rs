//! Character-level resolution of a `text` element.
//!
//! Walks the text-content subtree (`tspan`, `textPath`, `a`), applies
//! `xml:space` whitespace handling and resolves the `x`/`y`/`dx`/`dy`/`rotate`
//! lists down to one explicit [`CharPosition`] per addressable character.

use serde::{Deserialize, Serialize};

use super::style::InheritedStyle;
use super::{Element, Node, NodePath};

const POS_ATTRS: [&str; 5] = ["x", "y", "dx", "dy", "rotate"];
const ROTATE: usize = 4;

/// Explicit positional values in effect for one character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CharPosition {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub rotate: Option<f64>,
}

impl CharPosition {
    fn set(&mut self, k: usize, v: f64) {
        match k {
            0 => self.x = Some(v),
            1 => self.y = Some(v),
            2 => self.dx = Some(v),
            3 => self.dy = Some(v),
            _ => self.rotate = Some(v),
        }
    }

    /// Attribute name/value pairs for the values that are set.
    pub fn attributes(&self) -> Vec<(&'static str, f64)> {
        [self.x, self.y, self.dx, self.dy, self.rotate]
            .iter()
            .zip(POS_ATTRS)
            .filter_map(|(v, name)| v.map(|v| (name, v)))
            .collect()
    }
}

/// One character of a text node inside a `text` element.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedChar {
    /// Character as written in the source.
    pub ch: char,
    /// Path of the text node holding the character.
    pub run: NodePath,
    /// Character index inside that text node.
    pub index_in_run: usize,
    /// False for whitespace removed or collapsed by `xml:space` handling.
    pub addressable: bool,
    /// Resolved positional values; all `None` for non-addressable characters.
    pub position: CharPosition,
    /// Index into [`ResolvedText::styles`].
    pub style: usize,
}

/// All characters of one `text` element in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedText {
    pub element: NodePath,
    pub styles: Vec<InheritedStyle>,
    pub chars: Vec<ResolvedChar>,
}

impl ResolvedText {
    pub fn style_of(&self, c: &ResolvedChar) -> &InheritedStyle {
        &self.styles[c.style]
    }

    pub fn addressable(&self) -> impl Iterator<Item = &ResolvedChar> {
        self.chars.iter().filter(|c| c.addressable)
    }

    /// Rendered text after whitespace processing.
    pub fn text(&self) -> String {
        self.addressable()
            .map(|c| if c.ch.is_whitespace() { ' ' } else { c.ch })
            .collect()
    }

    /// Characters belonging to the text node at `run`.
    pub fn run_chars<'a>(&'a self, run: &'a [usize]) -> impl Iterator<Item = &'a ResolvedChar> + 'a {
        self.chars.iter().filter(move |c| c.run == run)
    }
}

struct Frame {
    lists: [Vec<f64>; 5],
    parent: Option<usize>,
}

struct RawChar {
    ch: char,
    run: NodePath,
    index_in_run: usize,
    style: usize,
    frame: usize,
}

struct Walk {
    frames: Vec<Frame>,
    styles: Vec<InheritedStyle>,
    chars: Vec<RawChar>,
}

fn is_text_content(el: &Element) -> bool {
    el.is_svg("tspan") || el.is_svg("textPath") || el.is_svg("a")
}

fn parse_list(value: Option<&str>) -> Vec<f64> {
    let Some(value) = value else {
        return Vec::new();
    };
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.strip_suffix("px").unwrap_or(s).parse::<f64>().ok())
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

impl Walk {
    fn visit(&mut self, el: &Element, path: &NodePath, style: &InheritedStyle, parent: Option<usize>) {
        let style = style.inherit(el);
        let style_idx = self.styles.len();
        self.styles.push(style.clone());

        let frame = self.frames.len();
        self.frames.push(Frame {
            lists: POS_ATTRS.map(|name| parse_list(el.attr(name))),
            parent,
        });

        for (i, child) in el.children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(i);
            match child {
                Node::Text(t) => {
                    for (k, ch) in t.chars().enumerate() {
                        self.chars.push(RawChar {
                            ch,
                            run: child_path.clone(),
                            index_in_run: k,
                            style: style_idx,
                            frame,
                        });
                    }
                }
                Node::Element(e) if is_text_content(e) => {
                    self.visit(e, &child_path, &style, Some(frame));
                }
                Node::Element(_) => {}
            }
        }
    }
}

/// Resolve the `text` element `el` found at `path`, with `parent_style` the
/// style inherited from its ancestors.
pub fn resolve_text(el: &Element, path: &[usize], parent_style: &InheritedStyle) -> ResolvedText {
    let mut walk = Walk {
        frames: Vec::new(),
        styles: Vec::new(),
        chars: Vec::new(),
    };
    walk.visit(el, &path.to_vec(), parent_style, None);

    let addressable = whitespace_mask(&walk);

    let mut counters = vec![0usize; walk.frames.len()];
    let mut chars = Vec::with_capacity(walk.chars.len());
    for (raw, keep) in walk.chars.iter().zip(addressable) {
        let mut position = CharPosition::default();
        if keep {
            for k in 0..POS_ATTRS.len() {
                let mut f = Some(raw.frame);
                while let Some(fi) = f {
                    let list = &walk.frames[fi].lists[k];
                    let c = counters[fi];
                    if let Some(&v) = list.get(c) {
                        position.set(k, v);
                        break;
                    }
                    // The last rotate value carries over to the remaining characters.
                    if k == ROTATE {
                        if let Some(&v) = list.last() {
                            position.set(k, v);
                            break;
                        }
                    }
                    f = walk.frames[fi].parent;
                }
            }
            let mut f = Some(raw.frame);
            while let Some(fi) = f {
                counters[fi] += 1;
                f = walk.frames[fi].parent;
            }
        }
        chars.push(ResolvedChar {
            ch: raw.ch,
            run: raw.run.clone(),
            index_in_run: raw.index_in_run,
            addressable: keep,
            position,
            style: raw.style,
        });
    }

    ResolvedText {
        element: path.to_vec(),
        styles: walk.styles,
        chars,
    }
}

/// Addressability per raw character after `xml:space` processing.
fn whitespace_mask(walk: &Walk) -> Vec<bool> {
    let preserve = |c: &RawChar| walk.styles[c.style].preserve_space;

    let mut eff: Vec<Option<char>> = walk
        .chars
        .iter()
        .map(|c| match (preserve(c), c.ch) {
            (true, '\n' | '\r' | '\t') => Some(' '),
            (false, '\n' | '\r') => None,
            (false, '\t') => Some(' '),
            (_, ch) => Some(ch),
        })
        .collect();

    // Collapse runs of spaces in default mode.
    let mut prev_space = false;
    for (raw, e) in walk.chars.iter().zip(eff.iter_mut()) {
        let Some(ch) = *e else { continue };
        if ch == ' ' && prev_space && !preserve(raw) {
            *e = None;
            continue;
        }
        prev_space = ch == ' ';
    }

    // Strip leading and trailing default-mode spaces.
    for forward in [true, false] {
        let order: Vec<usize> = if forward {
            (0..eff.len()).collect()
        } else {
            (0..eff.len()).rev().collect()
        };
        for i in order {
            match eff[i] {
                None => continue,
                Some(' ') if !preserve(&walk.chars[i]) => eff[i] = None,
                Some(_) => break,
            }
        }
    }

    eff.into_iter().map(|e| e.is_some()).collect()
}

//! Owned SVG document model.
//!
//! `roxmltree` gives a read-only view, so the parsed markup is copied into a
//! small owned tree ([`Element`] / [`Node`]) that can be cloned per glyph,
//! edited and serialized back for the renderer. Prefixes and namespace
//! declarations are preserved so the serialized output stays well-formed.
//! Simple `<style>` rules are resolved into presentation attributes while
//! parsing (see [`StyleSheet`]).

mod glyphs;
mod isolate;
mod layout;
mod style;
mod stylesheet;
mod text;
mod transform;

pub use glyphs::{find_all_glyphs, find_glyphs, GlyphOccurrence, ShapeKind};
pub use isolate::{build_isolation, CharRecord, GlyphPaint, IsolationConfig, IsolationDocument, ShapePaint};
pub use layout::{advance_em, glyph_box_at, layout_text, GlyphBox};
pub use style::{parse_color, parse_style_attribute, FontAttrs, InheritedStyle, TextAnchor};
pub use stylesheet::StyleSheet;
pub use text::{resolve_text, CharPosition, ResolvedChar, ResolvedText};
pub use transform::AxisAffine;

/// SVG namespace URI.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Child-index path from the root element to a node.
pub type NodePath = Vec<usize>;

// ── Error type ─────────────────────────────────────────────────────────────

/// Errors raised while loading a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The markup is not well-formed XML.
    Xml(String),
    /// The root element is not `svg`.
    NotSvg {
        /// Local name of the root element found instead.
        found: String,
    },
    /// Neither `width`/`height` nor a usable `viewBox` were declared.
    InvalidViewport(String),
}

impl std::fmt::Display for DocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Xml(msg) => write!(f, "malformed XML: {}", msg),
            Self::NotSvg { found } => write!(f, "root element is <{}>, expected <svg>", found),
            Self::InvalidViewport(msg) => write!(f, "invalid viewport: {}", msg),
        }
    }
}

impl std::error::Error for DocumentError {}

// ── Tree ───────────────────────────────────────────────────────────────────

/// One attribute with its qualified name (`fill`, `xml:space`, `xlink:href`).
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element node of the owned tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Prefix used in the source markup, if any.
    pub prefix: Option<String>,
    /// Local name (`text`, `tspan`, ...).
    pub local: String,
    /// Resolved namespace URI.
    pub namespace: Option<String>,
    /// Namespace declarations introduced on this element: `(prefix, uri)`.
    pub namespace_decls: Vec<(Option<String>, String)>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// Element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    /// Create an element that shares `template`'s prefix and namespace.
    pub fn sibling_kind(template: &Element, local: &str) -> Self {
        Self {
            prefix: template.prefix.clone(),
            local: local.to_string(),
            namespace: template.namespace.clone(),
            namespace_decls: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// True when this is the SVG element `local`. Elements without a
    /// namespace are accepted too, so namespace-less documents still match.
    pub fn is_svg(&self, local: &str) -> bool {
        self.local == local && self.namespace.as_deref().map_or(true, |ns| ns == SVG_NS)
    }

    /// Raw attribute value by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set (or replace) an attribute.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(a) => a.value = value,
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// Presentation property: inline `style` declarations win over the
    /// attribute of the same name.
    pub fn property(&self, name: &str) -> Option<String> {
        if let Some(style) = self.attr("style") {
            let from_style = parse_style_attribute(style)
                .into_iter()
                .rev()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v);
            if from_style.is_some() {
                return from_style;
            }
        }
        self.attr(name).map(|v| v.trim().to_string())
    }

    /// Force a presentation property through the inline style, also
    /// mirroring it into the attribute for renderers that ignore `style`.
    pub fn set_property(&mut self, name: &str, value: &str) {
        let mut decls: Vec<(String, String)> = self
            .attr("style")
            .map(parse_style_attribute)
            .unwrap_or_default()
            .into_iter()
            .filter(|(k, _)| k != name)
            .collect();
        decls.push((name.to_string(), value.to_string()));
        let style = decls
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(";");
        self.set_attr("style", style);
        self.set_attr(name, value);
    }

    /// Child elements with their child index.
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children.iter().enumerate().filter_map(|(i, c)| match c {
            Node::Element(e) => Some((i, e)),
            Node::Text(_) => None,
        })
    }

    /// Concatenated character data of this subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
        }
    }
}

/// A parsed SVG document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Parse SVG markup. DTDs are accepted (many exporters emit one).
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, opts)
            .map_err(|e| DocumentError::Xml(e.to_string()))?;
        let root = xml.root_element();
        if root.tag_name().name() != "svg" {
            return Err(DocumentError::NotSvg {
                found: root.tag_name().name().to_string(),
            });
        }
        let mut root = convert_element(root, None);
        let sheet = StyleSheet::from_tree(&root);
        if !sheet.is_empty() {
            sheet.apply(&mut root);
        }
        Ok(Self { root })
    }

    /// Node at `path`; the empty path is the root element.
    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.root.children.get(first)?;
        for &i in rest {
            match node {
                Node::Element(e) => node = e.children.get(i)?,
                Node::Text(_) => return None,
            }
        }
        Some(node)
    }

    /// Element at `path`; the empty path is the root element.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        if path.is_empty() {
            return Some(&self.root);
        }
        match self.node_at(path)? {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }

    /// Mutable element at `path`.
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut el = &mut self.root;
        for &i in path {
            match el.children.get_mut(i)? {
                Node::Element(e) => el = e,
                Node::Text(_) => return None,
            }
        }
        Some(el)
    }

    /// Serialize back to SVG markup.
    pub fn to_svg_string(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        write_element(&self.root, &mut out);
        out.push('\n');
        out
    }
}

// ── roxmltree → owned tree ─────────────────────────────────────────────────

fn in_scope(node: roxmltree::Node<'_, '_>) -> Vec<(Option<String>, String)> {
    node.namespaces()
        .filter(|ns| ns.uri() != XML_NS)
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

fn qualify(node: roxmltree::Node<'_, '_>, ns: Option<&str>, local: &str) -> String {
    match ns {
        Some(XML_NS) => format!("xml:{}", local),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(p) => format!("{}:{}", p, local),
            None => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn convert_element(
    node: roxmltree::Node<'_, '_>,
    parent: Option<roxmltree::Node<'_, '_>>,
) -> Element {
    let namespace = node.tag_name().namespace().map(str::to_string);
    let prefix = namespace
        .as_deref()
        .and_then(|uri| node.lookup_prefix(uri))
        .map(str::to_string);

    let parent_scope = parent.map(in_scope).unwrap_or_default();
    let namespace_decls = in_scope(node)
        .into_iter()
        .filter(|d| !parent_scope.contains(d))
        .collect();

    let attributes = node
        .attributes()
        .map(|a| Attribute {
            name: qualify(node, a.namespace(), a.name()),
            value: a.value().to_string(),
        })
        .collect();

    let mut children = Vec::new();
    for child in node.children() {
        if child.is_element() {
            children.push(Node::Element(convert_element(child, Some(node))));
        } else if child.is_text() {
            if let Some(t) = child.text() {
                children.push(Node::Text(t.to_string()));
            }
        }
    }

    Element {
        prefix,
        local: node.tag_name().name().to_string(),
        namespace,
        namespace_decls,
        attributes,
        children,
    }
}

// ── Serialization ──────────────────────────────────────────────────────────

fn qualified_name(el: &Element) -> String {
    match &el.prefix {
        Some(p) => format!("{}:{}", p, el.local),
        None => el.local.clone(),
    }
}

fn write_element(el: &Element, out: &mut String) {
    let name = qualified_name(el);
    out.push('<');
    out.push_str(&name);
    for (prefix, uri) in &el.namespace_decls {
        match prefix {
            Some(p) => out.push_str(&format!(" xmlns:{}=\"", p)),
            None => out.push_str(" xmlns=\""),
        }
        escape_attr(uri, out);
        out.push('"');
    }
    for a in &el.attributes {
        out.push(' ');
        out.push_str(&a.name);
        out.push_str("=\"");
        escape_attr(&a.value, out);
        out.push('"');
    }
    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &el.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) => escape_text(t, out),
        }
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_round_trips_structure() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="10" height="10">
            <text x="1" y="2" xml:space="preserve">A &amp; B<tspan dy="1">2</tspan></text>
            <use xlink:href="#a"/>
        </svg>"##;
        let doc = Document::parse(svg).expect("parse");
        let out = doc.to_svg_string();
        let again = Document::parse(&out).expect("reparse");
        assert_eq!(doc, again);

        let text = doc.root.child_elements().next().map(|(_, e)| e).unwrap();
        assert!(text.is_svg("text"));
        assert_eq!(text.attr("xml:space"), Some("preserve"));
        assert_eq!(text.text_content(), "A & B2");
    }

    #[test]
    fn prefixed_namespace_is_preserved() {
        let svg = r#"<svg:svg xmlns:svg="http://www.w3.org/2000/svg"><svg:text>O</svg:text></svg:svg>"#;
        let doc = Document::parse(svg).unwrap();
        assert_eq!(doc.root.prefix.as_deref(), Some("svg"));
        let out = doc.to_svg_string();
        assert!(out.contains("<svg:text>O</svg:text>"));
        assert!(out.contains("xmlns:svg=\"http://www.w3.org/2000/svg\""));
    }

    #[test]
    fn rejects_non_svg_root() {
        let err = Document::parse("<html/>").unwrap_err();
        assert_eq!(
            err,
            DocumentError::NotSvg {
                found: "html".into()
            }
        );
        assert!(matches!(
            Document::parse("<svg><text></svg>"),
            Err(DocumentError::Xml(_))
        ));
    }

    #[test]
    fn set_property_overrides_inline_style() {
        let mut el = Element::sibling_kind(
            &Document::parse("<svg/>").unwrap().root,
            "text",
        );
        el.set_attr("style", "font-size:12px;fill:#ff0000");
        el.set_property("fill", "#ffffff");
        assert_eq!(el.property("fill").as_deref(), Some("#ffffff"));
        assert_eq!(el.property("font-size").as_deref(), Some("12px"));
        assert_eq!(el.attr("fill"), Some("#ffffff"));
    }

    #[test]
    fn paths_address_nested_nodes() {
        let doc = Document::parse("<svg><g><text>O<tspan>C</tspan></text></g></svg>").unwrap();
        assert!(matches!(doc.node_at(&[0, 0, 0]), Some(Node::Text(t)) if t == "O"));
        assert_eq!(doc.element_at(&[0, 0, 1]).map(|e| e.local.as_str()), Some("tspan"));
        assert!(doc.element_at(&[0, 0, 0]).is_none());
        assert!(doc.node_at(&[3]).is_none());
    }
}

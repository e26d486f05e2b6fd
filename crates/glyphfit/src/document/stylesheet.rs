//! Document `<style>` sheets.
//!
//! Only compound selectors are understood: an optional element name, `#id`
//! and any number of `.class` parts (`text.label`, `.big.red`, `*`), in
//! comma-separated groups. Rules with combinators, pseudo-classes or
//! attribute selectors are skipped, as are at-rules and `!important`
//! precedence.
//!
//! Matching rules are resolved once at parse time into presentation
//! attributes, ordered by specificity and then source order. Inline `style`
//! declarations still win over them.

use super::style::parse_style_attribute;
use super::{Element, Node};

/// Properties copied from rules onto elements.
const PRESENTATION: [&str; 16] = [
    "fill",
    "fill-opacity",
    "stroke",
    "stroke-opacity",
    "stroke-width",
    "color",
    "opacity",
    "visibility",
    "display",
    "font-family",
    "font-size",
    "font-weight",
    "font-style",
    "text-anchor",
    "letter-spacing",
    "word-spacing",
];

#[derive(Debug, Clone, PartialEq, Default)]
struct Selector {
    element: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains(|c: char| c.is_whitespace() || ">+~:[".contains(c)) {
            return None;
        }
        let mut sel = Selector::default();
        let head_end = s.find(&['.', '#'][..]).unwrap_or(s.len());
        match &s[..head_end] {
            "" | "*" => {}
            name => sel.element = Some(name.to_string()),
        }
        let mut rest = &s[head_end..];
        while let Some(kind) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(&['.', '#'][..]).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match kind {
                '.' => sel.classes.push(name.to_string()),
                _ => sel.id = Some(name.to_string()),
            }
            rest = &body[end..];
        }
        Some(sel)
    }

    fn specificity(&self) -> (usize, usize, usize) {
        (
            self.id.is_some() as usize,
            self.classes.len(),
            self.element.is_some() as usize,
        )
    }

    fn matches(&self, el: &Element) -> bool {
        if let Some(name) = &self.element {
            if !el.is_svg(name) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        let classes: Vec<&str> = el.attr("class").unwrap_or("").split_whitespace().collect();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
}

/// Parsed rules of every `<style>` element, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleSheet {
    rules: Vec<Rule>,
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Skip an at-rule starting at `css`: up to `;` or past its balanced block.
fn skip_at_rule(css: &str) -> &str {
    let semi = css.find(';');
    let open = css.find('{');
    match (semi, open) {
        (Some(s), Some(o)) if s < o => &css[s + 1..],
        (Some(s), None) => &css[s + 1..],
        (_, Some(o)) => {
            let mut depth = 0usize;
            for (i, c) in css[o..].char_indices() {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return &css[o + i + 1..];
                        }
                    }
                    _ => {}
                }
            }
            ""
        }
        (None, None) => "",
    }
}

impl StyleSheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut sheet = StyleSheet::default();
        let mut rest = css.as_str();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if rest.starts_with('@') {
                rest = skip_at_rule(rest);
                continue;
            }
            let Some(open) = rest.find('{') else { break };
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            let declarations: Vec<(String, String)> = parse_style_attribute(&rest[open + 1..close])
                .into_iter()
                .filter(|(k, _)| PRESENTATION.contains(&k.as_str()))
                .collect();
            for group in rest[..open].split(',') {
                match Selector::parse(group) {
                    Some(selector) if !declarations.is_empty() => sheet.rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                    }),
                    Some(_) => {}
                    None => {
                        tracing::debug!(selector = group.trim(), "unsupported CSS selector skipped")
                    }
                }
            }
            rest = &rest[close + 1..];
        }
        sheet
    }

    /// Rules of every SVG `<style>` element under `root`.
    pub fn from_tree(root: &Element) -> Self {
        let mut sheet = StyleSheet::default();
        collect_sheets(root, &mut sheet);
        sheet
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Write the winning declaration of each matched property onto every
    /// element of the subtree as a presentation attribute.
    pub fn apply(&self, el: &mut Element) {
        let mut matched: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.selector.matches(el))
            .collect();
        matched.sort_by_key(|(order, r)| (r.selector.specificity(), *order));
        for (_, rule) in matched {
            for (name, value) in &rule.declarations {
                el.set_attr(name, value.clone());
            }
        }
        for child in &mut el.children {
            if let Node::Element(e) = child {
                self.apply(e);
            }
        }
    }
}

fn collect_sheets(el: &Element, sheet: &mut StyleSheet) {
    if el.is_svg("style") {
        let kind = el.attr("type").unwrap_or("text/css");
        if kind.trim().eq_ignore_ascii_case("text/css") {
            sheet.rules.extend(StyleSheet::parse(&el.text_content()).rules);
        }
        return;
    }
    for (_, child) in el.child_elements() {
        collect_sheets(child, sheet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[test]
    fn selectors_and_groups() {
        let sheet = StyleSheet::parse(
            "/* labels */ text.label, .note { fill: #aa0000; cursor: pointer }\n\
             @media print { text { fill: black } }\n\
             @import url(x.css);\n\
             g > text { fill: blue }\n\
             #title { font-size: 20px }",
        );
        assert_eq!(sheet.rules.len(), 3);
        assert_eq!(sheet.rules[0].selector.element.as_deref(), Some("text"));
        assert_eq!(sheet.rules[0].selector.classes, vec!["label".to_string()]);
        assert_eq!(
            sheet.rules[0].declarations,
            vec![("fill".to_string(), "#aa0000".to_string())]
        );
        assert_eq!(sheet.rules[1].selector.classes, vec!["note".to_string()]);
        assert_eq!(sheet.rules[2].selector.id.as_deref(), Some("title"));
        assert_eq!(sheet.rules[2].selector.specificity(), (1, 0, 0));
    }

    #[test]
    fn cascade_orders_by_specificity_then_source() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <style>
    .a.b { fill: #000003 }
    text.a { fill: #000002 }
    text { fill: #000001; font-size: 9px }
    .a { fill: #000004 }
  </style>
  <text class="a b" fill="green">O</text>
  <text class="a" fill="green">O</text>
  <text fill="green">O</text>
  <text class="a" style="fill:#00ff00">O</text>
</svg>"##;
        let doc = Document::parse(svg).unwrap();
        let texts: Vec<&Element> = doc
            .root
            .child_elements()
            .map(|(_, e)| e)
            .filter(|e| e.is_svg("text"))
            .collect();
        assert_eq!(texts[0].property("fill").as_deref(), Some("#000003"));
        assert_eq!(texts[1].property("fill").as_deref(), Some("#000002"));
        assert_eq!(texts[2].property("fill").as_deref(), Some("#000001"));
        assert_eq!(texts[2].property("font-size").as_deref(), Some("9px"));
        // Inline style outranks the sheet.
        assert_eq!(texts[3].property("fill").as_deref(), Some("#00ff00"));
    }

    #[test]
    fn non_css_style_elements_are_ignored() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <style type="text/less">text { fill: red }</style>
  <text fill="green">O</text>
</svg>"##;
        let doc = Document::parse(svg).unwrap();
        let text = doc.root.child_elements().nth(1).unwrap().1;
        assert_eq!(text.property("fill").as_deref(), Some("green"));
    }
}

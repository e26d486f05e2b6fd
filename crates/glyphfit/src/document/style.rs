use serde::{Deserialize, Serialize};

use super::Element;

/// Default font size in user units when nothing on the ancestor chain sets one.
const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Split an inline `style` attribute into ordered `(property, value)` pairs.
pub fn parse_style_attribute(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim();
            let v = v.trim().trim_end_matches("!important").trim();
            if k.is_empty() || v.is_empty() {
                return None;
            }
            Some((k.to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}

/// Parse a CSS colour into RGB. Supports `#rgb`, `#rrggbb`, `rgb(r,g,b)` and
/// a handful of keywords.
pub fn parse_color(s: &str) -> Option<[u8; 3]> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digits: Vec<u8> = hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| d as u8))
            .collect::<Option<_>>()?;
        return match digits.len() {
            3 => Some([digits[0] * 17, digits[1] * 17, digits[2] * 17]),
            6 => Some([
                digits[0] * 16 + digits[1],
                digits[2] * 16 + digits[3],
                digits[4] * 16 + digits[5],
            ]),
            _ => None,
        };
    }
    if let Some(inner) = s
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<u8> = inner
            .split(',')
            .map(|p| {
                let p = p.trim();
                match p.strip_suffix('%') {
                    Some(pct) => pct
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .map(|v| (v.clamp(0.0, 100.0) * 2.55).round() as u8),
                    None => p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8),
                }
            })
            .collect::<Option<_>>()?;
        return (parts.len() == 3).then(|| [parts[0], parts[1], parts[2]]);
    }
    match s.to_ascii_lowercase().as_str() {
        "white" => Some([255, 255, 255]),
        "black" => Some([0, 0, 0]),
        "red" => Some([255, 0, 0]),
        "green" => Some([0, 128, 0]),
        "blue" => Some([0, 0, 255]),
        "gray" | "grey" => Some([128, 128, 128]),
        "silver" => Some([192, 192, 192]),
        "yellow" => Some([255, 255, 0]),
        _ => None,
    }
}

/// `text-anchor` of a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

/// Font attributes carried by a glyph occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontAttrs {
    pub family: String,
    /// Computed size in user units.
    pub size: f64,
    pub weight: String,
    pub style: String,
}

impl Default for FontAttrs {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size: DEFAULT_FONT_SIZE,
            weight: "normal".to_string(),
            style: "normal".to_string(),
        }
    }
}

/// Inherited presentation state while walking the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct InheritedStyle {
    pub font: FontAttrs,
    /// Fill paint as written (`#000000`, `none`, `url(#g)`), `currentColor` resolved.
    pub fill: String,
    pub stroke: Option<String>,
    pub color: String,
    pub anchor: TextAnchor,
    pub preserve_space: bool,
}

impl Default for InheritedStyle {
    fn default() -> Self {
        Self {
            font: FontAttrs::default(),
            fill: "#000000".to_string(),
            stroke: None,
            color: "#000000".to_string(),
            anchor: TextAnchor::Start,
            preserve_space: false,
        }
    }
}

impl InheritedStyle {
    /// Style of `el` given its parent's style.
    pub fn inherit(&self, el: &Element) -> Self {
        let mut out = self.clone();

        if let Some(color) = el.property("color").filter(|v| v != "inherit") {
            out.color = color;
        }
        if let Some(size) = el
            .property("font-size")
            .and_then(|v| parse_font_size(&v, self.font.size))
        {
            out.font.size = size;
        }
        if let Some(family) = el.property("font-family").filter(|v| v != "inherit") {
            out.font.family = family;
        }
        if let Some(weight) = el.property("font-weight").filter(|v| v != "inherit") {
            out.font.weight = weight;
        }
        if let Some(style) = el.property("font-style").filter(|v| v != "inherit") {
            out.font.style = style;
        }
        if let Some(fill) = el.property("fill").filter(|v| v != "inherit") {
            out.fill = resolve_current_color(fill, &out.color);
        }
        if let Some(stroke) = el.property("stroke").filter(|v| v != "inherit") {
            out.stroke = match stroke.as_str() {
                "none" => None,
                _ => Some(resolve_current_color(stroke, &out.color)),
            };
        }
        match el.property("text-anchor").as_deref() {
            Some("start") => out.anchor = TextAnchor::Start,
            Some("middle") => out.anchor = TextAnchor::Middle,
            Some("end") => out.anchor = TextAnchor::End,
            _ => {}
        }
        match el.attr("xml:space") {
            Some("preserve") => out.preserve_space = true,
            Some("default") => out.preserve_space = false,
            _ => {}
        }
        out
    }
}

fn resolve_current_color(paint: String, color: &str) -> String {
    if paint.eq_ignore_ascii_case("currentcolor") {
        color.to_string()
    } else {
        paint
    }
}

/// Parse a `font-size` value relative to the parent size.
fn parse_font_size(value: &str, parent: f64) -> Option<f64> {
    let v = value.trim();
    let (num, factor) = if let Some(n) = v.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = v.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else if let Some(n) = v.strip_suffix("em") {
        (n, parent)
    } else if let Some(n) = v.strip_suffix('%') {
        (n, parent / 100.0)
    } else {
        (v, 1.0)
    };
    let size = num.trim().parse::<f64>().ok()? * factor;
    (size.is_finite() && size > 0.0).then_some(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn first_child(svg: &str) -> Element {
        let doc = Document::parse(svg).unwrap();
        let el = doc.root.child_elements().next().unwrap().1.clone();
        el
    }

    #[test]
    fn parses_colors() {
        assert_eq!(parse_color("#fff"), Some([255, 255, 255]));
        assert_eq!(parse_color("#1a2B3c"), Some([0x1a, 0x2b, 0x3c]));
        assert_eq!(parse_color("rgb(10, 20 ,30)"), Some([10, 20, 30]));
        assert_eq!(parse_color("White"), Some([255, 255, 255]));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("url(#g)"), None);
    }

    #[test]
    fn style_declarations_win_over_attributes() {
        let el = first_child(
            r#"<svg><text fill="red" style="fill: blue; font-size: 2em" font-size="30">O</text></svg>"#,
        );
        let style = InheritedStyle::default().inherit(&el);
        assert_eq!(style.fill, "blue");
        assert_eq!(style.font.size, 32.0);
    }

    #[test]
    fn font_size_units() {
        assert_eq!(parse_font_size("12", 16.0), Some(12.0));
        assert_eq!(parse_font_size("12px", 16.0), Some(12.0));
        assert_eq!(parse_font_size("9pt", 16.0), Some(12.0));
        assert_eq!(parse_font_size("150%", 10.0), Some(15.0));
        assert_eq!(parse_font_size("large", 10.0), None);
        assert_eq!(parse_font_size("-3", 10.0), None);
    }

    #[test]
    fn current_color_and_anchor_are_resolved() {
        let el = first_child(
            r##"<svg><text color="#00ff00" fill="currentColor" stroke="none" text-anchor="middle" xml:space="preserve">O</text></svg>"##,
        );
        let style = InheritedStyle::default().inherit(&el);
        assert_eq!(style.fill, "#00ff00");
        assert_eq!(style.stroke, None);
        assert_eq!(style.anchor, TextAnchor::Middle);
        assert!(style.preserve_space);
    }
}

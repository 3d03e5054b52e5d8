//! A small serialisable element tree and its HTML form.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

const VOID_TAGS: [&str; 3] = ["img", "br", "hr"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomNode {
    pub tag: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub style: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl DomNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn style(mut self, key: &str, value: impl Into<String>) -> Self {
        self.style.insert(key.to_string(), value.into());
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: DomNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = DomNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Pre-order search.
    pub fn find(&self, pred: &impl Fn(&DomNode) -> bool) -> Option<&DomNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }

    pub fn find_all<'a>(&'a self, pred: &impl Fn(&DomNode) -> bool, out: &mut Vec<&'a DomNode>) {
        if pred(self) {
            out.push(self);
        }
        for c in &self.children {
            c.find_all(pred, out);
        }
    }

    /// First element whose attribute `key` equals `value`.
    pub fn find_by_attr(&self, key: &str, value: &str) -> Option<&DomNode> {
        self.find(&|n| n.attrs.get(key).is_some_and(|v| v == value))
    }

    pub fn count_with_class(&self, class: &str) -> usize {
        let mut out = Vec::new();
        self.find_all(&|n| n.has_class(class), &mut out);
        out.len()
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = self.text.clone().unwrap_or_default();
        for c in &self.children {
            out.push_str(&c.text_content());
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out, 0);
        out
    }

    fn write_html(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.tag);
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&self.classes.join(" ")));
        }
        for (k, v) in &self.attrs {
            let _ = write!(out, " {k}=\"{}\"", escape(v));
        }
        if !self.style.is_empty() {
            let css: Vec<String> = self.style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            let _ = write!(out, " style=\"{}\"", escape(&css.join("; ")));
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            out.push('\n');
            return;
        }
        if let Some(text) = &self.text {
            out.push_str(&escape(text));
        }
        if self.children.is_empty() {
            let _ = writeln!(out, "</{}>", self.tag);
            return;
        }
        out.push('\n');
        for c in &self.children {
            c.write_html(out, depth + 1);
        }
        let _ = writeln!(out, "{indent}</{}>", self.tag);
    }
}

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// CSS number: at most three decimals, no trailing zeros.
pub fn css_num(v: f32) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

pub fn px(v: f32) -> String {
    format!("{}px", css_num(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_attributes_styles_and_escapes_text() {
        let node = DomNode::new("div")
            .class("card")
            .class("wide")
            .attr("data-id", "a\"b")
            .style("width", px(120.0))
            .child(DomNode::new("h3").text("Fish & <Chips>"))
            .child(DomNode::new("img").attr("src", "/x.png"));
        let html = node.to_html();
        assert!(html.starts_with("<div class=\"card wide\" data-id=\"a&quot;b\" style=\"width: 120px\">"));
        assert!(html.contains("<h3>Fish &amp; &lt;Chips&gt;</h3>"));
        assert!(html.contains("<img src=\"/x.png\">\n"));
        assert!(!html.contains("</img>"));
        assert!(html.trim_end().ends_with("</div>"));
    }

    #[test]
    fn css_numbers_are_trimmed() {
        assert_eq!(css_num(1.0), "1");
        assert_eq!(css_num(0.25), "0.25");
        assert_eq!(css_num(-0.0001), "0");
        assert_eq!(css_num(1.23456), "1.235");
        assert_eq!(css_num(f32::NAN), "0");
    }

    #[test]
    fn queries_walk_the_tree() {
        let tree = DomNode::new("ul").children((0..3).map(|i| {
            DomNode::new("li")
                .class("item")
                .attr("data-i", i.to_string())
                .text(format!("#{i}"))
        }));
        assert_eq!(tree.count_with_class("item"), 3);
        assert_eq!(tree.find_by_attr("data-i", "2").map(|n| n.text_content()), Some("#2".to_string()));
        assert_eq!(tree.text_content(), "#0#1#2");
    }
}

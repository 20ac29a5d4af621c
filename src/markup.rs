//! Markup building blocks: class sets, attribute lists and the two tag shapes
//! an image renders to.
//!
//! Values are escaped with maud's escaper, so an alt text of `Fish & "Chips"`
//! comes out as `Fish &amp; &quot;Chips&quot;`. Names are not escaped; callers
//! only pass names accepted by [`is_valid_attr_name`].

use maud::html;

/// Escape text for use inside a double-quoted attribute value.
pub fn escape(value: &str) -> String {
    html! { (value) }.into_string()
}

/// Whether `name` can be emitted as an attribute name unquoted.
pub fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '='))
}

/// Ordered set of class names, first insertion wins the position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassList(Vec<String>);

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every whitespace-separated token not already present.
    pub fn add(&mut self, tokens: &str) {
        for token in tokens.split_whitespace() {
            if !self.contains(token) {
                self.0.push(token.to_string());
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|c| c == token)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-separated, as it goes into a `class` attribute.
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

/// Ordered attribute list. Setting an existing name replaces its value in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    /// Set `name` only when `value` is non-empty.
    pub fn set_non_empty(&mut self, name: &str, value: &str) {
        if !value.is_empty() {
            self.set(name, value);
        }
    }

    /// Set `name` only when it has not been set yet.
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) {
        if !self.contains(name) {
            self.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// ` name="value"` for every attribute, in order.
    fn to_html(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!(" {}=\"{}\"", name, escape(value)))
            .collect()
    }
}

/// A self-closing `<img ... />` tag.
pub fn img_tag(attrs: &Attributes) -> String {
    format!("<img{} />", attrs.to_html())
}

/// A `<div>` wrapping an SVG document verbatim.
pub fn inline_svg(attrs: &Attributes, svg: &str) -> String {
    format!("<div{}>{}</div>", attrs.to_html(), svg.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_quotes_and_ampersands() {
        assert_eq!(escape(r#"Fish & "Chips""#), "Fish &amp; &quot;Chips&quot;");
        assert_eq!(escape("<b>"), "&lt;b&gt;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn class_list_dedups_in_order() {
        let mut classes = ClassList::new();
        classes.add("a b");
        classes.add("b  c");
        assert_eq!(classes.as_slice(), ["a", "b", "c"]);
        assert_eq!(classes.joined(), "a b c");
    }

    #[test]
    fn class_list_ignores_blank_input() {
        let mut classes = ClassList::new();
        classes.add("   ");
        assert!(classes.is_empty());
    }

    #[test]
    fn attributes_last_write_wins_keeps_position() {
        let mut attrs = Attributes::new();
        attrs.set("id", "one");
        attrs.set("role", "img");
        attrs.set("id", "two");
        let pairs: Vec<_> = attrs.iter().collect();
        assert_eq!(pairs, vec![("id", "two"), ("role", "img")]);
    }

    #[test]
    fn set_default_does_not_override() {
        let mut attrs = Attributes::new();
        attrs.set("width", "10");
        attrs.set_default("width", "99");
        attrs.set_default("height", "5");
        assert_eq!(attrs.get("width"), Some("10"));
        assert_eq!(attrs.get("height"), Some("5"));
    }

    #[test]
    fn set_non_empty_skips_blank_values() {
        let mut attrs = Attributes::new();
        attrs.set_non_empty("alt", "");
        attrs.set_non_empty("src", "/a.jpg");
        assert!(!attrs.contains("alt"));
        assert_eq!(attrs.get("src"), Some("/a.jpg"));
    }

    #[test]
    fn img_tag_escapes_values() {
        let mut attrs = Attributes::new();
        attrs.set("src", "/a.jpg?x=1&y=2");
        attrs.set("alt", "\"quoted\"");
        assert_eq!(
            img_tag(&attrs),
            r#"<img src="/a.jpg?x=1&amp;y=2" alt="&quot;quoted&quot;" />"#
        );
    }

    #[test]
    fn inline_svg_keeps_document_verbatim() {
        let mut attrs = Attributes::new();
        attrs.set("class", "svg icon");
        assert_eq!(
            inline_svg(&attrs, "<svg><path d=\"M0 0\"/></svg>\n"),
            "<div class=\"svg icon\"><svg><path d=\"M0 0\"/></svg></div>"
        );
    }

    #[test]
    fn attribute_names() {
        assert!(is_valid_attr_name("data-id"));
        assert!(is_valid_attr_name("aria-label"));
        assert!(!is_valid_attr_name(""));
        assert!(!is_valid_attr_name("on click"));
        assert!(!is_valid_attr_name("x\"y"));
    }
}

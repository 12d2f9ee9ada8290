//! Minimal markup builder.
//!
//! [`MarkupBuilder`] renders opening, self-closing and closing tags and keeps
//! track of which elements are still open so they can be closed in order.
//! [`CapturingBuilder`] wraps it and additionally accumulates every fragment it
//! emits, so a whole form can be assembled and taken out in one piece.
//!
//! Attribute values are written as given. Callers embedding user data are
//! expected to pass it through [`escape`] first.

/// A single attribute entry.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Attr {
    /// `name="value"`, skipped when the value is `None`.
    Named(String, Option<String>),
    /// Valueless attribute such as `novalidate`, skipped when `None`.
    Bare(Option<String>),
}

/// Ordered attribute list for an element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<Attr>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named attribute. Replaces an existing entry of the same name in
    /// place, otherwise appends.
    pub fn set(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_opt(name, Some(value.into()))
    }

    /// Like [`Attributes::set`], but a `None` value is kept as a null entry and
    /// never rendered.
    pub fn set_opt(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.insert(name.into(), value);
        self
    }

    /// Append a valueless attribute such as `selected` or `novalidate`.
    pub fn flag(mut self, value: impl Into<String>) -> Self {
        self.entries.push(Attr::Bare(Some(value.into())));
        self
    }

    pub fn insert(&mut self, name: String, value: Option<String>) {
        let existing = self.entries.iter_mut().find_map(|entry| match entry {
            Attr::Named(n, v) if *n == name => Some(v),
            _ => None,
        });
        match existing {
            Some(slot) => *slot = value,
            None => self.entries.push(Attr::Named(name, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as it appears after the tag name: a leading space followed by
    /// the space separated attributes, or nothing when none survive.
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Attr::Named(name, Some(value)) => Some(format!("{name}=\"{value}\"")),
                Attr::Bare(Some(value)) => Some(value.clone()),
                _ => None,
            })
            .collect();

        if parts.is_empty() {
            String::new()
        } else {
            format!(" {}", parts.join(" "))
        }
    }
}

/// Escape text for use inside element content or a quoted attribute value.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders fragments and tracks open elements. Never buffers output.
#[derive(Debug, Default)]
pub struct MarkupBuilder {
    open_tags: Vec<String>,
}

impl MarkupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an element, leaving it on the stack until closed.
    pub fn open(&mut self, tag: &str, attrs: &Attributes) -> String {
        self.open_tags.push(tag.to_string());
        format!("<{tag}{}>", attrs.render())
    }

    /// Render a self closing element. The open-tag stack is untouched.
    pub fn single(&self, tag: &str, attrs: &Attributes) -> String {
        format!("<{tag}{} />", attrs.render())
    }

    /// Close up to `count` open elements, innermost first. Stops early once
    /// nothing is left open.
    pub fn close(&mut self, count: usize) -> String {
        let mut out = String::new();
        for _ in 0..count {
            match self.open_tags.pop() {
                Some(tag) => {
                    out.push_str("</");
                    out.push_str(&tag);
                    out.push('>');
                }
                None => break,
            }
        }
        out
    }

    /// Close every open element.
    pub fn close_all(&mut self) -> String {
        self.close(usize::MAX)
    }

    /// Render a complete element in one go.
    pub fn element(&self, tag: &str, attrs: &Attributes, content: &str) -> String {
        format!("<{tag}{}>{content}</{tag}>", attrs.render())
    }

    /// [`MarkupBuilder::element`] without attributes.
    pub fn element_text(&self, tag: &str, content: &str) -> String {
        self.element(tag, &Attributes::default(), content)
    }

    /// Number of elements currently open.
    pub fn depth(&self) -> usize {
        self.open_tags.len()
    }
}

/// A [`MarkupBuilder`] that also appends every fragment it returns to an
/// internal buffer, drained by [`CapturingBuilder::render`].
#[derive(Debug, Default)]
pub struct CapturingBuilder {
    inner: MarkupBuilder,
    output: String,
}

impl CapturingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn capture(&mut self, fragment: String) -> String {
        self.output.push_str(&fragment);
        fragment
    }

    pub fn open(&mut self, tag: &str, attrs: &Attributes) -> String {
        let fragment = self.inner.open(tag, attrs);
        self.capture(fragment)
    }

    pub fn single(&mut self, tag: &str, attrs: &Attributes) -> String {
        let fragment = self.inner.single(tag, attrs);
        self.capture(fragment)
    }

    pub fn close(&mut self, count: usize) -> String {
        let fragment = self.inner.close(count);
        self.capture(fragment)
    }

    pub fn close_all(&mut self) -> String {
        let fragment = self.inner.close_all();
        self.capture(fragment)
    }

    pub fn element(&mut self, tag: &str, attrs: &Attributes, content: &str) -> String {
        let fragment = self.inner.element(tag, attrs, content);
        self.capture(fragment)
    }

    pub fn element_text(&mut self, tag: &str, content: &str) -> String {
        let fragment = self.inner.element_text(tag, content);
        self.capture(fragment)
    }

    /// Append raw markup to the buffer.
    pub fn append(&mut self, raw: &str) {
        self.output.push_str(raw);
    }

    /// Take everything captured so far, leaving the buffer empty.
    pub fn render(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn depth(&self) -> usize {
        self.inner.depth()
    }
}

impl From<CapturingBuilder> for String {
    fn from(builder: CapturingBuilder) -> Self {
        builder.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_attributes_render_in_insertion_order() {
        let attrs = Attributes::new()
            .set("action", "options.php")
            .set("method", "POST")
            .flag("novalidate");
        assert_eq!(
            attrs.render(),
            r#" action="options.php" method="POST" novalidate"#
        );
    }

    #[test]
    fn test_attributes_skip_null_values() {
        let attrs = Attributes::new()
            .set_opt("value", None)
            .set("type", "text");
        assert_eq!(attrs.render(), r#" type="text""#);
    }

    #[test]
    fn test_attributes_all_null_render_empty() {
        let attrs = Attributes::new().set_opt("value", None);
        assert_eq!(attrs.render(), "");
        assert_eq!(MarkupBuilder::new().single("br", &attrs), "<br />");
    }

    #[test]
    fn test_attributes_set_replaces_in_place() {
        let attrs = Attributes::new()
            .set("id", "a")
            .set("type", "hidden")
            .set("id", "b");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.render(), r#" id="b" type="hidden""#);
    }

    #[test]
    fn test_open_and_close_nested() {
        let mut html = MarkupBuilder::new();
        assert_eq!(
            html.open("div", &Attributes::new().set("class", "wrap")),
            r#"<div class="wrap">"#
        );
        assert_eq!(html.open("form", &Attributes::new()), "<form>");
        assert_eq!(html.depth(), 2);
        assert_eq!(html.close(1), "</form>");
        assert_eq!(html.close_all(), "</div>");
        assert_eq!(html.depth(), 0);
    }

    #[test]
    fn test_close_on_empty_stack_is_noop() {
        let mut html = MarkupBuilder::new();
        assert_eq!(html.close(3), "");
        assert_eq!(html.close_all(), "");
    }

    #[test]
    fn test_close_never_exceeds_count() {
        let mut html = MarkupBuilder::new();
        html.open("a", &Attributes::new());
        html.open("b", &Attributes::new());
        html.open("c", &Attributes::new());
        assert_eq!(html.close(2), "</c></b>");
        assert_eq!(html.depth(), 1);
    }

    #[test]
    fn test_single_does_not_touch_stack() {
        let mut html = MarkupBuilder::new();
        let out = html.single("input", &Attributes::new().set("type", "hidden"));
        assert_eq!(out, r#"<input type="hidden" />"#);
        assert_eq!(html.close_all(), "");
    }

    #[test]
    fn test_element_text_has_no_attributes() {
        let html = MarkupBuilder::new();
        assert_eq!(html.element_text("h2", "Email"), "<h2>Email</h2>");
        assert_eq!(
            html.element("option", &Attributes::new().set("value", "ssl"), "SSL"),
            r#"<option value="ssl">SSL</option>"#
        );
    }

    #[test]
    fn test_capturing_accumulates_and_drains() {
        let mut html = CapturingBuilder::new();
        html.open("p", &Attributes::new());
        html.append("raw");
        html.close_all();
        assert_eq!(html.render(), "<p>raw</p>");
        assert_eq!(html.render(), "");
    }

    #[test]
    fn test_capturing_returns_fragments_too() {
        let mut html = CapturingBuilder::new();
        assert_eq!(html.element_text("b", "x"), "<b>x</b>");
        assert_eq!(String::from(html), "<b>x</b>");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#039;");
    }

    proptest! {
        #[test]
        fn prop_close_all_reverses_open_order(tags in proptest::collection::vec("[a-z]{1,8}", 0..12)) {
            let mut html = MarkupBuilder::new();
            for tag in &tags {
                html.open(tag, &Attributes::new());
            }
            let expected: String = tags.iter().rev().map(|t| format!("</{t}>")).collect();
            prop_assert_eq!(html.close_all(), expected);
            prop_assert_eq!(html.depth(), 0);
        }

        #[test]
        fn prop_close_count_is_bounded(opened in 0usize..10, count in 0usize..15) {
            let mut html = MarkupBuilder::new();
            for _ in 0..opened {
                html.open("div", &Attributes::new());
            }
            let closed = html.close(count).matches("</div>").count();
            prop_assert_eq!(closed, count.min(opened));
            prop_assert_eq!(html.depth(), opened - closed);
        }

        #[test]
        fn prop_null_attributes_are_omitted(
            names in proptest::collection::vec("[a-z]{1,6}", 1..8),
            nulls in proptest::collection::vec(any::<bool>(), 8),
        ) {
            let mut attrs = Attributes::new();
            for (i, name) in names.iter().enumerate() {
                let key = format!("{name}{i}");
                let value = if nulls[i] { None } else { Some("v".to_string()) };
                attrs.insert(key, value);
            }
            let rendered = attrs.render();
            for (i, name) in names.iter().enumerate() {
                let needle = format!(" {name}{i}=");
                prop_assert_eq!(rendered.contains(&needle), !nulls[i]);
            }
        }
    }
}

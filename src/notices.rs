//! User visible admin notices collected while handling a request.

use crate::html::{escape, Attributes, MarkupBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

impl NoticeKind {
    fn class(&self) -> &'static str {
        match self {
            NoticeKind::Error => "error",
            NoticeKind::Success => "notice updated success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.items.push(Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.items.push(Notice {
            kind: NoticeKind::Success,
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn render(&self) -> String {
        let mut html = MarkupBuilder::new();
        let mut out = String::new();
        for notice in &self.items {
            out.push_str(&html.open("div", &Attributes::new().set("class", notice.kind.class())));
            out.push_str(&html.element_text("p", &escape(&notice.message)));
            out.push_str(&html.close(1));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_notices() {
        let mut notices = Notices::new();
        notices.error("Connection <refused>");
        notices.success("Message successfully sent");
        assert_eq!(notices.len(), 2);
        assert_eq!(
            notices.render(),
            concat!(
                r#"<div class="error"><p>Connection &lt;refused&gt;</p></div>"#,
                r#"<div class="notice updated success"><p>Message successfully sent</p></div>"#
            )
        );
    }

    #[test]
    fn test_empty_renders_nothing() {
        assert_eq!(Notices::new().render(), "");
    }
}

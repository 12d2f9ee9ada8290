use crate::html::{escape, Attributes, CapturingBuilder};

use super::types::Field;

const SECURITY_OPTIONS: &[(&str, &str)] = &[("", "Disabled"), ("ssl", "SSL"), ("tls", "TLS")];

/// How a settings field is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRenderer {
    /// Hidden `0` fallback followed by a `1` checkbox.
    Toggle,
    Text { placeholder: Option<&'static str> },
    Number { placeholder: &'static str },
    /// Never echoes the stored secret.
    Password,
    Email,
    Select { options: &'static [(&'static str, &'static str)] },
}

impl FieldRenderer {
    pub fn for_field(field: Field) -> Self {
        match field {
            Field::Smtp | Field::Auth => FieldRenderer::Toggle,
            Field::Host => FieldRenderer::Text {
                placeholder: Some("smtp.example.com"),
            },
            Field::Port => FieldRenderer::Number {
                placeholder: "25, 465 or 587",
            },
            Field::Username | Field::FromName => FieldRenderer::Text { placeholder: None },
            Field::Password => FieldRenderer::Password,
            Field::Security => FieldRenderer::Select {
                options: SECURITY_OPTIONS,
            },
            Field::From => FieldRenderer::Email,
        }
    }

    /// Render the control. `id` and `name` go on the control itself;
    /// `current` is the stored value in its form representation.
    pub fn render(&self, id: &str, name: &str, current: Option<&str>) -> String {
        let mut html = CapturingBuilder::new();
        let base = Attributes::new().set("id", id).set("name", name);
        let value = current.map(escape);

        match *self {
            FieldRenderer::Toggle => {
                let hidden = Attributes::new()
                    .set("id", format!("{id}_hidden"))
                    .set("type", "hidden")
                    .set("value", "0")
                    .set("name", name);
                html.single("input", &hidden);

                let checked = current.map_or(false, |v| !v.is_empty() && v != "0");
                let mut checkbox = base.set("type", "checkbox").set("value", "1");
                if checked {
                    checkbox = checkbox.set("checked", "checked");
                }
                html.single("input", &checkbox);
            }
            FieldRenderer::Text { placeholder } => {
                let attrs = base
                    .set("type", "text")
                    .set_opt("placeholder", placeholder.map(str::to_string))
                    .set_opt("value", value);
                html.single("input", &attrs);
            }
            FieldRenderer::Number { placeholder } => {
                let attrs = base
                    .set("type", "number")
                    .set("placeholder", placeholder)
                    .set_opt("value", value);
                html.single("input", &attrs);
            }
            FieldRenderer::Password => {
                html.single("input", &base.set("type", "password"));
            }
            FieldRenderer::Email => {
                html.single("input", &base.set("type", "email").set_opt("value", value));
            }
            FieldRenderer::Select { options } => {
                html.open("select", &base);
                for (option, label) in options {
                    let mut attrs = Attributes::new().set("value", *option);
                    if current == Some(*option) {
                        attrs = attrs.flag("selected");
                    }
                    html.element("option", &attrs, label);
                }
                html.close_all();
            }
        }

        html.render()
    }
}

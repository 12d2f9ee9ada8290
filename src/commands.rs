use std::collections::BTreeMap;

use crate::error::SettingsError;
use crate::html::{escape, Attributes, CapturingBuilder};
use crate::notices::Notices;
use crate::settings::{OptionStore, SettingsController, OPTION_NAME, PAGE};
use crate::smtp::LettreMailer;

const REFERER_FIELD: &str = "_http_referer";

// ---------- Settings page ----------

/// `GET /?page=email[&send_test]`: admin init followed by the settings form,
/// with any notices raised along the way on top.
pub async fn settings_page<S: OptionStore>(
    controller: &mut SettingsController<S>,
    send_test: bool,
) -> Result<String, SettingsError> {
    let mailer = LettreMailer::new(controller.configure_transport()?);
    let mut notices = Notices::new();

    controller.admin_init(send_test, &mailer, &mut notices).await?;

    let mut body = notices.render();
    body.push_str(&controller.render_settings_page(send_test)?);
    Ok(document("Email Settings", &body))
}

// ---------- Form submission ----------

/// `POST /options.php`: save the submitted settings and return where to send
/// the browser next.
pub fn save_settings<S: OptionStore>(
    controller: &SettingsController<S>,
    form: &[(String, String)],
) -> Result<String, SettingsError> {
    let prefix = format!("{OPTION_NAME}[");
    let mut input = BTreeMap::new();
    let mut referer = None;

    // Later duplicates win, so a ticked checkbox overrides its hidden 0
    for (key, value) in form {
        if let Some(field) = key.strip_prefix(&prefix).and_then(|k| k.strip_suffix(']')) {
            input.insert(field.to_string(), value.clone());
        } else if key == REFERER_FIELD {
            referer = Some(value.clone());
        }
    }

    controller.save(&input)?;
    Ok(redirect_target(referer))
}

/// Only same-page query strings are followed.
fn redirect_target(referer: Option<String>) -> String {
    match referer {
        Some(r) if r.starts_with('?') && !r.contains(['\r', '\n']) => r,
        _ => format!("?page={PAGE}"),
    }
}

fn document(title: &str, body: &str) -> String {
    let mut html = CapturingBuilder::new();
    html.append("<!DOCTYPE html>");
    html.open("html", &Attributes::new());
    html.open("head", &Attributes::new());
    html.single("meta", &Attributes::new().set("charset", "utf-8"));
    html.element_text("title", &escape(title));
    html.close(1);
    html.open("body", &Attributes::new());
    html.append(body);
    html.close_all();
    html.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_save_settings_checkbox_overrides_hidden() {
        let controller = SettingsController::new(MemoryStore::new(), "UTF-8");
        let location = save_settings(
            &controller,
            &pairs(&[
                ("_http_referer", "?page=email&send_test"),
                ("email_settings[smtp]", "0"),
                ("email_settings[smtp]", "1"),
                ("email_settings[auth]", "0"),
                ("email_settings[host]", "smtp.example.com"),
                ("submit", "Save Changes"),
            ]),
        )
        .unwrap();

        assert_eq!(location, "?page=email&send_test");
        let settings = controller.settings().unwrap();
        assert!(settings.smtp_enabled);
        assert!(!settings.auth_enabled);
        assert_eq!(settings.host, "smtp.example.com");
    }

    #[test]
    fn test_redirect_target_rejects_foreign_urls() {
        assert_eq!(redirect_target(None), "?page=email");
        assert_eq!(
            redirect_target(Some("https://evil.example".into())),
            "?page=email"
        );
        assert_eq!(
            redirect_target(Some("?page=email\r\nSet-Cookie: x".into())),
            "?page=email"
        );
    }

    #[test]
    fn test_document_wraps_body() {
        let doc = document("Email Settings", "<p>hi</p>");
        assert_eq!(
            doc,
            concat!(
                "<!DOCTYPE html><html><head><meta charset=\"utf-8\" />",
                "<title>Email Settings</title></head><body><p>hi</p></body></html>"
            )
        );
    }

    #[tokio::test]
    async fn test_settings_page_renders_form() {
        let mut controller = SettingsController::new(MemoryStore::new(), "UTF-8");
        let page = settings_page(&mut controller, false).await.unwrap();
        assert!(controller.is_ready());
        assert!(page.contains(r#"<form action="options.php""#));
        assert!(page.contains("Sender email address"));
    }
}

use std::collections::BTreeMap;

use serde_json::Value;

use super::fields::FieldRenderer;
use super::sanitize::{self, Mapping, SanitizeHook};
use super::store::OptionStore;
use super::types::{Field, FieldSpec, MailSettings, OPTION_NAME};
use crate::error::SettingsError;
use crate::html::{escape, Attributes, MarkupBuilder};
use crate::notices::Notices;
use crate::smtp::{self, MailTransport, Mailer, OutgoingMail, TransportMode};

/// Settings page slug, also the option group.
pub const PAGE: &str = "email";
pub const SECTION_ID: &str = "email_section";

const PASSWORD_KEY: &str = "password";
const TEST_SUBJECT: &str = "test";
const TEST_BODY: &str = "test message";
const TEST_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistration {
    pub id: String,
    pub label: String,
    pub spec: FieldSpec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub fields: Vec<FieldRegistration>,
}

/// Bridges the stored settings record to the admin form and to the mail
/// transport.
pub struct SettingsController<S> {
    store: S,
    charset: String,
    hooks: Vec<SanitizeHook>,
    sections: Vec<Section>,
}

impl<S: OptionStore> SettingsController<S> {
    pub fn new(store: S, charset: impl Into<String>) -> Self {
        Self {
            store,
            charset: charset.into(),
            hooks: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add a post-processing step to [`SettingsController::sanitize`].
    ///
    /// Only keys that are fields of [`MailSettings`] persist; anything else a
    /// hook adds is dropped on save.
    pub fn add_sanitize_hook<F>(&mut self, hook: F)
    where
        F: Fn(Mapping) -> Mapping + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
    }

    /// Whether the settings section has been registered.
    pub fn is_ready(&self) -> bool {
        !self.sections.is_empty()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Register the SMTP section with one entry per configurable field.
    pub fn register(&mut self) {
        let fields = Field::ALL
            .into_iter()
            .map(|field| FieldRegistration {
                id: format!("{OPTION_NAME}[{}]", field.key()),
                label: field.label().to_string(),
                spec: FieldSpec::for_field(field),
            })
            .collect();

        self.sections = vec![Section {
            id: SECTION_ID.to_string(),
            title: "SMTP".to_string(),
            fields,
        }];
    }

    /// Load the stored record, creating it with defaults if it does not exist
    /// yet.
    pub fn settings(&self) -> Result<MailSettings, SettingsError> {
        match self.store.get(OPTION_NAME)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => {
                let settings = MailSettings::default();
                if self.store.add(OPTION_NAME, serde_json::to_value(&settings)?)? {
                    log::info!("Initialized {OPTION_NAME} with defaults");
                }
                Ok(settings)
            }
        }
    }

    pub fn sanitize(&self, input: &BTreeMap<String, String>) -> Mapping {
        sanitize::sanitize(input, &self.hooks)
    }

    /// Sanitize a submission and persist it.
    ///
    /// The password input is never pre-filled, so an empty submitted password
    /// keeps the stored one. The stored password is filled in before the
    /// sanitize hooks run, so hooks see what will be persisted.
    pub fn save(&self, input: &BTreeMap<String, String>) -> Result<MailSettings, SettingsError> {
        let mut cleaned = sanitize::clean(input);

        let submitted = cleaned.get(PASSWORD_KEY).and_then(Value::as_str).unwrap_or_default();
        if submitted.is_empty() {
            let stored = self.settings()?.password;
            cleaned.insert(PASSWORD_KEY.to_string(), Value::String(stored));
        }

        let sanitized = sanitize::run_hooks(cleaned, &self.hooks);
        let settings: MailSettings = serde_json::from_value(Value::Object(sanitized))?;

        self.store.update(OPTION_NAME, serde_json::to_value(&settings)?)?;
        log::info!(
            "Saved {OPTION_NAME} (smtp={}, host={}, port={})",
            settings.smtp_enabled,
            settings.host,
            settings.port
        );
        Ok(settings)
    }

    /// Render one field's control from the stored record.
    pub fn render_field(&self, spec: &FieldSpec) -> Result<String, SettingsError> {
        let settings = self.settings()?;
        render_field_with(spec, &settings)
    }

    /// Render the whole settings form. `send_test` reflects whether the test
    /// send toggle is currently on.
    pub fn render_settings_page(&self, send_test: bool) -> Result<String, SettingsError> {
        let settings = self.settings()?;
        let mut html = MarkupBuilder::new();
        let mut out = String::new();

        out.push_str(&html.open("div", &Attributes::new().set("class", "wrap")));
        out.push_str(&html.open(
            "form",
            &Attributes::new()
                .set("action", "options.php")
                .set("method", "POST")
                .set("accept-charset", escape(&self.charset))
                .flag("novalidate"),
        ));
        out.push_str(&html.element_text("h2", "Email"));
        out.push_str(&html.single("br", &Attributes::new()));

        let (href, label) = if send_test {
            (
                format!("?page={PAGE}"),
                "Disable sending test email to sender upon saving",
            )
        } else {
            (
                format!("?page={PAGE}&send_test"),
                "Toggle and send immediate test email to sender",
            )
        };
        out.push_str(&html.element(
            "a",
            &Attributes::new().set("class", "button").set("href", href),
            label,
        ));

        out.push_str(&render_settings_fields(&html, send_test));
        for section in &self.sections {
            out.push_str(&render_section(&mut html, section, &settings));
        }

        out.push_str(&html.open("p", &Attributes::new().set("class", "submit")));
        out.push_str(&html.single(
            "input",
            &Attributes::new()
                .set("type", "submit")
                .set("name", "submit")
                .set("id", "submit")
                .set("class", "button button-primary")
                .set("value", "Save Changes"),
        ));
        out.push_str(&html.close(1));
        out.push_str(&html.close_all());

        Ok(out)
    }

    /// Configuration callback for a freshly built transport.
    pub fn configure_transport(
        &self,
    ) -> Result<impl Fn(MailTransport) -> MailTransport, SettingsError> {
        let settings = self.settings()?;
        Ok(move |transport: MailTransport| apply_settings(&settings, transport))
    }

    /// Send one test message to the configured sender address and queue a
    /// notice describing the outcome.
    pub async fn send_test_email<M: Mailer>(&self, mailer: &M, notices: &mut Notices) -> bool {
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Failed to load {OPTION_NAME}: {e}");
                notices.error(format!("Unable to send test email: {e}"));
                return false;
            }
        };

        if settings.from_address.parse::<lettre::Address>().is_err() {
            log::warn!("Test email skipped: invalid From address {:?}", settings.from_address);
            notices.error(
                "Unable to send test email: The 'From' email address is not correctly set.",
            );
            return false;
        }

        let mail = OutgoingMail {
            to: settings.from_address.clone(),
            subject: TEST_SUBJECT.to_string(),
            body: TEST_BODY.to_string(),
            content_type: TEST_CONTENT_TYPE.to_string(),
        };

        match mailer.deliver(&mail).await {
            Ok(()) => {
                log::info!("Test email sent to {}", mail.to);
                notices.success("Message successfully sent");
                true
            }
            Err(e) => {
                log::warn!("Test email to {} failed: {e}", mail.to);
                notices.error(e);
                false
            }
        }
    }

    /// Queue a warning when this build cannot open TLS connections.
    pub fn check_tls_capability(&self, notices: &mut Notices) -> bool {
        let available = smtp::tls_available();
        if !available {
            notices.error("Warning: TLS support is not available");
        }
        available
    }

    /// Admin initialisation for one request: registers the section, makes
    /// sure the record exists, fires the test send when asked to and checks
    /// for TLS support.
    pub async fn admin_init<M: Mailer>(
        &mut self,
        send_test: bool,
        mailer: &M,
        notices: &mut Notices,
    ) -> Result<(), SettingsError> {
        self.register();
        self.settings()?;

        if send_test {
            self.send_test_email(mailer, notices).await;
        }

        self.check_tls_capability(notices);
        Ok(())
    }
}

/// Apply stored settings to a transport object. SMTP fields are only touched
/// when SMTP is enabled; the sender is always set.
pub fn apply_settings(settings: &MailSettings, mut transport: MailTransport) -> MailTransport {
    if settings.smtp_enabled {
        transport.mode = TransportMode::Smtp;
        transport.host = settings.host.clone();
        transport.port = settings.port;
        transport.security = settings.security;
        transport.auth = settings.auth_enabled;

        if settings.auth_enabled {
            transport.username = settings.username.clone();
            transport.password = settings.password.clone();
        }
    }

    transport.from = settings.from_address.clone();
    if !settings.from_name.is_empty() {
        transport.from_name = settings.from_name.clone();
    }

    transport
}

/// Render a field control for `spec` given the current settings.
pub fn render_field_with(spec: &FieldSpec, settings: &MailSettings) -> Result<String, SettingsError> {
    let label_for = spec
        .label_for
        .as_deref()
        .ok_or(SettingsError::FieldSpec("label_for"))?;
    let key = spec.field.as_deref().ok_or(SettingsError::FieldSpec("field"))?;
    let field = Field::from_key(key).ok_or_else(|| SettingsError::UnknownField(key.to_string()))?;

    let name = format!("{OPTION_NAME}[{key}]");
    let current = settings.form_value(field);
    Ok(FieldRenderer::for_field(field).render(&escape(label_for), &name, current.as_deref()))
}

/// Hidden inputs that tie a submission back to this page.
fn render_settings_fields(html: &MarkupBuilder, send_test: bool) -> String {
    let referer = if send_test {
        format!("?page={PAGE}&send_test")
    } else {
        format!("?page={PAGE}")
    };
    html.single(
        "input",
        &Attributes::new()
            .set("type", "hidden")
            .set("name", "_http_referer")
            .set("value", referer),
    )
}

fn render_section(html: &mut MarkupBuilder, section: &Section, settings: &MailSettings) -> String {
    let mut out = html.element_text("h2", &escape(&section.title));
    out.push_str(&html.open(
        "table",
        &Attributes::new()
            .set("class", "form-table")
            .set("role", "presentation"),
    ));

    for registration in &section.fields {
        let control = match render_field_with(&registration.spec, settings) {
            Ok(control) => control,
            Err(e) => {
                log::error!("Skipping settings field {}: {e}", registration.id);
                continue;
            }
        };
        let label_for = registration.spec.label_for.as_deref().unwrap_or_default();

        out.push_str(&html.open("tr", &Attributes::new()));
        out.push_str(&html.open("th", &Attributes::new().set("scope", "row")));
        out.push_str(&html.element(
            "label",
            &Attributes::new().set("for", escape(label_for)),
            &escape(&registration.label),
        ));
        out.push_str(&html.close(1));
        out.push_str(&html.element_text("td", &control));
        out.push_str(&html.close(1));
    }

    out.push_str(&html.close(1));
    out
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::sanitize::{to_int, truthy};
use crate::smtp::Security;

/// Name the record is stored under.
pub const OPTION_NAME: &str = "email_settings";

/// The persisted mail settings record.
///
/// Reads are lenient so that sanitized submissions (`0`/`1` toggles) and
/// older hand-edited files both load. Absent fields take their defaults.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    #[serde(rename = "smtp", deserialize_with = "lenient_bool")]
    pub smtp_enabled: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub host: String,
    #[serde(deserialize_with = "lenient_int")]
    pub port: i64,
    #[serde(rename = "auth", deserialize_with = "lenient_bool")]
    pub auth_enabled: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
    #[serde(deserialize_with = "lenient_security")]
    pub security: Security,
    #[serde(rename = "from", deserialize_with = "lenient_string")]
    pub from_address: String,
    #[serde(deserialize_with = "lenient_string")]
    pub from_name: String,
}

impl MailSettings {
    /// Current value of a field as it would appear in the form, if any.
    pub fn form_value(&self, field: Field) -> Option<String> {
        let flag = |on: bool| if on { "1" } else { "0" }.to_string();
        match field {
            Field::Smtp => Some(flag(self.smtp_enabled)),
            Field::Auth => Some(flag(self.auth_enabled)),
            Field::Host => Some(self.host.clone()),
            // 0 means never configured; leave the placeholder visible
            Field::Port => (self.port != 0).then(|| self.port.to_string()),
            Field::Username => Some(self.username.clone()),
            Field::Password => Some(self.password.clone()),
            Field::Security => Some(self.security.as_str().to_string()),
            Field::From => Some(self.from_address.clone()),
            Field::FromName => Some(self.from_name.clone()),
        }
    }
}

impl std::fmt::Debug for MailSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSettings")
            .field("smtp_enabled", &self.smtp_enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_enabled", &self.auth_enabled)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security", &self.security)
            .field("from_address", &self.from_address)
            .field("from_name", &self.from_name)
            .finish()
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(truthy(&Value::deserialize(deserializer)?))
}

fn lenient_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(to_int(&Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        _ => String::new(),
    })
}

fn lenient_security<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Security, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Security::from_str_lossy(&s),
        _ => Security::None,
    })
}

/// The configurable fields, in the order they appear on the settings page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Smtp,
    Host,
    Port,
    Auth,
    Username,
    Password,
    Security,
    From,
    FromName,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Smtp,
        Field::Host,
        Field::Port,
        Field::Auth,
        Field::Username,
        Field::Password,
        Field::Security,
        Field::From,
        Field::FromName,
    ];

    /// Key used in form submissions and in the stored record.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Smtp => "smtp",
            Field::Host => "host",
            Field::Port => "port",
            Field::Auth => "auth",
            Field::Username => "username",
            Field::Password => "password",
            Field::Security => "security",
            Field::From => "from",
            Field::FromName => "from_name",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Smtp => "Enable SMTP",
            Field::Host => "SMTP Hostname",
            Field::Port => "SMTP Port number",
            Field::Auth => "Use SMTP Authentication",
            Field::Username => "SMTP Auth Username",
            Field::Password => "SMTP Auth Password",
            Field::Security => "Encryption (SSL or TLS)",
            Field::From => "Sender email address",
            Field::FromName => "Sender name",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// Which field a render call is for and which id its label points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSpec {
    pub label_for: Option<String>,
    pub field: Option<String>,
}

impl FieldSpec {
    pub fn for_field(field: Field) -> Self {
        Self {
            label_for: Some(field.key().to_string()),
            field: Some(field.key().to_string()),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Connection security for the SMTP relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Security {
    #[default]
    #[serde(rename = "")]
    None,
    /// Implicit TLS, typically port 465.
    #[serde(rename = "ssl")]
    Ssl,
    /// STARTTLS, typically port 587.
    #[serde(rename = "tls")]
    Tls,
}

impl Security {
    pub fn as_str(&self) -> &'static str {
        match self {
            Security::None => "",
            Security::Ssl => "ssl",
            Security::Tls => "tls",
        }
    }

    /// Anything unrecognised reads as no encryption.
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssl" => Security::Ssl,
            "tls" => Security::Tls,
            _ => Security::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportMode {
    /// The host's local sendmail binary.
    #[default]
    Mail,
    Smtp,
}

/// The transport object handed to the configuration callback before a send.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MailTransport {
    pub mode: TransportMode,
    pub host: String,
    pub port: i64,
    pub security: Security,
    pub auth: bool,
    pub username: String,
    pub password: String, // plaintext, never logged
    pub from: String,
    pub from_name: String,
}

impl MailTransport {
    pub fn is_smtp(&self) -> bool {
        self.mode == TransportMode::Smtp
    }
}

impl std::fmt::Debug for MailTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailTransport")
            .field("mode", &self.mode)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from", &self.from)
            .field("from_name", &self.from_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_round_trips_through_form_values() {
        for s in [Security::None, Security::Ssl, Security::Tls] {
            assert_eq!(Security::from_str_lossy(s.as_str()), s);
        }
        assert_eq!(Security::from_str_lossy("STARTTLS"), Security::None);
    }

    #[test]
    fn test_debug_redacts_password() {
        let transport = MailTransport {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let dbg = format!("{:?}", transport);
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("[REDACTED]"));
    }
}

use std::future::Future;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        AsyncSmtpTransportBuilder,
    },
    Address, AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};

use super::types::{MailTransport, OutgoingMail, Security, TransportMode};

/// Whether this build can open TLS connections.
pub fn tls_available() -> bool {
    cfg!(feature = "tls")
}

#[cfg(feature = "tls")]
fn implicit_tls_builder(host: &str) -> Result<AsyncSmtpTransportBuilder, String> {
    // Implicit TLS (typically port 465)
    AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        .map_err(|e| format!("SMTP relay error: {}", e))
}

#[cfg(feature = "tls")]
fn starttls_builder(host: &str) -> Result<AsyncSmtpTransportBuilder, String> {
    // STARTTLS (typically port 587)
    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        .map_err(|e| format!("SMTP STARTTLS error: {}", e))
}

#[cfg(not(feature = "tls"))]
fn implicit_tls_builder(_host: &str) -> Result<AsyncSmtpTransportBuilder, String> {
    Err("SSL requested but TLS support is not available".to_string())
}

#[cfg(not(feature = "tls"))]
fn starttls_builder(_host: &str) -> Result<AsyncSmtpTransportBuilder, String> {
    Err("TLS requested but TLS support is not available".to_string())
}

/// Build an async SMTP transport from a configured transport object.
///
/// Host and port are passed through as configured; a bad host only shows up
/// once the connection is attempted. Port 0 keeps the default for the chosen
/// security mode.
fn build_transport(
    transport: &MailTransport,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
    let port = u16::try_from(transport.port)
        .map_err(|_| format!("Invalid SMTP port: {}", transport.port))?;

    let mut builder = match transport.security {
        Security::Ssl => implicit_tls_builder(&transport.host)?,
        Security::Tls => starttls_builder(&transport.host)?,
        // Plain / no encryption (typically port 25)
        Security::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&transport.host),
    };

    if port != 0 {
        builder = builder.port(port);
    }

    if transport.auth {
        let credentials =
            Credentials::new(transport.username.clone(), transport.password.clone());
        builder = builder
            .credentials(credentials)
            .authentication(vec![Mechanism::Plain, Mechanism::Login]);
    }

    Ok(builder.build())
}

/// Build the message with the transport's sender as From.
fn build_message(transport: &MailTransport, mail: &OutgoingMail) -> Result<Message, String> {
    let from_addr: Address = transport
        .from
        .parse()
        .map_err(|e| format!("Invalid From address '{}': {}", transport.from, e))?;
    let from_name = (!transport.from_name.is_empty()).then(|| transport.from_name.clone());

    let to_addr: Address = mail
        .to
        .parse()
        .map_err(|e| format!("Invalid recipient address '{}': {}", mail.to, e))?;

    let content_type = ContentType::parse(&mail.content_type)
        .map_err(|e| format!("Invalid content type '{}': {}", mail.content_type, e))?;

    Message::builder()
        .from(Mailbox::new(from_name, from_addr))
        .to(Mailbox::new(None, to_addr))
        .subject(mail.subject.clone())
        .header(content_type)
        .body(mail.body.clone())
        .map_err(|e| format!("Message build error: {}", e))
}

/// Deliver one message through whatever the transport object is set up for.
///
/// The `Err` string is the transport's last error message, suitable for
/// showing to the user as is.
pub async fn send_mail(transport: &MailTransport, mail: &OutgoingMail) -> Result<(), String> {
    let message = build_message(transport, mail)?;

    match transport.mode {
        TransportMode::Smtp => {
            let smtp = build_transport(transport)?;
            log::info!(
                "Sending mail via SMTP {}:{} ({:?})",
                transport.host,
                transport.port,
                transport.security
            );
            smtp.send(message)
                .await
                .map(|_response| ())
                .map_err(|e| format!("SMTP send error: {}", e))
        }
        TransportMode::Mail => {
            log::info!("Sending mail via local sendmail");
            AsyncSendmailTransport::<Tokio1Executor>::new()
                .send(message)
                .await
                .map_err(|e| format!("Sendmail error: {}", e))
        }
    }
}

/// The "send mail" function the controller talks to.
pub trait Mailer {
    fn deliver(&self, mail: &OutgoingMail) -> impl Future<Output = Result<(), String>>;
}

/// [`Mailer`] backed by lettre. Every delivery starts from a fresh
/// [`MailTransport`] shaped by the configuration callback.
pub struct LettreMailer<F> {
    configure: F,
}

impl<F> LettreMailer<F>
where
    F: Fn(MailTransport) -> MailTransport,
{
    pub fn new(configure: F) -> Self {
        Self { configure }
    }
}

impl<F> Mailer for LettreMailer<F>
where
    F: Fn(MailTransport) -> MailTransport,
{
    async fn deliver(&self, mail: &OutgoingMail) -> Result<(), String> {
        let transport = (self.configure)(MailTransport::default());
        log::debug!("Configured transport: {:?}", transport);
        send_mail(&transport, mail).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> MailTransport {
        MailTransport {
            mode: TransportMode::Smtp,
            host: "localhost".to_string(),
            port: 2525,
            from: "max@example.com".to_string(),
            from_name: "Max".to_string(),
            ..Default::default()
        }
    }

    fn mail() -> OutgoingMail {
        OutgoingMail {
            to: "max@example.com".to_string(),
            subject: "test".to_string(),
            body: "test message".to_string(),
            content_type: "text/html; charset=UTF-8".to_string(),
        }
    }

    #[test]
    fn test_build_message_valid() {
        let message = build_message(&transport(), &mail()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: Max <max@example.com>"));
        assert!(raw.contains("To: max@example.com"));
        assert!(raw.contains("Subject: test"));
        assert!(raw.contains("text/html"));
        assert_eq!(message.envelope().to().len(), 1);
    }

    #[test]
    fn test_build_message_without_display_name() {
        let mut t = transport();
        t.from_name.clear();
        let message = build_message(&t, &mail()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: max@example.com"));
    }

    #[test]
    fn test_build_message_invalid_from() {
        let mut t = transport();
        t.from = "not-an-email".to_string();
        let err = build_message(&t, &mail()).unwrap_err();
        assert!(err.contains("Invalid From address"));
    }

    #[test]
    fn test_build_message_invalid_content_type() {
        let mut m = mail();
        m.content_type = "garbage".to_string();
        let err = build_message(&transport(), &m).unwrap_err();
        assert!(err.contains("Invalid content type"));
    }

    #[test]
    fn test_build_transport_plain() {
        assert!(build_transport(&transport()).is_ok());
    }

    #[test]
    fn test_build_transport_with_auth() {
        let mut t = transport();
        t.auth = true;
        t.username = "user".to_string();
        t.password = "secret".to_string();
        assert!(build_transport(&t).is_ok());
    }

    #[test]
    fn test_build_transport_port_out_of_range() {
        let mut t = transport();
        t.port = 70000;
        let err = build_transport(&t).unwrap_err();
        assert!(err.contains("Invalid SMTP port"));

        t.port = -1;
        assert!(build_transport(&t).is_err());
    }

    #[cfg(feature = "tls")]
    #[test]
    fn test_build_transport_tls_modes() {
        let mut t = transport();
        t.security = Security::Ssl;
        assert!(build_transport(&t).is_ok());
        t.security = Security::Tls;
        assert!(build_transport(&t).is_ok());
    }

    #[cfg(not(feature = "tls"))]
    #[test]
    fn test_build_transport_tls_unavailable() {
        let mut t = transport();
        t.security = Security::Ssl;
        assert!(build_transport(&t).unwrap_err().contains("not available"));
    }

    #[tokio::test]
    async fn test_send_mail_rejects_bad_port_before_connecting() {
        let mut t = transport();
        t.port = 99999;
        let err = send_mail(&t, &mail()).await.unwrap_err();
        assert!(err.contains("Invalid SMTP port"));
    }
}

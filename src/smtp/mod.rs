pub mod client;
pub mod types;

pub use client::{send_mail, tls_available, LettreMailer, Mailer};
pub use types::{MailTransport, OutgoingMail, Security, TransportMode};

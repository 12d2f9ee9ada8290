//! Route outgoing mail through an authenticated SMTP relay.
//!
//! The [`settings::SettingsController`] owns the stored relay settings: it
//! renders the admin form, sanitizes submissions and produces the callback
//! that configures a [`smtp::MailTransport`] before each delivery. The
//! [`server`] module exposes it over a small HTTP endpoint.

pub mod commands;
pub mod config;
pub mod error;
pub mod html;
pub mod notices;
pub mod server;
pub mod settings;
pub mod smtp;

pub use config::AppConfig;
pub use error::{ConfigError, SettingsError};

/// Install the global logger. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Run the admin endpoint until the listener fails.
pub async fn run(config: AppConfig) -> std::io::Result<()> {
    if !smtp::tls_available() {
        log::warn!("Built without TLS support; ssl/tls relays will fail");
    }
    server::serve(config).await
}

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

const DEFAULT_BIND: &str = "127.0.0.1:8025";
const DEFAULT_STORE: &str = "email_settings.json";
const DEFAULT_CHARSET: &str = "UTF-8";

/// Process level configuration for the admin endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Address the admin endpoint listens on.
    pub bind: SocketAddr,
    /// JSON file holding the persisted options.
    pub store_path: PathBuf,
    /// Charset advertised by the settings form.
    pub charset: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8025)),
            store_path: PathBuf::from(DEFAULT_STORE),
            charset: DEFAULT_CHARSET.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// - `MINSMTP_BIND` (default `127.0.0.1:8025`)
    /// - `MINSMTP_STORE` (default `email_settings.json`)
    /// - `MINSMTP_CHARSET` (default `UTF-8`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind = lookup("MINSMTP_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: "MINSMTP_BIND",
                reason: e.to_string(),
            })?;

        let store_path = lookup("MINSMTP_STORE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE));

        let charset = lookup("MINSMTP_CHARSET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string());

        Ok(Self {
            bind,
            store_path,
            charset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MINSMTP_BIND", "0.0.0.0:9000"),
            ("MINSMTP_STORE", "/tmp/opts.json"),
            ("MINSMTP_CHARSET", "ISO-8859-1"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.store_path, PathBuf::from("/tmp/opts.json"));
        assert_eq!(config.charset, "ISO-8859-1");
    }

    #[test]
    fn test_invalid_bind() {
        let err = AppConfig::from_lookup(lookup(&[("MINSMTP_BIND", "nope")])).unwrap_err();
        assert!(err.to_string().contains("MINSMTP_BIND"));
    }
}

/// Errors raised by the settings controller and its option store.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A field was registered without `label_for` or `field`.
    #[error("settings field incorrectly configured: missing {0}")]
    FieldSpec(&'static str),

    /// A field name with no renderer attached to it.
    #[error("unknown settings field: {0}")]
    UnknownField(String),

    /// The option store holds something other than a JSON object.
    #[error("option store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

pub mod controller;
pub mod fields;
pub mod sanitize;
pub mod store;
pub mod types;

pub use controller::{apply_settings, SettingsController, PAGE};
pub use fields::FieldRenderer;
pub use sanitize::{Mapping, SanitizeHook};
pub use store::{JsonFileStore, MemoryStore, OptionStore};
pub use types::{Field, FieldSpec, MailSettings, OPTION_NAME};

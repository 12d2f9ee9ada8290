use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::SettingsError;

/// Named option storage.
pub trait OptionStore {
    fn get(&self, name: &str) -> Result<Option<Value>, SettingsError>;

    /// Store `value` only if nothing is stored under `name` yet. Returns
    /// whether it was added.
    fn add(&self, name: &str, value: Value) -> Result<bool, SettingsError>;

    /// Store `value`, replacing whatever was there.
    fn update(&self, name: &str, value: Value) -> Result<(), SettingsError>;
}

/// Keeps all options in a single JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(SettingsError::Store(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn save(&self, options: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves a half written file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(options)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl OptionStore for JsonFileStore {
    fn get(&self, name: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.load()?.remove(name))
    }

    fn add(&self, name: &str, value: Value) -> Result<bool, SettingsError> {
        let mut options = self.load()?;
        if options.contains_key(name) {
            return Ok(false);
        }
        options.insert(name.to_string(), value);
        self.save(&options)?;
        Ok(true)
    }

    fn update(&self, name: &str, value: Value) -> Result<(), SettingsError> {
        let mut options = self.load()?;
        options.insert(name.to_string(), value);
        self.save(&options)
    }
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    options: RefCell<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OptionStore for MemoryStore {
    fn get(&self, name: &str) -> Result<Option<Value>, SettingsError> {
        Ok(self.options.borrow().get(name).cloned())
    }

    fn add(&self, name: &str, value: Value) -> Result<bool, SettingsError> {
        let mut options = self.options.borrow_mut();
        if options.contains_key(name) {
            return Ok(false);
        }
        options.insert(name.to_string(), value);
        Ok(true)
    }

    fn update(&self, name: &str, value: Value) -> Result<(), SettingsError> {
        self.options.borrow_mut().insert(name.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("options.json"));
        assert_eq!(store.get("email_settings").unwrap(), None);
    }

    #[test]
    fn test_file_store_add_then_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/options.json"));

        assert!(store.add("email_settings", json!({"host": "a"})).unwrap());
        assert!(!store.add("email_settings", json!({"host": "b"})).unwrap());
        assert_eq!(store.get("email_settings").unwrap(), Some(json!({"host": "a"})));

        store.update("email_settings", json!({"host": "c"})).unwrap();
        assert_eq!(store.get("email_settings").unwrap(), Some(json!({"host": "c"})));
        assert!(store.path().exists());
    }

    #[test]
    fn test_file_store_keeps_other_options() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("options.json"));
        store.update("other", json!(1)).unwrap();
        store.update("email_settings", json!({})).unwrap();
        assert_eq!(store.get("other").unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_file_store_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, "[1, 2]").unwrap();
        let err = JsonFileStore::new(&path).get("x").unwrap_err();
        assert!(matches!(err, SettingsError::Store(_)));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.add("k", json!(1)).unwrap());
        assert!(!store.add("k", json!(2)).unwrap());
        store.update("k", json!(3)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(3)));
    }
}

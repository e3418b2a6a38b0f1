use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("failed to read `{key}`: {reason}")]
    Read { key: String, reason: String },
    #[error("failed to write `{key}`: {reason}")]
    Write { key: String, reason: String },
    #[error("failed to remove `{key}`: {reason}")]
    Remove { key: String, reason: String },
    #[error("invalid value under `{key}`: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed store with fallible access, shaped after `window.localStorage`.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

fn js_reason(value: JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{:?}", value))
}

/// The browser's `localStorage`. Looked up on every call since it can be
/// disabled at any time by the user agent.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StorageError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or(StorageError::Unavailable)
    }
}

impl KeyValueStore for LocalStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::storage()?.get_item(key).map_err(|e| StorageError::Read {
            key: key.to_string(),
            reason: js_reason(e),
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                reason: js_reason(e),
            })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StorageError::Remove {
                key: key.to_string(),
                reason: js_reason(e),
            })
    }
}

/// In-memory store. Writes can be made to fail to simulate a full quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<HashMap<String, String>>,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Write {
                key: key.to_string(),
                reason: "QuotaExceededError".to_string(),
            });
        }
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Remove {
                key: key.to_string(),
                reason: "storage is read-only".to_string(),
            });
        }
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// JSON-valued view over a [`KeyValueStore`]. Never fails: every error is
/// logged as a warning and turned into a default value.
#[derive(Clone)]
pub struct JsonStorage {
    store: Rc<dyn KeyValueStore>,
}

impl JsonStorage {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.store.get_item(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StorageError::Json {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// The stored string as-is, without JSON decoding.
    pub fn raw(&self, key: &str) -> Option<String> {
        match self.store.get_item(key) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to read from storage: {}", e);
                None
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Failed to read from storage: {}", e);
                None
            }
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(|source| StorageError::Json {
                key: key.to_string(),
                source,
            })
            .and_then(|raw| self.store.set_item(key, &raw));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save to storage: {}", e);
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to remove from storage: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (Rc<MemoryStore>, JsonStorage) {
        let store = Rc::new(MemoryStore::new());
        let json = JsonStorage::new(store.clone());
        (store, json)
    }

    #[test]
    fn values_are_stored_as_json() {
        let (store, json) = storage();
        assert!(json.set("analytics_consent", &true));
        assert!(json.set("lunetix_language", "en"));

        assert_eq!(store.raw("analytics_consent").as_deref(), Some("true"));
        assert_eq!(store.raw("lunetix_language").as_deref(), Some("\"en\""));
        assert_eq!(json.get::<bool>("analytics_consent"), Some(true));
    }

    #[test]
    fn malformed_values_fall_back_to_default() {
        let (store, json) = storage();
        store.set_item("analytics_consent", "not json").unwrap();

        assert!(json.try_get::<bool>("analytics_consent").is_err());
        assert!(!json.get_or("analytics_consent", false));
        assert_eq!(json.get_or("missing", 7_u32), 7);
    }

    #[test]
    fn failing_writes_are_swallowed() {
        let (store, json) = storage();
        json.set("user_id", "user_1");
        store.set_fail_writes(true);

        assert!(!json.set("user_id", "user_2"));
        assert!(!json.remove("user_id"));
        assert_eq!(json.get::<String>("user_id").as_deref(), Some("user_1"));
    }
}

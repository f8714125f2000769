//! Typed key/value configuration store.
//!
//! Values are staged in memory by `set`/`remove` and become durable with
//! `save`. `needs_commit` reports whether staged state differs from the last
//! saved state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;
use thiserror::Error;

/// Maximum key length in bytes
pub const MAX_KEY_LEN_BYTES: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Key length {len} exceeds maximum of {MAX_KEY_LEN_BYTES} bytes")]
    KeyTooLong { len: usize },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Type mismatch for key '{key}': expected {expected:?}, found {found:?}")]
    TypeMismatch {
        key: String,
        expected: ConfigDataType,
        found: ConfigDataType,
    },

    #[error("Config store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Value categories a key can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigDataType {
    U32,
    I32,
    F32,
    Str,
    Bytes,
    Array,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    U32(u32),
    I32(i32),
    F32(f32),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn data_type(&self) -> ConfigDataType {
        match self {
            ConfigValue::U32(_) => ConfigDataType::U32,
            ConfigValue::I32(_) => ConfigDataType::I32,
            ConfigValue::F32(_) => ConfigDataType::F32,
            ConfigValue::Str(_) => ConfigDataType::Str,
            ConfigValue::Bytes(_) => ConfigDataType::Bytes,
            ConfigValue::Array(_) => ConfigDataType::Array,
        }
    }
}

/// A stored key together with the type of its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    pub key: String,
    pub value_type: ConfigDataType,
}

/// Result of [`ConfigStore::save`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Whether anything differed from the previously saved state
    pub changed: bool,
    /// Whether the caller asked for a restart after saving
    pub restart_requested: bool,
}

pub trait ConfigStore: Send + Sync {
    fn get(&self, key: &str) -> Result<ConfigValue>;
    fn set(&self, key: &str, value: ConfigValue) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn stored_keys(&self) -> Result<Vec<ConfigKey>>;
    fn needs_commit(&self) -> Result<bool>;
    fn save(&self, restart: bool) -> Result<SaveOutcome>;

    fn get_u32(&self, key: &str) -> Result<u32> {
        match self.get(key)? {
            ConfigValue::U32(v) => Ok(v),
            other => Err(mismatch(key, ConfigDataType::U32, &other)),
        }
    }

    fn get_i32(&self, key: &str) -> Result<i32> {
        match self.get(key)? {
            ConfigValue::I32(v) => Ok(v),
            other => Err(mismatch(key, ConfigDataType::I32, &other)),
        }
    }

    fn get_f32(&self, key: &str) -> Result<f32> {
        match self.get(key)? {
            ConfigValue::F32(v) => Ok(v),
            other => Err(mismatch(key, ConfigDataType::F32, &other)),
        }
    }

    fn get_str(&self, key: &str) -> Result<String> {
        match self.get(key)? {
            ConfigValue::Str(v) => Ok(v),
            other => Err(mismatch(key, ConfigDataType::Str, &other)),
        }
    }
}

fn mismatch(key: &str, expected: ConfigDataType, found: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.data_type(),
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ConfigError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN_BYTES {
        return Err(ConfigError::KeyTooLong { len: key.len() });
    }
    Ok(())
}

#[derive(Default)]
struct StoreState {
    staged: BTreeMap<String, ConfigValue>,
    saved: BTreeMap<String, ConfigValue>,
}

/// In-memory [`ConfigStore`]
#[derive(Default)]
pub struct MemoryConfigStore {
    state: RwLock<StoreState>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Result<ConfigValue> {
        validate_key(key)?;
        let state = self.state.read().map_err(|_| ConfigError::LockPoisoned)?;
        state
            .staged
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    fn set(&self, key: &str, value: ConfigValue) -> Result<()> {
        validate_key(key)?;
        let mut state = self.state.write().map_err(|_| ConfigError::LockPoisoned)?;
        state.staged.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut state = self.state.write().map_err(|_| ConfigError::LockPoisoned)?;
        state
            .staged
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    fn stored_keys(&self) -> Result<Vec<ConfigKey>> {
        let state = self.state.read().map_err(|_| ConfigError::LockPoisoned)?;
        Ok(state
            .staged
            .iter()
            .map(|(key, value)| ConfigKey {
                key: key.clone(),
                value_type: value.data_type(),
            })
            .collect())
    }

    fn needs_commit(&self) -> Result<bool> {
        let state = self.state.read().map_err(|_| ConfigError::LockPoisoned)?;
        Ok(state.staged != state.saved)
    }

    fn save(&self, restart: bool) -> Result<SaveOutcome> {
        let mut state = self.state.write().map_err(|_| ConfigError::LockPoisoned)?;
        let changed = state.staged != state.saved;
        if changed {
            state.saved = state.staged.clone();
        }
        Ok(SaveOutcome {
            changed,
            restart_requested: restart,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_and_typed_access() {
        let store = MemoryConfigStore::new();
        store.set("sampleRate", ConfigValue::U32(10)).unwrap();
        store.set("offset", ConfigValue::I32(-3)).unwrap();
        store
            .set("label", ConfigValue::Str("buoy".to_string()))
            .unwrap();

        assert_eq!(store.get_u32("sampleRate").unwrap(), 10);
        assert_eq!(store.get_i32("offset").unwrap(), -3);
        assert_eq!(store.get_str("label").unwrap(), "buoy");

        let err = store.get_f32("sampleRate").unwrap_err();
        assert_eq!(
            err,
            ConfigError::TypeMismatch {
                key: "sampleRate".to_string(),
                expected: ConfigDataType::F32,
                found: ConfigDataType::U32,
            }
        );
    }

    #[test]
    fn key_length_is_bounded() {
        let store = MemoryConfigStore::new();
        let exact = "k".repeat(MAX_KEY_LEN_BYTES);
        let too_long = "k".repeat(MAX_KEY_LEN_BYTES + 1);

        assert!(store.set(&exact, ConfigValue::U32(1)).is_ok());
        assert_eq!(
            store.set(&too_long, ConfigValue::U32(1)),
            Err(ConfigError::KeyTooLong {
                len: MAX_KEY_LEN_BYTES + 1
            })
        );
        assert!(matches!(
            store.set("", ConfigValue::U32(1)),
            Err(ConfigError::InvalidKey(_))
        ));
    }

    #[test]
    fn save_tracks_pending_changes() {
        let store = MemoryConfigStore::new();
        assert!(!store.needs_commit().unwrap());

        store
            .set("blob", ConfigValue::Bytes(vec![1, 2, 3]))
            .unwrap();
        assert!(store.needs_commit().unwrap());

        let outcome = store.save(true).unwrap();
        assert!(outcome.changed);
        assert!(outcome.restart_requested);
        assert!(!store.needs_commit().unwrap());

        let outcome = store.save(false).unwrap();
        assert!(!outcome.changed);

        store.remove("blob").unwrap();
        assert!(store.needs_commit().unwrap());
        assert_eq!(
            store.remove("blob"),
            Err(ConfigError::KeyNotFound("blob".to_string()))
        );
    }

    #[test]
    fn stored_keys_report_value_types() {
        let store = MemoryConfigStore::new();
        store
            .set(
                "list",
                ConfigValue::Array(vec![ConfigValue::U32(1), ConfigValue::F32(2.5)]),
            )
            .unwrap();
        store.set("gain", ConfigValue::F32(0.5)).unwrap();

        let keys = store.stored_keys().unwrap();
        assert_eq!(
            keys,
            vec![
                ConfigKey {
                    key: "gain".to_string(),
                    value_type: ConfigDataType::F32,
                },
                ConfigKey {
                    key: "list".to_string(),
                    value_type: ConfigDataType::Array,
                },
            ]
        );
    }

    #[test]
    fn values_serialize_with_their_type_tag() {
        let json = serde_json::to_string(&ConfigValue::U32(7)).unwrap();
        assert_eq!(json, r#"{"U32":7}"#);
        let back: ConfigValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConfigValue::U32(7));
    }
}

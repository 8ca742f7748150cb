//! Key-value blob storage. Every value is a JSON string so collections and flags
//! round-trip the same way regardless of backend.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::StorageConfig;

pub const USERS_KEY: &str = "users";
pub const SUBMISSIONS_KEY: &str = "formSubmissions";
pub const AUTHENTICATED_FLAG: &str = "isAuthenticated";
pub const ADMIN_FLAG: &str = "isAdmin";
pub const SESSION_KEY: &str = "currentSession";

/// Storage contract shared by the account, session, and submission layers.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("value under '{key}' is not valid JSON: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

pub fn read_json<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub fn write_json<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, raw)
}

/// Flags are stored the way a browser would keep them: the literal string `"true"`.
pub fn read_flag<S>(store: &S, key: &str) -> Result<bool, StoreError>
where
    S: KeyValueStore + ?Sized,
{
    Ok(store.get(key)?.as_deref() == Some("true"))
}

/// Backend selected at startup from [`StorageConfig`].
#[derive(Debug)]
pub enum StoreBackend {
    Memory(MemoryStore),
    File(JsonFileStore),
}

impl StoreBackend {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StoreError> {
        match &config.path {
            Some(path) => Ok(Self::File(JsonFileStore::open(path)?)),
            None => Ok(Self::Memory(MemoryStore::default())),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Memory(_) => "in-memory".to_string(),
            Self::File(store) => format!("file {}", store.path().display()),
        }
    }
}

impl KeyValueStore for StoreBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(store) => store.get(key),
            Self::File(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.set(key, value),
            Self::File(store) => store.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.remove(key),
            Self::File(store) => store.remove(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_helpers_round_trip_collections() {
        let store = MemoryStore::default();
        write_json(&store, USERS_KEY, &vec!["a", "b"]).expect("write");
        let loaded: Option<Vec<String>> = read_json(&store, USERS_KEY).expect("read");
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<Vec<String>> = read_json(&store, SUBMISSIONS_KEY).expect("read");
        assert!(missing.is_none());
    }

    #[test]
    fn corrupt_values_name_the_key() {
        let store = MemoryStore::default();
        store.set(SUBMISSIONS_KEY, "{not json".to_string()).expect("set");
        match read_json::<_, Vec<String>>(&store, SUBMISSIONS_KEY) {
            Err(StoreError::Serialization { key, .. }) => assert_eq!(key, SUBMISSIONS_KEY),
            other => panic!("expected serialization error, got {other:?}"),
        }
    }

    #[test]
    fn flags_only_accept_literal_true() {
        let store = MemoryStore::default();
        assert!(!read_flag(&store, ADMIN_FLAG).unwrap());
        store.set(ADMIN_FLAG, "yes".to_string()).unwrap();
        assert!(!read_flag(&store, ADMIN_FLAG).unwrap());
        store.set(ADMIN_FLAG, "true".to_string()).unwrap();
        assert!(read_flag(&store, ADMIN_FLAG).unwrap());
    }

    #[test]
    fn backend_defaults_to_memory() {
        let backend = StoreBackend::from_config(&StorageConfig::default()).expect("backend");
        assert_eq!(backend.describe(), "in-memory");
    }
}

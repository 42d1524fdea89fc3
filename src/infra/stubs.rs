use std::{collections::HashMap, path::PathBuf, sync::Mutex};

use crate::infra::{contracts::KeyValueStore, error::AppError};

/// In-memory key-value store; optionally rejects every write.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryKeyValueStore {
    pub fn failing_writes() -> Self {
        Self {
            entries: Mutex::default(),
            fail_writes: true,
        }
    }

    fn write_error(key: &str) -> AppError {
        AppError::StoreWrite {
            path: PathBuf::from(key),
            source: std::io::Error::other("quota exceeded"),
        }
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let entries = self.entries.lock().expect("memory store lock");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(Self::write_error(key));
        }

        let mut entries = self.entries.lock().expect("memory store lock");
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        if self.fail_writes {
            return Err(Self::write_error(key));
        }

        let mut entries = self.entries.lock().expect("memory store lock");
        entries.remove(key);
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), AppError> {
        let mut entries = self.entries.lock().expect("memory store lock");
        let Some(next) = apply(entries.get(key).map(String::as_str)) else {
            return Ok(());
        };
        if self.fail_writes {
            return Err(Self::write_error(key));
        }

        entries.insert(key.to_owned(), next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_values() {
        let store = MemoryKeyValueStore::default();

        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));

        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
    }

    #[test]
    fn update_skips_write_when_nothing_changes() {
        let store = MemoryKeyValueStore::failing_writes();

        store.update("k", &mut |_| None).expect("no write attempted");

        assert!(store.update("k", &mut |_| Some("v".to_owned())).is_err());
    }
}

use std::{
    fs::{self, File, OpenOptions},
    io::ErrorKind,
    path::PathBuf,
};

use fs2::FileExt;

use crate::infra::{contracts::KeyValueStore, error::AppError};

const ENTRY_EXTENSION: &str = "json";
const LOCK_FILE_NAME: &str = ".store.lock";

/// One file per key under a directory. Writes are atomic (tmp + rename) and
/// serialized across processes through an exclusive lock file.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| AppError::StorageDirCreate {
            path: dir.clone(),
            source,
        })?;

        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{ENTRY_EXTENSION}", encode_key(key)))
    }

    fn lock(&self) -> Result<StoreLock, AppError> {
        let path = self.dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| AppError::StoreLock {
                path: path.clone(),
                source,
            })?;

        file.lock_exclusive()
            .map_err(|source| AppError::StoreLock { path, source })?;

        Ok(StoreLock { file })
    }
}

impl FileKeyValueStore {
    /// Caller must hold the store lock.
    fn write_entry(&self, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.entry_path(key);
        let tmp_path = path.with_extension("tmp");

        fs::write(&tmp_path, value).map_err(|source| AppError::StoreWrite {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| AppError::StoreWrite { path, source })
    }
}

struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(AppError::StoreRead { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let _lock = self.lock()?;
        self.write_entry(key, value)
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), AppError> {
        let _lock = self.lock()?;
        let current = self.get(key)?;
        match apply(current.as_deref()) {
            Some(next) => self.write_entry(key, &next),
            None => Ok(()),
        }
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        let _lock = self.lock()?;
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AppError::StoreWrite { path, source }),
        }
    }
}

/// Maps a key to a portable file stem; bytes outside `[A-Za-z0-9_-]` become `~xx`.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("~{byte:02x}"));
        }
    }
    encoded
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "superapp";
const DATA_DIR_ENV: &str = "SUPERAPP_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
    pub store_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl StorageLayout {
    /// Resolves the data directory: explicit override, `SUPERAPP_DATA_DIR`,
    /// `XDG_DATA_HOME`, then the platform data directory.
    pub fn resolve(override_dir: Option<&Path>) -> Result<Self, AppError> {
        let data_dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => env::var_os(DATA_DIR_ENV)
                .map(PathBuf::from)
                .or_else(|| {
                    env::var_os("XDG_DATA_HOME")
                        .map(PathBuf::from)
                        .map(|base| base.join(APP_DIR_NAME))
                })
                .or_else(|| dirs::data_dir().map(|base| base.join(APP_DIR_NAME)))
                .ok_or_else(|| AppError::StoragePathResolution {
                    details: "unable to resolve data directory (SUPERAPP_DATA_DIR/XDG_DATA_HOME)"
                        .into(),
                })?,
        };

        Ok(Self {
            store_dir: data_dir.join("store"),
            log_dir: data_dir.join("logs"),
            data_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.data_dir, &self.store_dir, &self.log_dir] {
            fs::create_dir_all(dir).map_err(|source| AppError::StorageDirCreate {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

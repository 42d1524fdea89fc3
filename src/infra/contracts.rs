use crate::infra::error::AppError;

/// Persistent string key-value storage scoped to one user profile.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove(&self, key: &str) -> Result<(), AppError>;

    /// Reads `key`, passes the raw value to `apply` and stores what it returns,
    /// all under one exclusive lock. `None` from `apply` leaves the entry as is.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Result<(), AppError>;
}

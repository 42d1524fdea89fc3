use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const REMOTE_URL_ENV: &str = "SUPERAPP_REMOTE_URL";
const REMOTE_ANON_KEY_ENV: &str = "SUPERAPP_REMOTE_ANON_KEY";

/// Defaults, then the TOML file (if present), then environment overrides.
pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let mut config = load_file(path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

fn load_file(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path,
        source,
    })?;

    file_config.merge_into(&mut config);
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(REMOTE_URL_ENV) {
        config.remote.url = Some(url);
    }

    if let Some(anon_key) = lookup(REMOTE_ANON_KEY_ENV) {
        config.remote.anon_key = Some(anon_key);
    }
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    if config.remote.heartbeat_interval_ms == 0 {
        return Err(AppError::ConfigInvalid {
            field: "remote.heartbeat_interval_ms",
            details: "must be greater than zero".to_owned(),
        });
    }

    if let Some(url) = config.remote.url.as_deref().filter(|url| !url.is_empty()) {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::ConfigInvalid {
                field: "remote.url",
                details: "must start with http:// or https://".to_owned(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_defaults_when_file_is_missing() {
        let config =
            load_file(Some(Path::new("./missing-config.toml"))).expect("config must load");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn merges_file_values_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            r#"[logging]
level = "debug"

[remote]
url = "https://db.example.com"
anon_key = "anon"

[sync]
queue_capacity = 8
"#,
        )
        .expect("must write test config");

        let config = load_file(Some(&config_path)).expect("config must load");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.remote.url.as_deref(), Some("https://db.example.com"));
        assert!(config.remote.is_configured());
        assert_eq!(config.sync.queue_capacity, 8);
        assert_eq!(config.remote.heartbeat_interval_ms, 25_000);
    }

    #[test]
    fn reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("broken.toml");
        fs::write(&config_path, "[remote\nurl = 1").expect("must write test config");

        let err = load_file(Some(&config_path)).expect_err("broken config must fail");

        assert!(matches!(err, AppError::ConfigParse { .. }));
    }

    #[test]
    fn env_values_override_file_values() {
        let mut config = AppConfig::default();
        config.remote.url = Some("https://file.example.com".to_owned());

        apply_env_overrides(&mut config, |key| match key {
            REMOTE_URL_ENV => Some("https://env.example.com".to_owned()),
            REMOTE_ANON_KEY_ENV => Some("env-key".to_owned()),
            _ => None,
        });

        assert_eq!(config.remote.url.as_deref(), Some("https://env.example.com"));
        assert_eq!(config.remote.anon_key.as_deref(), Some("env-key"));
    }

    #[test]
    fn rejects_non_http_remote_url() {
        let mut config = AppConfig::default();
        config.remote.url = Some("ftp://db.example.com".to_owned());

        let err = validate(&config).expect_err("ftp url must be rejected");

        assert!(matches!(
            err,
            AppError::ConfigInvalid {
                field: "remote.url",
                ..
            }
        ));
    }
}

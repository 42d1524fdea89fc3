use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Per-identity preferences. Always stored and synced as a whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub theme: Theme,
    pub language: Language,
    pub font_size: FontSize,
    pub notifications: bool,
    pub email_notifications: bool,
    pub sound_enabled: bool,
    pub compact_mode: bool,
    pub auto_save: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: Language::Id,
            font_size: FontSize::Medium,
            notifications: true,
            email_notifications: false,
            sound_enabled: true,
            compact_mode: false,
            auto_save: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Theme,
    Language,
    FontSize,
    Notifications,
    EmailNotifications,
    SoundEnabled,
    CompactMode,
    AutoSave,
}

impl SettingKey {
    pub const ALL: [SettingKey; 8] = [
        SettingKey::Theme,
        SettingKey::Language,
        SettingKey::FontSize,
        SettingKey::Notifications,
        SettingKey::EmailNotifications,
        SettingKey::SoundEnabled,
        SettingKey::CompactMode,
        SettingKey::AutoSave,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::Language => "language",
            Self::FontSize => "fontSize",
            Self::Notifications => "notifications",
            Self::EmailNotifications => "emailNotifications",
            Self::SoundEnabled => "soundEnabled",
            Self::CompactMode => "compactMode",
            Self::AutoSave => "autoSave",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|ch| *ch != '-' && *ch != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| SettingsError::UnknownKey(raw.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("invalid value `{value}` for setting `{key}`")]
    InvalidValue { key: SettingKey, value: String },
}

impl UserSettings {
    /// Returns a copy with exactly one field replaced by the parsed `raw` value.
    pub fn with_field(&self, key: SettingKey, raw: &str) -> Result<Self, SettingsError> {
        let mut updated = self.clone();
        let invalid = || SettingsError::InvalidValue {
            key,
            value: raw.to_owned(),
        };

        match key {
            SettingKey::Theme => updated.theme = parse_enum(raw).ok_or_else(invalid)?,
            SettingKey::Language => updated.language = parse_enum(raw).ok_or_else(invalid)?,
            SettingKey::FontSize => updated.font_size = parse_enum(raw).ok_or_else(invalid)?,
            SettingKey::Notifications => {
                updated.notifications = parse_flag(raw).ok_or_else(invalid)?
            }
            SettingKey::EmailNotifications => {
                updated.email_notifications = parse_flag(raw).ok_or_else(invalid)?
            }
            SettingKey::SoundEnabled => {
                updated.sound_enabled = parse_flag(raw).ok_or_else(invalid)?
            }
            SettingKey::CompactMode => updated.compact_mode = parse_flag(raw).ok_or_else(invalid)?,
            SettingKey::AutoSave => updated.auto_save = parse_flag(raw).ok_or_else(invalid)?,
        }

        Ok(updated)
    }

    /// Display value of a single field, as it appears in the stored record.
    pub fn field_value(&self, key: SettingKey) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| value.get(key.as_str()).cloned())
            .map(|value| match value {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .unwrap_or_default()
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_ascii_lowercase())).ok()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

//! Wire rows of the remote tables and their mapping to domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::{
    calc::CalcEntry, message::ChatMessage, room::ChatRoom, settings::UserSettings,
};

#[derive(Debug, Clone, Deserialize)]
pub struct RoomRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_message_time: Option<DateTime<Utc>>,
}

impl From<RoomRow> for ChatRoom {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            members: Vec::new(),
            last_message: row.last_message,
            last_message_time: row.last_message_time.map(|time| time.timestamp_millis()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewRoomRow<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RoomLastMessagePatch<'a> {
    pub last_message: &'a str,
    pub last_message_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub room_id: String,
    pub sender: String,
    pub sender_name: String,
    pub message: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            sender: row.sender,
            sender_name: row.sender_name,
            message: row.message,
            timestamp: row.created_at.timestamp_millis(),
            avatar: row.avatar,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewMessageRow<'a> {
    pub room_id: &'a str,
    pub sender: &'a str,
    pub sender_name: &'a str,
    pub message: &'a str,
    pub avatar: Option<&'a str>,
}

impl<'a> NewMessageRow<'a> {
    pub fn from_draft(room_id: &'a str, draft: &'a ChatMessage) -> Self {
        Self {
            room_id,
            sender: &draft.sender,
            sender_name: &draft.sender_name,
            message: &draft.message,
            avatar: draft.avatar.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsRow {
    pub data: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SettingsUpsertRow<'a> {
    pub user_id: &'a str,
    pub data: &'a UserSettings,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CalcRow {
    pub calculation: String,
    #[serde(deserialize_with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<CalcRow> for CalcEntry {
    fn from(row: CalcRow) -> Self {
        Self {
            calculation: row.calculation,
            created_at: row.created_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NewCalcRow<'a> {
    pub user_id: &'a str,
    pub calculation: &'a str,
}

pub fn datetime_from_millis(timestamp_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(timestamp_ms).unwrap_or_default()
}

/// Accepts RFC 3339 (`2024-05-01T10:00:00.123+00:00`) and Postgres text
/// output (`2024-05-01 10:00:00.123+00`).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_postgres_text_timestamps() {
        let rfc = parse_timestamp("2024-05-01T10:00:00.250+00:00").expect("rfc3339");
        let pg = parse_timestamp("2024-05-01 10:00:00.25+00").expect("postgres text");

        assert_eq!(rfc, pg);
        assert_eq!(rfc.timestamp_millis() % 1000, 250);
    }

    #[test]
    fn message_row_maps_created_at_to_millis() {
        let row: MessageRow = serde_json::from_str(
            r#"{"id":"5b1c","room_id":"r1","sender":"user_1","sender_name":"Ana",
                "message":"hello","avatar":null,"created_at":"1970-01-01T00:00:01.5+00:00"}"#,
        )
        .expect("row must parse");

        let message = ChatMessage::from(row);

        assert_eq!(message.timestamp, 1500);
        assert_eq!(message.avatar, None);
        assert_eq!(message.message, "hello");
    }

    #[test]
    fn room_row_without_last_message_maps_to_empty_preview() {
        let row: RoomRow = serde_json::from_str(
            r#"{"id":"r1","name":"General","created_at":"2024-05-01T10:00:00+00:00",
                "last_message":null,"last_message_time":null}"#,
        )
        .expect("row must parse");

        let room = ChatRoom::from(row);

        assert_eq!(room.last_message, None);
        assert_eq!(room.last_message_time, None);
        assert!(room.members.is_empty());
    }

    #[test]
    fn invalid_timestamp_is_a_decode_error() {
        let result = serde_json::from_str::<CalcRow>(
            r#"{"calculation":"1 + 1 = 2","created_at":"yesterday"}"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn settings_upsert_row_nests_the_whole_record() {
        let settings = UserSettings::default();
        let row = SettingsUpsertRow {
            user_id: "user_1",
            data: &settings,
            updated_at: datetime_from_millis(0),
        };

        let json = serde_json::to_value(&row).expect("row must serialize");

        assert_eq!(json["user_id"], "user_1");
        assert_eq!(json["data"]["fontSize"], "medium");
    }
}

use serde::{Deserialize, Serialize};

/// A chat room with a denormalized cache of its most recent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Unix milliseconds of `last_message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<i64>,
}

impl ChatRoom {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: Vec::new(),
            last_message: None,
            last_message_time: None,
        }
    }

    pub fn record_last_message(&mut self, text: &str, timestamp_ms: i64) {
        self.last_message = Some(text.to_owned());
        self.last_message_time = Some(timestamp_ms);
    }
}

/// Rooms seeded when neither store has any.
pub fn default_rooms() -> Vec<ChatRoom> {
    vec![
        ChatRoom::new("general", "General"),
        ChatRoom::new("random", "Random"),
        ChatRoom::new("tech", "Tech"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rooms_are_general_random_tech() {
        let names: Vec<_> = default_rooms().into_iter().map(|room| room.name).collect();

        assert_eq!(names, ["General", "Random", "Tech"]);
    }

    #[test]
    fn record_last_message_sets_both_fields() {
        let mut room = ChatRoom::new("general", "General");

        room.record_last_message("hello", 42);

        assert_eq!(room.last_message.as_deref(), Some("hello"));
        assert_eq!(room.last_message_time, Some(42));
    }

    #[test]
    fn deserializes_stored_room_without_optional_fields() {
        let room: ChatRoom =
            serde_json::from_str(r#"{"id":"tech","name":"Tech"}"#).expect("room must parse");

        assert_eq!(room, ChatRoom::new("tech", "Tech"));
    }
}

use serde::{Deserialize, Serialize};

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";
const SHORT_TAG_LEN: usize = 6;

/// A single chat message. Immutable once stored; only ever deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub sender_name: String,
    pub message: String,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ChatMessage {
    /// Returns the display content, with a placeholder for blank text.
    pub fn display_content(&self) -> &str {
        if self.message.is_empty() {
            "[Empty message]"
        } else {
            &self.message
        }
    }

    /// Trailing characters of the id, enough to pick a message in a room.
    pub fn short_tag(&self) -> &str {
        let start = self
            .id
            .char_indices()
            .rev()
            .nth(SHORT_TAG_LEN - 1)
            .map_or(0, |(index, _)| index);
        &self.id[start..]
    }
}

/// Avatar image reference generated from a seed string.
pub fn avatar_url(seed: &str) -> String {
    format!("{AVATAR_BASE_URL}?seed={seed}")
}

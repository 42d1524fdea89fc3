//! Plain-text rendering of chat shell output and command results.
//!
//! Message lines read `HH:MM sender: text`; messages from another day show
//! the date in front of the time. The chat shell prefixes each line with the
//! message's short tag, which `/delete` accepts.

use std::fmt::Display;

use chrono::{DateTime, LocalResult, TimeZone};

use crate::domain::{
    calc::CalcEntry,
    message::ChatMessage,
    room::ChatRoom,
    settings::{SettingKey, UserSettings},
    shell_state::ShellOutput,
};

const HELP_LINES: [&str; 9] = [
    "commands:",
    "  /rooms            list rooms",
    "  /join ROOM        switch room (id or name)",
    "  /create NAME      create a room and join it",
    "  /delete TAG       delete a message (tag or full id)",
    "  /clear            delete every message in this room",
    "  /name NAME        change your display name",
    "  /help             show this help",
    "  /quit             leave the chat",
];

pub fn render_output<Tz>(output: &ShellOutput, now: &DateTime<Tz>) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match output {
        ShellOutput::Notice(text) => vec![format!("-- {text}")],
        ShellOutput::Message(message) => vec![format!(
            "[{}] {}",
            message.short_tag(),
            message_line(message, now)
        )],
        ShellOutput::MessageRemoved { message_id } => {
            vec![format!("-- message {message_id} deleted")]
        }
        ShellOutput::Rooms { rooms, current } => room_lines(rooms, current.as_deref(), now),
        ShellOutput::Help => HELP_LINES.iter().map(|line| (*line).to_owned()).collect(),
    }
}

pub fn message_line<Tz>(message: &ChatMessage, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{} {}: {}",
        format_timestamp(message.timestamp, now),
        message.sender_name,
        message.display_content()
    )
}

/// Message line prefixed with its id, for listings used to pick a message.
pub fn message_line_with_id<Tz>(message: &ChatMessage, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("[{}] {}", message.id, message_line(message, now))
}

pub fn room_lines<Tz>(rooms: &[ChatRoom], current: Option<&str>, now: &DateTime<Tz>) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if rooms.is_empty() {
        return vec!["-- no rooms".to_owned()];
    }

    rooms
        .iter()
        .map(|room| {
            let marker = if current == Some(room.id.as_str()) { '*' } else { ' ' };
            let mut line = format!("{marker} {} ({})", room.name, room.id);
            if let Some(last) = &room.last_message {
                let when = room
                    .last_message_time
                    .map(|ts| format!(" {}", format_timestamp(ts, now)))
                    .unwrap_or_default();
                line.push_str(&format!(" - last{when}: {last}"));
            }
            line
        })
        .collect()
}

pub fn settings_lines(settings: &UserSettings) -> Vec<String> {
    SettingKey::ALL
        .iter()
        .map(|key| format!("{key} = {}", settings.field_value(*key)))
        .collect()
}

pub fn calc_lines<Tz>(history: &[CalcEntry], now: &DateTime<Tz>) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    if history.is_empty() {
        return vec!["-- no calculations yet".to_owned()];
    }

    history
        .iter()
        .map(|entry| format!("{} {}", format_timestamp(entry.created_at, now), entry.calculation))
        .collect()
}

/// `HH:MM` for today, `YYYY-MM-DD HH:MM` otherwise.
fn format_timestamp<Tz>(timestamp_ms: i64, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let at = match now.timezone().timestamp_millis_opt(timestamp_ms) {
        LocalResult::Single(at) | LocalResult::Ambiguous(at, _) => at,
        LocalResult::None => return "??:??".to_owned(),
    };

    if at.date_naive() == now.date_naive() {
        at.format("%H:%M").to_string()
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}

use std::{sync::Arc, time::Duration};

use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::runtime::Runtime;

use crate::{
    domain::{calc::CalcEntry, message::ChatMessage, room::ChatRoom, settings::UserSettings},
    infra::{config::RemoteConfig, secrets::redact_text},
    usecases::contracts::{ChatStore, HistoryStore, SettingsStore, StoreError},
};

use super::rows::{
    datetime_from_millis, CalcRow, MessageRow, NewCalcRow, NewMessageRow, NewRoomRow,
    RoomLastMessagePatch, RoomRow, SettingsRow, SettingsUpsertRow,
};

const REST_PATH: &str = "rest/v1";
const ROOMS_TABLE: &str = "rooms";
const MESSAGES_TABLE: &str = "messages";
const SETTINGS_TABLE: &str = "settings";
const CALC_HISTORY_TABLE: &str = "calc_history";

const PREFER_REPRESENTATION: &str = "return=representation";
const PREFER_MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

const REMOTE_SETTINGS_UNREADABLE: &str = "REMOTE_SETTINGS_UNREADABLE";

/// PostgREST client over the rooms, messages, settings and calculator-history
/// tables. Calls block the caller on the shared runtime.
pub struct RestBackend {
    rt: Arc<Runtime>,
    http: reqwest::Client,
    rest_url: String,
    anon_key: String,
}

impl RestBackend {
    pub fn new(config: &RemoteConfig, rt: Arc<Runtime>) -> Result<Self, StoreError> {
        let (Some(url), Some(anon_key)) = (config.url.as_deref(), config.anon_key.as_deref())
        else {
            return Err(StoreError::Unavailable {
                message: "remote url or key missing".to_owned(),
            });
        };

        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let http = builder.build().map_err(|error| StoreError::Unavailable {
            message: format!("failed to build http client: {error}"),
        })?;

        Ok(Self {
            rt,
            http,
            rest_url: rest_url(url),
            anon_key: anon_key.trim().to_owned(),
        })
    }

    fn request(&self, method: Method, table: &str, query: &[(&str, String)]) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{table}", self.rest_url))
            .query(query)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        self.rt.block_on(async {
            let response = dispatch(request).await?;
            response.json::<T>().await.map_err(map_decode_error)
        })
    }

    fn execute(&self, request: RequestBuilder) -> Result<(), StoreError> {
        self.rt.block_on(async { dispatch(request).await.map(|_| ()) })
    }
}

async fn dispatch(request: RequestBuilder) -> Result<Response, StoreError> {
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(map_status_error(status.as_u16(), &body))
}

fn rest_url(base: &str) -> String {
    format!("{}/{REST_PATH}", base.trim().trim_end_matches('/'))
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn map_transport_error(error: reqwest::Error) -> StoreError {
    StoreError::Unavailable {
        message: redact_text(&error.to_string()),
    }
}

fn map_decode_error(error: reqwest::Error) -> StoreError {
    StoreError::InvalidData {
        message: redact_text(&error.to_string()),
    }
}

fn map_status_error(status: u16, body: &str) -> StoreError {
    let message = if body.trim().is_empty() {
        "empty response body".to_owned()
    } else {
        redact_text(body.trim())
    };
    StoreError::Rejected { status, message }
}

fn first_row<T>(rows: Vec<T>, table: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::InvalidData {
        message: format!("{table} insert returned no row"),
    })
}

impl ChatStore for RestBackend {
    fn list_rooms(&self) -> Result<Vec<ChatRoom>, StoreError> {
        let rows: Vec<RoomRow> = self.fetch(self.request(
            Method::GET,
            ROOMS_TABLE,
            &[("order", "created_at.asc".to_owned())],
        ))?;
        Ok(rows.into_iter().map(ChatRoom::from).collect())
    }

    fn insert_room(&self, draft: &ChatRoom) -> Result<ChatRoom, StoreError> {
        let request = self
            .request(Method::POST, ROOMS_TABLE, &[])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&NewRoomRow { name: &draft.name });
        let rows: Vec<RoomRow> = self.fetch(request)?;
        first_row(rows, ROOMS_TABLE).map(ChatRoom::from)
    }

    fn update_room_last_message(
        &self,
        room_id: &str,
        text: &str,
        timestamp_ms: i64,
    ) -> Result<(), StoreError> {
        let request = self
            .request(Method::PATCH, ROOMS_TABLE, &[("id", eq(room_id))])
            .json(&RoomLastMessagePatch {
                last_message: text,
                last_message_time: datetime_from_millis(timestamp_ms),
            });
        self.execute(request)
    }

    fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let rows: Vec<MessageRow> = self.fetch(self.request(
            Method::GET,
            MESSAGES_TABLE,
            &[
                ("room_id", eq(room_id)),
                ("order", "created_at.asc".to_owned()),
            ],
        ))?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    fn insert_message(
        &self,
        room_id: &str,
        draft: &ChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        let request = self
            .request(Method::POST, MESSAGES_TABLE, &[])
            .header("Prefer", PREFER_REPRESENTATION)
            .json(&NewMessageRow::from_draft(room_id, draft));
        let rows: Vec<MessageRow> = self.fetch(request)?;
        first_row(rows, MESSAGES_TABLE).map(ChatMessage::from)
    }

    fn delete_message(&self, _room_id: &str, message_id: &str) -> Result<(), StoreError> {
        self.execute(self.request(Method::DELETE, MESSAGES_TABLE, &[("id", eq(message_id))]))
    }

    fn clear_messages(&self, room_id: &str) -> Result<(), StoreError> {
        self.execute(self.request(
            Method::DELETE,
            MESSAGES_TABLE,
            &[("room_id", eq(room_id))],
        ))
    }
}

impl SettingsStore for RestBackend {
    fn load_settings(&self, user_id: &str) -> Result<Option<UserSettings>, StoreError> {
        let rows: Vec<SettingsRow> = self.fetch(self.request(
            Method::GET,
            SETTINGS_TABLE,
            &[("user_id", eq(user_id)), ("limit", "1".to_owned())],
        ))?;

        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };

        match serde_json::from_value(row.data) {
            Ok(settings) => Ok(Some(settings)),
            Err(error) => {
                tracing::warn!(
                    code = REMOTE_SETTINGS_UNREADABLE,
                    error = %error,
                    "remote settings record does not match the settings shape"
                );
                Err(StoreError::InvalidData {
                    message: format!("settings record: {error}"),
                })
            }
        }
    }

    fn save_settings(&self, user_id: &str, settings: &UserSettings) -> Result<(), StoreError> {
        let request = self
            .request(
                Method::POST,
                SETTINGS_TABLE,
                &[("on_conflict", "user_id".to_owned())],
            )
            .header("Prefer", PREFER_MERGE_DUPLICATES)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&SettingsUpsertRow {
                user_id,
                data: settings,
                updated_at: chrono::Utc::now(),
            });
        self.execute(request)
    }
}

impl HistoryStore for RestBackend {
    fn list_calculations(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<CalcEntry>, StoreError> {
        let rows: Vec<CalcRow> = self.fetch(self.request(
            Method::GET,
            CALC_HISTORY_TABLE,
            &[
                ("user_id", eq(user_id)),
                ("order", "created_at.desc".to_owned()),
                ("limit", limit.to_string()),
            ],
        ))?;
        Ok(rows.into_iter().map(CalcEntry::from).collect())
    }

    fn insert_calculation(&self, user_id: &str, entry: &CalcEntry) -> Result<(), StoreError> {
        let request = self
            .request(Method::POST, CALC_HISTORY_TABLE, &[])
            .json(&NewCalcRow {
                user_id,
                calculation: &entry.calculation,
            });
        self.execute(request)
    }

    fn clear_calculations(&self, user_id: &str) -> Result<(), StoreError> {
        self.execute(self.request(
            Method::DELETE,
            CALC_HISTORY_TABLE,
            &[("user_id", eq(user_id))],
        ))
    }
}

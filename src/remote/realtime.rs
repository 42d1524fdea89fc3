//! Realtime feed over the Phoenix channel websocket.
//!
//! Each subscription owns one socket joined to `realtime:messages:<room>`.
//! Insert and delete notifications are forwarded as [`RoomEvent`]s. When the
//! socket drops, the monitor ends; there is no reconnection and no backlog
//! replay.

use std::{
    sync::{mpsc::Sender, Arc},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{runtime::Runtime, sync::watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::{
    domain::{events::RoomEvent, message::ChatMessage},
    infra::{config::RemoteConfig, secrets::redact_text},
    usecases::contracts::{FeedError, RoomFeed, RoomSubscription},
};

use super::rows::MessageRow;

const REALTIME_PATH: &str = "realtime/v1/websocket";
const PROTOCOL_VERSION: &str = "1.0.0";
const PHOENIX_TOPIC: &str = "phoenix";

const FEED_MONITOR_STARTED: &str = "REALTIME_FEED_MONITOR_STARTED";
const FEED_MONITOR_STOPPED: &str = "REALTIME_FEED_MONITOR_STOPPED";
const FEED_SOCKET_CLOSED: &str = "REALTIME_FEED_SOCKET_CLOSED";
const FEED_SOCKET_READ_FAILED: &str = "REALTIME_FEED_SOCKET_READ_FAILED";
const FEED_HEARTBEAT_FAILED: &str = "REALTIME_FEED_HEARTBEAT_FAILED";
const FEED_JOIN_REJECTED: &str = "REALTIME_FEED_JOIN_REJECTED";
const FEED_FRAME_UNREADABLE: &str = "REALTIME_FEED_FRAME_UNREADABLE";

pub struct RealtimeFeed {
    rt: Arc<Runtime>,
    socket_url: String,
    anon_key: String,
    heartbeat: Duration,
}

impl RealtimeFeed {
    pub fn new(config: &RemoteConfig, rt: Arc<Runtime>) -> Result<Self, FeedError> {
        let (Some(url), Some(anon_key)) = (config.url.as_deref(), config.anon_key.as_deref())
        else {
            return Err(FeedError::Unavailable {
                message: "remote url or key missing".to_owned(),
            });
        };

        let anon_key = anon_key.trim().to_owned();
        Ok(Self {
            rt,
            socket_url: socket_url(url, &anon_key),
            anon_key,
            heartbeat: Duration::from_millis(config.heartbeat_interval_ms.max(1)),
        })
    }
}

impl RoomFeed for RealtimeFeed {
    fn subscribe(
        &self,
        room_id: &str,
        events: Sender<RoomEvent>,
    ) -> Result<Box<dyn RoomSubscription>, FeedError> {
        let topic = room_topic(room_id);
        let join = join_frame(&topic, room_id, &self.anon_key);

        let (socket, _) = self
            .rt
            .block_on(connect_async(self.socket_url.as_str()))
            .map_err(|error| FeedError::Unavailable {
                message: redact_text(&error.to_string()),
            })?;
        let (mut sink, stream) = socket.split();
        self.rt
            .block_on(sink.send(Message::Text(join.to_string())))
            .map_err(|error| FeedError::Unavailable {
                message: redact_text(&error.to_string()),
            })?;

        let (stop_tx, stop_rx) = watch::channel(false);
        self.rt.spawn(run_monitor(
            MonitorChannel {
                room_id: room_id.to_owned(),
                topic,
                heartbeat: self.heartbeat,
            },
            sink,
            stream,
            events,
            stop_rx,
        ));

        tracing::info!(
            code = FEED_MONITOR_STARTED,
            room_id,
            "realtime feed monitor started"
        );

        Ok(Box::new(RealtimeSubscription {
            room_id: room_id.to_owned(),
            stop_tx: Some(stop_tx),
        }))
    }
}

#[derive(Debug)]
pub struct RealtimeSubscription {
    room_id: String,
    stop_tx: Option<watch::Sender<bool>>,
}

impl RoomSubscription for RealtimeSubscription {
    fn room_id(&self) -> &str {
        &self.room_id
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

struct MonitorChannel {
    room_id: String,
    topic: String,
    heartbeat: Duration,
}

async fn run_monitor<S, R>(
    channel: MonitorChannel,
    mut sink: S,
    mut stream: R,
    events: Sender<RoomEvent>,
    mut stop_rx: watch::Receiver<bool>,
) where
    S: futures_util::Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
    R: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    let mut heartbeat = tokio::time::interval(channel.heartbeat);
    heartbeat.tick().await;
    let mut next_ref: u64 = 2;

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    let leave = control_frame(&channel.topic, "phx_leave", next_ref);
                    let _ = sink.send(Message::Text(leave.to_string())).await;
                    let _ = sink.close().await;
                    tracing::info!(
                        code = FEED_MONITOR_STOPPED,
                        room_id = %channel.room_id,
                        "realtime feed monitor stopped"
                    );
                    return;
                }
            }
            _ = heartbeat.tick() => {
                let beat = control_frame(PHOENIX_TOPIC, "heartbeat", next_ref);
                next_ref += 1;
                if let Err(error) = sink.send(Message::Text(beat.to_string())).await {
                    tracing::warn!(
                        code = FEED_HEARTBEAT_FAILED,
                        room_id = %channel.room_id,
                        error = %error,
                        "realtime heartbeat failed; live updates stop until the room is re-entered"
                    );
                    return;
                }
            }
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match parse_frame(&text, &channel.room_id) {
                            FeedFrame::Change(event) => {
                                if events.send(event).is_err() {
                                    return;
                                }
                            }
                            FeedFrame::JoinRejected(reason) => {
                                tracing::warn!(
                                    code = FEED_JOIN_REJECTED,
                                    room_id = %channel.room_id,
                                    reason = %reason,
                                    "realtime channel join rejected"
                                );
                                return;
                            }
                            FeedFrame::Ignored => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::warn!(
                            code = FEED_SOCKET_CLOSED,
                            room_id = %channel.room_id,
                            "realtime socket closed; live updates stop until the room is re-entered"
                        );
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::warn!(
                            code = FEED_SOCKET_READ_FAILED,
                            room_id = %channel.room_id,
                            error = %redact_text(&error.to_string()),
                            "realtime socket read failed"
                        );
                        return;
                    }
                }
            }
        }
    }
}

fn socket_url(base: &str, anon_key: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_owned()
    };
    format!("{base}/{REALTIME_PATH}?apikey={anon_key}&vsn={PROTOCOL_VERSION}")
}

fn room_topic(room_id: &str) -> String {
    format!("realtime:messages:{room_id}")
}

fn join_frame(topic: &str, room_id: &str, anon_key: &str) -> Value {
    let filter = format!("room_id=eq.{room_id}");
    json!({
        "topic": topic,
        "event": "phx_join",
        "payload": {
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "INSERT", "schema": "public", "table": "messages", "filter": filter },
                    { "event": "DELETE", "schema": "public", "table": "messages", "filter": filter },
                ],
            },
            "access_token": anon_key,
        },
        "ref": "1",
        "join_ref": "1",
    })
}

fn control_frame(topic: &str, event: &str, reference: u64) -> Value {
    json!({
        "topic": topic,
        "event": event,
        "payload": {},
        "ref": reference.to_string(),
    })
}

#[derive(Debug, PartialEq, Eq)]
enum FeedFrame {
    Change(RoomEvent),
    JoinRejected(String),
    Ignored,
}

#[derive(Debug, Deserialize)]
struct PhoenixFrame {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Deserialize)]
struct ChangeData {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
}

fn parse_frame(text: &str, room_id: &str) -> FeedFrame {
    let frame: PhoenixFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(error) => {
            tracing::debug!(code = FEED_FRAME_UNREADABLE, error = %error, "skipping realtime frame");
            return FeedFrame::Ignored;
        }
    };

    match frame.event.as_str() {
        "phx_reply" => {
            let status = frame.payload.get("status").and_then(Value::as_str);
            if status == Some("error") {
                let reason = frame
                    .payload
                    .pointer("/response/reason")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown reason");
                return FeedFrame::JoinRejected(reason.to_owned());
            }
            FeedFrame::Ignored
        }
        "phx_error" => FeedFrame::JoinRejected("channel error".to_owned()),
        "postgres_changes" => frame
            .payload
            .get("data")
            .cloned()
            .and_then(|data| serde_json::from_value::<ChangeData>(data).ok())
            .and_then(|data| change_event(data, room_id))
            .map_or(FeedFrame::Ignored, FeedFrame::Change),
        _ => FeedFrame::Ignored,
    }
}

fn change_event(data: ChangeData, room_id: &str) -> Option<RoomEvent> {
    match data.kind.as_str() {
        "INSERT" => {
            let row: MessageRow = serde_json::from_value(data.record?).ok()?;
            let room = row.room_id.clone();
            Some(RoomEvent::inserted(room, ChatMessage::from(row)))
        }
        "DELETE" => {
            // Delete payloads carry only the primary key unless the table has full replica identity.
            let old = data.old_record?;
            let message_id = match old.get("id")? {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            };
            Some(RoomEvent::deleted(room_id, message_id))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::{convert::Infallible, sync::mpsc};

    use futures_util::{stream, Sink};
    use tokio_tungstenite::tungstenite;

    use super::*;
    use crate::domain::events::RoomChange;

    const INSERT_M1: &str = r#"{"topic":"realtime:messages:r1","event":"postgres_changes",
        "payload":{"data":{"type":"INSERT","record":{"id":"m1","room_id":"r1",
        "sender":"user_1","sender_name":"Ana","message":"hello","avatar":null,
        "created_at":"2024-05-01T10:00:00+00:00"}}}}"#;
    const DELETE_M9: &str = r#"{"topic":"realtime:messages:r1","event":"postgres_changes",
        "payload":{"data":{"type":"DELETE","old_record":{"id":"m9"}}}}"#;
    const MONITOR_DEADLINE: Duration = Duration::from_secs(1);

    fn channel(heartbeat: Duration) -> MonitorChannel {
        MonitorChannel {
            room_id: "r1".to_owned(),
            topic: room_topic("r1"),
            heartbeat,
        }
    }

    fn recording_sink() -> (
        impl Sink<Message, Error = Infallible> + Unpin,
        mpsc::Receiver<Message>,
    ) {
        let (tx, rx) = mpsc::channel();
        let sink = Box::pin(futures_util::sink::unfold(
            tx,
            |tx, message: Message| async move {
                let _ = tx.send(message);
                Ok::<_, Infallible>(tx)
            },
        ));
        (sink, rx)
    }

    fn sent_frames(sent: &mpsc::Receiver<Message>) -> Vec<Value> {
        sent.try_iter()
            .filter_map(|message| match message {
                Message::Text(text) => serde_json::from_str(&text).ok(),
                _ => None,
            })
            .collect()
    }

    fn text(frame: &str) -> Result<Message, tungstenite::Error> {
        Ok(Message::Text(frame.to_owned()))
    }

    #[tokio::test]
    async fn monitor_forwards_changes_until_socket_closes() {
        let (sink, sent) = recording_sink();
        let frames = stream::iter(vec![
            text(INSERT_M1),
            text(DELETE_M9),
            Ok(Message::Close(None)),
        ]);
        let (events_tx, events_rx) = mpsc::channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        tokio::time::timeout(
            MONITOR_DEADLINE,
            run_monitor(channel(Duration::from_secs(60)), sink, frames, events_tx, stop_rx),
        )
        .await
        .expect("monitor must end when the socket closes");

        let events: Vec<_> = events_rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0].change,
            RoomChange::Inserted(message) if message.id == "m1" && message.message == "hello"
        ));
        assert_eq!(events[1], RoomEvent::deleted("r1", "m9"));
        assert!(sent_frames(&sent).is_empty());
    }

    #[tokio::test]
    async fn stop_signal_leaves_the_channel() {
        let (sink, sent) = recording_sink();
        let frames = stream::pending::<Result<Message, tungstenite::Error>>();
        let (events_tx, _events_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).expect("monitor is listening");

        tokio::time::timeout(
            MONITOR_DEADLINE,
            run_monitor(channel(Duration::from_secs(60)), sink, frames, events_tx, stop_rx),
        )
        .await
        .expect("monitor must stop");

        let frames = sent_frames(&sent);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["event"], "phx_leave");
        assert_eq!(frames[0]["topic"], "realtime:messages:r1");
    }

    #[tokio::test]
    async fn dropped_stop_sender_also_stops_the_monitor() {
        let (sink, sent) = recording_sink();
        let frames = stream::pending::<Result<Message, tungstenite::Error>>();
        let (events_tx, _events_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);

        tokio::time::timeout(
            MONITOR_DEADLINE,
            run_monitor(channel(Duration::from_secs(60)), sink, frames, events_tx, stop_rx),
        )
        .await
        .expect("monitor must stop");

        assert_eq!(sent_frames(&sent)[0]["event"], "phx_leave");
    }

    #[tokio::test]
    async fn rejected_join_ends_the_monitor() {
        let (sink, _sent) = recording_sink();
        let rejected = r#"{"topic":"realtime:messages:r1","event":"phx_reply","ref":"1",
            "payload":{"status":"error","response":{"reason":"unauthorized"}}}"#;
        let frames = stream::iter(vec![text(rejected)]).chain(stream::pending());
        let (events_tx, events_rx) = mpsc::channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        tokio::time::timeout(
            MONITOR_DEADLINE,
            run_monitor(channel(Duration::from_secs(60)), sink, frames, events_tx, stop_rx),
        )
        .await
        .expect("monitor must end on a rejected join");

        assert!(events_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn heartbeats_go_to_the_phoenix_topic() {
        let (sink, sent) = recording_sink();
        let frames = stream::pending::<Result<Message, tungstenite::Error>>();
        let (events_tx, _events_rx) = mpsc::channel();
        let (_stop_tx, stop_rx) = watch::channel(false);

        let still_running = tokio::time::timeout(
            Duration::from_millis(60),
            run_monitor(channel(Duration::from_millis(10)), sink, frames, events_tx, stop_rx),
        )
        .await;

        assert!(still_running.is_err());
        let frames = sent_frames(&sent);
        assert!(!frames.is_empty());
        assert_eq!(frames[0]["topic"], "phoenix");
        assert_eq!(frames[0]["event"], "heartbeat");
        assert_eq!(frames[0]["ref"], "2");
    }

    #[test]
    fn socket_url_switches_scheme_and_carries_key() {
        assert_eq!(
            socket_url("https://db.example.com/", "anon"),
            "wss://db.example.com/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
        assert_eq!(
            socket_url("http://localhost:54321", "anon"),
            "ws://localhost:54321/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }

    #[test]
    fn join_frame_filters_inserts_and_deletes_by_room() {
        let frame = join_frame(&room_topic("r1"), "r1", "anon");

        assert_eq!(frame["topic"], "realtime:messages:r1");
        let changes = frame["payload"]["config"]["postgres_changes"]
            .as_array()
            .expect("changes array");
        assert_eq!(changes.len(), 2);
        assert!(changes
            .iter()
            .all(|change| change["filter"] == "room_id=eq.r1"));
    }

    #[test]
    fn insert_change_becomes_inserted_event() {
        let text = r#"{"topic":"realtime:messages:r1","event":"postgres_changes","ref":null,
            "payload":{"ids":[1],"data":{"type":"INSERT","schema":"public","table":"messages",
            "commit_timestamp":"2024-05-01T10:00:00Z",
            "record":{"id":"m1","room_id":"r1","sender":"user_1","sender_name":"Ana",
            "message":"hello","avatar":null,"created_at":"2024-05-01T10:00:00+00:00"}}}}"#;

        let FeedFrame::Change(event) = parse_frame(text, "r1") else {
            panic!("insert must map to a change");
        };

        assert_eq!(event.room_id, "r1");
        match event.change {
            RoomChange::Inserted(message) => {
                assert_eq!(message.id, "m1");
                assert_eq!(message.message, "hello");
            }
            other => panic!("unexpected change: {other:?}"),
        }
    }

    #[test]
    fn delete_change_uses_subscription_room() {
        let text = r#"{"topic":"realtime:messages:r1","event":"postgres_changes",
            "payload":{"data":{"type":"DELETE","old_record":{"id":"m9"}}}}"#;

        assert_eq!(
            parse_frame(text, "r1"),
            FeedFrame::Change(RoomEvent::deleted("r1", "m9"))
        );
    }

    #[test]
    fn rejected_join_is_reported() {
        let text = r#"{"topic":"realtime:messages:r1","event":"phx_reply","ref":"1",
            "payload":{"status":"error","response":{"reason":"unauthorized"}}}"#;

        assert_eq!(
            parse_frame(text, "r1"),
            FeedFrame::JoinRejected("unauthorized".to_owned())
        );
    }

    #[test]
    fn heartbeat_replies_and_garbage_are_ignored() {
        let reply = r#"{"topic":"phoenix","event":"phx_reply","ref":"2","payload":{"status":"ok","response":{}}}"#;

        assert_eq!(parse_frame(reply, "r1"), FeedFrame::Ignored);
        assert_eq!(parse_frame("not json", "r1"), FeedFrame::Ignored);
    }

    #[test]
    fn dropping_subscription_signals_stop() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let subscription = RealtimeSubscription {
            room_id: "r1".to_owned(),
            stop_tx: Some(stop_tx),
        };

        drop(subscription);

        assert!(*stop_rx.borrow());
    }
}

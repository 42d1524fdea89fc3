use std::{
    io::{self, BufRead},
    sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError},
    thread,
    time::Duration,
};

use anyhow::{Context, Result};

use crate::{
    domain::events::{AppEvent, RoomEvent},
    usecases::contracts::AppEventSource,
};

const EVENT_POLL_TIMEOUT: Duration = Duration::from_millis(100);
const STDIN_READ_FAILED: &str = "UI_STDIN_READ_FAILED";

/// Merges typed lines with live feed events. Feed events are drained first so
/// remote changes show up between inputs; a closed input stream means quit.
pub struct LineEventSource {
    lines: Receiver<String>,
    feed: Receiver<RoomEvent>,
}

impl LineEventSource {
    pub fn new(lines: Receiver<String>, feed: Receiver<RoomEvent>) -> Self {
        Self { lines, feed }
    }

    /// Reads stdin on a background thread.
    pub fn from_stdin(feed: Receiver<RoomEvent>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("superapp-stdin".to_owned())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                return;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(
                                code = STDIN_READ_FAILED,
                                error = %error,
                                "stdin read failed; closing chat input"
                            );
                            return;
                        }
                    }
                }
            })
            .context("failed to start stdin reader")?;

        Ok(Self::new(rx, feed))
    }
}

impl AppEventSource for LineEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        match self.feed.try_recv() {
            Ok(event) => return Ok(Some(AppEvent::Feed(event))),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }

        match self.lines.recv_timeout(EVENT_POLL_TIMEOUT) {
            Ok(line) => Ok(Some(AppEvent::Input(line))),
            Err(RecvTimeoutError::Timeout) => Ok(Some(AppEvent::Tick)),
            Err(RecvTimeoutError::Disconnected) => Ok(Some(AppEvent::QuitRequested)),
        }
    }
}

/// Replays a fixed list of events, then reports quit like a closed stdin.
#[cfg(test)]
pub struct MockEventSource {
    queue: std::collections::VecDeque<AppEvent>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn from(events: Vec<AppEvent>) -> Self {
        Self {
            queue: events.into(),
        }
    }
}

#[cfg(test)]
impl AppEventSource for MockEventSource {
    fn next_event(&mut self) -> Result<Option<AppEvent>> {
        Ok(Some(
            self.queue
                .pop_front()
                .unwrap_or(AppEvent::QuitRequested),
        ))
    }
}

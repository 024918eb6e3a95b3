//! Listener protocol: JSON events over the push channel.
//!
//! Server → client:
//!
//! ```json
//! {"event": "status", "data": {"msg": "Buffering..."}}
//! {"event": "play_track", "data": {"url": "http://host/tracks/x.wav", "bpm": 120.0, "prompt": "..."}}
//! ```
//!
//! Client → server: `{"event": "request_next"}` (a bare `request_next` frame
//! works too). Connecting counts as an implicit request.
//!
//! [`Dispatcher`] turns either trigger into the next event. It holds no
//! per-client state; the shared [`TrackBuffer`] decides who gets what.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::buffer::TrackBuffer;
use crate::config::RadioConfig;

/// Status text sent while no track is ready.
pub const BUFFERING: &str = "Buffering...";

/// What a listener needs to start playing a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPayload {
    pub url: String,
    pub bpm: f32,
    pub prompt: String,
}

/// Server → client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Status { msg: String },
    PlayTrack(TrackPayload),
}

impl ServerEvent {
    pub fn buffering() -> Self {
        ServerEvent::Status {
            msg: BUFFERING.to_string(),
        }
    }
}

/// Client → server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    RequestNext,
}

impl ClientEvent {
    /// Parse a text frame; `None` for anything unrecognized.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == "request_next" {
            return Some(ClientEvent::RequestNext);
        }
        serde_json::from_str(text).ok()
    }
}

/// `<public_url>/tracks/<file_name>`.
pub fn track_url(public_url: &str, file_name: &str) -> String {
    format!("{}/tracks/{file_name}", public_url.trim_end_matches('/'))
}

/// Answers connects and `request_next` from the shared buffer.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    buffer: Arc<TrackBuffer>,
    public_url: String,
}

impl Dispatcher {
    pub fn new(buffer: Arc<TrackBuffer>, public_url: impl Into<String>) -> Self {
        Self {
            buffer,
            public_url: public_url.into(),
        }
    }

    pub fn from_config(buffer: Arc<TrackBuffer>, config: &RadioConfig) -> Self {
        Self::new(buffer, config.public_url.clone())
    }

    pub fn on_connect(&self) -> ServerEvent {
        self.next_event()
    }

    pub fn on_request_next(&self) -> ServerEvent {
        self.next_event()
    }

    pub fn handle(&self, event: ClientEvent) -> ServerEvent {
        match event {
            ClientEvent::RequestNext => self.on_request_next(),
        }
    }

    /// Pop the oldest track, or report buffering. Never waits for production.
    pub fn next_event(&self) -> ServerEvent {
        match self.buffer.pop_or_empty() {
            Some(track) => {
                tracing::info!(id = %track.id, bpm = track.bpm, "handing out track");
                ServerEvent::PlayTrack(TrackPayload {
                    url: track_url(&self.public_url, &track.file_name),
                    bpm: track.bpm,
                    prompt: track.prompt,
                })
            }
            None => {
                tracing::debug!("buffer empty, listener told to wait");
                ServerEvent::buffering()
            }
        }
    }
}

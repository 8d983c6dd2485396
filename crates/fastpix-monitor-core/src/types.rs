//! Core types shared by the instrumentation components

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form attribute mapping attached to every dispatched event
pub type Attributes = serde_json::Map<String, Value>;

/// Event names understood by the collector
pub mod events {
    pub const PLAYER_READY: &str = "playerReady";
    pub const REQUEST_COMPLETED: &str = "requestCompleted";
    pub const REQUEST_FAILED: &str = "requestFailed";
    pub const VARIANT_CHANGED: &str = "variantChanged";
    pub const DESTROY: &str = "destroy";
    pub const ERROR: &str = "error";
    pub const PLAY: &str = "play";
    pub const DISPOSE: &str = "dispose";
    pub const CUE_CHANGE: &str = "cuechange";
}

/// Browser lifecycle events forwarded verbatim to the collector
pub const BROWSER_EVENTS: [&str; 10] = [
    "loadstart",
    "pause",
    "play",
    "playing",
    "seeking",
    "seeked",
    "timeupdate",
    "waiting",
    "error",
    "ended",
];

/// Handle returned by an event subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// `MEDIA_ERR_ABORTED`: the user agent aborted the fetch
pub const MEDIA_ERR_ABORTED: u16 = 1;

/// Player error as reported by `player.error()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaError {
    pub code: u16,
    pub message: String,
    /// Additional context, e.g. the HTTP status that caused the failure
    pub status: Option<String>,
}

impl MediaError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Aborted loads are not reported as errors
    pub fn is_aborted(&self) -> bool {
        self.code == MEDIA_ERR_ABORTED
    }
}

/// A single event as it left the dispatch channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchedEvent {
    /// Session token the event was scoped to
    pub token: String,
    /// Event name
    pub name: String,
    /// Event attributes
    pub attributes: Attributes,
}

/// Serialize a record into an attribute map
///
/// Records are plain structs, so anything other than an object (or a
/// serializer failure) yields an empty map.
pub fn to_attributes<T: Serialize>(record: &T) -> Attributes {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => map,
        _ => Attributes::new(),
    }
}

//! Collector SDK interface
//!
//! The collector owns transport and the wire format. The instrumentation
//! only needs:
//! - `configure(token, config)` once per session
//! - `dispatch(token, event, attributes)` for every event
//! - the utility methods `build_uuid`, `now` and `fetch_host`
//!
//! [`ChannelCollector`] hands dispatched events to an async transport task;
//! [`MemoryCollector`] records everything in memory.

use crate::config::CollectorConfig;
use crate::types::{events, Attributes, DispatchedEvent};
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

/// Host name of `url`, or an empty string when it cannot be parsed
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// The external metrics collector
pub trait Collector {
    /// Register a session under `token`
    fn configure(&self, token: &str, config: CollectorConfig);

    /// Send one event for the session identified by `token`
    fn dispatch(&self, token: &str, event: &str, attributes: Attributes);

    /// Fresh session token
    fn build_uuid(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Current time in milliseconds
    fn now(&self) -> f64 {
        Utc::now().timestamp_millis() as f64
    }

    /// Host name of a request URL
    fn fetch_host(&self, url: &str) -> String {
        host_of(url)
    }
}

/// Collector that forwards enriched events to an unbounded channel
pub struct ChannelCollector {
    /// Sessions by token
    sessions: RefCell<HashMap<String, CollectorConfig>>,
    /// Event channel for async processing
    event_tx: mpsc::UnboundedSender<DispatchedEvent>,
}

impl ChannelCollector {
    /// Create a collector and the receiving end for the transport task
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchedEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let collector = Self {
            sessions: RefCell::new(HashMap::new()),
            event_tx,
        };
        (collector, event_rx)
    }

    /// Number of configured sessions
    pub fn session_count(&self) -> usize {
        self.sessions.borrow().len()
    }
}

impl Collector for ChannelCollector {
    fn configure(&self, token: &str, config: CollectorConfig) {
        debug!(token, "Collector session configured");
        self.sessions.borrow_mut().insert(token.to_string(), config);
    }

    fn dispatch(&self, token: &str, event: &str, attributes: Attributes) {
        // Copy the config out so the hooks never run under a borrow
        let config = self.sessions.borrow().get(token).cloned();
        let Some(config) = config else {
            trace!(token, event, "Dispatch for unknown session dropped");
            return;
        };

        let mut merged = config.data().clone();
        merged.extend(config.state_data());
        merged.extend(attributes);

        if event == events::DESTROY {
            self.sessions.borrow_mut().remove(token);
        }

        let record = DispatchedEvent {
            token: token.to_string(),
            name: event.to_string(),
            attributes: merged,
        };

        if self.event_tx.send(record).is_err() {
            trace!(token, event, "Event receiver closed");
        }
    }
}

/// Collector that records every call, with a controllable clock
#[derive(Default)]
pub struct MemoryCollector {
    configured: RefCell<Vec<(String, CollectorConfig)>>,
    events: RefCell<Vec<DispatchedEvent>>,
    clock: Cell<Option<f64>>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin `now()` to `millis`
    pub fn set_now(&self, millis: f64) {
        self.clock.set(Some(millis));
    }

    /// Move the pinned clock forward
    pub fn advance(&self, millis: f64) {
        self.clock.set(Some(self.clock.get().unwrap_or(0.0) + millis));
    }

    /// All dispatched events, in order
    pub fn events(&self) -> Vec<DispatchedEvent> {
        self.events.borrow().clone()
    }

    /// Names of all dispatched events, in order
    pub fn event_names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }

    /// Dispatched events with the given name
    pub fn events_named(&self, name: &str) -> Vec<DispatchedEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.name == name)
            .cloned()
            .collect()
    }

    /// `(token, config)` pairs passed to `configure`
    pub fn configured(&self) -> Vec<(String, CollectorConfig)> {
        self.configured.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Collector for MemoryCollector {
    fn configure(&self, token: &str, config: CollectorConfig) {
        self.configured
            .borrow_mut()
            .push((token.to_string(), config));
    }

    fn dispatch(&self, token: &str, event: &str, attributes: Attributes) {
        self.events.borrow_mut().push(DispatchedEvent {
            token: token.to_string(),
            name: event.to_string(),
            attributes,
        });
    }

    fn now(&self) -> f64 {
        self.clock
            .get()
            .unwrap_or_else(|| Utc::now().timestamp_millis() as f64)
    }
}

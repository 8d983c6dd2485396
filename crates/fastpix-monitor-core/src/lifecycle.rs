//! Session lifecycle - readiness, event wiring and teardown
//!
//! One [`Session`] exists per attached player:
//!
//! ```text
//! Attaching ──(internal ready + 1 tick | first play)──> Ready
//!     │                                                   │
//!     └──────────────(destroy() | player dispose)─────────┴──> Destroyed
//! ```
//!
//! `playerReady` is dispatched exactly once, on the Attaching -> Ready edge.
//! The browser-event guard is shared by all listeners; it is raised when
//! teardown starts and only the teardown itself lowers it again.

use crate::collector::Collector;
use crate::guard::{best_effort, guarded};
use crate::host::Player;
use crate::scheduler::{Scheduler, Task};
use crate::types::{events, Attributes, ListenerId, MediaError, BROWSER_EVENTS};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, trace};

/// CSS class added to the player root once instrumentation is live
pub const PLAYER_CLASS: &str = "fpvjs";

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Listeners installed, waiting for the player to become ready
    Attaching,
    /// `playerReady` has been dispatched
    Ready,
    /// Torn down; nothing dispatches any more
    Destroyed,
}

impl Phase {
    /// Check if transition to `to` is valid
    pub fn can_transition_to(&self, to: Phase) -> bool {
        matches!(
            (self, to),
            (Phase::Attaching, Phase::Ready)
                | (Phase::Attaching, Phase::Destroyed)
                | (Phase::Ready, Phase::Destroyed)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Attaching => write!(f, "attaching"),
            Phase::Ready => write!(f, "ready"),
            Phase::Destroyed => write!(f, "destroyed"),
        }
    }
}

#[derive(Debug)]
struct SessionState {
    token: Option<String>,
    phase: Phase,
    event_guard: bool,
    error_tracking: bool,
    listeners: Vec<(&'static str, ListenerId)>,
}

/// Per-attach instrumentation session record
pub struct Session {
    state: RefCell<SessionState>,
    cleanups: RefCell<Vec<Task>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state.borrow())
            .field("cleanups", &self.cleanups.borrow().len())
            .finish()
    }
}

impl Session {
    /// Create an attaching session scoped to `token`
    pub fn new(token: impl Into<String>, error_tracking: bool) -> Self {
        Self {
            state: RefCell::new(SessionState {
                token: Some(token.into()).filter(|t| !t.is_empty()),
                phase: Phase::Attaching,
                event_guard: false,
                error_tracking,
                listeners: Vec::new(),
            }),
            cleanups: RefCell::new(Vec::new()),
        }
    }

    /// Session token; `None` after teardown
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().token.is_some()
    }

    pub fn event_guard(&self) -> bool {
        self.state.borrow().event_guard
    }

    pub fn error_tracking(&self) -> bool {
        self.state.borrow().error_tracking
    }

    /// Number of browser listeners currently registered
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Move to `Ready`. Returns `false` if the session was not attaching.
    fn mark_ready(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.token.is_none() || !state.phase.can_transition_to(Phase::Ready) {
            return false;
        }
        state.phase = Phase::Ready;
        true
    }

    fn record_listener(&self, event: &'static str, id: ListenerId) {
        self.state.borrow_mut().listeners.push((event, id));
    }

    /// Run `task` when the session is torn down. A session that is already
    /// gone runs it straight away.
    pub fn on_teardown(&self, task: Task) {
        if self.is_active() {
            self.cleanups.borrow_mut().push(task);
        } else {
            task();
        }
    }

    fn take_cleanups(&self) -> Vec<Task> {
        std::mem::take(&mut *self.cleanups.borrow_mut())
    }

    /// Raise the browser-event guard and hand back every listener
    fn begin_teardown(&self) -> Vec<(&'static str, ListenerId)> {
        let mut state = self.state.borrow_mut();
        state.event_guard = true;
        std::mem::take(&mut state.listeners)
    }

    fn reset(&self) {
        let mut state = self.state.borrow_mut();
        state.token = None;
        state.phase = Phase::Destroyed;
        state.event_guard = false;
    }
}

/// Token-scoped dispatch channel
#[derive(Clone)]
pub struct Dispatcher {
    session: Rc<Session>,
    collector: Rc<dyn Collector>,
}

impl Dispatcher {
    pub fn new(session: Rc<Session>, collector: Rc<dyn Collector>) -> Self {
        Self { session, collector }
    }

    /// Send `event` to the collector. A torn-down session drops it.
    pub fn dispatch(&self, event: &str, attributes: Attributes) {
        let Some(token) = self.session.token() else {
            trace!(event, "Dispatch after teardown dropped");
            return;
        };
        debug!(event, token = %token, "Dispatching event");
        self.collector.dispatch(&token, event, attributes);
    }

    pub fn session(&self) -> &Rc<Session> {
        &self.session
    }

    pub fn collector(&self) -> &dyn Collector {
        self.collector.as_ref()
    }
}

/// Swappable slot naming the session that host-wide hooks report into.
///
/// Request hooks and source-handler decorators are installed on the
/// framework once and outlive any single attach; each attach re-points the
/// route instead of stacking another layer.
#[derive(Clone, Default)]
pub struct SessionRoute {
    current: Rc<RefCell<Option<Dispatcher>>>,
}

impl SessionRoute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_to(&self, dispatcher: Dispatcher) {
        *self.current.borrow_mut() = Some(dispatcher);
    }

    pub fn current(&self) -> Option<Dispatcher> {
        self.current.borrow().clone()
    }

    /// Dispatch through the routed session, if any
    pub fn dispatch(&self, event: &str, attributes: Attributes) {
        match self.current() {
            Some(dispatcher) => dispatcher.dispatch(event, attributes),
            None => trace!(event, "No routed session, event dropped"),
        }
    }
}

/// Error attributes for an `error` event
pub fn error_attributes(error: &MediaError) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("player_error_code".to_string(), Value::from(error.code));
    attributes.insert(
        "player_error_message".to_string(),
        Value::from(error.message.clone()),
    );
    if let Some(status) = &error.status {
        attributes.insert(
            "player_error_context".to_string(),
            Value::from(status.clone()),
        );
    }
    attributes
}

/// Wires a player's events into a session
pub struct LifecycleController {
    player: Weak<dyn Player>,
    dispatcher: Dispatcher,
    scheduler: Rc<dyn Scheduler>,
}

impl LifecycleController {
    pub fn new(
        player: &Rc<dyn Player>,
        dispatcher: Dispatcher,
        scheduler: Rc<dyn Scheduler>,
    ) -> Rc<Self> {
        Rc::new(Self {
            player: Rc::downgrade(player),
            dispatcher,
            scheduler,
        })
    }

    pub fn session(&self) -> &Rc<Session> {
        self.dispatcher.session()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Install readiness hooks, browser listeners and the dispose listener
    #[instrument(skip(self), fields(token = ?self.session().token()))]
    pub fn attach(self: &Rc<Self>) {
        let Some(player) = self.player.upgrade() else {
            return;
        };

        let controller = self.clone();
        player.ready(guarded("player ready", move || {
            controller.on_player_ready();
            Ok(())
        }));

        let controller = self.clone();
        player.one(
            events::PLAY,
            guarded("first play", move || {
                controller.dispatch_player_ready();
                Ok(())
            }),
        );

        for event in BROWSER_EVENTS {
            if event == events::ERROR && !self.session().error_tracking() {
                continue;
            }
            let controller = self.clone();
            let id = player.on(
                event,
                guarded("browser event", move || controller.on_browser_event(event)),
            );
            self.session().record_listener(event, id);
        }

        let controller = self.clone();
        let id = player.on(
            events::DISPOSE,
            guarded("dispose", move || {
                controller.destroy();
                Ok(())
            }),
        );
        self.session().record_listener(events::DISPOSE, id);

        debug!(listeners = self.session().listener_count(), "Lifecycle listeners installed");
    }

    /// The player announced internal readiness; `playerReady` follows one tick later
    fn on_player_ready(self: &Rc<Self>) {
        if let Some(player) = self.player.upgrade() {
            player.add_class(PLAYER_CLASS);
        }
        let controller = self.clone();
        self.scheduler.defer(Box::new(move || {
            best_effort("deferred ready", || {
                controller.dispatch_player_ready();
                Ok(())
            })
        }));
    }

    /// Dispatch `playerReady` unless it already went out
    pub fn dispatch_player_ready(&self) {
        if self.session().mark_ready() {
            self.dispatcher.dispatch(events::PLAYER_READY, Attributes::new());
        }
    }

    fn on_browser_event(&self, event: &'static str) -> anyhow::Result<()> {
        if self.session().event_guard() {
            trace!(event, "Browser event suppressed");
            return Ok(());
        }

        let mut attributes = Attributes::new();
        if event == events::ERROR {
            if let Some(error) = self.player.upgrade().and_then(|player| player.error()) {
                if !error.is_aborted() {
                    attributes = error_attributes(&error);
                }
            }
        }

        self.dispatcher.dispatch(event, attributes);
        Ok(())
    }

    /// Tear the session down. Safe to call more than once.
    pub fn destroy(&self) {
        let session = self.session().clone();
        if !session.is_active() {
            return;
        }
        let token = session.token();

        let listeners = session.begin_teardown();
        let player = self.player.upgrade();
        if let Some(player) = &player {
            for (event, id) in listeners {
                best_effort("unsubscribe", || {
                    player.off(event, id);
                    Ok(())
                });
            }
        }
        for cleanup in session.take_cleanups() {
            best_effort("teardown cleanup", || {
                cleanup();
                Ok(())
            });
        }

        self.dispatcher.dispatch(events::DESTROY, Attributes::new());
        session.reset();

        if let Some(player) = &player {
            let owns_handle = player
                .tracking_handle()
                .is_some_and(|handle| Rc::ptr_eq(handle.session(), &session));
            if owns_handle {
                player.set_tracking_handle(None);
            }
        }

        info!(token = ?token, "Tracking session destroyed");
    }
}

/// Instrumentation handle installed on the player
#[derive(Clone)]
pub struct TrackingHandle {
    controller: Rc<LifecycleController>,
}

impl TrackingHandle {
    pub fn new(controller: Rc<LifecycleController>) -> Self {
        Self { controller }
    }

    /// Dispatch a custom event through the session
    pub fn dispatch(&self, event: &str, attributes: Attributes) {
        self.controller.dispatcher().dispatch(event, attributes);
    }

    pub fn destroy(&self) {
        self.controller.destroy();
    }

    pub fn token(&self) -> Option<String> {
        self.session().token()
    }

    pub fn session(&self) -> &Rc<Session> {
        self.controller.session()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.controller.dispatcher().clone()
    }
}

impl fmt::Debug for TrackingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingHandle")
            .field("token", &self.token())
            .field("phase", &self.session().phase())
            .finish()
    }
}

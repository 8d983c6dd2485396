//! In-memory host objects for integration tests

#![allow(dead_code)]

use fastpix_monitor_core::{
    ComputedStyle, Element, EventTarget, HostFramework, ListenerId, Listener, MediaError,
    MediaSource, PlaylistAttributes, Player, ReadyStateCallback, RequestHook, RequestOptions,
    ResponseBody, SourceHandle, SourceHandler, StreamingEngine, Tech, TextTrack, TrackingHandle,
    XhrHooks, XhrRequest, Attributes,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

// =============================================================================
// Events
// =============================================================================

#[derive(Default)]
pub struct FakeEvents {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(String, ListenerId, Listener, bool)>>,
}

impl FakeEvents {
    fn add(&self, event: &str, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push((event.to_string(), id, listener, once));
        id
    }

    pub fn emit(&self, event: &str) {
        let matching: Vec<(ListenerId, Listener, bool)> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(name, ..)| name == event)
            .map(|(_, id, listener, once)| (*id, listener.clone(), *once))
            .collect();

        self.listeners
            .borrow_mut()
            .retain(|(name, id, _, once)| !(name == event && *once && matching.iter().any(|m| m.0 == *id)));

        for (_, listener, _) in matching {
            listener();
        }
    }

    pub fn count(&self, event: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(name, ..)| name == event)
            .count()
    }

    pub fn total(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl EventTarget for FakeEvents {
    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.add(event, listener, false)
    }

    fn off(&self, event: &str, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(name, existing, ..)| !(name == event && *existing == id));
    }
}

// =============================================================================
// DOM
// =============================================================================

#[derive(Default)]
pub struct FakeElement {
    pub node_name: String,
    pub computed: Option<ComputedStyle>,
    pub first_child: Option<Rc<FakeElement>>,
    pub video: Option<(u32, u32)>,
}

impl FakeElement {
    pub fn div() -> Self {
        Self {
            node_name: "DIV".to_string(),
            ..Default::default()
        }
    }

    pub fn video(width: u32, height: u32) -> Self {
        Self {
            node_name: "video".to_string(),
            video: Some((width, height)),
            ..Default::default()
        }
    }
}

impl Element for FakeElement {
    fn node_name(&self) -> String {
        self.node_name.clone()
    }

    fn computed_style(&self) -> Option<ComputedStyle> {
        self.computed.clone()
    }

    fn first_child(&self) -> Option<Rc<dyn Element>> {
        self.first_child.clone().map(|child| child as Rc<dyn Element>)
    }

    fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.video
    }
}

// =============================================================================
// Tracks and streaming engine
// =============================================================================

pub struct FakeTrack {
    pub label: String,
    pub subscribable: bool,
    pub events: FakeEvents,
}

impl FakeTrack {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            subscribable: true,
            events: FakeEvents::default(),
        }
    }
}

impl TextTrack for FakeTrack {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn events(&self) -> Option<&dyn EventTarget> {
        if self.subscribable {
            Some(&self.events)
        } else {
            None
        }
    }
}

#[derive(Default)]
pub struct FakeEngine {
    pub playlist: RefCell<Option<PlaylistAttributes>>,
}

impl FakeEngine {
    pub fn set_bandwidth(&self, bandwidth: Option<u64>) {
        *self.playlist.borrow_mut() = Some(PlaylistAttributes {
            bandwidth,
            ..Default::default()
        });
    }
}

impl StreamingEngine for FakeEngine {
    fn media_playlist(&self) -> Option<PlaylistAttributes> {
        self.playlist.borrow().clone()
    }
}

#[derive(Default)]
pub struct FakeTech {
    pub vhs: Option<Rc<FakeEngine>>,
    pub hls: Option<Rc<FakeEngine>>,
}

impl Tech for FakeTech {
    fn vhs(&self) -> Option<Rc<dyn StreamingEngine>> {
        self.vhs.clone().map(|e| e as Rc<dyn StreamingEngine>)
    }

    fn hls(&self) -> Option<Rc<dyn StreamingEngine>> {
        self.hls.clone().map(|e| e as Rc<dyn StreamingEngine>)
    }
}

// =============================================================================
// Player
// =============================================================================

#[derive(Debug, Clone)]
pub struct PlayerState {
    pub paused: bool,
    pub fullscreen: Option<bool>,
    pub autoplay: Option<bool>,
    pub width: u32,
    pub height: u32,
    pub language: Option<String>,
    pub preload: String,
    pub poster: Option<String>,
    pub src: String,
    pub mime_type: String,
    pub duration: f64,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub current_time: f64,
    pub error: Option<MediaError>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            paused: true,
            fullscreen: Some(false),
            autoplay: None,
            width: 640,
            height: 360,
            language: Some("en".to_string()),
            preload: "auto".to_string(),
            poster: Some("https://cdn.example.com/poster.jpg".to_string()),
            src: "https://cdn.example.com/master.m3u8".to_string(),
            mime_type: "application/x-mpegURL".to_string(),
            duration: 120.5,
            video_width: Some(1280),
            video_height: Some(720),
            current_time: 0.0,
            error: None,
        }
    }
}

pub struct FakePlayer {
    pub id: String,
    pub subscribable: bool,
    pub events: FakeEvents,
    pub ready_callbacks: RefCell<Vec<Listener>>,
    pub disposed: Cell<bool>,
    pub classes: RefCell<Vec<String>>,
    pub state: RefCell<PlayerState>,
    pub element: RefCell<Option<Rc<FakeElement>>>,
    pub tech: RefCell<Option<Rc<FakeTech>>>,
    pub tracks: RefCell<Vec<Rc<FakeTrack>>>,
    handle: RefCell<Option<TrackingHandle>>,
}

impl FakePlayer {
    pub fn new(id: &str) -> Rc<Self> {
        Rc::new(Self {
            id: id.to_string(),
            subscribable: true,
            events: FakeEvents::default(),
            ready_callbacks: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
            classes: RefCell::new(Vec::new()),
            state: RefCell::new(PlayerState::default()),
            element: RefCell::new(None),
            tech: RefCell::new(None),
            tracks: RefCell::new(Vec::new()),
            handle: RefCell::new(None),
        })
    }

    /// A player object without an event interface
    pub fn without_events(id: &str) -> Rc<Self> {
        let mut player = Rc::try_unwrap(Self::new(id)).ok().unwrap();
        player.subscribable = false;
        Rc::new(player)
    }

    pub fn as_player(self: &Rc<Self>) -> Rc<dyn Player> {
        self.clone()
    }

    pub fn emit(&self, event: &str) {
        self.events.emit(event);
    }

    /// Announce internal readiness
    pub fn fire_ready(&self) {
        let callbacks: Vec<Listener> = self.ready_callbacks.borrow_mut().drain(..).collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Dispose the player, notifying listeners first
    pub fn dispose(&self) {
        self.emit("dispose");
        self.disposed.set(true);
    }
}

impl EventTarget for FakePlayer {
    fn on(&self, event: &str, listener: Listener) -> ListenerId {
        self.events.on(event, listener)
    }

    fn off(&self, event: &str, id: ListenerId) {
        self.events.off(event, id);
    }
}

impl Player for FakePlayer {
    fn can_subscribe(&self) -> bool {
        self.subscribable
    }

    fn one(&self, event: &str, listener: Listener) {
        self.events.add(event, listener, true);
    }

    fn ready(&self, listener: Listener) {
        self.ready_callbacks.borrow_mut().push(listener);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    fn add_class(&self, class: &str) {
        self.classes.borrow_mut().push(class.to_string());
    }

    fn el(&self) -> Option<Rc<dyn Element>> {
        self.element.borrow().clone().map(|el| el as Rc<dyn Element>)
    }

    fn id(&self) -> String {
        self.id.clone()
    }

    fn paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn is_fullscreen(&self) -> Option<bool> {
        self.state.borrow().fullscreen
    }

    fn autoplay(&self) -> Option<bool> {
        self.state.borrow().autoplay
    }

    fn width(&self) -> u32 {
        self.state.borrow().width
    }

    fn height(&self) -> u32 {
        self.state.borrow().height
    }

    fn language(&self) -> Option<String> {
        self.state.borrow().language.clone()
    }

    fn preload(&self) -> String {
        self.state.borrow().preload.clone()
    }

    fn poster(&self) -> Option<String> {
        self.state.borrow().poster.clone()
    }

    fn current_src(&self) -> String {
        self.state.borrow().src.clone()
    }

    fn current_type(&self) -> String {
        self.state.borrow().mime_type.clone()
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn video_width(&self) -> Option<u32> {
        self.state.borrow().video_width
    }

    fn video_height(&self) -> Option<u32> {
        self.state.borrow().video_height
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn error(&self) -> Option<MediaError> {
        self.state.borrow().error.clone()
    }

    fn tech(&self) -> Option<Rc<dyn Tech>> {
        self.tech.borrow().clone().map(|tech| tech as Rc<dyn Tech>)
    }

    fn text_tracks(&self) -> Vec<Rc<dyn TextTrack>> {
        self.tracks
            .borrow()
            .iter()
            .map(|track| track.clone() as Rc<dyn TextTrack>)
            .collect()
    }

    fn tracking_handle(&self) -> Option<TrackingHandle> {
        self.handle.borrow().clone()
    }

    fn set_tracking_handle(&self, handle: Option<TrackingHandle>) {
        *self.handle.borrow_mut() = handle;
    }
}

// =============================================================================
// Network
// =============================================================================

pub struct FakeRequest {
    pub state: Cell<u8>,
    pub status: Cell<u16>,
    pub url: String,
    pub response_type: String,
    pub body: RefCell<ResponseBody>,
    pub headers: String,
    pub callback: RefCell<Option<ReadyStateCallback>>,
}

impl FakeRequest {
    pub fn segment(url: &str, status: u16, len: usize) -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(1),
            status: Cell::new(status),
            url: url.to_string(),
            response_type: "arraybuffer".to_string(),
            body: RefCell::new(ResponseBody::ArrayBuffer(vec![0u8; len].into())),
            headers: "content-type: video/mp2t\r\ncontent-length: 188\r\nx-cache: HIT\r\n"
                .to_string(),
            callback: RefCell::new(None),
        })
    }

    pub fn manifest(url: &str, status: u16, text: &str) -> Rc<Self> {
        Rc::new(Self {
            state: Cell::new(1),
            status: Cell::new(status),
            url: url.to_string(),
            response_type: String::new(),
            body: RefCell::new(ResponseBody::Text(text.to_string())),
            headers: "content-type: application/vnd.apple.mpegurl\r\nserver: origin\r\n"
                .to_string(),
            callback: RefCell::new(None),
        })
    }

    /// Move to `state` and fire `onreadystatechange`
    pub fn advance(&self, state: u8) {
        self.state.set(state);
        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl XhrRequest for FakeRequest {
    fn ready_state(&self) -> u8 {
        self.state.get()
    }

    fn response_url(&self) -> String {
        self.url.clone()
    }

    fn response_type(&self) -> String {
        self.response_type.clone()
    }

    fn response(&self) -> ResponseBody {
        self.body.borrow().clone()
    }

    fn status(&self) -> u16 {
        self.status.get()
    }

    fn all_response_headers(&self) -> String {
        self.headers.clone()
    }

    fn on_ready_state_change(&self) -> Option<ReadyStateCallback> {
        self.callback.borrow().clone()
    }

    fn set_on_ready_state_change(&self, callback: Option<ReadyStateCallback>) {
        *self.callback.borrow_mut() = callback;
    }
}

/// Engine request pipeline with either hook style
pub struct FakeHooks {
    pub supports_on_request: bool,
    pub on_request_hooks: RefCell<Vec<RequestHook>>,
    pub before_request: RefCell<Option<RequestHook>>,
}

impl FakeHooks {
    pub fn on_request_style() -> Rc<Self> {
        Rc::new(Self {
            supports_on_request: true,
            on_request_hooks: RefCell::new(Vec::new()),
            before_request: RefCell::new(None),
        })
    }

    pub fn before_request_style(existing: Option<RequestHook>) -> Rc<Self> {
        Rc::new(Self {
            supports_on_request: false,
            on_request_hooks: RefCell::new(Vec::new()),
            before_request: RefCell::new(existing),
        })
    }

    /// Run `options` through the hooks, then call `beforeSend` like the engine does
    pub fn send(&self, request: &Rc<FakeRequest>, options: RequestOptions) -> RequestOptions {
        let mut options = options;
        let hooks: Vec<RequestHook> = self.on_request_hooks.borrow().clone();
        for hook in hooks {
            options = hook(options.clone()).unwrap_or(options);
        }
        let before_request = self.before_request.borrow().clone();
        if let Some(hook) = before_request {
            options = hook(options.clone()).unwrap_or(options);
        }

        if let Some(before_send) = &options.before_send {
            let request: Rc<dyn XhrRequest> = request.clone();
            before_send(&request);
        }
        options
    }
}

impl XhrHooks for FakeHooks {
    fn on_request(&self, hook: RequestHook) -> bool {
        if self.supports_on_request {
            self.on_request_hooks.borrow_mut().push(hook);
        }
        self.supports_on_request
    }

    fn before_request(&self) -> Option<RequestHook> {
        self.before_request.borrow().clone()
    }

    fn set_before_request(&self, hook: RequestHook) {
        *self.before_request.borrow_mut() = Some(hook);
    }
}

// =============================================================================
// Framework
// =============================================================================

pub struct FakeHandle {
    pub has_xhr: bool,
    pub player_id: Option<String>,
    pub legacy_parent_id: Option<String>,
}

impl SourceHandle for FakeHandle {
    fn has_xhr(&self) -> bool {
        self.has_xhr
    }

    fn player_id(&self) -> Option<String> {
        self.player_id.clone()
    }

    fn legacy_parent_id(&self) -> Option<String> {
        self.legacy_parent_id.clone()
    }
}

pub struct FakeSourceHandler {
    pub handle: Option<Rc<FakeHandle>>,
    pub calls: Cell<usize>,
}

impl FakeSourceHandler {
    pub fn for_player(id: &str) -> Rc<Self> {
        Rc::new(Self {
            handle: Some(Rc::new(FakeHandle {
                has_xhr: true,
                player_id: Some(id.to_string()),
                legacy_parent_id: Some(id.to_string()),
            })),
            calls: Cell::new(0),
        })
    }
}

impl SourceHandler for FakeSourceHandler {
    fn name(&self) -> String {
        "vhs".to_string()
    }

    fn can_handle_source(&self, source: &MediaSource) -> bool {
        source.mime_type.to_lowercase().contains("mpegurl")
    }

    fn handle_source(
        &self,
        _source: &MediaSource,
        _tech: &Rc<dyn Tech>,
        _options: &Attributes,
    ) -> Option<Rc<dyn SourceHandle>> {
        self.calls.set(self.calls.get() + 1);
        self.handle.clone().map(|h| h as Rc<dyn SourceHandle>)
    }
}

pub struct FakeFramework {
    pub version: Option<String>,
    pub invocable: bool,
    pub hooks: Option<Rc<FakeHooks>>,
    pub handlers: RefCell<Vec<Rc<dyn SourceHandler>>>,
    pub players: RefCell<HashMap<String, Rc<dyn Player>>>,
}

impl FakeFramework {
    pub fn new(version: &str, hooks: Option<Rc<FakeHooks>>) -> Rc<Self> {
        Rc::new(Self {
            version: Some(version.to_string()),
            invocable: true,
            hooks,
            handlers: RefCell::new(Vec::new()),
            players: RefCell::new(HashMap::new()),
        })
    }

    pub fn without_version() -> Rc<Self> {
        Rc::new(Self {
            version: None,
            invocable: true,
            hooks: None,
            handlers: RefCell::new(Vec::new()),
            players: RefCell::new(HashMap::new()),
        })
    }

    pub fn as_host(self: &Rc<Self>) -> Rc<dyn HostFramework> {
        self.clone()
    }

    pub fn register_player(&self, player: &Rc<FakePlayer>) {
        self.players
            .borrow_mut()
            .insert(player.id.clone(), player.clone() as Rc<dyn Player>);
    }

    pub fn register_handler(&self, handler: Rc<dyn SourceHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    /// Load a source through the handler at `index`, like the Html5 tech does
    pub fn load_source(&self, index: usize) -> Option<Rc<dyn SourceHandle>> {
        let handler = self.handlers.borrow()[index].clone();
        let tech: Rc<dyn Tech> = Rc::new(FakeTech::default());
        let source = MediaSource::new("https://cdn.example.com/master.m3u8", "application/x-mpegURL");
        handler.handle_source(&source, &tech, &Attributes::new())
    }
}

impl HostFramework for FakeFramework {
    fn version(&self) -> Option<String> {
        self.version.clone()
    }

    fn is_invocable(&self) -> bool {
        self.invocable
    }

    fn xhr_hooks(&self) -> Option<Rc<dyn XhrHooks>> {
        self.hooks.clone().map(|hooks| hooks as Rc<dyn XhrHooks>)
    }

    fn source_handlers(&self) -> Vec<Rc<dyn SourceHandler>> {
        self.handlers.borrow().clone()
    }

    fn set_source_handler(&self, index: usize, handler: Rc<dyn SourceHandler>) {
        self.handlers.borrow_mut()[index] = handler;
    }

    fn player(&self, id: &str) -> Option<Rc<dyn Player>> {
        self.players.borrow().get(id).cloned()
    }
}

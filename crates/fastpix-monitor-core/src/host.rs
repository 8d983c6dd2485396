//! Host capability interfaces
//!
//! The player, its framework and the network layer are owned by the host
//! page. The instrumentation only ever talks to them through these traits:
//! - [`Player`] / [`EventTarget`]: event wiring and state accessors
//! - [`Element`]: DOM access for dimension fallbacks
//! - [`Tech`] / [`StreamingEngine`]: adaptive-streaming internals
//! - [`XhrHooks`] / [`XhrRequest`]: the engine's request pipeline
//! - [`HostFramework`] / [`SourceHandler`]: tech registry and source loading
//!
//! Everything is single-threaded, so callbacks are `Rc<dyn Fn>` and no
//! `Send`/`Sync` bounds are imposed.

use crate::lifecycle::TrackingHandle;
use crate::types::{Attributes, ListenerId, MediaError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Event listener callback
pub type Listener = Rc<dyn Fn()>;

/// `onreadystatechange` callback
pub type ReadyStateCallback = Rc<dyn Fn()>;

/// Pre-send hook invoked with the request about to go out
pub type BeforeSend = Rc<dyn Fn(&Rc<dyn XhrRequest>)>;

/// Request-options transform (`onRequest` / `beforeRequest` style)
pub type RequestHook = Rc<dyn Fn(RequestOptions) -> Option<RequestOptions>>;

/// XHR ready-state values
pub mod ready_state {
    pub const UNSENT: u8 = 0;
    pub const OPENED: u8 = 1;
    pub const HEADERS_RECEIVED: u8 = 2;
    pub const LOADING: u8 = 3;
    pub const DONE: u8 = 4;
}

/// Something listeners can be attached to
pub trait EventTarget {
    /// Subscribe to `event`
    fn on(&self, event: &str, listener: Listener) -> ListenerId;

    /// Remove a listener previously returned by [`EventTarget::on`]
    fn off(&self, event: &str, id: ListenerId);
}

/// Computed CSS size of an element, as raw strings (e.g. `"640px"`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStyle {
    pub width: String,
    pub height: String,
}

/// DOM element access
pub trait Element {
    /// Node name, e.g. `"DIV"` or `"video"`
    fn node_name(&self) -> String;

    /// Computed style, when the environment has a layout engine
    fn computed_style(&self) -> Option<ComputedStyle> {
        None
    }

    fn first_child(&self) -> Option<Rc<dyn Element>> {
        None
    }

    /// Intrinsic `(width, height)` of a VIDEO node
    fn video_dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Text track exposed by the player
pub trait TextTrack {
    fn label(&self) -> String;

    /// Event interface of the track, when it supports subscription
    fn events(&self) -> Option<&dyn EventTarget>;
}

/// Attributes of the active media playlist
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistAttributes {
    /// `BANDWIDTH` in bits per second
    pub bandwidth: Option<u64>,
    /// `RESOLUTION` as (width, height)
    pub resolution: Option<(u64, u64)>,
    pub codecs: Option<String>,
}

#[cfg(feature = "m3u8")]
impl From<&m3u8_rs::VariantStream> for PlaylistAttributes {
    fn from(variant: &m3u8_rs::VariantStream) -> Self {
        Self {
            bandwidth: Some(variant.bandwidth),
            resolution: variant.resolution.map(|r| (r.width, r.height)),
            codecs: variant.codecs.clone(),
        }
    }
}

/// Adaptive-streaming engine (VHS / videojs-contrib-hls)
pub trait StreamingEngine {
    /// The playlist currently being played
    fn media_playlist(&self) -> Option<PlaylistAttributes>;
}

/// Playback tech
pub trait Tech {
    fn vhs(&self) -> Option<Rc<dyn StreamingEngine>> {
        None
    }

    fn hls(&self) -> Option<Rc<dyn StreamingEngine>> {
        None
    }

    /// Active engine: VHS when present, else the legacy HLS engine
    fn streaming_engine(&self) -> Option<Rc<dyn StreamingEngine>> {
        self.vhs().or_else(|| self.hls())
    }
}

/// The host media player
pub trait Player: EventTarget {
    /// Capability check used when validating an attach
    fn can_subscribe(&self) -> bool {
        true
    }

    /// Subscribe to the next occurrence of `event` only
    fn one(&self, event: &str, listener: Listener);

    /// Run `listener` once the player is internally ready
    fn ready(&self, listener: Listener);

    fn is_disposed(&self) -> bool;
    fn add_class(&self, class: &str);
    fn el(&self) -> Option<Rc<dyn Element>>;
    fn id(&self) -> String;

    fn paused(&self) -> bool;
    fn is_fullscreen(&self) -> Option<bool>;
    fn autoplay(&self) -> Option<bool>;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn language(&self) -> Option<String>;
    fn preload(&self) -> String;
    fn poster(&self) -> Option<String>;
    fn current_src(&self) -> String;
    fn current_type(&self) -> String;
    /// Duration in seconds; `f64::INFINITY` for live, `NaN` when unknown
    fn duration(&self) -> f64;
    fn video_width(&self) -> Option<u32>;
    fn video_height(&self) -> Option<u32>;
    /// Playhead position in seconds
    fn current_time(&self) -> f64;
    fn error(&self) -> Option<MediaError>;
    fn tech(&self) -> Option<Rc<dyn Tech>>;
    fn text_tracks(&self) -> Vec<Rc<dyn TextTrack>>;

    /// Instrumentation handle slot
    fn tracking_handle(&self) -> Option<TrackingHandle>;
    fn set_tracking_handle(&self, handle: Option<TrackingHandle>);
}

/// Response payload of an XHR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    ArrayBuffer(Bytes),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseBody::ArrayBuffer(_) => "arraybuffer",
            ResponseBody::Text(_) => "text",
            ResponseBody::Empty => "empty",
        }
    }
}

/// XHR-like request object handed to `beforeSend`
pub trait XhrRequest {
    fn ready_state(&self) -> u8;
    fn response_url(&self) -> String;
    /// `responseType`, `"arraybuffer"` for binary responses
    fn response_type(&self) -> String;
    fn response(&self) -> ResponseBody;
    fn status(&self) -> u16;
    /// Raw `getAllResponseHeaders()` blob
    fn all_response_headers(&self) -> String;

    /// Time the engine recorded for the first response byte, if any
    fn request_time(&self) -> Option<f64> {
        None
    }

    fn on_ready_state_change(&self) -> Option<ReadyStateCallback>;
    fn set_on_ready_state_change(&self, callback: Option<ReadyStateCallback>);
}

/// Options object passed through the engine's request hooks
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub uri: String,
    pub before_send: Option<BeforeSend>,
}

impl RequestOptions {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            before_send: None,
        }
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("uri", &self.uri)
            .field("before_send", &self.before_send.is_some())
            .finish()
    }
}

/// The engine's network configuration object (`Vhs.xhr`)
pub trait XhrHooks {
    /// Register an `onRequest` hook; `false` when the engine has no such hook
    fn on_request(&self, hook: RequestHook) -> bool;

    /// Current `beforeRequest` hook
    fn before_request(&self) -> Option<RequestHook>;

    fn set_before_request(&self, hook: RequestHook);
}

/// Source being loaded by a tech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSource {
    pub src: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl MediaSource {
    pub fn new(src: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Result of a successful `handleSource`
pub trait SourceHandle {
    /// Whether the handle runs requests through an XHR layer
    fn has_xhr(&self) -> bool;

    /// `handle.player().id()`
    fn player_id(&self) -> Option<String>;

    /// `handle.player_.el_.parentNode.id`
    fn legacy_parent_id(&self) -> Option<String> {
        None
    }
}

/// Tech source handler
pub trait SourceHandler {
    fn name(&self) -> String;
    fn can_handle_source(&self, source: &MediaSource) -> bool;
    fn handle_source(
        &self,
        source: &MediaSource,
        tech: &Rc<dyn Tech>,
        options: &Attributes,
    ) -> Option<Rc<dyn SourceHandle>>;
}

/// The player framework (`videojs` itself)
pub trait HostFramework {
    /// `videojs.VERSION`
    fn version(&self) -> Option<String>;

    /// Whether the framework object can be invoked to look up players
    fn is_invocable(&self) -> bool {
        true
    }

    /// `(Vhs ?? Hls).xhr`
    fn xhr_hooks(&self) -> Option<Rc<dyn XhrHooks>>;

    /// `getTech("Html5").sourceHandlers`
    fn source_handlers(&self) -> Vec<Rc<dyn SourceHandler>>;

    /// Replace the handler registered at `index`
    fn set_source_handler(&self, index: usize, handler: Rc<dyn SourceHandler>);

    /// `videojs(id)`
    fn player(&self, id: &str) -> Option<Rc<dyn Player>>;
}

//! FastPix Monitor Core - playback telemetry for Video.js players
//!
//! This crate instruments a host-owned player without the player noticing:
//! - Lifecycle events (ready, play, pause, errors, teardown)
//! - Network request timing, size and CDN headers
//! - Adaptive-bitrate variant switches
//! - On-demand player state snapshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      FastPix Monitor Core                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │                    ┌──────────────┐                             │
//! │                    │    Bridge    │  validate, configure        │
//! │                    └──────┬───────┘                             │
//! │         ┌─────────────────┼─────────────────┐                   │
//! │  ┌──────┴───────┐  ┌──────┴───────┐  ┌──────┴───────┐           │
//! │  │  Lifecycle   │  │   Request    │  │   Variant    │           │
//! │  │  Controller  │  │ Interceptor  │  │   Watcher    │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │          ┌──────┴───────┐         │                   │
//! │         │          │   Reporter   │ headers, content type       │
//! │         │          └──────┬───────┘         │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                    ┌──────┴───────┐  ┌──────────────┐           │
//! │                    │  Dispatcher  │──│  Collector   │           │
//! │                    └──────────────┘  └──────────────┘           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The player, its framework and the collector are external; see [`host`]
//! and [`collector`] for the interfaces they implement.

pub mod error;
pub mod types;
pub mod config;
pub mod host;
pub mod collector;
pub mod guard;
pub mod scheduler;
pub mod headers;
pub mod content;
pub mod reporter;
pub mod interceptor;
pub mod variant;
pub mod snapshot;
pub mod lifecycle;
pub mod resolver;
pub mod bridge;

pub use error::{Error, Result};
pub use types::*;
pub use config::{CollectorConfig, TrackingConfig};
pub use host::{
    BeforeSend, ComputedStyle, Element, EventTarget, HostFramework, Listener, MediaSource,
    PlaylistAttributes, Player, ReadyStateCallback, RequestHook, RequestOptions, ResponseBody,
    SourceHandle, SourceHandler, StreamingEngine, Tech, TextTrack, XhrHooks, XhrRequest,
};
pub use collector::{ChannelCollector, Collector, MemoryCollector};
pub use scheduler::{Scheduler, TaskQueue};
pub use headers::{filter_headers, FilteredHeaders};
pub use content::{classify, RequestType};
pub use reporter::{CompletedRequest, FailedRequest, RequestOutcome, RequestReporter};
pub use interceptor::{HookStyle, RequestInterceptor};
pub use variant::VariantWatcher;
pub use snapshot::PlayerSnapshot;
pub use lifecycle::{Dispatcher, LifecycleController, Phase, Session, SessionRoute, TrackingHandle};
pub use resolver::{FrameworkVersion, PlayerIdResolver};
pub use bridge::{Bridge, TrackingApi};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log library initialization
pub fn init() {
    tracing::info!(version = VERSION, "FastPix Monitor Core initialized");
}

//! Variant (rendition) switch detection
//!
//! VHS publishes a `segment-metadata` text track whose cues change whenever a
//! new segment starts playing. On each cue change the active media
//! playlist's `BANDWIDTH` is compared with the last one seen; a difference
//! is reported as `variantChanged`.

use crate::error::Error;
use crate::guard::guarded;
use crate::host::{Player, TextTrack};
use crate::lifecycle::Dispatcher;
use crate::types::{events, Attributes, ListenerId};
use anyhow::Context;
use serde_json::Value;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Label of the VHS segment metadata track
pub const SEGMENT_METADATA_LABEL: &str = "segment-metadata";

/// First track labelled `segment-metadata`
pub fn find_segment_metadata_track(tracks: &[Rc<dyn TextTrack>]) -> Option<Rc<dyn TextTrack>> {
    tracks
        .iter()
        .find(|track| track.label() == SEGMENT_METADATA_LABEL)
        .cloned()
}

/// Change detection over observed bandwidths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandwidthTracker {
    last: Option<u64>,
}

impl BandwidthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Record an observation. Returns the bandwidth to report when it
    /// differs from the previous one; the first defined value counts as a
    /// change.
    pub fn update(&mut self, bandwidth: Option<u64>) -> Option<u64> {
        let changed = bandwidth != self.last;
        self.last = bandwidth;
        if changed {
            bandwidth
        } else {
            None
        }
    }
}

/// Watches one player's segment metadata track
pub struct VariantWatcher {
    player: Weak<dyn Player>,
    track: Weak<dyn TextTrack>,
    listener: Cell<Option<ListenerId>>,
    dispatcher: Dispatcher,
    tracker: Cell<BandwidthTracker>,
}

impl VariantWatcher {
    /// Subscribe to the player's segment metadata cues. Returns `None` when
    /// the player has no such track or the track cannot be subscribed to.
    ///
    /// The subscription is dropped when the dispatcher's session is torn down.
    pub fn watch(player: &Rc<dyn Player>, dispatcher: Dispatcher) -> Option<Rc<Self>> {
        let track = find_segment_metadata_track(&player.text_tracks())?;
        let target = track.events()?;

        let watcher = Rc::new(Self {
            player: Rc::downgrade(player),
            track: Rc::downgrade(&track),
            listener: Cell::new(None),
            dispatcher,
            tracker: Cell::new(BandwidthTracker::new()),
        });

        // The listener holds the watcher weakly so a detached watcher can drop
        let observer = Rc::downgrade(&watcher);
        let id = target.on(
            events::CUE_CHANGE,
            guarded("cue change", move || match observer.upgrade() {
                Some(watcher) => watcher.on_cue_change(),
                None => Ok(()),
            }),
        );
        watcher.listener.set(Some(id));

        let detached = watcher.clone();
        watcher
            .dispatcher
            .session()
            .on_teardown(Box::new(move || detached.detach()));
        debug!(player = %player.id(), "Variant watcher attached");

        Some(watcher)
    }

    /// Unsubscribe from the track. Safe to call more than once.
    pub fn detach(&self) {
        let Some(id) = self.listener.take() else {
            return;
        };
        let Some(track) = self.track.upgrade() else {
            return;
        };
        if let Some(target) = track.events() {
            target.off(events::CUE_CHANGE, id);
            debug!("Variant watcher detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener.get().is_some()
    }

    /// Last bandwidth observed
    pub fn last_bandwidth(&self) -> Option<u64> {
        self.tracker.get().last()
    }

    fn current_bandwidth(&self) -> anyhow::Result<Option<u64>> {
        let player = self.player.upgrade().context("player dropped")?;
        let engine = player
            .tech()
            .and_then(|tech| tech.streaming_engine())
            .ok_or(Error::MissingEngine)?;
        let playlist = engine.media_playlist().ok_or(Error::MissingPlaylist)?;
        Ok(playlist.bandwidth)
    }

    fn on_cue_change(&self) -> anyhow::Result<()> {
        let bandwidth = self.current_bandwidth()?;

        let mut tracker = self.tracker.get();
        let changed = tracker.update(bandwidth);
        self.tracker.set(tracker);

        if let Some(bitrate) = changed {
            let mut attributes = Attributes::new();
            attributes.insert("video_source_bitrate".to_string(), Value::from(bitrate));
            self.dispatcher.dispatch(events::VARIANT_CHANGED, attributes);
        }
        Ok(())
    }
}

//! Point-in-time player state
//!
//! Recomputed on every collector request, never cached.

use crate::guard::best_effort_value;
use crate::host::Player;
use crate::types::{to_attributes, Attributes};
use serde::{Deserialize, Serialize};

/// Player and source attributes at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_is_paused: bool,
    pub player_is_fullscreen: bool,
    pub player_autoplay_on: bool,
    pub player_width: Option<u32>,
    pub player_height: Option<u32>,
    pub player_language_code: String,
    pub player_preload_on: bool,
    pub video_poster_url: Option<String>,
    pub video_source_url: String,
    pub video_source_mime_type: String,
    /// Duration in whole milliseconds; `None` when unknown, zero or live
    pub video_source_duration: Option<u64>,
    pub video_source_is_live: bool,
    pub video_source_height: Option<u32>,
    pub video_source_width: Option<u32>,
}

/// Leading-integer parse with `parseInt` semantics ("640.5px" -> 640)
pub fn parse_css_pixels(value: &str) -> Option<u32> {
    let trimmed = value.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// `auto` and `metadata` preload modes fetch data before play
pub fn is_preload_on(preload: &str) -> bool {
    matches!(preload, "auto" | "metadata")
}

fn duration_millis(duration: f64) -> Option<u64> {
    if duration.is_finite() && duration > 0.0 {
        Some((duration * 1000.0).floor() as u64)
    } else {
        None
    }
}

/// Player size: computed CSS first, player accessors otherwise
fn player_dimensions(player: &dyn Player) -> (Option<u32>, Option<u32>) {
    let computed = player
        .el()
        .and_then(|el| el.computed_style())
        .map(|style| (parse_css_pixels(&style.width), parse_css_pixels(&style.height)));

    match computed {
        Some((Some(width), Some(height))) => (Some(width), Some(height)),
        _ => (Some(player.width()), Some(player.height())),
    }
}

/// Intrinsic video size: player accessors first, the VIDEO child otherwise
fn video_dimensions(player: &dyn Player) -> (Option<u32>, Option<u32>) {
    let (width, height) = (player.video_width(), player.video_height());
    if width.is_some() && height.is_some() {
        return (width, height);
    }

    player
        .el()
        .and_then(|el| el.first_child())
        .filter(|child| child.node_name().eq_ignore_ascii_case("VIDEO"))
        .and_then(|video| video.video_dimensions())
        .map(|(w, h)| (Some(w), Some(h)))
        .unwrap_or((width, height))
}

/// Capture the player's state, or `None` once it is disposed
pub fn capture(player: &dyn Player) -> Option<PlayerSnapshot> {
    if player.is_disposed() {
        return None;
    }

    let duration = player.duration();
    let (player_width, player_height) = player_dimensions(player);
    let (video_source_width, video_source_height) = video_dimensions(player);

    Some(PlayerSnapshot {
        player_is_paused: player.paused(),
        player_is_fullscreen: player.is_fullscreen().unwrap_or(false),
        player_autoplay_on: player.autoplay().unwrap_or(false),
        player_width,
        player_height,
        player_language_code: player.language().unwrap_or_default(),
        player_preload_on: is_preload_on(&player.preload()),
        video_poster_url: player.poster(),
        video_source_url: player.current_src(),
        video_source_mime_type: player.current_type().to_lowercase(),
        video_source_duration: duration_millis(duration),
        video_source_is_live: duration == f64::INFINITY,
        video_source_height,
        video_source_width,
    })
}

/// Snapshot as collector attributes; empty when disposed or on failure
pub fn state_attributes(player: &dyn Player) -> Attributes {
    best_effort_value("snapshot", || Ok(capture(player)))
        .flatten()
        .map(|snapshot| to_attributes(&snapshot))
        .unwrap_or_default()
}

/// Playhead position in whole milliseconds; 0 when disposed or unknown
pub fn playhead_millis(player: &dyn Player) -> u64 {
    if player.is_disposed() {
        return 0;
    }
    let seconds = player.current_time();
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).floor() as u64
    } else {
        0
    }
}

//! Tracking configuration
//!
//! [`TrackingConfig`] is what the embedding page passes in (usually as JSON).
//! [`CollectorConfig`] is what the collector receives on `configure`: the
//! same options plus SDK metadata and the state/playhead hooks.

use crate::types::Attributes;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Reported as `player_software_name`
pub const PLAYER_SOFTWARE_NAME: &str = "Video.js Player";

/// Reported as `player_fastpix_sdk_name`
pub const SDK_NAME: &str = "fastpix-videojs-monitoring";

/// Reported as `player_fastpix_sdk_version`
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_true() -> bool {
    true
}

/// Caller-supplied tracking options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingConfig {
    /// Forward player errors with code/message/context
    #[serde(default = "default_true")]
    pub automatic_error_tracking: bool,
    /// Custom key/values merged into every dispatch
    #[serde(default)]
    pub data: Attributes,
    /// Anything else, forwarded to the collector verbatim
    #[serde(flatten)]
    pub passthrough: Attributes,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            automatic_error_tracking: true,
            data: Attributes::new(),
            passthrough: Attributes::new(),
        }
    }
}

impl TrackingConfig {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builder-style custom data entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_error_tracking(mut self, enabled: bool) -> Self {
        self.automatic_error_tracking = enabled;
        self
    }

    /// Add player/SDK identification to `data`. SDK keys win over
    /// caller-supplied keys of the same name.
    pub(crate) fn with_software_metadata(mut self, framework_version: &str) -> Self {
        let metadata = [
            ("player_software_name", PLAYER_SOFTWARE_NAME),
            ("player_software_version", framework_version),
            ("player_fastpix_sdk_name", SDK_NAME),
            ("player_fastpix_sdk_version", SDK_VERSION),
        ];
        for (key, value) in metadata {
            self.data.insert(key.to_string(), Value::from(value));
        }
        self
    }
}

/// Computes the current player snapshot
pub type StateFetcher = Rc<dyn Fn() -> Attributes>;

/// Computes the playhead position in milliseconds
pub type PlayheadFetcher = Rc<dyn Fn() -> u64>;

/// Configuration handed to [`crate::Collector::configure`]
#[derive(Clone)]
pub struct CollectorConfig {
    pub tracking: TrackingConfig,
    pub fetch_state_data: StateFetcher,
    pub fetch_playhead_time: PlayheadFetcher,
}

impl CollectorConfig {
    pub fn data(&self) -> &Attributes {
        &self.tracking.data
    }

    pub fn state_data(&self) -> Attributes {
        (self.fetch_state_data)()
    }

    pub fn playhead_time(&self) -> u64 {
        (self.fetch_playhead_time)()
    }
}

impl fmt::Debug for CollectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectorConfig")
            .field("tracking", &self.tracking)
            .finish_non_exhaustive()
    }
}

//! Owning-player lookup for source handles
//!
//! Video.js 7.4 added `handle.player()`. Older releases only expose the
//! player through private fields, reached via the tech element's parent.

use crate::error::Error;
use crate::host::SourceHandle;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// `major.minor` of the host framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameworkVersion {
    pub major: u32,
    pub minor: u32,
}

impl FrameworkVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

/// First release with `handle.player()`
pub const STRUCTURED_ID_SINCE: FrameworkVersion = FrameworkVersion::new(7, 4);

fn leading_number(part: &str) -> Option<u32> {
    let end = part
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(part.len());
    part[..end].parse().ok()
}

impl FromStr for FrameworkVersion {
    type Err = Error;

    fn from_str(version: &str) -> Result<Self, Self::Err> {
        let mut parts = version.trim().split('.');
        let major = parts
            .next()
            .and_then(leading_number)
            .ok_or_else(|| Error::InvalidVersion(version.to_string()))?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        Ok(Self { major, minor })
    }
}

impl fmt::Display for FrameworkVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Strategy for finding the id of the player that owns a source handle
pub trait PlayerIdResolver {
    fn resolve(&self, handle: &dyn SourceHandle) -> Option<String>;
    fn name(&self) -> &'static str;
}

/// `handle.player().id()`
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredIdResolver;

impl PlayerIdResolver for StructuredIdResolver {
    fn resolve(&self, handle: &dyn SourceHandle) -> Option<String> {
        handle.player_id()
    }

    fn name(&self) -> &'static str {
        "structured"
    }
}

/// `handle.player_.el_.parentNode.id`
///
/// Deprecated: reads private framework fields, kept for pre-7.4 hosts only.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyParentResolver;

impl PlayerIdResolver for LegacyParentResolver {
    fn resolve(&self, handle: &dyn SourceHandle) -> Option<String> {
        handle.legacy_parent_id()
    }

    fn name(&self) -> &'static str {
        "legacy-parent"
    }
}

/// Pick the resolver for a framework version string
pub fn for_version(version: &str) -> Rc<dyn PlayerIdResolver> {
    match version.parse::<FrameworkVersion>() {
        Ok(parsed) if parsed >= STRUCTURED_ID_SINCE => Rc::new(StructuredIdResolver),
        _ => Rc::new(LegacyParentResolver),
    }
}

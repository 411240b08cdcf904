//! Install priorities
//!
//! Lower numbers win conflicts in a nix profile. Each install takes one more
//! than the highest priority in use, so packages added earlier keep
//! precedence, matching the order of declarations in the generated flake.

use crate::error::{Error, Result};
use crate::manifest::{self, Manifest};
use camino::Utf8Path;
use tracing::debug;

/// Priority nix assigns when none is given
pub const DEFAULT_PRIORITY: i64 = 5;

/// Priority for the next install into a profile holding `manifest`.
///
/// Fails with [`Error::PriorityOverflow`] when the highest priority in use is
/// already `i64::MAX`.
pub fn next_priority(manifest: &Manifest) -> Result<i64> {
    let max = manifest
        .max_priority()
        .map_or(DEFAULT_PRIORITY, |max| max.max(DEFAULT_PRIORITY));
    max.checked_add(1).ok_or(Error::PriorityOverflow { max })
}

/// Read the profile's manifest as it is on disk now and compute the next
/// priority. Call once per install, right before installing.
pub fn next_priority_for_profile(profile: &Utf8Path) -> Result<i64> {
    let manifest = manifest::read(profile)?;
    let priority = next_priority(&manifest)?;
    debug!(
        "next priority for {} is {} ({} element(s) installed)",
        profile,
        priority,
        manifest.elements.len()
    );
    Ok(priority)
}

//! Nix profile bookkeeping for flakeforge
//!
//! This crate handles:
//! - Reading profile manifests in both historical shapes
//! - Computing install priorities
//! - Blocking installs of insecure packages
//! - Running `nix profile list/install/remove`

pub mod env;
pub mod error;
pub mod guard;
pub mod manifest;
pub mod priority;
pub mod profile;

pub use env::EnvPolicy;
pub use error::{Error, Result};
pub use guard::{InstallationGuard, NixEvalLookup, VulnerabilityLookup};
pub use manifest::{Manifest, ManifestElement};
pub use priority::{next_priority, next_priority_for_profile, DEFAULT_PRIORITY};
pub use profile::{InstallRequest, ProfileInstaller, ProfileOperations};

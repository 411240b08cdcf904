//! # flakeforge-core
//!
//! Core library for flakeforge providing:
//! - Project configuration (`flakeforge.yaml`) and the `ProjectConfig` capability
//! - External command execution behind the `CommandRunner` trait
//! - Redaction of diagnostic text for user-facing error output
//!
//! The generation pipeline (`flakeforge-gen`) and the profile bookkeeping
//! (`flakeforge-nix`) only depend on the traits exported here, so tests can
//! substitute fakes for the configuration and for the external tools.

pub mod config;
pub mod error;
pub mod process;
pub mod redact;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{Feature, ProjectConfig, ProjectSettings};
pub use error::{Error, Result};
pub use process::{CommandOutput, CommandRunner, CommandSpec, CommandStatus, SystemRunner};
pub use redact::Redact;

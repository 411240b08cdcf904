//! Environment file generation for flakeforge
//!
//! This crate handles:
//! - Rendering embedded templates against a build plan
//! - Diff-aware writes that keep unchanged files untouched
//! - The glibc patch flake
//! - Git visibility of the generated flake

pub mod error;
pub mod generate;
pub mod git;
pub mod glibc;
pub mod plan;
pub mod sync;
pub mod templates;

pub use error::{Error, Result};
pub use generate::{flake_template, generate_for_print_env};
pub use git::{ensure_tracked, find_git_marker, Tracking};
pub use glibc::GlibcPatchFlake;
pub use plan::{BuildPlan, FlakeInput, NixpkgsInfo, PlanPackage};
pub use sync::{write_if_changed, ContentChange, SyncOutcome};
pub use templates::GenerationContext;

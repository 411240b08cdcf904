//! `nix profile` operations
//!
//! [`ProfileOperations`] wraps the `list`, `install` and `remove` subcommands.
//! [`ProfileInstaller`] adds what a safe install needs on top: the
//! vulnerability guard and a priority computed from the manifest right before
//! nix runs.

use crate::env::EnvPolicy;
use crate::error::{Error, Result};
use crate::guard::InstallationGuard;
use crate::priority::next_priority_for_profile;
use camino::{Utf8Path, Utf8PathBuf};
use flakeforge_core::{CommandRunner, CommandSpec};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// `nix` with the experimental features profile commands need
pub(crate) fn nix_command() -> CommandSpec {
    CommandSpec::new("nix").args(["--extra-experimental-features", "nix-command flakes"])
}

fn profile_command(subcommand: &str, profile: &Utf8Path) -> CommandSpec {
    nix_command()
        .args(["profile", subcommand, "--profile"])
        .arg(profile.as_str())
}

/// Parameters of one install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub installable: String,
    pub profile_path: Utf8PathBuf,
    /// Pass `--offline` to nix
    pub offline: bool,
    /// Install even if the package is flagged insecure
    pub allow_insecure: bool,
    /// Kill nix if the install takes longer than this
    pub timeout: Option<Duration>,
}

impl InstallRequest {
    pub fn new(installable: impl Into<String>, profile_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            installable: installable.into(),
            profile_path: profile_path.into(),
            offline: false,
            allow_insecure: false,
            timeout: None,
        }
    }

    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Runs `nix profile` subcommands against a profile directory
#[derive(Clone)]
pub struct ProfileOperations {
    runner: Arc<dyn CommandRunner>,
    env: EnvPolicy,
}

impl ProfileOperations {
    pub fn new(runner: Arc<dyn CommandRunner>, env: EnvPolicy) -> Self {
        Self { runner, env }
    }

    /// Output of `nix profile list`, verbatim
    pub async fn list(&self, profile: &Utf8Path, json: bool) -> Result<String> {
        let mut spec = profile_command("list", profile);
        if json {
            spec = spec.arg("--json");
        }

        let output = self
            .runner
            .output(&spec)
            .await
            .and_then(|output| output.check(&spec))
            .map_err(|e| Error::profile("list", e))?;
        Ok(output.stdout_lossy())
    }

    /// Install `request.installable` at `priority`.
    ///
    /// nix draws its progress directly on the terminal, so nothing is
    /// captured; a failure carries only the exit status.
    pub async fn install(&self, request: &InstallRequest, priority: i64) -> Result<()> {
        let mut spec = profile_command("install", &request.profile_path)
            .arg("--impure")
            .arg("--priority")
            .arg(priority.to_string());
        if request.offline {
            spec = spec.arg("--offline");
        }
        let spec = self
            .env
            .with_insecure(request.allow_insecure)
            .apply(spec.arg(request.installable.as_str()));

        let status = self
            .runner
            .run_with_timeout(&spec, request.timeout)
            .await
            .map_err(|e| Error::profile("install", e))?;
        if !status.success() {
            return Err(Error::profile(
                "install",
                flakeforge_core::Error::command_failed(spec.to_string(), status.to_string(), ""),
            ));
        }
        Ok(())
    }

    /// Remove the elements at `indexes`; nix's output is included in the
    /// error on failure.
    pub async fn remove(&self, profile: &Utf8Path, indexes: &[String]) -> Result<()> {
        if indexes.is_empty() {
            return Err(Error::NoIndexes);
        }

        let spec = self
            .env
            .apply(profile_command("remove", profile).arg("--impure").args(indexes));
        self.runner
            .combined_output(&spec)
            .await
            .and_then(|output| output.check(&spec))
            .map_err(|e| Error::profile("remove", e))?;

        debug!("removed {} from {}", indexes.join(" "), profile);
        Ok(())
    }
}

/// Guarded installs with fresh priorities
#[derive(Clone)]
pub struct ProfileInstaller {
    operations: ProfileOperations,
    guard: InstallationGuard,
}

impl ProfileInstaller {
    pub fn new(operations: ProfileOperations, guard: InstallationGuard) -> Self {
        Self { operations, guard }
    }

    pub fn operations(&self) -> &ProfileOperations {
        &self.operations
    }

    /// Check, prioritize and install; returns the priority used.
    ///
    /// An insecure package fails before any command that touches the profile.
    pub async fn install(&self, request: &InstallRequest) -> Result<i64> {
        self.guard
            .check(&request.installable, request.allow_insecure)
            .await?;

        let priority = next_priority_for_profile(&request.profile_path)?;
        info!(
            "Installing {} with priority {}",
            request.installable, priority
        );
        self.operations.install(request, priority).await?;
        Ok(priority)
    }
}

//! Vulnerability guard for installs
//!
//! nixpkgs marks packages with known, unfixed vulnerabilities as insecure and
//! refuses to evaluate them unless `NIXPKGS_ALLOW_INSECURE` is set. The guard
//! checks this up front so the user gets the vulnerability list and the
//! override flag instead of a nix evaluation trace.

use crate::env::EnvPolicy;
use crate::error::{Error, Result};
use crate::profile::nix_command;
use async_trait::async_trait;
use flakeforge_core::{CommandRunner, CommandSpec};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of vulnerability metadata for installables
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VulnerabilityLookup: Send + Sync {
    /// Whether the package is flagged insecure
    async fn is_insecure(&self, installable: &str) -> Result<bool>;

    /// Known vulnerability identifiers, empty when unknown
    async fn known_vulnerabilities(&self, installable: &str) -> Result<Vec<String>>;
}

/// Looks up `meta` attributes with `nix eval`.
///
/// A failing evaluation (e.g. an attribute without `meta`) counts as "not
/// flagged" and "no list"; only unexpected output is an error. Evaluation runs
/// under the project's `env` policy.
pub struct NixEvalLookup {
    runner: Arc<dyn CommandRunner>,
    env: EnvPolicy,
}

impl NixEvalLookup {
    pub fn new(runner: Arc<dyn CommandRunner>, env: EnvPolicy) -> Self {
        Self { runner, env }
    }

    fn eval_spec(&self, installable: &str, attribute: &str) -> CommandSpec {
        self.env.apply(
            nix_command()
                .args(["eval", "--impure", "--json"])
                .arg(format!("{}.{}", installable, attribute)),
        )
    }

    async fn eval<T: DeserializeOwned>(&self, installable: &str, attribute: &str) -> Result<Option<T>> {
        let spec = self.eval_spec(installable, attribute);
        let output = self.runner.output(&spec).await?;
        if !output.status.success() {
            warn!(
                "could not evaluate {} of {} ({}), assuming it is unset",
                attribute, installable, output.status
            );
            debug!("nix eval stderr: {}", output.stderr_lossy().trim());
            return Ok(None);
        }

        serde_json::from_slice(&output.stdout)
            .map(Some)
            .map_err(|e| Error::EvalDecode {
                installable: installable.to_string(),
                attribute: attribute.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl VulnerabilityLookup for NixEvalLookup {
    async fn is_insecure(&self, installable: &str) -> Result<bool> {
        Ok(self
            .eval::<bool>(installable, "meta.insecure")
            .await?
            .unwrap_or(false))
    }

    async fn known_vulnerabilities(&self, installable: &str) -> Result<Vec<String>> {
        Ok(self
            .eval::<Vec<String>>(installable, "meta.knownVulnerabilities")
            .await?
            .unwrap_or_default())
    }
}

/// Blocks installs of insecure packages unless explicitly allowed
#[derive(Clone)]
pub struct InstallationGuard {
    lookup: Arc<dyn VulnerabilityLookup>,
}

impl InstallationGuard {
    pub fn new(lookup: Arc<dyn VulnerabilityLookup>) -> Self {
        Self { lookup }
    }

    /// Fail with [`Error::InsecurePackage`] when `installable` is flagged and
    /// `allow_insecure` is not set. With the override, nothing is looked up.
    pub async fn check(&self, installable: &str, allow_insecure: bool) -> Result<()> {
        if allow_insecure {
            debug!("insecure packages allowed, not checking {}", installable);
            return Ok(());
        }
        if !self.lookup.is_insecure(installable).await? {
            return Ok(());
        }

        let known = self.lookup.known_vulnerabilities(installable).await?;
        Err(Error::insecure_package(installable, known))
    }
}

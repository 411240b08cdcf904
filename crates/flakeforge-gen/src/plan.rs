//! Build plan consumed by the templates
//!
//! The plan is produced by an external planner (typically serialized as JSON)
//! and is treated as read-only input for the duration of a generation pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pinned nixpkgs input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixpkgsInfo {
    /// Flake reference, e.g. `github:NixOS/nixpkgs/<rev>`
    pub url: String,
    pub commit_hash: String,
}

/// A flake input contributing packages to the shell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakeInput {
    /// Identifier used for the input in the generated flake
    pub name: String,
    pub url: String,
    /// Attribute paths (relative to the input) added to `buildInputs`
    #[serde(default)]
    pub packages: Vec<String>,
}

/// A package requested by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPackage {
    pub name: String,
    /// Installable reference, `flakeref#attr`
    pub installable: String,
    /// Rebuild against the pinned glibc so binaries run on non-NixOS hosts
    #[serde(default)]
    pub patch_glibc: bool,
}

/// Everything the templates need to render one environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub nixpkgs: NixpkgsInfo,
    /// Nix system double, e.g. `x86_64-linux`
    pub system: String,
    #[serde(default)]
    pub flake_inputs: Vec<FlakeInput>,
    #[serde(default)]
    pub packages: Vec<PlanPackage>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildPlan {
    pub fn from_json(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    pub fn needs_glibc_patch(&self) -> bool {
        self.packages.iter().any(|p| p.patch_glibc)
    }

    /// Packages that must be rebuilt by the glibc patch flake
    pub fn glibc_patch_packages(&self) -> impl Iterator<Item = &PlanPackage> {
        self.packages.iter().filter(|p| p.patch_glibc)
    }

    /// Tera context: the plan's fields plus `needs_glibc_patch`.
    pub fn template_context(&self) -> tera::Result<tera::Context> {
        let mut context = tera::Context::from_serialize(self)?;
        context.insert("needs_glibc_patch", &self.needs_glibc_patch());
        Ok(context)
    }
}

//! Glibc patch flake
//!
//! Binaries from an arbitrary nixpkgs revision link against that revision's
//! glibc, which breaks when mixed with the project's pinned nixpkgs. The patch
//! flake rebuilds the affected packages against the pinned glibc. It lives in
//! its own directory next to the primary flake and is referenced from it as
//! `path:./glibc-patch`.

use crate::error::{Error, Result};
use crate::plan::PlanPackage;
use crate::sync;
use crate::templates::{embedded_asset, GenerationContext};
use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

/// Directory of the patch flake, relative to the flake directory
pub const GLIBC_PATCH_DIR: &str = "glibc-patch";

/// Name of the patch script written next to the patch flake
pub const GLIBC_PATCH_SCRIPT: &str = "glibc-patch.bash";

/// Mode of the patch script
pub const SCRIPT_MODE: u32 = 0o755;

/// One package to rebuild, split into its flake input and attribute path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchInput {
    /// Input identifier inside the patch flake
    pub name: String,
    /// Flake reference the package comes from
    pub url: String,
    /// Attribute path of the package relative to the input
    pub attr_path: String,
    /// Output attribute under `packages.<system>`
    pub package: String,
}

/// Template data for the `glibc-patch` flake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlibcPatchFlake {
    pub nixpkgs_glibc_ref: String,
    pub system: String,
    pub inputs: Vec<PatchInput>,
}

impl GlibcPatchFlake {
    /// Build the patch flake for `packages`, pinning glibc to `commit_hash`.
    ///
    /// Every package must have a `flakeref#attr` installable.
    pub fn new<'a>(
        commit_hash: &str,
        system: &str,
        packages: impl IntoIterator<Item = &'a PlanPackage>,
    ) -> Result<Self> {
        if commit_hash.is_empty() {
            return Err(Error::glibc_patch("nixpkgs commit hash is empty"));
        }

        let inputs = packages
            .into_iter()
            .enumerate()
            .map(|(index, package)| patch_input(index, package, system))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            nixpkgs_glibc_ref: format!("github:NixOS/nixpkgs/{}", commit_hash),
            system: system.to_string(),
            inputs,
        })
    }

    /// Write `flake.nix` and the patch script into `dir`.
    pub fn write_to(&self, ctx: &mut GenerationContext, dir: &Utf8Path) -> Result<()> {
        let context =
            tera::Context::from_serialize(self).map_err(|source| Error::TemplateRender {
                template: "glibc-patch".to_string(),
                source,
            })?;
        ctx.write_from_template(dir, &context, "glibc-patch", "flake.nix")?;

        let script = embedded_asset(GLIBC_PATCH_SCRIPT)
            .ok_or_else(|| Error::template_not_found(GLIBC_PATCH_SCRIPT))?;
        let path = dir.join(GLIBC_PATCH_SCRIPT);
        sync::write_if_changed(&path, &script, SCRIPT_MODE).map_err(|source| {
            Error::WriteAsset {
                asset: GLIBC_PATCH_SCRIPT.to_string(),
                path: path.clone(),
                source,
            }
        })?;

        debug!("wrote glibc patch flake for {} package(s) to {}", self.inputs.len(), dir);
        Ok(())
    }
}

fn patch_input(index: usize, package: &PlanPackage, system: &str) -> Result<PatchInput> {
    let (url, attr) = package
        .installable
        .split_once('#')
        .filter(|(url, attr)| !url.is_empty() && !attr.is_empty())
        .ok_or_else(|| {
            Error::glibc_patch(format!(
                "package {}: installable {:?} is not of the form flakeref#attr",
                package.name, package.installable
            ))
        })?;

    let attr_path = if attr.starts_with("packages.") || attr.starts_with("legacyPackages.") {
        attr.to_string()
    } else if url.contains("nixpkgs") {
        format!("legacyPackages.{}.{}", system, attr)
    } else {
        format!("packages.{}.{}", system, attr)
    };

    Ok(PatchInput {
        name: format!("patch-input-{}", index),
        url: url.to_string(),
        attr_path,
        package: package.name.clone(),
    })
}

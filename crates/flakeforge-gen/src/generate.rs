//! Full generation pass for `print-env`
//!
//! Produces every file the environment needs, in dependency order:
//!
//! 1. `shell.nix` in the gen directory
//! 2. `.gitignore` in the state directory
//! 3. the glibc patch flake, when any package needs it
//! 4. the primary `flake.nix`
//! 5. git staging of the flake, when the project is in a repository

use crate::error::Result;
use crate::git::{self, Tracking};
use crate::glibc::{GlibcPatchFlake, GLIBC_PATCH_DIR};
use crate::plan::BuildPlan;
use crate::templates::GenerationContext;
use flakeforge_core::{CommandRunner, Feature, ProjectConfig};
use tracing::info;

/// Template used for the primary flake under the given configuration
pub fn flake_template(config: &dyn ProjectConfig) -> &'static str {
    if config.feature_enabled(Feature::RemoveNixpkgs) {
        "flake_remove_nixpkgs"
    } else {
        "flake"
    }
}

/// Run one generation pass for `plan`.
///
/// `ctx` must not be shared with a concurrently running pass.
pub async fn generate_for_print_env(
    ctx: &mut GenerationContext,
    config: &dyn ProjectConfig,
    plan: &BuildPlan,
    runner: &dyn CommandRunner,
) -> Result<Tracking> {
    let context = plan
        .template_context()
        .map_err(|source| crate::Error::TemplateRender {
            template: "plan".to_string(),
            source,
        })?;
    let gen_dir = config.gen_dir();
    let flake_dir = config.flake_dir();

    ctx.write_from_template(&gen_dir, &context, "shell.nix", "shell.nix")?;
    ctx.write_from_template(&config.state_dir(), &context, "gitignore", ".gitignore")?;

    let needs_glibc_patch = plan.needs_glibc_patch();
    if needs_glibc_patch {
        let patch = GlibcPatchFlake::new(
            config.nixpkgs_commit_hash(),
            &plan.system,
            plan.glibc_patch_packages(),
        )?;
        patch.write_to(ctx, &flake_dir.join(GLIBC_PATCH_DIR))?;
    }

    ctx.write_from_template(&flake_dir, &context, flake_template(config), "flake.nix")?;
    info!("Generated environment files in {}", gen_dir);

    git::ensure_tracked(
        runner,
        &flake_dir,
        &gen_dir,
        needs_glibc_patch,
        config.debug_enabled(),
    )
    .await
}

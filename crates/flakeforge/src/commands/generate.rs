//! Generate command
//!
//! Renders the environment files for a build plan and makes the flake
//! visible to nix.

use anyhow::{Context, Result};
use flakeforge_core::{ProjectConfig, SystemRunner};
use flakeforge_gen::{generate_for_print_env, BuildPlan, GenerationContext, Tracking};

use super::{load_settings, GlobalArgs};
use crate::cli::GenerateArgs;
use crate::output;

pub async fn run(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global)?;

    let data = std::fs::read(&args.plan).context("Failed to read build plan")?;
    let plan = BuildPlan::from_json(&data).context("Failed to parse build plan")?;
    tracing::debug!(
        "Loaded build plan {} ({} package(s), system {})",
        args.plan,
        plan.packages.len(),
        plan.system
    );

    let mut ctx = GenerationContext::new(settings.debug_enabled());
    let tracking = generate_for_print_env(&mut ctx, &settings, &plan, &SystemRunner::new())
        .await
        .context("Failed to generate environment")?;

    output::success("Environment files are up to date");
    output::kv("flake", settings.flake_dir().as_str());
    if let Tracking::Staged { files } = tracking {
        output::kv("staged", &files.join(", "));
    }
    Ok(())
}

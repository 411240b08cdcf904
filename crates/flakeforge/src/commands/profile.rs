//! Profile management commands
//!
//! Operates on the project's nix profile:
//! - list: Show installed packages
//! - add: Install a package after the vulnerability check
//! - remove: Remove packages by index
//! - priority: Show the priority the next install would get

use anyhow::{Context, Result};
use flakeforge_core::{CommandRunner, ProjectConfig, ProjectSettings, SystemRunner};
use flakeforge_nix::{
    next_priority_for_profile, EnvPolicy, InstallRequest, InstallationGuard, NixEvalLookup,
    ProfileInstaller, ProfileOperations,
};
use std::sync::Arc;
use std::time::Duration;

use super::{load_settings, GlobalArgs};
use crate::cli::{ProfileAddArgs, ProfileCommands, ProfileListArgs, ProfileRemoveArgs};
use crate::output;

/// Main entry point for profile subcommands
pub async fn run(cmd: ProfileCommands, global: &GlobalArgs) -> Result<()> {
    let settings = load_settings(global)?;
    match cmd {
        ProfileCommands::List(args) => list(&settings, args).await,
        ProfileCommands::Add(args) => add(&settings, args).await,
        ProfileCommands::Remove(args) => remove(&settings, args).await,
        ProfileCommands::Priority => priority(&settings),
    }
}

fn operations(settings: &ProjectSettings, runner: Arc<dyn CommandRunner>) -> ProfileOperations {
    ProfileOperations::new(runner, EnvPolicy::from_config(settings))
}

async fn list(settings: &ProjectSettings, args: ProfileListArgs) -> Result<()> {
    let out = operations(settings, Arc::new(SystemRunner::new()))
        .list(&settings.profile_dir(), args.json)
        .await
        .context("Failed to list profile")?;
    print!("{}", out);
    Ok(())
}

async fn add(settings: &ProjectSettings, args: ProfileAddArgs) -> Result<()> {
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let lookup = NixEvalLookup::new(runner.clone(), EnvPolicy::from_config(settings));
    let guard = InstallationGuard::new(Arc::new(lookup));
    let installer = ProfileInstaller::new(operations(settings, runner), guard);

    let request = InstallRequest::new(args.installable.as_str(), settings.profile_dir())
        .offline(args.offline)
        .allow_insecure(args.allow_insecure || settings.allow_insecure())
        .timeout(args.timeout.map(Duration::from_secs));

    tracing::debug!(
        "Installing {} into {} (offline: {}, allow insecure: {})",
        request.installable,
        request.profile_path,
        request.offline,
        request.allow_insecure
    );
    let priority = installer
        .install(&request)
        .await
        .with_context(|| format!("Failed to install {}", args.installable))?;

    output::success(&format!(
        "Installed {} with priority {}",
        args.installable, priority
    ));
    Ok(())
}

async fn remove(settings: &ProjectSettings, args: ProfileRemoveArgs) -> Result<()> {
    operations(settings, Arc::new(SystemRunner::new()))
        .remove(&settings.profile_dir(), &args.indexes)
        .await
        .context("Failed to remove from profile")?;

    output::success(&format!("Removed {}", args.indexes.join(", ")));
    Ok(())
}

fn priority(settings: &ProjectSettings) -> Result<()> {
    let profile = settings.profile_dir();
    let next = next_priority_for_profile(&profile).context("Failed to read profile manifest")?;
    output::info(&format!("Next install priority: {}", next));
    Ok(())
}

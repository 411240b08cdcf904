//! CLI command implementations

pub mod generate;
pub mod profile;

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use flakeforge_core::ProjectSettings;

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config: Option<Utf8PathBuf>,
    pub debug: bool,
}

/// Project directory (current directory)
fn project_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8")
}

/// Load `flakeforge.yaml` for the current project
fn load_settings(global: &GlobalArgs) -> Result<ProjectSettings> {
    let project = project_dir()?;
    let settings = ProjectSettings::load(&project, global.config.as_deref())
        .context("Failed to load project configuration")?;
    Ok(settings.with_debug(global.debug))
}

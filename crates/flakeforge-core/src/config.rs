//! Project configuration
//!
//! The generators and profile operations never see the full configuration
//! file. They consume the narrow [`ProjectConfig`] capability, which
//! [`ProjectSettings`] (loaded from `flakeforge.yaml`) implements.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["flakeforge.yaml", "flakeforge.yml"];

/// Environment variable enabling debug mode
pub const DEBUG_ENV_VAR: &str = "FLAKEFORGE_DEBUG";

/// Directory under the project root holding all generated state
pub const STATE_DIR_NAME: &str = ".flakeforge";

/// Opt-in behaviors toggled per project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Generate the flake variant that does not pull packages from the
    /// pinned nixpkgs input
    RemoveNixpkgs,
}

/// The accessors the generation pipeline and profile operations need.
pub trait ProjectConfig: Send + Sync {
    /// Root directory of the user's project
    fn project_dir(&self) -> &Utf8Path;

    /// nixpkgs commit the generated files are pinned to
    fn nixpkgs_commit_hash(&self) -> &str;

    /// Whether unfree packages may be evaluated
    fn allow_unfree(&self) -> bool {
        true
    }

    /// Whether packages flagged insecure may be installed
    fn allow_insecure(&self) -> bool {
        false
    }

    fn debug_enabled(&self) -> bool {
        false
    }

    fn feature_enabled(&self, _feature: Feature) -> bool {
        false
    }

    /// `<project>/.flakeforge`
    fn state_dir(&self) -> Utf8PathBuf {
        self.project_dir().join(STATE_DIR_NAME)
    }

    /// Directory receiving generated environment files
    fn gen_dir(&self) -> Utf8PathBuf {
        self.state_dir().join("gen")
    }

    /// Directory holding the generated flake
    fn flake_dir(&self) -> Utf8PathBuf {
        self.gen_dir().join("flake")
    }

    /// Nix profile packages are installed into
    fn profile_dir(&self) -> Utf8PathBuf {
        self.state_dir().join("nix").join("profile").join("default")
    }
}

/// Pinned nixpkgs revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NixpkgsConfig {
    pub commit: String,
}

/// Per-project feature toggles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub remove_nixpkgs: bool,
}

/// On-disk shape of `flakeforge.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub nixpkgs: NixpkgsConfig,

    #[serde(default = "default_true")]
    pub allow_unfree: bool,

    #[serde(default)]
    pub allow_insecure: bool,

    #[serde(default)]
    pub features: FeaturesConfig,
}

fn default_true() -> bool {
    true
}

/// Loaded and validated project configuration
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// The parsed configuration
    pub config: ConfigFile,

    /// Path to the configuration file, if loaded from disk
    pub config_path: Option<Utf8PathBuf>,

    /// Project root
    pub project_dir: Utf8PathBuf,

    debug: bool,
}

impl ProjectSettings {
    /// Load configuration from `path`, or search `project_dir` for it
    pub fn load(project_dir: &Utf8Path, path: Option<&Utf8Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_owned(),
            None => Self::find_config(project_dir)?,
        };

        let content = fs::read_to_string(&config_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(config_path.as_str())
            } else {
                Error::Io(e)
            }
        })?;

        debug!("Loaded configuration from {}", config_path);
        let mut settings = Self::from_yaml(&content, project_dir)?;
        settings.config_path = Some(config_path);
        Ok(settings)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str, project_dir: &Utf8Path) -> Result<Self> {
        let config: ConfigFile = serde_yaml_ng::from_str(content)?;
        Self::validate(&config)?;

        Ok(Self {
            config,
            config_path: None,
            project_dir: project_dir.to_owned(),
            debug: debug_from_env(),
        })
    }

    /// Force debug mode on, e.g. from a `--debug` flag
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = self.debug || debug;
        self
    }

    fn find_config(project_dir: &Utf8Path) -> Result<Utf8PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::config_not_found(project_dir.join(CONFIG_FILE_NAMES[0])))
    }

    fn validate(config: &ConfigFile) -> Result<()> {
        let commit = config.nixpkgs.commit.trim();
        if commit.is_empty() {
            return Err(Error::invalid_config("nixpkgs.commit must not be empty"));
        }
        if !commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::invalid_config(format!(
                "nixpkgs.commit must be a hexadecimal git revision, got {:?}",
                commit
            )));
        }
        Ok(())
    }
}

/// Whether `FLAKEFORGE_DEBUG` asks for debug mode
pub fn debug_from_env() -> bool {
    std::env::var(DEBUG_ENV_VAR)
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl ProjectConfig for ProjectSettings {
    fn project_dir(&self) -> &Utf8Path {
        &self.project_dir
    }

    fn nixpkgs_commit_hash(&self) -> &str {
        self.config.nixpkgs.commit.trim()
    }

    fn allow_unfree(&self) -> bool {
        self.config.allow_unfree
    }

    fn allow_insecure(&self) -> bool {
        self.config.allow_insecure
    }

    fn debug_enabled(&self) -> bool {
        self.debug
    }

    fn feature_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::RemoveNixpkgs => self.config.features.remove_nixpkgs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
nixpkgs:
  commit: "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62"
"#;

    #[test]
    #[serial]
    fn test_defaults() {
        std::env::remove_var(DEBUG_ENV_VAR);
        let settings = ProjectSettings::from_yaml(MINIMAL, Utf8Path::new("/work/app")).unwrap();

        assert_eq!(
            settings.nixpkgs_commit_hash(),
            "f80ac848e3d6f0c12c52758c0f25c10c97ca3b62"
        );
        assert!(settings.allow_unfree());
        assert!(!settings.allow_insecure());
        assert!(!settings.debug_enabled());
        assert!(!settings.feature_enabled(Feature::RemoveNixpkgs));
    }

    #[test]
    fn test_paths() {
        let settings = ProjectSettings::from_yaml(MINIMAL, Utf8Path::new("/work/app")).unwrap();

        assert_eq!(settings.state_dir(), Utf8Path::new("/work/app/.flakeforge"));
        assert_eq!(settings.gen_dir(), Utf8Path::new("/work/app/.flakeforge/gen"));
        assert_eq!(
            settings.flake_dir(),
            Utf8Path::new("/work/app/.flakeforge/gen/flake")
        );
        assert_eq!(
            settings.profile_dir(),
            Utf8Path::new("/work/app/.flakeforge/nix/profile/default")
        );
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
nixpkgs:
  commit: "abc123"
allow_unfree: false
allow_insecure: true
features:
  remove_nixpkgs: true
"#;
        let settings = ProjectSettings::from_yaml(yaml, Utf8Path::new("/p")).unwrap();
        assert!(!settings.allow_unfree());
        assert!(settings.allow_insecure());
        assert!(settings.feature_enabled(Feature::RemoveNixpkgs));
    }

    #[test]
    fn test_empty_commit_rejected() {
        let yaml = "nixpkgs:\n  commit: \"  \"\n";
        let err = ProjectSettings::from_yaml(yaml, Utf8Path::new("/p")).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn test_non_hex_commit_rejected() {
        let yaml = "nixpkgs:\n  commit: \"nixos-unstable\"\n";
        let err = ProjectSettings::from_yaml(yaml, Utf8Path::new("/p")).unwrap_err();
        assert!(err.to_string().contains("hexadecimal"));
    }

    #[test]
    fn test_missing_nixpkgs_is_yaml_error() {
        let err = ProjectSettings::from_yaml("allow_unfree: true\n", Utf8Path::new("/p"))
            .unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_load_searches_project_dir() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("flakeforge.yml"), MINIMAL).unwrap();

        let settings = ProjectSettings::load(&dir, None).unwrap();
        assert_eq!(settings.config_path, Some(dir.join("flakeforge.yml")));
        assert_eq!(settings.project_dir(), dir.as_path());
    }

    #[test]
    fn test_load_missing_config() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();

        let err = ProjectSettings::load(&dir, None).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));

        let err = ProjectSettings::load(&dir, Some(&dir.join("other.yaml"))).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_debug_from_env() {
        std::env::set_var(DEBUG_ENV_VAR, "1");
        let settings = ProjectSettings::from_yaml(MINIMAL, Utf8Path::new("/p")).unwrap();
        std::env::remove_var(DEBUG_ENV_VAR);
        assert!(settings.debug_enabled());
    }

    #[test]
    #[serial]
    fn test_with_debug_flag() {
        std::env::remove_var(DEBUG_ENV_VAR);
        let settings = ProjectSettings::from_yaml(MINIMAL, Utf8Path::new("/p"))
            .unwrap()
            .with_debug(true);
        assert!(settings.debug_enabled());
    }
}

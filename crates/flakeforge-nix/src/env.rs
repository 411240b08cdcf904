//! Environment policy for nix subprocesses

use flakeforge_core::{CommandSpec, ProjectConfig};

/// Lets nixpkgs evaluate unfree packages (needs `--impure`)
pub const NIXPKGS_ALLOW_UNFREE: &str = "NIXPKGS_ALLOW_UNFREE";

/// Lets nixpkgs evaluate packages flagged insecure (needs `--impure`)
pub const NIXPKGS_ALLOW_INSECURE: &str = "NIXPKGS_ALLOW_INSECURE";

/// Which nixpkgs allowances are passed to nix through the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvPolicy {
    pub allow_unfree: bool,
    pub allow_insecure: bool,
}

impl Default for EnvPolicy {
    fn default() -> Self {
        Self {
            allow_unfree: true,
            allow_insecure: false,
        }
    }
}

impl EnvPolicy {
    pub fn from_config(config: &dyn ProjectConfig) -> Self {
        Self {
            allow_unfree: config.allow_unfree(),
            allow_insecure: config.allow_insecure(),
        }
    }

    /// Same policy with insecure packages allowed
    pub fn with_insecure(self, allow: bool) -> Self {
        Self {
            allow_insecure: self.allow_insecure || allow,
            ..self
        }
    }

    /// Variables to set, in a stable order
    pub fn vars(&self) -> Vec<(&'static str, &'static str)> {
        let mut vars = Vec::new();
        if self.allow_unfree {
            vars.push((NIXPKGS_ALLOW_UNFREE, "1"));
        }
        if self.allow_insecure {
            vars.push((NIXPKGS_ALLOW_INSECURE, "1"));
        }
        vars
    }

    pub fn apply(&self, spec: CommandSpec) -> CommandSpec {
        self.vars()
            .into_iter()
            .fold(spec, |spec, (key, value)| spec.env(key, value))
    }
}

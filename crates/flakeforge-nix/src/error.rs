//! Error types for flakeforge-nix

use camino::Utf8PathBuf;
use flakeforge_core::redact::{Redact, REDACTED};
use thiserror::Error;

/// Result type alias using flakeforge-nix's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Profile bookkeeping error types
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest exists but could not be read
    #[error("read profile manifest {path}: {source}")]
    ManifestRead {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest matches neither the map nor the array shape
    #[error("decode profile manifest {path}: {message}")]
    ManifestDecode { path: Utf8PathBuf, message: String },

    /// Installable is flagged insecure and no override was given
    #[error(
        "Package {installable} is insecure.\n\n{}To override use `flakeforge profile add <pkg> --allow-insecure`",
        format_vulnerabilities(.known_vulnerabilities)
    )]
    InsecurePackage {
        installable: String,
        known_vulnerabilities: Vec<String>,
    },

    /// `nix eval` output for package metadata was not the expected JSON
    #[error("evaluate {attribute} of {installable}: {message}")]
    EvalDecode {
        installable: String,
        attribute: String,
        message: String,
    },

    /// Highest installed priority leaves no room for another element
    #[error("no priority left above {max} in the profile manifest")]
    PriorityOverflow { max: i64 },

    /// `profile remove` without any element index
    #[error("no profile element indexes given to remove")]
    NoIndexes,

    /// A `nix profile` subcommand failed
    #[error("error running \"nix profile {operation}\": {source}")]
    Profile {
        operation: &'static str,
        #[source]
        source: flakeforge_core::Error,
    },

    /// Core library error
    #[error(transparent)]
    Core(#[from] flakeforge_core::Error),
}

fn format_vulnerabilities(known: &[String]) -> String {
    if known.is_empty() {
        String::new()
    } else {
        format!("Known vulnerabilities: {}\n\n", known.join(", "))
    }
}

impl Error {
    /// Create an insecure package error
    pub fn insecure_package(installable: impl Into<String>, known: Vec<String>) -> Self {
        Self::InsecurePackage {
            installable: installable.into(),
            known_vulnerabilities: known,
        }
    }

    /// Create a manifest decode error
    pub fn manifest_decode(path: impl Into<Utf8PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestDecode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a command error with the profile subcommand it came from
    pub fn profile(operation: &'static str, source: flakeforge_core::Error) -> Self {
        Self::Profile { operation, source }
    }

    /// Errors the user can fix themselves; always shown verbatim.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InsecurePackage { .. } | Self::NoIndexes)
    }
}

impl Redact for Error {
    fn redacted(&self) -> String {
        match self {
            Self::InsecurePackage { .. } | Self::NoIndexes => self.to_string(),
            Self::ManifestRead { source, .. } => {
                format!("read profile manifest: {:?}", source.kind())
            }
            Self::ManifestDecode { .. } => format!("decode profile manifest: {}", REDACTED),
            Self::PriorityOverflow { .. } => self.to_string(),
            Self::EvalDecode { attribute, .. } => {
                format!("evaluate {}: {}", attribute, REDACTED)
            }
            Self::Profile { operation, source } => {
                format!(
                    "error running \"nix profile {}\": {}",
                    operation,
                    source.redacted()
                )
            }
            Self::Core(e) => e.redacted(),
        }
    }
}

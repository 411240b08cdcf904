//! Error types for flakeforge-core

use crate::redact::{Redact, REDACTED};
use std::time::Duration;
use thiserror::Error;

/// Result type alias using flakeforge-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for flakeforge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration content
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Program is not installed or not in PATH
    #[error("Command not found: {program}. Please ensure it is installed and in PATH")]
    CommandNotFound { program: String },

    /// Program exists but could not be started
    #[error("Failed to start `{command}`: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Program ran and exited unsuccessfully
    #[error("`{command}` failed with {status}{}", format_output(.output))]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    /// Program did not finish before its deadline and was killed
    #[error("`{command}` timed out after {}s", whole_secs(.timeout))]
    CommandTimeout { command: String, timeout: Duration },
}

fn whole_secs(timeout: &Duration) -> u64 {
    timeout.as_secs()
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// First word of a rendered command line; arguments may carry paths.
fn program_of(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or(command)
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a command not found error
    pub fn command_not_found(program: impl Into<String>) -> Self {
        Self::CommandNotFound {
            program: program.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(
        command: impl Into<String>,
        status: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }
}

impl Redact for Error {
    fn redacted(&self) -> String {
        match self {
            Self::ConfigNotFound { .. } => format!("Configuration file not found: {}", REDACTED),
            Self::InvalidConfig { .. } => format!("Invalid configuration format: {}", REDACTED),
            Self::YamlParse(_) => "YAML parsing error".to_string(),
            Self::Io(e) => format!("IO error: {:?}", e.kind()),
            Self::CommandNotFound { .. } => self.to_string(),
            Self::CommandSpawn { command, source } => format!(
                "Failed to start `{}`: {:?}",
                program_of(command),
                source.kind()
            ),
            Self::CommandFailed {
                command, status, ..
            } => format!("`{}` failed with {}", program_of(command), status),
            Self::CommandTimeout { command, timeout } => format!(
                "`{}` timed out after {}s",
                program_of(command),
                timeout.as_secs()
            ),
        }
    }
}

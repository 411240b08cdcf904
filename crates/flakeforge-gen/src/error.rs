//! Error types for flakeforge-gen

use camino::Utf8PathBuf;
use flakeforge_core::redact::{Redact, REDACTED};
use thiserror::Error;

/// Result type alias using flakeforge-gen's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Generation pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    /// Template name is not part of the embedded set
    #[error("Template not found: {template}")]
    TemplateNotFound { template: String },

    /// Embedded template failed to compile
    #[error("parse embedded template {template}: {}", error_chain(.source))]
    TemplateParse {
        template: String,
        #[source]
        source: tera::Error,
    },

    /// Template failed while executing against the plan
    #[error("execute template {template}: {}", error_chain(.source))]
    TemplateRender {
        template: String,
        #[source]
        source: tera::Error,
    },

    /// Rendered output could not be committed to disk
    #[error("write {template} to {path}: {source}")]
    WriteOutput {
        template: String,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Embedded asset could not be committed to disk
    #[error("write {asset} to {path}: {source}")]
    WriteAsset {
        asset: String,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Plan cannot be turned into a glibc patch flake
    #[error("generate glibc patch flake: {message}")]
    GlibcPatch { message: String },

    /// Walking ancestors for a `.git` marker hit a filesystem error
    #[error("locate git repository above {path}: {source}")]
    GitLookup {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Core library error
    #[error(transparent)]
    Core(#[from] flakeforge_core::Error),
}

/// Render an error and all of its sources, `outer: inner: innermost`.
pub(crate) fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl Error {
    /// Create a template not found error
    pub fn template_not_found(template: impl Into<String>) -> Self {
        Self::TemplateNotFound {
            template: template.into(),
        }
    }

    /// Create a glibc patch error
    pub fn glibc_patch(message: impl Into<String>) -> Self {
        Self::GlibcPatch {
            message: message.into(),
        }
    }
}

impl Redact for Error {
    fn redacted(&self) -> String {
        match self {
            Self::TemplateNotFound { .. } => self.to_string(),
            Self::TemplateParse { template, .. } => {
                format!("parse embedded template {}: {}", template, REDACTED)
            }
            Self::TemplateRender { template, .. } => {
                format!("execute template {}: {}", template, REDACTED)
            }
            Self::WriteOutput {
                template, source, ..
            } => format!("write {} to file: {:?}", template, source.kind()),
            Self::WriteAsset { asset, source, .. } => {
                format!("write {} to file: {:?}", asset, source.kind())
            }
            Self::GlibcPatch { .. } => format!("generate glibc patch flake: {}", REDACTED),
            Self::GitLookup { source, .. } => {
                format!("locate git repository: {:?}", source.kind())
            }
            Self::Core(e) => e.redacted(),
        }
    }
}

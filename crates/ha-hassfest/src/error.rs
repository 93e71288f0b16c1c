//! Error types for hassfest runs

use std::path::PathBuf;
use thiserror::Error;

/// Result type for hassfest operations
pub type HassfestResult<T> = Result<T, HassfestError>;

/// Errors that abort a hassfest run
///
/// Rule violations and stale artifacts are not errors in this sense; they are
/// collected as [`Diagnostic`](crate::Diagnostic)s on the run context.
#[derive(Debug, Error)]
pub enum HassfestError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to list a directory
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a generated file
    #[error("failed to write file {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse JSON
    #[error("failed to parse JSON in {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to serialize a generated index
    #[error("failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The same domain was loaded from two directories
    #[error("integration '{domain}' loaded twice ({first} and {second})")]
    DuplicateIntegration {
        domain: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Integration path has no directory name to use as the domain
    #[error("cannot derive an integration domain from {path}")]
    InvalidIntegrationPath { path: PathBuf },

    /// Generate phase ran before the content was computed
    #[error("no generated content cached for '{key}', run validation first")]
    MissingCache { key: String },

    /// Generate requested for a run limited to specific integrations
    #[error("generating requires a run over all integrations")]
    GenerateRestricted,
}

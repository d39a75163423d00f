use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot access source root '{path}': {source}")]
    RootAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source root '{0}' is not a directory")]
    RootNotDirectory(PathBuf),

    #[error("invalid pattern '{pattern}' in category '{category}': {source}")]
    InvalidPattern {
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid exclude glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a package manifest could not be read.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("root element is <{0}>, expected <package>")]
    UnexpectedRoot(String),

    #[error("element <{0}> is never closed")]
    Unclosed(String),

    #[error("document has no root element")]
    Empty,

    #[error("manifest declares no package name")]
    MissingName,
}

/// Why a single file or directory was left out of a package scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to count lines: {0:#}")]
    Count(anyhow::Error),
}

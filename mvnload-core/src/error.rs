use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MvnloadError {
    #[error("Failed to fetch descriptor {url}: {reason}")]
    DescriptorUnavailable { url: String, reason: String },

    #[error("Malformed descriptor {url}: {source}")]
    DescriptorMalformed {
        url: String,
        source: quick_xml::DeError,
    },

    #[error("Failed to fetch version index {url}: {reason}")]
    IndexUnavailable { url: String, reason: String },

    #[error("Failed to resolve {coordinate}: {source}")]
    ResolutionFailed {
        coordinate: String,
        source: Box<MvnloadError>,
    },

    #[error("No version available for {group_id}:{artifact_id}")]
    NoVersionAvailable {
        group_id: String,
        artifact_id: String,
    },

    #[error("Invalid coordinate {value:?}: {reason}")]
    InvalidCoordinate { value: String, reason: String },

    #[error("Server did not report a content length for {url}")]
    ContentLengthUnknown { url: String },

    #[error("Failed to download {url}: {reason}")]
    Http { url: String, reason: String },

    #[error("Partition {start}-{end} of {url} failed: {reason}")]
    DownloadPartitionFailed {
        url: String,
        start: u64,
        end: u64,
        reason: String,
    },

    #[error("Download of {url} is incomplete ({failed} of {total} partitions failed)")]
    DownloadIncomplete {
        url: String,
        failed: usize,
        total: usize,
    },

    #[error("Checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Failed to read file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Background task failed: {reason}")]
    TaskJoin { reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Unsupported location {location}: only local paths and file:// URLs can be loaded")]
    UnsupportedLocation { location: String },

    #[error("Failed to load library {path:?}: {source}")]
    LibraryLoad {
        path: PathBuf,
        source: libloading::Error,
    },

    #[error("Library {path:?} was built for component ABI {found}, host expects {expected}")]
    IncompatibleComponentAbi {
        path: PathBuf,
        found: String,
        expected: String,
    },

    #[error("Component type {name} not found")]
    ComponentNotFound { name: String },

    #[error("No constructor of {name} accepts ({args})")]
    NoCompatibleConstructor { name: String, args: String },

    #[error("No method {component}.{method} accepts ({args})")]
    NoCompatibleMethod {
        component: String,
        method: String,
        args: String,
    },

    #[error("{target} failed: {reason}")]
    Invocation { target: String, reason: String },
}

impl MvnloadError {
    /// Wraps a failure raised while expanding `coordinate`.
    ///
    /// Cancellation and already wrapped failures pass through untouched.
    pub fn resolution(coordinate: impl Into<String>, source: MvnloadError) -> Self {
        match source {
            MvnloadError::Cancelled | MvnloadError::ResolutionFailed { .. } => source,
            other => MvnloadError::ResolutionFailed {
                coordinate: coordinate.into(),
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_wraps_fetch_failures_once() {
        let inner = MvnloadError::IndexUnavailable {
            url: "https://repo/x".to_string(),
            reason: "404".to_string(),
        };

        let wrapped = MvnloadError::resolution("g:a:1", inner);
        let rewrapped = MvnloadError::resolution("root:r:1", wrapped);

        match rewrapped {
            MvnloadError::ResolutionFailed { coordinate, source } => {
                assert_eq!(coordinate, "g:a:1");
                assert!(matches!(*source, MvnloadError::IndexUnavailable { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn resolution_keeps_cancellation_unwrapped() {
        let error = MvnloadError::resolution("g:a:1", MvnloadError::Cancelled);
        assert!(matches!(error, MvnloadError::Cancelled));
    }
}

use crate::coordinate::Coordinate;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_REPOSITORY: &str = "https://repo.maven.apache.org/maven2/";

/// Artifact families never pulled into a closure.
pub const EXCLUDED_ARTIFACTS: &[&str] = &["junit", "junit-jupiter-api"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Dependency {
    Remote {
        coordinate: Coordinate,
        repository: String,
    },
    Local {
        path: PathBuf,
    },
}

impl Dependency {
    /// A dependency hosted on the default repository.
    pub fn remote(coordinate: Coordinate) -> Self {
        Dependency::Remote {
            coordinate,
            repository: DEFAULT_REPOSITORY.to_string(),
        }
    }

    pub fn remote_in(coordinate: Coordinate, repository: &str) -> Self {
        Dependency::Remote {
            coordinate,
            repository: normalize_repository(repository),
        }
    }

    /// A dependency already on disk. Accepts a plain path or a `file://` URL.
    pub fn local(location: impl AsRef<str>) -> Self {
        let location = location.as_ref();
        let path = location
            .strip_prefix("file://")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(location));

        Dependency::Local {
            path: std::path::absolute(&path).unwrap_or(path),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Dependency::Local { .. })
    }

    pub fn coordinate(&self) -> Option<&Coordinate> {
        match self {
            Dependency::Remote { coordinate, .. } => Some(coordinate),
            Dependency::Local { .. } => None,
        }
    }

    pub fn repository(&self) -> Option<&str> {
        match self {
            Dependency::Remote { repository, .. } => Some(repository),
            Dependency::Local { .. } => None,
        }
    }

    /// `g:a:v` for remote dependencies, the absolute path for local ones.
    pub fn identity(&self) -> String {
        match self {
            Dependency::Remote { coordinate, .. } => coordinate.to_string(),
            Dependency::Local { path } => path.display().to_string(),
        }
    }

    /// Whether the artifact family is one the resolver never follows.
    pub fn is_excluded(&self) -> bool {
        self.coordinate()
            .is_some_and(|coordinate| is_excluded_artifact(&coordinate.artifact_id))
    }

    /// `base/group/as/path/artifact/version`
    pub fn repository_path(&self) -> Option<String> {
        match self {
            Dependency::Remote {
                coordinate,
                repository,
            } => Some(format!("{}{}", repository, coordinate.version_path())),
            Dependency::Local { .. } => None,
        }
    }

    pub fn descriptor_url(&self) -> Option<String> {
        self.file_url("pom")
    }

    pub fn artifact_url(&self, extension: &str) -> Option<String> {
        self.file_url(extension)
    }

    fn file_url(&self, extension: &str) -> Option<String> {
        let coordinate = self.coordinate()?;
        let base = self.repository_path()?;
        Some(format!("{}/{}", base, coordinate.file_name(extension)))
    }

    pub fn artifact_file_name(&self, extension: &str) -> String {
        match self {
            Dependency::Remote { coordinate, .. } => coordinate.file_name(extension),
            Dependency::Local { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Where the artifact lives on disk once fetched.
    pub fn local_artifact_path(&self, output_dir: &Path, extension: &str) -> PathBuf {
        match self {
            Dependency::Remote { .. } => output_dir.join(self.artifact_file_name(extension)),
            Dependency::Local { path } => path.clone(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity())
    }
}

pub fn is_excluded_artifact(artifact_id: &str) -> bool {
    EXCLUDED_ARTIFACTS.contains(&artifact_id)
}

/// Ensures a repository base URL ends with exactly one `/`.
pub fn normalize_repository(repository: &str) -> String {
    let trimmed = repository.trim().trim_end_matches('/');
    format!("{}/", trimmed)
}

use crate::{MvnloadError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Coordinate {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// Same group and artifact, any version.
    pub fn same_family(&self, other: &Coordinate) -> bool {
        self.group_id == other.group_id && self.artifact_id == other.artifact_id
    }

    /// `org/example/lib`
    pub fn family_path(&self) -> String {
        family_path(&self.group_id, &self.artifact_id)
    }

    /// `org/example/lib/1.0`
    pub fn version_path(&self) -> String {
        format!("{}/{}", self.family_path(), self.version)
    }

    /// `lib-1.0.<extension>`
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}-{}.{}", self.artifact_id, self.version, extension)
    }
}

pub fn family_path(group_id: &str, artifact_id: &str) -> String {
    format!("{}/{}", group_id.replace('.', "/"), artifact_id)
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for Coordinate {
    type Err = MvnloadError;

    fn from_str(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.trim().split(':').collect();

        if parts.len() != 3 {
            return Err(MvnloadError::InvalidCoordinate {
                value: value.to_string(),
                reason: "expected groupId:artifactId:version".to_string(),
            });
        }

        if let Some(index) = parts.iter().position(|part| part.trim().is_empty()) {
            let field = ["groupId", "artifactId", "version"][index];
            return Err(MvnloadError::InvalidCoordinate {
                value: value.to_string(),
                reason: format!("{} is empty", field),
            });
        }

        Ok(Coordinate::new(
            parts[0].trim(),
            parts[1].trim(),
            parts[2].trim(),
        ))
    }
}

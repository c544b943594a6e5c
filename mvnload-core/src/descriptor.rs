use serde::Deserialize;

/// The dependency section of a `.pom` document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub dependencies: Vec<DeclaredDependency>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeclaredDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
}

impl DeclaredDependency {
    pub fn is_test_scoped(&self) -> bool {
        self.scope.as_deref() == Some("test")
    }

    /// A declared version that names one concrete release: not empty, not a
    /// `${property}` placeholder, not a `[..]`/`(..)` range.
    pub fn concrete_version(&self) -> Option<&str> {
        let version = self.version.as_deref()?.trim();

        if version.is_empty()
            || version.starts_with("${")
            || version.starts_with('[')
            || version.starts_with('(')
        {
            return None;
        }

        Some(version)
    }
}

#[derive(Debug, Deserialize)]
struct RawProject {
    #[serde(default)]
    dependencies: Option<RawDependencies>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDependencies {
    #[serde(default)]
    dependency: Vec<RawDependency>,
}

#[derive(Debug, Deserialize)]
struct RawDependency {
    #[serde(rename = "groupId")]
    group_id: String,
    #[serde(rename = "artifactId")]
    artifact_id: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    optional: Option<String>,
}

impl Descriptor {
    /// Reads the project-level `<dependencies>` block. Dependency management
    /// and plugin dependencies live under other elements and are not read.
    pub fn parse(text: &str) -> std::result::Result<Self, quick_xml::DeError> {
        let project: RawProject = quick_xml::de::from_str(text)?;

        let dependencies = project
            .dependencies
            .unwrap_or_default()
            .dependency
            .into_iter()
            .map(|raw| DeclaredDependency {
                group_id: raw.group_id.trim().to_string(),
                artifact_id: raw.artifact_id.trim().to_string(),
                version: non_empty(raw.version),
                scope: non_empty(raw.scope),
                optional: raw
                    .optional
                    .is_some_and(|value| value.trim().eq_ignore_ascii_case("true")),
            })
            .collect();

        Ok(Descriptor { dependencies })
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

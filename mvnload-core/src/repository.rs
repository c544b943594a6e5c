use crate::config::MvnloadConfig;
use crate::coordinate::{Coordinate, family_path};
use crate::dependency::normalize_repository;
use crate::descriptor::Descriptor;
use crate::download::ArtifactSource;
use crate::metadata::VersionIndex;
use crate::{MvnloadError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Read access to a Maven-layout repository.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn fetch_descriptor(&self, repository: &str, coordinate: &Coordinate)
    -> Result<Descriptor>;

    async fn fetch_version_index(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<VersionIndex>;
}

/// Version queries answered from [`Repository::fetch_version_index`].
///
/// Implemented for every repository, so the answers always agree with the
/// index the repository serves.
#[async_trait]
pub trait RepositoryExt {
    /// The `<latest>` value, else the first `<version>`.
    async fn fetch_latest_version(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<Option<String>>;

    /// Whether `version` occurs anywhere in the version index.
    async fn version_exists(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<bool>;
}

#[async_trait]
impl<R: Repository + ?Sized> RepositoryExt for R {
    async fn fetch_latest_version(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<Option<String>> {
        let index = self
            .fetch_version_index(repository, group_id, artifact_id)
            .await?;
        Ok(index.latest().map(str::to_string))
    }

    async fn version_exists(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
        version: &str,
    ) -> Result<bool> {
        let index = self
            .fetch_version_index(repository, group_id, artifact_id)
            .await?;
        Ok(index.contains(version))
    }
}

type IndexKey = (String, String, String);

/// Serves each `(repository, group, artifact)` version index from memory
/// after the first fetch.
pub struct CachedRepository<'a> {
    inner: &'a dyn Repository,
    indexes: Mutex<HashMap<IndexKey, VersionIndex>>,
}

impl<'a> CachedRepository<'a> {
    pub fn new(inner: &'a dyn Repository) -> Self {
        CachedRepository {
            inner,
            indexes: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<'a> Repository for CachedRepository<'a> {
    async fn fetch_descriptor(
        &self,
        repository: &str,
        coordinate: &Coordinate,
    ) -> Result<Descriptor> {
        self.inner.fetch_descriptor(repository, coordinate).await
    }

    async fn fetch_version_index(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<VersionIndex> {
        let key = (
            repository.to_string(),
            group_id.to_string(),
            artifact_id.to_string(),
        );

        if let Some(index) = self.indexes.lock().await.get(&key) {
            return Ok(index.clone());
        }

        let index = self
            .inner
            .fetch_version_index(repository, group_id, artifact_id)
            .await?;
        self.indexes.lock().await.insert(key, index.clone());
        Ok(index)
    }
}

pub fn descriptor_url(repository: &str, coordinate: &Coordinate) -> String {
    format!(
        "{}{}/{}",
        normalize_repository(repository),
        coordinate.version_path(),
        coordinate.file_name("pom")
    )
}

pub fn metadata_url(repository: &str, group_id: &str, artifact_id: &str) -> String {
    format!(
        "{}{}/maven-metadata.xml",
        normalize_repository(repository),
        family_path(group_id, artifact_id)
    )
}

/// [`Repository`] and [`ArtifactSource`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpRepository {
    client: Client,
}

impl HttpRepository {
    pub fn new(client: Client) -> Self {
        HttpRepository { client }
    }

    pub fn from_config(config: &MvnloadConfig) -> Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("mvnload/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|error| MvnloadError::Http {
            url: config.repository.clone(),
            reason: error.to_string(),
        })?;

        Ok(HttpRepository::new(client))
    }

    async fn get_text(&self, url: &str) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Repository for HttpRepository {
    async fn fetch_descriptor(
        &self,
        repository: &str,
        coordinate: &Coordinate,
    ) -> Result<Descriptor> {
        let url = descriptor_url(repository, coordinate);
        debug!(%url, "fetching descriptor");

        let text = self
            .get_text(&url)
            .await
            .map_err(|error| MvnloadError::DescriptorUnavailable {
                url: url.clone(),
                reason: error.to_string(),
            })?;

        Descriptor::parse(&text).map_err(|source| MvnloadError::DescriptorMalformed { url, source })
    }

    async fn fetch_version_index(
        &self,
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<VersionIndex> {
        let url = metadata_url(repository, group_id, artifact_id);
        debug!(%url, "fetching version index");

        let text = self
            .get_text(&url)
            .await
            .map_err(|error| MvnloadError::IndexUnavailable {
                url: url.clone(),
                reason: error.to_string(),
            })?;

        Ok(VersionIndex::new(text))
    }
}

#[async_trait]
impl ArtifactSource for HttpRepository {
    async fn content_length(&self, url: &str) -> Result<u64> {
        let response = self
            .client
            .head(url)
            .header(ACCEPT_ENCODING, "identity")
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| MvnloadError::Http {
                url: url.to_string(),
                reason: error.to_string(),
            })?;

        // `Response::content_length` reports the body actually sent, which is empty for HEAD.
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .ok_or_else(|| MvnloadError::ContentLengthUnknown {
                url: url.to_string(),
            })
    }

    async fn fetch_range(&self, url: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let http_error = |error: reqwest::Error| MvnloadError::Http {
            url: url.to_string(),
            reason: error.to_string(),
        };

        let response = self
            .client
            .get(url)
            .header(RANGE, format!("bytes={}-{}", start, end))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(http_error)?;

        if status == StatusCode::PARTIAL_CONTENT {
            Ok(body.to_vec())
        } else {
            debug!(%url, %status, "server ignored range request");
            Ok(slice_full_body(&body, start, end))
        }
    }

    async fn fetch_checksum(&self, url: &str) -> Result<Option<String>> {
        let checksum_url = format!("{}.sha1", url);

        let response = self
            .client
            .get(&checksum_url)
            .send()
            .await
            .map_err(|error| MvnloadError::Http {
                url: checksum_url.clone(),
                reason: error.to_string(),
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = response
            .error_for_status()
            .map_err(|error| MvnloadError::Http {
                url: checksum_url.clone(),
                reason: error.to_string(),
            })?
            .text()
            .await
            .map_err(|error| MvnloadError::Http {
                url: checksum_url.clone(),
                reason: error.to_string(),
            })?;

        Ok(parse_checksum(&text))
    }
}

/// Cuts `start..=end` out of a body that carries the whole artifact.
fn slice_full_body(body: &[u8], start: u64, end: u64) -> Vec<u8> {
    let len = body.len() as u64;
    let from = start.min(len) as usize;
    let to = end.saturating_add(1).min(len) as usize;
    body[from..to].to_vec()
}

/// First token of a `.sha1` file, lowercased. Some repositories append the file name.
fn parse_checksum(text: &str) -> Option<String> {
    text.split_whitespace()
        .next()
        .map(|token| token.to_ascii_lowercase())
        .filter(|token| token.len() == 40 && token.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builds_descriptor_and_metadata_urls() {
        let coordinate = Coordinate::new("org.example", "lib", "1.0");
        assert_eq!(
            descriptor_url("https://repo.example.com/m2", &coordinate),
            "https://repo.example.com/m2/org/example/lib/1.0/lib-1.0.pom"
        );
        assert_eq!(
            metadata_url("https://repo.example.com/m2/", "org.example", "lib"),
            "https://repo.example.com/m2/org/example/lib/maven-metadata.xml"
        );
    }

    struct StaticIndex {
        document: &'static str,
        fetches: AtomicUsize,
    }

    impl StaticIndex {
        fn new(document: &'static str) -> Self {
            StaticIndex {
                document,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Repository for StaticIndex {
        async fn fetch_descriptor(&self, _repository: &str, _coordinate: &Coordinate) -> Result<Descriptor> {
            Ok(Descriptor {
                dependencies: Vec::new(),
            })
        }

        async fn fetch_version_index(
            &self,
            _repository: &str,
            _group_id: &str,
            _artifact_id: &str,
        ) -> Result<VersionIndex> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(VersionIndex::new(self.document))
        }
    }

    const REPO: &str = "https://repo.example.com/m2/";

    #[tokio::test]
    async fn latest_version_prefers_latest_element() {
        let repository = StaticIndex::new(
            "<metadata><versioning><latest>2.1</latest><versions><version>1.0</version><version>2.1</version></versions></versioning></metadata>",
        );

        let latest = repository
            .fetch_latest_version(REPO, "org.example", "util")
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("2.1"));
    }

    #[tokio::test]
    async fn latest_version_falls_back_to_first_version() {
        let repository = StaticIndex::new(
            "<metadata><versioning><versions><version>0.3</version><version>0.4</version></versions></versioning></metadata>",
        );

        let latest = repository
            .fetch_latest_version(REPO, "org.example", "util")
            .await
            .unwrap();
        assert_eq!(latest.as_deref(), Some("0.3"));
    }

    #[tokio::test]
    async fn empty_index_has_no_latest_version() {
        let repository = StaticIndex::new("");

        let latest = repository
            .fetch_latest_version(REPO, "org.example", "util")
            .await
            .unwrap();
        assert_eq!(latest, None);
    }

    #[tokio::test]
    async fn version_exists_matches_anywhere_in_the_document() {
        let repository = StaticIndex::new(
            "<metadata><versioning><versions><version>11.0</version></versions></versioning></metadata>",
        );

        assert!(repository.version_exists(REPO, "g", "a", "11.0").await.unwrap());
        assert!(repository.version_exists(REPO, "g", "a", "1.0").await.unwrap());
        assert!(!repository.version_exists(REPO, "g", "a", "3.0").await.unwrap());
    }

    #[tokio::test]
    async fn cached_repository_fetches_each_index_once() {
        let inner = StaticIndex::new("<metadata><versioning><latest>1.0</latest></versioning></metadata>");
        let cached = CachedRepository::new(&inner);

        cached.fetch_latest_version(REPO, "g", "a").await.unwrap();
        cached.version_exists(REPO, "g", "a", "1.0").await.unwrap();
        cached.fetch_latest_version(REPO, "g", "a").await.unwrap();
        assert_eq!(inner.fetches.load(Ordering::SeqCst), 1);

        cached.fetch_latest_version(REPO, "g", "b").await.unwrap();
        assert_eq!(inner.fetches.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn slices_requested_range_out_of_full_body() {
        let body: Vec<u8> = (0..10).collect();
        assert_eq!(slice_full_body(&body, 2, 4), vec![2, 3, 4]);
        assert_eq!(slice_full_body(&body, 8, 20), vec![8, 9]);
        assert!(slice_full_body(&body, 12, 20).is_empty());
    }

    #[test]
    fn parses_checksum_files() {
        let digest = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
        assert_eq!(parse_checksum(digest), Some(digest.to_string()));
        assert_eq!(
            parse_checksum(&format!("{}  lib-1.0.jar\n", digest.to_uppercase())),
            Some(digest.to_string())
        );
        assert_eq!(parse_checksum("<html>not found</html>"), None);
    }
}

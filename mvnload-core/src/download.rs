use crate::cancel::cancellable;
use crate::config::{DEFAULT_EXTENSION, DEFAULT_WORKERS, MvnloadConfig};
use crate::dependency::Dependency;
use crate::{MvnloadError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use sha1::{Digest, Sha1};
use std::collections::BTreeSet;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where artifact bytes come from.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    /// Total size reported by a metadata-only request.
    async fn content_length(&self, url: &str) -> Result<u64>;

    /// Bytes `start..=end` of the artifact.
    async fn fetch_range(&self, url: &str, start: u64, end: u64) -> Result<Vec<u8>>;

    /// Published SHA-1 of the artifact, lowercase hex.
    async fn fetch_checksum(&self, _url: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Inclusive byte range handled by one worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    pub start: u64,
    pub end: u64,
}

impl Partition {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Splits `length` bytes into `workers` contiguous ranges of `length / workers`
/// bytes; the last range absorbs the remainder.
pub fn partition(length: u64, workers: usize) -> Vec<Partition> {
    if length == 0 {
        return Vec::new();
    }

    let workers = (workers.max(1) as u64).min(length);
    let chunk = length / workers;

    (0..workers)
        .map(|index| {
            let start = index * chunk;
            let end = if index == workers - 1 {
                length - 1
            } else {
                start + chunk - 1
            };
            Partition { start, end }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOptions {
    pub workers: usize,
    pub extension: String,
    /// Fail the run on an incomplete artifact instead of reporting it.
    pub strict: bool,
    pub verify_checksums: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        DownloadOptions {
            workers: DEFAULT_WORKERS,
            extension: DEFAULT_EXTENSION.to_string(),
            strict: false,
            verify_checksums: false,
        }
    }
}

impl DownloadOptions {
    pub fn from_config(config: &MvnloadConfig) -> Self {
        DownloadOptions {
            workers: config.workers,
            extension: config.extension.clone(),
            strict: config.strict_downloads,
            verify_checksums: config.verify_checksums,
        }
    }
}

#[derive(Debug)]
pub struct DownloadedArtifact {
    pub path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct IncompleteArtifact {
    pub path: PathBuf,
    pub url: String,
    pub partitions: usize,
    pub failures: Vec<MvnloadError>,
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub downloaded: Vec<DownloadedArtifact>,
    pub skipped: Vec<PathBuf>,
    pub local: Vec<PathBuf>,
    pub incomplete: Vec<IncompleteArtifact>,
}

impl DownloadReport {
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }

    /// Every artifact usable on disk, local ones first.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        self.local
            .iter()
            .cloned()
            .chain(self.downloaded.iter().map(|artifact| artifact.path.clone()))
            .chain(self.skipped.iter().cloned())
            .collect()
    }
}

#[derive(Debug)]
pub struct DownloadOutcome {
    pub bytes: u64,
    pub partitions: usize,
    pub failures: Vec<MvnloadError>,
}

pub struct Downloader {
    source: Arc<dyn ArtifactSource>,
    options: DownloadOptions,
    cancel: CancellationToken,
}

impl Downloader {
    pub fn new(source: Arc<dyn ArtifactSource>, options: DownloadOptions) -> Self {
        Downloader {
            source,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    /// Materializes every dependency under `output_dir`, one artifact at a time.
    pub async fn download_all(
        &self,
        dependencies: &[Dependency],
        output_dir: &Path,
    ) -> Result<DownloadReport> {
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| MvnloadError::WriteFile {
                path: output_dir.to_path_buf(),
                source,
            })?;

        let extension = self.options.extension.as_str();
        let mut report = DownloadReport::default();
        let mut seen = BTreeSet::new();

        for dependency in dependencies {
            if !seen.insert(dependency.identity()) {
                continue;
            }

            let dest = dependency.local_artifact_path(output_dir, extension);

            let Some(url) = dependency.artifact_url(extension) else {
                debug!(path = %dest.display(), "local artifact");
                report.local.push(dest);
                continue;
            };

            if dest.is_file() {
                debug!(path = %dest.display(), "already downloaded");
                report.skipped.push(dest);
                continue;
            }

            let started = Instant::now();
            let outcome = self.download_one(&url, &dest).await?;

            if !outcome.failures.is_empty() {
                let failed = outcome.failures.len();
                warn!(%url, failed, partitions = outcome.partitions, "artifact incomplete");

                if self.options.strict {
                    remove_quietly(&dest).await;
                    return Err(MvnloadError::DownloadIncomplete {
                        url,
                        failed,
                        total: outcome.partitions,
                    });
                }

                report.incomplete.push(IncompleteArtifact {
                    path: dest,
                    url,
                    partitions: outcome.partitions,
                    failures: outcome.failures,
                });
                continue;
            }

            if self.options.verify_checksums {
                self.verify(&url, &dest).await?;
            }

            info!(
                %url,
                bytes = outcome.bytes,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "downloaded"
            );
            report.downloaded.push(DownloadedArtifact {
                path: dest,
                bytes: outcome.bytes,
            });
        }

        Ok(report)
    }

    /// Fetches `url` into `dest` with one task per partition.
    ///
    /// A failed partition leaves its range unwritten and is returned in
    /// [`DownloadOutcome::failures`]; it does not fail the call.
    pub async fn download_one(&self, url: &str, dest: &Path) -> Result<DownloadOutcome> {
        let length = cancellable(&self.cancel, self.source.content_length(url)).await?;
        let partitions = partition(length, self.options.workers);

        debug!(%url, length, partitions = partitions.len(), "starting ranged download");

        let file = fs::File::create(dest)
            .await
            .map_err(|source| MvnloadError::WriteFile {
                path: dest.to_path_buf(),
                source,
            })?;
        file.set_len(length)
            .await
            .map_err(|source| MvnloadError::WriteFile {
                path: dest.to_path_buf(),
                source,
            })?;
        drop(file);

        let mut handles = Vec::with_capacity(partitions.len());

        for part in partitions.iter().copied() {
            let source = self.source.clone();
            let url = url.to_string();
            let dest = dest.to_path_buf();
            let token = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                cancellable(&token, fetch_partition(source, url, dest, part)).await
            }));
        }

        let mut failures = Vec::new();
        let mut cancelled = false;

        for result in join_all(handles).await {
            match result {
                Ok(Ok(_)) => {}
                Ok(Err(MvnloadError::Cancelled)) => cancelled = true,
                Ok(Err(error)) => {
                    warn!(%error, "partition failed");
                    failures.push(error);
                }
                Err(error) => failures.push(MvnloadError::TaskJoin {
                    reason: error.to_string(),
                }),
            }
        }

        if cancelled {
            remove_quietly(dest).await;
            return Err(MvnloadError::Cancelled);
        }

        Ok(DownloadOutcome {
            bytes: length,
            partitions: partitions.len(),
            failures,
        })
    }

    async fn verify(&self, url: &str, dest: &Path) -> Result<()> {
        let expected = match cancellable(&self.cancel, self.source.fetch_checksum(url)).await {
            Ok(Some(expected)) => expected,
            Ok(None) => {
                warn!(%url, "no published checksum, skipping verification");
                return Ok(());
            }
            Err(MvnloadError::Cancelled) => return Err(MvnloadError::Cancelled),
            Err(error) => {
                warn!(%url, %error, "checksum unavailable, skipping verification");
                return Ok(());
            }
        };

        let actual = sha1_file(dest).await?;
        debug!(path = %dest.display(), %actual, %expected, "verifying checksum");

        if actual.eq_ignore_ascii_case(&expected) {
            return Ok(());
        }

        remove_quietly(dest).await;
        Err(MvnloadError::ChecksumMismatch {
            path: dest.to_path_buf(),
            expected,
            actual,
        })
    }
}

async fn fetch_partition(
    source: Arc<dyn ArtifactSource>,
    url: String,
    dest: PathBuf,
    part: Partition,
) -> Result<usize> {
    let failed = |reason: String| MvnloadError::DownloadPartitionFailed {
        url: url.clone(),
        start: part.start,
        end: part.end,
        reason,
    };

    let bytes = match source.fetch_range(&url, part.start, part.end).await {
        Ok(bytes) => bytes,
        Err(MvnloadError::Cancelled) => return Err(MvnloadError::Cancelled),
        Err(error) => return Err(failed(error.to_string())),
    };

    let expected = part.len();
    let received = bytes.len() as u64;

    if received > expected {
        return Err(failed(format!(
            "received {} bytes, expected {}",
            received, expected
        )));
    }

    write_at(&dest, part.start, &bytes)
        .await
        .map_err(|error| failed(error.to_string()))?;

    if received < expected {
        return Err(failed(format!(
            "received {} bytes, expected {}",
            received, expected
        )));
    }

    Ok(bytes.len())
}

async fn write_at(path: &Path, offset: u64, bytes: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(bytes).await?;
    file.flush().await
}

async fn sha1_file(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| MvnloadError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;

    tokio::task::spawn_blocking(move || hex::encode(Sha1::digest(&bytes)))
        .await
        .map_err(|error| MvnloadError::TaskJoin {
            reason: error.to_string(),
        })
}

async fn remove_quietly(path: &Path) {
    if let Err(error) = fs::remove_file(path).await {
        debug!(path = %path.display(), %error, "could not remove partial artifact");
    }
}

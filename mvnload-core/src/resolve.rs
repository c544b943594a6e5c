use crate::cancel::cancellable;
use crate::coordinate::Coordinate;
use crate::dependency::{Dependency, is_excluded_artifact};
use crate::descriptor::{DeclaredDependency, Descriptor};
use crate::repository::{CachedRepository, Repository, RepositoryExt};
use crate::{MvnloadError, Result};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod reconcile;
pub mod types;

pub use types::ResolveOptions;
use types::Frame;

/// Resolves the transitive closure of `root`, root included.
///
/// Dependencies are listed after everything they pull in. Repeated entries
/// are kept unless `options.dedupe` is set.
pub async fn resolve(
    repository: &dyn Repository,
    root: Dependency,
    options: ResolveOptions,
) -> Result<Vec<Dependency>> {
    Resolver::new(repository, options)
        .resolve_all(vec![root])
        .await
}

/// Keeps the first occurrence of each identity.
pub fn dedupe(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut seen = BTreeSet::new();
    dependencies
        .into_iter()
        .filter(|dependency| seen.insert(dependency.identity()))
        .collect()
}

/// One resolution run. Version indexes are fetched once per family for the
/// lifetime of the resolver.
pub struct Resolver<'a> {
    repository: CachedRepository<'a>,
    options: ResolveOptions,
    cancel: CancellationToken,
}

impl<'a> Resolver<'a> {
    pub fn new(repository: &'a dyn Repository, options: ResolveOptions) -> Self {
        Resolver {
            repository: CachedRepository::new(repository),
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub async fn resolve_all(&mut self, worklist: Vec<Dependency>) -> Result<Vec<Dependency>> {
        let resolved = self.expand(worklist).await?;

        if self.options.dedupe {
            Ok(dedupe(resolved))
        } else {
            Ok(resolved)
        }
    }

    async fn expand(&mut self, worklist: Vec<Dependency>) -> Result<Vec<Dependency>> {
        let mut stack = vec![Frame::new(worklist, None)];

        loop {
            let Some(top) = stack.last_mut() else {
                return Ok(Vec::new());
            };

            let Some(dependency) = top.next() else {
                let Some(finished) = stack.pop() else {
                    return Ok(Vec::new());
                };
                let output = finished.finish();

                match stack.last_mut() {
                    Some(parent) => parent.subtree.extend(output),
                    None => return Ok(output),
                }
                continue;
            };

            if dependency.is_excluded() {
                continue;
            }

            if dependency.is_local() {
                top.leaves.push(dependency);
                continue;
            }

            let Dependency::Remote {
                coordinate,
                repository,
            } = &dependency
            else {
                continue;
            };

            let identity = dependency.identity();
            if stack
                .iter()
                .any(|frame| frame.expanding.as_deref() == Some(identity.as_str()))
            {
                warn!(dependency = %identity, "dependency cycle detected, treating as leaf");
                if let Some(top) = stack.last_mut() {
                    top.leaves.push(dependency);
                }
                continue;
            }

            let descriptor = self
                .descriptor(repository, coordinate)
                .await
                .map_err(|error| MvnloadError::resolution(identity.clone(), error))?;

            if descriptor.is_empty() {
                debug!(dependency = %identity, "leaf");
                if let Some(top) = stack.last_mut() {
                    top.leaves.push(dependency);
                }
                continue;
            }

            let children = self
                .children(&stack, repository, &descriptor)
                .await
                .map_err(|error| MvnloadError::resolution(identity.clone(), error))?;

            debug!(dependency = %identity, children = children.len(), "expanding");
            stack.push(Frame::new(children, Some(identity)));
        }
    }

    async fn descriptor(&self, repository: &str, coordinate: &Coordinate) -> Result<Descriptor> {
        cancellable(
            &self.cancel,
            self.repository.fetch_descriptor(repository, coordinate),
        )
        .await
    }

    /// Turns declared children into concrete dependencies on the declaring
    /// repository.
    async fn children(
        &self,
        frames: &[Frame],
        repository: &str,
        descriptor: &Descriptor,
    ) -> Result<Vec<Dependency>> {
        let mut children = Vec::new();

        for declared in &descriptor.dependencies {
            if declared.is_test_scoped() || is_excluded_artifact(&declared.artifact_id) {
                continue;
            }

            let group_id = if declared.group_id.starts_with("${") {
                declared.artifact_id.clone()
            } else {
                declared.group_id.clone()
            };

            let version = self
                .child_version(frames, repository, &group_id, declared)
                .await?;

            children.push(Dependency::remote_in(
                Coordinate::new(group_id, declared.artifact_id.clone(), version),
                repository,
            ));
        }

        Ok(children)
    }

    async fn child_version(
        &self,
        frames: &[Frame],
        repository: &str,
        group_id: &str,
        declared: &DeclaredDependency,
    ) -> Result<String> {
        if self.options.trust_declared_versions
            && let Some(version) = declared.concrete_version()
        {
            return Ok(version.to_string());
        }

        self.reconcile(frames, repository, group_id, &declared.artifact_id)
            .await
    }

    /// Latest published version, unless the run already selected a version
    /// in the same group that this artifact also publishes.
    async fn reconcile(
        &self,
        frames: &[Frame],
        repository: &str,
        group_id: &str,
        artifact_id: &str,
    ) -> Result<String> {
        let latest = cancellable(
            &self.cancel,
            self.repository
                .fetch_latest_version(repository, group_id, artifact_id),
        )
        .await?;

        for version in reconcile::candidate_versions(frames, group_id) {
            let exists = cancellable(
                &self.cancel,
                self.repository
                    .version_exists(repository, group_id, artifact_id, &version),
            )
            .await?;

            if exists {
                if latest.as_deref() != Some(version.as_str()) {
                    debug!(group_id, artifact_id, %version, latest = ?latest, "reconciled to version already in use");
                }
                return Ok(version);
            }
        }

        latest.ok_or_else(|| MvnloadError::NoVersionAvailable {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        })
    }
}

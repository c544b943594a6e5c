pub mod config;
pub mod fetch;
pub mod resolve;
pub mod run;

use anyhow::Result;
use mvnload_core::{
    Coordinate, Dependency, HttpRepository, MvnloadConfig, ResolveOptions, Resolver, console,
};
use tokio_util::sync::CancellationToken;

/// Resolves `coordinate` and appends the given local locations as leaves.
pub(crate) async fn resolve_closure(
    config: &MvnloadConfig,
    http: &HttpRepository,
    coordinate: Coordinate,
    repository: Option<&str>,
    locals: &[String],
    options: ResolveOptions,
    token: &CancellationToken,
) -> Result<Vec<Dependency>> {
    let root = Dependency::remote_in(coordinate, repository.unwrap_or(&config.repository));
    console::step(&format!("resolving {}", root));

    let mut resolver = Resolver::new(http, options).with_cancellation(token.clone());
    let mut worklist = vec![root];
    worklist.extend(locals.iter().map(Dependency::local));

    Ok(resolver.resolve_all(worklist).await?)
}

use super::resolve_closure;
use anyhow::Result;
use clap::Args;
use mvnload_core::{
    ArtifactSource, Coordinate, Dependency, DownloadOptions, DownloadReport, Downloader,
    HttpRepository, MvnloadConfig, ResolveOptions, console,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Root coordinate, e.g. "com.google.code.gson:gson:2.9.0"
    pub coordinate: Coordinate,
    /// Repository base URL (defaults to the configured repository)
    #[arg(long)]
    pub repository: Option<String>,
    /// Directory to download artifacts into
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Concurrent ranged requests per artifact
    #[arg(short = 'w', long = "workers")]
    pub workers: Option<usize>,
    /// Artifact file extension
    #[arg(long)]
    pub extension: Option<String>,
    /// Extra local artifact (path or file:// URL) to include
    #[arg(long = "local")]
    pub locals: Vec<String>,
    /// Fail when any artifact downloads incompletely
    #[arg(long)]
    pub strict: bool,
    /// Verify downloads against the repository's .sha1 files
    #[arg(long)]
    pub verify: bool,
    /// Skip repeated entries while resolving
    #[arg(long)]
    pub dedupe: bool,
}

pub async fn run(args: FetchArgs, config: &MvnloadConfig, token: CancellationToken) -> Result<()> {
    console::header("fetch", env!("CARGO_PKG_VERSION"));

    let http = HttpRepository::from_config(config)?;
    let options = ResolveOptions {
        dedupe: args.dedupe || config.dedupe,
        trust_declared_versions: config.trust_declared_versions,
    };

    let closure = resolve_closure(
        config,
        &http,
        args.coordinate,
        args.repository.as_deref(),
        &args.locals,
        options,
        &token,
    )
    .await?;

    let mut download = DownloadOptions::from_config(config);
    if let Some(workers) = args.workers {
        download.workers = workers.max(1);
    }
    if let Some(extension) = args.extension {
        download.extension = extension;
    }
    download.strict |= args.strict;
    download.verify_checksums |= args.verify;

    let output = args.output.unwrap_or_else(|| config.output_dir.clone());
    let report = download_closure(http, &closure, download, &output, token).await?;

    let count = report.downloaded.len() + report.skipped.len() + report.local.len();
    console::summary(
        count,
        "artifact",
        "artifacts",
        "available",
        console::elapsed_seconds(),
    );

    if !report.is_complete() {
        console::warn(&format!(
            "{} artifact(s) are incomplete; delete them and fetch again, or pass --strict",
            report.incomplete.len()
        ));
    }

    Ok(())
}

/// Downloads `closure` into `output` and prints one line per artifact.
pub(crate) async fn download_closure(
    http: HttpRepository,
    closure: &[Dependency],
    options: DownloadOptions,
    output: &Path,
    token: CancellationToken,
) -> Result<DownloadReport> {
    console::step(&format!("downloading into {}", output.display()));

    let source: Arc<dyn ArtifactSource> = Arc::new(http);
    let downloader = Downloader::new(source, options).with_cancellation(token);
    let report = downloader.download_all(closure, output).await?;

    for artifact in &report.downloaded {
        console::downloaded(&file_name(&artifact.path), artifact.bytes);
    }
    for path in &report.skipped {
        console::skipped(&file_name(path));
    }
    for artifact in &report.incomplete {
        console::incomplete(
            &file_name(&artifact.path),
            artifact.failures.len(),
            artifact.partitions,
        );
    }

    Ok(report)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

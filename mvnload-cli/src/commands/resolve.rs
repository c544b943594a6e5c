use super::resolve_closure;
use anyhow::Result;
use clap::Args;
use mvnload_core::{Coordinate, HttpRepository, MvnloadConfig, ResolveOptions, console};
use tokio_util::sync::CancellationToken;

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Root coordinate, e.g. "com.google.code.gson:gson:2.9.0"
    pub coordinate: Coordinate,
    /// Repository base URL (defaults to the configured repository)
    #[arg(long)]
    pub repository: Option<String>,
    /// Drop repeated entries from the output
    #[arg(long)]
    pub dedupe: bool,
    /// Keep concrete versions declared in descriptors instead of reconciling them
    #[arg(long = "trust-declared")]
    pub trust_declared: bool,
    /// Print the closure as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ResolveArgs, config: &MvnloadConfig, token: CancellationToken) -> Result<()> {
    if !args.json {
        console::header("resolve", env!("CARGO_PKG_VERSION"));
    }

    let http = HttpRepository::from_config(config)?;
    let options = ResolveOptions {
        dedupe: args.dedupe || config.dedupe,
        trust_declared_versions: args.trust_declared || config.trust_declared_versions,
    };

    let closure = resolve_closure(
        config,
        &http,
        args.coordinate,
        args.repository.as_deref(),
        &[],
        options,
        &token,
    )
    .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&closure)?);
        return Ok(());
    }

    for dependency in &closure {
        console::resolved(&dependency.identity(), dependency.is_local());
    }

    console::summary(
        closure.len(),
        "dependency",
        "dependencies",
        "resolved",
        console::elapsed_seconds(),
    );
    Ok(())
}

use anyhow::Result;
use clap::Args;
use mvnload_core::{MvnloadConfig, console};
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub async fn run(_args: ConfigArgs, config: &MvnloadConfig) -> Result<()> {
    console::header("config", env!("CARGO_PKG_VERSION"));

    console::info("paths");
    console::info(&format!("  data dir: {}", config.data_dir.display()));
    console::info(&format!("  output dir: {}", config.output_dir.display()));
    println!();

    console::info("repository");
    console::info(&format!("  default: {}", config.repository));
    console::info(&format!("  timeout: {}", format_timeout(config.timeout)));
    println!();

    console::info("resolve");
    console::info(&format!("  dedupe: {}", config.dedupe));
    console::info(&format!(
        "  trust declared versions: {}",
        config.trust_declared_versions
    ));
    println!();

    console::info("download");
    console::info(&format!("  workers: {}", config.workers));
    console::info(&format!("  extension: {}", config.extension));
    console::info(&format!("  strict: {}", config.strict_downloads));
    console::info(&format!("  verify checksums: {}", config.verify_checksums));
    println!();

    console::info("logging");
    console::info(&format!("  verbose: {}", config.verbose));

    Ok(())
}

fn format_timeout(timeout: Option<Duration>) -> String {
    match timeout {
        Some(duration) => format!("{}s", duration.as_secs()),
        None => "none".to_string(),
    }
}

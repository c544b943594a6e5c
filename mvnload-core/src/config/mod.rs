use crate::dependency::{DEFAULT_REPOSITORY, normalize_repository};
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub mod rc;
pub use self::rc::*;

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_EXTENSION: &str = "jar";

#[derive(Debug, Clone)]
pub struct MvnloadConfig {
    pub repository: String,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workers: usize,
    pub extension: String,
    pub dedupe: bool,
    pub trust_declared_versions: bool,
    pub strict_downloads: bool,
    pub verify_checksums: bool,
    pub timeout: Option<Duration>,
    pub verbose: bool,
}

impl MvnloadConfig {
    /// Defaults, then `.mvnloadrc` files, then `MVNLOAD_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_sources(read_rc_settings(), |key| env::var(key).ok())
    }

    pub fn from_sources(rc: RcSettings, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| {
            var(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let flag = |key: &str, fallback: Option<bool>| {
            var(key)
                .and_then(|value| parse_bool(&value))
                .or(fallback)
                .unwrap_or(false)
        };

        let data_dir = match var("MVNLOAD_HOME") {
            Some(home) => PathBuf::from(home),
            None => match ProjectDirs::from("io", "mvnload", "mvnload") {
                Some(dirs) => dirs.data_local_dir().to_path_buf(),
                None => PathBuf::from(".mvnload"),
            },
        };

        let repository = var("MVNLOAD_REPOSITORY")
            .or(rc.repository)
            .map(|value| normalize_repository(&value))
            .unwrap_or_else(|| DEFAULT_REPOSITORY.to_string());

        let output_dir = var("MVNLOAD_OUTPUT_DIR")
            .map(PathBuf::from)
            .or(rc.output_dir)
            .unwrap_or_else(|| data_dir.join("artifacts"));

        let workers = var("MVNLOAD_WORKERS")
            .and_then(|value| parse_positive(&value))
            .or(rc.workers)
            .unwrap_or(DEFAULT_WORKERS);

        let extension = var("MVNLOAD_EXTENSION")
            .map(|value| value.trim_start_matches('.').to_string())
            .or(rc.extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

        let timeout = var("MVNLOAD_TIMEOUT_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .or(rc.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        MvnloadConfig {
            repository,
            output_dir,
            data_dir,
            workers,
            extension,
            dedupe: flag("MVNLOAD_DEDUPE", rc.dedupe),
            trust_declared_versions: flag("MVNLOAD_TRUST_DECLARED", rc.trust_declared),
            strict_downloads: flag("MVNLOAD_STRICT_DOWNLOADS", rc.strict_downloads),
            verify_checksums: flag("MVNLOAD_VERIFY_CHECKSUMS", rc.verify_checksums),
            timeout,
            verbose: flag("MVNLOAD_VERBOSE", None),
        }
    }
}

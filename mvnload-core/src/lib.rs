pub mod cancel;
pub mod config;
pub mod console;
pub mod coordinate;
pub mod dependency;
pub mod descriptor;
pub mod download;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod repository;
pub mod resolve;

pub use config::MvnloadConfig;
pub use coordinate::Coordinate;
pub use dependency::Dependency;
pub use download::{ArtifactSource, DownloadOptions, DownloadReport, Downloader};
pub use error::MvnloadError;
pub use loader::{Component, LoadingContext};
pub use repository::{CachedRepository, HttpRepository, Repository, RepositoryExt};
pub use resolve::{ResolveOptions, Resolver, dedupe, resolve};

pub use mvnload_component::{TypeTag, Value};

pub type Result<T> = std::result::Result<T, MvnloadError>;

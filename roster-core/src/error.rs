use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::roster::RosterError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("invalid plan catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("seed student #{index} rejected: {source}")]
    Seed { index: usize, source: RosterError },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

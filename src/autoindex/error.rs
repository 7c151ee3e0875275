//! Error types for the auto-index registry and orchestrator.

use std::path::PathBuf;
use thiserror::Error;

use crate::fingerprint::FingerprintError;
use crate::watcher::WatchError;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Corrupt auto-index state at {path}: {reason}")]
    CorruptState { path: PathBuf, reason: String },

    #[error("Failed to persist auto-index state to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode auto-index state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("A project named '{0}' is already registered")]
    DuplicateName(String),

    #[error("Cannot register {path}: {reason}")]
    MissingPath { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum AutoIndexError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to fingerprint project '{name}': {source}")]
    Fingerprint {
        name: String,
        #[source]
        source: FingerprintError,
    },

    #[error("Failed to set up watching: {0}")]
    Watch(#[from] WatchError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type AutoIndexResult<T> = Result<T, AutoIndexError>;

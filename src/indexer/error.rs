use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Project path {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to walk {path}: {reason}")]
    Walk { path: PathBuf, reason: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode index for {project}: {source}")]
    Serialize {
        project: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Corrupt index at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No index found for project '{0}'")]
    NotFound(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

//! doctree: keeps documentation indexes in sync with source trees on disk and
//! serves them over HTTP.

pub mod autoindex;
pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod indexer;
pub mod logging;
pub mod server;
pub mod watcher;

pub use autoindex::{AutoIndexEntry, AutoIndexError, AutoIndexRegistry, Orchestrator, RegistryError};
pub use config::Settings;
pub use fingerprint::{DirHasher, Fingerprint, Fingerprinter};
pub use indexer::{IndexEngine, IndexError, IndexStore, ManifestEngine, ProjectIndex};
pub use watcher::{WatchAdapter, WatchError, WatchEvent, WatchOp};

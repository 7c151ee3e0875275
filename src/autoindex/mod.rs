//! Auto-indexing: the durable registry of tracked projects and the
//! orchestrator that keeps their indexes current.

mod error;
mod orchestrator;
mod registry;

pub use error::{AutoIndexError, AutoIndexResult, RegistryError};
pub use orchestrator::{Orchestrator, Phase, ReindexTrigger};
pub use registry::{AutoIndexEntry, AutoIndexRegistry, is_within};

//! Documentation indexes: the engine that writes them and the store that reads them.
//!
//! The orchestrator only ever calls [`IndexEngine::index`]; the HTTP layer only
//! ever reads through [`IndexStore`]. The two meet at the filesystem, where
//! each project's index is replaced atomically.

pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use engine::{IndexEngine, ManifestEngine, markdown_sections, project_dir};
pub use error::{IndexError, IndexResult};
pub use store::IndexStore;
pub use types::{IndexSummary, IndexedFile, LanguageIndex, ProjectIndex, SearchResult, Section};

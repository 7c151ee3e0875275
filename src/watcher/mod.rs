//! Filesystem watching for auto-indexed projects.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (one per process)
//!   - callback splits events per path
//!         |
//!    +----------+----------+
//!    |                     |
//! events channel      errors channel
//!    |                     |
//!    +---- Orchestrator ---+
//!          (select!)
//! ```

mod adapter;
mod debouncer;
mod error;

pub use adapter::{WatchAdapter, WatchEvent, WatchOp};
pub use debouncer::Debouncer;
pub use error::WatchError;

//! Reindex orchestrator: keeps the auto-index registry and the on-disk indexes
//! in step with the watched source trees.
//!
//! Lifecycle:
//! 1. `Initializing` - load the registry, reindex every project whose
//!    fingerprint changed while the server was down, register all project
//!    paths with the watch adapter, persist the registry.
//! 2. `SteadyState` - route each filesystem event to the first registered
//!    project containing it and reindex that project.
//! 3. `ShuttingDown` - close the adapter and flush the registry.
//!
//! Anything failing during initialization is returned to the caller. Anything
//! failing in steady state is logged and the loop keeps going.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::error::{AutoIndexError, AutoIndexResult};
use super::registry::AutoIndexRegistry;
use crate::config::WatchConfig;
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::indexer::IndexEngine;
use crate::watcher::{Debouncer, WatchAdapter, WatchEvent};

/// Upper bound on how often pending debounced triggers are checked.
const MAX_TICK_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    SteadyState,
    ShuttingDown,
}

/// Decision to reindex one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexTrigger {
    pub name: String,
    pub path: PathBuf,
}

/// Owns the registry for the lifetime of the process. Nothing else writes it.
pub struct Orchestrator {
    state_path: PathBuf,
    registry: AutoIndexRegistry,
    fingerprinter: Arc<dyn Fingerprinter>,
    engine: Arc<dyn IndexEngine>,
    watch: WatchConfig,
    debouncer: Debouncer<String>,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(
        state_path: impl Into<PathBuf>,
        fingerprinter: Arc<dyn Fingerprinter>,
        engine: Arc<dyn IndexEngine>,
        watch: WatchConfig,
    ) -> Self {
        let debouncer = Debouncer::new(watch.debounce_ms);
        Self {
            state_path: state_path.into(),
            registry: AutoIndexRegistry::new(),
            fingerprinter,
            engine,
            watch,
            debouncer,
            phase: Phase::Initializing,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &AutoIndexRegistry {
        &self.registry
    }

    /// Run the whole initialization phase and return the live watch adapter.
    pub async fn initialize(&mut self) -> AutoIndexResult<WatchAdapter> {
        self.phase = Phase::Initializing;
        self.load()?;
        self.reconcile().await?;
        let adapter = self.start_watching()?;
        self.persist()?;
        self.phase = Phase::SteadyState;
        Ok(adapter)
    }

    /// Replace the in-memory registry with the durable one.
    pub fn load(&mut self) -> AutoIndexResult<()> {
        self.registry = AutoIndexRegistry::load(&self.state_path)?;
        crate::debug_event!(
            "autoindex",
            "loaded",
            "{} projects from {}",
            self.registry.len(),
            self.state_path.display()
        );
        Ok(())
    }

    /// Reindex every project whose tree changed since it was last indexed.
    ///
    /// Returns how many fingerprints were updated. A failed reindex leaves the
    /// old fingerprint in place so the project is retried on the next start.
    pub async fn reconcile(&mut self) -> AutoIndexResult<usize> {
        let mut updated = 0;
        let entries = self.registry.entries().to_vec();

        for entry in entries {
            let current = self.fingerprint(&entry.name, &entry.path).await?;
            if current == entry.fingerprint {
                crate::debug_event!("autoindex", "up to date", "{}", entry.name);
                continue;
            }

            crate::log_event!(
                "autoindex",
                "stale",
                "{} was modified while the server was down, reindexing",
                entry.name
            );
            let trigger = ReindexTrigger {
                name: entry.name.clone(),
                path: entry.path.clone(),
            };
            if !self.dispatch(&trigger).await {
                continue;
            }

            let fresh = self.fingerprint(&entry.name, &entry.path).await?;
            self.registry.set_fingerprint(&entry.name, fresh);
            updated += 1;
        }

        Ok(updated)
    }

    /// Register every project path with a new watch adapter. Fails fast.
    pub fn start_watching(&self) -> AutoIndexResult<WatchAdapter> {
        if self.registry.is_empty() {
            tracing::warn!("[autoindex] no projects registered - add one with 'doctree add <dir>'");
        }

        let paths = self.registry.entries().iter().map(|e| e.path.as_path());
        let adapter =
            WatchAdapter::watch(paths, self.watch.recursive, self.watch.channel_capacity)?;

        for entry in self.registry.entries() {
            crate::log_event!("autoindex", "watching", "{} ({})", entry.name, entry.path.display());
        }
        Ok(adapter)
    }

    /// Write the full registry to durable storage.
    pub fn persist(&self) -> AutoIndexResult<()> {
        self.registry.save(&self.state_path)?;
        Ok(())
    }

    /// First registered project containing the event path.
    pub fn route(&self, event: &WatchEvent) -> Option<ReindexTrigger> {
        self.registry.owner_of(&event.path).map(|entry| ReindexTrigger {
            name: entry.name.clone(),
            path: entry.path.clone(),
        })
    }

    /// Consume watch events until cancelled or until the adapter's event
    /// stream ends, then shut down.
    pub async fn run(
        mut self,
        mut adapter: WatchAdapter,
        cancel: CancellationToken,
    ) -> AutoIndexResult<()> {
        self.phase = Phase::SteadyState;
        let tick = Duration::from_millis(self.watch.debounce_ms.clamp(1, MAX_TICK_MS));
        // Shared across iterations; incoming events never reset it.
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut errors_open = true;

        crate::log_event!("autoindex", "started", "{} projects", self.registry.len());

        loop {
            let (events, errors) = adapter.streams();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    crate::debug_event!("autoindex", "cancelled");
                    break;
                }

                event = events.recv() => match event {
                    Some(event) => self.on_event(event).await,
                    None => {
                        crate::log_event!("autoindex", "event stream ended");
                        break;
                    }
                },

                error = errors.recv(), if errors_open => match error {
                    Some(e) => tracing::error!("[autoindex] watch error: {e}"),
                    None => errors_open = false,
                },

                _ = ticker.tick(), if self.debouncer.has_pending() => {
                    for name in self.debouncer.take_ready() {
                        self.dispatch_by_name(&name).await;
                    }
                }
            }
        }

        self.shutdown(&mut adapter)
    }

    /// Close the adapter and flush the registry.
    fn shutdown(&mut self, adapter: &mut WatchAdapter) -> AutoIndexResult<()> {
        self.phase = Phase::ShuttingDown;
        adapter.close();

        let dropped = self.debouncer.drain();
        if !dropped.is_empty() {
            tracing::warn!(
                "[autoindex] dropping pending reindex for: {}",
                dropped.join(", ")
            );
        }

        self.persist()?;
        crate::log_event!("autoindex", "stopped");
        Ok(())
    }

    async fn on_event(&mut self, event: WatchEvent) {
        crate::debug_event!("autoindex", "event", "{event}");

        let Some(trigger) = self.route(&event) else {
            crate::log_event!("autoindex", "ignored", "{} is not in a tracked project", event.path.display());
            return;
        };

        if self.watch.debounce_ms == 0 {
            self.dispatch(&trigger).await;
        } else {
            self.debouncer.record(trigger.name);
        }
    }

    async fn dispatch_by_name(&self, name: &str) {
        let Some(entry) = self.registry.get(name) else {
            return;
        };
        let trigger = ReindexTrigger {
            name: entry.name.clone(),
            path: entry.path.clone(),
        };
        self.dispatch(&trigger).await;
    }

    /// Run the index engine on the blocking pool and wait for it.
    ///
    /// Only one invocation is ever in flight. Returns whether it succeeded.
    async fn dispatch(&self, trigger: &ReindexTrigger) -> bool {
        crate::log_event!("autoindex", "reindexing", "{} ({})", trigger.name, trigger.path.display());

        let engine = Arc::clone(&self.engine);
        let name = trigger.name.clone();
        let path = trigger.path.clone();
        let started = Instant::now();

        match tokio::task::spawn_blocking(move || engine.index(&name, &path)).await {
            Ok(Ok(index)) => {
                crate::log_event!(
                    "autoindex",
                    "reindexed",
                    "{}: {} files in {:.2?}",
                    trigger.name,
                    index.file_count(),
                    started.elapsed()
                );
                true
            }
            Ok(Err(e)) => {
                tracing::error!("[autoindex] reindex of {} failed: {e}", trigger.name);
                false
            }
            Err(e) => {
                tracing::error!("[autoindex] reindex task for {} failed: {e}", trigger.name);
                false
            }
        }
    }

    async fn fingerprint(&self, name: &str, path: &Path) -> AutoIndexResult<Fingerprint> {
        let fingerprinter = Arc::clone(&self.fingerprinter);
        let dir = path.to_path_buf();
        tokio::task::spawn_blocking(move || fingerprinter.fingerprint(&dir))
            .await?
            .map_err(|source| AutoIndexError::Fingerprint {
                name: name.to_string(),
                source,
            })
    }
}

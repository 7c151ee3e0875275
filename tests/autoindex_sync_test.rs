//! End-to-end auto-indexing against real directories: real fingerprints, the
//! manifest engine, and a live filesystem watcher.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use doctree::config::WatchConfig;
use doctree::{
    AutoIndexRegistry, DirHasher, Fingerprint, Fingerprinter, IndexStore, ManifestEngine,
    Orchestrator, Settings,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn watch_config(debounce_ms: u64) -> WatchConfig {
    WatchConfig {
        debounce_ms,
        ..Settings::default().watch
    }
}

fn orchestrator(data: &Path, watch: WatchConfig) -> Orchestrator {
    Orchestrator::new(
        data.join("autoindex"),
        Arc::new(DirHasher::new()),
        Arc::new(ManifestEngine::new(data.join("index"))),
        watch,
    )
}

fn seed(data: &Path, entries: &[(&str, &Path, Fingerprint)]) {
    let mut registry = AutoIndexRegistry::new();
    for (name, path, fingerprint) in entries {
        registry.register(*name, path, fingerprint.clone()).unwrap();
    }
    registry.save(&data.join("autoindex")).unwrap();
}

#[tokio::test]
async fn stale_project_is_reindexed_at_startup() {
    let data = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    std::fs::write(source.path().join("README.md"), "# Overview\n").unwrap();
    seed(data.path(), &[("a", source.path(), Fingerprint::new("h1:old"))]);

    let mut orch = orchestrator(data.path(), watch_config(0));
    let _adapter = orch.initialize().await.unwrap();

    let live = DirHasher::new().fingerprint(source.path()).unwrap();
    let persisted = AutoIndexRegistry::load(&data.path().join("autoindex")).unwrap();
    assert_eq!(persisted.get("a").unwrap().fingerprint, live);

    let index = IndexStore::new(data.path().join("index")).get("a").unwrap();
    assert_eq!(Path::new(&index.path), source.path().canonicalize().unwrap());
    assert_eq!(index.file_count(), 1);
}

#[tokio::test]
async fn fresh_project_is_left_alone() {
    let data = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    std::fs::write(source.path().join("README.md"), "# Overview\n").unwrap();
    let live = DirHasher::new().fingerprint(source.path()).unwrap();
    seed(data.path(), &[("a", source.path(), live)]);

    let mut orch = orchestrator(data.path(), watch_config(0));
    let _adapter = orch.initialize().await.unwrap();

    // No engine run means no index was written.
    assert!(IndexStore::new(data.path().join("index")).list().unwrap().is_empty());
}

#[tokio::test]
async fn file_change_reindexes_owning_project() {
    let data = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    std::fs::write(source.path().join("README.md"), "# Overview\n").unwrap();
    let live = DirHasher::new().fingerprint(source.path()).unwrap();
    seed(data.path(), &[("a", source.path(), live)]);

    let mut orch = orchestrator(data.path(), watch_config(50));
    let adapter = orch.initialize().await.unwrap();
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(orch.run(adapter, cancel.clone()));

    std::fs::write(source.path().join("GUIDE.md"), "# Install\n").unwrap();

    let store = IndexStore::new(data.path().join("index"));
    let mut reindexed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if store.get("a").map(|i| i.file_count() == 2).unwrap_or(false) {
            reindexed = true;
            break;
        }
    }

    cancel.cancel();
    handle.await.unwrap().unwrap();
    assert!(reindexed, "change in watched directory was not reindexed");
}

#[tokio::test]
async fn missing_project_directory_fails_startup() {
    let data = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    seed(data.path(), &[("a", source.path(), Fingerprint::new("h1:x"))]);
    let registered = AutoIndexRegistry::load(&data.path().join("autoindex"))
        .unwrap()
        .get("a")
        .unwrap()
        .path
        .clone();
    drop(source);
    assert!(!registered.exists());

    let mut orch = orchestrator(data.path(), watch_config(0));
    assert!(orch.initialize().await.is_err());
}

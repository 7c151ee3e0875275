//! Process host: startup ordering and cooperative shutdown.

use std::net::TcpListener;

use doctree::cli::commands::serve::run_server;
use doctree::{AutoIndexRegistry, Fingerprint, Settings};
use tempfile::TempDir;

fn free_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn settings(data: &TempDir, bind: &str) -> Settings {
    let mut settings = Settings {
        data_dir: data.path().to_path_buf(),
        ..Settings::default()
    };
    settings.http.bind = bind.to_string();
    settings.watch.shutdown_grace_secs = 2;
    settings
}

#[tokio::test]
async fn unwatchable_project_prevents_listener() {
    let data = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let mut registry = AutoIndexRegistry::new();
    registry
        .register("gone", source.path(), Fingerprint::new("h1:x"))
        .unwrap();
    registry.save(&data.path().join("autoindex")).unwrap();
    drop(source);

    let addr = free_addr();
    let result = run_server(settings(&data, &addr), std::future::pending()).await;

    assert!(result.is_err());
    // Nothing took the port.
    assert!(TcpListener::bind(&addr).is_ok());
}

#[tokio::test]
async fn corrupt_state_prevents_listener() {
    let data = TempDir::new().unwrap();
    std::fs::write(data.path().join("autoindex"), "not json").unwrap();

    let addr = free_addr();
    let result = run_server(settings(&data, &addr), std::future::pending()).await;

    assert!(result.is_err());
    assert!(TcpListener::bind(&addr).is_ok());
}

#[tokio::test]
async fn shutdown_signal_stops_cleanly_and_flushes_state() {
    let data = TempDir::new().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let settings = settings(&data, &free_addr());

    let server = tokio::spawn(run_server(settings, async move {
        let _ = rx.await;
    }));
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    tx.send(()).unwrap();

    server.await.unwrap().unwrap();
    let state = std::fs::read_to_string(data.path().join("autoindex")).unwrap();
    assert_eq!(state.trim(), "[]");
}

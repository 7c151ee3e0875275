//! HTTP serving layer: index API, runtime flags, and the web client.
//!
//! Reads only the index engine's output on disk. It never touches the
//! auto-index registry.

pub mod api;
pub mod error;
pub mod frontend;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::Settings;
use crate::indexer::IndexStore;

pub use error::ApiError;
pub use frontend::{DevProxy, rewrite_dev_request};

/// Shared, read-only state for all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: IndexStore,
    pub cloud_mode: bool,
    /// Set in development mode; assets then come from a live server.
    pub dev_proxy: Option<DevProxy>,
}

impl AppState {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let dev_proxy = match &settings.frontend.dev_server {
            Some(upstream) => {
                crate::log_event!("http", "dev mode", "proxying assets to {upstream}");
                Some(DevProxy::new(upstream, settings.frontend.public_dir.clone())?)
            }
            None => None,
        };

        Ok(Self {
            store: IndexStore::new(settings.index_dir()),
            cloud_mode: settings.http.cloud_mode,
            dev_proxy,
        })
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/list", get(api::list))
        .route("/api/get", get(api::get))
        .route("/api/search", get(api::search))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ));

    Router::new()
        .merge(api)
        .route("/main.js", get(frontend::main_js))
        .fallback(frontend::fallback)
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    crate::log_event!("http", "listening", "http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    crate::log_event!("http", "stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::{IndexEngine, ManifestEngine};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn state(data: &TempDir, cloud_mode: bool) -> Arc<AppState> {
        Arc::new(AppState {
            store: IndexStore::new(data.path().join("index")),
            cloud_mode,
            dev_proxy: None,
        })
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn get_path(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_empty_is_cross_origin_json() {
        let data = TempDir::new().unwrap();
        let response = get_path(router(state(&data, false)), "/api/list").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_text(response).await, "[]");
    }

    #[tokio::test]
    async fn test_get_and_search_indexed_project() {
        let data = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        std::fs::write(source.path().join("GUIDE.md"), "# Getting started\n").unwrap();
        ManifestEngine::new(data.path().join("index"))
            .index("github.com/acme/guide", source.path())
            .unwrap();
        let app = router(state(&data, false));

        let response = get_path(app.clone(), "/api/get?name=github.com%2Facme%2Fguide").await;
        assert_eq!(response.status(), StatusCode::OK);
        let index: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(index["name"], "github.com/acme/guide");

        let response = get_path(app, "/api/search?query=getting").await;
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let results: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(results[0]["section"], "Getting started");
    }

    #[tokio::test]
    async fn test_get_errors_are_500_with_text() {
        let data = TempDir::new().unwrap();
        let app = router(state(&data, false));

        let response = get_path(app.clone(), "/api/get?name=nope").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("nope"));

        let response = get_path(app, "/api/get").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("name"));
    }

    #[tokio::test]
    async fn test_main_js_carries_flags() {
        let data = TempDir::new().unwrap();
        let response = get_path(router(state(&data, true)), "/main.js").await;

        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/javascript");
        assert_eq!(body_text(response).await, r#"App.init({flags: {"cloudMode":true}})"#);
    }

    #[tokio::test]
    async fn test_unknown_path_falls_back_to_index_html() {
        let data = TempDir::new().unwrap();
        let response = get_path(router(state(&data, false)), "/github.com/acme/guide").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("<!DOCTYPE html>"));
    }

    #[tokio::test]
    async fn test_gzip_when_accepted() {
        let data = TempDir::new().unwrap();
        let response = router(state(&data, false))
            .oneshot(
                Request::get("/")
                    .header(header::ACCEPT_ENCODING, "gzip")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::CONTENT_ENCODING], "gzip");
    }

    #[tokio::test]
    async fn test_dev_proxy_forwards_rewritten_request() {
        use axum::extract::State;
        use axum::http::HeaderMap;
        use axum::response::IntoResponse;
        use parking_lot::Mutex;

        type Seen = Arc<Mutex<Vec<(String, HeaderMap)>>>;

        async fn upstream(State(seen): State<Seen>, req: Request<Body>) -> impl IntoResponse {
            let uri = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default();
            seen.lock().push((uri, req.headers().clone()));
            (
                StatusCode::IM_A_TEAPOT,
                [("x-upstream", "live")],
                "from dev server",
            )
        }

        let seen: Seen = Arc::default();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let upstream_app = Router::new().fallback(upstream).with_state(seen.clone());
        tokio::spawn(async move {
            axum::serve(listener, upstream_app).await.unwrap();
        });

        let data = TempDir::new().unwrap();
        let public = TempDir::new().unwrap();
        let state = Arc::new(AppState {
            store: IndexStore::new(data.path().join("index")),
            cloud_mode: false,
            dev_proxy: Some(DevProxy::new(&format!("http://{addr}"), public.path()).unwrap()),
        });

        let response = router(state)
            .oneshot(
                Request::get("/github.com/x?y=1")
                    .header(header::HOST, "doctree.example")
                    .header(header::PROXY_AUTHORIZATION, "Basic c2VjcmV0")
                    .header("x-client", "kept")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers()["x-upstream"], "live");
        assert_eq!(body_text(response).await, "from dev server");

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let (uri, headers) = &seen[0];
        assert_eq!(uri, "/?/github.com/x&y=1");
        assert_eq!(headers[header::HOST], addr.to_string().as_str());
        assert!(headers.get(header::PROXY_AUTHORIZATION).is_none());
        assert_eq!(headers["x-client"], "kept");
    }
}

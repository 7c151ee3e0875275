//! Web client hosting: embedded assets in production, a reverse proxy to a
//! live asset server in development.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::AppState;
use super::error::ApiError;

/// Largest request body forwarded to the development server.
const MAX_PROXY_BODY: usize = 16 * 1024 * 1024;

struct Asset {
    path: &'static str,
    content_type: &'static str,
    body: &'static str,
}

const INDEX_HTML: &str = "/index.html";

static ASSETS: &[Asset] = &[
    Asset {
        path: INDEX_HTML,
        content_type: "text/html; charset=utf-8",
        body: include_str!("../../frontend/public/index.html"),
    },
    Asset {
        path: "/app.js",
        content_type: "application/javascript",
        body: include_str!("../../frontend/public/app.js"),
    },
    Asset {
        path: "/style.css",
        content_type: "text/css; charset=utf-8",
        body: include_str!("../../frontend/public/style.css"),
    },
];

fn lookup(path: &str) -> Option<&'static Asset> {
    let path = if path == "/" { INDEX_HTML } else { path };
    ASSETS.iter().find(|a| a.path == path)
}

/// Serve an embedded asset. Paths with no asset, like `/github.com/org/repo`,
/// are client-side routes and get the host document.
pub fn embedded(path: &str) -> Response {
    // ASSETS[0] is the host document
    let asset = lookup(path).unwrap_or(&ASSETS[0]);
    (
        [(header::CONTENT_TYPE, asset.content_type)],
        asset.body,
    )
        .into_response()
}

/// Flags handed to the client at boot so it can tell how it is deployed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientFlags {
    cloud_mode: bool,
}

/// `/main.js`: boots the client with runtime flags.
pub async fn main_js(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let flags = serde_json::to_string(&ClientFlags {
        cloud_mode: state.cloud_mode,
    })
    .map_err(|e| ApiError::new(e.to_string()))?;

    Ok((
        [(header::CONTENT_TYPE, "application/javascript")],
        format!("App.init({{flags: {flags}}})"),
    )
        .into_response())
}

/// Catch-all: embedded assets or the development proxy.
pub async fn fallback(State(state): State<Arc<AppState>>, req: Request) -> Response {
    match &state.dev_proxy {
        Some(proxy) => match proxy.forward(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("[http] dev proxy error: {}", e.message());
                e.into_response()
            }
        },
        None => embedded(req.uri().path()),
    }
}

/// Rewrite a development request whose path looks like a file but does not
/// exist on disk.
///
/// Project routes such as `/github.com/org/repo` contain a domain-like segment
/// and would be treated as static files by the asset server. They are sent to `/` with
/// the original path folded into the query string so client-side routing
/// still sees it.
pub fn rewrite_dev_request(
    public_dir: &Path,
    path: &str,
    query: Option<&str>,
) -> (String, Option<String>) {
    let looks_like_file = path.contains('.');
    let on_disk = public_dir.join(path.trim_start_matches('/')).exists();

    if looks_like_file && !on_disk {
        let folded = match query {
            Some(q) if !q.is_empty() => format!("{path}&{q}"),
            _ => path.to_string(),
        };
        ("/".to_string(), Some(folded))
    } else {
        (path.to_string(), query.map(str::to_string))
    }
}

/// Forwards requests to a live-reload asset server.
#[derive(Debug, Clone)]
pub struct DevProxy {
    client: reqwest::Client,
    upstream: String,
    public_dir: PathBuf,
}

impl DevProxy {
    pub fn new(upstream: &str, public_dir: impl Into<PathBuf>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            upstream: upstream.trim_end_matches('/').to_string(),
            public_dir: public_dir.into(),
        })
    }

    /// Upstream URL for a request path and query, after the file-path rewrite.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> String {
        let (path, query) = rewrite_dev_request(&self.public_dir, path, query);
        match query {
            Some(q) => format!("{}{path}?{q}", self.upstream),
            None => format!("{}{path}", self.upstream),
        }
    }

    pub async fn forward(&self, req: Request) -> Result<Response, ApiError> {
        let url = self.target_url(req.uri().path(), req.uri().query());
        crate::debug_event!("http", "proxy", "{} {url}", req.method());

        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, MAX_PROXY_BODY)
            .await
            .map_err(|e| ApiError::new(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_headers(&mut headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_headers(&mut response_headers);
        response_headers.remove(header::CONTENT_LENGTH);
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn strip_hop_headers(headers: &mut HeaderMap<HeaderValue>) {
    for name in [
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
        header::TE,
        header::TRAILER,
        header::PROXY_AUTHORIZATION,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

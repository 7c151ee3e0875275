//! Read-only JSON API over the persisted indexes.
//!
//! SECURITY: none of these endpoints mutate state or expose privileged
//! information, so they are readable from any origin.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};

use super::AppState;
use super::error::ApiError;
use crate::indexer::{IndexSummary, ProjectIndex, SearchResult};

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<IndexSummary>>, ApiError> {
    let store = state.store.clone();
    let indexes = tokio::task::spawn_blocking(move || store.list()).await??;
    Ok(Json(indexes))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ProjectIndex>, ApiError> {
    let name = params
        .get("name")
        .filter(|n| !n.is_empty())
        .cloned()
        .ok_or_else(|| ApiError::new("missing required query parameter 'name'"))?;

    let store = state.store.clone();
    let index = tokio::task::spawn_blocking(move || store.get(&name)).await??;
    Ok(Json(index))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    let query = params.get("query").cloned().unwrap_or_default();

    let store = state.store.clone();
    let results = tokio::task::spawn_blocking(move || store.search(&query)).await??;
    crate::debug_event!("http", "search", "{} results", results.len());
    Ok(Json(results))
}

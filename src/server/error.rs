use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// HTTP-layer error: a 500 with the error text as the body.
#[derive(Debug)]
pub struct ApiError(String);

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0).into_response()
    }
}

impl From<crate::indexer::IndexError> for ApiError {
    fn from(err: crate::indexer::IndexError) -> Self {
        Self(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self(err.to_string())
    }
}

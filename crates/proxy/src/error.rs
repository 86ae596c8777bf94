use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the proxy routes.  `Clone` so a single upstream
/// failure can be handed to every request waiting on the same scan.
#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("rate limited by upstream RPC")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_is_a_500_envelope() {
        for err in [
            ProxyError::Upstream("boom".into()),
            ProxyError::RateLimited,
            ProxyError::Internal("oops".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

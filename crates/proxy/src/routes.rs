use axum::{extract::State, routing::get, Json, Router};
use chrono::SecondsFormat;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::error::ProxyError;
use crate::state::AppState;

/// Assemble the proxy router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/holders", get(holders))
        .route("/api/health", get(backend_health))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /api/holders: cached unique-holder count.
pub async fn holders(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ProxyError> {
    let lookup = state.cache.get().await?;
    Ok(Json(json!({
        "success": true,
        "holders": lookup.count.tally.holders,
        "timestamp": lookup.count.fetched_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "cached": lookup.cached,
        "stale": lookup.stale,
    })))
}

/// GET /api/health: echo the backend's `/health` inside a status envelope.
pub async fn backend_health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ProxyError> {
    let url = format!("{}/health", state.config.backend_url.trim_end_matches('/'));
    debug!("Proxying health check to {url}");

    let resp = state
        .http
        .get(&url)
        .send()
        .await
        .map_err(|e| ProxyError::Upstream(format!("health check: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(ProxyError::Upstream(format!("backend health returned {status}")));
    }

    let backend: Value = resp
        .json()
        .await
        .map_err(|e| ProxyError::Upstream(format!("backend health body: {e}")))?;

    Ok(Json(json!({ "success": true, "backend": backend })))
}

/// GET /health: liveness of the proxy itself.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{tally, StubScanner};
    use crate::scanner::HolderScanner;
    use axum::{http::StatusCode, response::IntoResponse};
    use holdwatch_config::ProxyConfig;

    fn state(stub: StubScanner, backend_url: String) -> Arc<AppState> {
        let config = ProxyConfig {
            backend_url,
            ..ProxyConfig::default()
        };
        AppState::with_scanner(
            config,
            Arc::new(stub) as Arc<dyn HolderScanner>,
            reqwest::Client::new(),
        )
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn holders_envelope() {
        let st = state(StubScanner::new([tally(1_234)]), String::new());
        let Json(body) = holders(State(Arc::clone(&st))).await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["holders"], 1_234);
        assert_eq!(body["cached"], false);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));

        let Json(again) = holders(State(st)).await.unwrap();
        assert_eq!(again["cached"], true);
    }

    #[tokio::test]
    async fn holders_error_is_500_envelope() {
        let st = state(StubScanner::new([]), String::new());
        let resp = holders(State(st)).await.unwrap_err().into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_passthrough_echoes_backend() {
        let backend = Router::new().route(
            "/health",
            get(|| async { Json(json!({ "status": "healthy", "uptime": 12 })) }),
        );
        let url = serve(backend).await;

        let st = state(StubScanner::new([]), url);
        let Json(body) = backend_health(State(st)).await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["backend"]["status"], "healthy");
        assert_eq!(body["backend"]["uptime"], 12);
    }

    #[tokio::test]
    async fn health_passthrough_failure_is_500() {
        let backend = Router::new().route(
            "/health",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let url = serve(backend).await;

        let st = state(StubScanner::new([]), url);
        let resp = backend_health(State(st)).await.unwrap_err().into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn router_serves_holders_over_http() {
        let url = serve(router(state(StubScanner::new([tally(7)]), String::new()))).await;
        let body: Value = reqwest::get(format!("{url}/api/holders"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["holders"], 7);

        let live: Value = reqwest::get(format!("{url}/health")).await.unwrap().json().await.unwrap();
        assert_eq!(live["status"], "ok");
    }
}

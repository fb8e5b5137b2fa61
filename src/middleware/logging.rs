//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, and latency.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Middleware that logs HTTP requests with timing information.
///
/// 5xx at WARN. 401s at DEBUG, since the role gate already logs why it
/// rejected the request. Everything else at INFO. Health checks are not logged.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == "/health" {
        return next.run(request).await;
    }

    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Request failed (5xx)"
        );
    } else if status == StatusCode::UNAUTHORIZED {
        debug!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Request unauthenticated"
        );
    } else if status.is_client_error() {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Request completed (4xx)"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            "Request completed"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_passes_response_through() {
        let app = Router::new()
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(middleware::from_fn(request_logging));

        let response = app
            .oneshot(Request::builder().uri("/teapot").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_unauthorized_and_health_pass_through() {
        let app = Router::new()
            .route("/locked", get(|| async { StatusCode::UNAUTHORIZED }))
            .route("/health", get(|| async { "ok" }))
            .layer(middleware::from_fn(request_logging));

        let locked = app
            .clone()
            .oneshot(Request::builder().uri("/locked").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(locked.status(), StatusCode::UNAUTHORIZED);

        let health = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);
    }
}

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::{BoxError, ServiceBuilder};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::TrafficLensError;
use crate::api::{self, AppState};
use crate::config::TrafficLensConfig;
use crate::maps::{AzureMapsClient, MapsTransport};

/// Full application router, `/api` routes plus middleware
pub fn app(transport: Arc<dyn MapsTransport>, config: &TrafficLensConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let seconds = u64::from(config.server.request_timeout_seconds);

    Router::new()
        .nest("/api", api::router(AppState::new(transport, config)))
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    middleware_error(err, seconds)
                }))
                .layer(TimeoutLayer::new(Duration::from_secs(seconds))),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Errors raised by the middleware stack, rendered in the API's error envelope
fn middleware_error(err: BoxError, seconds: u64) -> Response {
    if err.is::<Elapsed>() {
        TrafficLensError::Timeout { seconds }.into_response()
    } else {
        TrafficLensError::from(std::io::Error::other(err)).into_response()
    }
}

pub async fn run(config: TrafficLensConfig) -> Result<()> {
    let transport: Arc<dyn MapsTransport> = Arc::new(AzureMapsClient::new(&config.maps)?);
    let app = app(transport, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!("Invalid listen address {}:{}", config.server.host, config.server.port)
        })?;

    if let (Some(cert), Some(key)) = (&config.server.tls_cert_path, &config.server.tls_key_path) {
        return serve_tls(app, addr, cert, key).await;
    }

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")
}

#[cfg(feature = "tls")]
async fn serve_tls(app: Router, addr: SocketAddr, cert: &str, key: &str) -> Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    // Another crate may already have installed a provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .with_context(|| format!("Failed to load TLS certificate {cert} / key {key}"))?;

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
    });

    tracing::info!("Web server running at https://{}", addr);
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await
        .context("TLS web server failed")
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(_app: Router, _addr: SocketAddr, _cert: &str, _key: &str) -> Result<()> {
    anyhow::bail!("TLS paths are configured but trafficlens was built without the `tls` feature")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::Value;

    #[tokio::test]
    async fn test_elapsed_timeout_becomes_504_envelope() {
        let response = middleware_error(Box::new(Elapsed::new()), 7);

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["kind"], "timeout");
        assert!(body["error"]["message"].as_str().unwrap().contains("7 seconds"));
    }

    #[tokio::test]
    async fn test_other_middleware_errors_are_500_envelope() {
        let response = middleware_error("broken layer".into(), 7);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["kind"], "io");
    }
}

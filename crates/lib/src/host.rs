//! Webhook host: serves the forwarder over HTTP (single port).
//!
//! `POST /` takes a platform event and answers with the completion; `GET /` is a health probe.

use crate::config::Config;
use crate::event::InboundEvent;
use crate::forwarder::RequestForwarder;
use crate::upstream::HttpUpstream;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the host (config and forwarder).
#[derive(Clone)]
pub struct HostState {
    pub config: Arc<Config>,
    pub forwarder: RequestForwarder,
}

/// Router with the health and webhook routes. Exposed so tests can serve it on their own listener.
pub fn router(state: HostState) -> Router {
    Router::new()
        .route("/", get(health_http).post(invoke_http))
        .with_state(state)
}

/// Run the host until SIGINT or SIGTERM, forwarding over HTTPS with reqwest.
pub async fn run_server(config: Config) -> Result<()> {
    let forwarder = RequestForwarder::new(config.forwarder.clone(), Arc::new(HttpUpstream::new()));
    let bind_addr = format!("{}:{}", config.server.bind.trim(), config.server.port);
    let state = HostState {
        config: Arc::new(config),
        forwarder,
    };
    log::info!(
        "serving application {} -> {}",
        state.config.forwarder.application_id,
        state.config.forwarder.upstream_url()
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("host listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("host server exited")?;
    log::info!("host stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining in-flight invocations");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<HostState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "applicationId": state.config.forwarder.application_id,
        "port": state.config.server.port,
    }))
}

/// POST / — one invocation. Completion success is 200 with the result; a completion error is 500;
/// an invocation fault is 502. Errors use the `{"errorMessage": ...}` body.
async fn invoke_http(
    State(state): State<HostState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let invocation = uuid::Uuid::new_v4();
    let event = match InboundEvent::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("invocation {}: malformed event: {}", invocation, e);
            return error_reply(StatusCode::BAD_REQUEST, format!("malformed event: {}", e));
        }
    };

    match state.forwarder.handle(&event).await {
        Ok(Ok(result)) => {
            log::debug!("invocation {}: completed", invocation);
            (StatusCode::OK, Json(result))
        }
        Ok(Err(e)) => {
            log::info!("invocation {}: completed with error: {}", invocation, e);
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(fault) => {
            log::error!("invocation {}: failed: {}", invocation, fault);
            error_reply(StatusCode::BAD_GATEWAY, fault.to_string())
        }
    }
}

fn error_reply(status: StatusCode, message: String) -> (StatusCode, Json<serde_json::Value>) {
    (status, Json(json!({ "errorMessage": message })))
}

//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router: a single fallback service feeding the scheduler
//! - Wire up middleware (request ID, tracing)
//! - Buffer request bodies up to the configured limit
//! - Bind server to listener and stop on the shutdown broadcast

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ListenerConfig;
use crate::http::request::into_core_request;
use crate::http::response::{into_http_response, payload_too_large};
use crate::lifecycle::Application;
use crate::scheduler::Scheduler;

/// State injected into the fallback handler.
#[derive(Clone)]
struct ServerState {
    scheduler: Scheduler,
    max_body_bytes: usize,
}

/// HTTP front for an [`Application`].
pub struct HttpServer {
    router: Router,
    config: ListenerConfig,
}

impl HttpServer {
    pub fn new(app: Arc<Application>, config: ListenerConfig) -> Self {
        let state = ServerState {
            scheduler: app.scheduler().clone(),
            max_body_bytes: config.max_body_bytes,
        };
        Self {
            router: Self::build_router(state),
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: ServerState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The router, for serving elsewhere or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until shutdown fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(state): State<ServerState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = state.max_body_bytes,
                error = %e,
                "Request body rejected"
            );
            return payload_too_large();
        }
    };

    let response = state.scheduler.handle(into_core_request(&parts, body)).await;
    into_http_response(response)
}

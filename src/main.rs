//! dispatch-core demo server
//!
//! Serves a small built-in controller through the full pipeline so the core can
//! be exercised over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌───────────────────────────────────────────────────────────┐
//!                   │                      DISPATCH CORE                         │
//!   Client Request  │  ┌─────────┐   ┌───────────┐   ┌──────────────────────┐  │
//!   ────────────────┼─▶│  http   │──▶│ scheduler │──▶│ chain                │  │
//!                   │  │ adapter │   │ task/cont │   │  path_guard          │  │
//!                   │  └─────────┘   └─────┬─────┘   │  user middleware     │  │
//!                   │                      │         │  rate_limit ─ buckets│  │
//!                   │             session read lock  │  interceptors        │  │
//!                   │                      │         │  routing ─ route tbl │  │
//!   Client Response │  ┌─────────┐         │         └──────────┬───────────┘  │
//!   ◀───────────────┼──│response │◀────────┴────────────────────┘              │
//!                   │  └─────────┘                                              │
//!                   │  ┌─────────────────────────────────────────────────────┐  │
//!                   │  │ config · observability · lifecycle · sentinel sweep │  │
//!                   │  └─────────────────────────────────────────────────────┘  │
//!                   └───────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use dispatch_core::config::{load_config, AppConfig};
use dispatch_core::lifecycle::{shutdown_signal, AppBuilder, Shutdown};
use dispatch_core::observability::{logging, metrics};
use dispatch_core::pipeline::{Reply, RequestContext, Response};
use dispatch_core::routing::{Controller, Handler, RouteTableBuilder};
use dispatch_core::session::Session;
use dispatch_core::{BuildError, HttpServer};

#[derive(Parser)]
#[command(name = "dispatch-core")]
#[command(about = "HTTP request-processing core demo server", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

/// Built-in endpoints.
struct SystemController {
    session_ttl: Duration,
}

impl SystemController {
    fn status(&self, _ctx: &mut RequestContext) -> Reply {
        Reply::Json(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "status": "operational",
        }))
    }

    fn echo(&self, ctx: &mut RequestContext) -> Reply {
        Reply::Json(json!({
            "path": ctx.param("rest").unwrap_or_default(),
            "query": ctx.request().query(),
            "request_id": ctx.request_id(),
        }))
    }

    fn new_session(&self, ctx: &mut RequestContext) -> Response {
        let Some(store) = ctx.sessions() else {
            return Response::empty(404);
        };
        let session = Session::new(self.session_ttl);
        let id = session.id().to_string();
        store.put(session);
        let mut response = Response::json(&json!({ "session": id }));
        response.status = 201;
        response
    }
}

impl Controller for SystemController {
    fn routes(self: Arc<Self>, table: &mut RouteTableBuilder) -> Result<(), BuildError> {
        table
            .get("/status", Handler::bound(&self, SystemController::status))?
            .get("/echo/{*rest}", Handler::bound(&self, SystemController::echo))?
            .post("/sessions", Handler::bound(&self, SystemController::new_session))?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dispatch-core starting");

    // Initialize metrics server
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Assemble the application
    let mut builder = AppBuilder::from_config(&config)?;
    builder.controller(Arc::new(SystemController {
        session_ttl: config.session.max_inactive(),
    }))?;
    let app = Arc::new(builder.build());

    let shutdown = Shutdown::new();
    let sentinel = app.spawn_sentinel(shutdown.subscribe());

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(Arc::clone(&app), config.listener.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    if let Some(sentinel) = sentinel {
        let _ = sentinel.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

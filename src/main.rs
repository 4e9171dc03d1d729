//! Cellquest · stand-in gamification engine
//!
//! - Axum HTTP API mirroring the engine's SubmitCode / player-status endpoints
//! - Level progression per (game, player), graded by exact structural match
//!
//! Important env variables:
//!   PORT                 : u16 (default 3000)
//!   EXERCISE_CONFIG_PATH : path to TOML exercise (target class + levels); Triangle otherwise
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use cellquest::{build_router, telemetry, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Exercise + per-player engines.
  let state = Arc::new(AppState::new());
  info!(target: "cellquest", target_class = %state.target_class, levels = state.table.len(), "Exercise loaded");

  let app = build_router(state);

  let addr = listen_addr(std::env::var("PORT").ok().as_deref());
  let listener = TcpListener::bind(addr).await?;
  info!(target: "cellquest", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if tokio::signal::ctrl_c().await.is_ok() {
        info!(target: "cellquest", "Ctrl-C received, draining connections");
      }
    })
    .await?;
  Ok(())
}

/// All interfaces on `PORT`, or 3000 when unset or unparsable.
fn listen_addr(port: Option<&str>) -> SocketAddr {
  let port = port.and_then(|p| p.trim().parse::<u16>().ok()).unwrap_or(3000);
  SocketAddr::from(([0, 0, 0, 0], port))
}

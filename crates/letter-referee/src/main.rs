//! Letter Referee Service
//!
//! HTTP service hosting game rooms: lobby, turns, pending responses,
//! public event log, private inboxes and the leaderboard. A watchdog
//! sweeps response and turn deadlines.

mod handlers;
mod models;

use axum::{
    routing::{get, post},
    Router,
};
use letter_core::{EngineConfig, RoomRegistry};
use letter_ledger::{Ledger, MockLedger, RpcLedger};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use handlers::*;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_WATCHDOG_MS: u64 = 1_000;
const DEFAULT_MOCK_BALANCE: u64 = 10_000;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Build the API; `/api/system/tick` is mounted only with `sim_clock`
fn create_router(state: AppState, sim_clock: bool) -> Router {
    let router = Router::new()
        // Rooms
        .route("/api/rooms", post(create_room))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/:id", get(get_room))
        .route("/api/rooms/:id/join", post(join_room))
        .route("/api/rooms/:id/leave", post(leave_room))
        .route("/api/rooms/:id/start", post(start_match))
        // Turns
        .route("/api/rooms/:id/play", post(play_card))
        .route("/api/rooms/:id/respond", post(respond))
        .route("/api/rooms/:id/expire", post(expire_room))
        // Event surfaces
        .route("/api/rooms/:id/events", get(get_events))
        .route("/api/rooms/:id/inbox", get(get_inbox))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/health", get(health));

    let router = if sim_clock {
        router.route("/api/system/tick", post(tick))
    } else {
        router
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically forfeit overdue responses and idle turns
fn spawn_watchdog(registry: AppState, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let changed = registry.expire_all().await;
            if changed > 0 {
                info!("Watchdog expired deadlines in {} rooms", changed);
            }
        }
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!("Ignoring invalid engine configuration: {}", e);
            EngineConfig::default()
        }
    };

    let ledger: Arc<dyn Ledger> = if let Ok(url) = std::env::var("LEDGER_RPC_URL") {
        info!("Ledger RPC enabled: {}", url);
        Arc::new(RpcLedger::new(url))
    } else {
        let balance = env_or("MOCK_LEDGER_BALANCE", DEFAULT_MOCK_BALANCE);
        info!(
            "Ledger RPC not configured (set LEDGER_RPC_URL to enable), mock balance {}",
            balance
        );
        Arc::new(MockLedger::new(balance))
    };

    let registry = Arc::new(RoomRegistry::new(config, ledger));
    let watchdog_ms = env_or("WATCHDOG_INTERVAL_MS", DEFAULT_WATCHDOG_MS);
    spawn_watchdog(registry.clone(), Duration::from_millis(watchdog_ms));

    let sim_clock = env_or("LETTER_ENABLE_SIM_CLOCK", false);
    if sim_clock {
        warn!("Simulated clock enabled: POST /api/system/tick advances every deadline");
    }
    let app = create_router(registry, sim_clock);

    let port: u16 = env_or("PORT", DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Referee starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// HTTP API: health, user-triggered status queries, metrics.
//
// Status queries run the identical reconciler as the background poll
// worker, so they inherit its latency profile (worst case, the sum of
// the prober timeouts). Prober failure text stays in the logs; it is
// never part of a response.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use crate::metrics;
use crate::reconcile::{ReconciliationOutcome, Reconciler};
use crate::status::StatusSource;

/// Presentation default when no source supplied a MOTD.
pub const UNKNOWN_MOTD: &str = "Unknown MOTD";

#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/players", get(get_players))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub online: bool,
    pub status: &'static str,
    pub motd: String,
    pub players: Vec<String>,
    pub player_count: u32,
    pub player_max: Option<u32>,
    pub source: StatusSource,
    /// Wall-clock uptime derived from the provider-reported start time,
    /// when the answering source carried one.
    pub uptime: Option<String>,
}

impl StatusResponse {
    fn from_outcome(outcome: ReconciliationOutcome) -> Self {
        let status = outcome.status;
        let uptime = if status.online {
            status.time_started.as_deref().and_then(format_uptime)
        } else {
            None
        };
        Self {
            online: status.online,
            status: if status.online { "Online" } else { "Offline" },
            motd: status.motd.unwrap_or_else(|| UNKNOWN_MOTD.to_string()),
            player_count: status.player_names.len() as u32,
            players: status.player_names,
            player_max: status.player_max,
            source: outcome.source,
            uptime,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub online: bool,
    pub players: Vec<String>,
    pub motd: String,
    pub source: StatusSource,
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "termite-watch" }))
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/status", "200"])
        .inc();
    let outcome = state.reconciler.reconcile().await;
    Json(StatusResponse::from_outcome(outcome))
}

async fn get_players(State(state): State<AppState>) -> Json<PlayersResponse> {
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&["GET", "/api/players", "200"])
        .inc();
    let outcome = state.reconciler.reconcile().await;
    let status = outcome.status;
    Json(PlayersResponse {
        online: status.online,
        players: status.player_names,
        motd: status.motd.unwrap_or_else(|| UNKNOWN_MOTD.to_string()),
        source: outcome.source,
    })
}

async fn get_metrics() -> String {
    metrics::gather_metrics()
}

/// Render "Xh Ym" since an RFC 3339 start time.
fn format_uptime(time_started: &str) -> Option<String> {
    let started = chrono::DateTime::parse_from_rfc3339(time_started)
        .ok()?
        .with_timezone(&chrono::Utc);
    uptime_between(started, chrono::Utc::now())
}

fn uptime_between(
    started: chrono::DateTime<chrono::Utc>,
    now: chrono::DateTime<chrono::Utc>,
) -> Option<String> {
    let elapsed = now.signed_duration_since(started);
    if elapsed < chrono::TimeDelta::zero() {
        return None;
    }
    let hours = elapsed.num_hours();
    let minutes = elapsed.num_minutes() % 60;
    Some(format!("{hours}h {minutes}m"))
}

// Edge-triggered online/offline change detection.
//
// Repeated polls while the server stays in one state must never
// re-notify; the notifier fires exactly once per transition.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::metrics;
use crate::status::ServerStatus;

/// Direction of a detected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    CameOnline,
    WentOffline,
}

impl Transition {
    /// Metric label for the transition direction.
    pub fn label(&self) -> &'static str {
        match self {
            Transition::CameOnline => "online",
            Transition::WentOffline => "offline",
        }
    }
}

/// Plain-data notification handed to the dispatch sink. Formatting and
/// channel routing are the sink's problem.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub transition: Transition,
    pub status: ServerStatus,
}

/// Error returned by a notification sink.
#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct DispatchError(pub String);

/// Downstream delivery seam.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<(), DispatchError>;
}

/// Last-known status. In-memory only: a restart resets it to offline,
/// which costs one redundant notification on the first poll afterwards.
#[derive(Debug, Clone, Copy)]
struct NotifierState {
    last_known_online: bool,
}

/// Compares each reconciled status against the last known one and fires
/// at most one notification per transition. The state lives behind a
/// mutex so overlapping poll cycles cannot lose an update.
pub struct ChangeNotifier {
    sink: Arc<dyn NotificationSink>,
    state: Mutex<NotifierState>,
}

impl ChangeNotifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(NotifierState {
                last_known_online: false,
            }),
        }
    }

    /// Observe a freshly reconciled status.
    ///
    /// The state transition is committed before delivery is attempted,
    /// so a failing sink cannot re-trigger the same edge on the next
    /// poll. Returns the transition when one fired.
    pub async fn observe(&self, status: &ServerStatus) -> Option<Transition> {
        let transition = {
            let mut state = self.state.lock().await;
            let transition = match (state.last_known_online, status.online) {
                (false, true) => Transition::CameOnline,
                (true, false) => Transition::WentOffline,
                _ => return None,
            };
            state.last_known_online = status.online;
            transition
        };

        metrics::STATUS_TRANSITIONS_TOTAL
            .with_label_values(&[transition.label()])
            .inc();
        metrics::LAST_KNOWN_ONLINE.set(i64::from(status.online));
        tracing::info!(
            transition = transition.label(),
            source = %status.source,
            players = status.player_names.len(),
            "server status transition"
        );

        let notification = Notification {
            transition,
            status: status.clone(),
        };
        if let Err(e) = self.sink.deliver(&notification).await {
            metrics::NOTIFICATIONS_FAILED_TOTAL.inc();
            tracing::warn!("{e}");
        }

        Some(transition)
    }

    /// Current last-known flag, for diagnostics and tests.
    pub async fn last_known_online(&self) -> bool {
        self.state.lock().await.last_known_online
    }
}

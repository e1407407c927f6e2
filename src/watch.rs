// Background poll worker: reconcile, then feed the notifier, forever.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::metrics;
use crate::notify::ChangeNotifier;
use crate::reconcile::Reconciler;

/// Spawn the background task that polls server status at a fixed
/// interval. The first cycle runs immediately, so a restart while the
/// server is online re-announces once.
pub fn spawn_status_worker(
    reconciler: Arc<Reconciler>,
    notifier: Arc<ChangeNotifier>,
    interval: Duration,
) {
    tokio::spawn(async move {
        loop {
            run_cycle(&reconciler, &notifier).await;
            tokio::time::sleep(interval).await;
        }
    });
}

/// One reconcile-and-notify cycle.
pub async fn run_cycle(reconciler: &Reconciler, notifier: &ChangeNotifier) {
    let started = Instant::now();
    let outcome = reconciler.reconcile().await;

    metrics::RECONCILE_CYCLES_TOTAL.inc();
    metrics::RECONCILE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
    metrics::CURRENT_PLAYERS.set(i64::from(outcome.status.effective_player_count()));

    tracing::info!(
        online = outcome.status.online,
        source = %outcome.source,
        players = outcome.status.effective_player_count(),
        failed_probers = outcome.diagnostics.len(),
        "poll cycle reconciled"
    );

    notifier.observe(&outcome.status).await;
}

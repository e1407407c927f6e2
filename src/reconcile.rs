// Priority-ordered status reconciliation across the configured probers.

use std::time::Instant;

use crate::metrics;
use crate::probe::{ProbeOutcome, Prober};
use crate::status::{ServerStatus, StatusSource};

/// Diagnostic left behind by a prober that did not supply the answer.
/// Logged and exported, never shown to end users.
#[derive(Debug, Clone)]
pub struct ProbeDiagnostic {
    pub prober: &'static str,
    pub reason: String,
}

/// Result of one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct ReconciliationOutcome {
    pub status: ServerStatus,
    /// Duplicated from `status.source` so callers logging the outcome
    /// do not have to reach into the status.
    pub source: StatusSource,
    pub diagnostics: Vec<ProbeDiagnostic>,
}

/// Tries probers in strict priority order, short-circuiting on the
/// first usable result. Holds no mutable state; safe to share between
/// the background poll worker and user-triggered queries.
pub struct Reconciler {
    probers: Vec<Box<dyn Prober>>,
}

impl Reconciler {
    /// Build a reconciler over probers in descending priority order.
    pub fn new(probers: Vec<Box<dyn Prober>>) -> Self {
        Self { probers }
    }

    /// Run one reconciliation cycle.
    ///
    /// Probers run sequentially, never concurrently; a usable result
    /// stops the chain so cheaper sources shield the expensive ones.
    /// When every prober comes up empty the answer is offline from an
    /// unknown source, which is a valid terminal state rather than an
    /// error.
    pub async fn reconcile(&self) -> ReconciliationOutcome {
        let mut diagnostics = Vec::new();

        for prober in &self.probers {
            metrics::PROBE_ATTEMPTS_TOTAL
                .with_label_values(&[prober.name()])
                .inc();
            let started = Instant::now();
            let outcome = prober.probe().await;
            metrics::PROBE_DURATION_SECONDS
                .with_label_values(&[prober.name()])
                .observe(started.elapsed().as_secs_f64());

            match outcome {
                ProbeOutcome::Usable(status) => {
                    tracing::debug!(
                        prober = prober.name(),
                        online = status.online,
                        players = status.player_names.len(),
                        "prober returned usable status"
                    );
                    let source = status.source;
                    return ReconciliationOutcome {
                        status,
                        source,
                        diagnostics,
                    };
                }
                ProbeOutcome::Unusable(reason) => {
                    metrics::PROBE_FAILURES_TOTAL
                        .with_label_values(&[prober.name()])
                        .inc();
                    tracing::debug!(prober = prober.name(), %reason, "no usable result");
                    diagnostics.push(ProbeDiagnostic {
                        prober: prober.name(),
                        reason,
                    });
                }
            }
        }

        ReconciliationOutcome {
            status: ServerStatus::offline(StatusSource::Unknown),
            source: StatusSource::Unknown,
            diagnostics,
        }
    }
}

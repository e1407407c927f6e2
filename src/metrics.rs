// Prometheus metrics definitions for the termite-watch service.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Last reconciled online flag (1 online, 0 offline).
    pub static ref LAST_KNOWN_ONLINE: IntGauge =
        IntGauge::new("termite_last_known_online", "Last reconciled online flag").unwrap();

    /// Player count from the most recent poll cycle.
    pub static ref CURRENT_PLAYERS: IntGauge =
        IntGauge::new("termite_current_players", "Players seen in the last poll").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Prober attempts, by source (ping, api, console).
    pub static ref PROBE_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("termite_probe_attempts_total", "Prober attempts"),
        &["source"],
    )
    .unwrap();

    /// Prober attempts that produced no usable result, by source.
    pub static ref PROBE_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("termite_probe_failures_total", "Prober attempts with no usable result"),
        &["source"],
    )
    .unwrap();

    /// Completed reconciliation cycles (background and user-triggered).
    pub static ref RECONCILE_CYCLES_TOTAL: IntCounter = IntCounter::new(
        "termite_reconcile_cycles_total",
        "Completed reconciliation cycles",
    )
    .unwrap();

    /// Status transitions fired, by direction (online, offline).
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("termite_status_transitions_total", "Status transitions fired"),
        &["direction"],
    )
    .unwrap();

    /// Notifications that failed to deliver.
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounter = IntCounter::new(
        "termite_notifications_failed_total",
        "Notifications that failed to deliver",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("termite_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Per-prober attempt duration in seconds, by source.
    pub static ref PROBE_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("termite_probe_duration_seconds", "Prober attempt duration")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 3.0, 10.0, 30.0]),
        &["source"],
    )
    .unwrap();

    /// Full reconciliation cycle duration in seconds. The worst case is
    /// the sum of all three prober timeouts.
    pub static ref RECONCILE_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "termite_reconcile_duration_seconds",
            "Reconciliation cycle duration",
        )
        .buckets(vec![0.05, 0.25, 1.0, 3.0, 5.0, 13.0, 30.0, 45.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(LAST_KNOWN_ONLINE.clone()),
        Box::new(CURRENT_PLAYERS.clone()),
        Box::new(PROBE_ATTEMPTS_TOTAL.clone()),
        Box::new(PROBE_FAILURES_TOTAL.clone()),
        Box::new(RECONCILE_CYCLES_TOTAL.clone()),
        Box::new(STATUS_TRANSITIONS_TOTAL.clone()),
        Box::new(NOTIFICATIONS_FAILED_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(PROBE_DURATION_SECONDS.clone()),
        Box::new(RECONCILE_DURATION_SECONDS.clone()),
    ];

    for c in collectors {
        REGISTRY.register(c).expect("failed to register metric");
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

use std::sync::Arc;

use tower_http::cors::CorsLayer;

use termite_watch::api::{self, AppState};
use termite_watch::config::Config;
use termite_watch::dispatch::{LogSink, WebhookSink};
use termite_watch::metrics;
use termite_watch::notify::{ChangeNotifier, NotificationSink};
use termite_watch::probe::api::ApiProber;
use termite_watch::probe::console::ConsoleProber;
use termite_watch::probe::ping::PingProber;
use termite_watch::probe::Prober;
use termite_watch::reconcile::Reconciler;
use termite_watch::watch;

/// Probers in descending priority order: direct ping, provider API,
/// console scrape.
fn build_probers(config: &Config) -> Vec<Box<dyn Prober>> {
    let ping = PingProber::new(
        config.server_host.clone(),
        config.server_port,
        config.ping_timeout,
    );
    let api = ApiProber::new(
        config.api_base_url.clone(),
        config.api_server_id.clone(),
        config.api_token.clone(),
        config.api_timeout,
    )
    .expect("failed to build provider API client");
    let console = ConsoleProber::new(
        config.webdriver_url.clone(),
        config.console_url.clone(),
        config.console_timeout,
    );
    vec![Box::new(ping), Box::new(api), Box::new(console)]
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    if config.api_token.is_empty() {
        tracing::warn!("EXAROTON_TOKEN is empty; the provider API prober will not authenticate");
    }
    if config.webdriver_url.is_none() {
        tracing::info!("WEBDRIVER_URL not set; console scrape fallback disabled");
    }

    let reconciler = Arc::new(Reconciler::new(build_probers(&config)));

    let sink: Arc<dyn NotificationSink> = match &config.webhook_url {
        Some(url) => {
            Arc::new(WebhookSink::new(url.clone()).expect("failed to build webhook client"))
        }
        None => Arc::new(LogSink),
    };
    let notifier = Arc::new(ChangeNotifier::new(sink));

    watch::spawn_status_worker(reconciler.clone(), notifier, config.check_interval);

    let app = api::router(AppState { reconciler }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("Failed to bind HTTP port");

    tracing::info!(
        server = %config.server_host,
        port = config.port,
        interval_secs = config.check_interval.as_secs(),
        "termite-watch listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

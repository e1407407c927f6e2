// Tertiary prober: headless-browser scrape of the provider's web
// console. Slowest and least reliable source; the reconciler only
// reaches it when both the ping and the API came up empty.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::{ClientBuilder, Locator};

use crate::probe::{ProbeOutcome, Prober};
use crate::status::{ServerStatus, StatusSource};

/// Status badge on the server console page.
const STATUS_SELECTOR: &str = ".server-status";
/// One entry per online player.
const PLAYER_SELECTOR: &str = ".player-list .player-name";
/// Server message of the day.
const MOTD_SELECTOR: &str = ".server-motd";

#[derive(Debug, thiserror::Error)]
enum ConsoleError {
    #[error("webdriver session: {0}")]
    Session(String),
    #[error("console page: {0}")]
    Page(String),
}

/// Everything the console page yields before normalization.
#[derive(Debug)]
struct ScrapedConsole {
    status_text: String,
    players: Vec<String>,
    motd: Option<String>,
}

/// Web console scrape via a WebDriver endpoint. Reports unusable on
/// every attempt when no endpoint is configured.
pub struct ConsoleProber {
    webdriver_url: Option<String>,
    console_url: String,
    timeout: Duration,
}

impl ConsoleProber {
    pub fn new(
        webdriver_url: Option<String>,
        console_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            webdriver_url,
            console_url: console_url.into(),
            timeout,
        }
    }

    async fn scrape(&self, webdriver_url: &str) -> Result<ScrapedConsole, ConsoleError> {
        let mut client = ClientBuilder::rustls()
            .map_err(|e| ConsoleError::Session(e.to_string()))?
            .connect(webdriver_url)
            .await
            .map_err(|e| ConsoleError::Session(e.to_string()))?;

        let scraped = extract(&mut client, &self.console_url).await;
        if let Err(e) = client.close().await {
            tracing::debug!("webdriver close failed: {e}");
        }
        scraped
    }
}

async fn extract(
    client: &mut fantoccini::Client,
    console_url: &str,
) -> Result<ScrapedConsole, ConsoleError> {
    client
        .goto(console_url)
        .await
        .map_err(|e| ConsoleError::Page(e.to_string()))?;

    // The console renders client-side; wait for the status badge before
    // reading anything else.
    let mut status_el = client
        .wait()
        .for_element(Locator::Css(STATUS_SELECTOR))
        .await
        .map_err(|e| ConsoleError::Page(e.to_string()))?;
    let status_text = status_el
        .text()
        .await
        .map_err(|e| ConsoleError::Page(e.to_string()))?;

    let mut players = Vec::new();
    let elements = client
        .find_all(Locator::Css(PLAYER_SELECTOR))
        .await
        .map_err(|e| ConsoleError::Page(e.to_string()))?;
    for mut element in elements {
        let name = element
            .text()
            .await
            .map_err(|e| ConsoleError::Page(e.to_string()))?;
        let name = name.trim().to_string();
        if !name.is_empty() {
            players.push(name);
        }
    }

    let motd = match client.find(Locator::Css(MOTD_SELECTOR)).await {
        Ok(mut element) => element
            .text()
            .await
            .ok()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        Err(_) => None,
    };

    Ok(ScrapedConsole {
        status_text,
        players,
        motd,
    })
}

/// Same usable rule as the API prober: explicit "online" in the status
/// text, or any player present.
fn normalize(scraped: ScrapedConsole) -> ProbeOutcome {
    let online = scraped.status_text.to_lowercase().contains("online");
    if online || !scraped.players.is_empty() {
        ProbeOutcome::Usable(ServerStatus::online(
            StatusSource::Tertiary,
            scraped.players,
            None,
            None,
            scraped.motd,
        ))
    } else {
        ProbeOutcome::unusable(format!(
            "console reported '{}' with no players",
            scraped.status_text
        ))
    }
}

#[async_trait]
impl Prober for ConsoleProber {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn probe(&self) -> ProbeOutcome {
        let webdriver_url = match &self.webdriver_url {
            Some(url) => url.clone(),
            None => return ProbeOutcome::unusable("console prober not configured"),
        };

        // One hard ceiling over session setup, page load, and extraction
        // so a stuck browser cannot wedge a poll cycle.
        match tokio::time::timeout(self.timeout, self.scrape(&webdriver_url)).await {
            Ok(Ok(scraped)) => normalize(scraped),
            Ok(Err(e)) => ProbeOutcome::unusable(format!("console scrape failed: {e}")),
            Err(_) => ProbeOutcome::unusable(format!(
                "console scrape timed out after {:?}",
                self.timeout
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_prober_is_unusable() {
        let prober = ConsoleProber::new(None, "https://example.org/server", Duration::from_secs(5));
        match prober.probe().await {
            ProbeOutcome::Unusable(reason) => {
                assert!(reason.contains("not configured"))
            }
            ProbeOutcome::Usable(_) => unreachable!("unconfigured prober must be unusable"),
        }
    }

    #[test]
    fn test_normalize_online_status_text() {
        let outcome = normalize(ScrapedConsole {
            status_text: "Online".into(),
            players: vec![],
            motd: Some("Termite SMP".into()),
        });
        match outcome {
            ProbeOutcome::Usable(status) => {
                assert!(status.online);
                assert_eq!(status.source, StatusSource::Tertiary);
                assert_eq!(status.motd.as_deref(), Some("Termite SMP"));
            }
            ProbeOutcome::Unusable(_) => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_players_override_offline_text() {
        let outcome = normalize(ScrapedConsole {
            status_text: "Stopping".into(),
            players: vec!["Steve".into()],
            motd: None,
        });
        match outcome {
            ProbeOutcome::Usable(status) => {
                assert!(status.online);
                assert_eq!(status.player_names, vec!["Steve"]);
            }
            ProbeOutcome::Unusable(_) => unreachable!(),
        }
    }

    #[test]
    fn test_normalize_offline_without_players_is_unusable() {
        let outcome = normalize(ScrapedConsole {
            status_text: "Offline".into(),
            players: vec![],
            motd: None,
        });
        assert!(!outcome.is_usable());
    }
}

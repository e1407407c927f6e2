// Secondary prober: the hosting provider's REST status endpoint.
//
// One bearer-authenticated GET per attempt. The response is parsed into
// a partial schema where every field is optional; missing or null keys
// take the named defaults below instead of failing the call.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::probe::{ProbeOutcome, Prober};
use crate::status::{ServerStatus, StatusSource};

/// Default when `host.online` is absent: assume not online and let the
/// usable-result rule decide.
const DEFAULT_ONLINE: bool = false;

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

// Partial schema for `GET /servers/{id}`. Every field is optional; the
// provider omits or nulls most of them while a server sleeps.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiServer {
    host: Option<ApiHost>,
    players: Option<ApiPlayers>,
    motd: Option<ApiMotd>,
    #[serde(rename = "timeStarted")]
    time_started: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiHost {
    online: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiPlayers {
    count: Option<u32>,
    max: Option<u32>,
    list: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiMotd {
    clean: Option<Vec<String>>,
}

/// Provider REST API prober.
pub struct ApiProber {
    client: reqwest::Client,
    base_url: String,
    server_id: String,
    token: String,
    timeout: Duration,
}

impl ApiProber {
    pub fn new(
        base_url: impl Into<String>,
        server_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            server_id: server_id.into(),
            token: token.into(),
            timeout,
        })
    }

    async fn fetch(&self) -> Result<ApiServer, ApiError> {
        let url = format!(
            "{}/servers/{}",
            self.base_url.trim_end_matches('/'),
            self.server_id
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(self.timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Prober for ApiProber {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn probe(&self) -> ProbeOutcome {
        let server = match self.fetch().await {
            Ok(server) => server,
            Err(e) => return ProbeOutcome::unusable(format!("api failed: {e}")),
        };

        let online = server
            .host
            .as_ref()
            .and_then(|h| h.online)
            .unwrap_or(DEFAULT_ONLINE);
        let players = server.players.unwrap_or_default();
        let names = players.list.unwrap_or_default();
        let motd = server
            .motd
            .and_then(|m| m.clean)
            .and_then(|clean| clean.into_iter().next())
            .filter(|line| !line.trim().is_empty());

        // A non-empty player list proves the server is up even when the
        // online flag lags behind.
        if online || !names.is_empty() {
            ProbeOutcome::Usable(
                ServerStatus::online(
                    StatusSource::Secondary,
                    names,
                    players.count,
                    players.max,
                    motd,
                )
                .with_time_started(server.time_started),
            )
        } else {
            ProbeOutcome::unusable("api returned no usable signal")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_tolerates_empty_body() {
        let server: ApiServer = serde_json::from_str("{}").unwrap();
        assert!(server.host.is_none());
        assert!(server.players.is_none());
        assert!(server.motd.is_none());
        assert!(server.time_started.is_none());
    }

    #[test]
    fn test_schema_tolerates_nulls() {
        let server: ApiServer = serde_json::from_str(
            r#"{"host":{"online":null},"players":{"count":null,"max":null,"list":null},"motd":{"clean":null},"timeStarted":null}"#,
        )
        .unwrap();
        assert_eq!(server.host.unwrap().online, None);
        let players = server.players.unwrap();
        assert_eq!(players.count, None);
        assert_eq!(players.list, None);
    }

    #[test]
    fn test_schema_full_body() {
        let server: ApiServer = serde_json::from_str(
            r#"{
                "host": {"online": true},
                "players": {"count": 2, "max": 20, "list": ["Alex", "Steve"]},
                "motd": {"clean": ["Termite SMP", ""]},
                "timeStarted": "2026-08-01T12:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(server.host.unwrap().online, Some(true));
        let players = server.players.unwrap();
        assert_eq!(players.list.unwrap(), vec!["Alex", "Steve"]);
        assert_eq!(server.motd.unwrap().clean.unwrap()[0], "Termite SMP");
        assert_eq!(server.time_started.as_deref(), Some("2026-08-01T12:00:00Z"));
    }
}

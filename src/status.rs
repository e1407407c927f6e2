// Normalized server status model shared by probers, reconciler, and API.

use serde::Serialize;

/// Which upstream source supplied a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// Direct Server List Ping against the game port.
    Primary,
    /// Hosting provider REST API.
    Secondary,
    /// Headless-browser scrape of the provider console.
    Tertiary,
    /// No prober produced a usable answer.
    Unknown,
}

impl StatusSource {
    /// Short name used in logs and metric labels.
    pub fn label(&self) -> &'static str {
        match self {
            StatusSource::Primary => "ping",
            StatusSource::Secondary => "api",
            StatusSource::Tertiary => "console",
            StatusSource::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for StatusSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One reconciled view of the game server, built fresh every poll cycle.
///
/// Invariant: an offline status never carries player data. The only
/// constructors are [`ServerStatus::online`] and [`ServerStatus::offline`],
/// which makes a violating value unrepresentable.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    pub online: bool,
    /// Player names in the order the source reported them. May be empty
    /// even when online (sources hide or truncate the sample).
    pub player_names: Vec<String>,
    pub player_count: Option<u32>,
    pub player_max: Option<u32>,
    pub motd: Option<String>,
    pub source: StatusSource,
    /// RFC 3339 start time as reported by the provider API, when known.
    pub time_started: Option<String>,
}

impl ServerStatus {
    /// An online status as reported by `source`.
    pub fn online(
        source: StatusSource,
        player_names: Vec<String>,
        player_count: Option<u32>,
        player_max: Option<u32>,
        motd: Option<String>,
    ) -> Self {
        Self {
            online: true,
            player_names,
            player_count,
            player_max,
            motd,
            source,
            time_started: None,
        }
    }

    /// An offline status attributed to `source`. Carries no player data.
    pub fn offline(source: StatusSource) -> Self {
        Self {
            online: false,
            player_names: Vec::new(),
            player_count: None,
            player_max: None,
            motd: None,
            source,
            time_started: None,
        }
    }

    /// Attach the provider-reported start time.
    pub fn with_time_started(mut self, time_started: Option<String>) -> Self {
        self.time_started = time_started;
        self
    }

    /// Player count, falling back to the sample length when the source
    /// did not report an explicit count.
    pub fn effective_player_count(&self) -> u32 {
        self.player_count
            .unwrap_or(self.player_names.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_carries_no_player_data() {
        let status = ServerStatus::offline(StatusSource::Unknown);
        assert!(!status.online);
        assert!(status.player_names.is_empty());
        assert_eq!(status.player_count, None);
        assert_eq!(status.effective_player_count(), 0);
    }

    #[test]
    fn test_online_keeps_reported_order() {
        let status = ServerStatus::online(
            StatusSource::Primary,
            vec!["Alex".into(), "Steve".into()],
            Some(2),
            Some(20),
            Some("A Minecraft Server".into()),
        );
        assert!(status.online);
        assert_eq!(status.player_names, vec!["Alex", "Steve"]);
        assert_eq!(status.player_max, Some(20));
    }

    #[test]
    fn test_effective_count_falls_back_to_sample() {
        let status = ServerStatus::online(
            StatusSource::Tertiary,
            vec!["Steve".into()],
            None,
            None,
            None,
        );
        assert_eq!(status.effective_player_count(), 1);
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let status = ServerStatus::offline(StatusSource::Unknown);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["source"], "unknown");
        assert_eq!(json["online"], false);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(StatusSource::Primary.label(), "ping");
        assert_eq!(StatusSource::Secondary.label(), "api");
        assert_eq!(StatusSource::Tertiary.label(), "console");
        assert_eq!(StatusSource::Unknown.to_string(), "unknown");
    }
}

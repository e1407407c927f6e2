// Application configuration, loaded from environment variables and CLI flags.

use std::time::Duration;

/// Default game port when `SERVER_ADDRESS` carries no explicit port.
pub const DEFAULT_GAME_PORT: u16 = 25565;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Game server hostname for the direct status ping.
    pub server_host: String,
    /// Game server port.
    pub server_port: u16,
    /// Provider API bearer token. An empty token leaves the API prober
    /// failing authentication, which the reconciler treats as unusable.
    pub api_token: String,
    /// Provider server id used in the REST path.
    pub api_server_id: String,
    /// Provider API base URL.
    pub api_base_url: String,
    /// Provider web console page for the scrape fallback.
    pub console_url: String,
    /// WebDriver endpoint; the console prober is disabled when unset.
    pub webdriver_url: Option<String>,
    /// Webhook for transition notifications; log-only when unset.
    pub webhook_url: Option<String>,
    /// Background poll interval.
    pub check_interval: Duration,
    /// Hard timeout for the direct status ping.
    pub ping_timeout: Duration,
    /// Timeout for the provider REST call.
    pub api_timeout: Duration,
    /// Hard ceiling over the whole console scrape session.
    pub console_timeout: Duration,
    /// Port to bind the HTTP server to.
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `SERVER_ADDRESS` - game server `host[:port]` (default:
    ///   `termite.exaroton.me`, port 25565)
    /// - `EXAROTON_TOKEN` - provider API bearer token
    /// - `EXAROTON_SERVER_ID` - provider server id
    /// - `EXAROTON_API_URL` - API base URL (default:
    ///   `https://api.exaroton.com/v1`)
    /// - `CONSOLE_URL` - console page to scrape (default derived from
    ///   the server id)
    /// - `WEBDRIVER_URL` - WebDriver endpoint for the console prober
    /// - `WEBHOOK_URL` - notification webhook
    /// - `CHECK_INTERVAL_SECS` - poll interval (default 10800)
    /// - `PING_TIMEOUT_SECS` - ping timeout (default 3)
    /// - `API_TIMEOUT_SECS` - REST timeout (default 10)
    /// - `CONSOLE_TIMEOUT_SECS` - scrape ceiling (default 30)
    /// - `PORT` - HTTP server port (default 3000)
    ///
    /// CLI flags:
    /// - `--port <PORT>` - override the HTTP port
    /// - `--interval <SECS>` - override the poll interval
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let address = std::env::var("SERVER_ADDRESS")
            .unwrap_or_else(|_| "termite.exaroton.me".to_string());
        let (server_host, server_port) = parse_server_address(&address);

        let api_token = std::env::var("EXAROTON_TOKEN").unwrap_or_default();
        let api_server_id = std::env::var("EXAROTON_SERVER_ID").unwrap_or_default();
        let api_base_url = std::env::var("EXAROTON_API_URL")
            .unwrap_or_else(|_| "https://api.exaroton.com/v1".to_string());

        let console_url = std::env::var("CONSOLE_URL")
            .unwrap_or_else(|_| format!("https://exaroton.com/servers/{api_server_id}"));
        let webdriver_url = std::env::var("WEBDRIVER_URL").ok().filter(|v| !v.is_empty());
        let webhook_url = std::env::var("WEBHOOK_URL").ok().filter(|v| !v.is_empty());

        // Interval: CLI flag --interval takes precedence, then env var,
        // then the default three-hour cadence.
        let check_interval = Self::parse_cli_value(&args, "--interval")
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| env_duration("CHECK_INTERVAL_SECS", 10800));

        let ping_timeout = env_duration("PING_TIMEOUT_SECS", 3);
        let api_timeout = env_duration("API_TIMEOUT_SECS", 10);
        let console_timeout = env_duration("CONSOLE_TIMEOUT_SECS", 30);

        let port = Self::parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        Config {
            server_host,
            server_port,
            api_token,
            api_server_id,
            api_base_url,
            console_url,
            webdriver_url,
            webhook_url,
            check_interval,
            ping_timeout,
            api_timeout,
            console_timeout,
            port,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

/// Split `host[:port]`, falling back to the default game port when the
/// port is missing or unparsable.
fn parse_server_address(address: &str) -> (String, u16) {
    match address.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (host.to_string(), port),
            Err(_) => (address.to_string(), DEFAULT_GAME_PORT),
        },
        None => (address.to_string(), DEFAULT_GAME_PORT),
    }
}

fn env_duration(name: &str, default_secs: u64) -> Duration {
    Duration::from_secs(
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_secs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_without_port() {
        let (host, port) = parse_server_address("termite.exaroton.me");
        assert_eq!(host, "termite.exaroton.me");
        assert_eq!(port, DEFAULT_GAME_PORT);
    }

    #[test]
    fn test_parse_address_with_port() {
        let (host, port) = parse_server_address("mc.example.org:25570");
        assert_eq!(host, "mc.example.org");
        assert_eq!(port, 25570);
    }

    #[test]
    fn test_parse_address_with_bad_port_keeps_whole_string() {
        let (host, port) = parse_server_address("weird:host");
        assert_eq!(host, "weird:host");
        assert_eq!(port, DEFAULT_GAME_PORT);
    }

    #[test]
    fn test_parse_cli_value() {
        let args: Vec<String> = ["termite-watch", "--port", "8080"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(Config::parse_cli_value(&args, "--port").as_deref(), Some("8080"));
        assert_eq!(Config::parse_cli_value(&args, "--interval"), None);
    }
}

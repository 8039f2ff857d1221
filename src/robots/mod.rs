//! Robots.txt handling module
//!
//! The politeness gate is loaded once per domain crawl. Any failure while
//! loading robots.txt degrades to a gate that allows everything.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Per-domain robots.txt gate
#[derive(Debug, Clone)]
pub struct PolitenessGate {
    robots: ParsedRobots,
    agent: String,
}

impl PolitenessGate {
    /// Creates a gate from parsed rules and the agent token to match against
    pub fn new(robots: ParsedRobots, agent: impl Into<String>) -> Self {
        Self {
            robots,
            agent: agent.into(),
        }
    }

    /// Creates a gate that allows every URL
    pub fn allow_all() -> Self {
        Self::new(ParsedRobots::allow_all(), "*")
    }

    /// Returns true if the URL may be fetched
    pub fn can_fetch(&self, url: &str) -> bool {
        self.robots.is_allowed(url, &self.agent)
    }

    /// Returns true if the gate enforces nothing
    pub fn is_permissive(&self) -> bool {
        self.robots.allows_all()
    }
}

/// Builds the robots.txt location for the host serving `base_url`
pub fn robots_url(base_url: &str) -> Option<String> {
    let parsed = Url::parse(base_url).ok()?;
    let host = parsed.host_str()?;
    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    Some(format!("{}://{}/robots.txt", parsed.scheme(), authority))
}

/// Fetches robots.txt for the host of `base_url` and builds its gate
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent and timeout
/// * `base_url` - Seed URL of the domain crawl
/// * `agent` - Robots.txt agent token (the configured crawler name)
///
/// # Returns
///
/// A gate enforcing the fetched rules. Non-2xx responses, network errors and
/// timeouts yield a permissive gate.
pub async fn load_gate(client: &Client, base_url: &str, agent: &str) -> PolitenessGate {
    let Some(location) = robots_url(base_url) else {
        warn!(url = %base_url, "Cannot derive robots.txt location, allowing all");
        return PolitenessGate::allow_all();
    };

    let response = match client.get(&location).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url = %location, error = %e, "robots.txt unavailable, allowing all");
            return PolitenessGate::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(url = %location, status = %response.status(), "No robots.txt, allowing all");
        return PolitenessGate::allow_all();
    }

    match response.text().await {
        Ok(body) => PolitenessGate::new(ParsedRobots::from_content(&body), agent),
        Err(e) => {
            warn!(url = %location, error = %e, "Failed to read robots.txt, allowing all");
            PolitenessGate::allow_all()
        }
    }
}

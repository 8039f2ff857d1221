//! Robots.txt rule matching on top of the robotstxt crate

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
///
/// Holds the raw file and matches on demand; the robotstxt matcher is cheap
/// to build and not `Send`, so it is never stored.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates rules from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: content.trim().is_empty(),
        }
    }

    /// Creates a permissive rule set
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns true if no rule can ever deny a URL
    pub fn allows_all(&self) -> bool {
        self.allow_all
    }

    /// Checks if a URL is allowed for the given agent token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    /// * `user_agent` - Agent token as matched against `User-agent:` lines
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}

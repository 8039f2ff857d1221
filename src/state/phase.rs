use std::fmt;

/// Phase of a single domain crawl
///
/// There is no failed phase: an unrecoverable error ends the crawl while it
/// is still in `LoadingState` or `Crawling` and is reported by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Engine constructed, nothing loaded yet
    Init,

    /// Prior visited/hash sets are being read from the state store
    LoadingState,

    /// Batch loop running
    Crawling,

    /// Frontier exhausted or page cap reached, completion recorded
    Complete,
}

impl CrawlPhase {
    /// Returns true if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_advance_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::Init, Self::LoadingState)
                | (Self::LoadingState, Self::Crawling)
                | (Self::Crawling, Self::Complete)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadingState => "loading_state",
            Self::Crawling => "crawling",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(CrawlPhase::Init.can_advance_to(CrawlPhase::LoadingState));
        assert!(CrawlPhase::LoadingState.can_advance_to(CrawlPhase::Crawling));
        assert!(CrawlPhase::Crawling.can_advance_to(CrawlPhase::Complete));
    }

    #[test]
    fn test_no_skips_or_reversals() {
        assert!(!CrawlPhase::Init.can_advance_to(CrawlPhase::Crawling));
        assert!(!CrawlPhase::Complete.can_advance_to(CrawlPhase::Crawling));
        assert!(!CrawlPhase::Crawling.can_advance_to(CrawlPhase::LoadingState));
    }

    #[test]
    fn test_only_complete_is_terminal() {
        assert!(CrawlPhase::Complete.is_terminal());
        assert!(!CrawlPhase::Crawling.is_terminal());
        assert_eq!(CrawlPhase::LoadingState.to_string(), "loading_state");
    }
}

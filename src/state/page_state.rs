/// Per-item state machine for the crawl loop
///
/// Every dequeued URL walks `Queued → RobotsChecked → Fetched → Converted`
/// and ends in exactly one of `Skipped`, `Saved` or `Failed`. Skips can
/// happen from any non-terminal state; failures from any state after the
/// robots.txt check.
use std::fmt;

/// Why an item was skipped. Skips are policy decisions, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// robots.txt disallows the path
    Robots,

    /// The fetch ended on a different origin than the crawl root
    CrossOriginRedirect,

    /// Converted content hashes to the value stored by the previous run
    Unchanged,

    /// A manifest entry points at another origin
    OffOrigin,

    /// The include/exclude globs rejected the URL
    Filtered,
}

impl SkipReason {
    /// Human-readable reason used in logs and the summary
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Robots => "robots.txt",
            Self::CrossOriginRedirect => "redirect to different domain",
            Self::Unchanged => "unchanged",
            Self::OffOrigin => "off-origin entry",
            Self::Filtered => "excluded by pattern",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the current state of a queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Item was dequeued and is about to be checked
    Queued,

    /// robots.txt allows the URL
    RobotsChecked,

    /// A response body was received
    Fetched,

    /// The body was converted to markdown
    Converted,

    // ===== Terminal States =====
    /// Not saved for a policy reason
    Skipped(SkipReason),

    /// Content and metadata were persisted
    Saved,

    /// Fetch failed permanently
    Failed,
}

impl PageState {
    /// Returns true if no further processing happens for the item
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::Saved | Self::Failed)
    }

    /// Returns true for the active (in-progress) states
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if the state allows moving to `next`
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        match (self, next) {
            (Queued, RobotsChecked) => true,
            (RobotsChecked, Fetched) => true,
            (Fetched, Converted) => true,
            (Converted, Saved) => true,
            (Queued | RobotsChecked | Fetched | Converted, Skipped(_)) => true,
            (RobotsChecked | Fetched | Converted, Failed) => true,
            _ => false,
        }
    }

    /// Moves to `next`, rejecting transitions the machine does not allow
    pub fn transition(self, next: PageState) -> Result<PageState, crate::CrawlError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(crate::CrawlError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::RobotsChecked => "robots_checked",
            Self::Fetched => "fetched",
            Self::Converted => "converted",
            Self::Skipped(_) => "skipped",
            Self::Saved => "saved",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({})", reason),
            other => f.write_str(other.label()),
        }
    }
}

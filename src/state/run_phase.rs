//! Run phase definitions for tracking a crawl from start to finish
//!
//! A run is one-shot: it starts `Idle`, walks through discovery and the
//! per-category paging/enriching loop, and ends in `Done` or `Failed`.

use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    // ===== Start State =====
    /// Coordinator built, nothing fetched yet
    Idle,

    // ===== Active States =====
    /// Fetching the root page and reading its category widget
    Discovering,

    /// Walking the listing pages of a category
    Paging,

    /// Fetching detail pages for the stubs of the current listing page
    Enriching,

    /// Building the combined result and writing it out
    Aggregating,

    // ===== Terminal States =====
    /// Run completed (possibly with skipped pages or a cancellation)
    Done,

    /// Root page could not be fetched or the combined result not written
    Failed,
}

impl RunPhase {
    /// Returns true if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true while the run is working
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Discovering | Self::Paging | Self::Enriching | Self::Aggregating
        )
    }

    /// Returns true if the run may move from this phase to `next`
    ///
    /// `Paging -> Paging` is the move from one category to the next when the
    /// previous category ended on a page without products.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;

        matches!(
            (*self, next),
            (Idle, Discovering)
                | (Discovering, Paging)
                | (Discovering, Aggregating)
                | (Discovering, Failed)
                | (Paging, Enriching)
                | (Paging, Paging)
                | (Paging, Aggregating)
                | (Enriching, Paging)
                | (Enriching, Aggregating)
                | (Aggregating, Done)
                | (Aggregating, Failed)
        )
    }

    /// Returns a short lowercase name for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::Paging => "paging",
            Self::Enriching => "enriching",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

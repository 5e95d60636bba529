/// Job state definitions for a single domain crawl
///
/// A job moves `Ready -> Running` once, then ends in exactly one terminal state.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a domain crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    // ===== Active States =====
    /// Frontier seeded with the start URL, nothing fetched yet
    Ready,

    /// Traversal in progress
    Running,

    // ===== Terminal States =====
    /// Frontier exhausted
    Completed,

    /// The job could not start (start URL unusable or unreachable)
    Failed,

    /// The per-domain wall-clock budget ran out
    TimedOut,

    /// The whole run was aborted by the caller
    Cancelled,
}

impl JobState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    /// Returns true if this is an active state (job may still make progress)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (Self::Ready, Self::Running) => true,
            // A job that cannot even build its start URL fails before running
            (Self::Ready, Self::Failed) => true,
            (Self::Running, next) => next.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//! Per-operation work budget: visited-node cap, deadline, cancellation.
//!
//! The full check runs at BFS level boundaries and DFS backtrack points.
//! The node cap is also checked before each newly visited node, so no
//! operation ever holds more than `max_nodes`. Tripping never fails the
//! operation; it ends it early with a [`TruncationReason`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Why an operation stopped before exhausting its search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TruncationReason {
    NodeBudget,
    Timeout,
    Cancelled,
    /// `maxPaths` reached. The caller asked for at most that many, so the
    /// result is not partial.
    PathLimit,
    /// An engine-side result cap (`maxResults`, `limit`) was reached.
    ResultLimit,
}

impl TruncationReason {
    /// Whether a response carrying this reason is incomplete.
    pub fn is_partial(self) -> bool {
        !matches!(self, TruncationReason::PathLimit)
    }
}

/// Caller-side cancellation flag, shared with a running query.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Two tokens are equal when they share the same flag.
impl PartialEq for CancelToken {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone)]
pub struct Budget {
    max_nodes: usize,
    deadline: Instant,
    cancel: CancelToken,
}

impl Budget {
    pub fn new(max_nodes: usize, timeout: Duration) -> Self {
        Self {
            max_nodes,
            deadline: Instant::now() + timeout,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// `Some(reason)` if the operation must stop now, having visited
    /// `visited` nodes and with more work pending.
    pub fn interrupted(&self, visited: usize) -> Option<TruncationReason> {
        let reason = if self.cancel.is_cancelled() {
            TruncationReason::Cancelled
        } else if Instant::now() >= self.deadline {
            TruncationReason::Timeout
        } else if visited >= self.max_nodes {
            TruncationReason::NodeBudget
        } else {
            return None;
        };
        warn!(?reason, visited, max_nodes = self.max_nodes, "budget tripped");
        Some(reason)
    }

    /// `Some(NodeBudget)` if visiting one more node would exceed the cap.
    pub fn exhausted(&self, visited: usize) -> Option<TruncationReason> {
        if visited < self.max_nodes {
            return None;
        }
        warn!(visited, max_nodes = self.max_nodes, "node budget exhausted");
        Some(TruncationReason::NodeBudget)
    }
}

/// An operation's value together with why it stopped early, if it did.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounded<T> {
    pub value: T,
    pub reason: Option<TruncationReason>,
}

impl<T> Bounded<T> {
    pub fn complete(value: T) -> Self {
        Self { value, reason: None }
    }

    pub fn cut(value: T, reason: Option<TruncationReason>) -> Self {
        Self { value, reason }
    }

    pub fn is_partial(&self) -> bool {
        self.reason.is_some_and(TruncationReason::is_partial)
    }
}

//! Per-request flow state machine.
//!
//! ```text
//! Received -> Authorizing -> { Denied | Authorized }
//! Authorized -> Classifying -> { Rejected | Routed }
//! Routed -> { AsyncPending | SyncCompleted | SyncFailed | SubmitFailed }
//! ```
//!
//! No state is revisited; every flow ends in exactly one terminal state.

/// States a single request passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    Received,
    Authorizing,
    Authorized,
    Classifying,
    Routed,
    /// Credential missing, declined, or the authority could not be reached.
    Denied,
    /// Classification failed, or the request was shed before dispatch.
    Rejected,
    /// Correlation id returned; broker delivery continues in the background.
    AsyncPending,
    SyncCompleted,
    SyncFailed,
    /// The submission could not be handed to the publisher.
    SubmitFailed,
}

impl FlowState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Denied
                | Self::Rejected
                | Self::AsyncPending
                | Self::SyncCompleted
                | Self::SyncFailed
                | Self::SubmitFailed
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Authorizing => "authorizing",
            Self::Authorized => "authorized",
            Self::Classifying => "classifying",
            Self::Routed => "routed",
            Self::Denied => "denied",
            Self::Rejected => "rejected",
            Self::AsyncPending => "async_pending",
            Self::SyncCompleted => "sync_completed",
            Self::SyncFailed => "sync_failed",
            Self::SubmitFailed => "submit_failed",
        }
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Received, Self::Authorizing)
                | (Self::Authorizing, Self::Denied | Self::Authorized)
                | (Self::Authorized, Self::Classifying)
                | (Self::Classifying, Self::Rejected | Self::Routed)
                | (
                    Self::Routed,
                    Self::AsyncPending | Self::SyncCompleted | Self::SyncFailed | Self::SubmitFailed
                )
        )
    }
}

/// Tracks one request's progress through [`FlowState`].
#[derive(Debug)]
pub struct Flow {
    state: FlowState,
}

impl Flow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: FlowState::Received,
        }
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Moves to `next` if the transition is legal.
    ///
    /// Returns `false` and leaves the state unchanged otherwise.
    pub fn advance(&mut self, next: FlowState) -> bool {
        if self.state.can_advance_to(next) {
            tracing::trace!(from = self.state.as_str(), to = next.as_str(), "flow transition");
            self.state = next;
            true
        } else {
            tracing::warn!(
                from = self.state.as_str(),
                to = next.as_str(),
                "illegal flow transition ignored"
            );
            false
        }
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

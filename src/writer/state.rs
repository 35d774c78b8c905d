//! Lifecycle states of one download attempt.

use std::fmt;

/// Controller state machine.
///
/// `Initializing -> Streaming -> Completing -> Completed` on the happy
/// path; failures route through `Interrupting -> Interrupted`, and a cancel
/// request lands in `Cancelled` from `Streaming` or `Interrupting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Initializing,
    Streaming,
    Completing,
    Completed,
    Interrupting,
    Interrupted,
    Cancelled,
}

impl WriterState {
    /// True once the attempt can make no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WriterState::Completed | WriterState::Interrupted | WriterState::Cancelled
        )
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::Initializing => "initializing",
            WriterState::Streaming => "streaming",
            WriterState::Completing => "completing",
            WriterState::Completed => "completed",
            WriterState::Interrupting => "interrupting",
            WriterState::Interrupted => "interrupted",
            WriterState::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

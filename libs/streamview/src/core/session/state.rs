// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Session state machine types
//!
//! - `SessionState` - lifecycle of one session
//! - `TerminationReason` - why a terminal state was reached
//! - `SourcePhase` - linking progress of late-binding sources
//! - `SessionStateWatch` - state as seen from other threads

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Session lifecycle.
///
/// ```text
/// ┌──────┐ start() ┌─────────┐ cancel / EOS ┌──────────┐ EOS or timeout ┌─────────┐
/// │ Idle │────────►│ Running │─────────────►│ Draining │───────────────►│ Stopped │
/// └──┬───┘         └────┬────┘              └────┬─────┘                └─────────┘
///    │ stop()           │ engine error           │ engine error              ▲
///    │                  ▼                        ▼                           │
///    │             ┌────────┐◄───────────────────┘                           │
///    │             │ Failed │                                                │
///    │             └────────┘                                                │
///    └───────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `Stopped` and `Failed` are terminal. A failed instantiation moves an
/// `Idle` session straight to `Failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Created, nothing instantiated
    #[default]
    Idle,

    /// Graph instantiated and playing
    Running,

    /// End-of-stream requested or received, waiting for sinks to finish
    Draining,

    /// Instantiation released after a clean or timed-out drain
    Stopped,

    /// Engine error; instantiation released
    Failed,
}

impl SessionState {
    /// An instantiation exists.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Running)
                | (Idle, Stopped)
                | (Idle, Failed)
                | (Running, Draining)
                | (Running, Failed)
                | (Draining, Stopped)
                | (Draining, Failed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The engine finished the stream on its own (e.g. end of a file input).
    EndOfStream,
    /// Stopped on request and the engine confirmed the drain.
    UserStop,
    /// Stopped on request but the engine did not confirm in time.
    DrainTimeout,
    Failed { message: String },
}

/// Read-only view of a session's state that can cross threads.
///
/// The session publishes every transition here, so an observer sees
/// `Draining` while the owning thread is blocked waiting for the drain.
#[derive(Debug, Clone, Default)]
pub struct SessionStateWatch {
    state: Arc<RwLock<SessionState>>,
}

impl SessionStateWatch {
    pub fn get(&self) -> SessionState {
        *self.state.read()
    }

    pub(crate) fn publish(&self, state: SessionState) {
        *self.state.write() = state;
    }
}

impl TerminationReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => f.write_str("end of stream"),
            Self::UserStop => f.write_str("stopped by user"),
            Self::DrainTimeout => f.write_str("drain timed out"),
            Self::Failed { message } => write!(f, "failed: {}", message),
        }
    }
}

/// Linking progress of the session's source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourcePhase {
    /// Source is linked in the description itself.
    #[default]
    Static,
    /// Waiting for the transport to announce its stream.
    Pending,
    /// Late-binding source has been linked.
    Linked,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SessionState; 5] = [
        SessionState::Idle,
        SessionState::Running,
        SessionState::Draining,
        SessionState::Stopped,
        SessionState::Failed,
    ];

    #[test]
    fn test_session_state_default_is_idle() {
        assert_eq!(SessionState::default(), SessionState::Idle);
    }

    #[test]
    fn test_session_state_is_active() {
        assert!(!SessionState::Idle.is_active());
        assert!(SessionState::Running.is_active());
        assert!(SessionState::Draining.is_active());
        assert!(!SessionState::Stopped.is_active());
        assert!(!SessionState::Failed.is_active());
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        for terminal in [SessionState::Stopped, SessionState::Failed] {
            assert!(terminal.is_terminal());
            for next in ALL {
                assert!(!terminal.can_transition_to(next), "{} -> {}", terminal, next);
            }
        }
    }

    #[test]
    fn test_failed_only_from_idle_running_draining() {
        for from in ALL {
            let expected = matches!(
                from,
                SessionState::Idle | SessionState::Running | SessionState::Draining
            );
            assert_eq!(from.can_transition_to(SessionState::Failed), expected, "{}", from);
        }
    }

    #[test]
    fn test_running_stops_through_draining() {
        assert!(!SessionState::Running.can_transition_to(SessionState::Stopped));
        assert!(SessionState::Running.can_transition_to(SessionState::Draining));
        assert!(SessionState::Draining.can_transition_to(SessionState::Stopped));
    }

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(TerminationReason::UserStop.to_string(), "stopped by user");
        let failed = TerminationReason::Failed {
            message: "no device".into(),
        };
        assert!(failed.is_failure());
        assert_eq!(failed.to_string(), "failed: no device");
    }

    #[test]
    fn test_state_watch_shares_transitions() {
        let watch = SessionStateWatch::default();
        let observer = watch.clone();
        assert_eq!(observer.get(), SessionState::Idle);
        watch.publish(SessionState::Draining);
        assert_eq!(observer.get(), SessionState::Draining);
    }
}

use crate::component::PhaseStates;
use crate::phase_register::PhaseState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OS signals that can start a graceful shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownSignal {
    /// SIGTERM (systemd stop)
    Terminate,
    /// SIGINT (Ctrl+C)
    Interrupt,
    Hangup,
    Quit,
    User1,
    User2,
}

impl ShutdownSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownSignal::Terminate => "terminate",
            ShutdownSignal::Interrupt => "interrupt",
            ShutdownSignal::Hangup => "hangup",
            ShutdownSignal::Quit => "quit",
            ShutdownSignal::User1 => "user1",
            ShutdownSignal::User2 => "user2",
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started the graceful shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownReason {
    Signal(ShutdownSignal),
    Triggered { exit_code: i32 },
    /// Every group finished on its own
    ExecutionFinished,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(signal) => write!(f, "signal {}", signal),
            ShutdownReason::Triggered { exit_code } => {
                write!(f, "stop trigger with exit code {}", exit_code)
            }
            ShutdownReason::ExecutionFinished => f.write_str("execution finished"),
        }
    }
}

/// Result of a completed application lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShutdownOutcome {
    pub exit_code: i32,
    pub reason: ShutdownReason,
    /// Shutdown-capable components that neither finished nor failed before the deadline
    pub unfinished: Vec<String>,
}

impl ShutdownOutcome {
    pub fn is_clean(&self) -> bool {
        self.unfinished.is_empty()
    }
}

/// Progress of the graceful-shutdown coordinator
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorState {
    Idle = 0,
    Triggered = 1,
    Sweeping = 2,
    Finished = 3,
}

impl CoordinatorState {
    pub(super) fn from_u8(value: u8) -> Self {
        match value {
            1 => CoordinatorState::Triggered,
            2 => CoordinatorState::Sweeping,
            3 => CoordinatorState::Finished,
            _ => CoordinatorState::Idle,
        }
    }
}

/// Point-in-time view of one registered component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSnapshot {
    pub group: String,
    pub component: String,
    pub states: PhaseStates,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthEntry {
    pub group: String,
    pub component: String,
    pub state: Option<PhaseState>,
    /// Error returned by this round's healthcheck, if any
    pub error: Option<String>,
}

/// Outcome of one healthcheck round
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub application: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<HealthEntry>,
}

impl HealthReport {
    /// True when no healthcheck failed or was left unfinished
    pub fn is_healthy(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.state == Some(PhaseState::Done))
    }
}

mod health;
mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::{Orchestrator, StopTrigger};
pub use types::{
    ComponentSnapshot, CoordinatorState, HealthEntry, HealthReport, ShutdownOutcome,
    ShutdownReason, ShutdownSignal,
};

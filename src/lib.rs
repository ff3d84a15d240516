pub mod app;
pub mod component;
pub mod config;
pub mod context;
pub mod error;
pub mod phase_register;
pub mod registry;
pub mod simulated;

pub use app::{
    ComponentSnapshot, CoordinatorState, HealthEntry, HealthReport, Orchestrator,
    ShutdownOutcome, ShutdownReason, ShutdownSignal, StopTrigger,
};
pub use component::{
    BoxError, Component, ComponentBuilder, ComponentId, Healthchecker, Initializer, PhaseFn,
    PhaseResult, PhaseStates, PhaseView, Runner, Shutdowner,
};
pub use config::{AppcycleConfig, OrchestratorConfig};
pub use context::PhaseContext;
pub use error::{OrchestratorError, PhaseFailure, Result};
pub use phase_register::{Phase, PhaseRegister, PhaseState};
pub use registry::{ComponentRegistry, Group, PRIVILEGED_GROUP};
pub use simulated::{SimulatedModule, SimulatedModuleConfig, SimulationError, StageConfig};

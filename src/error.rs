use crate::phase_register::Phase;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Group '{group}' not found")]
    GroupNotFound { group: String },

    #[error("Group '{group}' already registered")]
    DuplicateGroup { group: String },

    #[error("Component '{component}' already registered")]
    DuplicateComponent { component: String },

    #[error("Component '{component}' does not implement any lifecycle phase")]
    InvalidComponent { component: String },

    #[error(transparent)]
    PhaseFailed(#[from] PhaseFailure),

    #[error("Shutdown timeout exceeded, unfinished components: [{}]", .components.join(", "))]
    ShutdownTimeoutExceeded { components: Vec<String> },

    #[error("System error: {message}")]
    System { message: String },
}

impl OrchestratorError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// A phase method of one component returned an error.
///
/// Cheap to clone so it can be fanned out to every failure subscriber.
#[derive(Error, Debug, Clone)]
#[error("{phase} of component '{component}' from group '{group}' failed: {cause}")]
pub struct PhaseFailure {
    pub component: String,
    pub group: String,
    pub phase: Phase,
    #[source]
    pub cause: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl PhaseFailure {
    pub fn new(
        component: impl Into<String>,
        group: impl Into<String>,
        phase: Phase,
        cause: crate::component::BoxError,
    ) -> Self {
        Self {
            component: component.into(),
            group: group.into(),
            phase,
            cause: Arc::from(cause),
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

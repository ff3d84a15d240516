//! Configurable stand-in modules for the `appcycle` binary.
//!
//! Each configured stage becomes one lifecycle phase that waits for a fixed
//! time (or for cancellation) and then succeeds or fails as requested.

use crate::component::{
    Component, Healthchecker, Initializer, PhaseResult, Runner, Shutdowner,
};
use crate::context::PhaseContext;
use crate::phase_register::Phase;
use async_trait::async_trait;
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{debug, info};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Behaviour of one simulated phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StageConfig {
    /// How long the stage works; unset means until cancelled
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Return an error once the stage has finished its work
    #[serde(default)]
    pub fail: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulatedModuleConfig {
    pub name: String,

    /// Target group; unset registers the module in a group of its own
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub healthcheck: Option<StageConfig>,
    #[serde(default)]
    pub init: Option<StageConfig>,
    #[serde(default)]
    pub run: Option<StageConfig>,
    #[serde(default)]
    pub shutdown: Option<StageConfig>,
}

impl SimulatedModuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            group: None,
            healthcheck: None,
            init: None,
            run: None,
            shutdown: None,
        }
    }

    pub fn stage(&self, phase: Phase) -> Option<&StageConfig> {
        match phase {
            Phase::Healthcheck => self.healthcheck.as_ref(),
            Phase::Init => self.init.as_ref(),
            Phase::Run => self.run.as_ref(),
            Phase::Shutdown => self.shutdown.as_ref(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Module name must not be empty".to_string(),
            ));
        }

        if Phase::ALL.iter().all(|phase| self.stage(*phase).is_none()) {
            return Err(ConfigError::Message(format!(
                "Module '{}' must configure at least one stage",
                self.name
            )));
        }

        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("{phase} of module '{module}' interrupted before completion")]
    Interrupted { module: String, phase: Phase },

    #[error("{phase} of module '{module}' failed as configured")]
    Requested { module: String, phase: Phase },
}

pub struct SimulatedModule {
    config: SimulatedModuleConfig,
}

impl SimulatedModule {
    pub fn new(config: SimulatedModuleConfig) -> Self {
        Self { config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Wrap into a component exposing exactly the configured stages
    pub fn into_component(self) -> Component {
        let name = self.config.name.clone();
        let has = |phase| self.config.stage(phase).is_some();
        let (healthcheck, init, run, shutdown) = (
            has(Phase::Healthcheck),
            has(Phase::Init),
            has(Phase::Run),
            has(Phase::Shutdown),
        );

        let module = Arc::new(self);
        let mut builder = Component::builder(name);
        if healthcheck {
            builder = builder.with_healthchecker(module.clone());
        }
        if init {
            builder = builder.with_initializer(module.clone());
        }
        if run {
            builder = builder.with_runner(module.clone());
        }
        if shutdown {
            builder = builder.with_shutdowner(module);
        }
        builder.build()
    }

    async fn perform(&self, phase: Phase, ctx: PhaseContext) -> PhaseResult {
        let Some(stage) = self.config.stage(phase) else {
            return Ok(());
        };

        let started = Instant::now();
        let finish_at = stage
            .duration_ms
            .map(|ms| started + Duration::from_millis(ms));
        let mut progress = interval_at(started + PROGRESS_INTERVAL, PROGRESS_INTERVAL);

        info!(module = %self.config.name, phase = %phase, "Stage started");
        loop {
            tokio::select! {
                _ = ctx.cancelled() => {
                    if finish_at.is_some() {
                        return Err(Box::new(SimulationError::Interrupted {
                            module: self.config.name.clone(),
                            phase,
                        }));
                    }
                    break;
                }
                _ = wait_until(finish_at) => break,
                _ = progress.tick() => {
                    debug!(
                        module = %self.config.name,
                        phase = %phase,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Stage in progress"
                    );
                }
            }
        }

        if stage.fail {
            return Err(Box::new(SimulationError::Requested {
                module: self.config.name.clone(),
                phase,
            }));
        }

        info!(module = %self.config.name, phase = %phase, "Stage completed");
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[async_trait]
impl Healthchecker for SimulatedModule {
    async fn healthcheck(&self, ctx: PhaseContext) -> PhaseResult {
        self.perform(Phase::Healthcheck, ctx).await
    }
}

#[async_trait]
impl Initializer for SimulatedModule {
    async fn init(&self, ctx: PhaseContext) -> PhaseResult {
        self.perform(Phase::Init, ctx).await
    }
}

#[async_trait]
impl Runner for SimulatedModule {
    async fn run(&self, ctx: PhaseContext) -> PhaseResult {
        self.perform(Phase::Run, ctx).await
    }
}

#[async_trait]
impl Shutdowner for SimulatedModule {
    async fn shutdown(&self, ctx: PhaseContext) -> PhaseResult {
        self.perform(Phase::Shutdown, ctx).await
    }
}

use super::types::{CoordinatorState, ShutdownOutcome, ShutdownReason};
use crate::component::{Component, PhaseResult, PhaseView};
use crate::config::OrchestratorConfig;
use crate::context::PhaseContext;
use crate::error::{OrchestratorError, PhaseFailure, Result};
use crate::registry::ComponentRegistry;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error};
use uuid::Uuid;

const TRIGGER_CAPACITY: usize = 8;
const FAILURE_EVENTS_CAPACITY: usize = 64;

/// Receivers consumed by the first call to `start`
pub(super) struct PendingChannels {
    pub(super) failures: mpsc::UnboundedReceiver<PhaseFailure>,
    pub(super) triggers: mpsc::Receiver<ShutdownReason>,
}

/// State shared between the orchestrator handle and its background tasks
pub(super) struct Shared {
    pub(super) config: OrchestratorConfig,
    pub(super) run_id: Uuid,
    pub(super) registry: ComponentRegistry,
    pub(super) auto_groups: AtomicU64,

    // Failure fan-out
    pub(super) failure_log: mpsc::UnboundedSender<PhaseFailure>,
    pub(super) failure_events: broadcast::Sender<PhaseFailure>,

    // Lifecycle management
    pub(super) triggers: mpsc::Sender<ShutdownReason>,
    pub(super) pending: Mutex<Option<PendingChannels>>,
    pub(super) execution_done: CancellationToken,
    pub(super) shutdown_base: CancellationToken,
    pub(super) finished: watch::Sender<Option<ShutdownOutcome>>,
    pub(super) coordinator_state: AtomicU8,
}

/// Application-lifecycle orchestrator.
///
/// Cloning yields another handle to the same application.
#[derive(Clone)]
pub struct Orchestrator {
    pub(super) shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given configuration
    pub fn new(config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;

        let (failure_log, failures) = mpsc::unbounded_channel();
        let (failure_events, _) = broadcast::channel(FAILURE_EVENTS_CAPACITY);
        let (triggers, trigger_receiver) = mpsc::channel(TRIGGER_CAPACITY);
        let (finished, _) = watch::channel(None);

        let run_id = Uuid::new_v4();
        debug!(application = %config.name, run_id = %run_id, "Orchestrator created");

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                run_id,
                registry: ComponentRegistry::new(),
                auto_groups: AtomicU64::new(0),
                failure_log,
                failure_events,
                triggers,
                pending: Mutex::new(Some(PendingChannels {
                    failures,
                    triggers: trigger_receiver,
                })),
                execution_done: CancellationToken::new(),
                shutdown_base: CancellationToken::new(),
                finished,
                coordinator_state: AtomicU8::new(CoordinatorState::Idle as u8),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Identifier of this application run, attached to the start log line
    pub fn run_id(&self) -> Uuid {
        self.shared.run_id
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.shared.registry
    }

    pub fn add_group(&self, name: &str) -> Result<()> {
        self.shared.registry.add_group(name)
    }

    /// Register `component` at the end of `group`, creating the group on demand.
    ///
    /// Rejections are logged and returned; nothing is registered on error.
    pub fn add_module_to_group(&self, group: &str, component: Component) -> Result<()> {
        let module = component.name().to_string();
        match self.shared.registry.add_component(group, component) {
            Ok(()) => {
                debug!(application = %self.shared.config.name, group, module = %module, "Module added");
                Ok(())
            }
            Err(err) => {
                error!(
                    application = %self.shared.config.name,
                    group,
                    module = %module,
                    error = %err,
                    "Module addition failed"
                );
                Err(err)
            }
        }
    }

    /// Register `component` in a fresh group of its own and return the group name
    pub fn add_component_auto_group(&self, component: Component) -> Result<String> {
        let group = loop {
            let next = self.shared.auto_groups.fetch_add(1, Ordering::Relaxed) + 1;
            let candidate = format!("group-{}", next);
            if !self.shared.registry.contains_group(&candidate) {
                break candidate;
            }
        };
        self.add_module_to_group(&group, component)?;
        Ok(group)
    }

    /// Receive every phase failure reported after this call
    pub fn subscribe_failures(&self) -> broadcast::Receiver<PhaseFailure> {
        self.shared.failure_events.subscribe()
    }

    /// Handle that starts graceful shutdown on demand
    pub fn stop_trigger(&self) -> StopTrigger {
        StopTrigger {
            triggers: self.shared.triggers.clone(),
            finished: self.shared.finished.subscribe(),
        }
    }
}

impl Shared {
    /// Fan a phase failure out to the logging task and every subscriber
    pub(super) fn report(&self, failure: PhaseFailure) {
        // No subscribers is fine
        let _ = self.failure_events.send(failure.clone());
        let _ = self.failure_log.send(failure);
    }

    /// Record the result of a phase the caller has claimed. Returns true on success.
    pub(super) fn settle<T: ?Sized>(
        &self,
        group: &str,
        component: &Component,
        view: &PhaseView<'_, T>,
        result: PhaseResult,
    ) -> bool {
        match result {
            Ok(()) => {
                view.set_done();
                debug!(
                    application = %self.config.name,
                    group,
                    module = component.name(),
                    phase = %view.phase(),
                    "Module phase done"
                );
                true
            }
            Err(cause) => {
                view.set_failed();
                self.report(PhaseFailure::new(component.name(), group, view.phase(), cause));
                false
            }
        }
    }

    /// Fresh context bounded by the shutdown timeout and independent of execution
    pub(super) fn shutdown_context(&self) -> (PhaseContext, DropGuard) {
        PhaseContext::new(self.shutdown_base.child_token())
            .with_timeout(self.config.shutdown_timeout())
    }

    pub(super) fn set_coordinator_state(&self, state: CoordinatorState) {
        self.coordinator_state.store(state as u8, Ordering::SeqCst);
    }

    pub(super) async fn wait_for_outcome(
        mut finished: watch::Receiver<Option<ShutdownOutcome>>,
    ) -> Result<ShutdownOutcome> {
        let outcome = finished
            .wait_for(Option::is_some)
            .await
            .map_err(|_| OrchestratorError::system("Shutdown coordinator dropped"))?;
        (*outcome)
            .clone()
            .ok_or_else(|| OrchestratorError::system("Shutdown outcome missing"))
    }
}

/// Starts graceful shutdown with a chosen exit code.
///
/// Only the first trigger of an application takes effect; later ones wait
/// for the same outcome.
#[derive(Clone)]
pub struct StopTrigger {
    triggers: mpsc::Sender<ShutdownReason>,
    finished: watch::Receiver<Option<ShutdownOutcome>>,
}

impl StopTrigger {
    /// Request shutdown without waiting for it
    pub fn fire(&self, exit_code: i32) {
        // A full or closed channel means shutdown is already underway
        let _ = self.triggers.try_send(ShutdownReason::Triggered { exit_code });
    }

    /// Request shutdown and wait until the sweep has finished
    pub async fn trigger(self, exit_code: i32) -> Result<ShutdownOutcome> {
        self.fire(exit_code);
        Shared::wait_for_outcome(self.finished).await
    }
}

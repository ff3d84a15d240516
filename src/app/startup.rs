use super::orchestrator::{Orchestrator, Shared};
use super::runtime::{accompaniment, spawn_signal_listeners};
use super::types::ShutdownOutcome;
use crate::context::PhaseContext;
use crate::error::{OrchestratorError, Result};
use crate::phase_register::Phase;
use crate::registry::{Group, PRIVILEGED_GROUP};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

impl Orchestrator {
    /// Run the application until graceful shutdown has finished.
    ///
    /// The privileged group goes first and alone; every other group then runs
    /// concurrently. Returns once every group task has completed, or the
    /// shutdown deadline has passed, and the coordinator has reported. No
    /// init or run starts after execution is cancelled. Cancelling `parent`
    /// cancels execution but does not start the graceful shutdown by itself.
    /// Can be called once per orchestrator.
    pub async fn start(&self, parent: CancellationToken) -> Result<ShutdownOutcome> {
        let pending = self
            .shared
            .pending
            .lock()
            .take()
            .ok_or_else(|| OrchestratorError::system("Orchestrator already started"))?;

        let shared = &self.shared;
        let application = shared.config.name.as_str();
        info!(application, run_id = %shared.run_id, "Application started");

        let execution = parent.child_token();

        tokio::spawn(accompaniment(shared.config.name.clone(), pending.failures));
        let listeners = spawn_signal_listeners(
            application,
            &shared.config.signals,
            shared.triggers.clone(),
        );
        tokio::spawn(Arc::clone(shared).coordinate(
            pending.triggers,
            execution.clone(),
            listeners,
        ));
        tokio::spawn(Arc::clone(shared).schedule(execution));

        let outcome = Shared::wait_for_outcome(shared.finished.subscribe()).await?;

        info!(
            application,
            exit_code = outcome.exit_code,
            reason = %outcome.reason,
            "Application finished"
        );
        Ok(outcome)
    }
}

impl Shared {
    /// Drive every group through its phases, then signal execution done
    pub(super) async fn schedule(self: Arc<Self>, execution: CancellationToken) {
        let execution_ctx = PhaseContext::new(execution);
        let (init_ctx, _init_guard) = match self.config.init_timeout() {
            Some(timeout) => {
                let (ctx, guard) = execution_ctx.with_timeout(timeout);
                (ctx, Some(guard))
            }
            None => (execution_ctx.clone(), None),
        };

        match self.registry.group_by_name(PRIVILEGED_GROUP) {
            Ok(group) => self.process_group(&group, &init_ctx, &execution_ctx).await,
            Err(err) => info!(application = %self.config.name, error = %err, "Privileged group not found"),
        }

        let mut groups = JoinSet::new();
        if execution_ctx.is_cancelled() {
            debug!(application = %self.config.name, "Execution cancelled before groups started");
        } else {
            for group in self
                .registry
                .ordered_groups()
                .into_iter()
                .filter(|group| !group.is_privileged())
            {
                let shared = Arc::clone(&self);
                let init_ctx = init_ctx.clone();
                let execution_ctx = execution_ctx.clone();
                groups.spawn(async move {
                    shared.process_group(&group, &init_ctx, &execution_ctx).await;
                });
            }
        }

        while let Some(joined) = groups.join_next().await {
            if let Err(err) = joined {
                error!(application = %self.config.name, error = %err, "Group task aborted");
            }
        }

        debug!(application = %self.config.name, "All groups finished");
        self.execution_done.cancel();
    }

    async fn process_group(
        &self,
        group: &Group,
        init_ctx: &PhaseContext,
        execution_ctx: &PhaseContext,
    ) {
        self.process_initializers(group, init_ctx).await;
        self.process_runners(group, execution_ctx).await;

        let (shutdown_ctx, _guard) = self.shutdown_context();
        self.process_shutdowners(group, &shutdown_ctx).await;
    }

    /// Initialize in registration order; the first failure ends the group's init phase
    async fn process_initializers(&self, group: &Group, ctx: &PhaseContext) {
        for component in group.components() {
            if ctx.is_cancelled() {
                return;
            }

            // A component the sweep already shut down never starts again
            let view = component.initializer();
            let Some(initializer) = view.claim_before(Phase::Shutdown) else {
                continue;
            };

            debug!(application = %self.config.name, group = group.name(), module = component.name(), "Module initialization");
            let result = initializer.init(ctx.clone()).await;
            if !self.settle(group.name(), component, &view, result) {
                return;
            }
        }
    }

    async fn process_runners(&self, group: &Group, ctx: &PhaseContext) {
        for component in group.components() {
            if ctx.is_cancelled() {
                return;
            }
            if component.is_initializer() && !component.initializer().is_done() {
                continue;
            }

            let view = component.runner();
            let Some(runner) = view.claim_before(Phase::Shutdown) else {
                continue;
            };

            debug!(application = %self.config.name, group = group.name(), module = component.name(), "Module running");
            let result = runner.run(ctx.clone()).await;
            if !self.settle(group.name(), component, &view, result) {
                return;
            }
        }
    }

    /// Shut down the components whose run finished cleanly
    async fn process_shutdowners(&self, group: &Group, ctx: &PhaseContext) {
        for component in group.components() {
            if !component.runner().is_done() {
                continue;
            }

            let view = component.shutdowner();
            let Some(shutdowner) = view.claim() else {
                continue;
            };

            debug!(application = %self.config.name, group = group.name(), module = component.name(), "Module shutdown");
            let result = shutdowner.shutdown(ctx.clone()).await;
            if !self.settle(group.name(), component, &view, result) {
                return;
            }
        }
    }
}

use super::orchestrator::Shared;
use crate::error::OrchestratorError;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info};

impl Shared {
    /// Invoke shutdown concurrently on every component whose shutdown phase is
    /// still ready, then wait for every group task to complete. Both waits
    /// share one deadline derived from the shutdown timeout.
    ///
    /// Returns the names of shutdown-capable components that neither finished
    /// nor failed by the deadline.
    pub(super) async fn graceful_shutdown(self: &Arc<Self>) -> Vec<String> {
        let application = self.config.name.as_str();
        let (ctx, _guard) = self.shutdown_context();
        let deadline = ctx
            .deadline()
            .unwrap_or_else(|| Instant::now() + self.config.shutdown_timeout());

        let mut sweep = JoinSet::new();
        for component in self.registry.shutdown_capable_components() {
            let Some(shutdowner) = component.shutdowner().claim() else {
                continue;
            };

            let shared = Arc::clone(self);
            let ctx = ctx.clone();
            sweep.spawn(async move {
                let group = shared.registry.group_of(&component).unwrap_or_default();
                debug!(application = %shared.config.name, group = %group, module = component.name(), "Module shutdown");
                let result = shutdowner.shutdown(ctx).await;
                shared.settle(&group, &component, &component.shutdowner(), result);
            });
        }

        let claimed = sweep.len();
        debug!(application, modules = claimed, "Graceful shutdown sweep started");

        let joined = timeout_at(deadline, async {
            while let Some(joined) = sweep.join_next().await {
                if let Err(err) = joined {
                    error!(application, error = %err, "Shutdown task aborted");
                }
            }
        })
        .await;

        if joined.is_err() {
            sweep.detach_all();
        }

        // Group tasks still winding down get the rest of the same deadline
        if !self.execution_done.is_cancelled() {
            debug!(application, "Waiting for groups to finish");
            let _ = timeout_at(deadline, self.execution_done.cancelled()).await;
        }

        let mut unfinished: Vec<String> = self
            .registry
            .shutdown_capable_components()
            .iter()
            .filter(|component| {
                let view = component.shutdowner();
                !view.is_done() && !view.is_failed()
            })
            .map(|component| component.name().to_string())
            .collect();
        unfinished.sort();

        if unfinished.is_empty() {
            info!(application, "Graceful shutdown finished");
        } else {
            let err = OrchestratorError::ShutdownTimeoutExceeded {
                components: unfinished.clone(),
            };
            error!(application, error = %err, "Graceful shutdown incomplete");
        }

        unfinished
    }
}

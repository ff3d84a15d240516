use super::types::{HealthEntry, HealthReport};
use super::Orchestrator;
use crate::component::ComponentId;
use crate::context::PhaseContext;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::timeout_at;
use tracing::{debug, error, warn};

impl Orchestrator {
    /// Run every pending healthcheck concurrently and report the result.
    ///
    /// Each component is checked at most once per lifetime; later rounds
    /// report the recorded state without an error message.
    pub async fn run_healthchecks(&self) -> HealthReport {
        let shared = &self.shared;
        let application = shared.config.name.as_str();

        let base = PhaseContext::new(shared.shutdown_base.child_token());
        let (ctx, _guard) = match shared.config.healthcheck_timeout() {
            Some(timeout) => {
                let (ctx, guard) = base.with_timeout(timeout);
                (ctx, Some(guard))
            }
            None => (base, None),
        };

        let mut checks = JoinSet::new();
        for group in shared.registry.ordered_groups() {
            for component in group.components() {
                let Some(checker) = component.healthchecker().claim() else {
                    continue;
                };

                let shared = Arc::clone(shared);
                let ctx = ctx.clone();
                let component = component.clone();
                let group = group.name().to_string();
                checks.spawn(async move {
                    debug!(application = %shared.config.name, group = %group, module = component.name(), "Module healthcheck");
                    let result = checker.healthcheck(ctx).await;
                    let error = result.as_ref().err().map(ToString::to_string);
                    shared.settle(&group, &component, &component.healthchecker(), result);
                    (component.id(), error)
                });
            }
        }

        let mut errors: HashMap<ComponentId, String> = HashMap::new();
        let collect = async {
            while let Some(joined) = checks.join_next().await {
                match joined {
                    Ok((id, Some(err))) => {
                        errors.insert(id, err);
                    }
                    Ok(_) => {}
                    Err(err) => error!(application, error = %err, "Healthcheck task aborted"),
                }
            }
        };

        match ctx.deadline() {
            Some(deadline) => {
                if timeout_at(deadline, collect).await.is_err() {
                    warn!(application, "Healthcheck timeout exceeded");
                    checks.detach_all();
                }
            }
            None => collect.await,
        }

        let entries = shared
            .registry
            .ordered_groups()
            .iter()
            .flat_map(|group| {
                group
                    .components()
                    .iter()
                    .filter(|component| component.is_healthchecker())
                    .map(|component| HealthEntry {
                        group: group.name().to_string(),
                        component: component.name().to_string(),
                        state: component.healthchecker().state(),
                        error: errors.remove(&component.id()),
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        HealthReport {
            application: application.to_string(),
            generated_at: Utc::now(),
            entries,
        }
    }
}

use super::types::{ComponentSnapshot, CoordinatorState, ShutdownOutcome};
use super::Orchestrator;
use std::sync::atomic::Ordering;

impl Orchestrator {
    pub fn coordinator_state(&self) -> CoordinatorState {
        CoordinatorState::from_u8(self.shared.coordinator_state.load(Ordering::SeqCst))
    }

    /// Outcome of the finished lifecycle, `None` while still running
    pub fn outcome(&self) -> Option<ShutdownOutcome> {
        self.shared.finished.borrow().clone()
    }

    /// Snapshot of every component in group order, then registration order
    pub fn component_states(&self) -> Vec<ComponentSnapshot> {
        self.shared
            .registry
            .ordered_groups()
            .iter()
            .flat_map(|group| {
                group.components().iter().map(move |component| ComponentSnapshot {
                    group: group.name().to_string(),
                    component: component.name().to_string(),
                    states: component.states(),
                })
            })
            .collect()
    }

    /// Snapshot of the first component registered under `name`
    pub fn component_state(&self, name: &str) -> Option<ComponentSnapshot> {
        self.component_states()
            .into_iter()
            .find(|snapshot| snapshot.component == name)
    }
}

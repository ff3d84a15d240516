use crate::component::{Component, ComponentId};
use crate::error::{OrchestratorError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Name of the group that always exists and runs before every other group
pub const PRIVILEGED_GROUP: &str = "global";

/// Ordered set of components that run their phases one after another
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    order: u64,
    components: Vec<Component>,
}

impl Group {
    fn new(name: &str, order: u64) -> Self {
        Self {
            name: name.to_string(),
            order,
            components: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation order number, unique and increasing
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Components in registration order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn is_privileged(&self) -> bool {
        self.name == PRIVILEGED_GROUP
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    groups: HashMap<String, Group>,
    members: HashMap<ComponentId, String>,
    next_order: u64,
}

impl RegistryInner {
    /// Existing group, or a new one with the next order number
    fn group_entry(&mut self, name: &str) -> &mut Group {
        let next_order = &mut self.next_order;
        self.groups.entry(name.to_string()).or_insert_with(|| {
            let order = *next_order;
            *next_order += 1;
            debug!(group = name, order, "Group registered");
            Group::new(name, order)
        })
    }
}

/// Thread-safe store of groups and their components.
///
/// Every method takes the internal lock itself; returned groups are
/// snapshots.
#[derive(Debug)]
pub struct ComponentRegistry {
    inner: Mutex<RegistryInner>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Registry holding only the empty privileged group
    pub fn new() -> Self {
        let mut inner = RegistryInner::default();
        inner.group_entry(PRIVILEGED_GROUP);
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn add_group(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.groups.contains_key(name) {
            return Err(OrchestratorError::DuplicateGroup {
                group: name.to_string(),
            });
        }
        inner.group_entry(name);
        Ok(())
    }

    /// Append `component` to `group`, creating the group when absent
    pub fn add_component(&self, group: &str, component: Component) -> Result<()> {
        if !component.is_valid() {
            return Err(OrchestratorError::InvalidComponent {
                component: component.name().to_string(),
            });
        }

        let mut inner = self.inner.lock();
        if inner.members.contains_key(&component.id()) {
            return Err(OrchestratorError::DuplicateComponent {
                component: component.name().to_string(),
            });
        }

        inner.members.insert(component.id(), group.to_string());
        inner.group_entry(group).components.push(component);
        Ok(())
    }

    /// All groups sorted by creation order, privileged group included
    pub fn ordered_groups(&self) -> Vec<Group> {
        let mut groups: Vec<Group> = self.inner.lock().groups.values().cloned().collect();
        groups.sort_by_key(Group::order);
        groups
    }

    pub fn group_by_name(&self, name: &str) -> Result<Group> {
        self.inner
            .lock()
            .groups
            .get(name)
            .cloned()
            .ok_or_else(|| OrchestratorError::GroupNotFound {
                group: name.to_string(),
            })
    }

    /// Every component with a shutdown phase, in no particular order
    pub fn shutdown_capable_components(&self) -> Vec<Component> {
        let inner = self.inner.lock();
        inner
            .groups
            .values()
            .flat_map(|group| group.components.iter())
            .filter(|component| component.is_shutdowner())
            .cloned()
            .collect()
    }

    /// Name of the group `component` was registered to
    pub fn group_of(&self, component: &Component) -> Option<String> {
        self.inner.lock().members.get(&component.id()).cloned()
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.inner.lock().groups.contains_key(name)
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.inner.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::repositories::TaskStore;
use crate::domain::task::{Requirements, Task, TaskEvent, TaskPriority, TaskStatus};

/// In-memory implementation of TaskStore
///
/// Tasks are indexed by id, with a separate list remembering creation
/// order for pending scans and snapshots.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: HashMap<Uuid, Task>,
    order: Vec<Uuid>,
}

impl InMemoryTaskStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn create(
        &mut self,
        description: String,
        requirements: Requirements,
        priority: TaskPriority,
        deadline: DateTime<Utc>,
    ) -> Result<(Task, TaskEvent), String> {
        let (task, event) = Task::new(description, requirements, priority, deadline)?;

        self.order.push(task.id());
        self.tasks.insert(task.id(), task.clone());

        Ok((task, event))
    }

    fn get(&self, id: &Uuid) -> Option<&Task> {
        self.tasks.get(id)
    }

    fn update<F, T>(&mut self, id: &Uuid, mutator: F) -> Option<T>
    where
        F: FnOnce(&mut Task) -> T,
    {
        self.tasks.get_mut(id).map(mutator)
    }

    fn pending_tasks(&self) -> Vec<&Task> {
        self.iter()
            .filter(|task| task.status() == TaskStatus::Pending)
            .collect()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &Task> + '_> {
        Box::new(self.order.iter().filter_map(|id| self.tasks.get(id)))
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::task::{Requirements, Task, TaskEvent, TaskPriority};

/// Store of every task the supervisor has seen, in creation order
///
/// There is no delete: completed and failed tasks stay for the lifetime
/// of the process.
pub trait TaskStore: Send {
    /// Create a pending task with a fresh id
    ///
    /// # Returns
    /// * `Ok((Task, TaskEvent))` - A copy of the stored task and its Created event
    /// * `Err(String)` - If the task fails validation
    fn create(
        &mut self,
        description: String,
        requirements: Requirements,
        priority: TaskPriority,
        deadline: DateTime<Utc>,
    ) -> Result<(Task, TaskEvent), String>;

    /// Find a task by its ID
    fn get(&self, id: &Uuid) -> Option<&Task>;

    /// Run `mutator` against the stored task, if present
    fn update<F, T>(&mut self, id: &Uuid, mutator: F) -> Option<T>
    where
        F: FnOnce(&mut Task) -> T;

    /// Tasks with status pending, oldest first
    ///
    /// Includes tasks that are tentatively offered to an agent.
    fn pending_tasks(&self) -> Vec<&Task>;

    /// All tasks, oldest first
    fn iter(&self) -> Box<dyn Iterator<Item = &Task> + '_>;

    /// Number of tracked tasks
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

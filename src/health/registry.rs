//! Registry of live consumer tasks, in registration order.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::consumer::ConsumerTask;

#[derive(Debug, Default)]
pub struct ConsumerTaskRegistry {
    tasks: RwLock<Vec<Arc<ConsumerTask>>>,
}

impl ConsumerTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the task is already registered
    pub fn register(&self, task: Arc<ConsumerTask>) -> bool {
        let mut tasks = self.tasks.write();
        if tasks.iter().any(|existing| existing.id() == task.id()) {
            return false;
        }
        debug!(task_id = %task.id(), "Registered consumer task");
        tasks.push(task);
        true
    }

    pub fn deregister(&self, task_id: Uuid) -> bool {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|task| task.id() != task_id);
        let removed = tasks.len() != before;
        if removed {
            debug!(task_id = %task_id, "Deregistered consumer task");
        }
        removed
    }

    /// Copy of the registered tasks; the lock is not held by callers
    pub fn tasks(&self) -> Vec<Arc<ConsumerTask>> {
        self.tasks.read().clone()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

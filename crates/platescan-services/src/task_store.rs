use crate::task_types::{TaskId, TaskMetadata, TaskRecord, TaskStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// In-memory store for task records.
///
/// Each record is updated under its shard's write lock, so a reader never
/// sees a status change without the matching `result` / `error`.
#[derive(Clone, Default)]
pub struct TaskStore {
    /// task_id → TaskRecord
    tasks: Arc<DashMap<TaskId, TaskRecord>>,
}

/// Number of tasks in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Create a `Queued` record under a fresh handle.
    pub fn insert_queued(&self, metadata: TaskMetadata) -> TaskId {
        loop {
            let id = TaskId::generate();
            match self.tasks.entry(id) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    slot.insert(TaskRecord::queued(id, metadata, now_ms()));
                    return id;
                }
            }
        }
    }

    /// Snapshot of a task, if it exists.
    pub fn get(&self, id: &TaskId) -> Option<TaskRecord> {
        self.tasks.get(id).map(|t| t.clone())
    }

    pub fn mark_running(&self, id: &TaskId) -> bool {
        self.advance(id, TaskStatus::Running, |_| {})
    }

    /// Store the result and mark the task `Completed`.
    pub fn complete(&self, id: &TaskId, result: serde_json::Value) -> bool {
        self.advance(id, TaskStatus::Completed, |task| task.result = Some(result))
    }

    /// Store the error message and mark the task `Failed`.
    pub fn fail(&self, id: &TaskId, error: String) -> bool {
        self.advance(id, TaskStatus::Failed, |task| task.error = Some(error))
    }

    fn advance(&self, id: &TaskId, next: TaskStatus, apply: impl FnOnce(&mut TaskRecord)) -> bool {
        let Some(mut task) = self.tasks.get_mut(id) else {
            return false;
        };
        if !task.status.can_advance_to(next) {
            tracing::warn!(
                task_id = %id,
                from = task.status.as_str(),
                to = next.as_str(),
                "rejected task status transition"
            );
            return false;
        }
        task.status = next;
        apply(&mut *task);
        task.updated_at = now_ms();
        true
    }

    pub fn remove(&self, id: &TaskId) -> Option<TaskRecord> {
        self.tasks.remove(id).map(|(_, t)| t)
    }

    /// Drop terminal tasks last updated before `cutoff_ms`. Returns how many went.
    pub fn evict_finished_before(&self, cutoff_ms: u64) -> usize {
        let mut evicted = 0;
        self.tasks.retain(|_, t| {
            let expired = t.status.is_terminal() && t.updated_at < cutoff_ms;
            if expired {
                evicted += 1;
            }
            !expired
        });
        evicted
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for t in self.tasks.iter() {
            match t.status {
                TaskStatus::Queued => counts.queued += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Completed => counts.completed += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

//! Task engine: accepts units of work, runs them on a bounded worker pool,
//! and records every task's outcome in the [`TaskStore`].
//!
//! `submit` stores a `Queued` record and pushes the work onto an unbounded
//! queue; it never waits for a free worker. A dispatcher drains the queue,
//! holding one semaphore permit per running task. Work runs on the blocking
//! pool, so a panic surfaces as a join error and is recorded as `Failed`
//! without touching other tasks.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};

use platescan_core::config::EngineSettings;

use crate::task_store::{now_ms, TaskStore};
use crate::task_types::{
    EngineError, TaskError, TaskId, TaskMetadata, TaskOutcome, TaskRecord, Work,
};

struct Job {
    id: TaskId,
    work: Work,
}

/// Handle to a running engine. Clones share the same queue and store.
#[derive(Clone)]
pub struct TaskEngine {
    store: TaskStore,
    job_tx: mpsc::UnboundedSender<Job>,
    workers: usize,
}

impl TaskEngine {
    /// Start the dispatcher. Must be called from within a Tokio runtime.
    pub fn start(settings: &EngineSettings) -> Self {
        Self::with_store(TaskStore::new(), settings)
    }

    pub fn with_store(store: TaskStore, settings: &EngineSettings) -> Self {
        let workers = if settings.max_workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2)
        } else {
            settings.max_workers as usize
        };

        let (job_tx, job_rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch(store.clone(), job_rx, workers));

        tracing::info!(workers, "task engine started");
        Self {
            store,
            job_tx,
            workers,
        }
    }

    /// Queue `work` and return its handle without waiting for it to start.
    pub fn submit<F>(&self, work: F, metadata: TaskMetadata) -> Result<TaskId, EngineError>
    where
        F: FnOnce() -> TaskOutcome + Send + 'static,
    {
        if self.job_tx.is_closed() {
            return Err(EngineError::ShutDown);
        }
        let id = self.store.insert_queued(metadata);
        let job = Job {
            id,
            work: Box::new(work),
        };
        if self.job_tx.send(job).is_err() {
            self.store.remove(&id);
            return Err(EngineError::ShutDown);
        }
        tracing::debug!(task_id = %id, "task queued");
        Ok(id)
    }

    /// Snapshot of a task's current state.
    pub fn get(&self, id: &TaskId) -> Result<TaskRecord, EngineError> {
        self.store.get(id).ok_or(EngineError::NotFound(*id))
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Worker pool size.
    pub fn workers(&self) -> usize {
        self.workers
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Runs until every engine handle is dropped.
async fn dispatch(store: TaskStore, mut job_rx: mpsc::UnboundedReceiver<Job>, workers: usize) {
    let semaphore = Arc::new(Semaphore::new(workers));

    while let Some(job) = job_rx.recv().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break, // semaphore closed
        };

        let store = store.clone();
        tokio::spawn(async move {
            run_job(&store, job).await;
            drop(permit);
        });
    }

    tracing::debug!("task dispatcher stopped");
}

async fn run_job(store: &TaskStore, job: Job) {
    let Job { id, work } = job;
    store.mark_running(&id);

    let start = Instant::now();
    let outcome = match tokio::task::spawn_blocking(work).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            Err(TaskError::Execution(format!(
                "task panicked: {}",
                panic_message(&*payload)
            )))
        }
        Err(e) => Err(TaskError::Execution(format!("task aborted: {e}"))),
    };
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        Ok(result) => {
            store.complete(&id, result);
            tracing::info!(task_id = %id, elapsed_ms, "task completed");
        }
        Err(err) => {
            let mut message = err.to_string();
            if message.is_empty() {
                message = "task failed".to_string();
            }
            tracing::warn!(task_id = %id, elapsed_ms, error = %message, "task failed");
            store.fail(&id, message);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

// ── Retention ─────────────────────────────────────────────────────────────────

/// Runs forever, evicting terminal tasks not updated within `retention`.
pub async fn run_sweeper(store: TaskStore, retention: Duration, every: Duration) {
    let mut interval = tokio::time::interval(every);
    tracing::info!(
        retention_secs = retention.as_secs(),
        "task retention sweeper started"
    );

    loop {
        interval.tick().await;
        let cutoff = now_ms().saturating_sub(retention.as_millis() as u64);
        let evicted = store.evict_finished_before(cutoff);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = store.len(), "evicted finished tasks");
        }
    }
}

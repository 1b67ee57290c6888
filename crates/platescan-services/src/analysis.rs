//! Photo analysis: the unit of work the engine runs for every upload.
//!
//! Classify the image, save the prediction through the food log sink, and
//! return the saved entry as the task result. Either step failing fails
//! the task.

use std::sync::Arc;

use bytes::Bytes;

use platescan_core::Classifier;

use crate::food_log::FoodLogSink;
use crate::task_engine::TaskEngine;
use crate::task_types::{EngineError, TaskError, TaskId, TaskMetadata, TaskOutcome, TaskRecord};

/// Metadata key holding the submitting user's id.
pub const OWNER_KEY: &str = "user_id";

#[derive(Clone)]
pub struct FoodAnalyzer {
    engine: TaskEngine,
    classifier: Classifier,
    sink: Arc<dyn FoodLogSink>,
}

impl FoodAnalyzer {
    pub fn new(engine: TaskEngine, classifier: Classifier, sink: Arc<dyn FoodLogSink>) -> Self {
        Self {
            engine,
            classifier,
            sink,
        }
    }

    /// Queue an analysis of `image` on behalf of `user_id`.
    pub fn submit(&self, user_id: u64, image: Bytes) -> Result<TaskId, EngineError> {
        let classifier = self.classifier.clone();
        let sink = self.sink.clone();

        let mut metadata = TaskMetadata::new();
        metadata.insert(OWNER_KEY.to_string(), user_id.to_string());

        let id = self.engine.submit(
            move || analyze_and_store(&classifier, sink.as_ref(), user_id, &image),
            metadata,
        )?;
        tracing::info!(task_id = %id, user_id, "food analysis submitted");
        Ok(id)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

/// Classify `image` and persist the prediction for `user_id`.
pub fn analyze_and_store(
    classifier: &Classifier,
    sink: &dyn FoodLogSink,
    user_id: u64,
    image: &[u8],
) -> TaskOutcome {
    let prediction = classifier.classify(image)?;
    let log = sink.save(user_id, &prediction)?;
    serde_json::to_value(&log).map_err(|e| TaskError::Execution(e.to_string()))
}

/// The user that submitted a task, if recorded.
pub fn owner_of(record: &TaskRecord) -> Option<u64> {
    record.metadata.get(OWNER_KEY)?.parse().ok()
}

//! Food log persistence: where a finished classification is saved.
//!
//! The analysis task calls a [`FoodLogSink`] after classifying and before
//! the task is marked completed. [`FoodLogStore`] is the in-memory sink the
//! daemon uses; a relational implementation plugs in behind the same trait.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use platescan_core::ClassificationResult;

use crate::task_store::now_ms;
use crate::task_types::TaskError;

/// One saved meal estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLog {
    pub id: u64,
    pub user_id: u64,
    pub label: String,
    pub confidence: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    /// Unix ms.
    pub created_at: u64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FoodLogError {
    #[error("food log store unavailable: {0}")]
    Unavailable(String),
}

impl From<FoodLogError> for TaskError {
    fn from(e: FoodLogError) -> Self {
        TaskError::Execution(e.to_string())
    }
}

/// Persistence callback for classification results.
pub trait FoodLogSink: Send + Sync {
    /// Save a prediction for `user_id`, returning the stored entry.
    fn save(&self, user_id: u64, prediction: &ClassificationResult)
        -> Result<FoodLog, FoodLogError>;
}

/// In-memory food log store
#[derive(Clone, Default)]
pub struct FoodLogStore {
    /// user_id → logs, oldest first
    logs: Arc<DashMap<u64, Vec<FoodLog>>>,
    next_id: Arc<AtomicU64>,
}

impl FoodLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent `limit` logs for a user, newest first.
    pub fn recent(&self, user_id: u64, limit: usize) -> Vec<FoodLog> {
        self.logs
            .get(&user_id)
            .map(|logs| logs.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, user_id: u64) -> usize {
        self.logs.get(&user_id).map(|logs| logs.len()).unwrap_or(0)
    }
}

impl FoodLogSink for FoodLogStore {
    fn save(
        &self,
        user_id: u64,
        prediction: &ClassificationResult,
    ) -> Result<FoodLog, FoodLogError> {
        let log = FoodLog {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            user_id,
            label: prediction.label.clone(),
            confidence: prediction.confidence,
            calories: prediction.macros.calories,
            protein: prediction.macros.protein,
            carbs: prediction.macros.carbs,
            fat: prediction.macros.fat,
            created_at: now_ms(),
        };
        self.logs.entry(user_id).or_default().push(log.clone());
        Ok(log)
    }
}

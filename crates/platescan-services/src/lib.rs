pub mod analysis;
pub mod food_log;
pub mod task_engine;
pub mod task_store;
pub mod task_types;

pub use analysis::{owner_of, FoodAnalyzer, OWNER_KEY};
pub use food_log::{FoodLog, FoodLogError, FoodLogSink, FoodLogStore};
pub use task_engine::{run_sweeper, TaskEngine};
pub use task_store::{StatusCounts, TaskStore};
pub use task_types::{
    EngineError, TaskError, TaskId, TaskMetadata, TaskOutcome, TaskRecord, TaskStatus, Work,
};

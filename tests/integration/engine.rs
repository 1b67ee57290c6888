use crate::*;

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use platescan_services::{
    owner_of, EngineError, FoodAnalyzer, FoodLogStore, TaskError, TaskMetadata, TaskStatus,
};

fn rank(status: TaskStatus) -> u8 {
    match status {
        TaskStatus::Queued => 0,
        TaskStatus::Running => 1,
        TaskStatus::Completed | TaskStatus::Failed => 2,
    }
}

/// Observed statuses only move forward, and a terminal state never changes.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_status_transitions_are_monotonic() {
    let engine = engine_with_workers(1);
    let store = FoodLogStore::new();
    let analyzer = FoodAnalyzer::new(engine.clone(), reference_classifier(), Arc::new(store));

    let images = [CHICKEN, SALAD, RICE, OATMEAL, SALMON];
    let ids: Vec<_> = images
        .iter()
        .enumerate()
        .map(|(i, rgb)| {
            let bytes = if i == 2 {
                Bytes::from_static(b"not an image at all")
            } else {
                Bytes::from(solid_image(800, 600, *rgb, image::ImageFormat::Png))
            };
            analyzer.submit(1, bytes).unwrap()
        })
        .collect();

    let mut last = vec![0u8; ids.len()];
    let mut terminal: Vec<Option<platescan_services::TaskRecord>> = vec![None; ids.len()];
    for _ in 0..2000 {
        for (i, id) in ids.iter().enumerate() {
            let task = engine.get(id).unwrap();
            let r = rank(task.status);
            assert!(r >= last[i], "task {id} moved backwards");
            last[i] = r;
            match &terminal[i] {
                Some(done) => assert_eq!(&task, done, "terminal task {id} changed"),
                None if task.status.is_terminal() => terminal[i] = Some(task),
                None => {}
            }
        }
        if terminal.iter().all(Option::is_some) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let terminal: Vec<_> = terminal.into_iter().map(|t| t.expect("task finished")).collect();
    assert_eq!(terminal[0].status, TaskStatus::Completed);
    assert_eq!(terminal[2].status, TaskStatus::Failed);
    assert!(terminal[2].result.is_none());
    assert!(!terminal[2].error.as_deref().unwrap_or("").is_empty());
    assert_eq!(terminal[4].result.as_ref().unwrap()["label"], "salmon fillet");
}

#[tokio::test]
async fn test_unknown_handle_is_not_found() {
    let engine = engine_with_workers(2);
    for _ in 0..10 {
        let id = TaskId::generate();
        assert_eq!(engine.get(&id), Err(EngineError::NotFound(id)));
    }
}

/// Heavy parallel submission loses nothing and never repeats a handle.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_submissions_are_distinct() {
    let engine = engine_with_workers(3);

    let mut joins = Vec::new();
    for t in 0..16 {
        let engine = engine.clone();
        joins.push(tokio::spawn(async move {
            (0..100)
                .map(|n| {
                    let mut metadata = TaskMetadata::new();
                    metadata.insert("n".into(), format!("{t}-{n}"));
                    engine
                        .submit(move || Ok(serde_json::json!(n)), metadata)
                        .unwrap()
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut ids = Vec::new();
    for j in joins {
        ids.extend(j.await.unwrap());
    }
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 1600);

    for id in &ids {
        assert_eq!(wait_terminal(&engine, id).await.status, TaskStatus::Completed);
    }
    assert_eq!(engine.store().counts().completed, 1600);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_always_failing_work_yields_failed_record() {
    let engine = engine_with_workers(2);
    let id = engine
        .submit(
            || Err(TaskError::Execution("simulated fault".into())),
            TaskMetadata::new(),
        )
        .unwrap();

    let task = wait_terminal(&engine, &id).await;
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("simulated fault"));
    assert!(task.result.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_faults_do_not_affect_neighbours() {
    let engine = engine_with_workers(2);
    let mut ids = Vec::new();
    for i in 0..10 {
        let id = if i % 2 == 0 {
            engine.submit(move || panic!("fault {i}"), TaskMetadata::new())
        } else {
            engine.submit(move || Ok(serde_json::json!(i)), TaskMetadata::new())
        };
        ids.push(id.unwrap());
    }

    for (i, id) in ids.iter().enumerate() {
        let task = wait_terminal(&engine, id).await;
        if i % 2 == 0 {
            assert_eq!(task.status, TaskStatus::Failed);
            assert!(task.error.unwrap().contains(&format!("fault {i}")));
        } else {
            assert_eq!(task.status, TaskStatus::Completed);
            assert_eq!(task.result, Some(serde_json::json!(i)));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_owner_metadata_survives_completion() {
    let engine = engine_with_workers(1);
    let logs = FoodLogStore::new();
    let analyzer = FoodAnalyzer::new(
        engine.clone(),
        reference_classifier(),
        Arc::new(logs.clone()),
    );

    let id = analyzer.submit(77, Bytes::from(solid_png(RICE))).unwrap();
    let task = wait_terminal(&engine, &id).await;

    assert_eq!(owner_of(&task), Some(77));
    assert_eq!(task.result.unwrap()["user_id"], 77);
    assert_eq!(logs.recent(77, 10).len(), 1);
}

//! /food handlers: photo upload, task polling, and the caller's food logs.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;

use platescan_services::{owner_of, EngineError, FoodLog, TaskId, TaskStatus};

use super::{caller_id, ApiState};

/// Multipart field the image is uploaded under.
pub const IMAGE_FIELD: &str = "image";

// ── /food/analyze (POST) ──────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

pub async fn handle_analyze(
    State(state): State<ApiState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalyzeResponse>), (StatusCode, String)> {
    let user_id = caller_id(&headers)?;

    let mut image: Option<Bytes> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        if let Some(name) = field.file_name() {
            if !extension_allowed(name, &state.config.allowed_extensions) {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!(
                        "allowed formats: {}",
                        state.config.allowed_extensions.join(", ")
                    ),
                ));
            }
        }
        image = Some(field.bytes().await.map_err(multipart_error)?);
        break;
    }

    let image = image.ok_or((
        StatusCode::BAD_REQUEST,
        format!("image is required under field name '{}'", IMAGE_FIELD),
    ))?;
    if image.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "uploaded image is empty".to_string()));
    }

    let size = image.len();
    let task_id = state
        .analyzer
        .submit(user_id, image)
        .map_err(engine_error)?;

    tracing::debug!(task_id = %task_id, user_id, size, "upload accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeResponse {
            task_id: task_id.to_string(),
            status: TaskStatus::Queued,
        }),
    ))
}

// ── /food/tasks/{task_id} (GET) ───────────────────────────────────────────────

#[derive(Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub async fn handle_task(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Result<Json<TaskResponse>, (StatusCode, String)> {
    let user_id = caller_id(&headers)?;

    // A malformed handle was never issued, so it is simply unknown.
    let id: TaskId = task_id
        .parse()
        .map_err(|_| (StatusCode::NOT_FOUND, "task not found".to_string()))?;
    let task = state.engine.get(&id).map_err(engine_error)?;

    if owner_of(&task) != Some(user_id) {
        return Err((
            StatusCode::FORBIDDEN,
            "task does not belong to current user".to_string(),
        ));
    }

    Ok(Json(TaskResponse {
        task_id,
        status: task.status,
        result: task.result,
        error: task.error,
    }))
}

// ── /food/logs (GET) ──────────────────────────────────────────────────────────

pub async fn handle_logs(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<Vec<FoodLog>>, (StatusCode, String)> {
    let user_id = caller_id(&headers)?;
    Ok(Json(
        state
            .food_logs
            .recent(user_id, state.config.log_list_limit),
    ))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn extension_allowed(filename: &str, allowed: &[String]) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| allowed.iter().any(|a| *a == ext))
}

fn multipart_error(e: MultipartError) -> (StatusCode, String) {
    (e.status(), e.body_text())
}

fn engine_error(e: EngineError) -> (StatusCode, String) {
    let status = match e {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, e.to_string())
}

//! /status handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use platescan_services::StatusCounts;

use super::ApiState;

#[derive(Serialize)]
pub struct StatusResponse {
    pub workers: usize,
    pub tasks: StatusCounts,
    pub catalog: Vec<String>,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let catalog = state
        .analyzer
        .classifier()
        .catalog()
        .labels()
        .into_iter()
        .map(str::to_string)
        .collect();

    Json(StatusResponse {
        workers: state.engine.workers(),
        tasks: state.engine.store().counts(),
        catalog,
    })
}

use crate::*;

use std::time::Duration;

use anyhow::Result;
use platescan_api::handlers::USER_HEADER;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;

fn image_form(bytes: Vec<u8>, file_name: &str) -> Form {
    Form::new().part("image", Part::bytes(bytes).file_name(file_name.to_string()))
}

async fn upload(server: &TestServer, user: u64, form: Form) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .post(format!("{}/food/analyze", server.base_url))
        .header(USER_HEADER, user.to_string())
        .multipart(form)
        .send()
        .await?)
}

async fn fetch_task(server: &TestServer, user: u64, id: &str) -> Result<reqwest::Response> {
    Ok(reqwest::Client::new()
        .get(format!("{}/food/tasks/{}", server.base_url, id))
        .header(USER_HEADER, user.to_string())
        .send()
        .await?)
}

/// Poll a task over HTTP until it is terminal.
async fn poll_terminal(server: &TestServer, user: u64, id: &str) -> Result<Value> {
    for _ in 0..500 {
        let body: Value = fetch_task(server, user, id).await?.json().await?;
        if body["status"] == "completed" || body["status"] == "failed" {
            return Ok(body);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("task {id} did not finish")
}

async fn submit_png(server: &TestServer, user: u64, rgb: [u8; 3]) -> Result<String> {
    let resp = upload(server, user, image_form(solid_png(rgb), "meal.png")).await?;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await?;
    assert_eq!(body["status"], "queued");
    Ok(body["task_id"].as_str().unwrap().to_string())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_requests_without_identity_are_rejected() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/food/analyze", server.base_url))
        .multipart(image_form(solid_png(CHICKEN), "meal.png"))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .get(format!("{}/food/logs", server.base_url))
        .header(USER_HEADER, "not-a-number")
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_analyze_then_poll_to_completion() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let id = submit_png(&server, 1, CHICKEN).await?;
    let body = poll_terminal(&server, 1, &id).await?;

    assert_eq!(body["task_id"], id.as_str());
    assert_eq!(body["status"], "completed");
    assert!(body["error"].is_null());
    let result = &body["result"];
    assert_eq!(result["label"], "grilled chicken breast");
    assert_eq!(result["calories"], 220.0);
    assert_eq!(result["protein"], 40.0);
    assert_eq!(result["user_id"], 1);
    let confidence = result["confidence"].as_f64().unwrap();
    assert!((confidence - 0.2193).abs() <= 2e-4);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_task_is_private_to_its_owner() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let id = submit_png(&server, 1, SALAD).await?;
    let resp = fetch_task(&server, 2, &id).await?;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // The owner still sees it.
    assert_eq!(poll_terminal(&server, 1, &id).await?["status"], "completed");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_and_malformed_handles_are_not_found() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let unknown = TaskId::generate().to_string();
    assert_eq!(
        fetch_task(&server, 1, &unknown).await?.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        fetch_task(&server, 1, "definitely-not-a-handle").await?.status(),
        StatusCode::NOT_FOUND
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_undecodable_upload_fails_the_task() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let resp = upload(
        &server,
        3,
        image_form(b"this is plain text".to_vec(), "photo.jpg"),
    )
    .await?;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await?;
    let id = body["task_id"].as_str().unwrap();

    let body = poll_terminal(&server, 3, id).await?;
    assert_eq!(body["status"], "failed");
    assert!(body["result"].is_null());
    assert!(!body["error"].as_str().unwrap().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_uploads_are_bad_requests() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let wrong_field = Form::new().part(
        "photo",
        Part::bytes(solid_png(RICE)).file_name("meal.png"),
    );
    assert_eq!(
        upload(&server, 1, wrong_field).await?.status(),
        StatusCode::BAD_REQUEST
    );

    let wrong_ext = image_form(solid_png(RICE), "notes.txt");
    assert_eq!(
        upload(&server, 1, wrong_ext).await?.status(),
        StatusCode::BAD_REQUEST
    );

    let empty = image_form(Vec::new(), "empty.png");
    assert_eq!(
        upload(&server, 1, empty).await?.status(),
        StatusCode::BAD_REQUEST
    );

    // Nothing was queued.
    assert_eq!(server.state.engine.store().len(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_oversized_upload_is_rejected() -> Result<()> {
    let server = start_server(ApiConfig {
        max_upload_bytes: 256,
        ..ApiConfig::default()
    })
    .await;

    let resp = upload(&server, 1, image_form(vec![0x89; 2048], "big.png")).await?;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(server.state.engine.store().len(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_logs_list_completed_analyses_newest_first() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let first = submit_png(&server, 8, OATMEAL).await?;
    poll_terminal(&server, 8, &first).await?;
    let second = submit_png(&server, 8, SALMON).await?;
    poll_terminal(&server, 8, &second).await?;
    // Another user's analysis does not leak into user 8's logs.
    let other = submit_png(&server, 9, RICE).await?;
    poll_terminal(&server, 9, &other).await?;

    let logs: Vec<Value> = reqwest::Client::new()
        .get(format!("{}/food/logs", server.base_url))
        .header(USER_HEADER, "8")
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["label"], "salmon fillet");
    assert_eq!(logs[1]["label"], "oatmeal with berries");
    assert!(logs.iter().all(|l| l["user_id"] == 8));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_status_reports_pool_and_catalog() -> Result<()> {
    let server = start_server(ApiConfig::default()).await;

    let body: Value = reqwest::get(format!("{}/status", server.base_url))
        .await?
        .json()
        .await?;

    assert_eq!(body["workers"], 2);
    assert_eq!(body["catalog"].as_array().unwrap().len(), 5);
    assert_eq!(body["catalog"][0], "grilled chicken breast");
    assert_eq!(body["tasks"]["queued"], 0);
    Ok(())
}

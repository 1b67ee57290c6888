//! Food analysis commands: upload, poll, and list logs.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use super::http::{base_url, get_json, post_multipart};

#[derive(Deserialize)]
struct AnalyzeResponse {
    task_id: String,
    status: String,
}

#[derive(Deserialize)]
struct TaskResponse {
    task_id: String,
    status: String,
    result: Option<FoodLogJson>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[allow(dead_code)]
struct FoodLogJson {
    id: u64,
    user_id: u64,
    label: String,
    confidence: f64,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    created_at: u64,
}

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLL_ATTEMPTS: usize = 120;

pub async fn cmd_analyze(port: u16, user: u64, path: &str, wait: bool) -> Result<()> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path))?;
    let file_name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.png".to_string());

    let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("image", part);

    let resp: AnalyzeResponse =
        post_multipart(&format!("{}/food/analyze", base_url(port)), user, form).await?;
    println!("Task {} {}", resp.task_id, resp.status);

    if !wait {
        return Ok(());
    }

    for _ in 0..POLL_ATTEMPTS {
        tokio::time::sleep(POLL_INTERVAL).await;
        let task = fetch_task(port, user, &resp.task_id).await?;
        if task.status == "completed" || task.status == "failed" {
            print_task(&task);
            return Ok(());
        }
    }
    bail!("task {} did not finish in time", resp.task_id)
}

pub async fn cmd_task(port: u16, user: u64, task_id: &str) -> Result<()> {
    let task = fetch_task(port, user, task_id).await?;
    print_task(&task);
    Ok(())
}

pub async fn cmd_logs(port: u16, user: u64) -> Result<()> {
    let logs: Vec<FoodLogJson> =
        get_json(&format!("{}/food/logs", base_url(port)), user).await?;

    if logs.is_empty() {
        println!("No food logs for user {}.", user);
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Food Logs ({})", logs.len());
    println!("═══════════════════════════════════════");
    for log in &logs {
        print_log(log);
    }
    Ok(())
}

async fn fetch_task(port: u16, user: u64, task_id: &str) -> Result<TaskResponse> {
    get_json(&format!("{}/food/tasks/{}", base_url(port), task_id), user).await
}

fn print_task(t: &TaskResponse) {
    println!("  ┌─ {}", t.task_id);
    println!("  │  status : {}", t.status);
    if let Some(err) = &t.error {
        println!("  └─ error  : {}", err);
    } else if let Some(log) = &t.result {
        print_log(log);
    } else {
        println!("  └─ (pending)");
    }
}

fn print_log(log: &FoodLogJson) {
    println!("  ┌─ #{} {}", log.id, log.label);
    println!("  │  confidence : {:.4}", log.confidence);
    println!("  │  calories   : {:.1}", log.calories);
    println!("  │  protein    : {:.1} g", log.protein);
    println!("  │  carbs      : {:.1} g", log.carbs);
    println!("  └─ fat        : {:.1} g", log.fat);
}

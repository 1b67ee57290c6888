//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    workers: usize,
    tasks: TaskCounts,
    catalog: Vec<String>,
}

#[derive(Deserialize)]
struct TaskCounts {
    queued: usize,
    running: usize,
    completed: usize,
    failed: usize,
}

pub async fn cmd_status(port: u16, user: u64) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port)), user).await?;

    println!("═══════════════════════════════════════");
    println!("  Platescan Daemon Status");
    println!("═══════════════════════════════════════");
    println!("  Workers    : {}", resp.workers);
    println!("  Queued     : {}", resp.tasks.queued);
    println!("  Running    : {}", resp.tasks.running);
    println!("  Completed  : {}", resp.tasks.completed);
    println!("  Failed     : {}", resp.tasks.failed);
    println!("\n  Catalog:");
    for label in &resp.catalog {
        println!("    • {}", label);
    }

    Ok(())
}

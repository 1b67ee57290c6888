//! platescan-ctl: command-line interface for the Platescan daemon.

mod cmd;

use anyhow::{Context, Result};

const DEFAULT_PORT: u16 = 9101;
const DEFAULT_USER: u64 = 1;

fn print_usage() {
    println!("Usage: platescan-ctl [--port <port>] [--user <id>] <command>");
    println!();
    println!("Commands:");
    println!("  status                  Show worker pool, task counts, and catalog");
    println!("  analyze <image> [--wait] Upload a meal photo for analysis");
    println!("  task <task_id>          Show a task's status and result");
    println!("  logs                    List your recent food logs");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
    println!("  --user <id>     User id sent as x-user-id (default: {})", DEFAULT_USER);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut port = DEFAULT_PORT;
    let mut user = DEFAULT_USER;
    let mut wait = false;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                i += 1;
                port = args
                    .get(i)
                    .context("--port requires a value")?
                    .parse()
                    .context("--port must be a number")?;
            }
            "--user" => {
                i += 1;
                user = args
                    .get(i)
                    .context("--user requires a value")?
                    .parse()
                    .context("--user must be a number")?;
            }
            "--wait" => wait = true,
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd::status::cmd_status(port, user).await,
        ["analyze", path] => cmd::food::cmd_analyze(port, user, path, wait).await,
        ["task", task_id] => cmd::food::cmd_task(port, user, task_id).await,
        ["logs"] => cmd::food::cmd_logs(port, user).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}

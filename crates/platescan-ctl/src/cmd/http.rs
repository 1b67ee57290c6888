//! Shared HTTP request helpers for CLI commands.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const USER_HEADER: &str = "x-user-id";

pub fn base_url(port: u16) -> String {
    format!("http://127.0.0.1:{}/api", port)
}

pub async fn get_json<T: for<'de> Deserialize<'de>>(url: &str, user: u64) -> Result<T> {
    let resp = reqwest::Client::new()
        .get(url)
        .header(USER_HEADER, user.to_string())
        .send()
        .await
        .with_context(|| format!("failed to connect to platescand at {}, is it running?", url))?;
    decode(resp).await
}

pub async fn post_multipart<T: for<'de> Deserialize<'de>>(
    url: &str,
    user: u64,
    form: reqwest::multipart::Form,
) -> Result<T> {
    let resp = reqwest::Client::new()
        .post(url)
        .header(USER_HEADER, user.to_string())
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to connect to platescand at {}, is it running?", url))?;
    decode(resp).await
}

async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("platescand returned {}: {}", status, body);
    }
    resp.json::<T>().await.context("failed to parse response")
}

//! Single-shot client: request a quote from the server, write it to a file.

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{FileWriteError, RequestError};
use crate::server::QuoteResponse;

/// Fetches a quote and writes it to the configured output file.
///
/// Any failure aborts the run. The file is only touched after a successful
/// fetch, so a failed run never leaves a partial file behind.
pub async fn run(config: &AppConfig) -> Result<()> {
    let bid = fetch_quote(&config.client.server_url, config.timeouts.client()).await?;
    save_quote(&config.client.output_path, &bid)?;

    info!(bid, path = %config.client.output_path.display(), "Saved quote");
    println!("Cotação salva com sucesso!");
    Ok(())
}

/// GET /cotacao against the quote server, bounded by `deadline`.
pub async fn fetch_quote(server_url: &str, deadline: Duration) -> Result<String, RequestError> {
    let url = format!("{server_url}/cotacao");
    debug!("Requesting quote from {}", url);

    timeout(deadline, request_quote(&url))
        .await
        .map_err(|_| RequestError::DeadlineExceeded(deadline))?
}

async fn request_quote(url: &str) -> Result<String, RequestError> {
    let client = reqwest::Client::builder()
        .user_agent("cotacao/0.1")
        .build()?;

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(RequestError::Status(response.status()));
    }

    let text = response.text().await?;
    let quote: QuoteResponse = serde_json::from_str(&text)?;
    Ok(quote.bid)
}

/// Overwrites `path` with the quote line.
pub fn save_quote(path: &Path, bid: &str) -> Result<(), FileWriteError> {
    fs::write(path, format!("Dólar: {bid}")).map_err(|source| FileWriteError {
        path: path.to_path_buf(),
        source,
    })
}

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::rate_provider::RateProvider;

// AwesomeApiProvider implementation for RateProvider
pub struct AwesomeApiProvider {
    base_url: String,
}

impl AwesomeApiProvider {
    pub fn new(base_url: &str) -> Self {
        AwesomeApiProvider {
            base_url: base_url.to_string(),
        }
    }

    async fn request_bid(&self, url: &str) -> Result<String, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent("cotacao/0.1")
            .build()?;

        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let text = response.text().await?;
        let envelope: RateEnvelope = serde_json::from_str(&text)?;
        Ok(envelope.usd_brl.bid)
    }
}

#[derive(Debug, Deserialize)]
struct RateEnvelope {
    #[serde(rename = "USDBRL")]
    usd_brl: PairQuote,
}

#[derive(Debug, Deserialize)]
struct PairQuote {
    bid: String,
}

#[async_trait]
impl RateProvider for AwesomeApiProvider {
    async fn fetch_rate(&self, deadline: Duration) -> Result<String, FetchError> {
        let url = format!("{}/json/last/USD-BRL", self.base_url);
        debug!("Requesting exchange rate from {}", url);

        let started = Instant::now();
        let outcome = timeout(deadline, self.request_bid(&url)).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Ok(bid)) => {
                info!(?elapsed, "Upstream quote API answered");
                Ok(bid)
            }
            Ok(Err(err)) => {
                warn!(?elapsed, error = %err, "Upstream quote API call failed");
                Err(err)
            }
            Err(_) => {
                warn!(?elapsed, "Upstream quote API exceeded its budget");
                Err(FetchError::DeadlineExceeded(deadline))
            }
        }
    }
}

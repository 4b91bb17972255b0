//! Provides the USD/BRL exchange rate for the quote server.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::FetchError;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches the current bid price, bounded by `deadline`.
    async fn fetch_rate(&self, deadline: Duration) -> Result<String, FetchError>;
}

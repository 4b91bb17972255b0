//! Error types for the quote pipeline.
//!
//! Each stage of the pipeline has its own error kind because each has a
//! different propagation policy: a `FetchError` turns into an HTTP 500, a
//! `PersistError` is logged and swallowed, and the client-side errors are
//! fatal to the process.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure while fetching the exchange rate from the upstream API.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Network-level failure against the upstream API.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Upstream body did not match the expected envelope.
    #[error("failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The whole upstream call did not finish within its budget.
    #[error("upstream call exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),
}

/// Failure while appending a quote record to the local store.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The insert did not finish within its budget.
    #[error("database write exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),
}

/// Client-side failure while requesting a quote from the server.
#[derive(Error, Debug)]
pub enum RequestError {
    /// Network-level failure against the quote server.
    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status.
    #[error("quote server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Response body did not match the expected envelope.
    #[error("failed to decode quote response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The whole request did not finish within its budget.
    #[error("quote request exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),
}

/// Client-side failure while writing the quote to the output file.
#[derive(Error, Debug)]
#[error("failed to write quote to {}: {source}", path.display())]
pub struct FileWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

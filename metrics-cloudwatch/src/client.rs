//! The client abstraction batches are submitted through.

use thiserror::Error;

use crate::protocol::PutMetricDataInput;

/// Raised by a [`PutMetricsClient`] when a batch could not be submitted.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request body could not be serialized.
    #[error("failed to serialize request")]
    Serialize(#[from] serde_json::Error),
    /// The request could not be sent.
    #[cfg(feature = "reqwest")]
    #[error("failed to send request")]
    Http(#[from] reqwest::Error),
    /// The endpoint rejected the request.
    #[error("endpoint responded with status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The response body, possibly empty.
        body: String,
    },
    /// Any other client specific failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ClientError {
    /// Wraps an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        ClientError::Other(error.into())
    }
}

/// Submits one batch of datums to the metrics backend.
///
/// The client is called once per batch and must not retry on its own; the
/// exporter decides what happens after a failure.
pub trait PutMetricsClient: Send + Sync + 'static {
    /// Submits a batch.
    fn put_metric_data(&self, input: &PutMetricDataInput) -> Result<(), ClientError>;
}

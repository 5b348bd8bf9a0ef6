//! Error types for data collection
//!
//! This module defines the error type returned by collectors.

use thiserror::Error;

use crate::models::Source;

/// Errors that can occur while collecting observations from a source
#[derive(Error, Debug)]
pub enum CollectError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Source answered with a non-success status
    #[error("{platform} returned status {status}")]
    Status { platform: Source, status: u16 },

    /// Rate limit exceeded upstream
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Request or collector timeout
    #[error("Collector timed out after {0}s")]
    Timeout(u64),

    /// Maximum retry attempts exceeded
    #[error("Maximum retry attempts exceeded: {0}")]
    MaxRetriesExceeded(String),

    /// Payload could not be decoded into feed items
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Source has no usable endpoint configured
    #[error("Source {0} is not configured")]
    NotConfigured(Source),

    /// Invalid endpoint URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl CollectError {
    /// Whether retrying the same request could succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::RateLimit | Self::Timeout(_) => true,
            Self::MaxRetriesExceeded(_)
            | Self::Decode(_)
            | Self::NotConfigured(_)
            | Self::InvalidUrl(_) => false,
        }
    }
}

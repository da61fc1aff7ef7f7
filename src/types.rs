// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types for batch content extraction

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of fetching and extracting a single URL
///
/// One outcome is produced for every input URL, in input order. `url`
/// always echoes the originating request string, never the post-redirect
/// address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// The URL exactly as submitted
    pub url: String,
    /// Whether text was extracted
    pub success: bool,
    /// Page title if one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extracted main content, present iff `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Symbolic error name, present iff not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Human-readable error detail, present iff not `success`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExtractionOutcome {
    /// Build a successful outcome
    pub fn success(url: impl Into<String>, title: Option<String>, text: String) -> Self {
        Self {
            url: url.into(),
            success: true,
            title,
            text: Some(text),
            error_kind: None,
            error_message: None,
        }
    }

    /// Build a failed outcome from an extraction error
    pub fn failure(url: impl Into<String>, error: &ExtractError) -> Self {
        Self {
            url: url.into(),
            success: false,
            title: None,
            text: None,
            error_kind: Some(error.kind()),
            error_message: Some(error.to_string()),
        }
    }
}

/// Symbolic error categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Empty or malformed URL
    InvalidInput,
    /// Non-http(s) scheme or blocked private/loopback target
    UnsafeUrl,
    /// DNS, TCP or TLS failure
    ConnectionError,
    /// Connect or read budget exceeded
    TimeoutError,
    /// Non-success HTTP status
    HttpError,
    /// Response body too short to hold content
    EmptyResponse,
    /// No extraction stage produced acceptable text
    ExtractionFailed,
    /// Batch deadline fired before this URL completed
    DeadlineExceeded,
    /// No worker result was collected for this URL
    MissingResult,
}

/// Errors that can occur while fetching and extracting a single URL
///
/// Every variant is caught at the fetch-extract unit boundary and turned
/// into a failed [`ExtractionOutcome`]; none of these abort a batch.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// URL was empty or failed to parse
    #[error("Invalid URL: {reason}")]
    InvalidInput {
        /// Why the URL was rejected
        reason: String,
    },

    /// URL targets a scheme or network this node refuses to fetch
    #[error("Unsafe URL blocked: {url}")]
    UnsafeUrl {
        /// The offending URL
        url: String,
    },

    /// Request could not reach the host
    #[error("Connection failed: {message}")]
    Connection {
        /// Underlying transport error text
        message: String,
    },

    /// Request exceeded its per-attempt time budget, retries included
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout {
        /// The budget that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// Host answered with a non-success status, retries included
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Canonical reason phrase
        reason: String,
    },

    /// Host answered but the body was too short to hold content
    #[error("Response body too short: {length} bytes")]
    EmptyResponse {
        /// Trimmed body length in bytes
        length: usize,
    },

    /// Every extraction stage failed its quality bar
    #[error("No readable content could be extracted")]
    ExtractionFailed,

    /// The batch deadline fired while this URL was still in flight
    #[error("Batch deadline exceeded before completion")]
    DeadlineExceeded,

    /// The worker for this URL vanished without reporting
    #[error("No result was produced for this URL")]
    MissingResult,
}

impl ExtractError {
    /// Symbolic category for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnsafeUrl { .. } => ErrorKind::UnsafeUrl,
            Self::Connection { .. } => ErrorKind::ConnectionError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::HttpStatus { .. } => ErrorKind::HttpError,
            Self::EmptyResponse { .. } => ErrorKind::EmptyResponse,
            Self::ExtractionFailed => ErrorKind::ExtractionFailed,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::MissingResult => ErrorKind::MissingResult,
        }
    }
}

/// Request-level errors for a whole batch
///
/// Per-URL failures never surface here; they become failed outcomes.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The submitted URL list was empty
    #[error("URL batch must not be empty")]
    EmptyBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_shape() {
        let outcome =
            ExtractionOutcome::success("https://example.com", Some("Title".to_string()), "Body text".to_string());
        assert!(outcome.success);
        assert_eq!(outcome.url, "https://example.com");
        assert_eq!(outcome.text.as_deref(), Some("Body text"));
        assert_eq!(outcome.title.as_deref(), Some("Title"));
        assert!(outcome.error_kind.is_none());
        assert!(outcome.error_message.is_none());
    }

    #[test]
    fn test_failure_outcome_shape() {
        let error = ExtractError::HttpStatus {
            status: 404,
            reason: "Not Found".to_string(),
        };
        let outcome = ExtractionOutcome::failure("https://example.com/missing", &error);
        assert!(!outcome.success);
        assert!(outcome.text.is_none());
        assert_eq!(outcome.error_kind, Some(ErrorKind::HttpError));
        assert_eq!(outcome.error_message.as_deref(), Some("HTTP 404: Not Found"));
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let error = ExtractError::Timeout { timeout_ms: 25000 };
        let outcome = ExtractionOutcome::failure("https://example.com", &error);
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["errorKind"], "timeoutError");
        assert!(value["errorMessage"].as_str().unwrap().contains("25000ms"));
        // absent optionals are omitted entirely
        assert!(value.get("text").is_none());
        assert!(value.get("title").is_none());
    }

    #[test]
    fn test_error_kind_mapping() {
        let cases = [
            (
                ExtractError::InvalidInput {
                    reason: "empty".to_string(),
                },
                ErrorKind::InvalidInput,
            ),
            (
                ExtractError::UnsafeUrl {
                    url: "ftp://x".to_string(),
                },
                ErrorKind::UnsafeUrl,
            ),
            (
                ExtractError::Connection {
                    message: "refused".to_string(),
                },
                ErrorKind::ConnectionError,
            ),
            (ExtractError::Timeout { timeout_ms: 5000 }, ErrorKind::TimeoutError),
            (ExtractError::EmptyResponse { length: 3 }, ErrorKind::EmptyResponse),
            (ExtractError::ExtractionFailed, ErrorKind::ExtractionFailed),
            (ExtractError::DeadlineExceeded, ErrorKind::DeadlineExceeded),
            (ExtractError::MissingResult, ErrorKind::MissingResult),
        ];
        for (error, kind) in cases {
            assert_eq!(error.kind(), kind);
        }
    }

    #[test]
    fn test_error_display() {
        let error = ExtractError::EmptyResponse { length: 5 };
        assert_eq!(error.to_string(), "Response body too short: 5 bytes");

        let error = ExtractError::UnsafeUrl {
            url: "http://localhost/admin".to_string(),
        };
        assert!(error.to_string().contains("localhost"));
    }

    #[test]
    fn test_batch_error_display() {
        assert_eq!(BatchError::EmptyBatch.to_string(), "URL batch must not be empty");
    }
}

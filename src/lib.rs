// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch web-content extraction node
//!
//! Accepts a batch of URLs and returns, for each one, extracted
//! main-content text or a structured error, inside a bounded wall-clock
//! budget.
//!
//! ## Architecture
//!
//! ```text
//! URLs → ExtractService → UrlProcessor (per URL) → FetchClient → HTML
//!             ↓                                         ↑
//!       deadline timer                            HeaderPolicy
//!                                                       ↓
//!                                  extractor (DOM passes → tag fallback)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let config = ExtractConfig::from_env();
//! let service = ExtractService::new(config);
//!
//! let urls = vec!["https://example.com/story".to_string()];
//! let outcomes = service.process_batch(&urls).await?;
//! ```

pub mod client;
pub mod config;
pub mod extractor;
pub mod headers;
pub mod processor;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::{ExtractConfig, ExtractionSettings, RetryConfig};
pub use headers::{DomainHeaderRule, HeaderPolicy, DEFAULT_USER_AGENT};
pub use service::ExtractService;
pub use types::{BatchError, ErrorKind, ExtractError, ExtractionOutcome};

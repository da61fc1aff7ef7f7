// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pooled HTTP fetching with retries and timeout tiers
//!
//! One shared client carries all batch traffic; connection establishment
//! and response reading get separate budgets so a slow-to-connect host
//! fails fast while a slow-to-stream host keeps its latitude.

use reqwest::header::HeaderMap;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{ExtractConfig, RetryConfig};
use crate::types::ExtractError;

/// A fetched page with its transport metadata
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Decoded response body
    pub body: String,
    /// Final HTTP status
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
}

/// Shared HTTP client for page fetching
pub struct FetchClient {
    client: Client,
    retry: RetryConfig,
    connect_timeout_ms: u64,
    read_timeout_ms: u64,
}

impl FetchClient {
    /// Build the pooled client from configuration
    pub fn new(config: &ExtractConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(Policy::limited(5))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            retry: config.retry.clone(),
            connect_timeout_ms: config.connect_timeout_secs * 1000,
            read_timeout_ms: config.read_timeout_secs * 1000,
        }
    }

    /// GET a page, retrying transparently
    ///
    /// Connect-phase failures, read-phase failures and retryable status
    /// codes each consume their own budget; the caller sees only the
    /// terminal result.
    pub async fn fetch(&self, url: &str, headers: HeaderMap) -> Result<FetchedPage, ExtractError> {
        let mut connect_failures: u32 = 0;
        let mut read_failures: u32 = 0;
        let mut status_retries: u32 = 0;

        loop {
            let result = self.client.get(url).headers(headers.clone()).send().await;

            let response = match result {
                Ok(response) => response,
                Err(error) if error.is_connect() => {
                    connect_failures += 1;
                    if connect_failures < self.retry.connect_attempts {
                        let delay = self.retry.backoff_delay(connect_failures - 1);
                        debug!(
                            "Connect attempt {} failed for {} ({}), retrying in {:?}",
                            connect_failures, url, error, delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    warn!(
                        "Giving up on {} after {} connect attempts: {}",
                        url, connect_failures, error
                    );
                    return Err(self.classify(error));
                }
                Err(error) => {
                    read_failures += 1;
                    if error.is_timeout() && read_failures < self.retry.read_attempts {
                        let delay = self.retry.backoff_delay(read_failures - 1);
                        debug!(
                            "Read attempt {} timed out for {}, retrying in {:?}",
                            read_failures, url, delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    warn!("Request to {} failed: {}", url, error);
                    return Err(self.classify(error));
                }
            };

            let status = response.status();

            if self.retry.is_retryable_status(status.as_u16())
                && status_retries < self.retry.status_retries
            {
                let delay = self.retry.backoff_delay(status_retries);
                debug!(
                    "HTTP {} from {}, retry {} in {:?}",
                    status.as_u16(),
                    url,
                    status_retries + 1,
                    delay
                );
                status_retries += 1;
                sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                warn!("HTTP {} fetching {}", status.as_u16(), url);
                return Err(ExtractError::HttpStatus {
                    status: status.as_u16(),
                    reason: status
                        .canonical_reason()
                        .unwrap_or("unrecognized status")
                        .to_string(),
                });
            }

            let final_url = response.url().to_string();
            match response.text().await {
                Ok(body) => {
                    if final_url != url {
                        debug!("{} redirected to {}", url, final_url);
                    }
                    return Ok(FetchedPage {
                        body,
                        status: status.as_u16(),
                        final_url,
                    });
                }
                Err(error) => {
                    // body stream died after a success status
                    read_failures += 1;
                    if read_failures < self.retry.read_attempts {
                        let delay = self.retry.backoff_delay(read_failures - 1);
                        debug!(
                            "Body read failed for {} ({}), retrying in {:?}",
                            url, error, delay
                        );
                        sleep(delay).await;
                        continue;
                    }
                    warn!("Body read failed for {}: {}", url, error);
                    return Err(self.classify(error));
                }
            }
        }
    }

    /// Map a terminal transport error into the outcome taxonomy
    fn classify(&self, error: reqwest::Error) -> ExtractError {
        if error.is_timeout() {
            let timeout_ms = if error.is_connect() {
                self.connect_timeout_ms
            } else {
                self.read_timeout_ms
            };
            ExtractError::Timeout { timeout_ms }
        } else if error.is_builder() {
            ExtractError::InvalidInput {
                reason: error.to_string(),
            }
        } else {
            ExtractError::Connection {
                message: error.to_string(),
            }
        }
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for batch fetching and extraction
//!
//! All values are read once at startup and injected into the service;
//! nothing reads the environment after construction.

use std::env;
use std::time::Duration;

/// Retry policy for a single URL fetch
///
/// Attempt budgets are split by phase the way session-level HTTP retries
/// usually are: connection establishment and response reading count
/// separately, and retryable status codes have their own budget.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total connect-phase attempts, first try included (default: 3)
    pub connect_attempts: u32,
    /// Total read-phase attempts, first try included (default: 2)
    pub read_attempts: u32,
    /// Retries after a retryable status code (default: 2)
    pub status_retries: u32,
    /// First backoff delay in milliseconds (default: 500)
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds (default: 10000)
    pub max_backoff_ms: u64,
    /// Exponential backoff base (default: 2.0)
    pub backoff_base: f64,
    /// Status codes that are retried instead of failing immediately
    pub retryable_statuses: Vec<u16>,
}

impl RetryConfig {
    /// Delay before retry number `retries` (zero-based), capped
    pub fn backoff_delay(&self, retries: u32) -> Duration {
        let delay = (self.initial_backoff_ms as f64 * self.backoff_base.powi(retries as i32)) as u64;
        Duration::from_millis(delay.min(self.max_backoff_ms))
    }

    /// Whether a status code is in the retryable set
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 3,
            read_attempts: 2,
            status_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 10000,
            backoff_base: 2.0,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Quality thresholds for the extraction chain
///
/// These are tunables, not behavior contracts; deployments can loosen or
/// tighten them without changing extraction semantics.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    /// Minimum accepted text length for the heuristic stages (default: 50)
    pub min_text_len: usize,
    /// Minimum accepted text length for the tag-pattern fallback (default: 100)
    pub min_fallback_len: usize,
    /// Truncate extracted text beyond this many characters, 0 = unlimited
    /// (default: 20000)
    pub max_text_chars: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            min_text_len: 50,
            min_fallback_len: 100,
            max_text_chars: 20000,
        }
    }
}

/// Configuration for the batch extraction service
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Upper bound on concurrent workers per batch (default: 32)
    pub max_concurrency: usize,
    /// Lower bound on concurrent workers per batch (default: 4)
    pub min_concurrency: usize,
    /// Wall-clock budget for a whole batch in seconds (default: 90)
    pub deadline_secs: u64,
    /// Connection establishment timeout in seconds (default: 5)
    pub connect_timeout_secs: u64,
    /// Per-attempt total request timeout in seconds (default: 25)
    pub read_timeout_secs: u64,
    /// Idle pooled connections kept per host (default: 50)
    pub pool_max_idle_per_host: usize,
    /// Bodies shorter than this are treated as empty (default: 32)
    pub min_body_len: usize,
    /// Allow fetching localhost and private-range targets (default: false)
    pub allow_private_networks: bool,
    /// Retry policy for individual fetches
    pub retry: RetryConfig,
    /// Extraction quality thresholds
    pub extraction: ExtractionSettings,
}

impl ExtractConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            max_concurrency: env::var("EXTRACT_MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
            min_concurrency: env::var("EXTRACT_MIN_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            deadline_secs: env::var("EXTRACT_DEADLINE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(90),
            connect_timeout_secs: env::var("EXTRACT_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            read_timeout_secs: env::var("EXTRACT_READ_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(25),
            pool_max_idle_per_host: env::var("EXTRACT_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(50),
            min_body_len: env::var("EXTRACT_MIN_BODY_LEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(32),
            allow_private_networks: env::var("EXTRACT_ALLOW_PRIVATE_NETWORKS")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            retry: RetryConfig {
                connect_attempts: env::var("EXTRACT_CONNECT_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3),
                read_attempts: env::var("EXTRACT_READ_ATTEMPTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
                status_retries: env::var("EXTRACT_STATUS_RETRIES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
                initial_backoff_ms: env::var("EXTRACT_BACKOFF_BASE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(500),
                max_backoff_ms: env::var("EXTRACT_MAX_BACKOFF_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10000),
                backoff_base: 2.0,
                retryable_statuses: env::var("EXTRACT_RETRYABLE_STATUSES")
                    .ok()
                    .map(|v| v.split(',').filter_map(|s| s.trim().parse().ok()).collect())
                    .filter(|v: &Vec<u16>| !v.is_empty())
                    .unwrap_or_else(|| RetryConfig::default().retryable_statuses),
            },
            extraction: ExtractionSettings {
                min_text_len: env::var("EXTRACT_MIN_TEXT_LEN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
                min_fallback_len: env::var("EXTRACT_MIN_FALLBACK_TEXT_LEN")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(100),
                max_text_chars: env::var("EXTRACT_MAX_TEXT_CHARS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20000),
            },
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.min_concurrency == 0 {
            return Err("min_concurrency must be at least 1".to_string());
        }
        if self.max_concurrency < self.min_concurrency {
            return Err("max_concurrency must not be below min_concurrency".to_string());
        }
        if self.deadline_secs == 0 {
            return Err("deadline_secs must be at least 1".to_string());
        }
        if self.connect_timeout_secs == 0 || self.read_timeout_secs == 0 {
            return Err("timeouts must be at least 1 second".to_string());
        }
        if self.retry.connect_attempts == 0 || self.retry.read_attempts == 0 {
            return Err("attempt counts must be at least 1".to_string());
        }
        if self.extraction.min_text_len == 0 {
            return Err("min_text_len must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 32,
            min_concurrency: 4,
            deadline_secs: 90,
            connect_timeout_secs: 5,
            read_timeout_secs: 25,
            pool_max_idle_per_host: 50,
            min_body_len: 32,
            allow_private_networks: false,
            retry: RetryConfig::default(),
            extraction: ExtractionSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_config_defaults() {
        let config = ExtractConfig::default();
        assert_eq!(config.max_concurrency, 32);
        assert_eq!(config.min_concurrency, 4);
        assert_eq!(config.deadline_secs, 90);
        assert_eq!(config.connect_timeout_secs, 5);
        assert_eq!(config.read_timeout_secs, 25);
        assert_eq!(config.pool_max_idle_per_host, 50);
        assert_eq!(config.min_body_len, 32);
        assert!(!config.allow_private_networks);
    }

    #[test]
    fn test_retry_config_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.connect_attempts, 3);
        assert_eq!(retry.read_attempts, 2);
        assert_eq!(retry.status_retries, 2);
        assert_eq!(retry.retryable_statuses, vec![429, 500, 502, 503, 504]);
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let retry = RetryConfig::default();
        assert_eq!(retry.backoff_delay(0), Duration::from_millis(500));
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(2000));
        // far past the ceiling
        assert_eq!(retry.backoff_delay(12), Duration::from_millis(10000));
    }

    #[test]
    fn test_retryable_status_membership() {
        let retry = RetryConfig::default();
        assert!(retry.is_retryable_status(429));
        assert!(retry.is_retryable_status(503));
        assert!(!retry.is_retryable_status(404));
        assert!(!retry.is_retryable_status(200));
    }

    #[test]
    fn test_extract_config_validation() {
        let mut config = ExtractConfig::default();
        assert!(config.validate().is_ok());

        config.min_concurrency = 0;
        assert!(config.validate().is_err());

        config.min_concurrency = 8;
        config.max_concurrency = 4;
        assert!(config.validate().is_err());

        config.max_concurrency = 32;
        config.deadline_secs = 0;
        assert!(config.validate().is_err());

        config.deadline_secs = 90;
        config.retry.connect_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_extract_config_from_env() {
        // from_env must not panic with no env vars set
        let config = ExtractConfig::from_env();
        assert!(config.validate().is_ok());
    }
}

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Batch orchestration
//!
//! Fans a URL batch out over a bounded worker pool and collects results
//! under one wall-clock deadline. Slots left empty when the deadline
//! fires are synthesized, so callers always get one outcome per input
//! URL, in input order.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::headers::HeaderPolicy;
use crate::processor::UrlProcessor;
use crate::types::{BatchError, ExtractError, ExtractionOutcome};

/// Batch fetch-and-extract service
pub struct ExtractService {
    processor: Arc<UrlProcessor>,
    max_concurrency: usize,
    min_concurrency: usize,
    deadline: Duration,
}

impl ExtractService {
    /// Build the service with the built-in header rule table
    pub fn new(config: ExtractConfig) -> Self {
        Self::with_header_policy(config, HeaderPolicy::new())
    }

    /// Build the service with a caller-supplied header policy
    pub fn with_header_policy(config: ExtractConfig, headers: HeaderPolicy) -> Self {
        let max_concurrency = config.max_concurrency;
        let min_concurrency = config.min_concurrency;
        let deadline = Duration::from_secs(config.deadline_secs);
        let processor = Arc::new(UrlProcessor::new(config, headers));

        Self {
            processor,
            max_concurrency,
            min_concurrency,
            deadline,
        }
    }

    /// Process a batch of URLs concurrently
    ///
    /// Returns one outcome per input URL, in input order. Only an empty
    /// batch is an error; per-URL failures are embedded in the outcomes.
    /// URLs still in flight when the deadline fires are aborted and
    /// reported as `DeadlineExceeded`.
    pub async fn process_batch(
        &self,
        urls: &[String],
    ) -> Result<Vec<ExtractionOutcome>, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let started = Instant::now();
        let workers = self.worker_count(urls.len());
        debug!("Processing {} URLs with {} workers", urls.len(), workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks: JoinSet<(usize, ExtractionOutcome)> = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let processor = Arc::clone(&self.processor);
            let semaphore = Arc::clone(&semaphore);
            let url = url.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.unwrap();
                let outcome = processor.process(&url).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<ExtractionOutcome>> = vec![None; urls.len()];
        let mut deadline_hit = false;
        let deadline = tokio::time::sleep(self.deadline);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        "Batch deadline of {:?} exceeded, abandoning unfinished URLs",
                        self.deadline
                    );
                    tasks.abort_all();
                    deadline_hit = true;
                    break;
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, outcome))) => slots[index] = Some(outcome),
                    Some(Err(error)) => warn!("Batch worker failed: {}", error),
                    None => break,
                }
            }
        }

        let mut successes = 0;
        let outcomes: Vec<ExtractionOutcome> = urls
            .iter()
            .zip(slots)
            .map(|(url, slot)| match slot {
                Some(outcome) => {
                    if outcome.success {
                        successes += 1;
                    }
                    outcome
                }
                None => {
                    let error = if deadline_hit {
                        ExtractError::DeadlineExceeded
                    } else {
                        ExtractError::MissingResult
                    };
                    ExtractionOutcome::failure(url.clone(), &error)
                }
            })
            .collect();

        info!(
            "Batch finished: {}/{} succeeded in {}ms with {} workers",
            successes,
            outcomes.len(),
            started.elapsed().as_millis(),
            workers
        );

        Ok(outcomes)
    }

    /// Worker pool size for a batch: `min(cap, max(floor, len))`
    fn worker_count(&self, batch_len: usize) -> usize {
        self.max_concurrency.min(self.min_concurrency.max(batch_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ExtractService {
        ExtractService::new(ExtractConfig::default())
    }

    #[test]
    fn test_worker_count_clamps_both_ends() {
        let service = service();
        // floor wins for tiny batches
        assert_eq!(service.worker_count(1), 4);
        assert_eq!(service.worker_count(3), 4);
        // batch size in the middle
        assert_eq!(service.worker_count(10), 10);
        // cap wins for large batches
        assert_eq!(service.worker_count(100), 32);
    }

    #[test]
    fn test_worker_count_with_tight_config() {
        let config = ExtractConfig {
            max_concurrency: 2,
            min_concurrency: 1,
            ..ExtractConfig::default()
        };
        let service = ExtractService::new(config);
        assert_eq!(service.worker_count(1), 1);
        assert_eq!(service.worker_count(50), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let result = service().process_batch(&[]).await;
        assert!(matches!(result, Err(BatchError::EmptyBatch)));
    }
}

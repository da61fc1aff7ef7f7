// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-URL fetch-and-extract pipeline
//!
//! Validates, fetches and extracts one URL. The surface is infallible:
//! every exit path produces a well-formed outcome, so one bad URL can
//! never take down the batch around it.

use tracing::{debug, info};
use url::{Host, Url};

use crate::client::FetchClient;
use crate::config::ExtractConfig;
use crate::extractor::{extract_main_text, extract_title};
use crate::headers::HeaderPolicy;
use crate::types::{ExtractError, ExtractionOutcome};

/// Fetch-extract unit shared by all batch workers
pub struct UrlProcessor {
    client: FetchClient,
    headers: HeaderPolicy,
    config: ExtractConfig,
}

impl UrlProcessor {
    /// Build the unit and its pooled HTTP client
    pub fn new(config: ExtractConfig, headers: HeaderPolicy) -> Self {
        let client = FetchClient::new(&config);
        Self {
            client,
            headers,
            config,
        }
    }

    /// Fetch one URL and extract its main content
    ///
    /// The returned outcome always echoes the input URL, even after
    /// redirects.
    pub async fn process(&self, url: &str) -> ExtractionOutcome {
        if let Err(error) = self.check_url(url) {
            return ExtractionOutcome::failure(url, &error);
        }

        debug!("Fetching {}", url);
        let request_headers = self.headers.headers_for(url);
        let page = match self.client.fetch(url, request_headers).await {
            Ok(page) => page,
            Err(error) => return ExtractionOutcome::failure(url, &error),
        };

        let body_len = page.body.trim().len();
        if body_len < self.config.min_body_len {
            return ExtractionOutcome::failure(url, &ExtractError::EmptyResponse { length: body_len });
        }

        match extract_main_text(&page.body, &self.config.extraction) {
            Some(text) => {
                info!("Extracted {} chars from {}", text.len(), url);
                let title = extract_title(&page.body);
                ExtractionOutcome::success(url, title, text)
            }
            None => ExtractionOutcome::failure(url, &ExtractError::ExtractionFailed),
        }
    }

    /// Reject URLs before any network activity
    fn check_url(&self, url: &str) -> Result<(), ExtractError> {
        if url.trim().is_empty() {
            return Err(ExtractError::InvalidInput {
                reason: "URL is empty".to_string(),
            });
        }

        let parsed = Url::parse(url).map_err(|e| ExtractError::InvalidInput {
            reason: e.to_string(),
        })?;

        if !["http", "https"].contains(&parsed.scheme()) {
            return Err(ExtractError::UnsafeUrl {
                url: url.to_string(),
            });
        }

        if !self.config.allow_private_networks && is_private_target(&parsed) {
            return Err(ExtractError::UnsafeUrl {
                url: url.to_string(),
            });
        }

        Ok(())
    }
}

/// Localhost, loopback, private-range and link-local targets
fn is_private_target(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => {
            ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
        }
        Some(Host::Ipv6(ip)) => ip.is_loopback() || ip.is_unspecified(),
        None => true,
    }
}

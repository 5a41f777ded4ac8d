//! Remote document fetcher
//!
//! `Fetcher` is the seam between the freshness controller and the network:
//! give it a URL, get the raw bytes back. `HttpFetcher` is the reqwest
//! implementation used by the CLI.

use crate::error::{FleetError, Result};
use crate::retry::ExponentialBackoffPolicy;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download the document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    retry: ExponentialBackoffPolicy,
    show_progress: bool,
}

impl HttpFetcher {
    pub fn new(retry: ExponentialBackoffPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            retry,
            show_progress: true,
        }
    }

    /// Disable the download spinner (tests, JSON output).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>> {
        let transport = |message: String, source: reqwest::Error| FleetError::Transport {
            url: url.to_string(),
            message,
            source: Some(Box::new(source)),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport(format!("request failed: {}", e), e))?
            .error_for_status()
            .map_err(|e| transport(format!("server returned an error: {}", e), e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| transport(format!("failed to read body: {}", e), e))?;
        Ok(body.to_vec())
    }

    fn spinner(&self, url: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Fetching {}", url));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let spinner = self.spinner(url);
        let result = self.retry.execute(|| self.fetch_once(url)).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
        if let Ok(body) = &result {
            debug!(url, bytes = body.len(), "Downloaded pricing document");
        }
        result
    }
}

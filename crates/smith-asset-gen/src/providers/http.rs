//! Shared HTTP plumbing for the service adapters
//!
//! One agent configuration for every adapter: a generous global timeout to
//! tolerate slow inference, and bounded retry with exponential backoff for
//! transient failures.

use crate::config::SmithConfig;
use crate::provider::Fetcher;
use smith_core::{Result, SmithError};
use std::time::Duration;

const RETRY_BASE_DELAY_MS: u64 = 500;

/// Timeout and retry settings shared by all HTTP adapters
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub max_retries: usize,
}

impl HttpSettings {
    pub fn from_config(config: &SmithConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.generation.request_timeout_secs),
            max_retries: config.generation.max_retries.max(1),
        }
    }

    pub(crate) fn agent(&self) -> ureq::Agent {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        config.into()
    }

    /// POST a JSON payload and parse the JSON reply
    pub(crate) fn post_json(
        &self,
        service: &str,
        url: &str,
        headers: &[(&str, String)],
        payload: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        for attempt in 0..self.max_retries {
            let mut request = self.agent().post(url);
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }

            match request.send_json(payload) {
                Ok(mut ok) => {
                    return ok.body_mut().read_json().map_err(|e| {
                        SmithError::remote(service, format!("Failed to parse response: {}", e))
                    });
                }
                Err(e) => {
                    if attempt + 1 < self.max_retries && is_retryable_error(&e) {
                        tracing::debug!(service, attempt, error = %e, "retrying request");
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(SmithError::remote(service, e));
                }
            }
        }

        Err(SmithError::remote(service, "request failed after retries"))
    }

    /// GET a JSON document
    pub(crate) fn get_json(
        &self,
        service: &str,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<serde_json::Value> {
        for attempt in 0..self.max_retries {
            let mut request = self.agent().get(url);
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }

            match request.call() {
                Ok(mut ok) => {
                    return ok.body_mut().read_json().map_err(|e| {
                        SmithError::remote(service, format!("Failed to parse poll response: {}", e))
                    });
                }
                Err(e) => {
                    if attempt + 1 < self.max_retries && is_retryable_error(&e) {
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(SmithError::remote(service, e));
                }
            }
        }

        Err(SmithError::remote(service, "poll failed after retries"))
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self::from_config(&SmithConfig::default())
    }
}

/// Plain binary downloader
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    settings: HttpSettings,
}

impl HttpFetcher {
    pub fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        for attempt in 0..self.settings.max_retries {
            match self.settings.agent().get(url).call() {
                Ok(ok) => {
                    let mut reader = ok.into_body().into_reader();
                    let mut bytes = Vec::new();
                    std::io::Read::read_to_end(&mut reader, &mut bytes)
                        .map_err(|e| SmithError::download(url, e))?;
                    return Ok(bytes);
                }
                Err(e) => {
                    if attempt + 1 < self.settings.max_retries && is_retryable_error(&e) {
                        tracing::debug!(url, attempt, error = %e, "retrying download");
                        sleep_backoff(attempt);
                        continue;
                    }
                    return Err(SmithError::download(url, e));
                }
            }
        }

        Err(SmithError::download(url, "download failed after retries"))
    }
}

pub(crate) fn is_retryable_error(e: &ureq::Error) -> bool {
    match e {
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => true,
        ureq::Error::StatusCode(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
        _ => false,
    }
}

fn sleep_backoff(attempt: usize) {
    let delay_ms = RETRY_BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    std::thread::sleep(Duration::from_millis(delay_ms));
}

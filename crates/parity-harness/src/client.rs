//! HTTP client for one lookup server

use crate::config::{HarnessConfig, RetryPolicy};
use crate::error::{HarnessError, HarnessResult};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// API client bound to one target server
#[derive(Debug, Clone)]
pub struct LookupClient {
    client: Client,
    base_url: String,
    name: String,
    retry: RetryPolicy,
}

/// A successfully fetched and parsed response
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    pub body: Value,
    /// Number of requests sent, including retries
    pub attempts: u32,
}

impl LookupClient {
    /// Create a client for the baseline server
    pub fn baseline(config: &HarnessConfig) -> HarnessResult<Self> {
        Self::new("baseline", &config.targets.baseline, config)
    }

    /// Create a client for the candidate server
    pub fn candidate(config: &HarnessConfig) -> HarnessResult<Self> {
        Self::new("candidate", &config.targets.candidate, config)
    }

    pub fn new(name: &str, base_url: &str, config: &HarnessConfig) -> HarnessResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(HarnessError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: name.to_string(),
            retry: config.retry.clone(),
        })
    }

    /// Get the client name (for logging)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a path and parse the JSON body
    ///
    /// Statuses in the retry policy are retried after a fixed delay until
    /// `max_attempts` requests have been sent. Any other status is accepted
    /// as-is; its body must still be JSON.
    pub async fn fetch(&self, path: &str) -> HarnessResult<Fetched> {
        let url = self.url(path);
        let mut attempts = 0;

        loop {
            attempts += 1;
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.classify(&url, e))?;
            let status = response.status();
            debug!(server = %self.name, %url, %status, attempts, "GET");

            if self.retry.is_retryable(status.as_u16()) {
                if attempts >= self.retry.max_attempts {
                    return Err(HarnessError::RetriesExhausted {
                        target: self.name.clone(),
                        url,
                        status: status.as_u16(),
                        attempts,
                    });
                }
                trace!(server = %self.name, %url, "retrying in {:?}", self.retry.backoff_base);
                tokio::time::sleep(self.retry.backoff_base).await;
                continue;
            }

            let raw_body = response
                .text()
                .await
                .map_err(|e| self.classify(&url, e))?;
            let body = serde_json::from_str(&raw_body).map_err(|source| {
                HarnessError::InvalidBody {
                    target: self.name.clone(),
                    url: url.clone(),
                    source,
                }
            })?;

            return Ok(Fetched {
                status,
                body,
                attempts,
            });
        }
    }

    /// Check if the server answers its liveness endpoint
    ///
    /// A single request, without retries.
    pub async fn is_healthy(&self, path: &str, timeout: Duration) -> Result<(), String> {
        let url = self.url(path);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(format!("{} answered {}", url, response.status())),
            Err(e) => Err(format!("{}: {}", url, e)),
        }
    }

    fn classify(&self, url: &str, source: reqwest::Error) -> HarnessError {
        if source.is_connect() {
            HarnessError::Connection {
                target: self.name.clone(),
                url: url.to_string(),
                source,
            }
        } else if source.is_timeout() {
            HarnessError::ReadTimeout {
                target: self.name.clone(),
                url: url.to_string(),
            }
        } else {
            HarnessError::Request {
                target: self.name.clone(),
                url: url.to_string(),
                source,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetPair;

    #[test]
    fn test_url_joins_base_and_path() {
        let config = HarnessConfig {
            targets: TargetPair::new("http://127.0.0.1:1325/", "http://127.0.0.1:1326"),
            ..HarnessConfig::default()
        };

        let baseline = LookupClient::baseline(&config).unwrap();
        assert_eq!(baseline.name(), "baseline");
        assert_eq!(
            baseline.url("cves/debian/11/CVE-1"),
            "http://127.0.0.1:1325/cves/debian/11/CVE-1"
        );

        let candidate = LookupClient::candidate(&config).unwrap();
        assert_eq!(candidate.url("/health"), "http://127.0.0.1:1326/health");
    }
}

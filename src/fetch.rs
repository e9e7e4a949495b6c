use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::warn;

const BROWSER_UA: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const PAUSE_MS: u64 = 200;

/// Retry schedule for a single page fetch: `max_attempts` tries, waiting
/// `(attempt + 1) * backoff_unit` after the nth failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait before the retry following failed attempt `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * (attempt + 1)
    }
}

/// Source of page text keyed by URL. Lets pagination traversal run against
/// canned pages in tests.
pub trait PageSource {
    async fn get(&self, url: &str) -> Option<String>;
}

/// HTTP fetcher for the dictionary site. The site degrades responses for
/// unidentified clients, so every request carries a browser header set.
pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    pause: Duration,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(retry: RetryPolicy) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            retry,
            pause: Duration::from_millis(PAUSE_MS),
        })
    }

    /// Fetch one page, retrying per the policy. Exhaustion logs the URL and
    /// returns `None`; callers skip that unit of work and carry on.
    pub async fn fetch(&self, url: &str) -> Option<String> {
        for attempt in 0..self.retry.max_attempts {
            match self.try_fetch(url).await {
                Ok(body) => {
                    // Fixed pause after every successful request to bound the
                    // rate against the source.
                    tokio::time::sleep(self.pause).await;
                    return Some(body);
                }
                Err(e) => {
                    warn!(
                        "retry {}/{} {}: {}",
                        attempt + 1,
                        self.retry.max_attempts,
                        url,
                        e
                    );
                    if attempt + 1 < self.retry.max_attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }
        warn!("giving up on {}", url);
        None
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {}", status);
        }
        Ok(resp.text().await?)
    }
}

impl PageSource for Fetcher {
    async fn get(&self, url: &str) -> Option<String> {
        self.fetch(url).await
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_scales_with_attempt() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff_unit: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(750));
    }

    #[test]
    fn default_policy_matches_site_etiquette() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(3));
    }
}

use crate::config::toml_config::HttpSettings;
use crate::domain::ports::{FetchOutcome, Fetcher};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

enum Attempt {
    Done(FetchOutcome),
    Retry(String),
}

/// reqwest-backed fetcher with a fixed user agent, a per-request timeout and
/// exponential backoff for transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            client,
            retry_attempts: settings.retry_attempts,
            retry_delay: settings.retry_delay(),
        })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                return Attempt::Retry(e.to_string())
            }
            Err(e) => return Attempt::Done(FetchOutcome::PermanentFailure(e.to_string())),
        };

        let status = response.status();
        tracing::debug!("GET {} -> {}", url, status);
        if status.is_success() {
            return match response.text().await {
                Ok(body) => Attempt::Done(FetchOutcome::Success(body)),
                Err(e) => Attempt::Retry(format!("reading body: {}", e)),
            };
        }
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Attempt::Done(FetchOutcome::NotFound),
            StatusCode::TOO_MANY_REQUESTS => Attempt::Retry(format!("HTTP {}", status)),
            s if s.is_server_error() => Attempt::Retry(format!("HTTP {}", status)),
            s => Attempt::Done(FetchOutcome::PermanentFailure(format!("HTTP {}", s))),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut attempt = 0;
        loop {
            match self.attempt(url).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Retry(reason) if attempt < self.retry_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::debug!(
                        "Retrying {} in {:?} after '{}' (attempt {}/{})",
                        url,
                        delay,
                        reason,
                        attempt + 1,
                        self.retry_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Attempt::Retry(reason) => {
                    tracing::warn!("Giving up on {} after {} attempts: {}", url, attempt + 1, reason);
                    return FetchOutcome::TransientFailure(reason);
                }
            }
        }
    }
}

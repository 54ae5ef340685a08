use reqwest::{Client, StatusCode, Url};

use crate::{
    cache::ResponseCache,
    error::{WeatherError, truncate_body},
    retry::{RetryPolicy, is_retryable_error, is_retryable_status},
};

/// HTTP GET with a response cache in front and bounded retries behind it.
#[derive(Debug, Clone)]
pub struct CachedHttp {
    http: Client,
    cache: Option<ResponseCache>,
    retry: RetryPolicy,
}

/// Outcome of a single attempt that did not produce a body.
enum Failure {
    Transport(reqwest::Error),
    Status(StatusCode, String),
}

impl CachedHttp {
    pub fn new(http: Client, cache: Option<ResponseCache>, retry: RetryPolicy) -> Self {
        Self { http, cache, retry }
    }

    /// Fetch `url` and return the response body of a 2xx answer.
    pub async fn get(&self, url: &Url) -> Result<String, WeatherError> {
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(url.as_str()).await {
                tracing::debug!("Serving {} from cache", url);
                return Ok(body);
            }
        }

        let body = self.get_with_retry(url).await?;

        if let Some(cache) = &self.cache {
            cache.put(url.as_str(), &body).await;
        }

        Ok(body)
    }

    async fn get_with_retry(&self, url: &Url) -> Result<String, WeatherError> {
        let mut retries = 0;
        loop {
            let failure = match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(failure) => failure,
            };

            let retryable = match &failure {
                Failure::Transport(e) => is_retryable_error(e),
                Failure::Status(status, _) => is_retryable_status(*status),
            };

            if !retryable || !self.retry.should_retry(retries) {
                return Err(failure.into_error());
            }

            retries += 1;
            let delay = self.retry.delay_for_retry(retries);
            tracing::warn!(
                "Forecast request failed ({}), retry {}/{} in {:?}",
                failure.describe(),
                retries,
                self.retry.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, url: &Url) -> Result<String, Failure> {
        let res = self.http.get(url.clone()).send().await.map_err(Failure::Transport)?;

        let status = res.status();
        let body = res.text().await.map_err(Failure::Transport)?;

        if !status.is_success() {
            return Err(Failure::Status(status, body));
        }

        Ok(body)
    }
}

impl Failure {
    fn describe(&self) -> String {
        match self {
            Failure::Transport(e) => e.to_string(),
            Failure::Status(status, _) => format!("status {status}"),
        }
    }

    fn into_error(self) -> WeatherError {
        match self {
            Failure::Transport(e) => WeatherError::Network(e.to_string()),
            Failure::Status(status, body) => {
                WeatherError::Service { status: status.as_u16(), body: truncate_body(&body) }
            }
        }
    }
}

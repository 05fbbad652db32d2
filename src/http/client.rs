//! Low-level HTTP client — `QuoteHttp`.
//!
//! One method per backend endpoint. Returns wire types (conversion to domain
//! types happens in the sub-clients). Internal to the SDK — Layer 5 wraps this.

use crate::domain::daily::DailyPrice;
use crate::domain::quote::wire::{CachedQuotesResponse, PopularResponse};
use crate::error::HttpError;
use crate::http::retry::{RetryConfig, RetryPolicy};
use crate::shared::StockId;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Low-level HTTP client for the quote backend REST API.
pub struct QuoteHttp {
    base_url: String,
    client: Client,
}

impl QuoteHttp {
    pub fn new(base_url: &str) -> Result<Self, HttpError> {
        #[allow(unused_mut)]
        let mut builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        {
            builder = builder
                .timeout(Duration::from_secs(30))
                .pool_max_idle_per_host(10);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Search ───────────────────────────────────────────────────────────

    pub async fn search_stock_ids(&self, query: &str) -> Result<Vec<StockId>, HttpError> {
        let url = format!(
            "{}/stocks/api/search/{}",
            self.base_url,
            urlencoding::encode(query)
        );
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Subscriptions ────────────────────────────────────────────────────

    pub async fn update_subscriptions(&self, stock_ids: &[StockId]) -> Result<(), HttpError> {
        let url = format!("{}/subscriptions/update", self.base_url);
        self.post_unit(&url, Some(&stock_ids), RetryPolicy::None)
            .await
    }

    // ── Quotes ───────────────────────────────────────────────────────────

    pub async fn get_popular(&self, stock_id: &StockId) -> Result<PopularResponse, HttpError> {
        let url = format!("{}/api/get-popular/{}", self.base_url, stock_id);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    /// Fallback cache pull. Never retried: one request per call.
    pub async fn get_cached_quotes(
        &self,
        stock_id: &StockId,
    ) -> Result<CachedQuotesResponse, HttpError> {
        let url = format!("{}/api/redis-data/{}", self.base_url, stock_id);
        self.get(&url, RetryPolicy::None).await
    }

    // ── Daily prices ─────────────────────────────────────────────────────

    /// Ask the backend to refresh its daily aggregates for `stock_id`.
    pub async fn refresh_daily_prices(&self, stock_id: &StockId) -> Result<(), HttpError> {
        let url = format!("{}/api/daily-price/{}", self.base_url, stock_id);
        self.post_unit(&url, None::<&()>, RetryPolicy::None).await
    }

    pub async fn get_daily_prices(&self, stock_id: &StockId) -> Result<Vec<DailyPrice>, HttpError> {
        let url = format!("{}/api/daily-price/{}", self.base_url, stock_id);
        self.get(&url, RetryPolicy::Idempotent).await
    }

    // ── Internal HTTP methods ────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        retry: RetryPolicy,
    ) -> Result<T, HttpError> {
        let resp = self
            .request_with_retry(reqwest::Method::GET, url, None::<&()>, retry)
            .await?;
        Ok(resp.json::<T>().await?)
    }

    /// POST whose response body the caller does not need.
    pub(crate) async fn post_unit<B: Serialize>(
        &self,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<(), HttpError> {
        self.request_with_retry(reqwest::Method::POST, url, body, retry)
            .await?;
        Ok(())
    }

    async fn request_with_retry<B: Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&B>,
        retry: RetryPolicy,
    ) -> Result<Response, HttpError> {
        let config = match &retry {
            RetryPolicy::None => {
                return self.do_request(&method, url, body).await;
            }
            RetryPolicy::Idempotent => RetryConfig::idempotent(),
            RetryPolicy::Custom(c) => c.clone(),
        };

        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            match self.do_request(&method, url, body).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let should_retry = match &e {
                        HttpError::ServerError { status, .. } => {
                            config.is_retryable_status(*status)
                        }
                        HttpError::RateLimited { retry_after_ms } => {
                            if let Some(ms) = retry_after_ms {
                                futures_timer::Delay::new(Duration::from_millis(*ms)).await;
                            }
                            true
                        }
                        HttpError::Timeout => true,
                        HttpError::Reqwest(re) => {
                            #[cfg(not(target_arch = "wasm32"))]
                            let retryable = re.is_connect() || re.is_timeout() || re.is_request();
                            #[cfg(target_arch = "wasm32")]
                            let retryable = re.is_timeout() || re.is_request();
                            retryable
                        }
                        _ => false,
                    };

                    if should_retry && attempt < config.max_retries {
                        let delay = config.delay_for_attempt(attempt);
                        tracing::debug!(
                            attempt = attempt + 1,
                            max = config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Retrying request to {}",
                            url
                        );
                        futures_timer::Delay::new(delay).await;
                        last_error = Some(e);
                    } else {
                        return Err(e);
                    }
                }
            }
        }

        Err(HttpError::MaxRetriesExceeded {
            attempts: config.max_retries + 1,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }

    async fn do_request<B: Serialize>(
        &self,
        method: &reqwest::Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, HttpError> {
        let mut req = self.client.request(method.clone(), url);

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let retry_after_ms = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(retry_after_ms);
        let body_text = resp.text().await.unwrap_or_default();

        match status_code {
            404 => Err(HttpError::NotFound(body_text)),
            408 => Err(HttpError::Timeout),
            429 => Err(HttpError::RateLimited { retry_after_ms }),
            400..=499 => Err(HttpError::BadRequest(body_text)),
            _ => Err(HttpError::ServerError {
                status: status_code,
                body: body_text,
            }),
        }
    }
}

/// `Retry-After` in delta-seconds, as milliseconds.
fn retry_after_ms(header: &str) -> Option<u64> {
    let secs = header.trim().parse::<u64>().ok()?;
    Some(secs.saturating_mul(1000))
}

impl Clone for QuoteHttp {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let http = QuoteHttp::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(http.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_retry_after_parsing() {
        assert_eq!(retry_after_ms(" 3 "), Some(3_000));
        assert_eq!(retry_after_ms(&u64::MAX.to_string()), Some(u64::MAX));
        assert_eq!(retry_after_ms("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_an_error_not_a_panic() {
        // Port 9 (discard) on loopback is closed in test environments.
        let http = QuoteHttp::new("http://127.0.0.1:9").unwrap();
        let result = http.get_cached_quotes(&StockId::from("A")).await;
        assert!(result.is_err());
    }
}

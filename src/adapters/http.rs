use crate::config::toml_config::HttpConfig;
use crate::domain::ports::FetchContext;
use crate::utils::error::{RadarError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/123.0 Safari/537.36";

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

const RETRY_STATUSES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Browser-looking reqwest client with bounded retries. Every call is raced against the fetch context.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Self::with_referer(config, None)
    }

    pub fn with_referer(config: &HttpConfig, referer: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if let Some(referer) = referer {
            let value = HeaderValue::from_str(referer).map_err(|e| RadarError::InvalidConfigValueError {
                field: "referer".to_string(),
                value: referer.to_string(),
                reason: e.to_string(),
            })?;
            headers.insert(reqwest::header::REFERER, value);
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    pub async fn get_text(&self, ctx: &FetchContext, url: &str) -> Result<String> {
        let response = self.send(ctx, url, HTML_ACCEPT).await?;
        ctx.run(async { response.text().await.map_err(RadarError::from) }).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, ctx: &FetchContext, url: &str) -> Result<T> {
        let response = self.send(ctx, url, "application/json").await?;
        let body = ctx.run(async { response.bytes().await.map_err(RadarError::from) }).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, ctx: &FetchContext, url: &str, accept: &str) -> Result<Response> {
        let mut attempt = 0u32;
        loop {
            let result = ctx
                .run(async {
                    self.client
                        .get(url)
                        .header(ACCEPT, accept)
                        .send()
                        .await
                        .map_err(RadarError::from)
                })
                .await;

            let retryable = match &result {
                Ok(response) => RETRY_STATUSES.contains(&response.status()),
                Err(RadarError::HttpError(e)) => e.is_timeout() || e.is_connect(),
                Err(_) => false,
            };

            // 指數退避，但不可超過剩餘時間
            let delay = self.retry_delay.saturating_mul(2u32.saturating_pow(attempt));
            if !retryable || attempt >= self.retry_attempts || delay >= ctx.remaining() {
                return result?.error_for_status().map_err(RadarError::from);
            }

            attempt += 1;
            tracing::debug!("🔁 Retrying {} (attempt {}) in {:?}", url, attempt, delay);
            ctx.run(async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
    }
}

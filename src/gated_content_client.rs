use crate::cache_validator::ValidatedCacheEntry;
use crate::circuit_breaker::{create_upstream_circuit_breaker, UpstreamBreaker};
use crate::config::{Config, MAX_LEADS_LIMIT};
use crate::errors::AppError;
use crate::models::{
    ContentEnvelope, ContentPerformance, Lead, LeadsEnvelope, OverviewData, TrendEnvelope,
    TrendPoint, UpstreamErrorBody,
};
use failsafe::futures::CircuitBreaker;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Path of the edge function under the configured base URL.
const EDGE_FUNCTION_PATH: &str = "gated-content-api";

/// Message used when a failed upstream response carries no `error` field.
const GENERIC_FAILURE: &str = "API request failed";

/// Parameters forwarded to the `leads` action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadsQuery {
    pub limit: u32,
    pub tier: Option<String>,
    pub status: Option<String>,
    pub signal_type: Option<String>,
}

impl LeadsQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.clamp(1, MAX_LEADS_LIMIT).to_string())];
        // "all" is the UI's no-filter value and is not forwarded
        let filters = [
            ("tier", &self.tier),
            ("status", &self.status),
            ("signal_type", &self.signal_type),
        ];
        for (key, value) in filters {
            if let Some(value) = value.as_deref().map(str::trim) {
                if !value.is_empty() && !value.eq_ignore_ascii_case("all") {
                    params.push((key, value.to_string()));
                }
            }
        }
        params
    }
}

/// Client for the `gated-content-api` edge function.
///
/// Every call is a `GET {base}/gated-content-api?action=<name>&<params>`. Calls go
/// through a shared circuit breaker and, when enabled, a short-lived response cache.
#[derive(Clone)]
pub struct GatedContentClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    breaker: Arc<UpstreamBreaker>,
    cache: Option<Cache<String, String>>,
}

impl GatedContentClient {
    /// Creates a new `GatedContentClient` from the loaded configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs.max(1)))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create gated content client: {}", e))
            })?;

        let cache = (config.response_cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(256)
                .time_to_live(Duration::from_secs(config.response_cache_ttl_secs))
                .build()
        });

        Ok(Self {
            client,
            base_url: config.gated_content_api_url.trim_end_matches('/').to_string(),
            api_key: config.gated_content_api_key.clone(),
            breaker: Arc::new(create_upstream_circuit_breaker()),
            cache,
        })
    }

    fn action_url(&self, action: &str, params: &[(&str, String)]) -> Result<Url, AppError> {
        let base = format!("{}/{}", self.base_url, EDGE_FUNCTION_PATH);
        let query = std::iter::once(("action", action))
            .chain(params.iter().map(|(k, v)| (*k, v.as_str())));

        Url::parse_with_params(&base, query).map_err(|e| {
            AppError::InternalError(format!("Invalid gated content URL {}: {}", base, e))
        })
    }

    /// Calls one action and decodes its JSON body into `T`.
    pub async fn fetch_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = self.action_url(action, params)?;
        let key = url.to_string();

        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(&key).await.and_then(|v| ValidatedCacheEntry::open(&v)) {
                tracing::debug!("Cache hit for {}", key);
                return decode(action, &body);
            }
        }

        tracing::info!("Calling gated content API: {}", key);

        let body = self
            .breaker
            .call_with(
                |e: &AppError| e.is_upstream_outage(),
                Box::pin(self.send(url)),
            )
            .await
            .map_err(|e| match e {
                failsafe::Error::Inner(e) => e,
                failsafe::Error::Rejected => {
                    tracing::warn!("Circuit open, rejecting {} call", action);
                    AppError::UpstreamUnavailable(
                        "Gated content API temporarily unavailable".to_string(),
                    )
                }
            })?;

        let decoded = decode(action, &body)?;

        if let Some(cache) = &self.cache {
            cache
                .insert(key, ValidatedCacheEntry::seal(body).to_cache_value())
                .await;
        }

        Ok(decoded)
    }

    async fn send(&self, url: Url) -> Result<String, AppError> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request
                .header("Authorization", format!("Bearer {}", key))
                .header("apikey", key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Gated content request failed: {}", e);
            AppError::from(e)
        })?;

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            // A failed error body still reports the upstream status
            Err(e) if !status.is_success() => {
                tracing::warn!("Failed to read gated content error body: {}", e);
                String::new()
            }
            Err(e) => {
                tracing::error!("Failed to read gated content response body: {}", e);
                return Err(AppError::from(e));
            }
        };

        if !status.is_success() {
            let message = serde_json::from_str::<UpstreamErrorBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| GENERIC_FAILURE.to_string());
            tracing::warn!("Gated content API returned {}: {}", status, message);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(text)
    }

    /// `overview` action: aggregate counts and breakdowns.
    pub async fn overview(&self) -> Result<OverviewData, AppError> {
        self.fetch_action("overview", &[]).await
    }

    /// `trend` action: one point per day for the last `days` days.
    pub async fn trend(&self, days: u32) -> Result<Vec<TrendPoint>, AppError> {
        let envelope: TrendEnvelope = self
            .fetch_action("trend", &[("days", days.max(1).to_string())])
            .await?;
        Ok(envelope.trend)
    }

    /// `leads` action: flat list filtered upstream by tier, status and signal type.
    pub async fn leads(&self, query: &LeadsQuery) -> Result<Vec<Lead>, AppError> {
        let envelope: LeadsEnvelope = self.fetch_action("leads", &query.params()).await?;
        Ok(envelope.leads)
    }

    /// `content-summary` action: one row per content asset.
    pub async fn content_summary(&self) -> Result<Vec<ContentPerformance>, AppError> {
        let envelope: ContentEnvelope = self.fetch_action("content-summary", &[]).await?;
        Ok(envelope.content)
    }
}

fn decode<T: DeserializeOwned>(action: &str, body: &str) -> Result<T, AppError> {
    serde_json::from_str(body).map_err(|e| {
        AppError::InternalError(format!("Failed to parse {} response: {}", action, e))
    })
}

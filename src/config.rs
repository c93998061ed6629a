use serde::Deserialize;
use sha2::{Digest, Sha256};

/// Upper bound accepted for the `limit` parameter of the `leads` action.
pub const MAX_LEADS_LIMIT: u32 = 1000;

/// Longest trend window the overview accepts, in days.
pub const MAX_TREND_DAYS: u32 = 365;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Edge function base URL, without trailing slash.
    pub gated_content_api_url: String,
    /// Optional key forwarded to the edge function.
    pub gated_content_api_key: Option<String>,
    /// Hex-encoded SHA-256 of the dashboard password.
    pub dashboard_password_sha256: String,
    pub session_ttl_secs: u64,
    pub upstream_timeout_secs: u64,
    /// Zero disables the upstream response cache.
    pub response_cache_ttl_secs: u64,
    pub leads_limit: u32,
    pub trend_days: u32,
    pub rate_limit_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            gated_content_api_url: std::env::var("GATED_CONTENT_API_URL")
                .map_err(|_| anyhow::anyhow!("GATED_CONTENT_API_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("GATED_CONTENT_API_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!("GATED_CONTENT_API_URL must start with http:// or https://");
                    }
                    Ok(url.trim_end_matches('/').to_string())
                })?,
            gated_content_api_key: std::env::var("GATED_CONTENT_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            dashboard_password_sha256: password_digest_from_env()?,
            session_ttl_secs: parse_u64_var("SESSION_TTL_SECS", 8 * 60 * 60)?,
            upstream_timeout_secs: parse_u64_var("UPSTREAM_TIMEOUT_SECS", 30)?,
            response_cache_ttl_secs: parse_u64_var("RESPONSE_CACHE_TTL_SECS", 60)?,
            leads_limit: std::env::var("LEADS_LIMIT")
                .unwrap_or_else(|_| "200".to_string())
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("LEADS_LIMIT must be a positive number"))
                .and_then(|limit| {
                    if limit == 0 || limit > MAX_LEADS_LIMIT {
                        anyhow::bail!("LEADS_LIMIT must be between 1 and {}", MAX_LEADS_LIMIT);
                    }
                    Ok(limit)
                })?,
            trend_days: std::env::var("TREND_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("TREND_DAYS must be a positive number"))
                .and_then(|days| {
                    if days == 0 || days > MAX_TREND_DAYS {
                        anyhow::bail!("TREND_DAYS must be between 1 and {}", MAX_TREND_DAYS);
                    }
                    Ok(days)
                })?,
            rate_limit_enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(true),
        };

        if config.session_ttl_secs == 0 {
            anyhow::bail!("SESSION_TTL_SECS must be greater than zero");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Gated content API URL: {}", config.gated_content_api_url);
        if config.gated_content_api_key.is_some() {
            tracing::info!("Upstream API key configured");
        }
        tracing::debug!("Session TTL: {}s", config.session_ttl_secs);
        tracing::debug!("Response cache TTL: {}s", config.response_cache_ttl_secs);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

/// Hex SHA-256 of a password, the form stored in [`Config::dashboard_password_sha256`].
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn password_digest_from_env() -> anyhow::Result<String> {
    if let Ok(digest) = std::env::var("DASHBOARD_PASSWORD_SHA256") {
        let digest = digest.trim().to_ascii_lowercase();
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("DASHBOARD_PASSWORD_SHA256 must be 64 hex characters");
        }
        return Ok(digest);
    }

    std::env::var("DASHBOARD_PASSWORD")
        .map_err(|_| {
            anyhow::anyhow!(
                "DASHBOARD_PASSWORD_SHA256 or DASHBOARD_PASSWORD environment variable required"
            )
        })
        .and_then(|pass| {
            if pass.is_empty() {
                anyhow::bail!("DASHBOARD_PASSWORD cannot be empty");
            }
            Ok(hash_password(&pass))
        })
}

fn parse_u64_var(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a non-negative number", name)),
        Err(_) => Ok(default),
    }
}

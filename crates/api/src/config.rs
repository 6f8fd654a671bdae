use demoforge_core::task::DEFAULT_ARTIFACT_TTL_HOURS;
use demoforge_provider::http::HttpProviderConfig;

/// Server configuration loaded from environment variables.
///
/// Every field defaults to a value usable for local development; deploys
/// override via the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Generation provider connection settings.
    pub provider: HttpProviderConfig,
    /// Artifact validity window in hours, applied when the provider
    /// reports no explicit expiry.
    pub artifact_ttl_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PROVIDER_API_URL`     | `http://localhost:5000`    |
    /// | `PROVIDER_IMAGE_MODEL` | `wan2.6-image`             |
    /// | `PROVIDER_VIDEO_MODEL` | `wan2.2-kf2v-flash`        |
    /// | `ARTIFACT_TTL_HOURS`   | `24`                       |
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let provider_defaults = HttpProviderConfig::default();
        let provider = HttpProviderConfig {
            api_url: env_or("PROVIDER_API_URL", &provider_defaults.api_url),
            image_model: env_or("PROVIDER_IMAGE_MODEL", &provider_defaults.image_model),
            video_model: env_or("PROVIDER_VIDEO_MODEL", &provider_defaults.video_model),
        };

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "3000")
                .parse()
                .expect("PORT must be a valid u16"),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a valid u64"),
            provider,
            artifact_ttl_hours: env_or("ARTIFACT_TTL_HOURS", &DEFAULT_ARTIFACT_TTL_HOURS.to_string())
                .parse()
                .expect("ARTIFACT_TTL_HOURS must be a valid i64"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

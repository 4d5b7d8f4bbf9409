use crate::error::{ApiError, Result};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Minimum per-request timeout.
pub const DEFAULT_TIMEOUT_FLOOR_SECS: u64 = 15;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    #[default]
    None,
    ApiKey { key: String },
    Bearer { token: String },
    Basic { username: String, password: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub credentials: Credentials,
    pub insecure: bool,
    pub timeout_floor_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::from("https://localhost:12443"),
            credentials: Credentials::None,
            insecure: false,
            timeout_floor_secs: DEFAULT_TIMEOUT_FLOOR_SECS,
            user_agent: format!("esfleet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("reading {}: {}", path.display(), e)))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: ApiConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents).map_err(|e| ApiError::Config(e.to_string()))?,
            "json" => {
                serde_json::from_str(&contents).map_err(|e| ApiError::Config(e.to_string()))?
            }
            _ => {
                return Err(ApiError::Config(format!(
                    "unsupported config file extension: {}",
                    ext
                )))
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.host)
            .map_err(|e| ApiError::Config(format!("host {:?}: {}", self.host, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "host {:?}: scheme must be http or https",
                self.host
            )));
        }
        if self.timeout_floor_secs == 0 {
            return Err(ApiError::Config(
                "timeout_floor_secs must be greater than zero".to_string(),
            ));
        }
        match &self.credentials {
            Credentials::ApiKey { key } if key.is_empty() => {
                Err(ApiError::Config("api key cannot be empty".to_string()))
            }
            Credentials::Bearer { token } if token.is_empty() => {
                Err(ApiError::Config("bearer token cannot be empty".to_string()))
            }
            Credentials::Basic { username, .. } if username.is_empty() => {
                Err(ApiError::Config("username cannot be empty".to_string()))
            }
            Credentials::ApiKey { key } => header_safe("api key", key),
            Credentials::Bearer { token } => header_safe("bearer token", token),
            _ => Ok(()),
        }
    }

    pub fn timeout_floor(&self) -> Duration {
        Duration::from_secs(self.timeout_floor_secs)
    }
}

/// Rejects secrets that cannot travel in an `Authorization` header.
fn header_safe(what: &str, secret: &str) -> Result<()> {
    HeaderValue::from_str(secret)
        .map(|_| ())
        .map_err(|_| ApiError::Config(format!("{} contains characters not allowed in a header", what)))
}

/// Per-request timeout derived from a result-size hint: two seconds per hundred
/// items, never below `floor`.
pub fn request_timeout(floor: Duration, size_hint: u64) -> Duration {
    let scaled = Duration::from_secs((size_hint / 100) * 2);
    scaled.max(floor)
}

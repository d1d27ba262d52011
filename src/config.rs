use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/103.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub forvo: ForvoConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Base URL handed back to Yomichan in audio source lists
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for downloaded audio
    pub media_dir: String,
    /// Directory holding the cache database
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct ForvoConfig {
    pub host: String,
    pub audio_host: String,
    pub request_timeout_secs: u64,
    /// Attempts per request when Forvo answers 429 or 5xx
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8775".to_string(),
            public_url: "http://localhost:8775".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: "./user_files".to_string(),
            data_dir: "./user_files".to_string(),
        }
    }
}

impl Default for ForvoConfig {
    fn default() -> Self {
        Self {
            host: "https://forvo.com".to_string(),
            audio_host: "https://audio00.forvo.com".to_string(),
            request_timeout_secs: 10,
            max_attempts: 3,
            retry_backoff_ms: 1000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let server_defaults = ServerConfig::default();
        let forvo_defaults = ForvoConfig::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(server_defaults.bind_address);
        let public_url = std::env::var("PUBLIC_URL").unwrap_or(server_defaults.public_url);

        let media_dir =
            std::env::var("MEDIA_DIR").unwrap_or_else(|_| StorageConfig::default().media_dir);
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| media_dir.clone());

        let config = Config {
            server: ServerConfig {
                bind_address,
                public_url: trim_base(public_url),
            },
            storage: StorageConfig {
                media_dir,
                data_dir,
            },
            forvo: ForvoConfig {
                host: trim_base(std::env::var("FORVO_HOST").unwrap_or(forvo_defaults.host)),
                audio_host: trim_base(
                    std::env::var("FORVO_AUDIO_HOST").unwrap_or(forvo_defaults.audio_host),
                ),
                request_timeout_secs: env_parse(
                    "REQUEST_TIMEOUT_SECS",
                    forvo_defaults.request_timeout_secs,
                ),
                max_attempts: env_parse("MAX_ATTEMPTS", forvo_defaults.max_attempts),
                retry_backoff_ms: env_parse("RETRY_BACKOFF_MS", forvo_defaults.retry_backoff_ms),
                user_agent: std::env::var("USER_AGENT").unwrap_or(forvo_defaults.user_agent),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("PUBLIC_URL", &self.server.public_url),
            ("FORVO_HOST", &self.forvo.host),
            ("FORVO_AUDIO_HOST", &self.forvo.audio_host),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                ConfigError::ValidationError(format!("{key} is not a valid URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must use http or https"
                )));
            }
        }

        if self.forvo.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        if self.storage.media_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "MEDIA_DIR cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

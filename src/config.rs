use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Delay between pixel requests when PIXSEEK_REQUEST_DELAY_MS is unset.
const DEFAULT_REQUEST_DELAY_MS: u64 = 1;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the pixel ownership endpoint, without trailing slash.
    pub base_url: String,
    pub listen_addr: String,
    pub auth_token: String,
    /// Session cookie attached to every outbound pixel query, if set.
    pub session_cookie: Option<String>,
    /// Pause between consecutive pixel queries. Zero disables the pause.
    pub request_delay: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_token = required_env("PIXSEEK_AUTH_TOKEN")?;

        let base_url = std::env::var("PIXSEEK_BASE_URL")
            .unwrap_or_else(|_| "https://backend.wplace.live/s0".into());
        let base_url = base_url.trim_end_matches('/').to_owned();

        let listen_addr =
            std::env::var("PIXSEEK_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8090".into());

        let session_cookie = std::env::var("PIXSEEK_SESSION_COOKIE").ok();

        let request_delay = match std::env::var("PIXSEEK_REQUEST_DELAY_MS") {
            Ok(raw) => {
                let ms = raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::InvalidValue("PIXSEEK_REQUEST_DELAY_MS", format!("{raw}: {e}"))
                })?;
                Duration::from_millis(ms)
            }
            Err(_) => Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        };

        Ok(Config {
            base_url,
            listen_addr,
            auth_token,
            session_cookie,
            request_delay,
        })
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnv(name.into()))
}

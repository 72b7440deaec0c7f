use std::env;

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_image_model: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Reads configuration from the process environment once at startup.
    /// The API key is the only required value.
    pub fn load() -> Result<Self> {
        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY is required"));
        }

        Ok(Config {
            gemini_api_key,
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            request_timeout_secs: env_u64("GEMINI_REQUEST_TIMEOUT_SECS", 90),
        })
    }
}

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub db_uri: String,
    pub db_name: String,
    pub openai_api_key: String,
    pub assistant_id: String,
    pub openai_base_url: String,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "3051"),
            db_uri: require("DB_URI"),
            db_name: try_load("DB_NAME", "pension"),
            openai_api_key: require("OPENAI_API_KEY"),
            assistant_id: require("OPENAI_ASSISTANT_ID"),
            openai_base_url: try_load("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn require(key: &str) -> String {
    env::var(key)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {key}: {e}");
        })
        .expect("Environment misconfigured!")
}

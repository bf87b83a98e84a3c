use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Supabase,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub store_backend: StoreBackend,
    pub supabase_url: Url,
    pub supabase_key: String,
    pub seed_path: Option<PathBuf>,
    pub timezone: Tz,
    pub cache_ttl_secs: u64,
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix
            .add_source(Environment::with_prefix("APP").prefix_separator("_"))
            .set_default("store_backend", "supabase")?
            .set_default("supabase_url", "http://localhost:54321")?
            .set_default("supabase_key", "")?
            .set_default("timezone", "America/Los_Angeles")?
            .set_default("cache_ttl_secs", 300)?
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .build()?;

        config.try_deserialize()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Today's date where the studios are.
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    fn clear_env() {
        for key in [
            "APP_STORE_BACKEND",
            "APP_SUPABASE_URL",
            "APP_TIMEZONE",
            "APP_CACHE_TTL_SECS",
            "APP_PORT",
        ] {
            // SAFETY: tests touching the environment are serialized
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.store_backend, StoreBackend::Supabase);
        assert_eq!(settings.timezone, chrono_tz::America::Los_Angeles);
        assert_eq!(settings.cache_ttl(), Duration::from_secs(300));
        assert_eq!(settings.port, 8080);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        // SAFETY: tests touching the environment are serialized
        unsafe {
            std::env::set_var("APP_STORE_BACKEND", "memory");
            std::env::set_var("APP_TIMEZONE", "Europe/Warsaw");
            std::env::set_var("APP_CACHE_TTL_SECS", "30");
        }
        let settings = Settings::from_env().unwrap();
        clear_env();
        assert_eq!(settings.store_backend, StoreBackend::Memory);
        assert_eq!(settings.timezone, chrono_tz::Europe::Warsaw);
        assert_eq!(settings.cache_ttl_secs, 30);
    }
}

//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. Secrets are injected as environment
//! variables by the deployment, so there is no separate secret fetch.

use std::env;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Default Expo push endpoint used by the mobile app.
pub const DEFAULT_PUSH_API_URL: &str = "https://exp.host/--/api/v2/push/send";

/// Longest cache freshness window accepted (one day).
const MAX_CACHE_TTL_SECS: i64 = 24 * 60 * 60;

/// Longest reminder or booking lead time accepted (one week).
const MAX_LEAD_MINUTES: i64 = 7 * 24 * 60;

/// Real-world UTC offsets, UTC-12:00 through UTC+14:00.
const UTC_OFFSET_MINUTES: RangeInclusive<i32> = -12 * 60..=14 * 60;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    /// Process-local store, for local runs without credentials
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Mobile/web origin allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Push gateway endpoint
    pub push_api_url: String,
    /// Timeout for a single push HTTP call
    pub push_timeout_secs: u64,
    /// Freshness window of cached rides and trip lists
    pub ride_cache_ttl_secs: i64,
    /// Records fetched per side (driver, passenger) when listing trips
    pub trip_page_size: u32,
    /// How long before departure the reminder fires
    pub reminder_lead_minutes: i64,
    /// Earliest a new one-off trip may start, relative to now
    pub min_lead_minutes: i64,
    /// UTC offset of the wall-clock trip dates entered on devices
    pub trip_utc_offset_minutes: i32,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:8081".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env_or("PORT", 8080)?,
            store_backend: env_or("STORE_BACKEND", StoreBackend::Firestore)?,
            push_api_url: env::var("PUSH_API_URL")
                .unwrap_or_else(|_| DEFAULT_PUSH_API_URL.to_string()),
            push_timeout_secs: env_or("PUSH_TIMEOUT_SECS", 10)?,
            ride_cache_ttl_secs: in_range(
                "RIDE_CACHE_TTL_SECS",
                env_or("RIDE_CACHE_TTL_SECS", 300)?,
                0..=MAX_CACHE_TTL_SECS,
            )?,
            trip_page_size: env_or("TRIP_PAGE_SIZE", 20)?,
            reminder_lead_minutes: in_range(
                "REMINDER_LEAD_MINUTES",
                env_or("REMINDER_LEAD_MINUTES", 30)?,
                0..=MAX_LEAD_MINUTES,
            )?,
            min_lead_minutes: in_range(
                "MIN_LEAD_MINUTES",
                env_or("MIN_LEAD_MINUTES", 15)?,
                0..=MAX_LEAD_MINUTES,
            )?,
            trip_utc_offset_minutes: in_range(
                "TRIP_UTC_OFFSET_MINUTES",
                env_or("TRIP_UTC_OFFSET_MINUTES", 0)?,
                UTC_OFFSET_MINUTES,
            )?,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:8081".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            push_api_url: "http://127.0.0.1:9/push".to_string(),
            push_timeout_secs: 1,
            ride_cache_ttl_secs: 300,
            trip_page_size: 20,
            reminder_lead_minutes: 30,
            min_lead_minutes: 15,
            trip_utc_offset_minutes: 0,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// Read and parse an optional variable, falling back to `default` when unset.
fn env_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Reject values outside `range`.
fn in_range<T: PartialOrd>(
    name: &'static str,
    value: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("STORE_BACKEND", "memory");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.ride_cache_ttl_secs, 300);
        assert_eq!(config.trip_page_size, 20);
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!(matches!(
            "redis".parse::<StoreBackend>(),
            Err(ConfigError::Invalid("STORE_BACKEND"))
        ));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        assert_eq!(
            in_range("TRIP_UTC_OFFSET_MINUTES", 180, UTC_OFFSET_MINUTES).unwrap(),
            180
        );
        assert!(matches!(
            in_range("TRIP_UTC_OFFSET_MINUTES", 1440, UTC_OFFSET_MINUTES),
            Err(ConfigError::Invalid("TRIP_UTC_OFFSET_MINUTES"))
        ));
        assert!(in_range("TRIP_UTC_OFFSET_MINUTES", i32::MAX, UTC_OFFSET_MINUTES).is_err());
        assert!(in_range("RIDE_CACHE_TTL_SECS", i64::MAX, 0..=MAX_CACHE_TTL_SECS).is_err());
        assert!(in_range("RIDE_CACHE_TTL_SECS", -1, 0..=MAX_CACHE_TTL_SECS).is_err());
        assert!(in_range("REMINDER_LEAD_MINUTES", MAX_LEAD_MINUTES + 1, 0..=MAX_LEAD_MINUTES).is_err());
    }
}

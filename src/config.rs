use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::admin::throttle::ThrottleConfig;
use crate::components::visibility::VisibilityConfig;

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    /// Base of the monitoring backend, including `/api/<version>`.
    pub api_base: String,
    pub state_path: PathBuf,
    pub session_ttl: Duration,
    pub throttle: ThrottleConfig,
    pub visibility: VisibilityConfig,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port = lookup("SENTINEL_PORT").unwrap_or_else(|| "3000".to_string());
        let bind_addr =
            lookup("SENTINEL_BIND_ADDR").unwrap_or_else(|| format!("0.0.0.0:{}", port));

        let api_url = lookup("SENTINEL_API_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        let api_version = lookup("SENTINEL_API_VERSION").unwrap_or_else(|| "v1".to_string());
        let api_base = format!("{}/api/{}", api_url.trim_end_matches('/'), api_version);

        let state_path = PathBuf::from(
            lookup("SENTINEL_STATE_PATH").unwrap_or_else(|| "./client_state.json".to_string()),
        );

        let defaults = ThrottleConfig::default();
        let tick = Duration::from_millis(parse_or(
            &lookup,
            "SENTINEL_COUNTDOWN_TICK_MS",
            defaults.tick.as_millis() as u64,
        )?);
        let throttle = ThrottleConfig {
            max_attempts: parse_or(&lookup, "SENTINEL_LOGIN_MAX_ATTEMPTS", defaults.max_attempts)?,
            lockout: Duration::from_secs(parse_or(
                &lookup,
                "SENTINEL_LOGIN_LOCKOUT_SECS",
                defaults.lockout.as_secs(),
            )?),
            reset_window: Duration::from_secs(parse_or(
                &lookup,
                "SENTINEL_LOGIN_RESET_SECS",
                defaults.reset_window.as_secs(),
            )?),
            tick,
        };
        if throttle.max_attempts == 0 {
            anyhow::bail!("SENTINEL_LOGIN_MAX_ATTEMPTS must be at least 1");
        }
        if tick.is_zero() {
            anyhow::bail!("SENTINEL_COUNTDOWN_TICK_MS must be greater than 0");
        }

        let visibility = VisibilityConfig {
            window: Duration::from_secs(parse_or(
                &lookup,
                "SENTINEL_REPLACED_VISIBLE_SECS",
                VisibilityConfig::default().window.as_secs(),
            )?),
            tick,
        };

        Ok(Config {
            bind_addr,
            api_base,
            state_path,
            session_ttl: Duration::from_secs(parse_or(&lookup, "SENTINEL_SESSION_TTL_SECS", 3600)?),
            throttle,
            visibility,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

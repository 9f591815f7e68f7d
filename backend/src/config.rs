use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use shared::shared_wheel_game::{WheelConfig, WheelError};

use crate::services::congrats_service::CongratsSettings;

#[derive(Debug)]
pub enum ConfigError {
    Invalid { key: &'static str, value: String },
    Wheel(WheelError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
            Self::Wheel(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<WheelError> for ConfigError {
    fn from(err: WheelError) -> Self {
        Self::Wheel(err)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_path: PathBuf,
    pub frame_period: Duration,
    pub wheel: WheelConfig,
    pub congrats: CongratsSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            store_path: PathBuf::from("wheel_store.json"),
            frame_period: Duration::from_millis(16),
            wheel: WheelConfig::default(),
            congrats: CongratsSettings::default(),
        }
    }
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads `WHEEL_*` and `CONGRATS_*` variables over the defaults. Call after
    /// `.env` has been loaded.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let wheel = WheelConfig {
            spin_duration_ms: env_or("WHEEL_SPIN_DURATION_MS", defaults.wheel.spin_duration_ms)?,
            ease_exponent: env_or("WHEEL_EASE_EXPONENT", defaults.wheel.ease_exponent)?,
            extra_spins_min: env_or("WHEEL_EXTRA_SPINS_MIN", defaults.wheel.extra_spins_min)?,
            extra_spins_max: env_or("WHEEL_EXTRA_SPINS_MAX", defaults.wheel.extra_spins_max)?,
            settle_delay_ms: env_or("WHEEL_SETTLE_DELAY_MS", defaults.wheel.settle_delay_ms)?,
            ..defaults.wheel
        };
        wheel.validate()?;

        let frame_ms: u64 = env_or("WHEEL_FRAME_MS", defaults.frame_period.as_millis() as u64)?;
        if frame_ms == 0 {
            return Err(ConfigError::Invalid { key: "WHEEL_FRAME_MS", value: "0".to_string() });
        }

        let congrats = CongratsSettings {
            api_url: env_or("CONGRATS_API_URL", defaults.congrats.api_url)?,
            api_key: std::env::var("CONGRATS_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            model: env_or("CONGRATS_MODEL", defaults.congrats.model)?,
            timeout: Duration::from_millis(env_or(
                "CONGRATS_TIMEOUT_MS",
                defaults.congrats.timeout.as_millis() as u64,
            )?),
        };

        Ok(Self {
            bind_addr: env_or("WHEEL_BIND_ADDR", defaults.bind_addr)?,
            store_path: env_or("WHEEL_STORE_PATH", defaults.store_path)?,
            frame_period: Duration::from_millis(frame_ms),
            wheel,
            congrats,
        })
    }
}

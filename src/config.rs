//! Runtime configuration loaded from environment variables

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 6573;
pub const DEFAULT_IDLE_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Lobbies without writes for this long are removed from the store
    pub lobby_idle_ttl: Duration,
    pub sweep_interval: Duration,
    /// Reject a join whose name is already in the lobby instead of treating it as a rejoin
    pub reject_duplicate_names: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            lobby_idle_ttl: Duration::from_secs(DEFAULT_IDLE_TTL_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            reject_duplicate_names: false,
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

fn flag_var(key: &str) -> bool {
    std::env::var(key)
        .map(|v| {
            let v = v.trim().to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

impl AppConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let port = parse_var("CHOCOVOTE_PORT", DEFAULT_PORT);
        let ttl_secs = parse_var("LOBBY_IDLE_TTL_SECS", DEFAULT_IDLE_TTL_SECS);
        let sweep_secs = parse_var("LOBBY_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);
        let reject_duplicate_names = flag_var("LOBBY_REJECT_DUPLICATE_NAMES");

        // A zero interval would spin the reaper
        let sweep_secs = if sweep_secs == 0 {
            tracing::warn!("LOBBY_SWEEP_INTERVAL_SECS must be positive, using default");
            DEFAULT_SWEEP_INTERVAL_SECS
        } else {
            sweep_secs
        };

        tracing::info!(
            port,
            ttl_secs,
            sweep_secs,
            reject_duplicate_names,
            "Config loaded"
        );

        Self {
            port,
            lobby_idle_ttl: Duration::from_secs(ttl_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
            reject_duplicate_names,
        }
    }
}

//! Runtime configuration.
//!
//! Values come from the environment (after loading a `.env` file if present)
//! and fall back to the defaults below.

use dotenv::dotenv;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("unknown network {0:?}, expected mainnet, devnet or localnet")]
    UnknownNetwork(String),
}

/// Cluster the dashboard is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Devnet,
    Localnet,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(Self::Mainnet),
            "devnet" => Ok(Self::Devnet),
            "localnet" | "localhost" => Ok(Self::Localnet),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mainnet => "mainnet",
            Self::Devnet => "devnet",
            Self::Localnet => "localnet",
        };
        f.write_str(name)
    }
}

/// Staking parameters in effect for the active network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakingPolicy {
    /// Annual yield as a fraction, e.g. `0.12`.
    pub apy: Decimal,
    /// Minimum time a stake stays locked after it starts.
    pub min_lock: chrono::Duration,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub network: Network,
    pub apy_by_network: HashMap<Network, Decimal>,
    pub min_lock_duration_secs: u64,
    /// Period of the pending-reward ticker.
    pub reward_interval_secs: u64,
    /// How long a finished transaction stays displayed before the lifecycle returns to idle.
    pub cooldown_period_secs: u64,
    pub pool_refresh_interval_secs: u64,
    pub history_capacity: usize,
    pub aggregator_base_url: String,
    pub database_url: Option<String>,
    /// Directory of the JSON-file store, used when no database is configured.
    pub data_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            apy_by_network: HashMap::from([
                (Network::Mainnet, Decimal::new(12, 2)),
                (Network::Devnet, Decimal::new(15, 2)),
                (Network::Localnet, Decimal::new(20, 2)),
            ]),
            min_lock_duration_secs: 7 * 86_400,
            reward_interval_secs: 60,
            cooldown_period_secs: 3,
            pool_refresh_interval_secs: 30,
            history_capacity: 50,
            aggregator_base_url: "https://quote-api.jup.ag/v6".to_string(),
            database_url: None,
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(network) = lookup("AURUM_NETWORK") {
            config.network = network.parse()?;
        }
        for (key, network) in [
            ("AURUM_APY_MAINNET", Network::Mainnet),
            ("AURUM_APY_DEVNET", Network::Devnet),
            ("AURUM_APY_LOCALNET", Network::Localnet),
        ] {
            if let Some(apy) = parse_var::<Decimal, _>(&lookup, key)? {
                if apy.is_sign_negative() {
                    return Err(ConfigError::Invalid {
                        key,
                        value: apy.to_string(),
                    });
                }
                config.apy_by_network.insert(network, apy);
            }
        }
        if let Some(v) = parse_var(&lookup, "AURUM_MIN_LOCK_SECS")? {
            config.min_lock_duration_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AURUM_REWARD_INTERVAL_SECS")? {
            config.reward_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AURUM_COOLDOWN_SECS")? {
            config.cooldown_period_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AURUM_POOL_REFRESH_SECS")? {
            config.pool_refresh_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AURUM_HISTORY_CAP")? {
            config.history_capacity = v;
        }
        if let Some(url) = lookup("AURUM_JUPITER_URL") {
            config.aggregator_base_url = url;
        }
        config.database_url = lookup("AURUM_DATABASE_URL").filter(|url| !url.is_empty());
        config.data_dir = lookup("AURUM_DATA_DIR").filter(|dir| !dir.is_empty());

        Ok(config)
    }

    /// APY for the active network.
    pub fn apy(&self) -> Decimal {
        match self.apy_by_network.get(&self.network) {
            Some(apy) => *apy,
            None => {
                warn!(network = %self.network, "No APY configured, using zero");
                Decimal::ZERO
            }
        }
    }

    pub fn staking_policy(&self) -> StakingPolicy {
        StakingPolicy {
            apy: self.apy(),
            min_lock: i64::try_from(self.min_lock_duration_secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    pub fn reward_interval(&self) -> Duration {
        Duration::from_secs(self.reward_interval_secs)
    }

    pub fn cooldown_period(&self) -> Duration {
        Duration::from_secs(self.cooldown_period_secs)
    }

    pub fn pool_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.pool_refresh_interval_secs)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        let policy = config.staking_policy();
        assert_eq!(policy.apy, dec!(0.12));
        assert_eq!(policy.min_lock, chrono::Duration::days(7));
        assert_eq!(config.cooldown_period(), Duration::from_secs(3));
    }

    #[test]
    fn test_network_selects_apy() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AURUM_NETWORK", "devnet"),
            ("AURUM_APY_DEVNET", "0.3"),
        ]))
        .unwrap();
        assert_eq!(config.network, Network::Devnet);
        assert_eq!(config.apy(), dec!(0.3));
    }

    #[test]
    fn test_malformed_values() {
        assert_eq!(
            AppConfig::from_lookup(lookup(&[("AURUM_MIN_LOCK_SECS", "a week")])),
            Err(ConfigError::Invalid {
                key: "AURUM_MIN_LOCK_SECS",
                value: "a week".to_string()
            })
        );
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[("AURUM_NETWORK", "testnet")])),
            Err(ConfigError::UnknownNetwork(_))
        ));
        assert!(AppConfig::from_lookup(lookup(&[("AURUM_APY_MAINNET", "-0.1")])).is_err());
    }
}

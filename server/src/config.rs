use std::env;
use std::str::FromStr;
use std::time::Duration;

use arrival_schema::StateThresholds;
use chrono::TimeDelta;

use crate::Speed;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },
}

/// Runtime settings, read from the environment
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub thresholds: StateThresholds,
    /// Distance to the feeder fix at which a flight starts being tracked
    pub flight_creation_range_nm: f64,
    /// How long landed flights stay in the sequence as separation anchors
    pub landed_retention: TimeDelta,
    /// How long after landing removed and landed callsigns keep refusing updates
    pub retired_retention: TimeDelta,
    pub tick_interval: Duration,
    pub replay_speed: Speed,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: StateThresholds::default(),
            flight_creation_range_nm: 200.0,
            landed_retention: TimeDelta::minutes(5),
            retired_retention: TimeDelta::minutes(30),
            tick_interval: Duration::from_secs(30),
            replay_speed: Speed::FastForward(60),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let tick_interval = read("TICK_INTERVAL_SECONDS")?
            .map_or(defaults.tick_interval, Duration::from_secs);
        if tick_interval.is_zero() {
            return Err(ConfigError::NotPositive {
                key: "TICK_INTERVAL_SECONDS",
            });
        }

        Ok(Self {
            thresholds: StateThresholds {
                stable: read("STABLE_THRESHOLD_MINUTES")?
                    .map_or(defaults.thresholds.stable, TimeDelta::minutes),
                frozen: read("FROZEN_THRESHOLD_MINUTES")?
                    .map_or(defaults.thresholds.frozen, TimeDelta::minutes),
                minimum_unstable: read("MINIMUM_UNSTABLE_SECONDS")?
                    .map_or(defaults.thresholds.minimum_unstable, TimeDelta::seconds),
            },
            flight_creation_range_nm: read("FLIGHT_CREATION_RANGE_NM")?
                .unwrap_or(defaults.flight_creation_range_nm),
            landed_retention: read("LANDED_RETENTION_MINUTES")?
                .map_or(defaults.landed_retention, TimeDelta::minutes),
            retired_retention: read("RETIRED_RETENTION_MINUTES")?
                .map_or(defaults.retired_retention, TimeDelta::minutes),
            tick_interval,
            replay_speed: read("REPLAY_SPEED")?.unwrap_or(defaults.replay_speed),
        })
    }
}

fn read<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Each test uses its own keys since tests run concurrently
    #[test]
    fn test_read_parses_values() {
        env::set_var("TEST_CONFIG_MINUTES", " 12 ");
        assert_eq!(read::<i64>("TEST_CONFIG_MINUTES").unwrap(), Some(12));

        env::set_var("TEST_CONFIG_SPEED", "x10");
        assert_eq!(
            read::<Speed>("TEST_CONFIG_SPEED").unwrap(),
            Some(Speed::FastForward(10))
        );
    }

    #[test]
    fn test_read_rejects_garbage() {
        env::set_var("TEST_CONFIG_GARBAGE", "soon");
        assert!(matches!(
            read::<i64>("TEST_CONFIG_GARBAGE"),
            Err(ConfigError::InvalidValue { key: "TEST_CONFIG_GARBAGE", .. })
        ));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        env::set_var("TICK_INTERVAL_SECONDS", "0");
        let settings = Settings::from_env();
        env::remove_var("TICK_INTERVAL_SECONDS");

        assert!(matches!(
            settings,
            Err(ConfigError::NotPositive { key: "TICK_INTERVAL_SECONDS" })
        ));
    }

    #[test]
    fn test_missing_values_use_defaults() {
        assert_eq!(read::<i64>("TEST_CONFIG_UNSET").unwrap(), None);

        let settings = Settings::default();
        assert_eq!(settings.thresholds.stable, TimeDelta::minutes(25));
        assert_eq!(settings.thresholds.frozen, TimeDelta::minutes(15));
        assert_eq!(settings.thresholds.minimum_unstable, TimeDelta::seconds(180));
    }
}
